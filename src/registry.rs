//! The remote package index and its local cache.

use anyhow::Result;
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;

use crate::error::WpmError;
use crate::http::HttpClient;
use crate::runtime::Runtime;

/// One registry record. `url` is required for installation but the document
/// may omit it; the install path reports that as its own error.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct RegistryEntry {
    pub url: Option<String>,
    pub version: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub license: Option<String>,
}

/// A parsed registry document. Two shapes are supported: nested
/// (`{"packages": {name: record}}`) and flat (`{name: record}`).
#[derive(Debug)]
pub struct Registry {
    doc: Value,
}

impl Registry {
    pub fn parse(bytes: &[u8]) -> serde_json::Result<Self> {
        Ok(Self {
            doc: serde_json::from_slice(bytes)?,
        })
    }

    /// Looks up a package record, nested shape first, then flat.
    /// Pure lookup, no I/O.
    pub fn get(&self, name: &str) -> Option<RegistryEntry> {
        let record = self
            .doc
            .get("packages")
            .and_then(|packages| packages.get(name))
            .or_else(|| self.doc.get(name))?;
        serde_json::from_value(record.clone()).ok()
    }

    /// Number of records in the document, for reporting only.
    pub fn len(&self) -> usize {
        match self.doc.get("packages").and_then(Value::as_object) {
            Some(packages) => packages.len(),
            None => self.doc.as_object().map_or(0, |map| map.len()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Fetches the registry and keeps the raw bytes cached on disk.
pub struct RegistryStore {
    cache_path: PathBuf,
}

impl RegistryStore {
    pub fn new(cache_path: PathBuf) -> Self {
        Self { cache_path }
    }

    /// Fetches `url`, parses the body, and overwrites the cache file with
    /// the raw bytes. The cache is only written once the body parsed.
    #[tracing::instrument(skip(self, runtime, http))]
    pub async fn refresh<R: Runtime>(
        &self,
        runtime: &R,
        http: &HttpClient,
        url: &str,
    ) -> Result<Registry> {
        info!("Fetching registry from {}", url);

        let bytes = match http.get_bytes(url).await {
            Ok(bytes) => bytes,
            Err(e) => return Err(e.context(WpmError::RegistryFetch(url.to_string()))),
        };

        let registry =
            Registry::parse(&bytes).map_err(|e| WpmError::RegistryDecode(e.to_string()))?;

        if let Some(parent) = self.cache_path.parent() {
            runtime.create_dir_all(parent)?;
        }
        runtime.write(&self.cache_path, &bytes)?;
        debug!(
            "Cached registry at {:?} ({} packages)",
            self.cache_path,
            registry.len()
        );

        Ok(registry)
    }

    /// Reads the cached registry. Never performs network I/O.
    #[tracing::instrument(skip(self, runtime))]
    pub fn load_cached<R: Runtime>(&self, runtime: &R) -> Result<Registry> {
        if !runtime.exists(&self.cache_path) {
            return Err(WpmError::RegistryMissing(self.cache_path.clone()).into());
        }

        let content = runtime.read_to_string(&self.cache_path)?;
        let registry = Registry::parse(content.as_bytes())
            .map_err(|_| WpmError::RegistryCorrupt(self.cache_path.clone()))?;
        Ok(registry)
    }

    /// Returns the cached registry, refreshing from `url` only when no cache
    /// exists yet. A corrupt cache surfaces as an error rather than a silent
    /// refetch.
    #[tracing::instrument(skip(self, runtime, http))]
    pub async fn ensure_loaded<R: Runtime>(
        &self,
        runtime: &R,
        http: &HttpClient,
        url: &str,
    ) -> Result<Registry> {
        match self.load_cached(runtime) {
            Ok(registry) => Ok(registry),
            Err(e) if matches!(e.downcast_ref::<WpmError>(), Some(WpmError::RegistryMissing(_))) => {
                debug!("No cached registry, refreshing from {}", url);
                self.refresh(runtime, http, url).await
            }
            Err(e) => Err(e),
        }
    }
}
