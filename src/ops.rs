//! Package operations: install, update, uninstall, list, sync, refresh.

use anyhow::Result;
use chrono::Utc;
use log::{debug, warn};
use std::path::PathBuf;

use crate::archive::{Extractor, ZipExtractor, flatten_single_root};
use crate::config::Config;
use crate::download;
use crate::error::WpmError;
use crate::http::HttpClient;
use crate::manifest::{PackageDescriptor, ProjectManifest};
use crate::registry::{Registry, RegistryEntry, RegistryStore};
use crate::runtime::Runtime;
use crate::store::{MetadataStore, PackageRecord, VERSION_UNKNOWN};
use crate::workspace::{PACKAGE_DESCRIPTOR, Workspace};

/// Fetches the registry mapping and rewrites the local cache.
#[tracing::instrument(skip(runtime, root_override, registry_override))]
pub async fn refresh<R: Runtime>(
    runtime: R,
    root_override: Option<PathBuf>,
    registry_override: Option<String>,
) -> Result<()> {
    let ws = Workspace::resolve(&runtime, root_override)?;
    let config = Config::new(&runtime, &ws, registry_override)?;
    let store = RegistryStore::new(ws.registry_cache_file());

    let registry = store
        .refresh(&runtime, &config.http, &config.registry_url)
        .await?;
    println!(
        "   refreshed {} ({} packages)",
        config.registry_url,
        registry.len()
    );
    Ok(())
}

/// Installs a package by name.
#[tracing::instrument(skip(runtime, root_override, registry_override))]
pub async fn install<R: Runtime + 'static>(
    runtime: R,
    name: &str,
    root_override: Option<PathBuf>,
    registry_override: Option<String>,
) -> Result<()> {
    let ws = Workspace::resolve(&runtime, root_override)?;
    let config = Config::new(&runtime, &ws, registry_override)?;
    let registry_store = RegistryStore::new(ws.registry_cache_file());
    let registry = registry_store
        .ensure_loaded(&runtime, &config.http, &config.registry_url)
        .await?;

    let ops = Ops::new(runtime, config.http, ZipExtractor, ws);
    ops.install(name, &registry).await
}

/// Updates a package, reinstalling only when the registry version differs.
#[tracing::instrument(skip(runtime, root_override, registry_override))]
pub async fn update<R: Runtime + 'static>(
    runtime: R,
    name: &str,
    root_override: Option<PathBuf>,
    registry_override: Option<String>,
) -> Result<()> {
    let ws = Workspace::resolve(&runtime, root_override)?;
    let config = Config::new(&runtime, &ws, registry_override)?;
    let registry_store = RegistryStore::new(ws.registry_cache_file());
    let registry = registry_store
        .ensure_loaded(&runtime, &config.http, &config.registry_url)
        .await?;

    let ops = Ops::new(runtime, config.http, ZipExtractor, ws);
    ops.update(name, &registry).await
}

/// Removes an installed package and its metadata record.
#[tracing::instrument(skip(runtime, root_override))]
pub fn uninstall<R: Runtime>(
    runtime: R,
    name: &str,
    root_override: Option<PathBuf>,
) -> Result<()> {
    let ws = Workspace::resolve(&runtime, root_override)?;
    let store = MetadataStore::new(ws.metadata_file());
    let mut packages = store.load(&runtime);

    // Nothing is touched unless the record exists
    let Some(record) = packages.get(name) else {
        return Err(WpmError::PackageNotInstalled(name.to_string()).into());
    };

    let package_dir = ws.root().join(&record.path);
    if runtime.exists(&package_dir) {
        runtime.remove_dir_all(&package_dir)?;
    } else {
        debug!("Package directory {:?} already absent", package_dir);
    }

    packages.remove(name);
    store.save(&runtime, &packages)?;

    println!("     removed {}", name);
    Ok(())
}

/// Prints the installed packages.
#[tracing::instrument(skip(runtime, root_override))]
pub fn list<R: Runtime>(runtime: R, root_override: Option<PathBuf>) -> Result<()> {
    let ws = Workspace::resolve(&runtime, root_override)?;
    let store = MetadataStore::new(ws.metadata_file());
    let packages = store.load(&runtime);

    if packages.is_empty() {
        println!("No packages installed.");
        return Ok(());
    }

    for (name, record) in &packages {
        match &record.description {
            Some(description) if !description.is_empty() => {
                println!("{} {} {} - {}", name, record.version, record.path, description)
            }
            _ => println!("{} {} {}", name, record.version, record.path),
        }
    }
    println!("{} package(s) installed", packages.len());
    Ok(())
}

/// Installs or updates every package the project manifest lists.
#[tracing::instrument(skip(runtime, root_override, registry_override))]
pub async fn sync<R: Runtime + 'static>(
    runtime: R,
    root_override: Option<PathBuf>,
    registry_override: Option<String>,
) -> Result<()> {
    let ws = Workspace::resolve(&runtime, root_override)?;
    let manifest = ProjectManifest::load(&runtime, &ws.manifest_file())?;

    let config = Config::new(&runtime, &ws, registry_override)?;
    let registry_store = RegistryStore::new(ws.registry_cache_file());
    let registry = registry_store
        .ensure_loaded(&runtime, &config.http, &config.registry_url)
        .await?;

    let ops = Ops::new(runtime, config.http, ZipExtractor, ws);
    ops.sync(&manifest, &registry).await
}

/// Package operations against a single workspace.
pub struct Ops<R: Runtime, E: Extractor> {
    runtime: R,
    http: HttpClient,
    extractor: E,
    ws: Workspace,
}

impl<R: Runtime + 'static, E: Extractor> Ops<R, E> {
    pub fn new(runtime: R, http: HttpClient, extractor: E, ws: Workspace) -> Self {
        Self {
            runtime,
            http,
            extractor,
            ws,
        }
    }

    fn metadata_store(&self) -> MetadataStore {
        MetadataStore::new(self.ws.metadata_file())
    }

    /// Downloads, extracts, and records one package. Always fetches, even
    /// when the package is already installed.
    #[tracing::instrument(skip(self, registry))]
    pub async fn install(&self, name: &str, registry: &Registry) -> Result<()> {
        println!("   resolving {}", name);
        let entry = registry
            .get(name)
            .ok_or_else(|| anyhow::Error::from(WpmError::PackageNotFound(name.to_string())))?;
        let url = entry
            .url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| anyhow::Error::from(WpmError::PackageMissingUrl(name.to_string())))?;

        let target_dir = self.ws.package_dir(name);
        if self.runtime.exists(&target_dir) {
            debug!("Removing previous contents of {:?}", target_dir);
            if let Err(e) = self.runtime.remove_dir_all(&target_dir) {
                warn!("Failed to remove {:?}: {:#}. Continuing.", target_dir, e);
            }
        }
        self.runtime.create_dir_all(&target_dir)?;

        // A failed download leaves the directory behind; the next install
        // replaces it wholesale.
        let archive_path = target_dir.join(format!("{}.zip", name));
        println!(" downloading {} {}", name, url);
        download::download_file(&self.runtime, &url, &archive_path, &self.http)
            .await
            .map_err(|e| e.context(WpmError::Download(url.clone())))?;

        println!("  installing {}", name);
        self.extractor
            .extract(&self.runtime, &archive_path, &target_dir)?;

        if let Err(e) = self.runtime.remove_file(&archive_path) {
            warn!("Failed to remove archive {:?}: {:#}", archive_path, e);
        }

        flatten_single_root(&self.runtime, &target_dir)?;

        let descriptor =
            PackageDescriptor::load(&self.runtime, &target_dir.join(PACKAGE_DESCRIPTOR));
        let record = self.build_record(name, &url, &entry, descriptor);

        // The record is written only after every install step succeeded
        let store = self.metadata_store();
        let mut packages = store.load(&self.runtime);
        packages.insert(name.to_string(), record.clone());
        store.save(&self.runtime, &packages)?;

        println!("   installed {} {} {}", name, record.version, record.path);
        Ok(())
    }

    /// Compares the installed version against the registry and reinstalls on
    /// any difference. Versions compare as plain strings.
    #[tracing::instrument(skip(self, registry))]
    pub async fn update(&self, name: &str, registry: &Registry) -> Result<()> {
        println!("    updating {}", name);
        let entry = registry
            .get(name)
            .ok_or_else(|| anyhow::Error::from(WpmError::PackageNotFound(name.to_string())))?;

        let packages = self.metadata_store().load(&self.runtime);
        let record = packages
            .get(name)
            .ok_or_else(|| anyhow::Error::from(WpmError::PackageNotInstalled(name.to_string())))?;

        let registry_version = entry.version.as_deref().unwrap_or("");
        if !record.version.is_empty()
            && !registry_version.is_empty()
            && record.version == registry_version
        {
            println!("  up to date {} {}", name, record.version);
            return Ok(());
        }

        debug!(
            "Version changed for {}: {:?} -> {:?}",
            name, record.version, registry_version
        );
        self.install(name, registry).await
    }

    /// Brings every manifest package up to date. Failures are reported per
    /// package and do not stop the remaining ones.
    #[tracing::instrument(skip(self, manifest, registry))]
    pub async fn sync(&self, manifest: &ProjectManifest, registry: &Registry) -> Result<()> {
        if manifest.packages.is_empty() {
            println!("Manifest lists no packages.");
            return Ok(());
        }

        let mut failures = 0usize;
        for name in &manifest.packages {
            // Metadata is reloaded per package since each install rewrites it
            let installed = self.metadata_store().load(&self.runtime).contains_key(name);
            let result = if installed {
                self.update(name, registry).await
            } else {
                self.install(name, registry).await
            };
            if let Err(e) = result {
                warn!("Failed to sync {}: {:#}", name, e);
                failures += 1;
            }
        }

        if failures > 0 {
            anyhow::bail!(
                "{} of {} packages failed to sync",
                failures,
                manifest.packages.len()
            );
        }
        Ok(())
    }

    /// Builds the metadata record for a fresh install. Descriptor fields win
    /// over registry fields; a missing version falls back to the sentinel.
    fn build_record(
        &self,
        name: &str,
        url: &str,
        entry: &RegistryEntry,
        descriptor: Option<PackageDescriptor>,
    ) -> PackageRecord {
        let descriptor = descriptor.unwrap_or_default();
        let non_empty = |v: &String| !v.trim().is_empty();

        PackageRecord {
            name: name.to_string(),
            path: self.ws.package_rel_path(name),
            url: url.to_string(),
            version: descriptor
                .version
                .filter(non_empty)
                .or_else(|| entry.version.clone().filter(non_empty))
                .unwrap_or_else(|| VERSION_UNKNOWN.to_string()),
            description: descriptor.description.or_else(|| entry.description.clone()),
            author: descriptor.author.or_else(|| entry.author.clone()),
            license: descriptor.license.or_else(|| entry.license.clone()),
            installed_at: Utc::now().to_rfc3339(),
            assignments: descriptor.assignments,
        }
    }
}
