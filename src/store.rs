//! Installed-package metadata, one JSON document per project.

use anyhow::Result;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::runtime::Runtime;

/// Version sentinel recorded when no source declares one.
pub const VERSION_UNKNOWN: &str = "unknown";

fn default_version() -> String {
    VERSION_UNKNOWN.to_string()
}

/// Metadata for one installed package, keyed by package name in the store.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PackageRecord {
    pub name: String,
    /// Location relative to the project root, e.g. `ws_packages/mathlib`.
    pub path: String,
    /// Origin the archive was downloaded from.
    pub url: String,
    #[serde(default = "default_version")]
    pub version: String,
    pub description: Option<String>,
    pub author: Option<String>,
    pub license: Option<String>,
    pub installed_at: String,
    /// Extra module-descriptor files, relative to the package directory.
    #[serde(default)]
    pub assignments: Vec<String>,
}

/// The mapping of installed-package name to record.
pub type PackageMap = BTreeMap<String, PackageRecord>;

/// Loads and saves the `ws_packages.json` document.
pub struct MetadataStore {
    path: PathBuf,
}

impl MetadataStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Reads the backing file. Any failure (absent file, malformed JSON)
    /// yields an empty mapping so corrupted metadata never blocks installs.
    #[tracing::instrument(skip(self, runtime))]
    pub fn load<R: Runtime>(&self, runtime: &R) -> PackageMap {
        if !runtime.exists(&self.path) {
            debug!("No metadata file at {:?}", self.path);
            return PackageMap::new();
        }

        let content = match runtime.read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                debug!("Failed to read metadata at {:?}: {}", self.path, e);
                return PackageMap::new();
            }
        };

        match serde_json::from_str(&content) {
            Ok(packages) => packages,
            Err(e) => {
                debug!("Ignoring malformed metadata at {:?}: {}", self.path, e);
                PackageMap::new()
            }
        }
    }

    /// Writes the full mapping pretty-printed, via a temp file and rename so
    /// a crash mid-write cannot leave a truncated document.
    #[tracing::instrument(skip(self, runtime, packages))]
    pub fn save<R: Runtime>(&self, runtime: &R, packages: &PackageMap) -> Result<()> {
        let json = serde_json::to_string_pretty(packages)?;
        let tmp_path = self.path.with_extension("json.tmp");

        runtime.write(&tmp_path, json.as_bytes())?;
        runtime.rename(&tmp_path, &self.path)?;
        Ok(())
    }
}
