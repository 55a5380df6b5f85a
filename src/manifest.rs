//! Readers for the JSON documents projects and packages carry.
//!
//! The project manifest is explicit user input, so missing or malformed
//! files are hard errors. Package-owned descriptors are advisory and load
//! fail-open: any problem just means "no local metadata".

use anyhow::Result;
use log::debug;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::WpmError;
use crate::runtime::Runtime;

/// `wpackage.json`: the packages a project depends on, plus an optional
/// registry override.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ProjectManifest {
    #[serde(default)]
    pub packages: Vec<String>,
    pub registry: Option<String>,
}

impl ProjectManifest {
    #[tracing::instrument(skip(runtime, path))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Result<Self> {
        if !runtime.exists(path) {
            return Err(WpmError::ManifestMissing(path.to_path_buf()).into());
        }
        let content = runtime.read_to_string(path)?;
        let manifest = serde_json::from_str(&content)
            .map_err(|e| WpmError::ManifestInvalid(e.to_string()))?;
        Ok(manifest)
    }
}

/// `package.json` inside an installed package: fields that take precedence
/// over what the registry declared.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct PackageDescriptor {
    pub version: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub license: Option<String>,
    #[serde(default)]
    pub assignments: Vec<String>,
}

impl PackageDescriptor {
    /// Fail-open read: `None` when the file is absent or unparsable.
    #[tracing::instrument(skip(runtime, path))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Option<Self> {
        if !runtime.exists(path) {
            return None;
        }
        let content = match runtime.read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("Failed to read descriptor {:?}: {}", path, e);
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(descriptor) => Some(descriptor),
            Err(e) => {
                debug!("Ignoring malformed descriptor {:?}: {}", path, e);
                None
            }
        }
    }
}

/// `assignment.json` inside an installed package: module name to relative
/// source path.
#[derive(Deserialize, Debug, Clone, Default, PartialEq)]
pub struct ModuleDescriptor {
    #[serde(default)]
    pub modules: BTreeMap<String, String>,
}

impl ModuleDescriptor {
    /// Fail-open read: `None` when the file is absent or unparsable.
    #[tracing::instrument(skip(runtime, path))]
    pub fn load<R: Runtime>(runtime: &R, path: &Path) -> Option<Self> {
        if !runtime.exists(path) {
            return None;
        }
        let content = match runtime.read_to_string(path) {
            Ok(content) => content,
            Err(e) => {
                debug!("Failed to read module descriptor {:?}: {}", path, e);
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(descriptor) => Some(descriptor),
            Err(e) => {
                debug!("Ignoring malformed module descriptor {:?}: {}", path, e);
                None
            }
        }
    }
}
