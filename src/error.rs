//! Error taxonomy for package-manager operations.

use std::path::PathBuf;

/// Failures that carry meaning beyond their message: callers match on the
/// variant (through `anyhow::Error::downcast_ref`) to pick recovery paths,
/// and tests assert on the kind rather than on wording.
#[derive(Debug)]
pub enum WpmError {
    /// No registry URL could be resolved from any configuration source
    NoRegistryUrl,
    /// Registry endpoint returned a non-success status or the transfer failed
    RegistryFetch(String),
    /// Registry response body is not valid JSON
    RegistryDecode(String),
    /// No cached registry on disk
    RegistryMissing(PathBuf),
    /// Cached registry exists but cannot be parsed
    RegistryCorrupt(PathBuf),
    /// Package name absent from the registry
    PackageNotFound(String),
    /// Registry record for the package has no download URL
    PackageMissingUrl(String),
    /// Archive transfer failed
    Download(String),
    /// Archive could not be parsed
    Extract(String),
    /// No installed-package record for the name
    PackageNotInstalled(String),
    /// Project manifest file is absent
    ManifestMissing(PathBuf),
    /// Project manifest exists but cannot be parsed
    ManifestInvalid(String),
    /// No installed package maps the requested module name
    ModuleNotFound(String),
    /// No interpreter found via environment override or candidate probing
    InterpreterNotFound,
}

impl std::fmt::Display for WpmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WpmError::NoRegistryUrl => {
                write!(
                    f,
                    "No registry URL configured. Pass --registry, set WPM_REGISTRY, or add a \"registry\" field to wpackage.json."
                )
            }
            WpmError::RegistryFetch(msg) => {
                write!(f, "Failed to fetch the registry: {}", msg)
            }
            WpmError::RegistryDecode(msg) => {
                write!(f, "Registry response is not valid JSON: {}", msg)
            }
            WpmError::RegistryMissing(path) => {
                write!(
                    f,
                    "No cached registry at {:?}. Run `wpm refresh` first.",
                    path
                )
            }
            WpmError::RegistryCorrupt(path) => {
                write!(
                    f,
                    "Cached registry at {:?} is unreadable. Run `wpm refresh` to replace it.",
                    path
                )
            }
            WpmError::PackageNotFound(name) => {
                write!(f, "Package '{}' was not found in the registry", name)
            }
            WpmError::PackageMissingUrl(name) => {
                write!(f, "Registry entry for '{}' has no download URL", name)
            }
            WpmError::Download(msg) => {
                write!(f, "Download failed: {}", msg)
            }
            WpmError::Extract(msg) => {
                write!(f, "Failed to extract archive: {}", msg)
            }
            WpmError::PackageNotInstalled(name) => {
                write!(f, "Package '{}' is not installed", name)
            }
            WpmError::ManifestMissing(path) => {
                write!(f, "Project manifest {:?} does not exist", path)
            }
            WpmError::ManifestInvalid(msg) => {
                write!(f, "Project manifest is not valid JSON: {}", msg)
            }
            WpmError::ModuleNotFound(name) => {
                write!(f, "No installed package provides module '{}'", name)
            }
            WpmError::InterpreterNotFound => {
                write!(
                    f,
                    "No wsx interpreter found. Set WS_INTERPRETER or install one on PATH."
                )
            }
        }
    }
}

impl std::error::Error for WpmError {}
