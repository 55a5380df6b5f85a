//! Well-known files and directories of a wpm project.

use anyhow::Result;
use log::info;
use std::path::{Path, PathBuf};

use crate::runtime::Runtime;

/// Directory holding installed packages, relative to the project root.
pub const PACKAGES_DIR: &str = "ws_packages";

/// Installed-package metadata, one JSON document at the project root.
pub const METADATA_FILE: &str = "ws_packages.json";

/// Project manifest listing the packages a project depends on.
pub const MANIFEST_FILE: &str = "wpackage.json";

/// Cached registry bytes, kept inside the packages directory.
pub const REGISTRY_CACHE_FILE: &str = "mapping.json";

/// Per-package descriptor with version and authorship fields.
pub const PACKAGE_DESCRIPTOR: &str = "package.json";

/// Per-package module descriptor mapping module names to source paths.
pub const MODULE_DESCRIPTOR: &str = "assignment.json";

/// Conventional source subdirectory inside a package.
pub const SOURCE_DIR: &str = "src";

/// Conventional entry-point file name for a module directory.
pub const MAIN_FILE: &str = "main.wsx";

/// A project root and the well-known paths beneath it.
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Resolves the project root: explicit override first, then the current
    /// working directory.
    #[tracing::instrument(skip(runtime, root_override))]
    pub fn resolve<R: Runtime>(runtime: &R, root_override: Option<PathBuf>) -> Result<Self> {
        let root = match root_override {
            Some(path) => path,
            None => runtime.current_dir()?,
        };
        info!("Using project root: {}", root.display());
        Ok(Self::new(root))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn manifest_file(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    pub fn metadata_file(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    pub fn packages_dir(&self) -> PathBuf {
        self.root.join(PACKAGES_DIR)
    }

    pub fn registry_cache_file(&self) -> PathBuf {
        self.packages_dir().join(REGISTRY_CACHE_FILE)
    }

    pub fn package_dir(&self, name: &str) -> PathBuf {
        self.packages_dir().join(name)
    }

    /// Relative location recorded in metadata, always with forward slashes
    /// so the document stays portable.
    pub fn package_rel_path(&self, name: &str) -> String {
        format!("{}/{}", PACKAGES_DIR, name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;

    #[test]
    fn test_resolve_with_override() {
        let runtime = MockRuntime::new();
        let ws = Workspace::resolve(&runtime, Some(PathBuf::from("/proj"))).unwrap();
        assert_eq!(ws.root(), Path::new("/proj"));
    }

    #[test]
    fn test_resolve_defaults_to_current_dir() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_current_dir()
            .returning(|| Ok(PathBuf::from("/cwd")));

        let ws = Workspace::resolve(&runtime, None).unwrap();
        assert_eq!(ws.root(), Path::new("/cwd"));
    }

    #[test]
    fn test_workspace_paths() {
        let ws = Workspace::new(PathBuf::from("/proj"));
        assert_eq!(ws.manifest_file(), PathBuf::from("/proj/wpackage.json"));
        assert_eq!(ws.metadata_file(), PathBuf::from("/proj/ws_packages.json"));
        assert_eq!(ws.packages_dir(), PathBuf::from("/proj/ws_packages"));
        assert_eq!(
            ws.registry_cache_file(),
            PathBuf::from("/proj/ws_packages/mapping.json")
        );
        assert_eq!(
            ws.package_dir("mathlib"),
            PathBuf::from("/proj/ws_packages/mathlib")
        );
        assert_eq!(ws.package_rel_path("mathlib"), "ws_packages/mathlib");
    }
}
