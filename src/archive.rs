//! Zip extraction with path-safety checks and layout normalization.

use anyhow::{Context, Result};
use log::{debug, warn};
use std::io::Read;
use std::path::Path;
use zip::ZipArchive;

use crate::error::WpmError;
use crate::runtime::Runtime;

/// Archive extraction, injectable so operations can be tested without
/// real archives.
#[cfg_attr(test, mockall::automock)]
pub trait Extractor: Send + Sync {
    /// Extracts every safe entry of the archive into `dest_dir`.
    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        dest_dir: &Path,
    ) -> Result<()>;
}

/// Extractor for .zip archives.
pub struct ZipExtractor;

impl Extractor for ZipExtractor {
    #[tracing::instrument(skip(self, runtime, archive_path, dest_dir))]
    fn extract<R: Runtime + 'static>(
        &self,
        runtime: &R,
        archive_path: &Path,
        dest_dir: &Path,
    ) -> Result<()> {
        debug!("Extracting zip archive to {:?}...", dest_dir);
        let file = runtime
            .open(archive_path)
            .with_context(|| format!("Failed to open archive at {:?}", archive_path))?;

        // zip requires Read + Seek, but Runtime::open returns a plain reader,
        // so the archive is buffered in memory
        let mut buffer = Vec::new();
        let mut reader = file;
        reader
            .read_to_end(&mut buffer)
            .with_context(|| format!("Failed to read archive {:?}", archive_path))?;
        let cursor = std::io::Cursor::new(buffer);

        let mut archive =
            ZipArchive::new(cursor).map_err(|e| WpmError::Extract(e.to_string()))?;

        for i in 0..archive.len() {
            let mut entry = archive
                .by_index(i)
                .map_err(|e| WpmError::Extract(format!("entry {}: {}", i, e)))?;

            // Zip-slip guard: entries that resolve outside dest_dir are
            // skipped, never written
            let entry_path = match entry.enclosed_name() {
                Some(path) => path.to_path_buf(),
                None => {
                    warn!("Skipping archive entry with unsafe path: {}", entry.name());
                    continue;
                }
            };

            let full_path = dest_dir.join(&entry_path);

            if entry.is_dir() {
                runtime.create_dir_all(&full_path)?;
            } else {
                if let Some(parent) = full_path.parent() {
                    runtime.create_dir_all(parent)?;
                }
                let mut dest_file = runtime.create_file(&full_path)?;
                std::io::copy(&mut entry, &mut dest_file)
                    .with_context(|| format!("Failed to extract file {:?}", full_path))?;

                // Set file permissions from archive metadata (Unix only)
                #[cfg(unix)]
                if let Some(mode) = entry.unix_mode()
                    && let Err(e) = runtime.set_permissions(&full_path, mode)
                {
                    debug!("Failed to set permissions on {:?}: {}", full_path, e);
                }
            }
        }

        debug!("Extraction complete.");
        Ok(())
    }
}

/// If `dir` holds exactly one entry and it is a directory, moves that
/// directory's children up into `dir` and removes the emptied wrapper.
/// Archives often wrap their contents in a single `<package>/` folder; this
/// normalizes them. Any other layout is left untouched. Returns whether a
/// wrapper was removed.
#[tracing::instrument(skip(runtime, dir))]
pub fn flatten_single_root<R: Runtime>(runtime: &R, dir: &Path) -> Result<bool> {
    let entries = runtime
        .read_dir(dir)
        .with_context(|| format!("Failed to read directory {:?}", dir))?;

    if entries.len() != 1 {
        return Ok(false);
    }
    let wrapper = &entries[0];
    if !runtime.is_dir(wrapper) {
        return Ok(false);
    }

    debug!("Flattening wrapper directory {:?}", wrapper);
    for item in runtime.read_dir(wrapper)? {
        let name = item
            .file_name()
            .with_context(|| format!("Invalid entry name under {:?}", wrapper))?;
        runtime.rename(&item, &dir.join(name))?;
    }
    runtime.remove_dir(wrapper)?;

    Ok(true)
}
