//! Download glue between the HTTP client and the runtime filesystem.

use anyhow::{Result, anyhow};
use log::info;
use std::path::Path;

use crate::http::HttpClient;
use crate::runtime::Runtime;

/// Streams `url` into a file at `dest`. The destination file is created
/// lazily, after the server has answered with a success status.
#[tracing::instrument(skip(runtime, client))]
pub async fn download_file<R: Runtime>(
    runtime: &R,
    url: &str,
    dest: &Path,
    client: &HttpClient,
) -> Result<()> {
    info!("Downloading {} to {:?}", url, dest);

    client
        .download_file(url, || {
            runtime
                .create_file(dest)
                .map_err(|e| anyhow!("Failed to create file at {dest:?}: {e}"))
        })
        .await?;

    Ok(())
}
