//! Shared command configuration: HTTP client and registry location.

use anyhow::Result;
use log::debug;
use reqwest::Client;

use crate::error::WpmError;
use crate::http::HttpClient;
use crate::manifest::ProjectManifest;
use crate::runtime::Runtime;
use crate::workspace::{MANIFEST_FILE, Workspace};

/// Registry consulted when no other source names one.
pub const DEFAULT_REGISTRY_URL: &str = "https://registry.wsx-lang.dev/mapping.json";

/// Environment variable overriding the registry URL.
pub const REGISTRY_ENV: &str = "WPM_REGISTRY";

pub struct Config {
    pub http: HttpClient,
    pub registry_url: String,
}

impl Config {
    #[tracing::instrument(skip(runtime, ws, registry_override))]
    pub fn new<R: Runtime>(
        runtime: &R,
        ws: &Workspace,
        registry_override: Option<String>,
    ) -> Result<Self> {
        let client = Client::builder().user_agent("wpm-cli").build()?;

        let registry_url = resolve_registry_url(
            runtime,
            ws,
            registry_override,
            Some(DEFAULT_REGISTRY_URL),
        )?;

        Ok(Self {
            http: HttpClient::new(client),
            registry_url,
        })
    }
}

/// Resolves the registry URL. Sources in order: explicit override (the
/// `--registry` argument), the `WPM_REGISTRY` environment variable, the
/// manifest's `registry` field, then the built-in default. Blank values are
/// treated as unset.
#[tracing::instrument(skip(runtime, ws, override_url, default_url))]
pub fn resolve_registry_url<R: Runtime>(
    runtime: &R,
    ws: &Workspace,
    override_url: Option<String>,
    default_url: Option<&str>,
) -> Result<String> {
    if let Some(url) = override_url
        && !url.trim().is_empty()
    {
        debug!("Registry URL from command line: {}", url);
        return Ok(url);
    }

    if let Ok(url) = runtime.env_var(REGISTRY_ENV)
        && !url.trim().is_empty()
    {
        debug!("Registry URL from {}: {}", REGISTRY_ENV, url);
        return Ok(url);
    }

    // The manifest is read fail-open here; a missing or malformed
    // wpackage.json only skips this source.
    if let Ok(manifest) = ProjectManifest::load(runtime, &ws.manifest_file())
        && let Some(url) = manifest.registry
        && !url.trim().is_empty()
    {
        debug!("Registry URL from {}: {}", MANIFEST_FILE, url);
        return Ok(url);
    }

    match default_url {
        Some(url) if !url.trim().is_empty() => Ok(url.to_string()),
        _ => Err(WpmError::NoRegistryUrl.into()),
    }
}
