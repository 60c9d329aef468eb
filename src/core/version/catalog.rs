// ─── Version Catalog ───
// Fetches and queries the Mojang version manifest v2.

use serde::Deserialize;
use tracing::info;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::fetch_text;

/// Top-level Mojang version catalog.
#[derive(Debug, Deserialize)]
pub struct VersionCatalog {
    pub versions: Vec<CatalogEntry>,
}

/// A single entry in the catalog.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    #[serde(rename = "type")]
    pub version_type: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

impl VersionCatalog {
    /// Fetch the version catalog from `url` using a shared HTTP client.
    pub async fn fetch(client: &reqwest::Client, url: &str) -> LauncherResult<Self> {
        info!("Fetching Minecraft version catalog...");

        let raw = fetch_text(client, url).await?;
        let catalog: VersionCatalog = serde_json::from_str(&raw)
            .map_err(|e| LauncherError::InvalidManifest(url.to_string(), e.to_string()))?;

        info!("Loaded {} versions from catalog", catalog.versions.len());
        Ok(catalog)
    }

    /// Find a version entry by exact id (e.g. "1.20.4").
    pub fn find_version(&self, id: &str) -> Option<&CatalogEntry> {
        self.versions.iter().find(|v| v.id == id)
    }
}
