use async_trait::async_trait;
use tracing::info;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::fetch_text;
use crate::core::version::VersionCatalog;

use super::source::ManifestSource;

/// Official Mojang version manifests, located through the version catalog.
pub struct VanillaSource {
    version: String,
    catalog_url: String,
}

impl VanillaSource {
    pub fn new(version: &str, catalog_url: &str) -> Self {
        Self {
            version: version.to_string(),
            catalog_url: catalog_url.to_string(),
        }
    }
}

#[async_trait]
impl ManifestSource for VanillaSource {
    fn version_id(&self) -> String {
        self.version.clone()
    }

    async fn fetch(&self, client: &reqwest::Client) -> LauncherResult<String> {
        let catalog = VersionCatalog::fetch(client, &self.catalog_url).await?;

        let entry = catalog
            .find_version(&self.version)
            .ok_or_else(|| LauncherError::VersionNotFound(self.version.clone()))?;

        info!("Fetching Vanilla {} manifest", self.version);
        fetch_text(client, &entry.url).await
    }
}
