use async_trait::async_trait;
use tracing::info;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::fetch_text;

use super::source::ManifestSource;

/// Fabric loader profiles, which inherit from a vanilla manifest.
pub struct FabricSource {
    minecraft_version: String,
    loader_version: String,
    mapping: String,
    profile_url: String,
}

impl FabricSource {
    pub fn new(
        minecraft_version: &str,
        loader_version: &str,
        mapping: &str,
        profile_url: &str,
    ) -> Self {
        Self {
            minecraft_version: minecraft_version.to_string(),
            loader_version: loader_version.to_string(),
            mapping: mapping.to_string(),
            profile_url: profile_url.to_string(),
        }
    }

    /// Profile endpoint with the loader and mapping as encoded query pairs.
    ///
    /// Yarn versions carry a `+` (`1.16.5+build.5`) that must not reach the
    /// server as a space.
    fn profile_request_url(&self) -> LauncherResult<reqwest::Url> {
        reqwest::Url::parse_with_params(
            &self.profile_url,
            &[
                ("format", "profileJson"),
                ("loader", self.loader_version.as_str()),
                ("yarn", self.mapping.as_str()),
            ],
        )
        .map_err(|e| {
            LauncherError::Other(format!(
                "invalid Fabric profile endpoint {}: {}",
                self.profile_url, e
            ))
        })
    }
}

#[async_trait]
impl ManifestSource for FabricSource {
    fn version_id(&self) -> String {
        format!("{}-fabric-{}", self.minecraft_version, self.loader_version)
    }

    async fn fetch(&self, client: &reqwest::Client) -> LauncherResult<String> {
        info!(
            "Fetching Fabric {} profile for Minecraft {}",
            self.loader_version, self.minecraft_version
        );
        let url = self.profile_request_url()?;
        fetch_text(client, url.as_str()).await
    }
}
