use async_trait::async_trait;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::{Instance, Platform};
use crate::core::state::Endpoints;

use super::{fabric::FabricSource, vanilla::VanillaSource};

/// Somewhere a raw launch manifest can be fetched from.
#[async_trait]
pub trait ManifestSource: Send + Sync {
    /// Version id the manifest is cached under.
    fn version_id(&self) -> String;

    /// Fetch the raw manifest body. Not cached, not validated.
    async fn fetch(&self, client: &reqwest::Client) -> LauncherResult<String>;
}

/// Static dispatch over the supported sources.
pub enum Source {
    Vanilla(VanillaSource),
    Fabric(FabricSource),
}

impl Source {
    /// Pick the source for `instance`. Forge is recognised but not launchable.
    pub fn for_instance(instance: &Instance, endpoints: &Endpoints) -> LauncherResult<Self> {
        let minecraft = instance.minecraft_version();
        match instance.platform() {
            Platform::Vanilla => Ok(Self::vanilla(minecraft, endpoints)),
            Platform::Fabric => {
                let lock = instance
                    .lockfile
                    .fabric
                    .as_ref()
                    .ok_or_else(|| LauncherError::MissingFabricLock(instance.describe()))?;
                Ok(Self::Fabric(FabricSource::new(
                    minecraft,
                    &lock.fabric_loader,
                    &lock.mapping,
                    &endpoints.fabric_profile,
                )))
            }
            Platform::Forge => Err(LauncherError::UnsupportedPlatform(
                instance.platform().to_string(),
            )),
        }
    }

    pub fn vanilla(version: &str, endpoints: &Endpoints) -> Self {
        Self::Vanilla(VanillaSource::new(version, &endpoints.version_catalog))
    }

    pub fn is_vanilla(&self) -> bool {
        matches!(self, Source::Vanilla(_))
    }

    pub fn version_id(&self) -> String {
        match self {
            Source::Vanilla(s) => s.version_id(),
            Source::Fabric(s) => s.version_id(),
        }
    }

    pub async fn fetch(&self, client: &reqwest::Client) -> LauncherResult<String> {
        match self {
            Source::Vanilla(s) => s.fetch(client).await,
            Source::Fabric(s) => s.fetch(client).await,
        }
    }
}
