// ─── Release Resolution ───
// Interface to the package registry that maps a query to a release.

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use super::model::{Instance, Lockfile, Package, Platform};
use crate::core::error::LauncherResult;

/// What the operator asked for, e.g. `desire-paths` for fabric on `1.16.x`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PackageQuery {
    pub name: String,
    pub platform: Platform,
    /// Minecraft version requirement, `*` for any.
    pub minecraft: String,
    /// Release version requirement, `latest` for the newest one.
    pub version: String,
}

/// A resolved release of a package.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Release {
    pub package: Package,
    pub lockfile: Lockfile,
}

#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("Project {0} does not exist")]
    ProjectNotFound(String),
    #[error("Project {project} has no release for {platform}")]
    NoReleaseForPlatform { project: String, platform: String },
    #[error("Project {project} has no release for Minecraft {minecraft}")]
    NoReleaseForMinecraftVersion { project: String, minecraft: String },
    #[error("Project {project} has no release matching {requirement}")]
    NoReleaseForVersionRequirement {
        project: String,
        requirement: String,
    },
}

impl ReleaseError {
    pub fn hint(&self) -> &'static str {
        match self {
            ReleaseError::ProjectNotFound(_) => "Check the spelling of the project name.",
            ReleaseError::NoReleaseForPlatform { .. } => {
                "The project does not support this platform yet."
            }
            ReleaseError::NoReleaseForMinecraftVersion { .. } => {
                "Try a different Minecraft version requirement."
            }
            ReleaseError::NoReleaseForVersionRequirement { .. } => {
                "Loosen the version requirement or use `latest`."
            }
        }
    }
}

/// Registry lookup, supplied by the caller.
#[async_trait]
pub trait ReleaseResolver: Send + Sync {
    async fn resolve(&self, query: &PackageQuery) -> Result<Release, ReleaseError>;
}

impl Instance {
    /// Create (or reuse) the instance directory for a resolved release.
    pub async fn from_release(release: Release, instances_dir: &Path) -> LauncherResult<Self> {
        let path = Instance::dir_for_release(instances_dir, &release.package);
        let game_dir = path.join("minecraft");
        tokio::fs::create_dir_all(&game_dir)
            .await
            .map_err(|e| crate::core::error::LauncherError::io(&game_dir, e))?;

        info!(
            "Instance for {}@{} at {:?}",
            release.package.name, release.package.version, path
        );
        Ok(Instance::new(path, release.package, release.lockfile))
    }
}

/// Resolve a query through the registry and materialize its instance.
pub async fn instance_for_query(
    resolver: &dyn ReleaseResolver,
    query: &PackageQuery,
    instances_dir: &Path,
) -> LauncherResult<Instance> {
    let release = resolver.resolve(query).await?;
    Instance::from_release(release, instances_dir).await
}
