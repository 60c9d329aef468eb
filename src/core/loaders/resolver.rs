// ─── Manifest Resolver ───
// Cache-first lookup of launch manifests plus inheritance merging.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::Instance;
use crate::core::state::Endpoints;
use crate::core::version::LaunchManifest;

use super::source::Source;

/// Resolves the effective launch manifest of an instance.
///
/// Manifests are cached at `versions/<id>/<id>.json`; a cached manifest is
/// never refetched.
pub struct ManifestResolver {
    client: reqwest::Client,
    downloader: Downloader,
    versions_dir: PathBuf,
    endpoints: Endpoints,
}

impl ManifestResolver {
    pub fn new(
        client: reqwest::Client,
        downloader: Downloader,
        versions_dir: PathBuf,
        endpoints: Endpoints,
    ) -> Self {
        Self {
            client,
            downloader,
            versions_dir,
            endpoints,
        }
    }

    /// Resolve and fully merge the manifest for `instance`.
    pub async fn resolve(&self, instance: &Instance) -> LauncherResult<LaunchManifest> {
        let source = Source::for_instance(instance, &self.endpoints)?;
        let mut seen = vec![source.version_id()];
        let mut chain = vec![self.load_or_fetch(&source).await?];

        // Walk up to the root; parents are always vanilla manifests.
        while let Some(parent_id) = chain
            .last()
            .and_then(|m| m.inherits_from.clone())
            .filter(|id| !id.trim().is_empty())
        {
            if seen.contains(&parent_id) {
                return Err(LauncherError::InheritanceCycle(parent_id));
            }
            debug!("{} inherits from {}", seen.join(" <- "), parent_id);

            let parent = Source::vanilla(&parent_id, &self.endpoints);
            chain.push(self.load_or_fetch(&parent).await?);
            seen.push(parent_id);
        }

        let mut levels = chain.into_iter().rev();
        let root = levels.next().ok_or_else(|| {
            LauncherError::Other("manifest chain is empty".into())
        })?;
        let effective = levels.fold(root, |parent, child| child.merged_with(&parent));

        info!(
            "Resolved {} (Minecraft {}, {} libraries)",
            seen[0],
            effective.minecraft_version(),
            effective.libraries.len()
        );
        Ok(effective)
    }

    fn manifest_path(&self, id: &str) -> PathBuf {
        self.versions_dir.join(id).join(format!("{}.json", id))
    }

    async fn load_or_fetch(&self, source: &Source) -> LauncherResult<LaunchManifest> {
        let id = source.version_id();
        let path = self.manifest_path(&id);

        if path.exists() {
            debug!("Using cached manifest {:?}", path);
            let raw = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| LauncherError::io(&path, e))?;
            return LaunchManifest::parse(&raw, &id);
        }

        let raw = source.fetch(&self.client).await?;
        let manifest = LaunchManifest::parse(&raw, &id)?;
        write_cached(&path, &raw).await?;
        info!("Cached manifest {}", id);

        if source.is_vanilla() {
            self.cache_game_jar(&manifest, &id).await?;
        }

        Ok(manifest)
    }

    /// Store the client archive of a vanilla manifest at `versions/<id>/<id>.jar`.
    async fn cache_game_jar(&self, manifest: &LaunchManifest, id: &str) -> LauncherResult<()> {
        let Some(client) = manifest.downloads.as_ref().and_then(|d| d.client.as_ref()) else {
            debug!("{} declares no client download", id);
            return Ok(());
        };

        let jar = self.versions_dir.join(id).join(format!("{}.jar", id));
        if jar.exists() {
            return Ok(());
        }

        self.downloader
            .download_file(&client.url, &jar, client.sha1.as_deref())
            .await?;
        info!("Downloaded {}.jar", id);
        Ok(())
    }
}

async fn write_cached(path: &Path, raw: &str) -> LauncherResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| LauncherError::io(parent, e))?;
    }
    tokio::fs::write(path, raw)
        .await
        .map_err(|e| LauncherError::io(path, e))
}
