use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{debug, info};

use crate::core::downloader::{DownloadEntry, Downloader};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::fetch_text;
use crate::core::version::LaunchManifest;

/// Top-level asset index JSON structure.
#[derive(Debug, Deserialize)]
pub struct AssetIndex {
    pub objects: HashMap<String, AssetObject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AssetObject {
    pub hash: String,
    pub size: u64,
}

impl AssetObject {
    /// `objects/<hash[0..2]>/<hash>`, relative to the assets directory.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from("objects")
            .join(hash_prefix(&self.hash))
            .join(&self.hash)
    }

    pub fn url(&self, resources_base: &str) -> String {
        object_url(resources_base, &self.hash)
    }
}

fn hash_prefix(hash: &str) -> &str {
    hash.get(..2).unwrap_or(hash)
}

fn object_url(resources_base: &str, hash: &str) -> String {
    format!(
        "{}/{}/{}",
        resources_base.trim_end_matches('/'),
        hash_prefix(hash),
        hash
    )
}

/// An asset object absent from the shared cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingAsset {
    /// Logical path, e.g. `minecraft/sounds/ambient/cave/cave1.ogg`.
    pub name: String,
    pub hash: String,
    pub path: PathBuf,
}

/// Manages Minecraft asset downloads (sounds, textures referenced by asset index).
pub struct AssetManager;

impl AssetManager {
    /// Load the asset index of `manifest`, fetching and caching it under
    /// `<assets>/indexes/<id>.json` when absent.
    pub async fn load_index(
        client: &reqwest::Client,
        manifest: &LaunchManifest,
        assets_dir: &Path,
    ) -> LauncherResult<AssetIndex> {
        let index_id = manifest.asset_index_id();
        let index_path = assets_dir.join("indexes").join(format!("{}.json", index_id));

        if index_path.exists() {
            debug!("Using cached asset index {:?}", index_path);
            let raw = tokio::fs::read_to_string(&index_path)
                .await
                .map_err(|e| LauncherError::io(&index_path, e))?;
            return Ok(serde_json::from_str(&raw)?);
        }

        let info = manifest.asset_index.as_ref().ok_or_else(|| {
            LauncherError::InvalidManifest(
                manifest.minecraft_version(),
                "no assetIndex to fetch".into(),
            )
        })?;

        let raw = fetch_text(client, &info.url).await?;
        let index: AssetIndex = serde_json::from_str(&raw)?;

        if let Some(parent) = index_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }
        tokio::fs::write(&index_path, &raw)
            .await
            .map_err(|e| LauncherError::io(&index_path, e))?;

        info!(
            "Cached asset index {} ({} objects)",
            index_id,
            index.objects.len()
        );
        Ok(index)
    }

    /// Asset objects of `index` not yet present under `assets_dir`, sorted by name.
    pub fn missing_in(index: &AssetIndex, assets_dir: &Path) -> Vec<MissingAsset> {
        let mut missing: Vec<MissingAsset> = index
            .objects
            .iter()
            .filter_map(|(name, obj)| {
                let path = assets_dir.join(obj.relative_path());
                (!path.exists()).then(|| MissingAsset {
                    name: name.clone(),
                    hash: obj.hash.clone(),
                    path,
                })
            })
            .collect();
        missing.sort_by(|a, b| a.name.cmp(&b.name));
        missing
    }

    /// Report asset objects that still need downloading. Only the index may
    /// be fetched; objects are not.
    pub async fn missing_assets(
        client: &reqwest::Client,
        manifest: &LaunchManifest,
        assets_dir: &Path,
    ) -> LauncherResult<Vec<MissingAsset>> {
        let index = Self::load_index(client, manifest, assets_dir).await?;
        Ok(Self::missing_in(&index, assets_dir))
    }

    /// Download every missing asset object, SHA-1 validated against its hash.
    pub async fn ensure_assets(
        downloader: &Downloader,
        client: &reqwest::Client,
        manifest: &LaunchManifest,
        assets_dir: &Path,
        resources_base: &str,
    ) -> LauncherResult<()> {
        let index = Self::load_index(client, manifest, assets_dir).await?;
        let missing = Self::missing_in(&index, assets_dir);

        info!(
            "Downloading {} asset objects ({} already cached)",
            missing.len(),
            index.objects.len() - missing.len()
        );
        if missing.is_empty() {
            return Ok(());
        }

        let entries = missing
            .into_iter()
            .map(|asset| DownloadEntry {
                url: object_url(resources_base, &asset.hash),
                sha1: Some(asset.hash),
                dest: asset.path,
            })
            .collect();

        downloader.download_all(entries).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::scratch_dir;

    const HELLO_SHA1: &str = "2aae6c35c94fcfb415dbe95f408b9ce91ee846ed";
    const OTHER_SHA1: &str = "bf1c5bd4c5fe3ad1ac4bd1b3ac1b3a1de3d5c4e2";

    fn manifest_with_index(url: &str) -> LaunchManifest {
        serde_json::from_value(serde_json::json!({
            "id": "1.16.5",
            "mainClass": "net.minecraft.client.main.Main",
            "assets": "1.16",
            "assetIndex": { "id": "1.16", "url": url }
        }))
        .unwrap()
    }

    fn index_body() -> String {
        serde_json::json!({
            "objects": {
                "minecraft/lang/en_us.json": { "hash": HELLO_SHA1, "size": 11 },
                "minecraft/sounds/click.ogg": { "hash": OTHER_SHA1, "size": 3 }
            }
        })
        .to_string()
    }

    #[test]
    fn object_layout_is_content_addressed() {
        let obj = AssetObject {
            hash: HELLO_SHA1.into(),
            size: 11,
        };
        assert_eq!(
            obj.relative_path(),
            PathBuf::from("objects/2a").join(HELLO_SHA1)
        );
        assert_eq!(
            obj.url("https://resources.download.minecraft.net/"),
            format!("https://resources.download.minecraft.net/2a/{}", HELLO_SHA1)
        );
    }

    #[tokio::test]
    async fn missing_assets_fetches_index_once_and_reports_absent_objects() {
        let mut server = mockito::Server::new_async().await;
        let index = server
            .mock("GET", "/indexes/1.16.json")
            .with_status(200)
            .with_body(index_body())
            .expect(1)
            .create_async()
            .await;
        let assets = scratch_dir("assets-missing");
        let present = assets.join("objects").join("bf").join(OTHER_SHA1);
        std::fs::create_dir_all(present.parent().unwrap()).unwrap();
        std::fs::write(&present, b"ogg").unwrap();

        let client = reqwest::Client::new();
        let manifest = manifest_with_index(&format!("{}/indexes/1.16.json", server.url()));

        let missing = AssetManager::missing_assets(&client, &manifest, &assets)
            .await
            .unwrap();
        assert_eq!(missing.len(), 1);
        assert_eq!(missing[0].name, "minecraft/lang/en_us.json");
        assert!(!missing[0].path.exists());
        assert!(assets.join("indexes").join("1.16.json").exists());

        // Second call reads the cached index.
        AssetManager::missing_assets(&client, &manifest, &assets)
            .await
            .unwrap();
        index.assert_async().await;

        let _ = std::fs::remove_dir_all(&assets);
    }

    #[tokio::test]
    async fn ensure_assets_downloads_and_validates_objects() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/indexes/1.16.json")
            .with_status(200)
            .with_body(index_body())
            .create_async()
            .await;
        let object = server
            .mock("GET", format!("/res/2a/{}", HELLO_SHA1).as_str())
            .with_status(200)
            .with_body("hello world")
            .expect(1)
            .create_async()
            .await;
        let other = server
            .mock("GET", format!("/res/bf/{}", OTHER_SHA1).as_str())
            .expect(0)
            .create_async()
            .await;
        let assets = scratch_dir("assets-ensure");
        let present = assets.join("objects").join("bf").join(OTHER_SHA1);
        std::fs::create_dir_all(present.parent().unwrap()).unwrap();
        std::fs::write(&present, b"ogg").unwrap();

        let client = reqwest::Client::new();
        let downloader = Downloader::new(client.clone());
        let manifest = manifest_with_index(&format!("{}/indexes/1.16.json", server.url()));
        let resources = format!("{}/res", server.url());

        AssetManager::ensure_assets(&downloader, &client, &manifest, &assets, &resources)
            .await
            .unwrap();
        object.assert_async().await;
        other.assert_async().await;

        let fetched = assets.join("objects").join("2a").join(HELLO_SHA1);
        assert_eq!(std::fs::read(&fetched).unwrap(), b"hello world");
        assert!(AssetManager::missing_assets(&client, &manifest, &assets)
            .await
            .unwrap()
            .is_empty());

        let _ = std::fs::remove_dir_all(&assets);
    }
}
