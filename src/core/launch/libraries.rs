// ─── Libraries ───
// Required / missing library files and fetching them into the shared cache.

use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::downloader::{DownloadEntry, Downloader};
use crate::core::error::LauncherResult;
use crate::core::version::{HostPlatform, LaunchManifest, Library, LibraryFile};

/// Libraries of `manifest` that apply to the current OS/architecture.
pub fn required_libraries(manifest: &LaunchManifest) -> Vec<&Library> {
    manifest.required_libraries()
}

/// The files the required libraries contribute on `host`, in manifest order.
///
/// `repository` serves libraries that name no download URL or repository.
pub fn launch_files(
    manifest: &LaunchManifest,
    host: &HostPlatform,
    repository: &str,
) -> Vec<LibraryFile> {
    manifest
        .required_libraries_for(host)
        .into_iter()
        .filter_map(|lib| {
            let file = lib.launch_file(host, repository);
            if file.is_none() {
                debug!("{} has no file for {}", lib.name, host.os);
            }
            file
        })
        .collect()
}

/// Required library files absent from `libs_dir`. Nothing is downloaded.
pub fn missing_libraries(
    manifest: &LaunchManifest,
    host: &HostPlatform,
    libs_dir: &Path,
    repository: &str,
) -> Vec<LibraryFile> {
    launch_files(manifest, host, repository)
        .into_iter()
        .filter(|file| !libs_dir.join(&file.path).exists())
        .collect()
}

/// Fetch every missing library of `manifest` into `libs_dir`.
pub async fn ensure_libraries(
    downloader: &Downloader,
    manifest: &LaunchManifest,
    host: &HostPlatform,
    libs_dir: &Path,
    repository: &str,
) -> LauncherResult<()> {
    let missing = missing_libraries(manifest, host, libs_dir, repository);
    if missing.is_empty() {
        debug!("All libraries present");
        return Ok(());
    }

    info!("Downloading {} missing libraries", missing.len());
    let entries = missing
        .into_iter()
        .map(|file| DownloadEntry {
            url: file.url,
            dest: libs_dir.join(&file.path),
            sha1: file.sha1,
        })
        .collect();
    downloader.download_all(entries).await
}

/// `versions/<mc>/<mc>.jar` of the chain root.
pub fn game_jar_path(manifest: &LaunchManifest, versions_dir: &Path) -> PathBuf {
    versions_dir
        .join(manifest.minecraft_version())
        .join(manifest.jar_name())
}

/// Fetch the game archive if a previous launch did not leave it behind.
pub async fn ensure_game_jar(
    downloader: &Downloader,
    manifest: &LaunchManifest,
    versions_dir: &Path,
) -> LauncherResult<()> {
    let jar = game_jar_path(manifest, versions_dir);
    if jar.exists() {
        return Ok(());
    }

    match manifest.downloads.as_ref().and_then(|d| d.client.as_ref()) {
        Some(client) => {
            downloader
                .download_file(&client.url, &jar, client.sha1.as_deref())
                .await
        }
        None => {
            debug!("No client download declared, expecting {:?} to exist", jar);
            Ok(())
        }
    }
}
