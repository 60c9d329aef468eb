// ─── Managed Java Runtimes ───
// Temurin runtimes downloaded into the launcher data dir, one per major version.

use std::path::{Component, Path, PathBuf};

use chrono::Utc;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::fetch_text;
use crate::core::version::HostPlatform;

const METADATA_FILE: &str = "runtime.json";

#[derive(Debug, Clone, Deserialize)]
struct AdoptiumRelease {
    binary: AdoptiumBinary,
    version: AdoptiumVersion,
}

#[derive(Debug, Clone, Deserialize)]
struct AdoptiumBinary {
    package: AdoptiumPackage,
}

#[derive(Debug, Clone, Deserialize)]
struct AdoptiumPackage {
    checksum: String,
    link: String,
    name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct AdoptiumVersion {
    openjdk_version: String,
}

/// Written next to an installed runtime.
#[derive(Debug, Serialize, Deserialize)]
struct RuntimeMetadata {
    major: u32,
    version: String,
    image_type: String,
    source_url: String,
    sha256: String,
    installed_at: String,
}

/// Installs and finds managed runtimes under `<data>/runtimes/java-<major>`.
pub struct JavaRuntimes {
    client: reqwest::Client,
    runtimes_dir: PathBuf,
    api_base: String,
    host: HostPlatform,
}

impl JavaRuntimes {
    pub fn new(client: reqwest::Client, runtimes_dir: PathBuf, api_base: &str) -> Self {
        Self {
            client,
            runtimes_dir,
            api_base: api_base.trim_end_matches('/').to_string(),
            host: HostPlatform::current(),
        }
    }

    pub fn with_host(mut self, host: HostPlatform) -> Self {
        self.host = host;
        self
    }

    pub fn runtime_dir(&self, major: u32) -> PathBuf {
        self.runtimes_dir.join(format!("java-{}", major))
    }

    /// The java binary of an already installed runtime.
    pub fn installed(&self, major: u32) -> Option<PathBuf> {
        let dir = self.runtime_dir(major);
        if !dir.join(METADATA_FILE).is_file() {
            return None;
        }
        let java = locate_java_binary(&dir);
        java.is_file().then_some(java)
    }

    /// The installed runtime for `major`, downloading it first if needed.
    pub async fn ensure(&self, major: u32) -> LauncherResult<PathBuf> {
        if let Some(java) = self.installed(major) {
            debug!("Using managed Java {} at {:?}", major, java);
            return Ok(java);
        }
        self.install(major).await
    }

    #[instrument(skip(self))]
    async fn install(&self, major: u32) -> LauncherResult<PathBuf> {
        let (image_type, release) = self.find_release(major).await?;
        let package = release.binary.package;
        info!(
            "Installing Java {} ({} {})",
            major, image_type, release.version.openjdk_version
        );

        tokio::fs::create_dir_all(&self.runtimes_dir)
            .await
            .map_err(|e| LauncherError::io(&self.runtimes_dir, e))?;
        let staging = tempfile::Builder::new()
            .prefix(&format!("java-{}-", major))
            .tempdir_in(&self.runtimes_dir)
            .map_err(|e| LauncherError::io(&self.runtimes_dir, e))?;

        let archive_name = Path::new(&package.name)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "runtime-archive".to_string());
        let archive = staging.path().join(&archive_name);
        download_with_sha256(&self.client, &package.link, &archive, &package.checksum).await?;

        let unpacked = staging.path().join("runtime");
        let (from, to) = (archive.clone(), unpacked.clone());
        tokio::task::spawn_blocking(move || extract_runtime(&from, &archive_name, &to))
            .await
            .map_err(|e| LauncherError::Other(format!("Task join error: {e}")))??;

        let java = locate_java_binary(&unpacked);
        if !java.is_file() {
            return Err(LauncherError::Other(format!(
                "{} contains no java binary",
                package.name
            )));
        }
        make_executable(&java)?;

        let metadata = RuntimeMetadata {
            major,
            version: release.version.openjdk_version,
            image_type: image_type.to_string(),
            source_url: package.link,
            sha256: package.checksum,
            installed_at: Utc::now().to_rfc3339(),
        };
        let metadata_path = unpacked.join(METADATA_FILE);
        tokio::fs::write(&metadata_path, serde_json::to_vec_pretty(&metadata)?)
            .await
            .map_err(|e| LauncherError::io(&metadata_path, e))?;

        let target = self.runtime_dir(major);
        if target.exists() {
            warn!("Replacing incomplete runtime at {:?}", target);
            tokio::fs::remove_dir_all(&target)
                .await
                .map_err(|e| LauncherError::io(&target, e))?;
        }
        tokio::fs::rename(&unpacked, &target)
            .await
            .map_err(|e| LauncherError::io(&target, e))?;

        let java = locate_java_binary(&target);
        info!("Java {} installed at {:?}", major, java);
        Ok(java)
    }

    /// Newest Temurin release for the host, JRE first, then JDK.
    async fn find_release(&self, major: u32) -> LauncherResult<(&'static str, AdoptiumRelease)> {
        let os = adoptium_os(&self.host);
        let arch = adoptium_arch(&self.host);

        for image_type in ["jre", "jdk"] {
            let url = reqwest::Url::parse_with_params(
                &format!("{}/{}/hotspot", self.api_base, major),
                &[("architecture", arch), ("image_type", image_type), ("os", os)],
            )
            .map_err(|e| LauncherError::Other(format!("invalid runtime endpoint: {}", e)))?;

            let body = match fetch_text(&self.client, url.as_str()).await {
                Ok(body) => body,
                Err(LauncherError::DownloadFailed { status: 404, .. }) => continue,
                Err(e) => return Err(e),
            };
            let releases: Vec<AdoptiumRelease> = serde_json::from_str(&body)?;
            if let Some(release) = releases.into_iter().next() {
                return Ok((image_type, release));
            }
            debug!("No Java {} {} for {}/{}", major, image_type, os, arch);
        }

        Err(LauncherError::NoJavaRuntime {
            major,
            os: os.to_string(),
            arch: arch.to_string(),
        })
    }
}

/// Adoptium's OS name for `host`.
fn adoptium_os(host: &HostPlatform) -> &'static str {
    match host.os {
        "osx" => "mac",
        other => other,
    }
}

/// Adoptium's architecture name for `host`.
fn adoptium_arch(host: &HostPlatform) -> &'static str {
    match host.arch {
        "x86_64" => "x64",
        other => other,
    }
}

async fn download_with_sha256(
    client: &reqwest::Client,
    url: &str,
    dest: &Path,
    expected: &str,
) -> LauncherResult<()> {
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(LauncherError::DownloadFailed {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }

    let mut file = tokio::fs::File::create(dest)
        .await
        .map_err(|e| LauncherError::io(dest, e))?;
    let mut hasher = Sha256::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        hasher.update(&chunk);
        file.write_all(&chunk)
            .await
            .map_err(|e| LauncherError::io(dest, e))?;
    }
    file.flush().await.map_err(|e| LauncherError::io(dest, e))?;

    let actual = hex::encode(hasher.finalize());
    if !actual.eq_ignore_ascii_case(expected) {
        let _ = tokio::fs::remove_file(dest).await;
        return Err(LauncherError::Sha256Mismatch {
            path: dest.to_path_buf(),
            expected: expected.to_string(),
            actual,
        });
    }
    Ok(())
}

/// Path inside the archive minus its top-level directory
/// (`jdk-17.0.8+7-jre/bin/java` → `bin/java`). `None` for the top directory
/// itself and for anything that is not a plain relative path.
fn strip_top_dir(path: &Path) -> Option<PathBuf> {
    let mut components = path.components();
    components.next()?;
    let mut rel = PathBuf::new();
    for component in components {
        match component {
            Component::Normal(part) => rel.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!rel.as_os_str().is_empty()).then_some(rel)
}

/// Unpack a `.zip` or `.tar.gz` runtime archive into `dest`.
fn extract_runtime(archive: &Path, name: &str, dest: &Path) -> LauncherResult<()> {
    std::fs::create_dir_all(dest).map_err(|e| LauncherError::io(dest, e))?;
    let file = std::fs::File::open(archive).map_err(|e| LauncherError::io(archive, e))?;

    if name.ends_with(".zip") {
        extract_zip(file, dest)
    } else if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
        extract_tar_gz(file, archive, dest)
    } else {
        Err(LauncherError::UnsupportedRuntimeArchive(name.to_string()))
    }
}

fn extract_zip(file: std::fs::File, dest: &Path) -> LauncherResult<()> {
    let mut zip = zip::ZipArchive::new(file)?;
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index)?;
        let Some(rel) = entry.enclosed_name().as_deref().and_then(strip_top_dir) else {
            continue;
        };
        let out_path = dest.join(rel);

        if entry.is_dir() {
            std::fs::create_dir_all(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
            continue;
        }
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let mut out =
            std::fs::File::create(&out_path).map_err(|e| LauncherError::io(&out_path, e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| LauncherError::io(&out_path, e))?;

        #[cfg(unix)]
        if let Some(mode) = entry.unix_mode() {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&out_path, std::fs::Permissions::from_mode(mode & 0o777))
                .map_err(|e| LauncherError::io(&out_path, e))?;
        }
    }
    Ok(())
}

fn extract_tar_gz(file: std::fs::File, archive: &Path, dest: &Path) -> LauncherResult<()> {
    let mut tar = tar::Archive::new(flate2::read::GzDecoder::new(file));
    let entries = tar.entries().map_err(|e| LauncherError::io(archive, e))?;
    for entry in entries {
        let mut entry = entry.map_err(|e| LauncherError::io(archive, e))?;
        let path = entry.path().map_err(|e| LauncherError::io(archive, e))?;
        let Some(rel) = strip_top_dir(&path) else {
            continue;
        };
        let out_path = dest.join(rel);
        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        entry
            .unpack(&out_path)
            .map_err(|e| LauncherError::io(&out_path, e))?;
    }
    Ok(())
}

fn java_exe() -> &'static str {
    if cfg!(windows) {
        "java.exe"
    } else {
        "java"
    }
}

/// `bin/java`, the macOS bundle layout, or the first java found below `root`.
fn locate_java_binary(root: &Path) -> PathBuf {
    let primary = root.join("bin").join(java_exe());
    if primary.is_file() {
        return primary;
    }

    let mac_layout = root.join("Contents").join("Home").join("bin").join(java_exe());
    if mac_layout.is_file() {
        return mac_layout;
    }

    find_java_binary_recursive(root).unwrap_or(primary)
}

fn find_java_binary_recursive(root: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(root).ok()?;
    for entry in entries.filter_map(Result::ok) {
        let path = entry.path();
        let file_type = entry.file_type().ok()?;

        if file_type.is_file() {
            let in_bin = path
                .parent()
                .and_then(|p| p.file_name())
                .is_some_and(|n| n == "bin");
            if in_bin && path.file_name().and_then(|n| n.to_str()) == Some(java_exe()) {
                return Some(path);
            }
        } else if file_type.is_dir() {
            if let Some(found) = find_java_binary_recursive(&path) {
                return Some(found);
            }
        }
    }
    None
}

fn make_executable(java: &Path) -> LauncherResult<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(java, std::fs::Permissions::from_mode(0o755))
            .map_err(|e| LauncherError::io(java, e))?;
    }
    #[cfg(not(unix))]
    let _ = java;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use mockito::Matcher;
    use zip::write::SimpleFileOptions;

    use super::*;
    use crate::core::test_support::scratch_dir;

    const LINUX: HostPlatform = HostPlatform {
        os: "linux",
        arch: "x86_64",
    };

    fn runtime_zip() -> Vec<u8> {
        let mut zip = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
        zip.add_directory("jdk-17.0.8+7-jre/bin/", SimpleFileOptions::default())
            .unwrap();
        zip.start_file("jdk-17.0.8+7-jre/bin/java", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"#!/bin/sh\n").unwrap();
        zip.start_file("jdk-17.0.8+7-jre/release", SimpleFileOptions::default())
            .unwrap();
        zip.write_all(b"JAVA_VERSION=\"17.0.8\"\n").unwrap();
        zip.finish().unwrap().into_inner()
    }

    fn sha256_hex(bytes: &[u8]) -> String {
        hex::encode(Sha256::digest(bytes))
    }

    fn release_json(link: &str, checksum: &str) -> String {
        serde_json::json!([{
            "binary": { "package": {
                "checksum": checksum,
                "link": link,
                "name": "OpenJDK17U-jre_x64_linux_hotspot_17.0.8_7.zip"
            } },
            "version": { "openjdk_version": "17.0.8+7" }
        }])
        .to_string()
    }

    fn runtimes(dir: PathBuf, server: &mockito::ServerGuard) -> JavaRuntimes {
        JavaRuntimes::new(reqwest::Client::new(), dir, &server.url()).with_host(LINUX)
    }

    #[test]
    fn top_level_directory_is_stripped() {
        assert_eq!(
            strip_top_dir(Path::new("jdk-17/bin/java")),
            Some(PathBuf::from("bin/java"))
        );
        assert_eq!(strip_top_dir(Path::new("jdk-17/")), None);
        assert_eq!(strip_top_dir(Path::new("jdk-17/../../etc/passwd")), None);
    }

    #[test]
    fn tar_gz_runtime_is_unpacked_without_top_dir() {
        let dir = scratch_dir("java-provision-tar");
        let archive = dir.join("OpenJDK21U-jre_x64_linux_hotspot.tar.gz");
        {
            let file = std::fs::File::create(&archive).unwrap();
            let enc = flate2::write::GzEncoder::new(file, flate2::Compression::default());
            let mut tar = tar::Builder::new(enc);
            let body = b"#!/bin/sh\n";
            let mut header = tar::Header::new_gnu();
            header.set_size(body.len() as u64);
            header.set_mode(0o755);
            header.set_cksum();
            tar.append_data(&mut header, "jdk-21.0.1+12-jre/bin/java", &body[..])
                .unwrap();
            tar.into_inner().unwrap().finish().unwrap();
        }
        let dest = dir.join("runtime");

        extract_runtime(&archive, "OpenJDK21U-jre_x64_linux_hotspot.tar.gz", &dest).unwrap();

        assert_eq!(locate_java_binary(&dest), dest.join("bin").join("java"));
        assert!(!dest.join("jdk-21.0.1+12-jre").exists());

        let err = extract_runtime(&archive, "runtime.7z", &dir.join("other")).unwrap_err();
        assert!(matches!(err, LauncherError::UnsupportedRuntimeArchive(_)));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn host_names_follow_adoptium() {
        let mac = HostPlatform {
            os: "osx",
            arch: "aarch64",
        };
        assert_eq!(adoptium_os(&mac), "mac");
        assert_eq!(adoptium_arch(&mac), "aarch64");
        assert_eq!(adoptium_arch(&LINUX), "x64");
    }

    #[tokio::test]
    async fn missing_runtime_is_downloaded_once_and_reused() {
        let dir = scratch_dir("java-provision");
        let archive = runtime_zip();
        let mut server = mockito::Server::new_async().await;
        let base = server.url();
        let api = server
            .mock("GET", "/17/hotspot")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("architecture".into(), "x64".into()),
                Matcher::UrlEncoded("image_type".into(), "jre".into()),
                Matcher::UrlEncoded("os".into(), "linux".into()),
            ]))
            .with_status(200)
            .with_body(release_json(
                &format!("{}/jre17.zip", base),
                &sha256_hex(&archive),
            ))
            .expect(1)
            .create_async()
            .await;
        let package = server
            .mock("GET", "/jre17.zip")
            .with_status(200)
            .with_body(archive)
            .expect(1)
            .create_async()
            .await;
        let runtimes = runtimes(dir.clone(), &server);
        assert!(runtimes.installed(17).is_none());

        let java = runtimes.ensure(17).await.unwrap();

        assert_eq!(java, dir.join("java-17").join("bin").join("java"));
        assert!(java.is_file());
        assert!(dir.join("java-17").join("release").is_file());
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&java).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }

        // Installed now: no further requests.
        assert_eq!(runtimes.ensure(17).await.unwrap(), java);
        api.assert_async().await;
        package.assert_async().await;
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn checksum_mismatch_installs_nothing() {
        let dir = scratch_dir("java-provision-mismatch");
        let mut server = mockito::Server::new_async().await;
        let base = server.url();
        server
            .mock("GET", "/17/hotspot")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(release_json(&format!("{}/jre17.zip", base), "00ff"))
            .create_async()
            .await;
        server
            .mock("GET", "/jre17.zip")
            .with_status(200)
            .with_body(runtime_zip())
            .create_async()
            .await;

        let runtimes = runtimes(dir.clone(), &server);
        let err = runtimes.ensure(17).await.unwrap_err();

        assert!(matches!(err, LauncherError::Sha256Mismatch { .. }));
        assert!(runtimes.installed(17).is_none());
        assert!(!dir.join("java-17").exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test]
    async fn no_release_for_host_is_reported() {
        let dir = scratch_dir("java-provision-none");
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/8/hotspot")
            .match_query(Matcher::UrlEncoded("image_type".into(), "jre".into()))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;
        server
            .mock("GET", "/8/hotspot")
            .match_query(Matcher::UrlEncoded("image_type".into(), "jdk".into()))
            .with_status(404)
            .create_async()
            .await;

        let err = runtimes(dir.clone(), &server).ensure(8).await.unwrap_err();

        match err {
            LauncherError::NoJavaRuntime { major, os, arch } => {
                assert_eq!((major, os.as_str(), arch.as_str()), (8, "linux", "x64"));
            }
            other => panic!("unexpected error: {other}"),
        }
        let _ = std::fs::remove_dir_all(&dir);
    }
}
