// ─── Natives ───
// Per-launch scratch directory holding unpacked native libraries.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::debug;

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::version::LibraryFile;

/// Ephemeral directory for one launch. Removed when dropped.
#[derive(Debug)]
pub struct NativesDir {
    dir: TempDir,
}

impl NativesDir {
    /// Create a fresh directory named after the package plus a unix timestamp.
    pub fn create(package_name: &str) -> LauncherResult<Self> {
        let prefix = format!(
            "{}{}",
            sanitize(package_name),
            chrono::Utc::now().timestamp()
        );
        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .tempdir()
            .map_err(|e| LauncherError::io(std::env::temp_dir().join(&prefix), e))?;
        debug!("Natives directory {:?}", dir.path());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Unpack `archive` into this directory, skipping `META-INF/`.
    pub async fn extract(&self, archive: &Path) -> LauncherResult<()> {
        let bytes = tokio::fs::read(archive)
            .await
            .map_err(|e| LauncherError::io(archive, e))?;

        let dest = self.path().to_path_buf();
        let source = archive.to_path_buf();
        tokio::task::spawn_blocking(move || unpack(bytes, &dest, &source))
            .await
            .map_err(|e| LauncherError::Other(format!("Task join error: {}", e)))?
    }
}

fn unpack(bytes: Vec<u8>, dest: &Path, source: &Path) -> LauncherResult<()> {
    let fail = |reason: String| LauncherError::NativeExtraction {
        path: source.to_path_buf(),
        reason,
    };

    let mut zip = zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| fail(e.to_string()))?;

    for i in 0..zip.len() {
        let mut entry = zip.by_index(i).map_err(|e| fail(e.to_string()))?;
        let Some(relative) = entry.enclosed_name() else {
            return Err(fail(format!("unsafe entry name {}", entry.name())));
        };
        if relative.starts_with("META-INF") {
            continue;
        }

        let target = dest.join(relative);
        if entry.is_dir() {
            std::fs::create_dir_all(&target).map_err(|e| LauncherError::io(&target, e))?;
            continue;
        }

        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent).map_err(|e| LauncherError::io(parent, e))?;
        }
        let mut out = std::fs::File::create(&target).map_err(|e| LauncherError::io(&target, e))?;
        std::io::copy(&mut entry, &mut out).map_err(|e| LauncherError::io(&target, e))?;
        debug!("Extracted native: {}", entry.name());
    }

    Ok(())
}

/// Unpack every native archive among `files` (relative to `libs_dir`).
///
/// Any failure aborts: a launch must not proceed with partial natives.
pub async fn extract_natives(
    natives: &NativesDir,
    libs_dir: &Path,
    files: &[LibraryFile],
) -> LauncherResult<Vec<PathBuf>> {
    let mut extracted = Vec::new();
    for file in files.iter().filter(|f| f.native) {
        let archive = libs_dir.join(&file.path);
        if !archive.exists() {
            return Err(LauncherError::NativeExtraction {
                path: archive,
                reason: "archive is missing".into(),
            });
        }
        natives.extract(&archive).await?;
        extracted.push(archive);
    }
    Ok(extracted)
}

fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
