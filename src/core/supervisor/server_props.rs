// ─── Offline Mode ───
// Temporarily flips `online-mode` in server.properties for one launch.

use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::core::error::{LauncherError, LauncherResult};

/// Stands in for a missing file so the next normal start is online again.
const DEFAULT_PROPERTIES: &[u8] = b"online-mode=true\n";

/// Snapshot of `server.properties` taken before forcing offline mode.
///
/// Must be given back through [`OfflineGuard::restore`]. Nothing restores
/// the file if the supervisor itself dies.
#[derive(Debug)]
#[must_use = "the original server.properties is only written back by restore()"]
pub struct OfflineGuard {
    path: PathBuf,
    original: Vec<u8>,
}

impl OfflineGuard {
    /// Rewrite `path` with `online-mode=false`, remembering its bytes.
    ///
    /// Only a missing file counts as "no properties yet"; any other read
    /// failure leaves the file alone and is returned.
    pub async fn apply(path: &Path) -> LauncherResult<Self> {
        let original = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => DEFAULT_PROPERTIES.to_vec(),
            Err(e) => return Err(LauncherError::io(path, e)),
        };

        let rewritten = set_property(&String::from_utf8_lossy(&original), "online-mode", "false");
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| LauncherError::io(parent, e))?;
        }
        tokio::fs::write(path, rewritten)
            .await
            .map_err(|e| LauncherError::io(path, e))?;

        info!("Starting server in offline mode");
        Ok(Self {
            path: path.to_path_buf(),
            original,
        })
    }

    /// Write the original bytes back.
    pub async fn restore(self) -> LauncherResult<()> {
        tokio::fs::write(&self.path, &self.original)
            .await
            .map_err(|e| LauncherError::io(&self.path, e))?;
        debug!("Restored {:?}", self.path);
        Ok(())
    }
}

/// Set `key=value` in properties text, keeping every other line as is.
fn set_property(contents: &str, key: &str, value: &str) -> String {
    let mut found = false;
    let mut lines: Vec<String> = contents
        .lines()
        .map(|line| {
            let trimmed = line.trim_start();
            let is_key = !trimmed.starts_with('#')
                && trimmed
                    .split_once('=')
                    .is_some_and(|(k, _)| k.trim() == key);
            if is_key && !found {
                found = true;
                format!("{}={}", key, value)
            } else {
                line.to_string()
            }
        })
        .collect();

    if !found {
        lines.push(format!("{}={}", key, value));
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
