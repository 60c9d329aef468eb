// ─── Java Runtime ───
// Picks the java binary a launch runs with.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::provision::JavaRuntimes;
use crate::core::error::LauncherResult;

/// Platform-specific executable name inside a runtime's `bin/`.
fn java_executable() -> &'static str {
    if cfg!(target_os = "windows") {
        "java.exe"
    } else {
        "java"
    }
}

/// Java binary for a launch needing Java `major`: explicit override, the
/// configured path, `$JAVA_HOME/bin/java`, an installed managed runtime, a
/// freshly downloaded one when `allow_download`, and finally `java` from `PATH`.
pub async fn select_java_binary(
    explicit: Option<&Path>,
    configured: Option<&Path>,
    runtimes: &JavaRuntimes,
    major: u32,
    allow_download: bool,
) -> LauncherResult<PathBuf> {
    let java_home = std::env::var_os("JAVA_HOME")
        .filter(|home| !home.is_empty())
        .map(PathBuf::from);
    if let Some(java) = configured_java(explicit, configured, java_home.as_deref()) {
        return Ok(java);
    }

    if let Some(java) = runtimes.installed(major) {
        debug!("Using managed Java {}: {:?}", major, java);
        return Ok(java);
    }
    if allow_download {
        return runtimes.ensure(major).await;
    }

    warn!("No Java {} runtime available, falling back to PATH", major);
    Ok(PathBuf::from("java"))
}

/// The first java the user pointed at, if any.
fn configured_java(
    explicit: Option<&Path>,
    configured: Option<&Path>,
    java_home: Option<&Path>,
) -> Option<PathBuf> {
    if let Some(path) = explicit.filter(|p| !p.as_os_str().is_empty()) {
        return Some(path.to_path_buf());
    }
    if let Some(path) = configured.filter(|p| !p.as_os_str().is_empty()) {
        return Some(path.to_path_buf());
    }
    let candidate = java_home?.join("bin").join(java_executable());
    if candidate.exists() {
        debug!("Using java from JAVA_HOME: {:?}", candidate);
        return Some(candidate);
    }
    None
}
