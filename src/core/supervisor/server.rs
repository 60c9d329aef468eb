// ─── Dedicated Server Setup ───
// EULA acceptance and best-effort registration of the running server.

use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::Instance;

pub const EULA_CONTENTS: &str = "# generated by packlaunch\n\
# https://account.mojang.com/documents/minecraft_eula\n\
eula=true\n";

/// Write `eula.txt` accepting the Minecraft EULA.
pub async fn write_eula(path: &Path) -> LauncherResult<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| LauncherError::io(parent, e))?;
    }
    tokio::fs::write(path, EULA_CONTENTS)
        .await
        .map_err(|e| LauncherError::io(path, e))
}

#[derive(Debug, Serialize)]
struct ServerMapping {
    platform: String,
    id: String,
}

/// Announce the server so players can join without setup.
///
/// Only published packages are registered, and never in offline mode.
/// Failures are logged, not returned.
pub async fn register_server(
    client: &reqwest::Client,
    endpoint: &str,
    api_token: Option<&str>,
    instance: &Instance,
    offline: bool,
) -> bool {
    let package = &instance.package;
    if package.version.is_empty() || offline {
        return false;
    }

    let mapping = ServerMapping {
        platform: package.platform.to_string(),
        id: format!("{}@{}", package.name, package.version),
    };

    let mut request = client.post(endpoint).json(&mapping);
    if let Some(token) = api_token {
        request = request.bearer_auth(token);
    }

    match request.send().await.and_then(|r| r.error_for_status()) {
        Ok(_) => {
            info!("Registered server as {}", mapping.id);
            true
        }
        Err(e) => {
            warn!("Could not register server, try again later: {}", e);
            false
        }
    }
}
