use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::maven::MOJANG_LIBRARIES;

const APP_DIR_NAME: &str = "packlaunch";
const SETTINGS_FILE: &str = "launcher_settings.json";
const HOME_ENV: &str = "PACKLAUNCH_HOME";
const API_TOKEN_ENV: &str = "PACKLAUNCH_API_TOKEN";
const DEFAULT_DOWNLOAD_CONCURRENCY: usize = 8;

/// Remote endpoints touched during a launch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub version_catalog: String,
    pub fabric_profile: String,
    pub resources: String,
    pub libraries: String,
    pub server_registration: String,
    /// Adoptium `assets/latest` base used for managed Java runtimes.
    pub java_runtimes: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            version_catalog: "https://piston-meta.mojang.com/mc/game/version_manifest_v2.json"
                .into(),
            fabric_profile: "https://fabricmc.net/download/vanilla".into(),
            resources: "https://resources.download.minecraft.net".into(),
            libraries: MOJANG_LIBRARIES.into(),
            server_registration: "https://api.minepkg.io/v1/server-mappings".into(),
            java_runtimes: "https://api.adoptium.net/v3/assets/latest".into(),
        }
    }
}

/// Persisted launcher preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LauncherSettings {
    /// Write `eula=true` before starting servers.
    pub accept_eula: bool,
    pub java_path: Option<PathBuf>,
    pub launcher_brand: String,
    pub api_token: Option<String>,
    /// Parallel transfers per download batch.
    pub download_concurrency: usize,
    pub endpoints: Endpoints,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            accept_eula: false,
            java_path: None,
            launcher_brand: APP_DIR_NAME.into(),
            api_token: None,
            download_concurrency: DEFAULT_DOWNLOAD_CONCURRENCY,
            endpoints: Endpoints::default(),
        }
    }
}

impl LauncherSettings {
    /// Load settings from `<data_dir>/launcher_settings.json`, falling back to defaults.
    ///
    /// `PACKLAUNCH_API_TOKEN` overrides the stored API token.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join(SETTINGS_FILE);
        let mut settings = match std::fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                warn!("Ignoring unreadable settings at {:?}: {}", path, e);
                LauncherSettings::default()
            }),
            Err(_) => LauncherSettings::default(),
        };

        if let Ok(token) = std::env::var(API_TOKEN_ENV) {
            if !token.trim().is_empty() {
                debug!("Using {} for authentication", API_TOKEN_ENV);
                settings.api_token = Some(token);
            }
        }

        settings
    }

    pub fn save(&self, data_dir: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(data_dir)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(data_dir.join(SETTINGS_FILE), json)
    }
}

/// Shared cache directories used by every instance.
#[derive(Debug, Clone)]
pub struct LauncherPaths {
    pub data_dir: PathBuf,
}

impl LauncherPaths {
    pub fn new(data_dir: PathBuf) -> Self {
        Self { data_dir }
    }

    /// `PACKLAUNCH_HOME` if set, otherwise the platform data dir.
    pub fn from_env() -> Self {
        match std::env::var_os(HOME_ENV) {
            Some(dir) if !dir.is_empty() => Self::new(PathBuf::from(dir)),
            _ => Self::new(default_data_dir()),
        }
    }

    pub fn libraries_dir(&self) -> PathBuf {
        self.data_dir.join("libraries")
    }

    pub fn assets_dir(&self) -> PathBuf {
        self.data_dir.join("assets")
    }

    pub fn versions_dir(&self) -> PathBuf {
        self.data_dir.join("versions")
    }

    pub fn instances_dir(&self) -> PathBuf {
        self.data_dir.join("instances")
    }

    /// Managed Java runtimes, one `java-<major>` directory each.
    pub fn runtimes_dir(&self) -> PathBuf {
        self.data_dir.join("runtimes")
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_settings_file_yields_defaults() {
        let dir = std::env::temp_dir().join(format!("settings-missing-{}", std::process::id()));
        let settings = LauncherSettings::load(&dir);
        assert!(!settings.accept_eula);
        assert_eq!(settings.launcher_brand, "packlaunch");
        assert!(settings.endpoints.version_catalog.ends_with("version_manifest_v2.json"));
    }

    #[test]
    fn partial_settings_keep_default_endpoints() {
        let dir = std::env::temp_dir().join(format!("settings-partial-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join(SETTINGS_FILE),
            r#"{"accept_eula": true, "endpoints": {"resources": "http://localhost/res"}}"#,
        )
        .unwrap();

        let settings = LauncherSettings::load(&dir);
        assert!(settings.accept_eula);
        assert_eq!(settings.endpoints.resources, "http://localhost/res");
        assert_eq!(settings.endpoints.libraries, MOJANG_LIBRARIES);
        assert_eq!(settings.download_concurrency, DEFAULT_DOWNLOAD_CONCURRENCY);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn cache_directories_live_under_data_dir() {
        let paths = LauncherPaths::new(PathBuf::from("/data"));
        assert_eq!(paths.versions_dir(), PathBuf::from("/data/versions"));
        assert_eq!(paths.libraries_dir(), PathBuf::from("/data/libraries"));
        assert_eq!(paths.assets_dir(), PathBuf::from("/data/assets"));
        assert_eq!(paths.runtimes_dir(), PathBuf::from("/data/runtimes"));
    }
}
