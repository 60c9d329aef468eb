use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::auth::Credentials;

/// Platforms an instance can target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Vanilla,
    Fabric,
    Forge,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Vanilla => write!(f, "vanilla"),
            Platform::Fabric => write!(f, "fabric"),
            Platform::Forge => write!(f, "forge"),
        }
    }
}

/// Kind of package the instance was created from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum PackageType {
    #[default]
    Modpack,
    Mod,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Package {
    pub name: String,
    /// Empty for local packages that were never published.
    #[serde(default)]
    pub version: String,
    pub platform: Platform,
    #[serde(default, rename = "type")]
    pub package_type: PackageType,
}

/// Pinned fabric loader + mapping channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FabricLock {
    pub fabric_loader: String,
    pub mapping: String,
}

/// Resolved requirements of an instance.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Lockfile {
    pub minecraft: String,
    #[serde(default)]
    pub fabric: Option<FabricLock>,
}

impl Lockfile {
    pub fn vanilla(minecraft: impl Into<String>) -> Self {
        Self {
            minecraft: minecraft.into(),
            fabric: None,
        }
    }

    pub fn fabric(
        minecraft: impl Into<String>,
        loader: impl Into<String>,
        mapping: impl Into<String>,
    ) -> Self {
        Self {
            minecraft: minecraft.into(),
            fabric: Some(FabricLock {
                fabric_loader: loader.into(),
                mapping: mapping.into(),
            }),
        }
    }
}

/// One addressable installation.
///
/// Each instance lives in its own folder with:
/// - `minecraft/`: game working directory (.minecraft equivalent)
/// - `minecraft/server.properties`, `minecraft/eula.txt` for servers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instance {
    pub path: PathBuf,
    pub package: Package,
    pub lockfile: Lockfile,
    /// Only needed for client launches.
    #[serde(skip)]
    pub credentials: Option<Credentials>,
}

impl Instance {
    pub fn new(path: PathBuf, package: Package, lockfile: Lockfile) -> Self {
        Self {
            path,
            package,
            lockfile,
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn platform(&self) -> &Platform {
        &self.package.platform
    }

    pub fn minecraft_version(&self) -> &str {
        &self.lockfile.minecraft
    }

    /// Path to the instance's `minecraft/` game working directory.
    pub fn game_dir(&self) -> PathBuf {
        self.path.join("minecraft")
    }

    pub fn server_properties_path(&self) -> PathBuf {
        self.game_dir().join("server.properties")
    }

    pub fn eula_path(&self) -> PathBuf {
        self.game_dir().join("eula.txt")
    }

    pub fn crash_reports_dir(&self) -> PathBuf {
        self.game_dir().join("crash-reports")
    }

    /// Human readable `name@version (platform)` description.
    pub fn describe(&self) -> String {
        if self.package.version.is_empty() {
            format!("{} ({})", self.package.name, self.package.platform)
        } else {
            format!(
                "{}@{} ({})",
                self.package.name, self.package.version, self.package.platform
            )
        }
    }

    /// Directory an instance created from a release is placed in.
    pub fn dir_for_release(instances_dir: &Path, package: &Package) -> PathBuf {
        instances_dir.join(format!("{}_{}", package.name, package.platform))
    }
}
