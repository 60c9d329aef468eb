// ─── Library Entries ───
// Library declarations of a launch manifest and their OS/arch rules.

use std::collections::HashMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::core::maven::MavenArtifact;

/// The OS/architecture a launch targets, in Mojang's naming.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostPlatform {
    /// `windows`, `osx` or `linux`.
    pub os: &'static str,
    /// `std::env::consts::ARCH` value, e.g. `x86_64`, `x86`, `aarch64`.
    pub arch: &'static str,
}

impl HostPlatform {
    pub fn current() -> Self {
        Self {
            os: current_os_name(),
            arch: std::env::consts::ARCH,
        }
    }

    /// `64` or `32`, substituted for `${arch}` in native classifiers.
    pub fn bitness(&self) -> &'static str {
        match self.arch {
            "x86" | "arm" => "32",
            _ => "64",
        }
    }
}

/// Get the Mojang OS name for the current platform.
fn current_os_name() -> &'static str {
    if cfg!(target_os = "windows") {
        "windows"
    } else if cfg!(target_os = "macos") {
        "osx"
    } else {
        "linux"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Library {
    pub name: String,
    #[serde(default)]
    pub downloads: Option<LibraryDownloads>,
    #[serde(default)]
    pub rules: Option<Vec<LibraryRule>>,
    /// OS name → classifier template, e.g. `"linux": "natives-linux"`.
    #[serde(default)]
    pub natives: Option<HashMap<String, String>>,
    /// Maven repository base for loader libraries without `downloads`.
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryDownloads {
    pub artifact: Option<LibDownloadArtifact>,
    #[serde(default)]
    pub classifiers: Option<HashMap<String, LibDownloadArtifact>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibDownloadArtifact {
    pub path: String,
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LibraryRule {
    pub action: RuleAction,
    #[serde(default)]
    pub os: Option<OsRule>,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Allow,
    Disallow,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OsRule {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
}

impl OsRule {
    fn matches(&self, host: &HostPlatform) -> bool {
        let name_ok = self.name.as_deref().map_or(true, |name| name == host.os);
        let arch_ok = self.arch.as_deref().map_or(true, |arch| arch == host.arch);
        name_ok && arch_ok
    }
}

/// A file on disk a launch needs, with where to fetch it from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryFile {
    /// Relative to the libraries directory.
    pub path: PathBuf,
    pub url: String,
    pub sha1: Option<String>,
    pub native: bool,
}

impl Library {
    /// Evaluate whether this library applies to `host`.
    ///
    /// No rules means allowed. Otherwise start disallowed and let every rule
    /// whose constraint matches set the state, top to bottom.
    pub fn is_allowed_for(&self, host: &HostPlatform) -> bool {
        let rules = match &self.rules {
            Some(r) if !r.is_empty() => r,
            _ => return true,
        };

        let mut allowed = false;
        for rule in rules {
            let matches = rule.os.as_ref().map_or(true, |os| os.matches(host));
            if matches {
                allowed = rule.action == RuleAction::Allow;
            }
        }
        allowed
    }

    /// Native classifier for `host`, with `${arch}` expanded.
    pub fn native_classifier_for(&self, host: &HostPlatform) -> Option<String> {
        self.natives
            .as_ref()?
            .get(host.os)
            .map(|classifier| classifier.replace("${arch}", host.bitness()))
    }

    /// The file this library contributes to the classpath on `host`.
    ///
    /// Native libraries contribute their classifier archive, everything else
    /// its main artifact. Libraries that declare neither a download nor their
    /// own repository are fetched from `default_repository`.
    pub fn launch_file(
        &self,
        host: &HostPlatform,
        default_repository: &str,
    ) -> Option<LibraryFile> {
        if let Some(classifier) = self.native_classifier_for(host) {
            return self.classifier_file(&classifier, default_repository);
        }
        self.artifact_file(default_repository)
    }

    fn artifact_file(&self, default_repository: &str) -> Option<LibraryFile> {
        if let Some(artifact) = self.downloads.as_ref().and_then(|d| d.artifact.as_ref()) {
            return Some(LibraryFile {
                path: PathBuf::from(&artifact.path),
                url: artifact.url.clone(),
                sha1: artifact.sha1.clone(),
                native: false,
            });
        }

        // Loader profiles only carry coordinates plus a repository.
        let coords = MavenArtifact::parse(&self.name).ok()?;
        Some(LibraryFile {
            path: coords.local_path(),
            url: coords.url(self.repository(default_repository)),
            sha1: None,
            native: false,
        })
    }

    fn classifier_file(&self, classifier: &str, default_repository: &str) -> Option<LibraryFile> {
        let declared = self
            .downloads
            .as_ref()
            .and_then(|d| d.classifiers.as_ref())
            .and_then(|c| c.get(classifier));

        if let Some(artifact) = declared {
            return Some(LibraryFile {
                path: PathBuf::from(&artifact.path),
                url: artifact.url.clone(),
                sha1: artifact.sha1.clone(),
                native: true,
            });
        }

        let coords = MavenArtifact::parse(&self.name).ok()?.with_classifier(classifier);
        Some(LibraryFile {
            path: coords.local_path(),
            url: coords.url(self.repository(default_repository)),
            sha1: None,
            native: true,
        })
    }

    fn repository<'a>(&'a self, default_repository: &'a str) -> &'a str {
        self.url.as_deref().unwrap_or(default_repository)
    }
}
