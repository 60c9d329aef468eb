// ─── Launch Manifest ───
// Parses a version JSON / loader profile and merges inheritance chains.

use serde::Deserialize;

use super::library::{HostPlatform, Library};
use crate::core::error::{LauncherError, LauncherResult};

const VANILLA_CLIENT_MAIN: &str = "net.minecraft.client.main.Main";
const VANILLA_SERVER_MAIN: &str = "net.minecraft.server.Main";

/// A parsed launch manifest (vanilla version JSON or loader profile).
///
/// Never mutated once resolved: merging returns a new value.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LaunchManifest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub main_class: String,
    #[serde(default)]
    pub inherits_from: Option<String>,
    #[serde(default)]
    pub libraries: Vec<Library>,
    #[serde(default)]
    pub downloads: Option<VersionDownloads>,
    #[serde(default)]
    pub asset_index: Option<AssetIndexInfo>,
    /// Asset index id, e.g. `1.16`.
    #[serde(default)]
    pub assets: Option<String>,
    #[serde(default)]
    pub arguments: Option<Arguments>,
    /// Legacy `minecraftArguments` field (pre-1.13).
    #[serde(default)]
    pub minecraft_arguments: Option<String>,
    /// `release`, `snapshot`, ...
    #[serde(default, rename = "type")]
    pub release_type: Option<String>,
    #[serde(default)]
    pub java_version: Option<JavaVersionInfo>,
    /// Id of the root of the inheritance chain, set by merging.
    #[serde(skip)]
    pub base_version: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JavaVersionInfo {
    pub major_version: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct VersionDownloads {
    pub client: Option<DownloadArtifact>,
    pub server: Option<DownloadArtifact>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DownloadArtifact {
    #[serde(default)]
    pub sha1: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetIndexInfo {
    pub id: String,
    pub url: String,
    #[serde(default)]
    pub sha1: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Arguments {
    #[serde(default)]
    pub game: Vec<serde_json::Value>,
    #[serde(default)]
    pub jvm: Vec<serde_json::Value>,
}

impl LaunchManifest {
    /// Parse and validate a raw manifest. `source` names it in errors.
    pub fn parse(raw: &str, source: &str) -> LauncherResult<Self> {
        let manifest: LaunchManifest = serde_json::from_str(raw)
            .map_err(|e| LauncherError::InvalidManifest(source.to_string(), e.to_string()))?;

        if manifest.main_class.trim().is_empty() {
            return Err(LauncherError::InvalidManifest(
                source.to_string(),
                "missing mainClass".into(),
            ));
        }
        Ok(manifest)
    }

    /// Merge with `parent`, producing the effective manifest.
    ///
    /// Non-empty scalars of `self` win. Lists are `self`'s entries followed by
    /// the parent's entries not already present in `self`.
    pub fn merged_with(&self, parent: &LaunchManifest) -> LaunchManifest {
        LaunchManifest {
            id: pick_str(&self.id, &parent.id),
            main_class: if self.main_class.trim().is_empty() {
                parent.main_class.clone()
            } else {
                self.main_class.clone()
            },
            inherits_from: pick_str(&self.inherits_from, &parent.inherits_from),
            libraries: merge_by(&self.libraries, &parent.libraries, |l| l.name.as_str()),
            downloads: self.downloads.clone().or_else(|| parent.downloads.clone()),
            asset_index: self.asset_index.clone().or_else(|| parent.asset_index.clone()),
            assets: pick_str(&self.assets, &parent.assets),
            arguments: merge_arguments(&self.arguments, &parent.arguments),
            minecraft_arguments: pick_str(&self.minecraft_arguments, &parent.minecraft_arguments),
            release_type: pick_str(&self.release_type, &parent.release_type),
            java_version: self.java_version.clone().or_else(|| parent.java_version.clone()),
            base_version: parent
                .base_version
                .clone()
                .or_else(|| non_empty(&parent.id)),
        }
    }

    /// The vanilla version this manifest ultimately runs.
    pub fn minecraft_version(&self) -> String {
        non_empty(&self.base_version)
            .or_else(|| non_empty(&self.inherits_from))
            .or_else(|| non_empty(&self.id))
            .unwrap_or_default()
    }

    /// File name of the game archive, `<version>.jar`.
    pub fn jar_name(&self) -> String {
        format!("{}.jar", self.minecraft_version())
    }

    /// Asset index id (`assets`, falling back to `assetIndex.id`).
    pub fn asset_index_id(&self) -> String {
        non_empty(&self.assets)
            .or_else(|| self.asset_index.as_ref().map(|ai| ai.id.clone()))
            .unwrap_or_else(|| "legacy".into())
    }

    pub fn release_type(&self) -> &str {
        self.release_type.as_deref().unwrap_or("release")
    }

    /// Libraries that apply to `host`.
    pub fn required_libraries_for(&self, host: &HostPlatform) -> Vec<&Library> {
        self.libraries
            .iter()
            .filter(|lib| lib.is_allowed_for(host))
            .collect()
    }

    /// Libraries that apply to the current OS/architecture.
    pub fn required_libraries(&self) -> Vec<&Library> {
        self.required_libraries_for(&HostPlatform::current())
    }

    /// The game argument template as a single space separated string.
    ///
    /// Uses the legacy `minecraftArguments` when present, otherwise the plain
    /// and rule-allowed entries of `arguments.game`.
    pub fn launch_args_template(&self, host: &HostPlatform) -> String {
        if let Some(legacy) = non_empty(&self.minecraft_arguments) {
            return legacy;
        }

        match &self.arguments {
            Some(args) => args
                .game
                .iter()
                .flat_map(|value| extract_argument_values(value, host))
                .collect::<Vec<_>>()
                .join(" "),
            None => String::new(),
        }
    }

    /// Entry point for dedicated servers started from the client archive.
    pub fn server_main_class(&self) -> String {
        if self.main_class == VANILLA_CLIENT_MAIN {
            return VANILLA_SERVER_MAIN.to_string();
        }
        self.main_class.replace("Client", "Server")
    }
}

fn non_empty(value: &Option<String>) -> Option<String> {
    value.as_ref().filter(|s| !s.trim().is_empty()).cloned()
}

fn pick_str(child: &Option<String>, parent: &Option<String>) -> Option<String> {
    non_empty(child).or_else(|| parent.clone())
}

fn merge_by<'a, T: Clone, K: PartialEq>(
    child: &'a [T],
    parent: &'a [T],
    key: impl Fn(&'a T) -> K,
) -> Vec<T> {
    let mut merged = child.to_vec();
    for entry in parent {
        if !child.iter().any(|own| key(own) == key(entry)) {
            merged.push(entry.clone());
        }
    }
    merged
}

fn merge_arguments(child: &Option<Arguments>, parent: &Option<Arguments>) -> Option<Arguments> {
    match (child, parent) {
        (Some(c), Some(p)) => Some(Arguments {
            game: merge_by(&c.game, &p.game, |v| v.clone()),
            jvm: merge_by(&c.jvm, &p.jvm, |v| v.clone()),
        }),
        (Some(c), None) => Some(c.clone()),
        (None, p) => p.clone(),
    }
}

fn extract_argument_values(value: &serde_json::Value, host: &HostPlatform) -> Vec<String> {
    if let Some(arg) = value.as_str() {
        return vec![arg.to_string()];
    }

    let Some(obj) = value.as_object() else {
        return vec![];
    };

    if let Some(rules) = obj.get("rules").and_then(|r| r.as_array()) {
        if !rules_allow(rules, host) {
            return vec![];
        }
    }

    match obj.get("value") {
        Some(serde_json::Value::String(s)) => vec![s.clone()],
        Some(serde_json::Value::Array(arr)) => arr
            .iter()
            .filter_map(|v| v.as_str().map(ToString::to_string))
            .collect(),
        _ => vec![],
    }
}

/// Argument rules; feature-gated rules never match since no features are enabled.
fn rules_allow(rules: &[serde_json::Value], host: &HostPlatform) -> bool {
    let mut allowed = false;

    for rule in rules {
        let action = rule
            .get("action")
            .and_then(|v| v.as_str())
            .unwrap_or("disallow");

        if rule.get("features").is_some() {
            continue;
        }

        let os = rule.get("os");
        let name_ok = os
            .and_then(|os| os.get("name"))
            .and_then(|name| name.as_str())
            .map_or(true, |name| name == host.os);
        let arch_ok = os
            .and_then(|os| os.get("arch"))
            .and_then(|arch| arch.as_str())
            .map_or(true, |arch| arch == host.arch);

        if name_ok && arch_ok {
            allowed = action == "allow";
        }
    }

    allowed
}
