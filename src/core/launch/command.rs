// ─── Command Builder ───
// Turns a resolved manifest plus the prepared runtime layout into a java
// invocation.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use tracing::debug;

use crate::core::auth::Profile;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::Instance;
use crate::core::state::LauncherSettings;
use crate::core::version::{HostPlatform, LaunchManifest};

/// Read by the in-game companion mod to join a server or open a save.
pub const COMPANION_ENV: &str = "MINEPKG_COMPANION_PLAY";

const G1_FLAGS: [&str; 6] = [
    "-XX:+UnlockExperimentalVMOptions",
    "-XX:+UseG1GC",
    "-XX:G1NewSizePercent=20",
    "-XX:G1ReservePercent=20",
    "-XX:MaxGCPauseMillis=50",
    "-XX:G1HeapRegionSize=32M",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LaunchMode {
    #[default]
    Client,
    Server,
}

/// Per-launch switches.
#[derive(Debug, Clone, Default)]
pub struct LaunchOptions {
    pub mode: LaunchMode,
    /// Do not fetch missing libraries or assets.
    pub skip_download: bool,
    /// Print the command instead of running it.
    pub debug: bool,
    /// Run the server with `online-mode=false` for this launch only.
    pub offline: bool,
    pub crash_test: bool,
    /// `host[:port]` to join once the client is up.
    pub join_server: Option<String>,
    /// Save to open once the client is up.
    pub start_save: Option<String>,
    /// Java binary to use instead of the configured or managed one.
    pub java: Option<PathBuf>,
    /// Skip resolution and use this manifest.
    pub manifest: Option<LaunchManifest>,
}

impl LaunchOptions {
    pub fn client() -> Self {
        Self::default()
    }

    pub fn server() -> Self {
        Self {
            mode: LaunchMode::Server,
            ..Self::default()
        }
    }

    pub fn is_server(&self) -> bool {
        self.mode == LaunchMode::Server
    }
}

/// Prepared on-disk layout the command points at.
#[derive(Debug, Clone)]
pub struct RuntimeLayout {
    /// Java binary the game runs with.
    pub java: PathBuf,
    pub classpath: String,
    pub natives_dir: PathBuf,
    pub game_jar: PathBuf,
    pub assets_dir: PathBuf,
}

/// A fully assembled process invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Added on top of the inherited environment.
    pub env: Vec<(String, String)>,
    pub current_dir: PathBuf,
    /// Servers read console commands from our stdin.
    pub inherit_stdin: bool,
}

impl LaunchCommand {
    pub fn to_command(&self) -> tokio::process::Command {
        let mut cmd = tokio::process::Command::new(&self.program);
        cmd.args(&self.args)
            .envs(self.env.iter().map(|(k, v)| (k, v)))
            .current_dir(&self.current_dir)
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .stdin(if self.inherit_stdin {
                Stdio::inherit()
            } else {
                Stdio::null()
            });
        cmd
    }

    /// Copy/paste friendly rendering for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.to_string_lossy().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Client launches need credentials with a game profile; servers need none.
pub fn check_credentials<'a>(
    instance: &'a Instance,
    mode: LaunchMode,
) -> LauncherResult<Option<(&'a str, &'a Profile)>> {
    if mode == LaunchMode::Server {
        return Ok(None);
    }
    let creds = instance
        .credentials
        .as_ref()
        .ok_or(LauncherError::NoCredentials)?;
    let profile = creds
        .selected_profile
        .as_ref()
        .ok_or(LauncherError::NoPaidAccount)?;
    Ok(Some((creds.access_token.as_str(), profile)))
}

pub struct CommandBuilder<'a> {
    settings: &'a LauncherSettings,
    host: HostPlatform,
}

impl<'a> CommandBuilder<'a> {
    pub fn new(settings: &'a LauncherSettings) -> Self {
        Self {
            settings,
            host: HostPlatform::current(),
        }
    }

    pub fn with_host(mut self, host: HostPlatform) -> Self {
        self.host = host;
        self
    }

    pub fn build(
        &self,
        manifest: &LaunchManifest,
        instance: &Instance,
        options: &LaunchOptions,
        layout: &RuntimeLayout,
    ) -> LauncherResult<LaunchCommand> {
        check_credentials(instance, options.mode)?;
        let game_dir = instance.game_dir();

        let mut args = Vec::new();
        if self.host.os == "osx" {
            args.push("-XstartOnFirstThread".to_string());
        }
        args.push("-Xss128M".to_string());
        args.push(format!("-Djava.library.path={}", layout.natives_dir.display()));
        args.push(format!(
            "-Dminecraft.launcher.brand={}",
            self.settings.launcher_brand
        ));
        args.push(format!(
            "-Dminecraft.launcher.version={}",
            env!("CARGO_PKG_VERSION")
        ));
        args.push(format!("-Dminecraft.client.jar={}", layout.game_jar.display()));
        args.extend(G1_FLAGS.iter().map(|f| f.to_string()));
        args.push("-XX:ErrorFile=./jvm-error.log".to_string());
        args.push("-cp".to_string());
        args.push(layout.classpath.clone());

        if options.is_server() {
            args.push(manifest.server_main_class());
            args.push("nogui".to_string());
        } else {
            args.push(manifest.main_class.clone());
            args.extend(self.game_arguments(manifest, instance, options.mode, &layout.assets_dir)?);
        }

        let mut env = Vec::new();
        if let Some(target) = options.start_save.as_deref().filter(|s| !s.is_empty()) {
            env.push((COMPANION_ENV.to_string(), format!("local://{}", target)));
        } else if let Some(target) = options.join_server.as_deref().filter(|s| !s.is_empty()) {
            env.push((COMPANION_ENV.to_string(), format!("server://{}", target)));
        }
        env.push(("PWD".to_string(), game_dir.to_string_lossy().to_string()));

        debug!("Java binary: {:?}", layout.java);

        Ok(LaunchCommand {
            program: layout.java.clone(),
            args,
            env,
            current_dir: game_dir,
            inherit_stdin: options.is_server(),
        })
    }

    /// The game argument template with every placeholder substituted.
    ///
    /// The template is split on whitespace first so substituted paths stay
    /// single arguments. Server launches substitute `server`, `0` and `none`
    /// for the account values.
    pub fn game_arguments(
        &self,
        manifest: &LaunchManifest,
        instance: &Instance,
        mode: LaunchMode,
        assets_dir: &Path,
    ) -> LauncherResult<Vec<String>> {
        let game_dir = instance.game_dir();
        let (player_name, uuid, access_token) = match check_credentials(instance, mode)? {
            Some((token, profile)) => (profile.name.as_str(), profile.id.as_str(), token),
            None => ("server", "0", "none"),
        };
        let values = Placeholders {
            player_name,
            uuid,
            access_token,
            version_name: manifest.minecraft_version(),
            game_directory: &game_dir,
            assets_root: assets_dir,
            assets_index_name: manifest.asset_index_id(),
            version_type: manifest.release_type(),
        };

        Ok(manifest
            .launch_args_template(&self.host)
            .split_whitespace()
            .map(|token| values.substitute(token))
            .collect())
    }
}

/// Values for `${...}` placeholders in game argument templates.
struct Placeholders<'a> {
    player_name: &'a str,
    uuid: &'a str,
    access_token: &'a str,
    version_name: String,
    game_directory: &'a Path,
    assets_root: &'a Path,
    assets_index_name: String,
    version_type: &'a str,
}

impl Placeholders<'_> {
    fn lookup(&self, key: &str) -> Option<String> {
        let value = match key {
            "auth_player_name" => self.player_name.to_string(),
            "version_name" => self.version_name.clone(),
            "game_directory" => self.game_directory.to_string_lossy().to_string(),
            "assets_root" => self.assets_root.to_string_lossy().to_string(),
            "assets_index_name" => self.assets_index_name.clone(),
            "auth_uuid" => self.uuid.to_string(),
            "auth_access_token" => self.access_token.to_string(),
            "user_type" => "mojang".to_string(),
            "version_type" => self.version_type.to_string(),
            _ => return None,
        };
        Some(value)
    }

    /// Single pass: substituted values are never rescanned. Unknown
    /// placeholders are left as they are.
    fn substitute(&self, template: &str) -> String {
        let mut out = String::with_capacity(template.len());
        let mut rest = template;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            match after.find('}') {
                Some(end) => {
                    let key = &after[..end];
                    match self.lookup(key) {
                        Some(value) => out.push_str(&value),
                        None => out.push_str(&rest[start..start + 2 + end + 1]),
                    }
                    rest = &after[end + 1..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }
        out.push_str(rest);
        out
    }
}
