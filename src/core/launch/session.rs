// ─── Launch Session ───
// Resolve → prepare files → build command → supervise, for one launch.

use std::path::PathBuf;

use tracing::{debug, info};

use super::classpath::{build_classpath, join_classpath};
use super::command::{
    check_credentials, CommandBuilder, LaunchCommand, LaunchOptions, RuntimeLayout,
};
use super::libraries::{ensure_game_jar, ensure_libraries, game_jar_path, launch_files};
use super::natives::{extract_natives, NativesDir};
use crate::core::assets::AssetManager;
use crate::core::downloader::Downloader;
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::http::build_http_client;
use crate::core::instance::{Instance, Platform};
use crate::core::java::{select_java_binary, JavaRuntimes};
use crate::core::loaders::ManifestResolver;
use crate::core::state::{LauncherPaths, LauncherSettings};
use crate::core::supervisor::{
    register_server, write_eula, ConnectProbe, CrashReporter, OfflineGuard, Supervised, Supervisor,
};
use crate::core::version::{HostPlatform, LaunchManifest};

/// Java major assumed when the manifest does not name one.
const DEFAULT_JAVA_MAJOR: u32 = 8;

/// Result of a launch that did not fail.
#[derive(Debug)]
pub enum LaunchOutcome {
    /// The game ran and stopped cleanly.
    Exited { status: i32 },
    /// The server came up, accepted a connection and was stopped again.
    CrashTestPassed { attempts: u32 },
    /// Debug mode: the command was assembled but not run. The natives
    /// directory lives as long as this value.
    Debug {
        command: LaunchCommand,
        natives_dir: NativesDir,
    },
}

impl LaunchOutcome {
    /// Exit status for the launcher process.
    pub fn exit_code(&self) -> i32 {
        0
    }
}

/// Exit status for the launcher process after `result`.
pub fn exit_code_for(result: &LauncherResult<LaunchOutcome>) -> i32 {
    match result {
        Ok(outcome) => outcome.exit_code(),
        Err(err) => err.exit_code(),
    }
}

pub struct Launcher {
    paths: LauncherPaths,
    settings: LauncherSettings,
    client: reqwest::Client,
    downloader: Downloader,
    host: HostPlatform,
}

impl Launcher {
    pub fn new(paths: LauncherPaths, settings: LauncherSettings) -> LauncherResult<Self> {
        let client = build_http_client()?;
        Ok(Self::with_client(paths, settings, client))
    }

    pub fn with_client(
        paths: LauncherPaths,
        settings: LauncherSettings,
        client: reqwest::Client,
    ) -> Self {
        let downloader =
            Downloader::new(client.clone()).with_concurrency(settings.download_concurrency);
        Self {
            paths,
            settings,
            downloader,
            client,
            host: HostPlatform::current(),
        }
    }

    pub fn with_host(mut self, host: HostPlatform) -> Self {
        self.host = host;
        self
    }

    pub fn paths(&self) -> &LauncherPaths {
        &self.paths
    }

    pub fn settings(&self) -> &LauncherSettings {
        &self.settings
    }

    pub fn java_runtimes(&self) -> JavaRuntimes {
        JavaRuntimes::new(
            self.client.clone(),
            self.paths.runtimes_dir(),
            &self.settings.endpoints.java_runtimes,
        )
        .with_host(self.host)
    }

    pub fn resolver(&self) -> ManifestResolver {
        ManifestResolver::new(
            self.client.clone(),
            self.downloader.clone(),
            self.paths.versions_dir(),
            self.settings.endpoints.clone(),
        )
    }

    /// Launch `instance` with the default supervisor.
    pub async fn launch(
        &self,
        instance: &Instance,
        options: &LaunchOptions,
    ) -> LauncherResult<LaunchOutcome> {
        self.launch_with(instance, options, &Supervisor::new()).await
    }

    pub async fn launch_with<P, R>(
        &self,
        instance: &Instance,
        options: &LaunchOptions,
        supervisor: &Supervisor<P, R>,
    ) -> LauncherResult<LaunchOutcome>
    where
        P: ConnectProbe + 'static,
        R: CrashReporter,
    {
        preflight(instance, options)?;
        info!("Launching {}", instance.describe());
        info!("Instance location: {:?}", instance.path);

        let manifest = match &options.manifest {
            Some(manifest) => manifest.clone(),
            None => self.resolver().resolve(instance).await?,
        };

        if !options.skip_download {
            self.fetch_missing(&manifest).await?;
        }

        let natives_dir = NativesDir::create(&instance.package.name)?;
        let java = self.java_for(&manifest, options).await?;
        let layout = self.prepare_layout(&manifest, &natives_dir, java).await?;

        let command = CommandBuilder::new(&self.settings)
            .with_host(self.host)
            .build(&manifest, instance, options, &layout)?;

        if options.debug {
            info!("cmd: {}", command.display());
            info!("natives: {:?}", natives_dir.path());
            return Ok(LaunchOutcome::Debug {
                command,
                natives_dir,
            });
        }

        let game_dir = instance.game_dir();
        tokio::fs::create_dir_all(&game_dir)
            .await
            .map_err(|e| LauncherError::io(&game_dir, e))?;

        let offline = if options.is_server() {
            self.prepare_server(instance, options).await?
        } else {
            None
        };

        let outcome = supervisor
            .run(&command, instance, options.crash_test, offline)
            .await?;
        drop(natives_dir);

        Ok(match outcome {
            Supervised::Exited(status) => LaunchOutcome::Exited { status },
            Supervised::CrashTestPassed { attempts } => LaunchOutcome::CrashTestPassed { attempts },
        })
    }

    async fn fetch_missing(&self, manifest: &LaunchManifest) -> LauncherResult<()> {
        let libs_dir = self.paths.libraries_dir();
        ensure_libraries(
            &self.downloader,
            manifest,
            &self.host,
            &libs_dir,
            &self.settings.endpoints.libraries,
        )
        .await?;
        ensure_game_jar(&self.downloader, manifest, &self.paths.versions_dir()).await?;
        AssetManager::ensure_assets(
            &self.downloader,
            &self.client,
            manifest,
            &self.paths.assets_dir(),
            &self.settings.endpoints.resources,
        )
        .await
    }

    async fn prepare_layout(
        &self,
        manifest: &LaunchManifest,
        natives_dir: &NativesDir,
        java: PathBuf,
    ) -> LauncherResult<RuntimeLayout> {
        let libs_dir = self.paths.libraries_dir();
        let files = launch_files(manifest, &self.host, &self.settings.endpoints.libraries);
        let extracted = extract_natives(natives_dir, &libs_dir, &files).await?;
        debug!("Extracted {} native archives", extracted.len());

        let game_jar = game_jar_path(manifest, &self.paths.versions_dir());
        let entries = build_classpath(&libs_dir, &files, &game_jar);
        debug!("Classpath has {} entries", entries.len());

        Ok(RuntimeLayout {
            classpath: join_classpath(&entries),
            natives_dir: natives_dir.path().to_path_buf(),
            game_jar,
            assets_dir: self.paths.assets_dir(),
            java,
        })
    }

    /// Java for `manifest`, provisioning a managed runtime unless downloads are skipped.
    async fn java_for(
        &self,
        manifest: &LaunchManifest,
        options: &LaunchOptions,
    ) -> LauncherResult<PathBuf> {
        let major = manifest
            .java_version
            .as_ref()
            .map(|java| java.major_version)
            .unwrap_or(DEFAULT_JAVA_MAJOR);
        select_java_binary(
            options.java.as_deref(),
            self.settings.java_path.as_deref(),
            &self.java_runtimes(),
            major,
            !options.skip_download,
        )
        .await
    }

    /// EULA, registration and offline mode. Returns the guard to restore.
    async fn prepare_server(
        &self,
        instance: &Instance,
        options: &LaunchOptions,
    ) -> LauncherResult<Option<OfflineGuard>> {
        if self.settings.accept_eula {
            write_eula(&instance.eula_path()).await?;
        }

        register_server(
            &self.client,
            &self.settings.endpoints.server_registration,
            self.settings.api_token.as_deref(),
            instance,
            options.offline,
        )
        .await;

        if options.offline {
            return Ok(Some(
                OfflineGuard::apply(&instance.server_properties_path()).await?,
            ));
        }
        Ok(None)
    }
}

/// Configuration errors that need no network or disk access.
fn preflight(instance: &Instance, options: &LaunchOptions) -> LauncherResult<()> {
    if options.crash_test && !options.is_server() {
        return Err(LauncherError::CrashTestRequiresServer);
    }
    if *instance.platform() == Platform::Forge {
        return Err(LauncherError::UnsupportedPlatform(instance.platform().to_string()));
    }
    check_credentials(instance, options.mode)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::core::auth::Credentials;
    use crate::core::instance::{Lockfile, Package, PackageType};
    use crate::core::test_support::scratch_dir;

    const LINUX: HostPlatform = HostPlatform {
        os: "linux",
        arch: "x86_64",
    };

    fn manifest() -> LaunchManifest {
        serde_json::from_value(serde_json::json!({
            "id": "1.16.5",
            "mainClass": "net.minecraft.client.main.Main",
            "assets": "1.16",
            "minecraftArguments": "--username ${auth_player_name} --gameDir ${game_directory}",
            "libraries": [
                { "name": "com.mojang:brigadier:1.0.17" }
            ]
        }))
        .unwrap()
    }

    fn instance(root: &Path, platform: Platform) -> Instance {
        Instance::new(
            root.join("instance"),
            Package {
                name: "session-pack".into(),
                version: String::new(),
                platform,
                package_type: PackageType::Modpack,
            },
            Lockfile::vanilla("1.16.5"),
        )
    }

    fn launcher(root: &Path) -> Launcher {
        Launcher::with_client(
            LauncherPaths::new(root.join("data")),
            LauncherSettings {
                accept_eula: true,
                ..LauncherSettings::default()
            },
            reqwest::Client::new(),
        )
        .with_host(LINUX)
    }

    fn offline_options(mut options: LaunchOptions) -> LaunchOptions {
        options.skip_download = true;
        options.manifest = Some(manifest());
        options
    }

    #[tokio::test]
    async fn configuration_errors_fail_before_any_work() {
        let root = scratch_dir("session-config");
        let launcher = launcher(&root);

        let mut crash_client = offline_options(LaunchOptions::client());
        crash_client.crash_test = true;
        let err = launcher
            .launch(&instance(&root, Platform::Vanilla), &crash_client)
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::CrashTestRequiresServer));

        let err = launcher
            .launch(&instance(&root, Platform::Forge), &LaunchOptions::server())
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::UnsupportedPlatform(_)));

        let err = launcher
            .launch(&instance(&root, Platform::Vanilla), &LaunchOptions::client())
            .await
            .unwrap_err();
        assert!(matches!(err, LauncherError::NoCredentials));
        assert_eq!(exit_code_for(&Err(err)), 1);

        assert!(!root.join("data").exists());
        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn debug_mode_returns_command_without_spawning() {
        let root = scratch_dir("session-debug");
        let inst = instance(&root, Platform::Vanilla).with_credentials(Credentials::new(
            "token",
            Some(crate::core::auth::Profile {
                id: "id".into(),
                name: "Alex".into(),
            }),
        ));
        let mut options = offline_options(LaunchOptions::client());
        options.debug = true;

        let outcome = launcher(&root).launch(&inst, &options).await.unwrap();

        assert_eq!(outcome.exit_code(), 0);
        let LaunchOutcome::Debug {
            command,
            natives_dir,
        } = outcome
        else {
            panic!("expected debug outcome");
        };
        let natives = natives_dir.path().to_path_buf();
        assert!(natives.exists());
        assert!(command
            .args
            .contains(&format!("-Djava.library.path={}", natives.display())));
        let cp_index = command.args.iter().position(|a| a == "-cp").unwrap();
        let jar = root.join("data/versions/1.16.5/1.16.5.jar");
        assert!(command.args[cp_index + 1].ends_with(&*jar.to_string_lossy()));
        assert_eq!(command.args[cp_index + 2], "net.minecraft.client.main.Main");
        assert_eq!(
            &command.args[cp_index + 3..],
            ["--username", "Alex", "--gameDir", &*inst.game_dir().to_string_lossy()]
        );
        // Nothing was started, so the game directory was never needed.
        assert!(!inst.game_dir().exists());

        drop(natives_dir);
        assert!(!natives.exists());
        let _ = std::fs::remove_dir_all(&root);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn offline_server_launch_writes_eula_and_restores_properties() {
        use std::os::unix::fs::PermissionsExt;

        let root = scratch_dir("session-server");
        let inst = instance(&root, Platform::Vanilla);
        let props = inst.server_properties_path();
        std::fs::create_dir_all(inst.game_dir()).unwrap();
        std::fs::write(&props, "online-mode=true\n").unwrap();

        // Stands in for java: succeeds only if offline mode is active.
        let java = root.join("fake-java");
        std::fs::write(
            &java,
            "#!/bin/sh\ngrep -q online-mode=false server.properties || exit 5\nexit 0\n",
        )
        .unwrap();
        std::fs::set_permissions(&java, std::fs::Permissions::from_mode(0o755)).unwrap();

        let mut options = offline_options(LaunchOptions::server());
        options.offline = true;
        options.java = Some(PathBuf::from(&java));

        let outcome = launcher(&root).launch(&inst, &options).await.unwrap();

        assert!(matches!(outcome, LaunchOutcome::Exited { status: 0 }));
        assert_eq!(std::fs::read_to_string(&props).unwrap(), "online-mode=true\n");
        assert!(std::fs::read_to_string(inst.eula_path())
            .unwrap()
            .contains("eula=true"));
        let _ = std::fs::remove_dir_all(&root);
    }
}
