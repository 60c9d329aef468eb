// ─── Process Supervisor ───
// Runs the game process, races it against interrupts and the crash-test
// watchdog, and classifies how it stopped.

pub mod crash;
pub mod process;
pub mod server;
pub mod server_props;
pub mod shutdown;
pub mod watchdog;

use std::future::Future;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{oneshot, watch};
use tracing::{debug, info, warn};

use crate::core::error::{LauncherError, LauncherResult};
use crate::core::instance::Instance;
use crate::core::launch::LaunchCommand;

pub use crash::{CrashReporter, LogCrashReporter};
pub use process::{effective_exit_code, is_clean_exit, ProcessHandle, RunState};
pub use server::{register_server, write_eula, EULA_CONTENTS};
pub use server_props::OfflineGuard;
pub use shutdown::{graceful_shutdown, ProcessControl, GRACE_PERIOD};
pub use watchdog::{run_crash_test, ConnectProbe, TcpProbe, WatchdogConfig};

/// How a supervised run ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Supervised {
    /// The process stopped cleanly with this status (0 or 130).
    Exited(i32),
    /// The server accepted a connection and was then stopped.
    CrashTestPassed { attempts: u32 },
}

enum First {
    Exit(Option<io::Result<i32>>),
    Watchdog(Option<LauncherResult<u32>>),
    Interrupt,
}

pub struct Supervisor<P = TcpProbe, R = LogCrashReporter> {
    probe: Arc<P>,
    watchdog: WatchdogConfig,
    reporter: R,
    grace: Duration,
    state: watch::Sender<RunState>,
}

impl Supervisor {
    pub fn new() -> Self {
        Self {
            probe: Arc::new(TcpProbe),
            watchdog: WatchdogConfig::default(),
            reporter: LogCrashReporter,
            grace: GRACE_PERIOD,
            state: watch::channel(RunState::Idle).0,
        }
    }
}

impl Default for Supervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl<P, R> Supervisor<P, R>
where
    P: ConnectProbe + 'static,
    R: CrashReporter,
{
    pub fn with_probe<Q: ConnectProbe + 'static>(
        self,
        probe: Q,
        config: WatchdogConfig,
    ) -> Supervisor<Q, R> {
        Supervisor {
            probe: Arc::new(probe),
            watchdog: config,
            reporter: self.reporter,
            grace: self.grace,
            state: self.state,
        }
    }

    pub fn with_reporter<S: CrashReporter>(self, reporter: S) -> Supervisor<P, S> {
        Supervisor {
            probe: self.probe,
            watchdog: self.watchdog,
            reporter,
            grace: self.grace,
            state: self.state,
        }
    }

    pub fn with_grace_period(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn state(&self) -> RunState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<RunState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: RunState) {
        debug!("Supervisor state: {:?}", state);
        self.state.send_replace(state);
    }

    /// Run `command` until it stops, reacting to Ctrl-C and SIGTERM.
    ///
    /// `offline` is restored once the process is gone, whatever the outcome.
    pub async fn run(
        &self,
        command: &LaunchCommand,
        instance: &Instance,
        crash_test: bool,
        offline: Option<OfflineGuard>,
    ) -> LauncherResult<Supervised> {
        self.run_until(command, instance, crash_test, offline, wait_for_interrupt())
            .await
    }

    /// Like [`Supervisor::run`] with a custom interrupt source.
    pub async fn run_until<F>(
        &self,
        command: &LaunchCommand,
        instance: &Instance,
        crash_test: bool,
        offline: Option<OfflineGuard>,
        interrupt: F,
    ) -> LauncherResult<Supervised>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let result = self.supervise(command, instance, crash_test, interrupt).await;

        if let Some(guard) = offline {
            if let Err(e) = guard.restore().await {
                warn!("Could not restore server.properties: {}", e);
            }
        }

        result
    }

    async fn supervise<F>(
        &self,
        command: &LaunchCommand,
        instance: &Instance,
        crash_test: bool,
        interrupt: F,
    ) -> LauncherResult<Supervised>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.set_state(RunState::Starting);
        let (handle, mut exit) = match process::spawn(command) {
            Ok(spawned) => spawned,
            Err(e) => {
                self.set_state(RunState::Failed);
                return Err(e);
            }
        };
        self.set_state(RunState::Running);

        let (interrupt_tx, mut interrupt_rx) = oneshot::channel::<()>();
        let interrupt_task = tokio::spawn(async move {
            interrupt.await;
            let _ = interrupt_tx.send(());
        });

        let (watchdog_tx, mut watchdog_rx) = oneshot::channel::<LauncherResult<u32>>();
        let watchdog_task = if crash_test {
            let probe = self.probe.clone();
            let config = self.watchdog.clone();
            Some(tokio::spawn(async move {
                let _ = watchdog_tx.send(run_crash_test(&*probe, &config).await);
            }))
        } else {
            drop(watchdog_tx);
            None
        };

        let first = tokio::select! {
            result = &mut exit => First::Exit(result.ok()),
            verdict = &mut watchdog_rx, if watchdog_task.is_some() => First::Watchdog(verdict.ok()),
            _ = &mut interrupt_rx => First::Interrupt,
        };
        interrupt_task.abort();

        match first {
            First::Exit(result) => {
                if let Some(task) = &watchdog_task {
                    task.abort();
                }
                let status = self.classify(result, instance);
                if !crash_test {
                    return status.map(Supervised::Exited);
                }
                match status {
                    Ok(code) | Err(LauncherError::ProcessCrashed(code)) => {
                        self.set_state(RunState::Failed);
                        Err(LauncherError::ExitedBeforeHealthy(code))
                    }
                    Err(e) => Err(e),
                }
            }
            First::Watchdog(verdict) => {
                let stopped = graceful_shutdown(&handle, &mut exit, self.grace).await;
                debug!("Server stopped after crash test: {:?}", stopped);
                match verdict {
                    Some(Ok(attempts)) => {
                        info!("Crash test passed. Server stopped");
                        self.set_state(RunState::StoppedClean);
                        Ok(Supervised::CrashTestPassed { attempts })
                    }
                    Some(Err(e)) => {
                        warn!("{}", e);
                        self.set_state(RunState::Failed);
                        Err(e)
                    }
                    None => {
                        self.set_state(RunState::Failed);
                        Err(LauncherError::Other("crash test watchdog stopped unexpectedly".into()))
                    }
                }
            }
            First::Interrupt => {
                info!("Interrupted, stopping minecraft");
                if let Some(task) = &watchdog_task {
                    task.abort();
                }
                let result = graceful_shutdown(&handle, &mut exit, self.grace).await;
                self.classify(result, instance).map(Supervised::Exited)
            }
        }
    }

    /// Map an observed exit to StoppedClean / StoppedCrash / Failed.
    fn classify(
        &self,
        result: Option<io::Result<i32>>,
        instance: &Instance,
    ) -> LauncherResult<i32> {
        let code = match result {
            Some(Ok(code)) => code,
            Some(Err(e)) => {
                self.set_state(RunState::Failed);
                return Err(LauncherError::Other(format!("waiting for minecraft failed: {}", e)));
            }
            None => {
                self.set_state(RunState::Failed);
                return Err(LauncherError::Other("lost track of the minecraft process".into()));
            }
        };

        if is_clean_exit(code) {
            info!("Minecraft stopped (status {})", code);
            self.set_state(RunState::StoppedClean);
            Ok(code)
        } else {
            self.set_state(RunState::StoppedCrash);
            self.reporter.report(instance, code);
            Err(LauncherError::ProcessCrashed(code))
        }
    }
}

/// Resolves on Ctrl-C or, on unix, SIGTERM. Never resolves if no handler
/// could be installed.
pub async fn wait_for_interrupt() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    result = ctrl_c => {
                        if let Err(err) = result {
                            warn!("ctrl-c handler failed: {}", err);
                            std::future::pending::<()>().await;
                        }
                    }
                    _ = sigterm.recv() => {}
                }
            }
            Err(err) => {
                warn!("failed to register SIGTERM handler, using ctrl-c only: {}", err);
                if ctrl_c.await.is_err() {
                    std::future::pending::<()>().await;
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = ctrl_c.await {
            warn!("ctrl-c handler failed: {}", err);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use std::net::SocketAddr;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicI32, AtomicU32, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::core::error::CRASH_TEST_EXIT_CODE;
    use crate::core::instance::{Lockfile, Package, PackageType, Platform};
    use crate::core::test_support::scratch_dir;

    #[derive(Default)]
    struct RecordingReporter {
        reports: AtomicU32,
        last_code: AtomicI32,
    }

    impl CrashReporter for Arc<RecordingReporter> {
        fn report(&self, _instance: &Instance, exit_code: i32) {
            self.reports.fetch_add(1, Ordering::SeqCst);
            self.last_code.store(exit_code, Ordering::SeqCst);
        }
    }

    struct FixedProbe {
        accept: bool,
    }

    #[async_trait]
    impl ConnectProbe for FixedProbe {
        type Conn = ();

        async fn connect(&self, _addr: SocketAddr) -> io::Result<()> {
            if self.accept {
                Ok(())
            } else {
                Err(io::Error::from(io::ErrorKind::ConnectionRefused))
            }
        }
    }

    fn fast_watchdog() -> WatchdogConfig {
        WatchdogConfig {
            initial_delay: Duration::from_millis(10),
            max_attempts: 3,
            connect_timeout: Duration::from_millis(100),
            settle_delay: Duration::from_millis(10),
            retry_delay: Duration::from_millis(10),
            ..WatchdogConfig::default()
        }
    }

    fn instance(root: PathBuf) -> Instance {
        Instance::new(
            root,
            Package {
                name: "test-server".into(),
                version: String::new(),
                platform: Platform::Vanilla,
                package_type: PackageType::Modpack,
            },
            Lockfile::vanilla("1.16.5"),
        )
    }

    fn sh(script: &str) -> LaunchCommand {
        LaunchCommand {
            program: PathBuf::from("/bin/sh"),
            args: vec!["-c".into(), script.into()],
            env: Vec::new(),
            current_dir: std::env::temp_dir(),
            inherit_stdin: false,
        }
    }

    fn never() -> std::future::Pending<()> {
        std::future::pending()
    }

    #[tokio::test]
    async fn zero_and_130_stop_cleanly_without_diagnostics() {
        let reporter = Arc::new(RecordingReporter::default());
        let supervisor = Supervisor::new().with_reporter(reporter.clone());
        let inst = instance(std::env::temp_dir());

        for code in [0, 130] {
            let outcome = supervisor
                .run_until(&sh(&format!("exit {}", code)), &inst, false, None, never())
                .await
                .unwrap();
            assert_eq!(outcome, Supervised::Exited(code));
            assert_eq!(supervisor.state(), RunState::StoppedClean);
        }
        assert_eq!(reporter.reports.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn other_statuses_are_crashes() {
        let reporter = Arc::new(RecordingReporter::default());
        let supervisor = Supervisor::new().with_reporter(reporter.clone());
        let inst = instance(std::env::temp_dir());

        let err = supervisor
            .run_until(&sh("exit 1"), &inst, false, None, never())
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::ProcessCrashed(1)));
        assert_eq!(supervisor.state(), RunState::StoppedCrash);
        assert_eq!(reporter.reports.load(Ordering::SeqCst), 1);
        assert_eq!(reporter.last_code.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn spawn_failure_leaves_supervisor_failed() {
        let supervisor = Supervisor::new();
        let cmd = LaunchCommand {
            program: PathBuf::from("/nonexistent/java"),
            ..sh("")
        };

        let err = supervisor
            .run_until(&cmd, &instance(std::env::temp_dir()), false, None, never())
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::Spawn { .. }));
        assert_eq!(supervisor.state(), RunState::Failed);
    }

    #[tokio::test]
    async fn interrupt_stops_the_process_gracefully() {
        let supervisor = Supervisor::new();
        let interrupt = tokio::time::sleep(Duration::from_millis(200));

        // sh exits 130 on SIGTERM through its trap.
        let outcome = supervisor
            .run_until(
                &sh("trap 'exit 130' TERM; while :; do sleep 0.05; done"),
                &instance(std::env::temp_dir()),
                false,
                None,
                interrupt,
            )
            .await
            .unwrap();

        assert_eq!(outcome, Supervised::Exited(130));
    }

    #[tokio::test]
    async fn healthy_server_passes_crash_test_and_is_stopped() {
        let supervisor = Supervisor::new().with_probe(FixedProbe { accept: true }, fast_watchdog());

        let outcome = supervisor
            .run_until(&sh("sleep 30"), &instance(std::env::temp_dir()), true, None, never())
            .await
            .unwrap();

        assert_eq!(outcome, Supervised::CrashTestPassed { attempts: 1 });
        assert_eq!(supervisor.state(), RunState::StoppedClean);
    }

    #[tokio::test]
    async fn unreachable_server_fails_crash_test_with_reserved_code() {
        let supervisor =
            Supervisor::new().with_probe(FixedProbe { accept: false }, fast_watchdog());

        let err = supervisor
            .run_until(&sh("sleep 30"), &instance(std::env::temp_dir()), true, None, never())
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::CrashTestFailed { attempts: 3, .. }));
        assert_eq!(err.exit_code(), CRASH_TEST_EXIT_CODE);
    }

    #[tokio::test]
    async fn server_exiting_before_healthy_is_a_failure() {
        let reporter = Arc::new(RecordingReporter::default());
        let config = WatchdogConfig {
            initial_delay: Duration::from_secs(5),
            ..fast_watchdog()
        };
        let supervisor = Supervisor::new()
            .with_probe(FixedProbe { accept: true }, config)
            .with_reporter(reporter.clone());

        let err = supervisor
            .run_until(&sh("exit 2"), &instance(std::env::temp_dir()), true, None, never())
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::ExitedBeforeHealthy(2)));
        assert_eq!(reporter.reports.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn offline_settings_are_restored_after_exit() {
        let root = scratch_dir("supervisor-offline");
        let inst = instance(root.clone());
        let props = inst.server_properties_path();
        std::fs::create_dir_all(props.parent().unwrap()).unwrap();
        std::fs::write(&props, "motd=hi\nonline-mode=true\n").unwrap();

        let guard = OfflineGuard::apply(&props).await.unwrap();
        let script = format!("grep -q online-mode=false '{}' || exit 7", props.display());

        let outcome = Supervisor::new()
            .run_until(&sh(&script), &inst, false, Some(guard), never())
            .await
            .unwrap();

        assert_eq!(outcome, Supervised::Exited(0));
        assert_eq!(std::fs::read_to_string(&props).unwrap(), "motd=hi\nonline-mode=true\n");
        let _ = std::fs::remove_dir_all(&root);
    }

    /// An instance under `root` with online-mode switched off.
    async fn offline_instance(root: &Path) -> (Instance, PathBuf, OfflineGuard) {
        let inst = instance(root.to_path_buf());
        let props = inst.server_properties_path();
        std::fs::create_dir_all(inst.game_dir()).unwrap();
        std::fs::write(&props, "online-mode=true\n").unwrap();
        let guard = OfflineGuard::apply(&props).await.unwrap();
        (inst, props, guard)
    }

    #[tokio::test]
    async fn offline_settings_are_restored_when_spawn_fails() {
        let root = scratch_dir("supervisor-offline-spawn");
        let (inst, props, guard) = offline_instance(&root).await;
        let cmd = LaunchCommand {
            program: PathBuf::from("/nonexistent/java"),
            ..sh("")
        };

        let err = Supervisor::new()
            .run_until(&cmd, &inst, false, Some(guard), never())
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::Spawn { .. }));
        assert_eq!(std::fs::read_to_string(&props).unwrap(), "online-mode=true\n");
        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn offline_settings_are_restored_after_a_crash() {
        let root = scratch_dir("supervisor-offline-crash");
        let (inst, props, guard) = offline_instance(&root).await;
        let reporter = Arc::new(RecordingReporter::default());

        let err = Supervisor::new()
            .with_reporter(reporter.clone())
            .run_until(&sh("exit 3"), &inst, false, Some(guard), never())
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::ProcessCrashed(3)));
        assert_eq!(reporter.reports.load(Ordering::SeqCst), 1);
        assert_eq!(std::fs::read_to_string(&props).unwrap(), "online-mode=true\n");
        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn failed_restore_keeps_the_crash_error() {
        let root = scratch_dir("supervisor-offline-lost");
        let (inst, props, guard) = offline_instance(&root).await;
        // The game directory disappears, so server.properties cannot be rewritten.
        let script = format!("rm -rf '{}'; exit 3", inst.game_dir().display());

        let err = Supervisor::new()
            .run_until(&sh(&script), &inst, false, Some(guard), never())
            .await
            .unwrap_err();

        assert!(matches!(err, LauncherError::ProcessCrashed(3)));
        assert!(!props.exists());
        let _ = std::fs::remove_dir_all(&root);
    }

    #[tokio::test]
    async fn interrupt_during_crash_test_stops_cleanly() {
        let reporter = Arc::new(RecordingReporter::default());
        let config = WatchdogConfig {
            initial_delay: Duration::from_secs(5),
            max_attempts: 10,
            ..fast_watchdog()
        };
        let supervisor = Supervisor::new()
            .with_probe(FixedProbe { accept: false }, config)
            .with_reporter(reporter.clone());
        let interrupt = tokio::time::sleep(Duration::from_millis(200));

        let outcome = supervisor
            .run_until(
                &sh("trap 'exit 130' TERM; while :; do sleep 0.05; done"),
                &instance(std::env::temp_dir()),
                true,
                None,
                interrupt,
            )
            .await
            .unwrap();

        assert_eq!(outcome, Supervised::Exited(130));
        assert_eq!(supervisor.state(), RunState::StoppedClean);
        assert_eq!(reporter.reports.load(Ordering::SeqCst), 0);
    }
}
