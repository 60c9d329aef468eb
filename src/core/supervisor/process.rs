// ─── Game Process ───
// Spawns the launch command and reports its exit through a one-shot slot.

use std::io;
use std::process::ExitStatus;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use super::shutdown::{ExitSlot, ProcessControl};
use crate::core::error::{LauncherError, LauncherResult};
use crate::core::launch::LaunchCommand;

/// Lifecycle of a supervised launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Starting,
    Running,
    StoppedClean,
    StoppedCrash,
    Failed,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::StoppedClean | RunState::StoppedCrash | RunState::Failed
        )
    }
}

/// Exit code 130 is what an interrupted game reports.
pub fn is_clean_exit(code: i32) -> bool {
    code == 0 || code == 130
}

/// The exit code, or `128 + signal` for a process killed by a signal.
pub fn effective_exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    1
}

/// Handle on a spawned process. The child itself is owned by its exit-wait task.
pub struct ProcessHandle {
    pid: Option<u32>,
    kill_tx: mpsc::UnboundedSender<()>,
}

impl ProcessHandle {
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }
}

impl ProcessControl for ProcessHandle {
    #[cfg(unix)]
    fn request_graceful(&self) -> bool {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let Some(pid) = self.pid else {
            return false;
        };
        match kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to send SIGTERM to {}: {}", pid, e);
                false
            }
        }
    }

    #[cfg(not(unix))]
    fn request_graceful(&self) -> bool {
        false
    }

    fn force_kill(&self) {
        if self.kill_tx.send(()).is_err() {
            debug!("Process already reaped, nothing to kill");
        }
    }
}

/// Spawn `command` and start its exit-wait task.
pub fn spawn(command: &LaunchCommand) -> LauncherResult<(ProcessHandle, ExitSlot)> {
    info!("Launching: {}", command.display());

    let mut child = command
        .to_command()
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| LauncherError::Spawn {
            program: command.program.to_string_lossy().to_string(),
            source,
        })?;

    let pid = child.id();
    debug!("Started process {:?}", pid);

    let (kill_tx, mut kill_rx) = mpsc::unbounded_channel::<()>();
    let (exit_tx, exit_rx) = oneshot::channel::<io::Result<i32>>();

    tokio::spawn(async move {
        let status = loop {
            tokio::select! {
                status = child.wait() => break status,
                request = kill_rx.recv() => match request {
                    Some(()) => {
                        if let Err(e) = child.start_kill() {
                            warn!("Could not kill minecraft: {}", e);
                        }
                    }
                    None => break child.wait().await,
                },
            }
        };
        let _ = exit_tx.send(status.map(effective_exit_code));
    });

    Ok((ProcessHandle { pid, kill_tx }, exit_rx))
}
