// ─── Graceful Shutdown ───
// Ask the process to stop, then force it after a grace period.

use std::io;
use std::time::Duration;

use tokio::sync::oneshot;
use tracing::{info, warn};

/// How long a process gets to react to the stop request.
pub const GRACE_PERIOD: Duration = Duration::from_secs(5);

/// Termination primitives of a running process.
pub trait ProcessControl {
    /// Politely ask the process to stop. `false` if the request could not be delivered.
    fn request_graceful(&self) -> bool;

    fn force_kill(&self);
}

/// Exit slot written once by the exit-wait task.
pub type ExitSlot = oneshot::Receiver<io::Result<i32>>;

/// Stop the process behind `control` and wait for its exit.
///
/// Force-kills exactly once when the stop request cannot be delivered or the
/// process outlives `grace`. Returns the exit result, or `None` if the
/// exit-wait task went away without reporting.
pub async fn graceful_shutdown<C: ProcessControl>(
    control: &C,
    exit: &mut ExitSlot,
    grace: Duration,
) -> Option<io::Result<i32>> {
    if !control.request_graceful() {
        warn!("Could not ask the process to stop, killing it");
        control.force_kill();
        return exit.await.ok();
    }

    match tokio::time::timeout(grace, &mut *exit).await {
        Ok(result) => result.ok(),
        Err(_) => {
            warn!("Timed out stopping minecraft after {:?}. Killing it", grace);
            control.force_kill();
            let result = exit.await.ok();
            info!("Process killed");
            result
        }
    }
}
