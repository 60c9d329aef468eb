use std::path::{Path, PathBuf};

use tracing::{error, warn};

use crate::core::instance::Instance;

/// Crash diagnostics for a launch that stopped with an unclean status.
pub trait CrashReporter: Send + Sync {
    fn report(&self, instance: &Instance, exit_code: i32);
}

/// Logs the exit status and the newest file in `<game>/crash-reports`.
pub struct LogCrashReporter;

impl CrashReporter for LogCrashReporter {
    fn report(&self, instance: &Instance, exit_code: i32) {
        error!("Minecraft crashed with status {}", exit_code);
        match newest_crash_report(&instance.crash_reports_dir()) {
            Some(report) => error!("Crash report: {:?}", report),
            None => warn!("No crash report was written, see the output above"),
        }
    }
}

/// Most recently modified file in `dir`.
pub fn newest_crash_report(dir: &Path) -> Option<PathBuf> {
    std::fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| {
            let modified = entry.metadata().and_then(|m| m.modified()).ok()?;
            Some((modified, entry.path()))
        })
        .max_by_key(|(modified, _)| *modified)
        .map(|(_, path)| path)
}
