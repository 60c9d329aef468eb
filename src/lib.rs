pub mod core;

use tracing_subscriber::EnvFilter;

pub use crate::core::error::{LauncherError, LauncherResult, CRASH_TEST_EXIT_CODE};
pub use crate::core::instance::{Instance, Platform};
pub use crate::core::launch::{exit_code_for, LaunchMode, LaunchOptions, LaunchOutcome, Launcher};
pub use crate::core::state::{LauncherPaths, LauncherSettings};

/// Initialize structured logging. `RUST_LOG` overrides the default filter.
///
/// Safe to call more than once; later calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,packlaunch=debug")),
        )
        .try_init();

    tracing::debug!("packlaunch {} logging initialised", env!("CARGO_PKG_VERSION"));
}
