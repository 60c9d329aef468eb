pub mod classpath;
pub mod command;
pub mod libraries;
pub mod natives;
pub mod session;

pub use classpath::{build_classpath, classpath_separator, join_classpath};
pub use command::{
    check_credentials, CommandBuilder, LaunchCommand, LaunchMode, LaunchOptions, RuntimeLayout,
    COMPANION_ENV,
};
pub use libraries::{ensure_libraries, missing_libraries, required_libraries};
pub use natives::{extract_natives, NativesDir};
pub use session::{exit_code_for, LaunchOutcome, Launcher};
