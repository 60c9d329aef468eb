pub mod settings;

pub use settings::{Endpoints, LauncherPaths, LauncherSettings};
