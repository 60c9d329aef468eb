use std::path::PathBuf;
use thiserror::Error;

use crate::core::instance::ReleaseError;

/// Central error type for the launch pipeline.
/// Every module returns `Result<T, LauncherError>`.
#[derive(Debug, Error)]
pub enum LauncherError {
    // ── IO ──────────────────────────────────────────────
    #[error("IO error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    // ── Configuration ───────────────────────────────────
    #[error("Can only launch vanilla & fabric instances, not {0}")]
    UnsupportedPlatform(String),

    #[error("Can not launch without account credentials")]
    NoCredentials,

    #[error("The account has no game profile; a purchased copy is required to launch the client")]
    NoPaidAccount,

    #[error("Can only crash test servers")]
    CrashTestRequiresServer,

    #[error("{0} is a fabric instance without a pinned fabric loader")]
    MissingFabricLock(String),

    // ── Resolution ──────────────────────────────────────
    #[error("Minecraft version {0} not found in the version catalog")]
    VersionNotFound(String),

    #[error("Launch manifest for {0} is invalid: {1}")]
    InvalidManifest(String, String),

    #[error("Manifest inheritance loops back to {0}")]
    InheritanceCycle(String),

    #[error(transparent)]
    Release(#[from] ReleaseError),

    #[error("Invalid Maven coordinate: {0}")]
    InvalidMavenCoordinate(String),

    // ── Network ─────────────────────────────────────────
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Download failed for {url}: HTTP {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("SHA-1 mismatch for {path:?}: expected {expected}, got {actual}")]
    Sha1Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("SHA-256 mismatch for {path:?}: expected {expected}, got {actual}")]
    Sha256Mismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    // ── Java runtime ────────────────────────────────────
    #[error("No Java {major} runtime available for {os}/{arch}")]
    NoJavaRuntime {
        major: u32,
        os: String,
        arch: String,
    },

    #[error("Unsupported Java runtime archive: {0}")]
    UnsupportedRuntimeArchive(String),

    // ── Natives ─────────────────────────────────────────
    #[error("Could not extract native library {path:?}: {reason}")]
    NativeExtraction { path: PathBuf, reason: String },

    #[error("Zip extraction error: {0}")]
    Zip(#[from] zip::result::ZipError),

    // ── Process ─────────────────────────────────────────
    #[error("Could not start {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Minecraft exited with status {0}")]
    ProcessCrashed(i32),

    #[error("Server stopped with status {0} before it accepted connections")]
    ExitedBeforeHealthy(i32),

    // ── Watchdog ────────────────────────────────────────
    #[error("Crash test: could not connect to server after {attempts} attempts ({source})")]
    CrashTestFailed {
        attempts: u32,
        source: std::io::Error,
    },

    // ── JSON ────────────────────────────────────────────
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ── Generic ─────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

/// Convenience alias used throughout the crate.
pub type LauncherResult<T> = Result<T, LauncherError>;

/// Coarse classification used for reporting and exit codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Resolution,
    Network,
    Process,
    Watchdog,
    Io,
}

/// Exit status reserved for "crash test never observed a healthy server".
pub const CRASH_TEST_EXIT_CODE: i32 = 69;

impl LauncherError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LauncherError::UnsupportedPlatform(_)
            | LauncherError::NoCredentials
            | LauncherError::NoPaidAccount
            | LauncherError::CrashTestRequiresServer
            | LauncherError::MissingFabricLock(_) => ErrorKind::Configuration,
            LauncherError::VersionNotFound(_)
            | LauncherError::InvalidManifest(..)
            | LauncherError::InheritanceCycle(_)
            | LauncherError::Release(_)
            | LauncherError::InvalidMavenCoordinate(_)
            | LauncherError::Json(_) => ErrorKind::Resolution,
            LauncherError::Http(_)
            | LauncherError::DownloadFailed { .. }
            | LauncherError::Sha1Mismatch { .. }
            | LauncherError::Sha256Mismatch { .. }
            | LauncherError::NoJavaRuntime { .. } => ErrorKind::Network,
            LauncherError::Spawn { .. }
            | LauncherError::ProcessCrashed(_)
            | LauncherError::ExitedBeforeHealthy(_) => ErrorKind::Process,
            LauncherError::CrashTestFailed { .. } => ErrorKind::Watchdog,
            LauncherError::Io { .. }
            | LauncherError::NativeExtraction { .. }
            | LauncherError::Zip(_)
            | LauncherError::UnsupportedRuntimeArchive(_)
            | LauncherError::Other(_) => ErrorKind::Io,
        }
    }

    /// Remediation hint shown next to the error, if there is a useful one.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            LauncherError::UnsupportedPlatform(_) => {
                Some("Switch the instance to vanilla or fabric to launch it.")
            }
            LauncherError::NoCredentials => Some("Log in first, or launch with server mode."),
            LauncherError::NoPaidAccount => {
                Some("Demo mode is not supported. Log in with an account that owns the game.")
            }
            LauncherError::CrashTestRequiresServer => Some("Add server mode to crash test."),
            LauncherError::MissingFabricLock(_) => {
                Some("Reinstall the instance so its fabric loader gets pinned.")
            }
            LauncherError::VersionNotFound(_) => {
                Some("Check the required Minecraft version of the instance.")
            }
            LauncherError::Release(err) => Some(err.hint()),
            LauncherError::Http(_) | LauncherError::DownloadFailed { .. } => {
                Some("Check your internet connection and try again.")
            }
            LauncherError::NoJavaRuntime { .. } => {
                Some("Install a matching Java runtime and set java_path in the settings.")
            }
            LauncherError::Sha1Mismatch { .. } | LauncherError::Sha256Mismatch { .. } => {
                Some("A download was corrupted. Try again to fetch a clean copy.")
            }
            LauncherError::Spawn { .. } => {
                Some("Make sure a Java runtime is installed or pass an explicit java binary.")
            }
            _ => None,
        }
    }

    /// Exit status the program should terminate with for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            LauncherError::CrashTestFailed { .. } => CRASH_TEST_EXIT_CODE,
            _ => 1,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LauncherError::Io {
            path: path.into(),
            source,
        }
    }
}

impl From<std::io::Error> for LauncherError {
    fn from(source: std::io::Error) -> Self {
        LauncherError::Io {
            path: PathBuf::new(),
            source,
        }
    }
}
