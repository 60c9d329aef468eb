//! Helpers shared by the inline test modules.

use std::path::PathBuf;

/// A fresh, empty scratch directory unique to this test.
pub(crate) fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("packlaunch-{}-{}", name, std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
