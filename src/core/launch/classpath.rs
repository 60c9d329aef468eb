use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::core::version::LibraryFile;

/// Assemble classpath entries: regular libraries in manifest order, then
/// native archives, then the game jar.
///
/// The game jar is always the final entry, even if a library names it too.
pub fn build_classpath(libs_dir: &Path, files: &[LibraryFile], game_jar: &Path) -> Vec<PathBuf> {
    let (natives, regular): (Vec<&LibraryFile>, Vec<&LibraryFile>) =
        files.iter().partition(|f| f.native);

    let mut entries: Vec<PathBuf> = regular
        .into_iter()
        .chain(natives)
        .map(|f| libs_dir.join(&f.path))
        .filter(|p| p != game_jar)
        .collect();
    dedup_preserving_order(&mut entries);

    entries.push(game_jar.to_path_buf());
    entries
}

/// Platform-specific Java classpath separator.
pub fn classpath_separator() -> &'static str {
    if cfg!(target_os = "windows") {
        ";"
    } else {
        ":"
    }
}

/// Join entries into a single `-cp` value.
pub fn join_classpath(entries: &[PathBuf]) -> String {
    entries
        .iter()
        .map(|p| p.to_string_lossy())
        .collect::<Vec<_>>()
        .join(classpath_separator())
}

fn dedup_preserving_order(entries: &mut Vec<PathBuf>) {
    let mut seen = HashSet::new();
    entries.retain(|entry| {
        let key = if cfg!(target_os = "windows") {
            entry.to_string_lossy().to_lowercase()
        } else {
            entry.to_string_lossy().to_string()
        };
        seen.insert(key)
    });
}
