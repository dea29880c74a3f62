//! Temp-file-and-rename writes shared by the JSON and artwork writers.

use std::fs;
use std::path::{Path, PathBuf};

pub fn ensure_parent_dir(path: &Path) -> Result<(), String> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    if parent.as_os_str().is_empty() || parent.exists() {
        return Ok(());
    }
    fs::create_dir_all(parent)
        .map_err(|err| format!("Failed to create directory {}: {err}", parent.display()))
}

fn temp_path_for(target_path: &Path) -> PathBuf {
    let mut file_name = target_path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    file_name.push(".tmp");
    target_path.with_file_name(file_name)
}

/// Writes `bytes` next to `target_path` and renames the result into place.
pub fn write_atomic(target_path: &Path, bytes: &[u8]) -> Result<(), String> {
    ensure_parent_dir(target_path)?;
    let temp_path = temp_path_for(target_path);
    if temp_path.exists() {
        let _ = fs::remove_file(&temp_path);
    }
    fs::write(&temp_path, bytes)
        .map_err(|err| format!("Failed to write {}: {err}", temp_path.display()))?;
    fs::rename(&temp_path, target_path).map_err(|err| {
        let _ = fs::remove_file(&temp_path);
        format!(
            "Failed to move {} into place at {}: {err}",
            temp_path.display(),
            target_path.display()
        )
    })
}
