use std::path::{Path, PathBuf};

use log::debug;

pub fn has_supported_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            extensions
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Lists screenshots directly inside `folder_path`, sorted by path.
///
/// Sort order decides month assignment, so the first file is the summary.
pub fn collect_screenshots(folder_path: &Path, extensions: &[String]) -> Result<Vec<PathBuf>, String> {
    let entries = std::fs::read_dir(folder_path).map_err(|err| {
        format!(
            "Failed to read screenshot directory {}: {err}",
            folder_path.display()
        )
    })?;

    let mut screenshots = Vec::new();
    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                debug!(
                    "Failed to read a directory entry in {}: {}",
                    folder_path.display(),
                    err
                );
                continue;
            }
        };

        let path = entry.path();
        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(err) => {
                debug!("Failed to inspect {}: {}", path.display(), err);
                continue;
            }
        };

        let is_file = if file_type.is_symlink() {
            match std::fs::metadata(&path) {
                Ok(target) => target.is_file(),
                Err(err) => {
                    debug!("Skipping dangling link {}: {}", path.display(), err);
                    false
                }
            }
        } else {
            file_type.is_file()
        };

        if is_file && has_supported_extension(&path, extensions) {
            screenshots.push(path);
        }
    }

    screenshots.sort_unstable();
    Ok(screenshots)
}
