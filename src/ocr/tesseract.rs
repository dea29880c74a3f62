//! Recognizer backed by the external `tesseract` program.

use std::path::Path;
use std::process::{Command, Output};

use log::debug;

use crate::config::OcrConfig;
use crate::ocr::TextRecognizer;

pub struct TesseractRecognizer {
    command: String,
    languages: String,
    extra_args: Vec<String>,
}

impl TesseractRecognizer {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            command: config.command.clone(),
            languages: config.languages.clone(),
            extra_args: config.extra_args.clone(),
        }
    }

    fn build_command(&self, image_path: &Path) -> Command {
        let mut command = Command::new(&self.command);
        command
            .arg(image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.languages)
            .args(&self.extra_args);
        command
    }
}

fn stderr_summary(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let trimmed = stderr.trim();
    if trimmed.is_empty() {
        format!("exit status {}", output.status)
    } else {
        trimmed.to_string()
    }
}

impl TextRecognizer for TesseractRecognizer {
    fn recognize(&self, image_path: &Path) -> Result<String, String> {
        debug!(
            "Running {} on {} (languages={})",
            self.command,
            image_path.display(),
            self.languages
        );
        let output = self.build_command(image_path).output().map_err(|err| {
            format!("Failed to run '{}' on {}: {err}", self.command, image_path.display())
        })?;
        if !output.status.success() {
            return Err(format!(
                "'{}' failed on {}: {}",
                self.command,
                image_path.display(),
                stderr_summary(&output)
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Checks once that the OCR program can be started, returning its version line.
pub fn ensure_tesseract(command: &str) -> Result<String, String> {
    let output = Command::new(command).arg("--version").output().map_err(|err| {
        format!("OCR program '{command}' could not be started ({err}). Is tesseract installed and on PATH?")
    })?;
    if !output.status.success() {
        return Err(format!(
            "OCR program '{command}' failed its version check: {}",
            stderr_summary(&output)
        ));
    }
    // Older tesseract builds print the version banner on stderr.
    let banner = if output.stdout.is_empty() {
        &output.stderr
    } else {
        &output.stdout
    };
    Ok(String::from_utf8_lossy(banner)
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .to_string())
}
