//! Grayscale/upscale pass applied to screenshots before recognition.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use image::{imageops::FilterType, DynamicImage, GrayImage, ImageFormat};
use log::debug;

use crate::artwork_store;
use crate::ocr::TextRecognizer;

static TEMP_SEQUENCE: AtomicU64 = AtomicU64::new(0);

pub fn prepare_for_ocr(decoded: &DynamicImage, upscale_factor: u32) -> GrayImage {
    let gray = decoded.to_luma8();
    let factor = upscale_factor.max(1);
    if factor == 1 {
        return gray;
    }
    let width = gray.width().saturating_mul(factor);
    let height = gray.height().saturating_mul(factor);
    image::imageops::resize(&gray, width, height, FilterType::Lanczos3)
}

fn temp_image_path() -> PathBuf {
    let sequence = TEMP_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "playshot_ocr_{}_{sequence}.png",
        std::process::id()
    ))
}

/// Wraps another recognizer, feeding it a preprocessed copy of each image.
pub struct PreprocessingRecognizer<R> {
    inner: R,
    upscale_factor: u32,
}

impl<R: TextRecognizer> PreprocessingRecognizer<R> {
    pub fn new(inner: R, upscale_factor: u32) -> Self {
        Self {
            inner,
            upscale_factor,
        }
    }
}

impl<R: TextRecognizer> TextRecognizer for PreprocessingRecognizer<R> {
    fn recognize(&self, image_path: &Path) -> Result<String, String> {
        let bytes = fs::read(image_path)
            .map_err(|err| format!("Failed to read {}: {err}", image_path.display()))?;
        let decoded = artwork_store::decode_image_from_memory_with_fallback(&bytes)
            .ok_or_else(|| format!("Failed to decode {}", image_path.display()))?;
        let prepared = prepare_for_ocr(&decoded, self.upscale_factor);

        let temp_path = temp_image_path();
        prepared
            .save_with_format(&temp_path, ImageFormat::Png)
            .map_err(|err| format!("Failed to write {}: {err}", temp_path.display()))?;
        debug!(
            "Preprocessed {} to {}x{} grayscale",
            image_path.display(),
            prepared.width(),
            prepared.height()
        );

        let result = self.inner.recognize(&temp_path);
        let _ = fs::remove_file(&temp_path);
        result
    }
}
