//! Screenshot text recognition.

pub mod preprocess;
pub mod tesseract;

use std::path::Path;

pub use preprocess::PreprocessingRecognizer;
pub use tesseract::{ensure_tesseract, TesseractRecognizer};

/// Turns one image into newline-separated recognized text.
pub trait TextRecognizer {
    fn recognize(&self, image_path: &Path) -> Result<String, String>;
}
