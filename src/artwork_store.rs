//! Cover file naming, validation, and on-disk storage.

use std::fs;
use std::path::{Path, PathBuf};

use image::DynamicImage;
use log::debug;
use zune_core::{colorspace::ColorSpace, options::DecoderOptions};
use zune_jpeg::JpegDecoder;

use crate::fs_atomic;

const SAFE_TITLE_MAX_CHARS: usize = 30;
const DEFAULT_COVER_EXTENSION: &str = "jpg";

const IMAGE_SIGNATURES: &[(&[u8], &str)] = &[
    (b"\x89PNG\r\n\x1a\n", "png"),
    (b"\xFF\xD8\xFF", "jpg"),
    (b"GIF87a", "gif"),
    (b"GIF89a", "gif"),
    (b"BM", "bmp"),
];

/// File extension for the image format `bytes` starts with.
pub fn detect_image_extension(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() >= 12 && bytes.starts_with(b"RIFF") && &bytes[8..12] == b"WEBP" {
        return Some("webp");
    }
    IMAGE_SIGNATURES
        .iter()
        .find(|(signature, _)| bytes.starts_with(signature))
        .map(|(_, extension)| *extension)
}

fn decode_lenient_jpeg(bytes: &[u8]) -> Option<DynamicImage> {
    let options = DecoderOptions::new_cmd()
        .set_strict_mode(false)
        .jpeg_set_out_colorspace(ColorSpace::RGBA);
    let mut decoder = JpegDecoder::new_with_options(bytes, options);
    let pixels = decoder.decode().ok()?;
    let (width, height) = decoder.dimensions()?;
    image::RgbaImage::from_raw(width as u32, height as u32, pixels).map(DynamicImage::ImageRgba8)
}

/// Decodes a screenshot or cover, retrying JPEGs without strict mode.
///
/// Catalog CDNs occasionally serve JPEGs with trailing garbage that the
/// strict decoder rejects.
pub fn decode_image_from_memory_with_fallback(bytes: &[u8]) -> Option<DynamicImage> {
    match image::load_from_memory(bytes) {
        Ok(image) => Some(image),
        Err(_) if detect_image_extension(bytes) == Some("jpg") => decode_lenient_jpeg(bytes),
        Err(_) => None,
    }
}

/// True when `bytes` carry a known image signature and decode with real pixels.
pub fn image_bytes_are_decodable(bytes: &[u8]) -> bool {
    detect_image_extension(bytes).is_some()
        && decode_image_from_memory_with_fallback(bytes)
            .is_some_and(|image| image.width() > 0 && image.height() > 0)
}

fn keep_file_name_chars(text: &str) -> impl Iterator<Item = char> + '_ {
    text.chars()
        .filter(|ch| ch.is_alphanumeric() || matches!(ch, ' ' | '-' | '_'))
}

/// Keeps alphanumerics plus ` -_`, truncated to 30 characters.
pub fn safe_title(title: &str) -> String {
    keep_file_name_chars(title).take(SAFE_TITLE_MAX_CHARS).collect()
}

/// `{month}_{title}.{ext}` with both parts reduced to file-name-safe characters,
/// so neither can introduce a path separator.
pub fn cover_file_name(month: &str, title: &str, extension: Option<&str>) -> String {
    let month: String = keep_file_name_chars(month).collect();
    format!(
        "{month}_{}.{}",
        safe_title(title),
        extension.unwrap_or(DEFAULT_COVER_EXTENSION)
    )
}

pub fn store_cover(covers_dir: &Path, file_name: &str, bytes: &[u8]) -> Result<PathBuf, String> {
    let target_path = covers_dir.join(file_name);
    fs_atomic::write_atomic(&target_path, bytes)?;
    Ok(target_path)
}

/// True when a previously stored cover at `path` still decodes as an image.
pub fn stored_cover_is_valid(path: &Path) -> bool {
    match fs::read(path) {
        Ok(bytes) => image_bytes_are_decodable(&bytes),
        Err(err) => {
            debug!("Stored cover {} is unreadable: {}", path.display(), err);
            false
        }
    }
}
