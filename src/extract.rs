//! `playshot extract`: screenshots in, month-grouped play document out.

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::config::ExtractConfig;
use crate::month_labeling::MonthLabels;
use crate::ocr::TextRecognizer;
use crate::play_parser::{self, PlaysPattern};
use crate::records::{self, MonthRecord};
use crate::screenshot_discovery;

const PREVIEW_SONGS_PER_MONTH: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractReport {
    pub images: usize,
    pub songs: usize,
    pub output: PathBuf,
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn separator() -> String {
    "=".repeat(50)
}

/// Runs one screenshot through OCR and the parser.
///
/// OCR failures are logged and yield an empty month rather than aborting the batch.
fn extract_month(
    index: usize,
    image_path: &Path,
    recognizer: &dyn TextRecognizer,
    pattern: &PlaysPattern,
    labels: &MonthLabels,
) -> MonthRecord {
    let image_file = file_name_of(image_path);
    info!("{}", separator());
    info!("Processing {image_file}");

    let text = recognizer.recognize(image_path).unwrap_or_else(|err| {
        warn!("Error processing {}: {err}", image_path.display());
        String::new()
    });
    let songs = play_parser::parse_plays(&text, pattern);
    let (month_label, month) = labels.month_for_index(index);

    info!("Month: {month_label} ({month})");
    info!("Found {} songs:", songs.len());
    for song in songs.iter().take(PREVIEW_SONGS_PER_MONTH) {
        info!("  - {} | {} | {}회", song.title, song.artist, song.plays);
    }

    MonthRecord {
        month,
        month_label,
        songs,
        image_file,
        extra: Default::default(),
    }
}

pub fn run_extract(
    config: &ExtractConfig,
    recognizer: &dyn TextRecognizer,
) -> Result<ExtractReport, String> {
    let pattern = PlaysPattern::new(&config.plays_pattern)?;
    let labels = MonthLabels::from_config(config);
    let images = screenshot_discovery::collect_screenshots(
        Path::new(&config.image_dir),
        &config.image_extensions,
    )?;
    info!("Found {} images", images.len());

    let months: Vec<MonthRecord> = images
        .iter()
        .enumerate()
        .map(|(index, image_path)| extract_month(index, image_path, recognizer, &pattern, &labels))
        .collect();

    let output = PathBuf::from(&config.output_file);
    records::write_document(&output, &months)?;

    let songs = records::total_songs(&months);
    info!("{}", separator());
    info!("Saved to {}", output.display());
    info!("Total: {songs} songs extracted");

    Ok(ExtractReport {
        images: images.len(),
        songs,
        output,
    })
}
