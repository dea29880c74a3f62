//! Month-grouped play records exchanged between `extract` and `covers` as JSON.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::fs_atomic;

/// One screenshot's worth of songs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthRecord {
    /// Stable identifier such as `2025-03` or `summary`.
    pub month: String,
    /// Display label such as `3월`.
    pub month_label: String,
    #[serde(default)]
    pub songs: Vec<SongRecord>,
    #[serde(default)]
    pub image_file: String,
    /// Fields written by other tools, carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SongRecord {
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub plays: u64,
    /// `None` when never enriched, `Some(None)` when enrichment found nothing.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present_field"
    )]
    pub cover_url: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cover_source: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SongRecord {
    pub fn new(title: impl Into<String>, artist: impl Into<String>, plays: u64) -> Self {
        Self {
            title: title.into(),
            artist: artist.into(),
            plays,
            cover_url: None,
            cover_source: None,
            extra: Map::new(),
        }
    }

    /// Local cover path when one was recorded and is non-empty.
    pub fn cover_path(&self) -> Option<&str> {
        self.cover_url
            .as_ref()
            .and_then(|value| value.as_deref())
            .filter(|value| !value.is_empty())
    }

    pub fn set_cover(&mut self, cover_url: String, cover_source: String) {
        self.cover_url = Some(Some(cover_url));
        self.cover_source = Some(cover_source);
    }

    pub fn clear_cover(&mut self) {
        self.cover_url = Some(None);
        self.cover_source = None;
    }
}

fn deserialize_present_field<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

pub fn parse_document(text: &str) -> Result<Vec<MonthRecord>, String> {
    serde_json::from_str(text).map_err(|err| format!("Invalid play document: {err}"))
}

pub fn read_document(path: &Path) -> Result<Vec<MonthRecord>, String> {
    let text = fs::read_to_string(path)
        .map_err(|err| format!("Failed to read {}: {err}", path.display()))?;
    parse_document(&text).map_err(|err| format!("{}: {err}", path.display()))
}

pub fn render_document(months: &[MonthRecord]) -> Result<String, String> {
    serde_json::to_string_pretty(months)
        .map_err(|err| format!("Failed to serialize play document: {err}"))
}

/// Writes the document as indented UTF-8 JSON, creating parent directories.
pub fn write_document(path: &Path, months: &[MonthRecord]) -> Result<(), String> {
    let rendered = render_document(months)?;
    fs_atomic::write_atomic(path, rendered.as_bytes())
}

pub fn total_songs(months: &[MonthRecord]) -> usize {
    months.iter().map(|month| month.songs.len()).sum()
}

pub fn total_with_covers(months: &[MonthRecord]) -> usize {
    months
        .iter()
        .flat_map(|month| month.songs.iter())
        .filter(|song| song.cover_path().is_some())
        .count()
}

#[cfg(test)]
mod tests {
    use super::{parse_document, render_document, total_songs, total_with_covers, SongRecord};
    use serde_json::Value;

    const ENRICHED: &str = r#"[
      {
        "month": "2025-01",
        "month_label": "1월",
        "songs": [
          {"title": "Hype Boy", "artist": "NewJeans", "plays": 42,
           "cover_url": "covers/2025-01_Hype Boy.jpg",
           "cover_source": "https://example.test/600x600bb.jpg"},
          {"title": "Ditto", "plays": 7, "cover_url": null, "genre": "K-Pop"},
          {"title": "OMG", "artist": "NewJeans", "plays": 3}
        ],
        "image_file": "IMG_0001.png",
        "note": "kept"
      }
    ]"#;

    #[test]
    fn test_parse_document_distinguishes_absent_and_null_cover() {
        let months = parse_document(ENRICHED).expect("document should parse");
        let songs = &months[0].songs;

        assert_eq!(songs[0].cover_path(), Some("covers/2025-01_Hype Boy.jpg"));
        assert_eq!(songs[1].cover_url, Some(None));
        assert_eq!(songs[2].cover_url, None);
        assert_eq!(songs[1].artist, "");
    }

    #[test]
    fn test_render_document_keeps_unknown_fields_and_null_cover() {
        let months = parse_document(ENRICHED).expect("document should parse");
        let rendered = render_document(&months).expect("document should render");
        let value: Value = serde_json::from_str(&rendered).expect("rendered json should parse");

        assert_eq!(value[0]["note"], "kept");
        assert_eq!(value[0]["songs"][1]["genre"], "K-Pop");
        assert!(value[0]["songs"][1]["cover_url"].is_null());
        assert!(value[0]["songs"][2].get("cover_url").is_none());
        assert!(value[0]["songs"][2].get("cover_source").is_none());
    }

    #[test]
    fn test_render_document_writes_hangul_verbatim_with_two_space_indent() {
        let months = parse_document(ENRICHED).expect("document should parse");
        let rendered = render_document(&months).expect("document should render");

        assert!(rendered.contains("\"1월\""));
        assert!(rendered.contains("\n  {\n    \"month\""));
    }

    #[test]
    fn test_totals_only_count_non_empty_cover_paths() {
        let mut months = parse_document(ENRICHED).expect("document should parse");
        months[0].songs.push(SongRecord {
            cover_url: Some(Some(String::new())),
            ..SongRecord::new("Empty", "", 1)
        });

        assert_eq!(total_songs(&months), 4);
        assert_eq!(total_with_covers(&months), 1);
    }

    #[test]
    fn test_clear_cover_drops_source() {
        let mut song = SongRecord::new("Ditto", "NewJeans", 7);
        song.set_cover("covers/a.jpg".to_string(), "https://x/a.jpg".to_string());

        song.clear_cover();

        assert_eq!(song.cover_url, Some(None));
        assert_eq!(song.cover_source, None);
    }
}
