//! Persistent tool configuration model and defaults.

/// Root configuration persisted to `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct Config {
    #[serde(default)]
    /// Screenshot extraction preferences.
    pub extract: ExtractConfig,
    #[serde(default)]
    /// OCR engine invocation.
    pub ocr: OcrConfig,
    #[serde(default)]
    /// Cover-art enrichment preferences.
    pub covers: CoversConfig,
}

/// Inputs, outputs and month labelling for `playshot extract`.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ExtractConfig {
    #[serde(default = "default_image_dir")]
    pub image_dir: String,
    #[serde(default = "default_image_extensions")]
    pub image_extensions: Vec<String>,
    #[serde(default = "default_document_file")]
    pub output_file: String,
    /// Year used for `YYYY-MM` month identifiers.
    #[serde(default = "default_year")]
    pub year: u16,
    /// Label and id given to the first screenshot, which holds the yearly summary.
    #[serde(default = "default_summary_label")]
    pub summary_label: String,
    #[serde(default = "default_summary_id")]
    pub summary_id: String,
    #[serde(default = "default_month_label_suffix")]
    pub month_label_suffix: String,
    /// Regex with a `plays` capture group marking a play-count line.
    #[serde(default = "default_plays_pattern")]
    pub plays_pattern: String,
}

#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct OcrConfig {
    #[serde(default = "default_ocr_command")]
    pub command: String,
    #[serde(default = "default_ocr_languages")]
    pub languages: String,
    #[serde(default)]
    pub extra_args: Vec<String>,
    /// Grayscale (and optionally upscale) screenshots before recognition.
    #[serde(default)]
    pub preprocess: bool,
    #[serde(default = "default_upscale_factor")]
    pub upscale_factor: u32,
}

/// Catalog lookup and download preferences for `playshot covers`.
#[derive(Debug, Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct CoversConfig {
    #[serde(default = "default_document_file")]
    pub input_file: String,
    #[serde(default = "default_covers_output_file")]
    pub output_file: String,
    #[serde(default = "default_covers_dir")]
    pub covers_dir: String,
    /// Prefix written into `cover_url`, relative to the consuming web page.
    #[serde(default = "default_cover_url_prefix")]
    pub cover_url_prefix: String,
    #[serde(default = "default_search_endpoint")]
    pub search_endpoint: String,
    /// Optional two-letter storefront code passed as `country`.
    #[serde(default)]
    pub country: String,
    #[serde(default = "default_artwork_size")]
    pub artwork_size: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
    /// Keep covers already recorded in the input when their file is still on disk.
    #[serde(default = "default_true")]
    pub reuse_existing: bool,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

pub const DEFAULT_PLAYS_PATTERN: &str = r"(?P<plays>[0-9]+)\s*(?:회\s*재생|plays?\b)";
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://itunes.apple.com/search";
pub const MAX_UPSCALE_FACTOR: u32 = 4;

fn default_true() -> bool {
    true
}

fn default_image_dir() -> String {
    "screenshots".to_string()
}

fn default_image_extensions() -> Vec<String> {
    vec!["png".to_string()]
}

fn default_document_file() -> String {
    "data/music.json".to_string()
}

fn default_year() -> u16 {
    2025
}

fn default_summary_label() -> String {
    "요약".to_string()
}

fn default_summary_id() -> String {
    "summary".to_string()
}

fn default_month_label_suffix() -> String {
    "월".to_string()
}

fn default_plays_pattern() -> String {
    DEFAULT_PLAYS_PATTERN.to_string()
}

fn default_ocr_command() -> String {
    "tesseract".to_string()
}

fn default_ocr_languages() -> String {
    "kor+eng".to_string()
}

fn default_upscale_factor() -> u32 {
    1
}

fn default_covers_output_file() -> String {
    "data/music_with_covers.json".to_string()
}

fn default_covers_dir() -> String {
    "covers".to_string()
}

fn default_cover_url_prefix() -> String {
    "covers".to_string()
}

fn default_search_endpoint() -> String {
    DEFAULT_SEARCH_ENDPOINT.to_string()
}

fn default_artwork_size() -> u32 {
    600
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_requests_per_minute() -> u32 {
    20
}

fn default_user_agent() -> String {
    concat!("playshot/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            image_dir: default_image_dir(),
            image_extensions: default_image_extensions(),
            output_file: default_document_file(),
            year: default_year(),
            summary_label: default_summary_label(),
            summary_id: default_summary_id(),
            month_label_suffix: default_month_label_suffix(),
            plays_pattern: default_plays_pattern(),
        }
    }
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            command: default_ocr_command(),
            languages: default_ocr_languages(),
            extra_args: Vec::new(),
            preprocess: false,
            upscale_factor: default_upscale_factor(),
        }
    }
}

impl Default for CoversConfig {
    fn default() -> Self {
        Self {
            input_file: default_document_file(),
            output_file: default_covers_output_file(),
            covers_dir: default_covers_dir(),
            cover_url_prefix: default_cover_url_prefix(),
            search_endpoint: default_search_endpoint(),
            country: String::new(),
            artwork_size: default_artwork_size(),
            request_timeout_secs: default_request_timeout_secs(),
            requests_per_minute: default_requests_per_minute(),
            reuse_existing: true,
            user_agent: default_user_agent(),
        }
    }
}

fn non_empty_or(value: String, fallback: fn() -> String) -> String {
    if value.trim().is_empty() {
        fallback()
    } else {
        value.trim().to_string()
    }
}

/// Clamps numeric fields into usable ranges and restores defaults for blank strings.
pub fn sanitize_config(config: Config) -> Config {
    let Config {
        extract,
        ocr,
        covers,
    } = config;

    let mut image_extensions: Vec<String> = Vec::new();
    for ext in extract.image_extensions {
        let ext = ext.trim().trim_start_matches('.').to_ascii_lowercase();
        if !ext.is_empty() && !image_extensions.contains(&ext) {
            image_extensions.push(ext);
        }
    }
    if image_extensions.is_empty() {
        image_extensions = default_image_extensions();
    }

    Config {
        extract: ExtractConfig {
            image_dir: non_empty_or(extract.image_dir, default_image_dir),
            image_extensions,
            output_file: non_empty_or(extract.output_file, default_document_file),
            year: extract.year.clamp(1900, 9999),
            summary_label: non_empty_or(extract.summary_label, default_summary_label),
            summary_id: non_empty_or(extract.summary_id, default_summary_id),
            month_label_suffix: extract.month_label_suffix,
            plays_pattern: non_empty_or(extract.plays_pattern, default_plays_pattern),
        },
        ocr: OcrConfig {
            command: non_empty_or(ocr.command, default_ocr_command),
            languages: non_empty_or(ocr.languages, default_ocr_languages),
            extra_args: ocr.extra_args,
            preprocess: ocr.preprocess,
            upscale_factor: ocr.upscale_factor.clamp(1, MAX_UPSCALE_FACTOR),
        },
        covers: CoversConfig {
            input_file: non_empty_or(covers.input_file, default_document_file),
            output_file: non_empty_or(covers.output_file, default_covers_output_file),
            covers_dir: non_empty_or(covers.covers_dir, default_covers_dir),
            cover_url_prefix: covers.cover_url_prefix.trim().trim_end_matches('/').to_string(),
            search_endpoint: non_empty_or(covers.search_endpoint, default_search_endpoint),
            country: covers.country.trim().to_ascii_lowercase(),
            artwork_size: covers.artwork_size.clamp(30, 3000),
            request_timeout_secs: covers.request_timeout_secs.max(1),
            requests_per_minute: covers.requests_per_minute.clamp(1, 600),
            reuse_existing: covers.reuse_existing,
            user_agent: non_empty_or(covers.user_agent, default_user_agent),
        },
    }
}
