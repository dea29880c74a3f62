//! `playshot covers`: annotate a play document with downloaded album artwork.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

use crate::artwork_store;
use crate::catalog::ArtworkCatalog;
use crate::config::CoversConfig;
use crate::records::{self, SongRecord};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoversReport {
    pub songs: usize,
    pub covers: usize,
    pub output: PathBuf,
}

/// Per-run options that do not live in the config file.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoversRunOptions {
    /// Ignore covers already recorded in the input and look everything up again.
    pub refresh: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SongOutcome {
    Reused,
    Downloaded,
    DownloadFailed,
    NotFound,
}

fn cover_url_for(prefix: &str, file_name: &str) -> String {
    if prefix.is_empty() {
        file_name.to_string()
    } else {
        format!("{prefix}/{file_name}")
    }
}

/// Maps a recorded `cover_url` back to its file under `covers_dir`.
fn local_cover_path(covers_dir: &Path, prefix: &str, cover_url: &str) -> Option<PathBuf> {
    let file_name = if prefix.is_empty() {
        cover_url
    } else {
        cover_url.strip_prefix(prefix)?.strip_prefix('/')?
    };
    if file_name.is_empty() || file_name == ".." || file_name.contains('/') {
        return None;
    }
    Some(covers_dir.join(file_name))
}

fn reusable_cover(song: &SongRecord, covers_dir: &Path, prefix: &str) -> bool {
    song.cover_path()
        .and_then(|cover_url| local_cover_path(covers_dir, prefix, cover_url))
        .is_some_and(|path| artwork_store::stored_cover_is_valid(&path))
}

fn download_cover(
    catalog: &dyn ArtworkCatalog,
    song: &mut SongRecord,
    month: &str,
    cover_source: &str,
    covers_dir: &Path,
    prefix: &str,
) -> SongOutcome {
    let bytes = match catalog.fetch_image(cover_source) {
        Ok(bytes) => bytes,
        Err(err) => {
            warn!("  Error downloading: {err}");
            song.clear_cover();
            return SongOutcome::DownloadFailed;
        }
    };
    if !artwork_store::image_bytes_are_decodable(&bytes) {
        warn!("  Error downloading: {cover_source} did not return a decodable image");
        song.clear_cover();
        return SongOutcome::DownloadFailed;
    }

    let extension = artwork_store::detect_image_extension(&bytes);
    let file_name = artwork_store::cover_file_name(month, &song.title, extension);
    match artwork_store::store_cover(covers_dir, &file_name, &bytes) {
        Ok(path) => {
            debug!("  Stored {} bytes at {}", bytes.len(), path.display());
            song.set_cover(cover_url_for(prefix, &file_name), cover_source.to_string());
            info!("    ✓ Downloaded: {file_name}");
            SongOutcome::Downloaded
        }
        Err(err) => {
            warn!("  Error downloading: {err}");
            song.clear_cover();
            SongOutcome::DownloadFailed
        }
    }
}

fn enrich_song(
    catalog: &dyn ArtworkCatalog,
    song: &mut SongRecord,
    month: &str,
    config: &CoversConfig,
    covers_dir: &Path,
    options: CoversRunOptions,
) -> SongOutcome {
    info!("  Searching: {} - {}", song.title, song.artist);
    let prefix = config.cover_url_prefix.as_str();

    if config.reuse_existing && !options.refresh && reusable_cover(song, covers_dir, prefix) {
        info!("    ✓ Already downloaded: {}", song.cover_path().unwrap_or_default());
        return SongOutcome::Reused;
    }

    let found = catalog
        .search_artwork(&song.title, &song.artist)
        .unwrap_or_else(|err| {
            warn!("  Error searching catalog: {err}");
            None
        });
    match found {
        Some(cover_source) => {
            download_cover(catalog, song, month, &cover_source, covers_dir, prefix)
        }
        None => {
            song.clear_cover();
            info!("    ✗ Not found");
            SongOutcome::NotFound
        }
    }
}

pub fn run_covers(
    config: &CoversConfig,
    catalog: &dyn ArtworkCatalog,
    options: CoversRunOptions,
) -> Result<CoversReport, String> {
    let input = PathBuf::from(&config.input_file);
    let mut months = records::read_document(&input)?;

    let covers_dir = PathBuf::from(&config.covers_dir);
    fs::create_dir_all(&covers_dir)
        .map_err(|err| format!("Failed to create {}: {err}", covers_dir.display()))?;

    for month_record in months.iter_mut() {
        info!("");
        info!("{} ({}):", month_record.month_label, month_record.month);
        let month = month_record.month.clone();
        for song in month_record.songs.iter_mut() {
            let outcome = enrich_song(catalog, song, &month, config, &covers_dir, options);
            debug!("  {} -> {:?}", song.title, outcome);
        }
    }

    let output = PathBuf::from(&config.output_file);
    records::write_document(&output, &months)?;

    let songs = records::total_songs(&months);
    let covers = records::total_with_covers(&months);
    info!("{}", "=".repeat(50));
    info!("Saved to {}", output.display());
    info!("Downloaded {covers}/{songs} covers");

    Ok(CoversReport {
        songs,
        covers,
        output,
    })
}

#[cfg(test)]
mod tests {
    use super::{local_cover_path, run_covers, CoversRunOptions};
    use crate::catalog::ArtworkCatalog;
    use crate::config::CoversConfig;
    use crate::records::{self, MonthRecord, SongRecord};
    use image::{ImageFormat, Rgb, RgbImage};
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::fs;
    use std::io::Cursor;
    use std::path::{Path, PathBuf};
    use std::time::{SystemTime, UNIX_EPOCH};

    struct FakeCatalog {
        artwork: HashMap<String, Result<Option<String>, String>>,
        images: HashMap<String, Result<Vec<u8>, String>>,
        searches: RefCell<Vec<String>>,
    }

    impl FakeCatalog {
        fn new() -> Self {
            Self {
                artwork: HashMap::new(),
                images: HashMap::new(),
                searches: RefCell::new(Vec::new()),
            }
        }
    }

    impl ArtworkCatalog for FakeCatalog {
        fn search_artwork(&self, title: &str, _artist: &str) -> Result<Option<String>, String> {
            self.searches.borrow_mut().push(title.to_string());
            self.artwork.get(title).cloned().unwrap_or(Ok(None))
        }

        fn fetch_image(&self, url: &str) -> Result<Vec<u8>, String> {
            self.images
                .get(url)
                .cloned()
                .unwrap_or_else(|| Err("HTTP 404".to_string()))
        }
    }

    fn unique_temp_dir(name: &str) -> PathBuf {
        let nonce = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system time should be valid")
            .as_nanos();
        std::env::temp_dir().join(format!("playshot_{name}_{nonce}"))
    }

    fn tiny_jpeg() -> Vec<u8> {
        let mut bytes = Vec::new();
        RgbImage::from_pixel(2, 2, Rgb([200, 100, 50]))
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Jpeg)
            .expect("jpeg fixture should encode");
        bytes
    }

    fn month(id: &str, label: &str, songs: Vec<SongRecord>) -> MonthRecord {
        MonthRecord {
            month: id.to_string(),
            month_label: label.to_string(),
            songs,
            image_file: format!("{id}.png"),
            extra: Default::default(),
        }
    }

    fn config_for(root: &Path) -> CoversConfig {
        CoversConfig {
            input_file: root.join("music.json").to_string_lossy().to_string(),
            output_file: root.join("music_with_covers.json").to_string_lossy().to_string(),
            covers_dir: root.join("covers").to_string_lossy().to_string(),
            ..CoversConfig::default()
        }
    }

    #[test]
    fn test_run_covers_downloads_and_annotates_songs() {
        let root = unique_temp_dir("covers_run");
        let config = config_for(&root);
        records::write_document(
            Path::new(&config.input_file),
            &[month(
                "2025-01",
                "1월",
                vec![
                    SongRecord::new("Hype Boy", "NewJeans", 42),
                    SongRecord::new("Unknown Song", "", 3),
                    SongRecord::new("Broken", "Someone", 1),
                ],
            )],
        )
        .expect("input should be written");
        let mut catalog = FakeCatalog::new();
        catalog.artwork.insert(
            "Hype Boy".to_string(),
            Ok(Some("https://cdn.test/hype/600x600bb.jpg".to_string())),
        );
        catalog.artwork.insert(
            "Broken".to_string(),
            Ok(Some("https://cdn.test/broken.jpg".to_string())),
        );
        catalog.images.insert(
            "https://cdn.test/hype/600x600bb.jpg".to_string(),
            Ok(tiny_jpeg()),
        );
        catalog.images.insert(
            "https://cdn.test/broken.jpg".to_string(),
            Ok(b"<html>not found</html>".to_vec()),
        );

        let report = run_covers(&config, &catalog, CoversRunOptions::default())
            .expect("covers run should succeed");

        assert_eq!((report.covers, report.songs), (1, 3));
        let songs = &records::read_document(&report.output).expect("output should parse")[0].songs;
        assert_eq!(songs[0].cover_path(), Some("covers/2025-01_Hype Boy.jpg"));
        assert_eq!(
            songs[0].cover_source.as_deref(),
            Some("https://cdn.test/hype/600x600bb.jpg")
        );
        assert_eq!(songs[1].cover_url, Some(None));
        assert_eq!(songs[2].cover_url, Some(None));
        assert_eq!(songs[2].cover_source, None);
        assert!(root.join("covers").join("2025-01_Hype Boy.jpg").exists());
        fs::remove_dir_all(root).expect("fixture should be removable");
    }

    #[test]
    fn test_run_covers_treats_search_errors_as_not_found() {
        let root = unique_temp_dir("covers_search_error");
        let config = config_for(&root);
        records::write_document(
            Path::new(&config.input_file),
            &[month("summary", "요약", vec![SongRecord::new("Ditto", "NewJeans", 9)])],
        )
        .expect("input should be written");
        let mut catalog = FakeCatalog::new();
        catalog
            .artwork
            .insert("Ditto".to_string(), Err("Request failed: timed out".to_string()));

        let report = run_covers(&config, &catalog, CoversRunOptions::default())
            .expect("covers run should succeed");

        assert_eq!(report.covers, 0);
        let months = records::read_document(&report.output).expect("output should parse");
        assert_eq!(months[0].songs[0].cover_url, Some(None));
        fs::remove_dir_all(root).expect("fixture should be removable");
    }

    #[test]
    fn test_run_covers_reuses_existing_files_unless_refreshing() {
        let root = unique_temp_dir("covers_reuse");
        let config = config_for(&root);
        fs::create_dir_all(root.join("covers")).expect("covers dir should be created");
        fs::write(root.join("covers").join("2025-03_OMG.jpg"), tiny_jpeg())
            .expect("existing cover should be written");
        let mut existing = SongRecord::new("OMG", "NewJeans", 5);
        existing.set_cover(
            "covers/2025-03_OMG.jpg".to_string(),
            "https://cdn.test/omg.jpg".to_string(),
        );
        records::write_document(
            Path::new(&config.input_file),
            &[month("2025-03", "3월", vec![existing])],
        )
        .expect("input should be written");
        let catalog = FakeCatalog::new();

        let report = run_covers(&config, &catalog, CoversRunOptions::default())
            .expect("covers run should succeed");
        assert_eq!(report.covers, 1);
        assert!(catalog.searches.borrow().is_empty());

        let refreshed = run_covers(&config, &catalog, CoversRunOptions { refresh: true })
            .expect("refresh run should succeed");
        assert_eq!(refreshed.covers, 0);
        assert_eq!(catalog.searches.borrow().as_slice(), ["OMG".to_string()]);
        fs::remove_dir_all(root).expect("fixture should be removable");
    }

    #[test]
    fn test_run_covers_searches_again_when_stored_cover_is_truncated() {
        let root = unique_temp_dir("covers_truncated");
        let config = config_for(&root);
        fs::create_dir_all(root.join("covers")).expect("covers dir should be created");
        fs::write(
            root.join("covers").join("2025-01_A.jpg"),
            [0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x00],
        )
        .expect("truncated cover should be written");
        let mut existing = SongRecord::new("A", "B", 2);
        existing.set_cover(
            "covers/2025-01_A.jpg".to_string(),
            "https://cdn.test/a.jpg".to_string(),
        );
        records::write_document(
            Path::new(&config.input_file),
            &[month("2025-01", "1월", vec![existing])],
        )
        .expect("input should be written");
        let mut catalog = FakeCatalog::new();
        catalog.artwork.insert(
            "A".to_string(),
            Ok(Some("https://cdn.test/a.jpg".to_string())),
        );
        catalog
            .images
            .insert("https://cdn.test/a.jpg".to_string(), Ok(tiny_jpeg()));

        let report = run_covers(&config, &catalog, CoversRunOptions::default())
            .expect("covers run should succeed");

        assert_eq!(catalog.searches.borrow().as_slice(), ["A".to_string()]);
        assert_eq!(report.covers, 1);
        let stored = fs::read(root.join("covers").join("2025-01_A.jpg"))
            .expect("cover should be rewritten");
        assert_eq!(stored, tiny_jpeg());
        fs::remove_dir_all(root).expect("fixture should be removable");
    }

    #[test]
    fn test_run_covers_keeps_cover_files_inside_covers_dir() {
        let root = unique_temp_dir("covers_month_escape");
        let config = config_for(&root);
        records::write_document(
            Path::new(&config.input_file),
            &[month("../x", "1월", vec![SongRecord::new("Ditto", "NewJeans", 4)])],
        )
        .expect("input should be written");
        let mut catalog = FakeCatalog::new();
        catalog.artwork.insert(
            "Ditto".to_string(),
            Ok(Some("https://cdn.test/ditto.jpg".to_string())),
        );
        catalog
            .images
            .insert("https://cdn.test/ditto.jpg".to_string(), Ok(tiny_jpeg()));

        let report = run_covers(&config, &catalog, CoversRunOptions::default())
            .expect("covers run should succeed");

        let months = records::read_document(&report.output).expect("output should parse");
        assert_eq!(months[0].songs[0].cover_path(), Some("covers/x_Ditto.jpg"));
        assert!(root.join("covers").join("x_Ditto.jpg").exists());
        assert!(!root.join("x_Ditto.jpg").exists());
        fs::remove_dir_all(root).expect("fixture should be removable");
    }

    #[test]
    fn test_run_covers_fails_for_missing_input() {
        let root = unique_temp_dir("covers_missing");
        let catalog = FakeCatalog::new();
        assert!(run_covers(&config_for(&root), &catalog, CoversRunOptions::default()).is_err());
    }

    #[test]
    fn test_local_cover_path_requires_matching_prefix() {
        let dir = Path::new("/srv/covers");
        assert_eq!(
            local_cover_path(dir, "covers", "covers/a.jpg"),
            Some(PathBuf::from("/srv/covers/a.jpg"))
        );
        assert_eq!(local_cover_path(dir, "covers", "art/a.jpg"), None);
        assert_eq!(local_cover_path(dir, "covers", "covers/../a.jpg"), None);
        assert_eq!(
            local_cover_path(dir, "", "a.jpg"),
            Some(PathBuf::from("/srv/covers/a.jpg"))
        );
    }
}
