//! Artwork catalog abstractions and concrete implementations.

pub mod itunes;

/// Interface implemented by catalog search backends.
pub trait ArtworkCatalog {
    /// Returns the artwork URL of the best match, or `None` when nothing matched.
    fn search_artwork(&self, title: &str, artist: &str) -> Result<Option<String>, String>;
    fn fetch_image(&self, url: &str) -> Result<Vec<u8>, String>;
}
