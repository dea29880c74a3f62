//! iTunes Search API catalog adapter.

use std::io::Read;
use std::num::NonZeroU32;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use log::debug;
use serde_json::Value;

use crate::catalog::ArtworkCatalog;
use crate::config::CoversConfig;

const THUMBNAIL_SIZE_TOKEN: &str = "100x100";
const MAX_IMAGE_BYTES: u64 = 20 * 1024 * 1024;
const RATE_LIMIT_POLL_INTERVAL: Duration = Duration::from_millis(100);

type DirectLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// iTunes adapter backed by `ureq`, paced by a per-minute request quota.
pub struct ItunesCatalog {
    http_client: ureq::Agent,
    endpoint: String,
    country: String,
    artwork_size: u32,
    user_agent: String,
    limiter: DirectLimiter,
}

impl ItunesCatalog {
    pub fn new(config: &CoversConfig) -> Self {
        let timeout = Duration::from_secs(config.request_timeout_secs.max(1));
        let http_client = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .timeout_write(timeout)
            .build();
        let per_minute = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);

        Self {
            http_client,
            endpoint: config.search_endpoint.trim().to_string(),
            country: config.country.clone(),
            artwork_size: config.artwork_size,
            user_agent: config.user_agent.clone(),
            limiter: RateLimiter::direct(Quota::per_minute(per_minute)),
        }
    }

    fn get(&self, url: &str) -> Result<ureq::Response, String> {
        self.http_client
            .get(url)
            .set("User-Agent", &self.user_agent)
            .call()
            .map_err(|error| match error {
                ureq::Error::Status(code, _) => format!("HTTP {code} from {url}"),
                ureq::Error::Transport(transport) => format!("Request failed: {transport}"),
            })
    }
}

fn wait_for_rate_limit_slot(limiter: &DirectLimiter, poll_interval: Duration) {
    while limiter.check().is_err() {
        std::thread::sleep(poll_interval);
    }
}

/// Reads at most `limit` bytes of an image body; an empty body is an error.
fn read_image_body(reader: impl Read, limit: u64) -> Result<Vec<u8>, String> {
    let mut bytes = Vec::new();
    reader
        .take(limit)
        .read_to_end(&mut bytes)
        .map_err(|err| format!("Image read failed: {err}"))?;
    if bytes.is_empty() {
        return Err("Image response was empty".to_string());
    }
    Ok(bytes)
}

pub fn search_query(title: &str, artist: &str) -> String {
    format!("{title} {artist}").trim().to_string()
}

pub fn search_url(endpoint: &str, query: &str, country: &str) -> String {
    let mut url = format!(
        "{}?term={}&media=music&limit=1",
        endpoint.trim_end_matches('?'),
        urlencoding::encode(query)
    );
    if !country.is_empty() {
        url.push_str("&country=");
        url.push_str(urlencoding::encode(country).as_ref());
    }
    url
}

/// Pulls the first result's thumbnail URL and rewrites it to `size`x`size`.
pub fn artwork_from_payload(payload: &Value, size: u32) -> Option<String> {
    let artwork = payload
        .get("results")
        .and_then(Value::as_array)
        .and_then(|results| results.first())
        .and_then(|result| result.get("artworkUrl100"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|url| !url.is_empty())?;
    Some(artwork.replace(THUMBNAIL_SIZE_TOKEN, &format!("{size}x{size}")))
}

impl ArtworkCatalog for ItunesCatalog {
    fn search_artwork(&self, title: &str, artist: &str) -> Result<Option<String>, String> {
        let url = search_url(&self.endpoint, &search_query(title, artist), &self.country);
        debug!("iTunes search: {url}");
        // Only the search API is quota-limited; artwork comes from the CDN.
        wait_for_rate_limit_slot(&self.limiter, RATE_LIMIT_POLL_INTERVAL);
        let payload: Value = self
            .get(&url)?
            .into_json()
            .map_err(|err| format!("iTunes response parse failed: {err}"))?;
        Ok(artwork_from_payload(&payload, self.artwork_size))
    }

    fn fetch_image(&self, url: &str) -> Result<Vec<u8>, String> {
        let response = self.get(url)?;
        read_image_body(response.into_reader(), MAX_IMAGE_BYTES)
    }
}
