//! Heuristic parser turning OCR'd listening-history text into play records.
//!
//! Screenshots list one song per row, ending in a play count such as
//! `12회 재생`. OCR either keeps `title - artist` on that row, or splits the
//! artist onto one of the next lines, so both layouts are handled.

use regex::Regex;

use crate::records::SongRecord;

const TITLE_ARTIST_SEPARATORS: [&str; 4] = [" - ", "—", "–", "-"];
const ARTIST_LOOKAHEAD_LINES: usize = 2;

/// Compiled play-count matcher plus the leading-rank stripper.
#[derive(Debug, Clone)]
pub struct PlaysPattern {
    plays: Regex,
    leading_rank: Regex,
    digits_only: Regex,
}

impl PlaysPattern {
    pub fn new(pattern: &str) -> Result<Self, String> {
        let plays =
            Regex::new(pattern).map_err(|err| format!("Invalid plays pattern '{pattern}': {err}"))?;
        if !plays.capture_names().any(|name| name == Some("plays")) {
            return Err(format!(
                "Plays pattern '{pattern}' must define a named group `(?P<plays>...)`"
            ));
        }
        Ok(Self {
            plays,
            leading_rank: Regex::new(r"^[0-9]+\s*").map_err(|err| err.to_string())?,
            digits_only: Regex::new(r"^[0-9]+$").map_err(|err| err.to_string())?,
        })
    }

    fn is_plays_line(&self, line: &str) -> bool {
        self.plays.is_match(line)
    }

    fn plays_in(&self, line: &str) -> Option<Option<u64>> {
        let captures = self.plays.captures(line)?;
        Some(
            captures
                .name("plays")
                .and_then(|value| value.as_str().parse::<u64>().ok()),
        )
    }

    fn title_artist_text(&self, line: &str) -> String {
        let without_plays = self.plays.replace_all(line, "");
        self.leading_rank
            .replace(without_plays.trim(), "")
            .trim()
            .to_string()
    }
}

fn split_title_artist(text: &str) -> Option<(String, String)> {
    TITLE_ARTIST_SEPARATORS.iter().find_map(|separator| {
        text.split_once(separator)
            .map(|(title, artist)| (title.trim().to_string(), artist.trim().to_string()))
    })
}

fn artist_from_following_lines(lines: &[&str], index: usize, pattern: &PlaysPattern) -> String {
    lines
        .iter()
        .skip(index + 1)
        .take(ARTIST_LOOKAHEAD_LINES)
        .find(|next_line| {
            !pattern.is_plays_line(next_line)
                && next_line.chars().count() > 1
                && !pattern.digits_only.is_match(next_line)
        })
        .map(|line| line.trim().to_string())
        .unwrap_or_default()
}

/// Extracts every play-count row from `text`, in line order.
pub fn parse_plays(text: &str, pattern: &PlaysPattern) -> Vec<SongRecord> {
    let lines: Vec<&str> = text
        .split('\n')
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();

    let mut songs = Vec::new();
    for (index, line) in lines.iter().enumerate() {
        let Some(plays) = pattern.plays_in(line) else {
            continue;
        };
        let Some(plays) = plays else {
            log::debug!("Skipping line with unreadable play count: {line}");
            continue;
        };

        let title_artist = pattern.title_artist_text(line);
        if title_artist.chars().count() <= 1 {
            continue;
        }

        let (title, artist) = match split_title_artist(&title_artist) {
            Some(parts) => parts,
            None => {
                let artist = artist_from_following_lines(&lines, index, pattern);
                (title_artist, artist)
            }
        };
        songs.push(SongRecord::new(title, artist, plays));
    }
    songs
}
