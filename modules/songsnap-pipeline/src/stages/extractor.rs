//! Band/song extraction from OCR text of a radio display.
//!
//! Radio head units show station chrome (frequencies, "FM1", preset rows)
//! around the now-playing lines. Those lines are dropped; of what remains,
//! the first line is the band and the second is the song.

use std::sync::LazyLock;

use regex::Regex;
use songsnap_common::SongInfo;

/// Lines that are display chrome, not song metadata.
static NOISE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:[0-9]|FM|Presets)").expect("noise pattern is valid"));

/// A parenthetical at the end of a line, e.g. `Boston (FM)`.
static TRAILING_ANNOTATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*\([^()]*\)\s*$").expect("annotation pattern is valid"));

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedSong {
    pub band: Option<String>,
    pub song: Option<String>,
}

impl ExtractedSong {
    pub fn is_empty(&self) -> bool {
        self.band.is_none() && self.song.is_none()
    }

    pub fn into_song_info(self, filename: impl Into<String>) -> SongInfo {
        SongInfo {
            band: self.band.unwrap_or_default(),
            song: self.song.unwrap_or_default(),
            filename: filename.into(),
        }
    }
}

pub fn is_noise_line(line: &str) -> bool {
    NOISE_LINE.is_match(line)
}

/// Lines that could be band or song, in order. Blank lines are dropped too.
pub fn filter_noise_lines(text: &str) -> Vec<&str> {
    text.lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !is_noise_line(line))
        .collect()
}

fn strip_annotation(line: &str) -> String {
    TRAILING_ANNOTATION.replace(line, "").trim().to_string()
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

/// Pull `{band, song}` out of raw OCR text.
///
/// No candidate lines gives an empty record. A single candidate line gives a
/// band with no song.
pub fn extract_song(text: &str) -> ExtractedSong {
    let candidates = filter_noise_lines(text);
    let mut lines = candidates.iter();

    let band = lines.next().and_then(|line| non_empty(strip_annotation(line)));
    let song = lines
        .next()
        .and_then(|line| non_empty(line.trim().to_string()));

    ExtractedSong { band, song }
}
