//! Match-clock helpers.
//!
//! Annotation exports write instants as `MM:SS` strings (minutes may exceed 59)
//! and name segment videos `<game>_<MM>_<SS>-<MM>_<SS>`.

use crate::error::{PipelineError, Result};

/// Parse `MM:SS` into seconds.
///
/// ```
/// use tactic_core::annotation::clock::parse_clock;
///
/// assert_eq!(parse_clock("00:00").unwrap(), 0);
/// assert_eq!(parse_clock("47:05").unwrap(), 2825);
/// assert_eq!(parse_clock("95:30").unwrap(), 5730);
/// ```
pub fn parse_clock(text: &str) -> Result<i64> {
    let (minutes, seconds) = text
        .trim()
        .split_once(':')
        .ok_or_else(|| PipelineError::Parse(format!("expected MM:SS, got '{}'", text)))?;

    let minutes: i64 = minutes
        .parse()
        .map_err(|_| PipelineError::Parse(format!("invalid minutes in '{}'", text)))?;
    let seconds: i64 = seconds
        .parse()
        .map_err(|_| PipelineError::Parse(format!("invalid seconds in '{}'", text)))?;

    if minutes < 0 || !(0..60).contains(&seconds) {
        return Err(PipelineError::Parse(format!("clock out of range: '{}'", text)));
    }

    Ok(minutes * 60 + seconds)
}

/// Format seconds as `MM:SS` (zero padded, minutes unbounded).
pub fn format_clock(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}

/// Format seconds as `MM_SS`, the filename-safe variant.
pub fn format_clock_for_file(seconds: i64) -> String {
    format_clock(seconds).replace(':', "_")
}

/// Find `<game>_<MM>_<SS>-<MM>_<SS>` inside a video or data file name.
///
/// Returns `(game_id, start_seconds, end_seconds)`.
pub fn parse_video_range(name: &str) -> Option<(String, i64, i64)> {
    let bytes = name.as_bytes();

    for (dash, _) in name.match_indices('-') {
        // Left side must end with `_DD_DD`, preceded by at least one digit.
        if dash < 7 || bytes.len() < dash + 6 {
            continue;
        }
        let left = &bytes[dash - 6..dash];
        let right = &bytes[dash + 1..dash + 6];
        if !matches_two_pairs(&left[1..]) || left[0] != b'_' {
            continue;
        }
        if !matches_two_pairs(right) {
            continue;
        }

        let game_end = dash - 6;
        let game_start = bytes[..game_end]
            .iter()
            .rposition(|b| !b.is_ascii_digit())
            .map(|p| p + 1)
            .unwrap_or(0);
        if game_start == game_end {
            continue;
        }

        let game_id = name[game_start..game_end].to_string();
        let start = two_digits(&left[1..3]) * 60 + two_digits(&left[4..6]);
        let end = two_digits(&right[0..2]) * 60 + two_digits(&right[3..5]);
        return Some((game_id, start, end));
    }

    None
}

/// `DD_DD`
fn matches_two_pairs(bytes: &[u8]) -> bool {
    bytes.len() == 5
        && bytes[0].is_ascii_digit()
        && bytes[1].is_ascii_digit()
        && bytes[2] == b'_'
        && bytes[3].is_ascii_digit()
        && bytes[4].is_ascii_digit()
}

fn two_digits(bytes: &[u8]) -> i64 {
    ((bytes[0] - b'0') as i64) * 10 + (bytes[1] - b'0') as i64
}
