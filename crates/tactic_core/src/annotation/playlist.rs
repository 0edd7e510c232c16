//! Coded events on a concatenated playlist → per-segment intervals.
//!
//! The tagging tool plays every segment video of a match back to back and
//! records one code per tactical change. A code stays active until the next
//! code within the same video, or until that video ends. `End` codes only
//! close the running interval.

use super::source::IntervalSource;
use super::types::{Interval, RaterAnnotationSet, SegmentKey};
use crate::error::Result;

/// Code that closes the running interval without opening a new one.
pub const END_CODE: &str = "End";

/// One coded instant, in seconds since the start of the playlist.
#[derive(Debug, Clone, PartialEq)]
pub struct CodeEvent {
    pub code: String,
    pub start: f64,
}

impl CodeEvent {
    pub fn new(code: impl Into<String>, start: f64) -> Self {
        Self {
            code: code.into(),
            start,
        }
    }
}

/// Locate a playlist offset: `(video index, offset inside that video)`.
fn locate(offset: f64, playlist: &[SegmentKey]) -> Option<(usize, f64)> {
    let mut elapsed = 0.0;
    for (index, video) in playlist.iter().enumerate() {
        let duration = (video.end - video.start) as f64;
        if elapsed <= offset && offset < elapsed + duration {
            return Some((index, offset - elapsed));
        }
        elapsed += duration;
    }
    None
}

/// Convert `events` (in playlist order) into one annotation set per video.
///
/// Instants are truncated to whole seconds. Videos that receive no interval
/// produce no set. Events outside the playlist are dropped.
pub fn intervals_from_playlist(
    rater_id: &str,
    events: &[CodeEvent],
    playlist: &[SegmentKey],
) -> Result<Vec<RaterAnnotationSet>> {
    let mut per_video: Vec<Vec<Interval>> = vec![Vec::new(); playlist.len()];

    for (i, event) in events.iter().enumerate() {
        if event.code == END_CODE {
            continue;
        }
        let Some((video, offset)) = locate(event.start, playlist) else {
            continue;
        };
        let key = &playlist[video];
        let start = key.start + offset as i64;

        let end = match events.get(i + 1).and_then(|next| locate(next.start, playlist)) {
            Some((next_video, next_offset)) if next_video == video => {
                key.start + next_offset as i64
            }
            _ => key.end,
        };

        per_video[video].push(Interval::new(event.code.clone(), start, end)?);
    }

    Ok(playlist
        .iter()
        .zip(per_video)
        .filter(|(_, intervals)| !intervals.is_empty())
        .map(|(key, intervals)| RaterAnnotationSet::new(rater_id, key.clone(), intervals))
        .collect())
}

/// [`IntervalSource`] over one rater's coded playlist.
#[derive(Debug, Clone)]
pub struct PlaylistSource {
    pub rater_id: String,
    pub events: Vec<CodeEvent>,
    pub playlist: Vec<SegmentKey>,
}

impl IntervalSource for PlaylistSource {
    fn rater_id(&self) -> &str {
        &self.rater_id
    }

    fn rater_sets(&self) -> Result<Vec<RaterAnnotationSet>> {
        intervals_from_playlist(&self.rater_id, &self.events, &self.playlist)
    }
}
