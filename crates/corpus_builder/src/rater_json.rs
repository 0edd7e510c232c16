//! Per-rater JSON annotation exports.
//!
//! One file per rater, a list of segment entries:
//!
//! ```json
//! [{"game_id": 117093, "start_video": "10:00", "end_video": "11:00",
//!   "annotations": [{"label": "Build up", "start": "10:02", "end": "10:15"}]}]
//! ```
//!
//! Times are `MM:SS` clock strings or integer milliseconds.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use tactic_core::annotation::clock::parse_clock;
use tactic_core::annotation::{Interval, IntervalSource, RaterAnnotationSet, SegmentKey};
use tactic_core::PipelineError;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GameId {
    Text(String),
    Number(u64),
}

impl GameId {
    fn into_string(self) -> String {
        match self {
            GameId::Text(s) => s,
            GameId::Number(n) => n.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TimeValue {
    Clock(String),
    Millis(i64),
}

impl TimeValue {
    /// Ticks of `tick_ms` milliseconds.
    fn to_ticks(&self, tick_ms: i64) -> tactic_core::Result<i64> {
        match self {
            TimeValue::Clock(text) => Ok(parse_clock(text)? * 1000 / tick_ms),
            TimeValue::Millis(ms) => Ok(ms / tick_ms),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AnnotationEntry {
    label: String,
    start: TimeValue,
    end: TimeValue,
}

#[derive(Debug, Deserialize)]
struct SegmentEntry {
    game_id: GameId,
    start_video: TimeValue,
    end_video: TimeValue,
    #[serde(default)]
    annotations: Vec<AnnotationEntry>,
}

impl SegmentEntry {
    fn into_set(self, rater_id: &str, tick_ms: i64) -> tactic_core::Result<RaterAnnotationSet> {
        let key = SegmentKey::new(
            self.game_id.into_string(),
            self.start_video.to_ticks(tick_ms)?,
            self.end_video.to_ticks(tick_ms)?,
        );
        let mut intervals = Vec::with_capacity(self.annotations.len());
        for a in self.annotations {
            let start = a.start.to_ticks(tick_ms)?;
            let end = a.end.to_ticks(tick_ms)?;
            intervals.push(Interval::new(a.label, start, end)?);
        }
        Ok(RaterAnnotationSet::new(rater_id, key, intervals))
    }
}

/// Parse one rater's export into annotation sets keyed in `tick_ms` ticks.
///
/// A malformed segment entry is logged and left out; the rater's other
/// segments are kept. Only a file that is not a JSON list fails as a whole.
pub fn parse_rater_json(
    text: &str,
    rater_id: &str,
    tick_ms: i64,
) -> tactic_core::Result<Vec<RaterAnnotationSet>> {
    let entries: Vec<serde_json::Value> = serde_json::from_str(text)
        .map_err(|e| PipelineError::Parse(format!("rater {}: {}", rater_id, e)))?;

    let mut sets = Vec::with_capacity(entries.len());
    for (index, value) in entries.into_iter().enumerate() {
        let parsed = serde_json::from_value::<SegmentEntry>(value)
            .map_err(|e| PipelineError::Parse(e.to_string()))
            .and_then(|entry| entry.into_set(rater_id, tick_ms));
        match parsed {
            Ok(set) => sets.push(set),
            Err(e) => warn!(rater = rater_id, entry = index, error = %e, "segment entry rejected"),
        }
    }
    debug!(rater = rater_id, segments = sets.len(), "rater export parsed");
    Ok(sets)
}

/// A rater JSON file; the rater id is the file stem.
#[derive(Debug, Clone)]
pub struct JsonRaterSource {
    rater_id: String,
    path: PathBuf,
    tick_ms: i64,
}

impl JsonRaterSource {
    pub fn new(path: impl Into<PathBuf>, tick_ms: i64) -> Self {
        let path = path.into();
        let rater_id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self { rater_id, path, tick_ms }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl IntervalSource for JsonRaterSource {
    fn rater_id(&self) -> &str {
        &self.rater_id
    }

    fn rater_sets(&self) -> tactic_core::Result<Vec<RaterAnnotationSet>> {
        let text = fs::read_to_string(&self.path)
            .map_err(|e| PipelineError::Parse(format!("{}: {}", self.path.display(), e)))?;
        parse_rater_json(&text, &self.rater_id, self.tick_ms)
    }
}
