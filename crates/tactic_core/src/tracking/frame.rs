//! Raw tracking records.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::annotation::SegmentKey;

/// Tracked object: the ball or a player id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EntityId {
    Ball,
    Player(String),
}

impl EntityId {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("ball") {
            EntityId::Ball
        } else {
            EntityId::Player(raw.to_string())
        }
    }

    pub fn is_ball(&self) -> bool {
        matches!(self, EntityId::Ball)
    }
}

impl From<String> for EntityId {
    fn from(raw: String) -> Self {
        EntityId::parse(&raw)
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.to_string()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            EntityId::Ball => write!(f, "ball"),
            EntityId::Player(id) => write!(f, "{}", id),
        }
    }
}

/// One object's pitch position at one instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackingFrame {
    pub frame_index: u64,
    /// Match clock in milliseconds
    pub match_time: i64,
    pub entity_id: EntityId,
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
}

impl TrackingFrame {
    pub fn ball(frame_index: u64, match_time: i64, x: f64, y: f64) -> Self {
        Self {
            frame_index,
            match_time,
            entity_id: EntityId::Ball,
            x,
            y,
            team_id: None,
            position: None,
        }
    }

    pub fn player(
        frame_index: u64,
        match_time: i64,
        id: impl Into<String>,
        team_id: impl Into<String>,
        position: impl Into<String>,
        x: f64,
        y: f64,
    ) -> Self {
        Self {
            frame_index,
            match_time,
            entity_id: EntityId::Player(id.into()),
            x,
            y,
            team_id: Some(team_id.into()),
            position: Some(position.into()),
        }
    }
}

/// Frames inside a segment: `start_ms ≤ match_time ≤ end_ms` (both ends inclusive).
pub fn slice_segment(
    frames: &[TrackingFrame],
    segment: &SegmentKey,
    tick_ms: i64,
) -> Vec<TrackingFrame> {
    let start_ms = segment.start * tick_ms;
    let end_ms = segment.end * tick_ms;
    frames
        .iter()
        .filter(|f| start_ms <= f.match_time && f.match_time <= end_ms)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_parsing() {
        assert_eq!(EntityId::parse("ball"), EntityId::Ball);
        assert_eq!(EntityId::parse(" Ball "), EntityId::Ball);
        assert_eq!(EntityId::parse("p17"), EntityId::Player("p17".to_string()));
        assert_eq!(EntityId::Player("7".into()).to_string(), "7");
    }

    #[test]
    fn test_entity_serde_is_plain_string() {
        let json = serde_json::to_string(&EntityId::Ball).unwrap();
        assert_eq!(json, "\"ball\"");
        let back: EntityId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(back, EntityId::Player("42".to_string()));
    }

    #[test]
    fn test_slice_is_inclusive_on_both_ends() {
        let frames: Vec<TrackingFrame> = (0..10)
            .map(|i| TrackingFrame::ball(i, i as i64 * 1000, 0.0, 0.0))
            .collect();
        let sliced = slice_segment(&frames, &SegmentKey::new("g", 2, 5), 1000);
        let times: Vec<i64> = sliced.iter().map(|f| f.match_time).collect();
        assert_eq!(times, vec![2000, 3000, 4000, 5000]);
    }
}
