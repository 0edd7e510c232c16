//! Frames → wide feature rows (one row per match time).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

use super::frame::{EntityId, TrackingFrame};
use super::sides::{position_rank, Half, MatchTeams};
use crate::annotation::SegmentKey;
use crate::error::{ConfigError, PipelineError, Result};

/// How frames map to feature columns (configuration side).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutStrategy {
    /// Fixed entity list; columns `[e0.x, e0.y, e1.x, …]`
    Roster { entities: Vec<String> },
    /// Ball, then left-side slots, then right-side slots
    Sides { slots_per_side: usize },
}

impl Default for LayoutStrategy {
    fn default() -> Self {
        LayoutStrategy::Sides { slots_per_side: 11 }
    }
}

impl LayoutStrategy {
    /// Feature count F of every row built with this strategy.
    pub fn width(&self) -> usize {
        match self {
            LayoutStrategy::Roster { entities } => entities.len() * 2,
            LayoutStrategy::Sides { slots_per_side } => 2 + 4 * *slots_per_side,
        }
    }

    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        match self {
            LayoutStrategy::Roster { entities } => {
                if entities.is_empty() {
                    return Err(ConfigError::InvalidParameter(
                        "roster layout has no entities".to_string(),
                    ));
                }
                let mut seen = entities.iter().map(|e| EntityId::parse(e)).collect::<Vec<_>>();
                seen.sort();
                if let Some(dup) = seen.windows(2).find(|w| w[0] == w[1]) {
                    return Err(ConfigError::InvalidParameter(format!(
                        "roster lists '{}' twice",
                        dup[0]
                    )));
                }
                Ok(())
            }
            LayoutStrategy::Sides { slots_per_side } => {
                if *slots_per_side == 0 {
                    return Err(ConfigError::InvalidParameter(
                        "slots_per_side must be positive".to_string(),
                    ));
                }
                Ok(())
            }
        }
    }
}

/// Column layout resolved for one segment.
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureLayout {
    Roster(Vec<EntityId>),
    Sides {
        left: String,
        right: String,
        slots_per_side: usize,
    },
}

impl FeatureLayout {
    /// Resolve a strategy for a segment. The side layout needs the match's
    /// team assignment to know who plays left in the segment's half.
    pub fn resolve(
        strategy: &LayoutStrategy,
        segment: &SegmentKey,
        tick_ms: i64,
        teams: Option<&MatchTeams>,
    ) -> Result<Self> {
        match strategy {
            LayoutStrategy::Roster { entities } => {
                Ok(FeatureLayout::Roster(entities.iter().map(|e| EntityId::parse(e)).collect()))
            }
            LayoutStrategy::Sides { slots_per_side } => {
                let teams =
                    teams.ok_or_else(|| PipelineError::missing(segment, "team side assignment"))?;
                let half = Half::from_segment_start(segment.start * tick_ms / 1000);
                let sides = teams.for_half(half);
                Ok(FeatureLayout::Sides {
                    left: sides.left,
                    right: sides.right,
                    slots_per_side: *slots_per_side,
                })
            }
        }
    }

    /// Feature count F.
    pub fn width(&self) -> usize {
        match self {
            FeatureLayout::Roster(entities) => entities.len() * 2,
            FeatureLayout::Sides { slots_per_side, .. } => 2 + 4 * *slots_per_side,
        }
    }

    pub fn column_names(&self) -> Vec<String> {
        let mut names = Vec::with_capacity(self.width());
        match self {
            FeatureLayout::Roster(entities) => {
                for e in entities {
                    names.push(format!("{}_x", e));
                    names.push(format!("{}_y", e));
                }
            }
            FeatureLayout::Sides { slots_per_side, .. } => {
                names.push("ball_x".to_string());
                names.push("ball_y".to_string());
                for side in ["left", "right"] {
                    for slot in 1..=*slots_per_side {
                        names.push(format!("{}_{}_x", side, slot));
                        names.push(format!("{}_{}_y", side, slot));
                    }
                }
            }
        }
        names
    }

    /// Group frames by match time (ascending) into wide rows. Unfilled
    /// columns are NaN.
    pub fn pivot(&self, frames: &[TrackingFrame]) -> TrackingRows {
        let mut by_time: BTreeMap<i64, Vec<&TrackingFrame>> = BTreeMap::new();
        for frame in frames {
            by_time.entry(frame.match_time).or_default().push(frame);
        }

        let width = self.width();
        let mut rows = TrackingRows::with_capacity(width, by_time.len());
        let mut dropped = 0usize;

        match self {
            FeatureLayout::Roster(entities) => {
                let columns: HashMap<&EntityId, usize> =
                    entities.iter().enumerate().map(|(i, e)| (e, i * 2)).collect();
                for (time, group) in &by_time {
                    let row = rows.push_empty(*time);
                    for frame in group {
                        if let Some(&col) = columns.get(&frame.entity_id) {
                            if row[col].is_nan() {
                                row[col] = frame.x;
                                row[col + 1] = frame.y;
                            }
                        }
                    }
                }
            }
            FeatureLayout::Sides {
                left,
                right,
                slots_per_side,
            } => {
                for (time, group) in &by_time {
                    let row = rows.push_empty(*time);
                    if let Some(ball) = group.iter().find(|f| f.entity_id.is_ball()) {
                        row[0] = ball.x;
                        row[1] = ball.y;
                    }
                    for (offset, team) in [(2, left), (2 + 2 * *slots_per_side, right)] {
                        let mut players: Vec<&&TrackingFrame> = group
                            .iter()
                            .filter(|f| {
                                !f.entity_id.is_ball()
                                    && f.team_id.as_deref() == Some(team.as_str())
                            })
                            .collect();
                        players.sort_by(|a, b| {
                            position_rank(a.position.as_deref())
                                .cmp(&position_rank(b.position.as_deref()))
                                .then_with(|| a.entity_id.cmp(&b.entity_id))
                        });
                        dropped += players.len().saturating_sub(*slots_per_side);
                        for (slot, player) in players.iter().take(*slots_per_side).enumerate() {
                            row[offset + slot * 2] = player.x;
                            row[offset + slot * 2 + 1] = player.y;
                        }
                    }
                }
            }
        }

        if dropped > 0 {
            debug!(dropped, "players beyond the side slots were dropped");
        }
        rows
    }
}

/// Wide tracking rows, ascending by match time.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackingRows {
    times: Vec<i64>,
    width: usize,
    values: Vec<f64>,
}

impl TrackingRows {
    fn with_capacity(width: usize, rows: usize) -> Self {
        Self {
            times: Vec::with_capacity(rows),
            width,
            values: Vec::with_capacity(rows * width),
        }
    }

    /// Build from flat values (`times.len() × width`). Times must ascend.
    pub fn from_flat(times: Vec<i64>, width: usize, values: Vec<f64>) -> Result<Self> {
        if times.len() * width != values.len() {
            return Err(PipelineError::ShapeMismatch(format!(
                "{} rows × {} columns but {} values",
                times.len(),
                width,
                values.len()
            )));
        }
        if times.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PipelineError::ShapeMismatch(
                "tracking times must strictly ascend".to_string(),
            ));
        }
        Ok(Self { times, width, values })
    }

    fn push_empty(&mut self, time: i64) -> &mut [f64] {
        self.times.push(time);
        let start = self.values.len();
        self.values.extend(std::iter::repeat(f64::NAN).take(self.width));
        &mut self.values[start..]
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn times(&self) -> &[i64] {
        &self.times
    }

    pub fn row(&self, index: usize) -> &[f64] {
        &self.values[index * self.width..(index + 1) * self.width]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sides_layout(slots: usize) -> FeatureLayout {
        FeatureLayout::Sides {
            left: "A".to_string(),
            right: "B".to_string(),
            slots_per_side: slots,
        }
    }

    #[test]
    fn test_strategy_validation() {
        assert!(LayoutStrategy::default().validate().is_ok());
        assert!(LayoutStrategy::Sides { slots_per_side: 0 }.validate().is_err());
        assert!(LayoutStrategy::Roster { entities: vec![] }.validate().is_err());
        assert!(LayoutStrategy::Roster {
            entities: vec!["ball".into(), "7".into(), "Ball".into()]
        }
        .validate()
        .is_err());
    }

    #[test]
    fn test_resolve_swaps_in_second_half() {
        let teams = MatchTeams::new("A", "B");
        let strategy = LayoutStrategy::default();

        let resolve = |key: SegmentKey, teams: Option<&MatchTeams>| {
            FeatureLayout::resolve(&strategy, &key, 1000, teams)
        };
        let first = resolve(SegmentKey::new("g", 600, 660), Some(&teams)).unwrap();
        let second = resolve(SegmentKey::new("g", 3000, 3060), Some(&teams)).unwrap();
        assert!(matches!(first, FeatureLayout::Sides { ref left, .. } if left == "A"));
        assert!(matches!(second, FeatureLayout::Sides { ref left, .. } if left == "B"));

        let err = resolve(SegmentKey::new("g", 0, 60), None).unwrap_err();
        assert!(matches!(err, PipelineError::MissingInput { .. }));
    }

    #[test]
    fn test_sides_pivot_orders_by_position() {
        let frames = vec![
            TrackingFrame::player(0, 40, "9", "A", "CF", 9.0, 9.5),
            TrackingFrame::ball(0, 40, 1.0, 2.0),
            TrackingFrame::player(0, 40, "1", "A", "GK", 1.0, 1.5),
            TrackingFrame::player(0, 40, "3", "B", "CB", 3.0, 3.5),
            TrackingFrame::player(0, 0, "1", "A", "GK", 0.1, 0.2),
        ];
        let layout = sides_layout(2);
        let rows = layout.pivot(&frames);

        assert_eq!(layout.width(), 10);
        assert_eq!(rows.times(), &[0, 40]);
        let r = rows.row(1);
        assert_eq!(&r[..6], &[1.0, 2.0, 1.0, 1.5, 9.0, 9.5]);
        assert_eq!(&r[6..8], &[3.0, 3.5]);
        assert!(r[8].is_nan() && r[9].is_nan(), "empty right slot stays NaN");

        let r0 = rows.row(0);
        assert!(r0[0].is_nan(), "no ball at t=0");
        assert_eq!(&r0[2..4], &[0.1, 0.2]);
    }

    #[test]
    fn test_extra_players_dropped() {
        let frames: Vec<TrackingFrame> = (0..4)
            .map(|i| TrackingFrame::player(0, 0, i.to_string(), "A", "CM", i as f64, 0.0))
            .collect();
        let rows = sides_layout(2).pivot(&frames);
        assert_eq!(rows.row(0)[2], 0.0);
        assert_eq!(rows.row(0)[4], 1.0);
        assert!(rows.row(0)[6].is_nan());
    }

    #[test]
    fn test_roster_pivot() {
        let layout = FeatureLayout::Roster(vec![EntityId::Ball, EntityId::Player("7".into())]);
        let frames = vec![
            TrackingFrame::player(1, 40, "7", "A", "CM", 5.0, 6.0),
            TrackingFrame::player(1, 40, "8", "A", "CM", 50.0, 60.0),
            TrackingFrame::ball(1, 40, 1.0, 2.0),
        ];
        let rows = layout.pivot(&frames);
        assert_eq!(layout.column_names(), vec!["ball_x", "ball_y", "7_x", "7_y"]);
        assert_eq!(rows.row(0), &[1.0, 2.0, 5.0, 6.0]);
    }

    #[test]
    fn test_from_flat_checks_shape() {
        assert!(TrackingRows::from_flat(vec![0, 40], 2, vec![0.0; 4]).is_ok());
        assert!(TrackingRows::from_flat(vec![0, 40], 2, vec![0.0; 3]).is_err());
        assert!(TrackingRows::from_flat(vec![40, 0], 2, vec![0.0; 4]).is_err());
    }
}
