//! Match halves and which team attacks from which side.

use serde::{Deserialize, Serialize};

/// Column order of players within one side.
pub const POSITION_ORDER: [&str; 12] = [
    "GK", "CB", "RWB", "RB", "LWB", "LB", "CDM", "CM", "CAM", "RW", "LW", "CF",
];

/// Rank of a position code in [`POSITION_ORDER`]; unknown codes sort last.
pub fn position_rank(position: Option<&str>) -> usize {
    position
        .and_then(|p| POSITION_ORDER.iter().position(|known| known.eq_ignore_ascii_case(p.trim())))
        .unwrap_or(POSITION_ORDER.len())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Half {
    First,
    Second,
    ExtraTime,
}

impl Half {
    /// Half a segment belongs to, from its start in seconds.
    pub fn from_segment_start(start_seconds: i64) -> Self {
        if start_seconds <= 45 * 60 {
            Half::First
        } else if start_seconds <= 90 * 60 {
            Half::Second
        } else {
            Half::ExtraTime
        }
    }
}

/// Team ids attacking from the left and the right in the first half.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchTeams {
    pub left_team_first_half: String,
    pub right_team_first_half: String,
}

/// Team ids on each side for one segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitchSides {
    pub left: String,
    pub right: String,
}

impl MatchTeams {
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            left_team_first_half: left.into(),
            right_team_first_half: right.into(),
        }
    }

    /// Teams swap ends in the second half; extra time keeps first-half ends.
    pub fn for_half(&self, half: Half) -> PitchSides {
        match half {
            Half::First | Half::ExtraTime => PitchSides {
                left: self.left_team_first_half.clone(),
                right: self.right_team_first_half.clone(),
            },
            Half::Second => PitchSides {
                left: self.right_team_first_half.clone(),
                right: self.left_team_first_half.clone(),
            },
        }
    }
}
