//! Run reporting: consistency warnings, per-segment outcomes and the run summary.

use serde::{Deserialize, Serialize};

use crate::annotation::{SegmentKey, Tick};
use crate::windowing::WindowStats;

/// Non-fatal data problem. Processing continues; the warning is collected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConsistencyWarning {
    /// Category probabilities at a tick add up to more than one.
    ProbabilityOverflow { segment: SegmentKey, tick: Tick, sum: f64 },
    /// A rating row does not account for exactly N raters.
    VoteSumMismatch {
        segment: SegmentKey,
        row: usize,
        tick: Tick,
        votes: u32,
        expected: u32,
    },
}

impl ConsistencyWarning {
    pub fn segment(&self) -> &SegmentKey {
        match self {
            ConsistencyWarning::ProbabilityOverflow { segment, .. } => segment,
            ConsistencyWarning::VoteSumMismatch { segment, .. } => segment,
        }
    }

    pub fn description(&self) -> String {
        match self {
            ConsistencyWarning::ProbabilityOverflow { segment, tick, sum } => {
                format!("{} tick {}: probabilities sum to {:.4} (> 1)", segment, tick, sum)
            }
            ConsistencyWarning::VoteSumMismatch {
                segment,
                row,
                tick,
                votes,
                expected,
            } => format!(
                "{} row {} (tick {}): {} votes, expected {}",
                segment, row, tick, votes, expected
            ),
        }
    }
}

/// What happened to one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SegmentOutcome {
    /// Aggregated and windowed.
    Completed { windows: usize },
    /// Aggregated, but no training windows were built (e.g. no tracking data).
    LabelsOnly { reason: String },
    /// Nothing from this segment reached the outputs.
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentReport {
    pub segment: SegmentKey,
    #[serde(flatten)]
    pub status: SegmentOutcome,
}

/// Always emitted alongside the corpus.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub segments: Vec<SegmentReport>,
    pub warnings: Vec<ConsistencyWarning>,
    /// Scopes whose agreement could not be computed, with the reason.
    pub skipped_evaluations: Vec<String>,
    pub window_stats: WindowStats,
    pub unknown_labels: usize,
}

impl RunSummary {
    pub fn record(&mut self, segment: SegmentKey, status: SegmentOutcome) {
        self.segments.push(SegmentReport { segment, status });
    }

    pub fn completed(&self) -> usize {
        self.segments
            .iter()
            .filter(|r| matches!(r.status, SegmentOutcome::Completed { .. }))
            .count()
    }

    pub fn skipped(&self) -> impl Iterator<Item = &SegmentReport> {
        self.segments
            .iter()
            .filter(|r| matches!(r.status, SegmentOutcome::Skipped { .. }))
    }

    /// Segments carrying at least one consistency warning, in canonical order.
    pub fn flagged_segments(&self) -> Vec<SegmentKey> {
        let mut flagged: Vec<SegmentKey> =
            self.warnings.iter().map(|w| w.segment().clone()).collect();
        flagged.sort();
        flagged.dedup();
        flagged
    }
}
