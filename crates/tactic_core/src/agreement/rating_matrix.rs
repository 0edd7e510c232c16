//! Integer rating matrix derived from fixed-N probability tables.

use tracing::warn;

use crate::aggregation::ProbabilityTimeline;
use crate::annotation::{SegmentKey, Tick, RESIDUAL_CATEGORY};
use crate::error::{PipelineError, Result};
use crate::report::ConsistencyWarning;

/// Vote counts per category (residual last) for every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingMatrix {
    categories: Vec<String>,
    rater_count: u32,
    votes: Vec<u32>,
    /// `(segment, tick)` behind each row, for reporting
    origins: Vec<(SegmentKey, Tick)>,
}

impl RatingMatrix {
    /// Build rows from raw vote counts for `segment`, one row per tick from
    /// `segment.start`. Each row must have `categories.len()` entries.
    pub fn from_rows(
        segment: &SegmentKey,
        categories: Vec<String>,
        rater_count: u32,
        rows: &[Vec<u32>],
    ) -> Result<Self> {
        let width = categories.len();
        let mut votes = Vec::with_capacity(rows.len() * width);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(PipelineError::ShapeMismatch(format!(
                    "row {} has {} columns, expected {}",
                    i,
                    row.len(),
                    width
                )));
            }
            votes.extend_from_slice(row);
        }
        let origins = (0..rows.len())
            .map(|i| (segment.clone(), segment.start + i as Tick))
            .collect();

        Ok(Self {
            categories,
            rater_count,
            votes,
            origins,
        })
    }

    /// Scale a fixed-N table by `rater_count`, appending the residual column.
    ///
    /// Residual is `max(0, 1 − Σ p)` before scaling; votes are rounded to the
    /// nearest integer. Sums above `1 + tolerance` are reported.
    pub fn from_timeline(
        timeline: &ProbabilityTimeline,
        rater_count: u32,
        tolerance: f64,
    ) -> (Self, Vec<ConsistencyWarning>) {
        let mut categories = timeline.categories().to_vec();
        categories.push(RESIDUAL_CATEGORY.to_string());

        let n = rater_count as f64;
        let mut votes = Vec::with_capacity(timeline.len() * categories.len());
        let mut warnings = Vec::new();

        for (tick, row) in timeline.iter() {
            let sum: f64 = row.iter().sum();
            if sum > 1.0 + tolerance {
                warn!(
                    segment = %timeline.key(),
                    tick,
                    sum,
                    "probability sum above 1 in rating row"
                );
                warnings.push(ConsistencyWarning::ProbabilityOverflow {
                    segment: timeline.key().clone(),
                    tick,
                    sum,
                });
            }
            let residual = (1.0 - sum).max(0.0);

            votes.extend(row.iter().map(|&p| (p * n).round() as u32));
            votes.push((residual * n).round() as u32);
        }

        let origins = timeline
            .ticks()
            .iter()
            .map(|&t| (timeline.key().clone(), t))
            .collect();

        (
            Self {
                categories,
                rater_count,
                votes,
                origins,
            },
            warnings,
        )
    }

    /// Concatenate matrices row-wise.
    pub fn stack(matrices: &[RatingMatrix]) -> Result<Self> {
        let first = matrices
            .first()
            .ok_or_else(|| PipelineError::insufficient("rating matrix", "nothing to stack"))?;

        let mut stacked = Self {
            categories: first.categories.clone(),
            rater_count: first.rater_count,
            votes: Vec::new(),
            origins: Vec::new(),
        };
        for m in matrices {
            if m.categories != stacked.categories || m.rater_count != stacked.rater_count {
                return Err(PipelineError::ShapeMismatch(format!(
                    "cannot stack {}-column/N={} matrix onto {}-column/N={}",
                    m.width(),
                    m.rater_count,
                    stacked.width(),
                    stacked.rater_count
                )));
            }
            stacked.votes.extend_from_slice(&m.votes);
            stacked.origins.extend(m.origins.iter().cloned());
        }
        Ok(stacked)
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn rater_count(&self) -> u32 {
        self.rater_count
    }

    /// Number of categories (k), residual included.
    pub fn width(&self) -> usize {
        self.categories.len()
    }

    /// Number of rows (n).
    pub fn len(&self) -> usize {
        if self.width() == 0 {
            0
        } else {
            self.votes.len() / self.width()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn row(&self, index: usize) -> &[u32] {
        let k = self.width();
        &self.votes[index * k..(index + 1) * k]
    }

    pub fn rows(&self) -> impl Iterator<Item = &[u32]> + '_ {
        self.votes.chunks_exact(self.width().max(1))
    }

    /// Rows whose votes do not add up to N. Reported, never corrected.
    pub fn validate_rows(&self) -> Vec<ConsistencyWarning> {
        let mut flagged = Vec::new();
        for (i, row) in self.rows().enumerate() {
            let total: u32 = row.iter().sum();
            if total != self.rater_count {
                let (segment, tick) = self.origins[i].clone();
                warn!(
                    segment = %segment,
                    row = i,
                    tick,
                    votes = total,
                    expected = self.rater_count,
                    "rating row does not sum to rater count"
                );
                flagged.push(ConsistencyWarning::VoteSumMismatch {
                    segment,
                    row: i,
                    tick,
                    votes: total,
                    expected: self.rater_count,
                });
            }
        }
        flagged
    }
}
