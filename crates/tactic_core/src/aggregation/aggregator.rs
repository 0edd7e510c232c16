//! Fuse N rater timelines into per-tick probabilities.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::probability::ProbabilityTimeline;
use crate::annotation::{IntervalTimeline, RaterAnnotationSet, SegmentKey, Tick, Vocabulary};
use crate::config::AnnotationConfig;
use crate::error::{PipelineError, Result};
use crate::report::ConsistencyWarning;

/// How vote counts become probabilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationMode {
    /// votes / N. Categories are independent, rows need not sum to 1.
    FixedRaterCount,
    /// votes / total votes at the tick. Rows sum to 1, or are all zero.
    RowNormalized,
}

/// Result of aggregating one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregation {
    pub timeline: ProbabilityTimeline,
    pub warnings: Vec<ConsistencyWarning>,
    /// Interval labels outside the vocabulary, over all raters
    pub unknown_labels: usize,
}

#[derive(Debug, Clone)]
pub struct ProbabilityAggregator {
    vocabulary: Vocabulary,
    rater_count: usize,
    mode: NormalizationMode,
    tick_ms: i64,
    overflow_tolerance: f64,
}

impl ProbabilityAggregator {
    pub fn new(config: &AnnotationConfig) -> Self {
        Self {
            vocabulary: config.vocabulary.clone(),
            rater_count: config.rater_count,
            mode: config.normalization,
            tick_ms: config.tick_ms,
            overflow_tolerance: config.overflow_tolerance,
        }
    }

    pub fn with_mode(mut self, mode: NormalizationMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn rater_count(&self) -> usize {
        self.rater_count
    }

    /// Expand every rater's intervals and aggregate them.
    ///
    /// The segment is refused (never partially aggregated) when a rater is
    /// missing or a set belongs to another segment.
    pub fn aggregate(
        &self,
        segment: &SegmentKey,
        raters: &[RaterAnnotationSet],
    ) -> Result<Aggregation> {
        self.check_raters(segment, raters.iter().map(|r| (&r.rater_id, &r.video_key)))?;

        let timelines: Vec<IntervalTimeline> = raters
            .iter()
            .map(|r| IntervalTimeline::expand(r, segment, &self.vocabulary))
            .collect();

        self.aggregate_timelines(segment, &timelines)
    }

    /// Aggregate already expanded timelines.
    pub fn aggregate_timelines(
        &self,
        segment: &SegmentKey,
        timelines: &[IntervalTimeline],
    ) -> Result<Aggregation> {
        self.check_raters(segment, timelines.iter().map(|t| (t.rater_id(), t.segment())))?;

        let k = self.vocabulary.len();
        let n_ticks = segment.len();
        let mut votes = vec![0u32; n_ticks * k];

        for timeline in timelines {
            for (i, set) in timeline.sets().iter().enumerate() {
                for category in set.iter() {
                    votes[i * k + category] += 1;
                }
            }
        }

        let mut values = Vec::with_capacity(votes.len());
        let mut warnings = Vec::new();
        let ticks: Vec<Tick> = (segment.start..segment.end).collect();

        for (i, row) in votes.chunks_exact(k).enumerate() {
            match self.mode {
                NormalizationMode::FixedRaterCount => {
                    let n = self.rater_count as f64;
                    let start = values.len();
                    values.extend(row.iter().map(|&v| v as f64 / n));

                    let sum: f64 = values[start..].iter().sum();
                    if sum > 1.0 + self.overflow_tolerance {
                        warn!(
                            segment = %segment,
                            tick = ticks[i],
                            sum,
                            "probabilities sum above 1"
                        );
                        warnings.push(ConsistencyWarning::ProbabilityOverflow {
                            segment: segment.clone(),
                            tick: ticks[i],
                            sum,
                        });
                    }
                }
                NormalizationMode::RowNormalized => {
                    let total: u32 = row.iter().sum();
                    if total == 0 {
                        values.extend(std::iter::repeat(0.0).take(k));
                    } else {
                        values.extend(row.iter().map(|&v| v as f64 / total as f64));
                    }
                }
            }
        }

        let unknown_labels = timelines.iter().map(|t| t.unknown_labels()).sum();
        debug!(
            segment = %segment,
            ticks = n_ticks,
            raters = timelines.len(),
            mode = ?self.mode,
            "segment aggregated"
        );

        Ok(Aggregation {
            timeline: ProbabilityTimeline::from_parts(
                segment.clone(),
                self.vocabulary.names().to_vec(),
                self.tick_ms,
                ticks,
                values,
            ),
            warnings,
            unknown_labels,
        })
    }

    fn check_raters<'a, I, R>(&self, segment: &SegmentKey, raters: I) -> Result<()>
    where
        I: Iterator<Item = (&'a R, &'a SegmentKey)>,
        R: AsRef<str> + ?Sized + 'a,
    {
        let mut seen: Vec<&str> = Vec::new();
        for (rater_id, key) in raters {
            let rater_id = rater_id.as_ref();
            if key != segment {
                return Err(PipelineError::missing(
                    segment,
                    format!("rater {} annotated {} instead", rater_id, key),
                ));
            }
            if seen.contains(&rater_id) {
                return Err(PipelineError::RaterCount {
                    segment: segment.clone(),
                    expected: self.rater_count,
                    found: seen.len() + 1,
                });
            }
            seen.push(rater_id);
        }

        if seen.len() < self.rater_count {
            return Err(PipelineError::missing(
                segment,
                format!("{} of {} raters present", seen.len(), self.rater_count),
            ));
        }
        if seen.len() > self.rater_count {
            return Err(PipelineError::RaterCount {
                segment: segment.clone(),
                expected: self.rater_count,
                found: seen.len(),
            });
        }
        Ok(())
    }
}
