//! End-to-end batch: aggregate, evaluate, window and assemble.
//!
//! Every segment is processed independently; a failing segment is recorded
//! in the [`RunSummary`] and never aborts the batch.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::aggregation::{NormalizationMode, ProbabilityAggregator, ProbabilityTimeline};
use crate::agreement::{AgreementEvaluator, MatchAgreement};
use crate::annotation::{RaterAnnotationSet, SegmentKey, Side};
use crate::config::PipelineConfig;
use crate::dataset::{DatasetAssembler, TrainingCorpus};
use crate::error::{ConfigError, PipelineError, Result};
use crate::report::{ConsistencyWarning, RunSummary, SegmentOutcome};
use crate::tracking::{slice_segment, FeatureLayout, MatchTeams, TrackingFrame};
use crate::windowing::{SequenceWindow, SequenceWindower, WindowStats};

/// The N rater sets describing one side of a segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideAnnotations {
    pub side: Side,
    pub raters: Vec<RaterAnnotationSet>,
}

/// Everything known about one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentInput {
    pub key: SegmentKey,
    pub sides: Vec<SideAnnotations>,
    /// Tracking frames of the match (or of the segment); sliced to the key
    #[serde(default)]
    pub tracking: Option<Vec<TrackingFrame>>,
    /// Needed by the side layout
    #[serde(default)]
    pub teams: Option<MatchTeams>,
}

impl SegmentInput {
    pub fn new(key: SegmentKey) -> Self {
        Self {
            key,
            sides: Vec::new(),
            tracking: None,
            teams: None,
        }
    }

    pub fn with_side(mut self, side: Side, raters: Vec<RaterAnnotationSet>) -> Self {
        self.sides.push(SideAnnotations { side, raters });
        self
    }

    pub fn with_tracking(mut self, frames: Vec<TrackingFrame>, teams: Option<MatchTeams>) -> Self {
        self.tracking = Some(frames);
        self.teams = teams;
        self
    }
}

/// Exported probability table of one side of one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideTimeline {
    pub side: Side,
    pub timeline: ProbabilityTimeline,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    /// Per segment, in segment order
    pub timelines: BTreeMap<SegmentKey, Vec<SideTimeline>>,
    /// Per game, in game id order
    pub agreement: Vec<MatchAgreement>,
    pub corpus: TrainingCorpus,
    pub summary: RunSummary,
}

/// Result of processing one segment, before assembly.
#[derive(Debug)]
struct SegmentResult {
    key: SegmentKey,
    outcome: SegmentOutcome,
    timelines: Vec<SideTimeline>,
    /// Fixed-N tables for agreement
    rating_tables: Vec<SideTimeline>,
    label_columns: Vec<String>,
    windows: Vec<SequenceWindow>,
    stats: WindowStats,
    warnings: Vec<ConsistencyWarning>,
    unknown_labels: usize,
}

impl SegmentResult {
    fn skipped(key: SegmentKey, reason: String) -> Self {
        Self {
            key,
            outcome: SegmentOutcome::Skipped { reason },
            timelines: Vec::new(),
            rating_tables: Vec::new(),
            label_columns: Vec::new(),
            windows: Vec::new(),
            stats: WindowStats::default(),
            warnings: Vec::new(),
            unknown_labels: 0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Pipeline {
    config: PipelineConfig,
    aggregator: ProbabilityAggregator,
    windower: SequenceWindower,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> std::result::Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            aggregator: ProbabilityAggregator::new(&config.annotation),
            windower: SequenceWindower::new(&config.window),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run over all segments; the corpus covers every match in game id order.
    pub fn run(&self, segments: Vec<SegmentInput>) -> PipelineOutput {
        self.run_ordered(segments, &[])
    }

    /// Run over all segments, concatenating match corpora in `match_order`.
    pub fn run_ordered(
        &self,
        segments: Vec<SegmentInput>,
        match_order: &[String],
    ) -> PipelineOutput {
        info!(segments = segments.len(), parallel = self.config.parallel, "pipeline run started");

        let mut results: Vec<SegmentResult> = if self.config.parallel {
            segments.into_par_iter().map(|s| self.process_segment(s)).collect()
        } else {
            segments.into_iter().map(|s| self.process_segment(s)).collect()
        };
        results.sort_by(|a, b| a.key.cmp(&b.key));

        let mut summary = RunSummary::default();
        let mut assembler =
            DatasetAssembler::new(self.config.window.output_len(), self.config.layout.width());
        let mut timelines = BTreeMap::new();
        let mut rating_tables: BTreeMap<String, BTreeMap<Side, Vec<ProbabilityTimeline>>> =
            BTreeMap::new();

        for result in results {
            let mut outcome = result.outcome;
            if let SegmentOutcome::Completed { .. } = outcome {
                let added =
                    assembler.add_segment(&result.key, &result.label_columns, &result.windows);
                if let Err(e) = added {
                    warn!(segment = %result.key, error = %e, "windows rejected by assembler");
                    outcome = SegmentOutcome::Skipped { reason: e.to_string() };
                }
            }

            summary.window_stats.merge(&result.stats);
            summary.warnings.extend(result.warnings);
            summary.unknown_labels += result.unknown_labels;

            let game = rating_tables.entry(result.key.game_id.clone()).or_default();
            for table in result.rating_tables {
                game.entry(table.side).or_default().push(table.timeline);
            }
            if !result.timelines.is_empty() {
                timelines.insert(result.key.clone(), result.timelines);
            }
            summary.record(result.key, outcome);
        }

        let agreement = if self.config.agreement.enabled {
            self.evaluate_agreement(&rating_tables, &mut summary)
        } else {
            Vec::new()
        };

        let (corpus, rejected) = assembler.finish(match_order);
        summary
            .skipped_evaluations
            .extend(rejected.iter().map(|e| format!("corpus: {}", e)));

        info!(
            completed = summary.completed(),
            skipped = summary.skipped().count(),
            windows = corpus.len(),
            warnings = summary.warnings.len(),
            "pipeline run finished"
        );

        PipelineOutput {
            timelines,
            agreement,
            corpus,
            summary,
        }
    }

    fn evaluate_agreement(
        &self,
        tables: &BTreeMap<String, BTreeMap<Side, Vec<ProbabilityTimeline>>>,
        summary: &mut RunSummary,
    ) -> Vec<MatchAgreement> {
        let evaluator = AgreementEvaluator::new(&self.config.annotation, &self.config.agreement);
        let mut results = Vec::new();

        for (game, sides) in tables {
            if sides.is_empty() {
                continue;
            }
            let per_side: Vec<(Side, Vec<&ProbabilityTimeline>)> = sides
                .iter()
                .map(|(side, timelines)| (*side, timelines.iter().collect()))
                .collect();
            let result = evaluator.evaluate_match(game, &per_side);

            // overflowing rows were already reported by the aggregator
            for (_, evaluation) in &result.sides {
                summary.warnings.extend(
                    evaluation
                        .warnings
                        .iter()
                        .filter(|w| matches!(w, ConsistencyWarning::VoteSumMismatch { .. }))
                        .cloned(),
                );
            }
            summary.skipped_evaluations.extend(result.skipped.iter().cloned());
            results.push(result);
        }
        results
    }

    fn process_segment(&self, input: SegmentInput) -> SegmentResult {
        let key = input.key.clone();
        match self.try_process_segment(input) {
            Ok(result) => result,
            Err(e) => {
                warn!(segment = %key, error = %e, "segment skipped");
                SegmentResult::skipped(key, e.to_string())
            }
        }
    }

    fn try_process_segment(&self, input: SegmentInput) -> Result<SegmentResult> {
        let key = input.key;
        if input.sides.is_empty() {
            return Err(PipelineError::missing(&key, "no annotation sides"));
        }

        let mut sides = input.sides;
        sides.sort_by_key(|s| s.side);
        if sides.windows(2).any(|w| w[0].side == w[1].side) {
            return Err(PipelineError::missing(&key, "the same side is annotated twice"));
        }

        let annotation = &self.config.annotation;
        let mut timelines = Vec::with_capacity(sides.len());
        let mut rating_tables = Vec::with_capacity(sides.len());
        let mut warnings = Vec::new();
        let mut unknown_labels = 0;

        for side in &sides {
            let aggregation = self.aggregator.aggregate(&key, &side.raters)?;
            warnings.extend(aggregation.warnings);
            unknown_labels += aggregation.unknown_labels;
            let exported = aggregation.timeline.downsample(annotation.export_step);

            if self.config.agreement.enabled {
                let fixed = match annotation.normalization {
                    NormalizationMode::FixedRaterCount => exported.clone(),
                    NormalizationMode::RowNormalized => self
                        .aggregator
                        .clone()
                        .with_mode(NormalizationMode::FixedRaterCount)
                        .aggregate(&key, &side.raters)?
                        .timeline
                        .downsample(annotation.export_step),
                };
                rating_tables.push(SideTimeline {
                    side: side.side,
                    timeline: fixed,
                });
            }
            timelines.push(SideTimeline {
                side: side.side,
                timeline: exported,
            });
        }

        let labels = label_table(&timelines)?;
        let mut result = SegmentResult {
            key: key.clone(),
            outcome: SegmentOutcome::LabelsOnly { reason: String::new() },
            timelines,
            rating_tables,
            label_columns: labels.categories().to_vec(),
            windows: Vec::new(),
            stats: WindowStats::default(),
            warnings,
            unknown_labels,
        };

        match self.window_segment(&key, input.tracking.as_deref(), input.teams.as_ref(), &labels) {
            Ok((windows, stats)) => {
                result.outcome = SegmentOutcome::Completed { windows: windows.len() };
                result.windows = windows;
                result.stats = stats;
            }
            Err(e) => {
                debug!(segment = %key, reason = %e, "segment kept without windows");
                result.outcome = SegmentOutcome::LabelsOnly { reason: e.to_string() };
            }
        }
        Ok(result)
    }

    fn window_segment(
        &self,
        key: &SegmentKey,
        tracking: Option<&[TrackingFrame]>,
        teams: Option<&MatchTeams>,
        labels: &ProbabilityTimeline,
    ) -> Result<(Vec<SequenceWindow>, WindowStats)> {
        let frames = tracking.ok_or_else(|| PipelineError::missing(key, "tracking data"))?;
        let tick_ms = self.config.annotation.tick_ms;
        let frames = slice_segment(frames, key, tick_ms);
        if frames.is_empty() {
            return Err(PipelineError::insufficient(
                key.to_string(),
                "no tracking frames inside the segment",
            ));
        }

        let layout = FeatureLayout::resolve(&self.config.layout, key, tick_ms, teams)?;
        let rows = layout.pivot(&frames);
        Ok(self.windower.windows(&rows, labels))
    }
}

/// Label table of a segment: the single side as is, or every side's columns
/// suffixed and joined in side order.
pub fn label_table(timelines: &[SideTimeline]) -> Result<ProbabilityTimeline> {
    match timelines {
        [] => Err(PipelineError::ShapeMismatch("no timelines to label with".to_string())),
        [single] => Ok(single.timeline.clone()),
        [first, rest @ ..] => {
            let mut joined = first.timeline.labelled_for(first.side);
            for t in rest {
                joined = joined.join(&t.timeline.labelled_for(t.side))?;
            }
            Ok(joined)
        }
    }
}

// ========== Tests ==========

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{Interval, Tick, Vocabulary};
    use crate::config::{AnnotationConfig, WindowConfig};
    use crate::tracking::LayoutStrategy;

    fn config() -> PipelineConfig {
        PipelineConfig {
            annotation: AnnotationConfig {
                vocabulary: Vocabulary::new(["A", "B"]).unwrap(),
                ..AnnotationConfig::default()
            },
            window: WindowConfig {
                window_seconds: 2,
                input_rate_hz: 5,
                output_rate_hz: 1,
                anchor_stride: Some(5),
                warmup_seconds: 0.0,
                trailing_skip_seconds: 0.0,
            },
            layout: LayoutStrategy::Roster {
                entities: vec!["ball".to_string()],
            },
            ..PipelineConfig::default()
        }
    }

    fn raters(key: &SegmentKey, labels: [&str; 4]) -> Vec<RaterAnnotationSet> {
        labels
            .iter()
            .enumerate()
            .map(|(i, l)| {
                RaterAnnotationSet::new(
                    format!("r{}", i),
                    key.clone(),
                    vec![Interval::new(*l, key.start, key.end).unwrap()],
                )
            })
            .collect()
    }

    /// Ball frames every 200 ms across `[start, end]` seconds.
    fn ball(start: Tick, end: Tick) -> Vec<TrackingFrame> {
        (start * 5..=end * 5)
            .map(|i| TrackingFrame::ball(i as u64, i * 200, i as f64, 1.0))
            .collect()
    }

    fn segment(game: &str, start: Tick, end: Tick) -> SegmentInput {
        let key = SegmentKey::new(game, start, end);
        SegmentInput::new(key.clone())
            .with_side(Side::Whole, raters(&key, ["A", "A", "A", "B"]))
            .with_tracking(ball(start, end), None)
    }

    #[test]
    fn test_end_to_end_single_side() {
        let pipeline = Pipeline::new(config()).unwrap();
        let output = pipeline.run(vec![segment("1", 0, 10)]);

        assert_eq!(output.summary.completed(), 1);
        let corpus = &output.corpus;
        // 51 rows, stride 5 → anchors 0, 5, …, 50: one per second, all labelled
        assert_eq!(corpus.len(), 11);
        assert_eq!(corpus.shape(), ([11, 2, 2], [11, 2]));
        assert_eq!(corpus.label(3), &[0.75, 0.25]);
        assert_eq!(output.summary.window_stats.unlabeled, 1, "t = 10 s lies at the segment end");

        let agreement = &output.agreement[0];
        assert_eq!(agreement.game_id, "1");
        assert!(agreement.combined.is_some());
    }

    #[test]
    fn test_two_sides_concatenate_labels() {
        let key = SegmentKey::new("1", 0, 10);
        let input = SegmentInput::new(key.clone())
            .with_side(Side::Right, raters(&key, ["B", "B", "B", "B"]))
            .with_side(Side::Left, raters(&key, ["A", "A", "B", "B"]))
            .with_tracking(ball(0, 10), None);

        let output = Pipeline::new(config()).unwrap().run(vec![input]);
        let corpus = &output.corpus;
        assert_eq!(corpus.categories(), &["A 1", "B 1", "A 2", "B 2"]);
        assert_eq!(corpus.label(0), &[0.5, 0.5, 0.0, 1.0]);
        assert_eq!(output.agreement[0].sides.len(), 2);
        assert_eq!(output.timelines[&key].len(), 2);
    }

    #[test]
    fn test_missing_rater_and_missing_tracking_do_not_abort() {
        let good = segment("1", 0, 10);
        let key = SegmentKey::new("1", 10, 20);
        let mut short = raters(&key, ["A", "A", "A", "B"]);
        short.pop();
        let missing_rater = SegmentInput::new(key).with_side(Side::Whole, short);
        let key = SegmentKey::new("2", 0, 10);
        let no_tracking = SegmentInput::new(key.clone())
            .with_side(Side::Whole, raters(&key, ["A", "B", "A", "B"]));

        let output = Pipeline::new(config()).unwrap().run(vec![no_tracking, missing_rater, good]);
        let statuses: Vec<&SegmentOutcome> =
            output.summary.segments.iter().map(|r| &r.status).collect();

        assert!(matches!(statuses[0], SegmentOutcome::Completed { .. }));
        assert!(matches!(statuses[1], SegmentOutcome::Skipped { .. }));
        assert!(matches!(statuses[2], SegmentOutcome::LabelsOnly { .. }));
        assert_eq!(output.corpus.len(), 11);
        assert_eq!(output.timelines.len(), 2);
    }

    #[test]
    fn test_side_layout_without_teams_is_labels_only() {
        let cfg = PipelineConfig {
            layout: LayoutStrategy::default(),
            ..config()
        };
        let output = Pipeline::new(cfg).unwrap().run(vec![segment("1", 0, 10)]);
        assert!(matches!(
            output.summary.segments[0].status,
            SegmentOutcome::LabelsOnly { .. }
        ));
        assert!(output.corpus.is_empty());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let inputs = || vec![segment("2", 0, 10), segment("1", 10, 20), segment("1", 0, 10)];
        let sequential = Pipeline::new(config()).unwrap().run(inputs());
        let parallel = Pipeline::new(PipelineConfig {
            parallel: true,
            ..config()
        })
        .unwrap()
        .run(inputs());

        assert_eq!(sequential.corpus, parallel.corpus);
        assert_eq!(sequential.summary, parallel.summary);
        assert_eq!(sequential.corpus.origins()[0].segment, SegmentKey::new("1", 0, 10));
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let mut cfg = config();
        cfg.annotation.rater_count = 0;
        assert!(Pipeline::new(cfg).is_err());
    }
}
