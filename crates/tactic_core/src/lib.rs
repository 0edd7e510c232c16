//! # tactic_core - Tactical Annotation Fusion & Training-Sequence Engine
//!
//! Turns several raters' interval annotations of match video segments into
//! per-instant probability tables, measures how much the raters agree
//! (Fleiss' kappa), and pairs fixed-length tracking windows with the label
//! vector at their anchor instant.
//!
//! ## Features
//! - Deterministic: identical inputs give bit-identical tables and corpora
//! - Fixed-N and row-normalized aggregation
//! - Per-segment failures are reported, never fatal to the batch
//! - Optional rayon parallelism over segments

#![allow(clippy::type_complexity)]

pub mod aggregation;
pub mod agreement;
pub mod annotation;
pub mod config;
pub mod dataset;
pub mod error;
pub mod pipeline;
pub mod report;
pub mod tracking;
pub mod windowing;

pub use aggregation::{Aggregation, NormalizationMode, ProbabilityAggregator, ProbabilityTimeline};
pub use agreement::{
    AgreementEvaluator, AgreementReport, Evaluation, MatchAgreement, VotePatternHistogram,
};
pub use annotation::{
    Interval, IntervalSource, IntervalTimeline, RaterAnnotationSet, SegmentKey, Side, Vocabulary,
};
pub use config::PipelineConfig;
pub use dataset::{DatasetAssembler, TrainingCorpus};
pub use error::{ConfigError, PipelineError, Result};
pub use pipeline::{
    label_table, Pipeline, PipelineOutput, SegmentInput, SideAnnotations, SideTimeline,
};
pub use report::{ConsistencyWarning, RunSummary, SegmentOutcome};
pub use tracking::{LayoutStrategy, MatchTeams, TrackingFrame};
pub use windowing::{SequenceWindow, SequenceWindower, WindowStats};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
