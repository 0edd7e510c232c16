//! # Aggregation Module
//!
//! Multi-rater fusion into per-tick probability tables.
//!
//! - `aggregator` - ProbabilityAggregator and the two normalization modes
//! - `probability` - ProbabilityTimeline (lookup, downsampling, side joins)

pub mod aggregator;
pub mod probability;

pub use aggregator::{Aggregation, NormalizationMode, ProbabilityAggregator};
pub use probability::ProbabilityTimeline;
