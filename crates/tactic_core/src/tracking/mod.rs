//! # Tracking Module
//!
//! Positional tracking input and its wide per-instant layout.
//!
//! - `frame` - TrackingFrame, EntityId, segment slicing
//! - `sides` - halves, side swap, position ordering
//! - `layout` - LayoutStrategy / FeatureLayout and the pivot to TrackingRows

pub mod frame;
pub mod layout;
pub mod sides;

pub use frame::{slice_segment, EntityId, TrackingFrame};
pub use layout::{FeatureLayout, LayoutStrategy, TrackingRows};
pub use sides::{position_rank, Half, MatchTeams, PitchSides, POSITION_ORDER};
