//! # Annotation Module
//!
//! Rater-side data: category vocabulary, labelled intervals, segment keys and
//! the per-rater dense timeline.
//!
//! - `types` - Vocabulary, Interval, SegmentKey, RaterAnnotationSet, Side
//! - `timeline` - IntervalTimeline (per-tick label presence)
//! - `source` - IntervalSource abstraction over export formats
//! - `playlist` - coded playlist events → intervals
//! - `clock` - `MM:SS` parsing and video-name ranges

pub mod clock;
pub mod playlist;
pub mod source;
pub mod timeline;
pub mod types;

pub use playlist::{intervals_from_playlist, CodeEvent, PlaylistSource, END_CODE};
pub use source::{group_by_segment, InMemorySource, IntervalSource};
pub use timeline::IntervalTimeline;
pub use types::{
    CategorySet, Interval, RaterAnnotationSet, SegmentKey, Side, Tick, Vocabulary, DEFAULT_TACTICS,
    MAX_CATEGORIES, RESIDUAL_CATEGORY,
};
