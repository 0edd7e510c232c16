//! # Windowing Module
//!
//! Fixed-length, fixed-rate lookback windows paired with anchor labels.
//!
//! - `windower` - SequenceWindower, SequenceWindow, WindowStats
//! - `resample` - evenly spaced row selection within a raw window

pub mod resample;
pub mod windower;

pub use resample::resample_indices;
pub use windower::{SequenceWindow, SequenceWindower, WindowStats};
