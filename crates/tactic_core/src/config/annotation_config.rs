//! Annotation fusion settings.

use serde::{Deserialize, Serialize};

use crate::aggregation::NormalizationMode;
use crate::annotation::Vocabulary;
use crate::error::ConfigError;

/// How rater intervals become a probability table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    /// Recognized tactic names, in column order
    pub vocabulary: Vocabulary,
    /// Raters per segment (N)
    pub rater_count: usize,
    /// Divide by N or by the tick's vote total
    pub normalization: NormalizationMode,
    /// Match milliseconds per tick (1000 = seconds, 1 = milliseconds)
    pub tick_ms: i64,
    /// Exported tables keep ticks divisible by this step
    pub export_step: i64,
    /// Slack allowed above 1.0 before a probability sum is reported
    pub overflow_tolerance: f64,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            vocabulary: Vocabulary::tactics(),
            rater_count: 4,
            normalization: NormalizationMode::FixedRaterCount,
            tick_ms: 1000,
            export_step: 1,
            overflow_tolerance: 1e-6,
        }
    }
}

impl AnnotationConfig {
    /// Millisecond ticks, exported every 200 ms.
    pub fn high_resolution() -> Self {
        Self {
            tick_ms: 1,
            export_step: 200,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.rater_count == 0 {
            return Err(ConfigError::NoRaters);
        }
        if self.tick_ms <= 0 || 1000 % self.tick_ms != 0 {
            return Err(ConfigError::InvalidParameter(format!(
                "tick_ms must divide 1000, got {}",
                self.tick_ms
            )));
        }
        if self.export_step <= 0 {
            return Err(ConfigError::InvalidParameter(format!(
                "export_step must be positive, got {}",
                self.export_step
            )));
        }
        if !(self.overflow_tolerance >= 0.0) {
            return Err(ConfigError::InvalidParameter(
                "overflow_tolerance must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}
