//! # Pipeline Configuration
//!
//! All tunable constants of the fusion/windowing pipeline in one place.
//!
//! ## Presets
//! - `seconds` (default): one-second ticks, tables exported every tick
//! - `high_resolution`: millisecond ticks exported every 200 ms, needed when
//!   labels must line up with 25 Hz tracking timestamps
//!
//! ## Usage
//! ```rust
//! use tactic_core::config::PipelineConfig;
//!
//! let config = PipelineConfig::default();
//! assert!(config.validate().is_ok());
//!
//! let hires = PipelineConfig::high_resolution();
//! assert_eq!(hires.annotation.tick_ms, 1);
//! ```
//!
//! ## Environment Variables
//!
//! - `TACTIC_PIPELINE_PROFILE`: Select preset (seconds, high_resolution)

mod agreement_config;
mod annotation_config;
mod window_config;

pub use agreement_config::AgreementConfig;
pub use annotation_config::AnnotationConfig;
pub use window_config::WindowConfig;

use serde::{Deserialize, Serialize};
use std::env;

use crate::error::ConfigError;
use crate::tracking::LayoutStrategy;

/// Environment variable selecting a preset.
pub const PROFILE_ENV: &str = "TACTIC_PIPELINE_PROFILE";

/// Full pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct PipelineConfig {
    /// Interval → probability settings
    pub annotation: AnnotationConfig,
    /// Fleiss' kappa reporting
    #[serde(default)]
    pub agreement: AgreementConfig,
    /// Sequence windowing
    #[serde(default)]
    pub window: WindowConfig,
    /// Tracking feature layout
    #[serde(default)]
    pub layout: LayoutStrategy,
    /// Process segments with rayon (output order is unaffected)
    #[serde(default)]
    pub parallel: bool,
}

impl PipelineConfig {
    /// One-second ticks (default)
    pub fn seconds() -> Self {
        Self::default()
    }

    /// Millisecond ticks exported every 200 ms
    pub fn high_resolution() -> Self {
        Self {
            annotation: AnnotationConfig::high_resolution(),
            ..Self::default()
        }
    }

    /// Preset by name.
    pub fn profile(name: &str) -> Result<Self, ConfigError> {
        match name.to_lowercase().as_str() {
            "" | "default" | "seconds" => Ok(Self::seconds()),
            "high_resolution" | "hires" | "milliseconds" => Ok(Self::high_resolution()),
            other => Err(ConfigError::UnknownProfile(other.to_string())),
        }
    }

    /// Load from `TACTIC_PIPELINE_PROFILE` or use default
    pub fn from_env_or_default() -> Self {
        Self::profile(&env::var(PROFILE_ENV).unwrap_or_default()).unwrap_or_default()
    }

    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.annotation.validate()?;
        self.agreement.validate()?;
        self.window.validate()?;
        self.layout.validate()?;
        Ok(())
    }
}

// ========== Tests ==========

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::NormalizationMode;

    #[test]
    fn test_default_config() {
        let cfg = PipelineConfig::default();
        assert_eq!(cfg.annotation.rater_count, 4);
        assert_eq!(cfg.annotation.vocabulary.len(), 9);
        assert_eq!(cfg.annotation.normalization, NormalizationMode::FixedRaterCount);
        assert_eq!(cfg.window.output_len(), 100);
        assert_eq!(cfg.window.raw_len(), 500);
        assert_eq!(cfg.window.stride(), 5);
        assert_eq!(cfg.window.warmup_rows(), 250);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_profiles() {
        assert_eq!(PipelineConfig::profile("seconds").unwrap(), PipelineConfig::default());
        assert_eq!(PipelineConfig::profile("HIRES").unwrap().annotation.export_step, 200);
        assert!(matches!(
            PipelineConfig::profile("turbo"),
            Err(ConfigError::UnknownProfile(_))
        ));
    }

    #[test]
    fn test_yaml_overrides() {
        let yaml = r#"
annotation:
  vocabulary: ["Build up", "High press"]
  rater_count: 3
  normalization: row_normalized
  tick_ms: 1000
  export_step: 1
  overflow_tolerance: 0.000001
window:
  window_seconds: 10
  input_rate_hz: 25
  output_rate_hz: 5
  warmup_seconds: 5.0
  trailing_skip_seconds: 0.0
parallel: true
"#;
        let cfg = PipelineConfig::from_yaml(yaml).unwrap();
        assert_eq!(cfg.annotation.rater_count, 3);
        assert_eq!(cfg.annotation.normalization, NormalizationMode::RowNormalized);
        assert_eq!(cfg.window.output_len(), 50);
        assert!(cfg.parallel);
        assert!(cfg.agreement.enabled, "missing sections fall back to defaults");
    }

    #[test]
    fn test_rejects_duplicate_vocabulary() {
        let yaml = r#"
annotation:
  vocabulary: ["A", "A"]
  rater_count: 4
  normalization: fixed_rater_count
  tick_ms: 1000
  export_step: 1
  overflow_tolerance: 0.0
"#;
        assert!(PipelineConfig::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_rejects_warmup_longer_than_window() {
        let mut cfg = PipelineConfig::default();
        cfg.window.warmup_seconds = 20.0;
        assert!(matches!(cfg.validate(), Err(ConfigError::InvalidWindow(_))));

        let mut cfg = PipelineConfig::default();
        cfg.annotation.rater_count = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::NoRaters));
    }

    #[test]
    fn test_config_serialization() {
        let cfg = PipelineConfig::high_resolution();
        let json = serde_json::to_string(&cfg).unwrap();
        let parsed = PipelineConfig::from_json(&json).unwrap();
        assert_eq!(parsed, cfg);
    }
}
