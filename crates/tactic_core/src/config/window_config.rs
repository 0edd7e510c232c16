//! Sequence windowing settings.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Fixed-length lookback windows over tracking rows.
///
/// Defaults: 20 s windows of 25 Hz tracking resampled to 5 Hz (100 rows),
/// an anchor every 5 tracking rows, 10 s warm-up, last second skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowConfig {
    /// Lookback length W in seconds
    pub window_seconds: u32,
    /// Nominal tracking rate F_hz
    pub input_rate_hz: u32,
    /// Output rate R_hz; T = R_hz · W rows per window
    pub output_rate_hz: u32,
    /// Tracking rows between anchors (default F_hz / R_hz)
    #[serde(default)]
    pub anchor_stride: Option<usize>,
    /// Leading seconds without anchors; shorter than W
    pub warmup_seconds: f64,
    /// Trailing seconds without anchors
    pub trailing_skip_seconds: f64,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            window_seconds: 20,
            input_rate_hz: 25,
            output_rate_hz: 5,
            anchor_stride: None,
            warmup_seconds: 10.0,
            trailing_skip_seconds: 1.0,
        }
    }
}

impl WindowConfig {
    /// Rows in every emitted window (T).
    pub fn output_len(&self) -> usize {
        (self.output_rate_hz * self.window_seconds) as usize
    }

    /// Rows of the padded raw window (F_hz · W).
    pub fn raw_len(&self) -> usize {
        (self.input_rate_hz * self.window_seconds) as usize
    }

    pub fn window_ms(&self) -> i64 {
        self.window_seconds as i64 * 1000
    }

    pub fn stride(&self) -> usize {
        self.anchor_stride
            .unwrap_or_else(|| (self.input_rate_hz / self.output_rate_hz.max(1)).max(1) as usize)
    }

    pub fn warmup_rows(&self) -> usize {
        (self.warmup_seconds * self.input_rate_hz as f64).round() as usize
    }

    pub fn trailing_rows(&self) -> usize {
        (self.trailing_skip_seconds * self.input_rate_hz as f64).round() as usize
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.window_seconds == 0 {
            return Err(ConfigError::InvalidWindow("window_seconds must be positive".to_string()));
        }
        if self.input_rate_hz == 0 || self.output_rate_hz == 0 {
            return Err(ConfigError::InvalidWindow("sample rates must be positive".to_string()));
        }
        if self.output_rate_hz > self.input_rate_hz {
            return Err(ConfigError::InvalidWindow(format!(
                "output rate {} Hz exceeds tracking rate {} Hz",
                self.output_rate_hz, self.input_rate_hz
            )));
        }
        if self.anchor_stride == Some(0) {
            return Err(ConfigError::InvalidWindow("anchor_stride must be positive".to_string()));
        }
        if !(self.warmup_seconds >= 0.0) || self.warmup_seconds >= self.window_seconds as f64 {
            return Err(ConfigError::InvalidWindow(format!(
                "warmup_seconds must be within [0, {}), got {}",
                self.window_seconds, self.warmup_seconds
            )));
        }
        if !(self.trailing_skip_seconds >= 0.0) {
            return Err(ConfigError::InvalidWindow(
                "trailing_skip_seconds must be non-negative".to_string(),
            ));
        }
        Ok(())
    }
}
