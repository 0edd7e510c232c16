//! Inter-rater agreement reporting settings.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgreementConfig {
    /// Compute Fleiss' kappa per match side
    pub enabled: bool,
    /// Top-category share under which an annotated tick is counted as weak.
    /// Reporting only, never used to filter ticks.
    pub min_agreement: f64,
}

impl Default for AgreementConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_agreement: 0.5,
        }
    }
}

impl AgreementConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.min_agreement) {
            return Err(ConfigError::InvalidParameter(format!(
                "min_agreement must be within [0, 1], got {}",
                self.min_agreement
            )));
        }
        Ok(())
    }
}
