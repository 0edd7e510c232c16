use thiserror::Error;

use crate::annotation::SegmentKey;

/// Unrecoverable configuration problems. These abort the whole run.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Category vocabulary is empty")]
    EmptyVocabulary,

    #[error("Duplicate category in vocabulary: {0}")]
    DuplicateCategory(String),

    #[error("Vocabulary has {size} categories, at most {max} are supported")]
    VocabularyTooLarge { size: usize, max: usize },

    #[error("Rater count must be at least 1")]
    NoRaters,

    #[error("Invalid window parameter: {0}")]
    InvalidWindow(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Unknown pipeline profile: {0}")]
    UnknownProfile(String),

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

/// Errors raised while processing one segment or one evaluation scope.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Missing input for segment {segment}: {what}")]
    MissingInput { segment: SegmentKey, what: String },

    #[error("Segment {segment} has {found} rater sets, expected {expected}")]
    RaterCount {
        segment: SegmentKey,
        expected: usize,
        found: usize,
    },

    #[error("Insufficient data for {scope}: {detail}")]
    InsufficientData { scope: String, detail: String },

    #[error("Invalid interval [{start}, {end}) for label '{label}'")]
    InvalidInterval { label: String, start: i64, end: i64 },

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl PipelineError {
    pub fn missing(segment: &SegmentKey, what: impl Into<String>) -> Self {
        PipelineError::MissingInput {
            segment: segment.clone(),
            what: what.into(),
        }
    }

    pub fn insufficient(scope: impl Into<String>, detail: impl Into<String>) -> Self {
        PipelineError::InsufficientData {
            scope: scope.into(),
            detail: detail.into(),
        }
    }

    /// Whether the batch may continue after this error (the failing scope is skipped).
    pub fn is_recoverable(&self) -> bool {
        match self {
            PipelineError::MissingInput { .. } => true,
            PipelineError::RaterCount { .. } => true,
            PipelineError::InsufficientData { .. } => true,
            PipelineError::InvalidInterval { .. } => true,
            PipelineError::Parse(_) => true,
            PipelineError::ShapeMismatch(_) => false,
            PipelineError::Config(_) => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        let key = SegmentKey::new("1001", 0, 60);
        assert!(PipelineError::missing(&key, "rater 3").is_recoverable());
        assert!(PipelineError::insufficient("kappa", "N < 2").is_recoverable());
        assert!(!PipelineError::from(ConfigError::EmptyVocabulary).is_recoverable());
    }

    #[test]
    fn test_missing_input_message_names_segment() {
        let key = SegmentKey::new("1001", 60, 120);
        let msg = PipelineError::missing(&key, "tracking").to_string();
        assert!(msg.contains("1001"), "message should carry the game id: {}", msg);
        assert!(msg.contains("tracking"));
    }
}
