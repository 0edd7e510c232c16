//! Flat training corpus: `[n, T, F]` features and `[n, K]` labels.

use serde::{Deserialize, Serialize};

use crate::annotation::SegmentKey;
use crate::error::{PipelineError, Result};
use crate::windowing::SequenceWindow;

/// Where a corpus row came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowOrigin {
    pub segment: SegmentKey,
    pub anchor_time: i64,
}

/// Row i of `features`, `labels` and `origins` always describe the same window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingCorpus {
    sequence_len: usize,
    feature_count: usize,
    /// Label column names; empty until the first window is appended
    categories: Vec<String>,
    features: Vec<f64>,
    labels: Vec<f64>,
    origins: Vec<WindowOrigin>,
}

impl TrainingCorpus {
    pub fn new(sequence_len: usize, feature_count: usize) -> Self {
        Self {
            sequence_len,
            feature_count,
            categories: Vec::new(),
            features: Vec::new(),
            labels: Vec::new(),
            origins: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    pub fn sequence_len(&self) -> usize {
        self.sequence_len
    }

    pub fn feature_count(&self) -> usize {
        self.feature_count
    }

    pub fn label_count(&self) -> usize {
        self.categories.len()
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// `([n, T, F], [n, K])`
    pub fn shape(&self) -> ([usize; 3], [usize; 2]) {
        (
            [self.len(), self.sequence_len, self.feature_count],
            [self.len(), self.label_count()],
        )
    }

    pub fn features(&self) -> &[f64] {
        &self.features
    }

    pub fn labels(&self) -> &[f64] {
        &self.labels
    }

    pub fn origins(&self) -> &[WindowOrigin] {
        &self.origins
    }

    /// Feature block of row `i` (`T × F`, row-major).
    pub fn sequence(&self, i: usize) -> &[f64] {
        let block = self.sequence_len * self.feature_count;
        &self.features[i * block..(i + 1) * block]
    }

    pub fn label(&self, i: usize) -> &[f64] {
        let k = self.label_count();
        &self.labels[i * k..(i + 1) * k]
    }

    /// Append one segment's windows. Either every window is appended or,
    /// on a shape mismatch, none is.
    pub fn append(
        &mut self,
        segment: &SegmentKey,
        categories: &[String],
        windows: &[SequenceWindow],
    ) -> Result<usize> {
        if windows.is_empty() {
            return Ok(0);
        }
        if !self.categories.is_empty() && self.categories != categories {
            return Err(PipelineError::ShapeMismatch(format!(
                "{}: label columns {:?} differ from corpus columns {:?}",
                segment, categories, self.categories
            )));
        }

        let block = self.sequence_len * self.feature_count;
        for w in windows {
            if w.features.len() != block {
                return Err(PipelineError::ShapeMismatch(format!(
                    "{}: window at {} has {} feature values, expected {}×{}",
                    segment,
                    w.anchor_time,
                    w.features.len(),
                    self.sequence_len,
                    self.feature_count
                )));
            }
            if w.labels.len() != categories.len() {
                return Err(PipelineError::ShapeMismatch(format!(
                    "{}: window at {} has {} labels, expected {}",
                    segment,
                    w.anchor_time,
                    w.labels.len(),
                    categories.len()
                )));
            }
        }

        if self.categories.is_empty() {
            self.categories = categories.to_vec();
        }
        for w in windows {
            self.features.extend_from_slice(&w.features);
            self.labels.extend_from_slice(&w.labels);
            self.origins.push(WindowOrigin {
                segment: segment.clone(),
                anchor_time: w.anchor_time,
            });
        }
        Ok(windows.len())
    }

    /// Append another corpus after this one.
    pub fn extend(&mut self, other: &TrainingCorpus) -> Result<()> {
        if other.is_empty() {
            return Ok(());
        }
        if other.sequence_len != self.sequence_len || other.feature_count != self.feature_count {
            return Err(PipelineError::ShapeMismatch(format!(
                "cannot append [{}, {}] sequences to [{}, {}]",
                other.sequence_len, other.feature_count, self.sequence_len, self.feature_count
            )));
        }
        if !self.categories.is_empty() && self.categories != other.categories {
            return Err(PipelineError::ShapeMismatch(format!(
                "label columns {:?} differ from {:?}",
                other.categories, self.categories
            )));
        }
        if self.categories.is_empty() {
            self.categories = other.categories.clone();
        }
        self.features.extend_from_slice(&other.features);
        self.labels.extend_from_slice(&other.labels);
        self.origins.extend(other.origins.iter().cloned());
        Ok(())
    }
}
