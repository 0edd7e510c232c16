//! Per-match and cross-match corpus assembly.

use std::collections::BTreeMap;
use tracing::{info, warn};

use super::corpus::TrainingCorpus;
use crate::annotation::SegmentKey;
use crate::error::{PipelineError, Result};
use crate::windowing::SequenceWindow;

/// Collects segment windows into one corpus per match, then concatenates
/// matches in the requested order.
#[derive(Debug, Clone)]
pub struct DatasetAssembler {
    sequence_len: usize,
    feature_count: usize,
    matches: BTreeMap<String, TrainingCorpus>,
}

impl DatasetAssembler {
    pub fn new(sequence_len: usize, feature_count: usize) -> Self {
        Self {
            sequence_len,
            feature_count,
            matches: BTreeMap::new(),
        }
    }

    /// Append a segment's windows to its match corpus. Segments of a match
    /// must be added in segment order.
    pub fn add_segment(
        &mut self,
        segment: &SegmentKey,
        categories: &[String],
        windows: &[SequenceWindow],
    ) -> Result<usize> {
        let (sequence_len, feature_count) = (self.sequence_len, self.feature_count);
        let corpus = self
            .matches
            .entry(segment.game_id.clone())
            .or_insert_with(|| TrainingCorpus::new(sequence_len, feature_count));
        corpus.append(segment, categories, windows)
    }

    pub fn match_corpus(&self, game_id: &str) -> Option<&TrainingCorpus> {
        self.matches.get(game_id)
    }

    pub fn match_ids(&self) -> impl Iterator<Item = &str> {
        self.matches.keys().map(String::as_str)
    }

    /// Concatenate match corpora in `order`; an empty order means every
    /// match in game id order. Unknown ids contribute nothing. A match whose
    /// shape differs from the corpus so far is left out and its error returned.
    pub fn finish(&self, order: &[String]) -> (TrainingCorpus, Vec<PipelineError>) {
        let ids: Vec<&str> = if order.is_empty() {
            self.match_ids().collect()
        } else {
            order.iter().map(String::as_str).collect()
        };

        let mut corpus = TrainingCorpus::new(self.sequence_len, self.feature_count);
        let mut rejected = Vec::new();
        for id in ids {
            match self.matches.get(id) {
                Some(m) => {
                    if let Err(e) = corpus.extend(m) {
                        warn!(game = id, error = %e, "match left out of corpus");
                        rejected.push(e);
                    }
                }
                None => warn!(game = id, "no windows for requested match"),
            }
        }
        let (features, labels) = corpus.shape();
        info!(?features, ?labels, "corpus assembled");
        (corpus, rejected)
    }
}
