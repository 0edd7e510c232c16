//! Interval-producing sources.
//!
//! Whatever the export format (tool XML, per-rater JSON, pre-computed tables),
//! the aggregation core only ever sees [`RaterAnnotationSet`]s.

use std::collections::BTreeMap;

use tracing::warn;

use super::types::{RaterAnnotationSet, SegmentKey};
use crate::error::Result;

/// A rater's annotations, one set per segment.
pub trait IntervalSource {
    /// Identifier of the rater behind this source.
    fn rater_id(&self) -> &str;

    /// All annotation sets this rater produced.
    fn rater_sets(&self) -> Result<Vec<RaterAnnotationSet>>;
}

/// Annotations that are already in memory.
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    rater_id: String,
    sets: Vec<RaterAnnotationSet>,
}

impl InMemorySource {
    pub fn new(rater_id: impl Into<String>, sets: Vec<RaterAnnotationSet>) -> Self {
        Self {
            rater_id: rater_id.into(),
            sets,
        }
    }
}

impl IntervalSource for InMemorySource {
    fn rater_id(&self) -> &str {
        &self.rater_id
    }

    fn rater_sets(&self) -> Result<Vec<RaterAnnotationSet>> {
        Ok(self.sets.clone())
    }
}

/// Group every source's sets by segment, in canonical segment order.
///
/// A source that fails to load is reported and left out; segments it would have
/// covered end up one rater short and are skipped later by the aggregator.
pub fn group_by_segment(
    sources: &[&dyn IntervalSource],
) -> BTreeMap<SegmentKey, Vec<RaterAnnotationSet>> {
    let mut grouped: BTreeMap<SegmentKey, Vec<RaterAnnotationSet>> = BTreeMap::new();

    for source in sources {
        match source.rater_sets() {
            Ok(sets) => {
                for set in sets {
                    grouped.entry(set.video_key.clone()).or_default().push(set);
                }
            }
            Err(err) => {
                warn!(rater = source.rater_id(), error = %err, "rater source unreadable, skipped");
            }
        }
    }

    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::types::Interval;
    use crate::error::PipelineError;

    struct BrokenSource;

    impl IntervalSource for BrokenSource {
        fn rater_id(&self) -> &str {
            "broken"
        }

        fn rater_sets(&self) -> Result<Vec<RaterAnnotationSet>> {
            Err(PipelineError::Parse("truncated file".to_string()))
        }
    }

    fn set(rater: &str, key: &SegmentKey) -> RaterAnnotationSet {
        let whole = Interval::new("A", key.start, key.end).unwrap();
        RaterAnnotationSet::new(rater, key.clone(), vec![whole])
    }

    #[test]
    fn test_group_by_segment_orders_keys() {
        let k1 = SegmentKey::new("7", 60, 120);
        let k2 = SegmentKey::new("7", 0, 60);
        let r1 = InMemorySource::new("1", vec![set("1", &k1), set("1", &k2)]);
        let r2 = InMemorySource::new("2", vec![set("2", &k2)]);

        let grouped = group_by_segment(&[&r1, &r2]);
        let keys: Vec<_> = grouped.keys().cloned().collect();
        assert_eq!(keys, vec![k2.clone(), k1.clone()]);
        assert_eq!(grouped[&k2].len(), 2);
        assert_eq!(grouped[&k1].len(), 1);
    }

    #[test]
    fn test_broken_source_is_left_out() {
        let key = SegmentKey::new("7", 0, 60);
        let ok = InMemorySource::new("1", vec![set("1", &key)]);
        let grouped = group_by_segment(&[&ok, &BrokenSource]);
        assert_eq!(grouped[&key].len(), 1);
    }
}
