//! Dense per-tick label presence for one rater.

use tracing::debug;

use super::types::{CategorySet, RaterAnnotationSet, SegmentKey, Tick, Vocabulary};

/// One rater's intervals expanded over a segment.
///
/// `ticks[i]` holds the categories active at `segment.start + i`. A category is
/// either active or not at a tick; overlapping intervals of the same label
/// never count twice.
#[derive(Debug, Clone, PartialEq)]
pub struct IntervalTimeline {
    rater_id: String,
    segment: SegmentKey,
    ticks: Vec<CategorySet>,
    unknown_labels: usize,
}

impl IntervalTimeline {
    /// Expand `annotations` over `[segment.start, segment.end)`.
    ///
    /// Intervals are clipped to the segment; intervals that end up empty after
    /// clipping contribute nothing. Labels missing from `vocabulary` are skipped
    /// and counted.
    pub fn expand(
        annotations: &RaterAnnotationSet,
        segment: &SegmentKey,
        vocabulary: &Vocabulary,
    ) -> Self {
        let mut ticks = vec![CategorySet::EMPTY; segment.len()];
        let mut unknown_labels = 0;

        for interval in &annotations.intervals {
            let Some(category) = vocabulary.index_of(interval.label()) else {
                unknown_labels += 1;
                debug!(
                    rater = %annotations.rater_id,
                    label = interval.label(),
                    "label outside vocabulary ignored"
                );
                continue;
            };

            let Some((start, end)) = interval.clip(segment.start, segment.end) else {
                continue;
            };

            let from = (start - segment.start) as usize;
            let to = (end - segment.start) as usize;
            for set in &mut ticks[from..to] {
                set.insert(category);
            }
        }

        Self {
            rater_id: annotations.rater_id.clone(),
            segment: segment.clone(),
            ticks,
            unknown_labels,
        }
    }

    pub fn rater_id(&self) -> &str {
        &self.rater_id
    }

    pub fn segment(&self) -> &SegmentKey {
        &self.segment
    }

    pub fn unknown_labels(&self) -> usize {
        self.unknown_labels
    }

    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Active categories at an absolute tick. Ticks outside the segment are empty.
    pub fn active_at(&self, tick: Tick) -> CategorySet {
        if !self.segment.contains(tick) {
            return CategorySet::EMPTY;
        }
        self.ticks[(tick - self.segment.start) as usize]
    }

    /// `(tick, active categories)` for every tick of the segment.
    pub fn iter(&self) -> impl Iterator<Item = (Tick, CategorySet)> + '_ {
        let start = self.segment.start;
        self.ticks
            .iter()
            .enumerate()
            .map(move |(i, set)| (start + i as Tick, *set))
    }

    pub(crate) fn sets(&self) -> &[CategorySet] {
        &self.ticks
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::types::Interval;

    fn vocab() -> Vocabulary {
        Vocabulary::new(["A", "B"]).unwrap()
    }

    fn rater(intervals: Vec<(&str, Tick, Tick)>) -> RaterAnnotationSet {
        RaterAnnotationSet::new(
            "r1",
            SegmentKey::new("g", 0, 10),
            intervals
                .into_iter()
                .map(|(l, s, e)| Interval::new(l, s, e).unwrap())
                .collect(),
        )
    }

    #[test]
    fn test_expand_half_open() {
        let segment = SegmentKey::new("g", 0, 4);
        let timeline = IntervalTimeline::expand(&rater(vec![("A", 0, 2)]), &segment, &vocab());

        assert_eq!(timeline.len(), 4);
        assert!(timeline.active_at(0).contains(0));
        assert!(timeline.active_at(1).contains(0));
        assert!(timeline.active_at(2).is_empty(), "end tick is exclusive");
        assert!(timeline.active_at(3).is_empty());
    }

    #[test]
    fn test_overlapping_same_label_counts_once() {
        let segment = SegmentKey::new("g", 0, 10);
        let timeline = IntervalTimeline::expand(
            &rater(vec![("A", 0, 6), ("A", 3, 8)]),
            &segment,
            &vocab(),
        );
        for (tick, set) in timeline.iter() {
            assert!(set.len() <= 1, "tick {} counted twice", tick);
        }
        assert!(timeline.active_at(7).contains(0));
        assert!(!timeline.active_at(8).contains(0));
    }

    #[test]
    fn test_clipping_to_segment() {
        let segment = SegmentKey::new("g", 100, 110);
        let timeline = IntervalTimeline::expand(
            &rater(vec![("A", 90, 102), ("B", 108, 130), ("A", 50, 60), ("B", 110, 120)]),
            &segment,
            &vocab(),
        );

        let active: Vec<Tick> = timeline
            .iter()
            .filter(|(_, s)| !s.is_empty())
            .map(|(t, _)| t)
            .collect();
        assert_eq!(active, vec![100, 101, 108, 109]);
        assert!(timeline.active_at(99).is_empty());
    }

    #[test]
    fn test_unknown_labels_are_counted() {
        let segment = SegmentKey::new("g", 0, 10);
        let timeline = IntervalTimeline::expand(
            &rater(vec![("End", 0, 5), ("A", 0, 5), ("Z", 1, 2)]),
            &segment,
            &vocab(),
        );
        assert_eq!(timeline.unknown_labels(), 2);
        assert_eq!(timeline.iter().filter(|(_, s)| !s.is_empty()).count(), 5);
    }

    #[test]
    fn test_empty_segment() {
        let segment = SegmentKey::new("g", 5, 5);
        let timeline = IntervalTimeline::expand(&rater(vec![("A", 0, 10)]), &segment, &vocab());
        assert!(timeline.is_empty());
    }
}
