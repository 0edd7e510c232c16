//! Vote-pattern histogram: how often each category received k of N votes.

use serde::{Deserialize, Serialize};

use crate::aggregation::ProbabilityTimeline;
use crate::error::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VotePatternHistogram {
    pub categories: Vec<String>,
    pub rater_count: u32,
    /// Highest vote level (N, or 2N over a side-combined table)
    pub max_votes: u32,
    pub ticks: usize,
    /// `shares[category][votes]`: fraction of ticks at that vote level
    pub shares: Vec<Vec<f64>>,
}

impl VotePatternHistogram {
    /// Histogram over one fixed-N table.
    pub fn from_timeline(timeline: &ProbabilityTimeline, rater_count: u32) -> Self {
        Self::build(timeline, rater_count, rater_count)
    }

    /// Histogram over the sum of a left and a right table (levels up to 2N).
    pub fn from_sides(
        left: &ProbabilityTimeline,
        right: &ProbabilityTimeline,
        rater_count: u32,
    ) -> Result<Self> {
        let summed = left.sum(right)?;
        Ok(Self::build(&summed, rater_count, rater_count * 2))
    }

    fn build(timeline: &ProbabilityTimeline, rater_count: u32, max_votes: u32) -> Self {
        let k = timeline.width();
        let levels = max_votes as usize + 1;
        let mut counts = vec![vec![0usize; levels]; k];

        for (_, row) in timeline.iter() {
            for (j, &p) in row.iter().enumerate() {
                let votes = ((p * rater_count as f64).round() as usize).min(levels - 1);
                counts[j][votes] += 1;
            }
        }

        let ticks = timeline.len();
        let shares = counts
            .into_iter()
            .map(|column| {
                column
                    .into_iter()
                    .map(|c| if ticks == 0 { 0.0 } else { c as f64 / ticks as f64 })
                    .collect()
            })
            .collect();

        Self {
            categories: timeline.categories().to_vec(),
            rater_count,
            max_votes,
            ticks,
            shares,
        }
    }

    /// `"{votes}/{N}"`, e.g. `"1/4"`.
    pub fn descriptor(&self, votes: u32) -> String {
        format!("{}/{}", votes, self.rater_count)
    }

    pub fn share(&self, category: &str, votes: u32) -> Option<f64> {
        let j = self.categories.iter().position(|c| c == category)?;
        self.shares[j].get(votes as usize).copied()
    }

    /// `(descriptor, share)` pairs for one category, lowest level first.
    pub fn levels(&self, category: &str) -> Vec<(String, f64)> {
        let Some(j) = self.categories.iter().position(|c| c == category) else {
            return Vec::new();
        };
        self.shares[j]
            .iter()
            .enumerate()
            .map(|(v, &s)| (self.descriptor(v as u32), s))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregation::ProbabilityAggregator;
    use crate::annotation::{Interval, RaterAnnotationSet, SegmentKey, Vocabulary};
    use crate::config::AnnotationConfig;

    fn scenario() -> ProbabilityTimeline {
        let segment = SegmentKey::new("g", 0, 4);
        let config = AnnotationConfig {
            vocabulary: Vocabulary::new(["A", "B"]).unwrap(),
            ..AnnotationConfig::default()
        };
        let iv = |l: &str, s, e| vec![Interval::new(l, s, e).unwrap()];
        let raters = vec![
            RaterAnnotationSet::new("1", segment.clone(), iv("A", 0, 2)),
            RaterAnnotationSet::new("2", segment.clone(), iv("A", 0, 2)),
            RaterAnnotationSet::new("3", segment.clone(), iv("B", 1, 3)),
            RaterAnnotationSet::new("4", segment.clone(), vec![]),
        ];
        ProbabilityAggregator::new(&config)
            .aggregate(&segment, &raters)
            .unwrap()
            .timeline
    }

    #[test]
    fn test_vote_levels() {
        let h = VotePatternHistogram::from_timeline(&scenario(), 4);
        assert_eq!(h.share("A", 2), Some(0.5));
        assert_eq!(h.share("A", 0), Some(0.5));
        assert_eq!(h.share("B", 1), Some(0.5));
        assert_eq!(h.share("B", 4), Some(0.0));
        assert_eq!(h.share("C", 0), None);

        let levels = h.levels("B");
        assert_eq!(levels.len(), 5);
        assert_eq!(levels[1], ("1/4".to_string(), 0.5));
    }

    #[test]
    fn test_side_sum_extends_levels() {
        let t = scenario();
        let h = VotePatternHistogram::from_sides(&t, &t, 4).unwrap();
        assert_eq!(h.max_votes, 8);
        // A doubled: 4 votes on half the ticks
        assert_eq!(h.share("A", 4), Some(0.5));
        assert_eq!(h.descriptor(6), "6/4");
    }
}
