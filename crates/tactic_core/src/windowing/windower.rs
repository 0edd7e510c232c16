//! Anchor-based lookback windows over wide tracking rows.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::resample::resample_indices;
use crate::aggregation::ProbabilityTimeline;
use crate::config::WindowConfig;
use crate::tracking::TrackingRows;

/// One training example: `T × F` features ending at the anchor, and the
/// label vector at the anchor instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceWindow {
    pub anchor_time: i64,
    pub features: Vec<f64>,
    pub labels: Vec<f64>,
}

/// Counters over the anchors of one or more segments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowStats {
    pub anchors: usize,
    pub emitted: usize,
    /// Windows dropped because a selected row had a missing value
    pub discarded_missing: usize,
    /// Emitted windows that needed zero rows in front
    pub padded: usize,
    /// Emitted windows without a label row at the anchor (zero labels)
    pub unlabeled: usize,
}

impl WindowStats {
    pub fn merge(&mut self, other: &WindowStats) {
        self.anchors += other.anchors;
        self.emitted += other.emitted;
        self.discarded_missing += other.discarded_missing;
        self.padded += other.padded;
        self.unlabeled += other.unlabeled;
    }
}

#[derive(Debug, Clone)]
pub struct SequenceWindower {
    window_ms: i64,
    raw_len: usize,
    out_len: usize,
    stride: usize,
    warmup_rows: usize,
    trailing_rows: usize,
    indices: Vec<usize>,
}

impl SequenceWindower {
    pub fn new(config: &WindowConfig) -> Self {
        let raw_len = config.raw_len();
        let out_len = config.output_len();
        Self {
            window_ms: config.window_ms(),
            raw_len,
            out_len,
            stride: config.stride(),
            warmup_rows: config.warmup_rows(),
            trailing_rows: config.trailing_rows(),
            indices: resample_indices(raw_len, out_len),
        }
    }

    /// Rows per window (T).
    pub fn output_len(&self) -> usize {
        self.out_len
    }

    /// Row indices used as anchors for a segment of `rows` tracking rows.
    pub fn anchors(&self, rows: usize) -> impl Iterator<Item = usize> {
        let end = rows.saturating_sub(self.trailing_rows);
        (self.warmup_rows..end).step_by(self.stride.max(1))
    }

    /// Build every window of one segment.
    ///
    /// `labels` supplies the label vector at each anchor's match time;
    /// anchors without a row there get a zero vector of `labels.width()`.
    pub fn windows(
        &self,
        rows: &TrackingRows,
        labels: &ProbabilityTimeline,
    ) -> (Vec<SequenceWindow>, WindowStats) {
        let mut stats = WindowStats::default();
        let mut windows = Vec::new();
        let width = rows.width();
        let times = rows.times();

        for anchor in self.anchors(rows.len()) {
            stats.anchors += 1;
            let t = times[anchor];

            let first = times[..=anchor].partition_point(|&time| time < t - self.window_ms);
            let available = anchor + 1 - first;
            let kept = available.min(self.raw_len);
            let pad = self.raw_len - kept;
            let first_kept = anchor + 1 - kept;

            let mut features = Vec::with_capacity(self.out_len * width);
            let mut missing = false;
            for &raw in &self.indices {
                if raw < pad {
                    features.extend(std::iter::repeat(0.0).take(width));
                } else {
                    let row = rows.row(first_kept + raw - pad);
                    if row.iter().any(|v| v.is_nan()) {
                        missing = true;
                        break;
                    }
                    features.extend_from_slice(row);
                }
            }
            if missing {
                stats.discarded_missing += 1;
                continue;
            }

            let label = match labels.at_match_time(t) {
                Some(row) => row.to_vec(),
                None => {
                    stats.unlabeled += 1;
                    vec![0.0; labels.width()]
                }
            };
            if pad > 0 {
                stats.padded += 1;
            }
            stats.emitted += 1;
            windows.push(SequenceWindow {
                anchor_time: t,
                features,
                labels: label,
            });
        }

        debug!(
            segment = %labels.key(),
            anchors = stats.anchors,
            emitted = stats.emitted,
            discarded = stats.discarded_missing,
            "segment windowed"
        );
        (windows, stats)
    }
}

// ========== Tests ==========

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::SegmentKey;

    /// Small config: 2 s windows, 5 Hz tracking → 10 raw rows, 1 Hz output → 2 rows.
    fn small_config() -> WindowConfig {
        WindowConfig {
            window_seconds: 2,
            input_rate_hz: 5,
            output_rate_hz: 1,
            anchor_stride: Some(1),
            warmup_seconds: 0.0,
            trailing_skip_seconds: 0.0,
        }
    }

    /// Rows every 200 ms; each row is `[i, -i]`.
    fn rows(n: usize) -> TrackingRows {
        let times = (0..n as i64).map(|i| i * 200).collect();
        let values = (0..n).flat_map(|i| [i as f64, -(i as f64)]).collect();
        TrackingRows::from_flat(times, 2, values).unwrap()
    }

    fn labels(start_s: i64, values: &[[f64; 2]]) -> ProbabilityTimeline {
        let ticks = (0..values.len() as i64).map(|i| start_s + i).collect();
        ProbabilityTimeline::from_parts(
            SegmentKey::new("g", start_s, start_s + values.len() as i64),
            vec!["A".to_string(), "B".to_string()],
            1000,
            ticks,
            values.iter().flat_map(|r| r.iter().copied()).collect(),
        )
    }

    #[test]
    fn test_first_anchor_is_left_padded() {
        let windower = SequenceWindower::new(&small_config());
        let (windows, stats) = windower.windows(&rows(3), &labels(0, &[[0.5, 0.0]]));

        assert_eq!(stats.anchors, 3);
        assert_eq!(stats.emitted, 3);
        assert_eq!(stats.padded, 3);
        // indices for L=10, T=2: [0, 9]; anchor 0 → zero row then row 0
        assert_eq!(windows[0].features, vec![0.0, 0.0, 0.0, 0.0]);
        assert_eq!(windows[2].features, vec![0.0, 0.0, 2.0, -2.0]);
        assert_eq!(windows[0].labels, vec![0.5, 0.0]);
        assert_eq!(windows[1].labels, vec![0.0, 0.0], "200 ms has no label row");
        assert_eq!(stats.unlabeled, 2);
    }

    #[test]
    fn test_long_history_keeps_most_recent_rows() {
        let windower = SequenceWindower::new(&small_config());
        let (windows, stats) = windower.windows(&rows(30), &labels(0, &[[0.0, 0.0]; 6]));

        // anchor 20 at 4000 ms: samples 2000..=4000 → 11 rows,
        // most recent 10 kept: rows 11..=20
        let w = windows.iter().find(|w| w.anchor_time == 4000).unwrap();
        assert_eq!(w.features, vec![11.0, -11.0, 20.0, -20.0]);
        assert_eq!(w.labels, vec![0.0, 0.0]);
        assert!(stats.padded < stats.emitted);
    }

    #[test]
    fn test_window_with_missing_value_is_discarded() {
        let mut values: Vec<f64> = (0..12).flat_map(|i| [i as f64, 0.0]).collect();
        values[2 * 11] = f64::NAN; // anchor row 11 has a missing x
        let rows = TrackingRows::from_flat((0..12).map(|i| i * 200).collect(), 2, values).unwrap();

        let windower = SequenceWindower::new(&small_config());
        let (windows, stats) = windower.windows(&rows, &labels(0, &[[0.0, 0.0]]));
        assert_eq!(stats.discarded_missing, 1);
        assert_eq!(windows.len(), 11);
        assert!(windows.iter().all(|w| w.anchor_time != 2200));
    }

    #[test]
    fn test_warmup_and_trailing_skip() {
        let config = WindowConfig {
            warmup_seconds: 1.0,
            trailing_skip_seconds: 1.0,
            anchor_stride: Some(2),
            ..small_config()
        };
        let windower = SequenceWindower::new(&config);
        let anchors: Vec<usize> = windower.anchors(20).collect();
        assert_eq!(anchors, vec![5, 7, 9, 11, 13]);
        assert_eq!(windower.anchors(8).count(), 0);
    }

    #[test]
    fn test_default_shape() {
        let windower = SequenceWindower::new(&WindowConfig::default());
        assert_eq!(windower.output_len(), 100);
        let anchors: Vec<usize> = windower.anchors(300).collect();
        assert_eq!(anchors.first(), Some(&250));
        assert_eq!(anchors.last(), Some(&270));
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: every emitted window is exactly T × F with no NaN
            #[test]
            fn prop_window_shape(
                n in 0usize..60,
                gaps in prop::collection::vec(prop::bool::weighted(0.05), 60),
                stride in 1usize..4,
            ) {
                let values: Vec<f64> = (0..n)
                    .flat_map(|i| {
                        let v = if gaps[i] { f64::NAN } else { i as f64 };
                        [v, v]
                    })
                    .collect();
                let times = (0..n as i64).map(|i| i * 200).collect();
                let rows = TrackingRows::from_flat(times, 2, values).unwrap();
                let config = WindowConfig { anchor_stride: Some(stride), ..small_config() };
                let windower = SequenceWindower::new(&config);
                let (windows, stats) = windower.windows(&rows, &labels(0, &[[0.25, 0.0]; 3]));

                prop_assert_eq!(windows.len(), stats.emitted);
                prop_assert_eq!(stats.anchors, stats.emitted + stats.discarded_missing);
                for w in &windows {
                    prop_assert_eq!(w.features.len(), 2 * 2);
                    prop_assert!(w.features.iter().all(|v| !v.is_nan()));
                    prop_assert_eq!(w.labels.len(), 2);
                }
            }
        }
    }
}
