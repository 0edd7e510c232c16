//! Per-instant probability table.

use serde::{Deserialize, Serialize};

use crate::annotation::{SegmentKey, Side, Tick};
use crate::error::{PipelineError, Result};

/// Dense probability rows for every tick of a segment.
///
/// Rows are stored flat (`ticks.len() × categories.len()`) in ascending tick
/// order. `tick_ms` is the length of one tick in match milliseconds, so the
/// table can be queried with tracking timestamps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbabilityTimeline {
    key: SegmentKey,
    categories: Vec<String>,
    tick_ms: i64,
    ticks: Vec<Tick>,
    values: Vec<f64>,
}

impl ProbabilityTimeline {
    pub(crate) fn from_parts(
        key: SegmentKey,
        categories: Vec<String>,
        tick_ms: i64,
        ticks: Vec<Tick>,
        values: Vec<f64>,
    ) -> Self {
        debug_assert_eq!(ticks.len() * categories.len(), values.len());
        debug_assert!(ticks.windows(2).all(|w| w[0] < w[1]));
        Self {
            key,
            categories,
            tick_ms,
            ticks,
            values,
        }
    }

    pub fn key(&self) -> &SegmentKey {
        &self.key
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn tick_ms(&self) -> i64 {
        self.tick_ms
    }

    /// Number of rows (ticks).
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// Number of columns (categories).
    pub fn width(&self) -> usize {
        self.categories.len()
    }

    pub fn ticks(&self) -> &[Tick] {
        &self.ticks
    }

    pub fn row(&self, index: usize) -> &[f64] {
        let width = self.width();
        &self.values[index * width..(index + 1) * width]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Tick, &[f64])> + '_ {
        self.ticks.iter().enumerate().map(move |(i, &t)| (t, self.row(i)))
    }

    /// Row at exactly `tick`.
    pub fn get(&self, tick: Tick) -> Option<&[f64]> {
        self.ticks.binary_search(&tick).ok().map(|i| self.row(i))
    }

    /// Row at a match time in milliseconds. Times between ticks have no row.
    pub fn at_match_time(&self, match_time_ms: i64) -> Option<&[f64]> {
        if match_time_ms.rem_euclid(self.tick_ms) != 0 {
            return None;
        }
        self.get(match_time_ms.div_euclid(self.tick_ms))
    }

    /// `max(0, 1 − Σ row)`: the implicit "no tactics" share of a row.
    pub fn residual(&self, index: usize) -> f64 {
        (1.0 - self.row(index).iter().sum::<f64>()).max(0.0)
    }

    /// Keep only ticks divisible by `step` (the ms tables are exported every 200 ms).
    pub fn downsample(&self, step: i64) -> Self {
        if step <= 1 {
            return self.clone();
        }
        let mut ticks = Vec::new();
        let mut values = Vec::new();
        for (tick, row) in self.iter() {
            if tick.rem_euclid(step) == 0 {
                ticks.push(tick);
                values.extend_from_slice(row);
            }
        }
        Self::from_parts(self.key.clone(), self.categories.clone(), self.tick_ms, ticks, values)
    }

    /// Same table with column names suffixed for `side`.
    pub fn labelled_for(&self, side: Side) -> Self {
        let mut renamed = self.clone();
        renamed.categories = self
            .categories
            .iter()
            .map(|c| format!("{}{}", c, side.column_suffix()))
            .collect();
        renamed
    }

    /// Outer join on the tick, placing `other`'s columns after ours.
    /// Ticks present on one side only get zeros on the other.
    pub fn join(&self, other: &ProbabilityTimeline) -> Result<Self> {
        self.check_compatible(other)?;

        let ticks = merged_ticks(&self.ticks, &other.ticks);
        let width = self.width() + other.width();
        let mut values = Vec::with_capacity(ticks.len() * width);
        for &tick in &ticks {
            push_row_or_zeros(&mut values, self.get(tick), self.width());
            push_row_or_zeros(&mut values, other.get(tick), other.width());
        }

        let mut categories = self.categories.clone();
        categories.extend(other.categories.iter().cloned());
        Ok(Self::from_parts(self.key.clone(), categories, self.tick_ms, ticks, values))
    }

    /// Outer join on the tick, summing column by column (left + right shares).
    pub fn sum(&self, other: &ProbabilityTimeline) -> Result<Self> {
        self.check_compatible(other)?;
        if self.width() != other.width() {
            return Err(PipelineError::ShapeMismatch(format!(
                "cannot sum tables with {} and {} columns",
                self.width(),
                other.width()
            )));
        }

        let ticks = merged_ticks(&self.ticks, &other.ticks);
        let mut values = Vec::with_capacity(ticks.len() * self.width());
        for &tick in &ticks {
            for j in 0..self.width() {
                let a = self.get(tick).map_or(0.0, |r| r[j]);
                let b = other.get(tick).map_or(0.0, |r| r[j]);
                values.push(a + b);
            }
        }

        Ok(Self::from_parts(self.key.clone(), self.categories.clone(), self.tick_ms, ticks, values))
    }

    fn check_compatible(&self, other: &ProbabilityTimeline) -> Result<()> {
        if self.tick_ms != other.tick_ms {
            return Err(PipelineError::ShapeMismatch(format!(
                "tick sizes differ: {} ms vs {} ms",
                self.tick_ms, other.tick_ms
            )));
        }
        Ok(())
    }
}

fn merged_ticks(a: &[Tick], b: &[Tick]) -> Vec<Tick> {
    let mut ticks: Vec<Tick> = a.iter().chain(b.iter()).copied().collect();
    ticks.sort_unstable();
    ticks.dedup();
    ticks
}

fn push_row_or_zeros(values: &mut Vec<f64>, row: Option<&[f64]>, width: usize) {
    match row {
        Some(row) => values.extend_from_slice(row),
        None => values.extend(std::iter::repeat(0.0).take(width)),
    }
}
