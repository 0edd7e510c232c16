//! Annotation data model: vocabulary, intervals, segment keys and rater sets.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ConfigError, PipelineError, Result};

/// Absolute instant in the segment's time base (seconds or milliseconds).
pub type Tick = i64;

/// Name of the implicit residual category.
pub const RESIDUAL_CATEGORY: &str = "no tactics";

/// Maximum vocabulary size (one bit per category in [`CategorySet`]).
pub const MAX_CATEGORIES: usize = 64;

/// Tactical phases labelled by the annotation team, in column order.
pub const DEFAULT_TACTICS: [&str; 9] = [
    "Build up",
    "Progression",
    "Final third",
    "Counter-attack",
    "High press",
    "Mid block",
    "Low block",
    "Counter-press",
    "Recovery",
];

/// Ordered, fixed category vocabulary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
    categories: Vec<String>,
}

impl Vocabulary {
    pub fn new<I, S>(categories: I) -> std::result::Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let categories: Vec<String> = categories.into_iter().map(Into::into).collect();

        if categories.is_empty() {
            return Err(ConfigError::EmptyVocabulary);
        }
        if categories.len() > MAX_CATEGORIES {
            return Err(ConfigError::VocabularyTooLarge {
                size: categories.len(),
                max: MAX_CATEGORIES,
            });
        }
        for (i, name) in categories.iter().enumerate() {
            if categories[..i].contains(name) {
                return Err(ConfigError::DuplicateCategory(name.clone()));
            }
        }

        Ok(Self { categories })
    }

    /// The nine tactical phases.
    pub fn tactics() -> Self {
        Self {
            categories: DEFAULT_TACTICS.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn index_of(&self, label: &str) -> Option<usize> {
        self.categories.iter().position(|c| c == label)
    }

    pub fn name(&self, index: usize) -> Option<&str> {
        self.categories.get(index).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.categories
    }

    /// Category names followed by the residual column.
    pub fn names_with_residual(&self) -> Vec<String> {
        let mut names = self.categories.clone();
        names.push(RESIDUAL_CATEGORY.to_string());
        names
    }
}

impl Default for Vocabulary {
    fn default() -> Self {
        Self::tactics()
    }
}

impl TryFrom<Vec<String>> for Vocabulary {
    type Error = ConfigError;

    fn try_from(value: Vec<String>) -> std::result::Result<Self, Self::Error> {
        Vocabulary::new(value)
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(value: Vocabulary) -> Self {
        value.categories
    }
}

/// Set of active category indices at one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CategorySet(u64);

impl CategorySet {
    pub const EMPTY: CategorySet = CategorySet(0);

    pub fn insert(&mut self, index: usize) {
        debug_assert!(index < MAX_CATEGORIES);
        self.0 |= 1u64 << index;
    }

    pub fn contains(&self, index: usize) -> bool {
        index < MAX_CATEGORIES && self.0 & (1u64 << index) != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Active indices in ascending order.
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        (0..MAX_CATEGORIES).filter(move |&i| self.contains(i))
    }
}

/// Half-open labelled interval `[start, end)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interval {
    label: String,
    start: Tick,
    end: Tick,
}

impl Interval {
    pub fn new(label: impl Into<String>, start: Tick, end: Tick) -> Result<Self> {
        let label = label.into();
        if start > end {
            return Err(PipelineError::InvalidInterval { label, start, end });
        }
        Ok(Self { label, start, end })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn start(&self) -> Tick {
        self.start
    }

    pub fn end(&self) -> Tick {
        self.end
    }

    /// Clip to `[lower, upper)`. `None` when nothing is left.
    pub fn clip(&self, lower: Tick, upper: Tick) -> Option<(Tick, Tick)> {
        let start = self.start.max(lower);
        let end = self.end.min(upper);
        (end > start).then_some((start, end))
    }
}

/// Contiguous scored portion of a match: game id plus `[start, end)` ticks.
///
/// Ordering is `(game_id, start, end)`, the canonical output order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SegmentKey {
    pub game_id: String,
    pub start: Tick,
    pub end: Tick,
}

impl SegmentKey {
    pub fn new(game_id: impl Into<String>, start: Tick, end: Tick) -> Self {
        Self {
            game_id: game_id.into(),
            start,
            end,
        }
    }

    /// Parse a key (in seconds) from a `<game>_<MM>_<SS>-<MM>_<SS>` name.
    pub fn from_video_name(name: &str) -> Option<Self> {
        super::clock::parse_video_range(name).map(|(game, start, end)| Self::new(game, start, end))
    }

    pub fn len(&self) -> usize {
        (self.end - self.start).max(0) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, tick: Tick) -> bool {
        self.start <= tick && tick < self.end
    }

    /// Same segment expressed with another tick size.
    pub fn rescaled(&self, from_tick_ms: i64, to_tick_ms: i64) -> Self {
        Self {
            game_id: self.game_id.clone(),
            start: self.start * from_tick_ms / to_tick_ms,
            end: self.end * from_tick_ms / to_tick_ms,
        }
    }

    /// `<game>_<MM>_<SS>-<MM>_<SS>` for a key whose ticks are `tick_ms` long.
    pub fn file_stem(&self, tick_ms: i64) -> String {
        let start_s = self.start * tick_ms / 1000;
        let end_s = self.end * tick_ms / 1000;
        format!(
            "{}_{}-{}",
            self.game_id,
            super::clock::format_clock_for_file(start_s),
            super::clock::format_clock_for_file(end_s)
        )
    }
}

impl fmt::Display for SegmentKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}@[{}, {})", self.game_id, self.start, self.end)
    }
}

/// One rater's intervals for one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaterAnnotationSet {
    pub rater_id: String,
    pub video_key: SegmentKey,
    pub intervals: Vec<Interval>,
}

impl RaterAnnotationSet {
    pub fn new(
        rater_id: impl Into<String>,
        video_key: SegmentKey,
        intervals: Vec<Interval>,
    ) -> Self {
        Self {
            rater_id: rater_id.into(),
            video_key,
            intervals,
        }
    }
}

/// Which team's tactics an annotation set describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Left,
    Right,
    Whole,
}

impl Side {
    /// Column suffix used when both sides are present in one table.
    pub fn column_suffix(&self) -> &'static str {
        match self {
            Side::Left => " 1",
            Side::Right => " 2",
            Side::Whole => "",
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Side::Left => "left",
            Side::Right => "right",
            Side::Whole => "whole",
        }
    }
}
