//! Gather a batch of segments from an annotation directory and a tracking
//! directory.
//!
//! Annotation layout: either `<dir>/left/*.json` + `<dir>/right/*.json`
//! (per-side exports) or `<dir>/*.json` (whole-pitch exports), one file per
//! rater.

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use tactic_core::annotation::{group_by_segment, IntervalSource};
use tactic_core::tracking::MatchTeams;
use tactic_core::{PipelineConfig, RaterAnnotationSet, SegmentInput, SegmentKey, Side};

use crate::rater_json::JsonRaterSource;
use crate::tracking_csv::{discover_tracking_files, load_match_teams, read_tracking_csv};

/// Rater sets per segment, per side.
pub type SideAnnotationMap = BTreeMap<SegmentKey, BTreeMap<Side, Vec<RaterAnnotationSet>>>;

fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let entries =
        fs::read_dir(dir).with_context(|| format!("Failed to list directory: {}", dir.display()))?;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "json") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn load_side(dir: &Path, tick_ms: i64) -> Result<BTreeMap<SegmentKey, Vec<RaterAnnotationSet>>> {
    let sources: Vec<JsonRaterSource> = json_files(dir)?
        .into_iter()
        .map(|path| JsonRaterSource::new(path, tick_ms))
        .collect();
    let refs: Vec<&dyn IntervalSource> = sources.iter().map(|s| s as &dyn IntervalSource).collect();
    Ok(group_by_segment(&refs))
}

/// Load every rater export under `dir`, keyed in `tick_ms` ticks.
pub fn load_annotation_sides(dir: &Path, tick_ms: i64) -> Result<SideAnnotationMap> {
    let left = dir.join("left");
    let right = dir.join("right");

    let sides: Vec<(Side, PathBuf)> = if left.is_dir() || right.is_dir() {
        [(Side::Left, left), (Side::Right, right)]
            .into_iter()
            .filter(|(_, path)| path.is_dir())
            .collect()
    } else {
        vec![(Side::Whole, dir.to_path_buf())]
    };

    let mut map = SideAnnotationMap::new();
    for (side, path) in sides {
        for (key, raters) in load_side(&path, tick_ms)? {
            map.entry(key).or_default().insert(side, raters);
        }
    }
    info!(dir = %dir.display(), segments = map.len(), "annotations loaded");
    Ok(map)
}

/// Build pipeline inputs, attaching tracking frames and team sides where
/// they exist. Segments without tracking still produce label tables.
pub fn collect_segments(
    annotations: SideAnnotationMap,
    tracking_dir: Option<&Path>,
    teams_file: Option<&Path>,
    config: &PipelineConfig,
) -> Result<Vec<SegmentInput>> {
    let tick_ms = config.annotation.tick_ms;

    let tracking_files: BTreeMap<SegmentKey, PathBuf> = match tracking_dir {
        Some(dir) => discover_tracking_files(dir)?
            .into_iter()
            .map(|(key, path)| (key.rescaled(1000, tick_ms), path))
            .collect(),
        None => BTreeMap::new(),
    };
    let teams: BTreeMap<String, MatchTeams> = match teams_file {
        Some(path) => load_match_teams(path)?,
        None => BTreeMap::new(),
    };

    let mut segments = Vec::with_capacity(annotations.len());
    for (key, sides) in annotations {
        let mut input = SegmentInput::new(key.clone());
        for (side, raters) in sides {
            input = input.with_side(side, raters);
        }

        // An unreadable tracking file leaves the segment without tracking;
        // it still gets its label table.
        if let Some(path) = tracking_files.get(&key) {
            match read_tracking_csv(path) {
                Ok((frames, stats)) => {
                    if stats.failed > 0 {
                        warn!(segment = %key, failed = stats.failed, "tracking rows skipped");
                    }
                    input = input.with_tracking(frames, teams.get(&key.game_id).cloned());
                }
                Err(e) => warn!(
                    segment = %key,
                    file = %path.display(),
                    error = %e,
                    "tracking file unreadable, segment kept without it"
                ),
            }
        }
        segments.push(input);
    }

    let with_tracking = segments.iter().filter(|s| s.tracking.is_some()).count();
    info!(segments = segments.len(), with_tracking, "segments collected");
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const RATER: &str = r#"[{"game_id": 7, "start_video": "00:00", "end_video": "00:10",
        "annotations": [{"label": "Build up", "start": "00:01", "end": "00:04"}]}]"#;

    #[test]
    fn test_whole_pitch_layout() -> Result<()> {
        let dir = tempdir()?;
        for rater in ["a", "b", "c"] {
            fs::write(dir.path().join(format!("{}.json", rater)), RATER)?;
        }
        fs::write(dir.path().join("readme.txt"), "not an export")?;

        let map = load_annotation_sides(dir.path(), 1000)?;
        let sides = &map[&SegmentKey::new("7", 0, 10)];
        assert_eq!(sides.len(), 1);
        let raters: Vec<&str> = sides[&Side::Whole].iter().map(|r| r.rater_id.as_str()).collect();
        assert_eq!(raters, vec!["a", "b", "c"]);
        Ok(())
    }

    #[test]
    fn test_per_side_layout() -> Result<()> {
        let dir = tempdir()?;
        for side in ["left", "right"] {
            fs::create_dir_all(dir.path().join(side))?;
            fs::write(dir.path().join(side).join("r1.json"), RATER)?;
        }

        let map = load_annotation_sides(dir.path(), 1000)?;
        let sides = &map[&SegmentKey::new("7", 0, 10)];
        assert_eq!(sides.keys().copied().collect::<Vec<_>>(), vec![Side::Left, Side::Right]);
        Ok(())
    }

    #[test]
    fn test_tracking_is_attached_by_segment() -> Result<()> {
        let dir = tempdir()?;
        let tracking = dir.path().join("tracking");
        fs::create_dir_all(&tracking)?;
        fs::write(
            tracking.join("7_00_00-00_10_tracking.csv"),
            "frame_index,match_time,entity_id,x,y\n0,0,ball,1,2\n",
        )?;
        let teams = dir.path().join("teams.json");
        fs::write(
            &teams,
            r#"{"7": {"left_team_id_1st_half": 1, "right_team_id_1st_half": 2}}"#,
        )?;

        let mut annotations = SideAnnotationMap::new();
        for game in ["7", "8"] {
            let key = SegmentKey::new(game, 0, 10);
            annotations
                .entry(key.clone())
                .or_default()
                .insert(Side::Whole, vec![RaterAnnotationSet::new("a", key, vec![])]);
        }

        let config = PipelineConfig::default();
        let segments = collect_segments(annotations, Some(&tracking), Some(&teams), &config)?;
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].tracking.as_ref().map(Vec::len), Some(1));
        assert_eq!(segments[0].teams, Some(MatchTeams::new("1", "2")));
        assert!(segments[1].tracking.is_none());
        Ok(())
    }

    #[test]
    fn test_millisecond_keys_match_tracking_names() -> Result<()> {
        let dir = tempdir()?;
        fs::write(
            dir.path().join("7_00_00-00_10_tracking.csv"),
            "frame_index,match_time,entity_id,x,y\n0,0,ball,1,2\n",
        )?;
        let key = SegmentKey::new("7", 0, 10_000);
        let mut annotations = SideAnnotationMap::new();
        annotations
            .entry(key.clone())
            .or_default()
            .insert(Side::Whole, vec![RaterAnnotationSet::new("a", key, vec![])]);

        let config = PipelineConfig::high_resolution();
        let segments = collect_segments(annotations, Some(dir.path()), None, &config)?;
        assert!(segments[0].tracking.is_some());
        assert!(segments[0].teams.is_none());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_tracking_file_only_affects_its_segment() -> Result<()> {
        let dir = tempdir()?;
        fs::write(
            dir.path().join("7_00_00-00_10_tracking.csv"),
            "frame_index,match_time,entity_id,x,y\n0,0,ball,1,2\n",
        )?;
        std::os::unix::fs::symlink(
            dir.path().join("gone.csv"),
            dir.path().join("8_00_00-00_10_tracking.csv"),
        )?;

        let mut annotations = SideAnnotationMap::new();
        for game in ["7", "8"] {
            let key = SegmentKey::new(game, 0, 10);
            annotations
                .entry(key.clone())
                .or_default()
                .insert(Side::Whole, vec![RaterAnnotationSet::new("a", key, vec![])]);
        }

        let mut config = PipelineConfig::default();
        config.annotation.rater_count = 1;
        let segments = collect_segments(annotations, Some(dir.path()), None, &config)?;
        assert_eq!(segments.len(), 2);
        assert!(segments[0].tracking.is_some(), "readable segment keeps its tracking");
        assert!(segments[1].tracking.is_none());

        let output = tactic_core::Pipeline::new(config)?.run(segments);
        let broken = SegmentKey::new("8", 0, 10);
        assert!(output.timelines.contains_key(&broken), "label table still produced");
        let report = output
            .summary
            .segments
            .iter()
            .find(|r| r.segment == broken)
            .expect("segment reported");
        assert!(matches!(
            report.status,
            tactic_core::SegmentOutcome::LabelsOnly { .. }
        ));
        Ok(())
    }
}
