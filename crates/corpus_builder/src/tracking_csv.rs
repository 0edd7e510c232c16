//! Tracking CSV input.
//!
//! `frame_index,match_time,entity_id,x,y[,team_id,position]`, one file per
//! segment named `<game>_<MM>_<SS>-<MM>_<SS>_tracking.csv`. The older
//! `player_id` column name is accepted for `entity_id`.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use tactic_core::tracking::{EntityId, MatchTeams, TrackingFrame};
use tactic_core::SegmentKey;

/// Suffix of per-segment tracking files.
pub const TRACKING_SUFFIX: &str = "_tracking.csv";

#[derive(Debug, Deserialize)]
struct TrackingRecord {
    frame_index: u64,
    match_time: i64,
    #[serde(alias = "player_id")]
    entity_id: String,
    x: Option<f64>,
    y: Option<f64>,
    #[serde(default)]
    team_id: Option<String>,
    #[serde(default)]
    position: Option<String>,
}

impl From<TrackingRecord> for TrackingFrame {
    fn from(r: TrackingRecord) -> Self {
        TrackingFrame {
            frame_index: r.frame_index,
            match_time: r.match_time,
            entity_id: EntityId::parse(&r.entity_id),
            x: r.x.unwrap_or(f64::NAN),
            y: r.y.unwrap_or(f64::NAN),
            team_id: r.team_id.filter(|t| !t.is_empty()),
            position: r.position.filter(|p| !p.is_empty()),
        }
    }
}

/// CSV parsing statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParseStats {
    pub total_rows: u32,
    pub parsed: u32,
    pub failed: u32,
}

/// Read every frame of a tracking CSV. Malformed rows are counted and skipped.
pub fn read_tracking_csv(path: &Path) -> Result<(Vec<TrackingFrame>, ParseStats)> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Failed to open tracking CSV: {}", path.display()))?;

    let mut frames = Vec::new();
    let mut stats = ParseStats::default();
    for (line, record) in reader.deserialize::<TrackingRecord>().enumerate() {
        stats.total_rows += 1;
        match record {
            Ok(r) => {
                frames.push(TrackingFrame::from(r));
                stats.parsed += 1;
            }
            Err(e) => {
                stats.failed += 1;
                if stats.failed <= 5 {
                    warn!(
                        file = %path.display(),
                        line = line + 2,
                        error = %e,
                        "skipping tracking row"
                    );
                }
            }
        }
    }
    debug!(
        file = %path.display(),
        parsed = stats.parsed,
        failed = stats.failed,
        "tracking CSV read"
    );
    Ok((frames, stats))
}

/// Tracking files under `dir` (recursively), keyed by the segment named in
/// the file name (in seconds).
pub fn discover_tracking_files(dir: &Path) -> Result<BTreeMap<SegmentKey, PathBuf>> {
    let mut found = BTreeMap::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(current) = pending.pop() {
        let entries = fs::read_dir(&current)
            .with_context(|| format!("Failed to list directory: {}", current.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
                continue;
            }
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            let Some(stem) = name.strip_suffix(TRACKING_SUFFIX) else {
                continue;
            };
            match SegmentKey::from_video_name(stem) {
                Some(key) => {
                    found.insert(key, path.clone());
                }
                None => debug!(file = %path.display(), "tracking file name has no segment range"),
            }
        }
    }
    Ok(found)
}

/// `{"<game>": {"left_team_id_1st_half": 1, "right_team_id_1st_half": 2}}`
pub fn load_match_teams(path: &Path) -> Result<BTreeMap<String, MatchTeams>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read match info: {}", path.display()))?;
    let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse match info: {}", path.display()))?;

    let id = |v: &serde_json::Value| match v {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        _ => None,
    };

    let mut teams = BTreeMap::new();
    for (game, info) in raw {
        let left = info.get("left_team_id_1st_half").and_then(id);
        let right = info.get("right_team_id_1st_half").and_then(id);
        match (left, right) {
            (Some(left), Some(right)) => {
                teams.insert(game, MatchTeams::new(left, right));
            }
            _ => warn!(game = %game, "match info lacks first-half team sides"),
        }
    }
    Ok(teams)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{tempdir, NamedTempFile};

    #[test]
    fn test_read_with_optional_columns() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        writeln!(file, "frame_index,match_time,player_id,x,y,team_id,position")?;
        writeln!(file, "0,600000,ball,1.5,2.5,,")?;
        writeln!(file, "0,600000,17,10.0,20.0,100,GK")?;
        writeln!(file, "1,600040,17,,20.5,100,GK")?;
        writeln!(file, "x,600080,17,1,1,100,GK")?;

        let (frames, stats) = read_tracking_csv(file.path())?;
        assert_eq!(stats, ParseStats { total_rows: 4, parsed: 3, failed: 1 });
        assert_eq!(frames[0].entity_id, EntityId::Ball);
        assert_eq!(frames[0].team_id, None);
        assert_eq!(frames[1].team_id.as_deref(), Some("100"));
        assert_eq!(frames[1].position.as_deref(), Some("GK"));
        assert!(frames[2].x.is_nan(), "empty coordinate is a missing value");
        Ok(())
    }

    #[test]
    fn test_discover_by_file_name() -> Result<()> {
        let dir = tempdir()?;
        let game_dir = dir.path().join("117093");
        fs::create_dir_all(&game_dir)?;
        fs::write(game_dir.join("117093_10_00-11_00_tracking.csv"), "frame_index\n")?;
        fs::write(game_dir.join("notes.txt"), "")?;

        let found = discover_tracking_files(dir.path())?;
        assert_eq!(found.len(), 1);
        assert!(found.contains_key(&SegmentKey::new("117093", 600, 660)));
        Ok(())
    }

    #[test]
    fn test_match_teams() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        write!(
            file,
            r#"{{"1": {{"left_team_id_1st_half": 100, "right_team_id_1st_half": "200"}},
                "2": {{}}}}"#
        )?;
        let teams = load_match_teams(file.path())?;
        assert_eq!(teams.len(), 1);
        assert_eq!(teams["1"], MatchTeams::new("100", "200"));
        Ok(())
    }
}
