//! Corpus Builder Library
//!
//! Rater JSON + tracking CSV → probability tables, agreement reports and a
//! training corpus cache (MessagePack → LZ4 → SHA256 checksum).

pub mod batch;
pub mod rater_json;
pub mod tables;
pub mod tracking_csv;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use tactic_core::{PipelineConfig, TrainingCorpus};

pub use batch::{collect_segments, load_annotation_sides, SideAnnotationMap};
pub use rater_json::{parse_rater_json, JsonRaterSource};
pub use tracking_csv::{discover_tracking_files, load_match_teams, read_tracking_csv, ParseStats};

/// Corpus cache metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusMetadata {
    /// Schema version (e.g. "v1")
    pub schema_version: String,
    /// SHA256 checksum (hex)
    pub checksum: String,
    /// RFC3339
    pub created_at: String,
    /// MessagePack size before compression (bytes)
    pub original_size: u64,
    pub compressed_size: u64,
    /// compressed / original
    pub compression_ratio: f64,
    /// `[n, T, F]`
    pub sequences: [usize; 3],
    /// `[n, K]`
    pub labels: [usize; 2],
    pub categories: Vec<String>,
}

fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Serialize a corpus to MessagePack+LZ4 and write it.
///
/// # Arguments
///
/// * `corpus` - assembled training corpus
/// * `output` - corpus file path (parent directories are created)
/// * `schema_version` - schema version string
///
/// # Returns
///
/// Shape, sizes and checksum of the written corpus
pub fn write_corpus(
    corpus: &TrainingCorpus,
    output: &Path,
    schema_version: &str,
) -> Result<CorpusMetadata> {
    let (sequences, labels) = corpus.shape();
    let encoded = rmp_serde::to_vec(corpus)
        .with_context(|| format!("Corpus of {} windows could not be encoded", sequences[0]))?;
    let original_size = encoded.len() as u64;

    let compressed = lz4_flex::compress_prepend_size(&encoded);
    let compressed_size = compressed.len() as u64;
    let checksum = sha256_hex(&compressed);

    if let Some(parent) = output.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Cannot create corpus directory {}", parent.display()))?;
    }
    fs::write(output, &compressed)
        .with_context(|| format!("Cannot write corpus to {}", output.display()))?;

    Ok(CorpusMetadata {
        schema_version: schema_version.to_string(),
        checksum,
        created_at: chrono::Utc::now().to_rfc3339(),
        original_size,
        compressed_size,
        compression_ratio: compressed_size as f64 / original_size as f64,
        sequences,
        labels,
        categories: corpus.categories().to_vec(),
    })
}

/// `true` when the corpus file on disk hashes to `expected_checksum`.
pub fn verify_corpus(corpus_file: &Path, expected_checksum: &str) -> Result<bool> {
    let bytes = fs::read(corpus_file)
        .with_context(|| format!("Cannot open corpus {} for verification", corpus_file.display()))?;
    Ok(sha256_hex(&bytes) == expected_checksum)
}

/// Decompress and decode a corpus file.
pub fn load_corpus(corpus_file: &Path) -> Result<TrainingCorpus> {
    let compressed = fs::read(corpus_file)
        .with_context(|| format!("Cannot open corpus {}", corpus_file.display()))?;

    let encoded = lz4_flex::decompress_size_prepended(&compressed)
        .with_context(|| format!("{} is not an LZ4 corpus file", corpus_file.display()))?;

    rmp_serde::from_slice(&encoded)
        .with_context(|| format!("{} does not hold a training corpus", corpus_file.display()))
}

pub fn save_metadata(path: &Path, meta: &CorpusMetadata) -> Result<()> {
    let json = serde_json::to_string_pretty(meta)?;
    fs::write(path, json)
        .with_context(|| format!("Cannot write corpus metadata to {}", path.display()))?;
    Ok(())
}

/// Pipeline configuration from a YAML/JSON file, a named profile, or the
/// `TACTIC_PIPELINE_PROFILE` environment variable, in that order.
pub fn load_config(path: Option<&Path>, profile: Option<&str>) -> Result<PipelineConfig> {
    if let Some(path) = path {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
        let config = if is_yaml {
            PipelineConfig::from_yaml(&text)
        } else {
            PipelineConfig::from_json(&text)
        };
        return config.with_context(|| format!("Invalid config: {}", path.display()));
    }

    match profile {
        Some(name) => {
            PipelineConfig::profile(name).with_context(|| format!("Invalid profile: {}", name))
        }
        None => Ok(PipelineConfig::from_env_or_default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tactic_core::{SegmentKey, SequenceWindow};
    use tempfile::{tempdir, NamedTempFile};

    fn sample_corpus() -> TrainingCorpus {
        let mut corpus = TrainingCorpus::new(2, 3);
        let windows: Vec<SequenceWindow> = (0..50)
            .map(|i| SequenceWindow {
                anchor_time: i * 200,
                features: vec![(i % 4) as f64; 6],
                labels: vec![0.5, 0.25],
            })
            .collect();
        corpus
            .append(&SegmentKey::new("g", 0, 60), &["A".to_string(), "B".to_string()], &windows)
            .unwrap();
        corpus
    }

    #[test]
    fn test_write_verify_and_load_corpus() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("out/corpus.msgpack.lz4");
        let corpus = sample_corpus();

        let meta = write_corpus(&corpus, &path, "v1")?;
        assert_eq!(meta.schema_version, "v1");
        assert_eq!(meta.sequences, [50, 2, 3]);
        assert_eq!(meta.labels, [50, 2]);
        assert_eq!(meta.categories, vec!["A", "B"]);
        assert!(verify_corpus(&path, &meta.checksum)?);
        assert!(!verify_corpus(&path, "deadbeef")?);

        let loaded = load_corpus(&path)?;
        assert_eq!(loaded, corpus);
        Ok(())
    }

    #[test]
    fn test_repetitive_corpus_compresses() -> Result<()> {
        let temp_output = NamedTempFile::new()?;
        let meta = write_corpus(&sample_corpus(), temp_output.path(), "v1")?;
        assert!(meta.compression_ratio < 1.0);
        Ok(())
    }

    #[test]
    fn test_corrupt_file_fails_to_load() -> Result<()> {
        let mut file = NamedTempFile::new()?;
        file.write_all(b"\x10\x00\x00\x00garbage")?;
        let err = load_corpus(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("corpus"), "error names the corpus file: {:#}", err);

        let absent = Path::new("/nonexistent/corpus.msgpack.lz4");
        let missing = verify_corpus(absent, "00").unwrap_err();
        assert!(format!("{}", missing).contains("for verification"));
        Ok(())
    }

    #[test]
    fn test_load_config_sources() -> Result<()> {
        let dir = tempdir()?;
        let yaml = dir.path().join("pipeline.yaml");
        fs::write(&yaml, "annotation:\n  vocabulary: [A, B]\n  rater_count: 3\nparallel: true\n")?;
        let config = load_config(Some(&yaml), None)?;
        assert_eq!(config.annotation.rater_count, 3);
        assert!(config.parallel);

        let json = dir.path().join("pipeline.json");
        fs::write(&json, r#"{"annotation": {"vocabulary": [], "rater_count": 3}}"#)?;
        assert!(load_config(Some(&json), None).is_err(), "empty vocabulary is fatal");

        let hires = load_config(None, Some("high_resolution"))?;
        assert_eq!(hires.annotation.tick_ms, 1);
        assert!(load_config(None, Some("nope")).is_err());
        Ok(())
    }
}
