//! CSV / JSON writers for probability tables and agreement reports.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use tactic_core::annotation::clock::format_clock;
use tactic_core::{
    AgreementReport, MatchAgreement, ProbabilityTimeline, RunSummary, VotePatternHistogram,
};

const AGREEMENT_HEADER: [&str; 4] =
    ["agreement_rate", "chance_agreement_rate", "fleiss_kappa", "normalized_agreement"];

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create output directory: {}", parent.display())
            })?;
        }
    }
    Ok(())
}

fn csv_writer(path: &Path) -> Result<csv::Writer<fs::File>> {
    ensure_parent(path)?;
    csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV: {}", path.display()))
}

/// `MM:SS` for second ticks, match milliseconds otherwise.
pub fn format_tick(tick: i64, tick_ms: i64) -> String {
    if tick_ms == 1000 {
        format_clock(tick)
    } else {
        (tick * tick_ms).to_string()
    }
}

/// Header `match_time,<categories…>`, one row per tick.
pub fn write_probability_csv(path: &Path, timeline: &ProbabilityTimeline) -> Result<()> {
    let mut writer = csv_writer(path)?;

    let mut header = vec!["match_time".to_string()];
    header.extend(timeline.categories().iter().cloned());
    writer.write_record(&header)?;

    for (tick, row) in timeline.iter() {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(format_tick(tick, timeline.tick_ms()));
        record.extend(row.iter().map(|p| p.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Header `agreement_rate,chance_agreement_rate,fleiss_kappa,normalized_agreement`.
pub fn write_agreement_csv(path: &Path, report: &AgreementReport) -> Result<()> {
    let mut writer = csv_writer(path)?;
    writer.write_record(AGREEMENT_HEADER)?;
    writer.write_record([
        report.agreement_rate.to_string(),
        report.chance_agreement_rate.to_string(),
        report.fleiss_kappa.to_string(),
        report.normalized_agreement.to_string(),
    ])?;
    writer.flush()?;
    Ok(())
}

/// Header `category,0/N,1/N,…`, one row per category.
pub fn write_vote_patterns_csv(path: &Path, histogram: &VotePatternHistogram) -> Result<()> {
    let mut writer = csv_writer(path)?;

    let mut header = vec!["category".to_string()];
    header.extend((0..=histogram.max_votes).map(|v| histogram.descriptor(v)));
    writer.write_record(&header)?;

    for (category, shares) in histogram.categories.iter().zip(&histogram.shares) {
        let mut record = vec![category.clone()];
        record.extend(shares.iter().map(|s| s.to_string()));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_agreement_json(path: &Path, agreement: &[MatchAgreement]) -> Result<()> {
    write_json(path, &agreement)
}

pub fn write_summary_json(path: &Path, summary: &RunSummary) -> Result<()> {
    write_json(path, summary)
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(value).context("Failed to serialize JSON")?;
    fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}
