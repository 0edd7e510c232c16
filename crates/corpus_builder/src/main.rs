//! Corpus Builder CLI
//!
//! Rater JSON → probability tables / agreement reports
//! Rater JSON + tracking CSV → training corpus (MsgPack+LZ4)

#[cfg(feature = "cli")]
use anyhow::Result;
#[cfg(feature = "cli")]
use clap::{Args, Parser, Subcommand};
#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};

#[cfg(feature = "cli")]
use tactic_core::{
    label_table, NormalizationMode, Pipeline, PipelineOutput, Side, VotePatternHistogram,
};

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "corpus_builder")]
#[command(about = "Fuse rater annotations and build training corpora", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct ConfigArgs {
    /// Pipeline config file (.yaml/.yml or .json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Named preset ("seconds", "high_resolution")
    #[arg(long)]
    profile: Option<String>,
}

#[cfg(feature = "cli")]
impl ConfigArgs {
    fn load(&self) -> Result<tactic_core::PipelineConfig> {
        corpus_builder::load_config(self.config.as_deref(), self.profile.as_deref())
    }
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Write per-segment probability tables
    Aggregate {
        /// Directory of rater JSON exports (or left/ and right/ subdirectories)
        #[arg(long)]
        annotations: PathBuf,

        /// Output directory
        #[arg(long)]
        out: PathBuf,

        #[command(flatten)]
        settings: ConfigArgs,
    },

    /// Compute Fleiss' kappa per match
    Agreement {
        /// Directory of rater JSON exports (or left/ and right/ subdirectories)
        #[arg(long)]
        annotations: PathBuf,

        /// Output JSON report path
        #[arg(long)]
        out: PathBuf,

        /// Also write the mean report over all matches as CSV
        #[arg(long)]
        csv: Option<PathBuf>,

        /// Directory for per-segment vote-pattern CSVs
        #[arg(long)]
        patterns: Option<PathBuf>,

        #[command(flatten)]
        settings: ConfigArgs,
    },

    /// Build the windowed training corpus
    Build {
        /// Directory of rater JSON exports (or left/ and right/ subdirectories)
        #[arg(long)]
        annotations: PathBuf,

        /// Directory of `*_tracking.csv` files
        #[arg(long)]
        tracking: PathBuf,

        /// Match info JSON with first-half team sides
        #[arg(long)]
        teams: Option<PathBuf>,

        /// Output MsgPack+LZ4 file path
        #[arg(long)]
        out: PathBuf,

        /// Comma-separated game ids, in corpus order
        #[arg(long, value_delimiter = ',')]
        matches: Vec<String>,

        /// Schema version (e.g., "v1")
        #[arg(long, default_value = "v1")]
        schema_version: String,

        /// Verify corpus after building
        #[arg(long, default_value = "false")]
        verify: bool,

        /// Output metadata JSON file
        #[arg(long)]
        metadata: Option<PathBuf>,

        /// Output run summary JSON file
        #[arg(long)]
        summary: Option<PathBuf>,

        #[command(flatten)]
        settings: ConfigArgs,
    },
}

#[cfg(feature = "cli")]
fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Aggregate {
            annotations,
            out,
            settings,
        } => {
            println!("🔨 Aggregating annotations...");
            println!("   Annotations: {}", annotations.display());
            println!("   Output:      {}", out.display());

            let mut pipeline_config = settings.load()?;
            pipeline_config.agreement.enabled = false;
            let output = run_pipeline(&annotations, None, None, pipeline_config, &[])?;

            let tick_ms = output_tick_ms(&output);
            let mut written = 0;
            for (key, sides) in &output.timelines {
                let stem = key.file_stem(tick_ms);
                for side in sides {
                    let name = match side.side {
                        Side::Whole => format!("{}.csv", stem),
                        other => format!("{}_{}.csv", stem, other.name()),
                    };
                    corpus_builder::tables::write_probability_csv(&out.join(name), &side.timeline)?;
                    written += 1;
                }
                if sides.len() > 1 {
                    let joined = label_table(sides)?;
                    let path = out.join(format!("{}.csv", stem));
                    corpus_builder::tables::write_probability_csv(&path, &joined)?;
                    written += 1;
                }
            }
            corpus_builder::tables::write_summary_json(&out.join("summary.json"), &output.summary)?;

            println!("\n✅ {} probability tables written", written);
            print_summary(&output);
        }

        Commands::Agreement {
            annotations,
            out,
            csv,
            patterns,
            settings,
        } => {
            println!("🔨 Computing rater agreement...");
            println!("   Annotations: {}", annotations.display());
            println!("   Output:      {}", out.display());

            let mut pipeline_config = settings.load()?;
            pipeline_config.agreement.enabled = true;
            let rater_count = pipeline_config.annotation.rater_count as u32;
            let fixed_n =
                pipeline_config.annotation.normalization == NormalizationMode::FixedRaterCount;
            let output = run_pipeline(&annotations, None, None, pipeline_config, &[])?;

            corpus_builder::tables::write_agreement_json(&out, &output.agreement)?;

            println!("\n✅ Agreement computed for {} matches", output.agreement.len());
            for m in &output.agreement {
                match &m.combined {
                    Some(r) => println!(
                        "   {:<12} κ = {:>7.4}   P̄ = {:.4}   P̄e = {:.4}",
                        m.game_id, r.fleiss_kappa, r.agreement_rate, r.chance_agreement_rate
                    ),
                    None => println!("   {:<12} skipped", m.game_id),
                }
            }

            if let Some(csv_path) = csv {
                let reports: Vec<_> = output.agreement.iter().filter_map(|m| m.combined).collect();
                match tactic_core::AgreementReport::mean_of(&reports) {
                    Some(mean) => {
                        corpus_builder::tables::write_agreement_csv(&csv_path, &mean)?;
                        println!("\n📄 Mean agreement saved to: {}", csv_path.display());
                    }
                    None => {
                        println!("\n⚠️  No match produced an agreement report, CSV not written")
                    }
                }
            }

            if let Some(dir) = patterns {
                if fixed_n {
                    let count = write_vote_patterns(&dir, &output, rater_count)?;
                    println!("\n📄 {} vote-pattern tables saved to: {}", count, dir.display());
                } else {
                    println!("\n⚠️  Vote patterns need fixed-N tables, skipped");
                }
            }
            print_summary(&output);
        }

        Commands::Build {
            annotations,
            tracking,
            teams,
            out,
            matches,
            schema_version,
            verify,
            metadata,
            summary,
            settings,
        } => {
            println!("🔨 Building training corpus...");
            println!("   Annotations: {}", annotations.display());
            println!("   Tracking:    {}", tracking.display());
            println!("   Output:      {}", out.display());
            println!("   Schema:      {}", schema_version);

            let pipeline_config = settings.load()?;
            let output = run_pipeline(
                &annotations,
                Some(&tracking),
                teams.as_deref(),
                pipeline_config,
                &matches,
            )?;

            let meta = corpus_builder::write_corpus(&output.corpus, &out, &schema_version)?;
            print_metadata(&meta);
            print_summary(&output);

            if verify {
                verify_corpus_integrity(&out, &meta.checksum)?;
            }

            if let Some(metadata_path) = metadata {
                corpus_builder::save_metadata(&metadata_path, &meta)?;
                println!("\n📄 Metadata saved to: {}", metadata_path.display());
            }

            if let Some(summary_path) = summary {
                corpus_builder::tables::write_summary_json(&summary_path, &output.summary)?;
                println!("📄 Summary saved to: {}", summary_path.display());
            }
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn run_pipeline(
    annotations: &Path,
    tracking: Option<&Path>,
    teams: Option<&Path>,
    config: tactic_core::PipelineConfig,
    matches: &[String],
) -> Result<PipelineOutput> {
    let tick_ms = config.annotation.tick_ms;
    let sides = corpus_builder::load_annotation_sides(annotations, tick_ms)?;
    let segments = corpus_builder::collect_segments(sides, tracking, teams, &config)?;
    let pipeline = Pipeline::new(config)?;
    Ok(pipeline.run_ordered(segments, matches))
}

#[cfg(feature = "cli")]
fn output_tick_ms(output: &PipelineOutput) -> i64 {
    output
        .timelines
        .values()
        .flat_map(|sides| sides.iter())
        .map(|s| s.timeline.tick_ms())
        .next()
        .unwrap_or(1000)
}

#[cfg(feature = "cli")]
fn write_vote_patterns(dir: &Path, output: &PipelineOutput, rater_count: u32) -> Result<usize> {
    let tick_ms = output_tick_ms(output);
    let mut count = 0;
    for (key, sides) in &output.timelines {
        let histogram = match sides.as_slice() {
            [left, right] if left.side == Side::Left && right.side == Side::Right => {
                VotePatternHistogram::from_sides(&left.timeline, &right.timeline, rater_count)?
            }
            [single] => VotePatternHistogram::from_timeline(&single.timeline, rater_count),
            _ => continue,
        };
        let path = dir.join(format!("{}_patterns.csv", key.file_stem(tick_ms)));
        corpus_builder::tables::write_vote_patterns_csv(&path, &histogram)?;
        count += 1;
    }
    Ok(count)
}

#[cfg(feature = "cli")]
fn print_metadata(meta: &corpus_builder::CorpusMetadata) {
    println!("\n✅ Corpus built successfully!");
    println!(
        "   Sequences:       [{}, {}, {}]",
        meta.sequences[0], meta.sequences[1], meta.sequences[2]
    );
    println!("   Labels:          [{}, {}]", meta.labels[0], meta.labels[1]);
    println!(
        "   Original size:   {} bytes ({:.2} KB)",
        meta.original_size,
        meta.original_size as f64 / 1024.0
    );
    println!(
        "   Compressed size: {} bytes ({:.2} KB)",
        meta.compressed_size,
        meta.compressed_size as f64 / 1024.0
    );
    println!("   Compression:     {:.1}%", meta.compression_ratio * 100.0);
    println!("   Checksum:        {}", meta.checksum);
    println!("   Created:         {}", meta.created_at);
}

#[cfg(feature = "cli")]
fn print_summary(output: &PipelineOutput) {
    let summary = &output.summary;
    println!("\n📊 Run summary");
    println!("   Segments:   {}", summary.segments.len());
    println!("   Completed:  {}", summary.completed());
    println!("   Skipped:    {}", summary.skipped().count());
    println!("   Warnings:   {}", summary.warnings.len());
    if summary.unknown_labels > 0 {
        println!("   Unknown labels ignored: {}", summary.unknown_labels);
    }
    let stats = &summary.window_stats;
    if stats.anchors > 0 {
        println!(
            "   Windows:    {} of {} anchors ({} padded, {} unlabeled, {} discarded)",
            stats.emitted, stats.anchors, stats.padded, stats.unlabeled, stats.discarded_missing
        );
    }
    for report in summary.skipped() {
        if let tactic_core::SegmentOutcome::Skipped { reason } = &report.status {
            println!("   ⚠️  {}: {}", report.segment, reason);
        }
    }
    for scope in &summary.skipped_evaluations {
        println!("   ⚠️  {}", scope);
    }
}

#[cfg(feature = "cli")]
fn verify_corpus_integrity(corpus_path: &Path, checksum: &str) -> Result<()> {
    println!("\n🔍 Verifying corpus integrity...");
    let is_valid = corpus_builder::verify_corpus(corpus_path, checksum)?;

    if is_valid {
        println!("✅ Corpus verification passed");
        Ok(())
    } else {
        anyhow::bail!("❌ Corpus verification failed - checksum mismatch!")
    }
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("corpus_builder CLI is not available. Enable the 'cli' feature to use it.");
    std::process::exit(1);
}
