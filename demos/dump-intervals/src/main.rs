use anyhow::{Context, Result};
use clap::Parser;
use perf_log_parser::{AnchorPolicy, ExtractOptions, StageIntervals, extract_file};
use serde_json::json;
use std::{path::PathBuf, time::Instant};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "dump-intervals")]
#[command(version)]
#[command(about = "Print per-block stage intervals and statistics from a performance statistic log", long_about = None)]
struct Cli {
    /// Log file to read
    #[arg(value_name = "LOG")]
    input: PathBuf,

    /// Event all timestamps are measured from
    #[arg(long, value_name = "KEY")]
    anchor: Option<String>,

    /// Keep raw timestamps when the anchor event is missing
    #[arg(long)]
    allow_missing_anchor: bool,

    /// Number of blocks to print, all by default
    #[arg(long)]
    rows: Option<usize>,

    /// Print the rows as JSON
    #[arg(long)]
    json: bool,

    /// Print one `stage[index]` line per interval instead of one line per block
    #[arg(long)]
    bars: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// `.log` is implied when the input has no extension.
    fn input_path(&self) -> PathBuf {
        if self.input.extension().is_some() {
            self.input.clone()
        } else {
            self.input.with_extension("log")
        }
    }

    fn options(&self) -> Result<ExtractOptions> {
        let mut options = ExtractOptions {
            max_rows: self.rows,
            ..ExtractOptions::default()
        };
        if let Some(anchor) = &self.anchor {
            options.anchor = anchor
                .parse()
                .with_context(|| format!("invalid anchor `{anchor}`"))?;
        }
        if self.allow_missing_anchor {
            options.anchor_policy = AnchorPolicy::DefaultToZero;
        }
        Ok(options)
    }
}

fn print_rows(intervals: &StageIntervals) {
    for row in intervals.rows() {
        let segments: Vec<String> = intervals
            .stages()
            .iter()
            .zip(row.segments())
            .flat_map(|(stage, segments)| {
                segments
                    .iter()
                    .map(move |i| format!("{stage} {}+{}", i.start, i.duration))
            })
            .collect();
        println!("  {}: {}", row.label(), segments.join(", "));
    }
}

fn bar_lines(intervals: &StageIntervals) -> Vec<String> {
    intervals
        .stage_bars()
        .into_iter()
        .map(|(key, i)| format!("  {key}: {}+{}", i.start, i.duration))
        .collect()
}

fn print_summary(intervals: &StageIntervals) {
    println!("==========");
    for summary in intervals.summary() {
        println!(
            "{}: count {}, mean {:.3}, min {}, max {}, total {}",
            summary.stage, summary.count, summary.mean, summary.min, summary.max, summary.total
        );
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let default = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();

    let input = cli.input_path();
    let now = Instant::now();
    let intervals = extract_file(&input, &cli.options()?)
        .with_context(|| format!("failed to extract {}", input.display()))?;
    let elapsed = now.elapsed();
    info!(input = %input.display(), blocks = intervals.total_rows(), "extracted");

    if cli.json {
        let dump = json!({
            "blocks": intervals.total_rows(),
            "intervals": &intervals,
            "summary": intervals.summary(),
        });
        println!("{}", serde_json::to_string_pretty(&dump)?);
        return Ok(());
    }

    println!("duration: {} ms", elapsed.as_secs_f64() * 1000.0);
    println!(
        "Blocks: {} (showing {})",
        intervals.total_rows(),
        intervals.rows().len()
    );
    println!("Stages: {}", intervals.stages().join(", "));
    println!("==========");
    if cli.bars {
        for line in bar_lines(&intervals) {
            println!("{line}");
        }
    } else {
        print_rows(&intervals);
    }
    print_summary(&intervals);
    Ok(())
}
