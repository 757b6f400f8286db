mod config;

use anyhow::{Context, Result};
use clap::Parser;
use config::{ChartSection, Config, Job};
use perf_gantt::{ChartSpec, ImageFormat, save_chart};
use perf_log_parser::{ExtractOptions, TimeUnit, extract_file};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "plot-gantt")]
#[command(version)]
#[command(about = "Render per-block stage Gantt charts from performance statistic logs", long_about = None)]
struct Cli {
    /// Logs to chart (`.log` is appended when there is no extension)
    #[arg(value_name = "LOG")]
    inputs: Vec<PathBuf>,

    /// TOML file with extract, chart and job settings
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory for the charts (defaults to next to each log)
    #[arg(short, long, value_name = "DIR")]
    out_dir: Option<PathBuf>,

    /// Image format for outputs without an explicit path (png or svg)
    #[arg(long)]
    format: Option<ImageFormat>,

    /// Number of blocks to chart, 0 for all
    #[arg(long)]
    rows: Option<usize>,

    /// Stages to chart, in legend order (default: as they appear in the log)
    #[arg(long, value_delimiter = ',')]
    stages: Option<Vec<String>>,

    /// First sequence index; every index up to --last must be logged
    #[arg(long)]
    first: Option<u32>,

    /// Last sequence index
    #[arg(long)]
    last: Option<u32>,

    /// Event all timestamps are measured from
    #[arg(long, value_name = "KEY")]
    anchor: Option<String>,

    /// Keep raw timestamps when the anchor event is missing
    #[arg(long)]
    allow_missing_anchor: bool,

    /// Unit of the logged timestamps (ns, us, ms or s)
    #[arg(long)]
    unit: Option<TimeUnit>,

    /// Unit of the time axis (defaults to --unit)
    #[arg(long)]
    axis_unit: Option<TimeUnit>,

    /// Chart title (defaults to the part of the file name after the first `-`)
    #[arg(long)]
    title: Option<String>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    /// Command line values take precedence over the config file.
    fn config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::default(),
        };

        if !self.inputs.is_empty() {
            config.jobs = self.inputs.iter().map(Job::new).collect();
        }
        if let Some(title) = &self.title {
            for job in &mut config.jobs {
                job.title = Some(title.clone());
            }
        }

        let extract = &mut config.extract;
        if self.anchor.is_some() {
            extract.anchor = self.anchor.clone();
        }
        if self.stages.is_some() {
            extract.stages = self.stages.clone();
        }
        extract.first = self.first.or(extract.first);
        extract.last = self.last.or(extract.last);
        extract.rows = self.rows.or(extract.rows);
        extract.allow_missing_anchor |= self.allow_missing_anchor;
        extract.unit = self.unit.or(extract.unit);
        extract.axis_unit = self.axis_unit.or(extract.axis_unit);

        let chart = &mut config.chart;
        if let Some(format) = self.format {
            chart.format = format;
        }
        if self.out_dir.is_some() {
            chart.out_dir = self.out_dir.clone();
        }

        Ok(config.with_default_jobs())
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn plot(job: &Job, options: &ExtractOptions, chart: &ChartSection) -> Result<PathBuf> {
    let input = job.input_path();
    let intervals = extract_file(&input, options)?;

    let categories = intervals
        .stages()
        .iter()
        .map(|stage| chart.category(stage))
        .collect();
    let x_label = chart
        .x_label
        .clone()
        .unwrap_or_else(|| options.scale.display.axis_label());
    let spec = ChartSpec::new(job.title(), categories)
        .with_arrivals(job.arrivals.clone())
        .with_x_label(x_label)
        .with_y_label(chart.y_label.as_str())
        .with_size(chart.width, chart.height);

    let output = job.output_path(chart.out_dir.as_deref(), chart.format);
    create_parent(&output)?;
    save_chart(intervals.rows(), &spec, &output)?;

    info!(
        input = %input.display(),
        output = %output.display(),
        shown = intervals.rows().len(),
        blocks = intervals.total_rows(),
        "plotted"
    );
    Ok(output)
}

fn create_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display())),
        _ => Ok(()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let now = Instant::now();
    let config = cli.config()?;
    let options = config.extract.options()?;

    for job in &config.jobs {
        let output = plot(job, &options, &config.chart)
            .with_context(|| format!("failed to plot {}", job.input_path().display()))?;
        println!("wrote {}", output.display());
    }

    info!(
        jobs = config.jobs.len(),
        duration_ms = now.elapsed().as_secs_f64() * 1000.0,
        "done"
    );
    Ok(())
}
