use anyhow::{Context, Result};
use perf_gantt::ImageFormat;
use perf_log_parser::{AnchorPolicy, ExtractOptions, IndexBounds, TimeScale, TimeUnit};
use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

/// Logs charted when neither inputs nor jobs are given.
pub const DEFAULT_JOBS: &[&str] = &["system-baseline", "system-neochain"];

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub extract: ExtractSection,
    pub chart: ChartSection,
    #[serde(rename = "job")]
    pub jobs: Vec<Job>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Config> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("failed to parse config {}", path.display()))
    }

    pub fn with_default_jobs(mut self) -> Config {
        if self.jobs.is_empty() {
            self.jobs = DEFAULT_JOBS.iter().map(Job::new).collect();
        }
        self
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractSection {
    pub anchor: Option<String>,
    pub stages: Option<Vec<String>>,
    pub first: Option<u32>,
    pub last: Option<u32>,
    /// Blocks to chart; 0 charts all of them.
    pub rows: Option<usize>,
    pub allow_missing_anchor: bool,
    pub unit: Option<TimeUnit>,
    pub axis_unit: Option<TimeUnit>,
}

impl ExtractSection {
    pub fn options(&self) -> Result<ExtractOptions> {
        let mut options = ExtractOptions::default();

        if let Some(anchor) = &self.anchor {
            options.anchor = anchor
                .parse()
                .with_context(|| format!("invalid anchor `{anchor}`"))?;
        }
        if self.allow_missing_anchor {
            options.anchor_policy = AnchorPolicy::DefaultToZero;
        }
        options.stages = self.stages.clone();
        options.bounds = IndexBounds::new(self.first, self.last);
        match self.rows {
            Some(0) => options.max_rows = None,
            Some(rows) => options.max_rows = Some(rows),
            None => (),
        }

        let source = self.unit.unwrap_or_default();
        options.scale = TimeScale::new(source, self.axis_unit.unwrap_or(source));
        Ok(options)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChartSection {
    pub width: u32,
    pub height: u32,
    /// Defaults to "<axis unit> since start".
    pub x_label: Option<String>,
    pub y_label: String,
    pub format: ImageFormat,
    pub out_dir: Option<PathBuf>,
    /// Legend names by stage.
    pub labels: BTreeMap<String, String>,
}

impl Default for ChartSection {
    fn default() -> Self {
        ChartSection {
            width: 1000,
            height: 300,
            x_label: None,
            y_label: "Process".to_string(),
            format: ImageFormat::Png,
            out_dir: None,
            labels: BTreeMap::from([
                ("exe".to_string(), "execution".to_string()),
                ("commit".to_string(), "commitment".to_string()),
            ]),
        }
    }
}

impl ChartSection {
    pub fn category(&self, stage: &str) -> String {
        self.labels
            .get(stage)
            .cloned()
            .unwrap_or_else(|| stage.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Job {
    pub input: PathBuf,
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub arrivals: Vec<i64>,
}

impl Job {
    pub fn new<P: AsRef<Path>>(input: P) -> Job {
        Job {
            input: input.as_ref().to_path_buf(),
            output: None,
            title: None,
            arrivals: Vec::new(),
        }
    }

    /// `.log` is implied when the input has no extension.
    pub fn input_path(&self) -> PathBuf {
        if self.input.extension().is_some() {
            self.input.clone()
        } else {
            self.input.with_extension("log")
        }
    }

    pub fn output_path(&self, out_dir: Option<&Path>, format: ImageFormat) -> PathBuf {
        if let Some(output) = &self.output {
            return output.clone();
        }
        let output = self.input_path().with_extension(format.extension());
        match (out_dir, output.file_name()) {
            (Some(dir), Some(name)) => dir.join(name),
            _ => output,
        }
    }

    pub fn title(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| default_title(&self.input))
    }
}

/// `system-baseline` → `baseline`; stems without a `-` are used whole.
pub fn default_title(input: &Path) -> String {
    let stem = input
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    match stem.split('-').nth(1) {
        Some(part) if !part.is_empty() => part.to_string(),
        _ => stem,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perf_log_parser::EventKey;

    const CONFIG: &str = r#"
[extract]
anchor = "consensus[s][2]"
stages = ["consensus", "exe", "commit"]
first = 1
last = 63
rows = 0
unit = "ns"
axis_unit = "ms"

[chart]
width = 1200
format = "svg"
[chart.labels]
exe = "execution"

[[job]]
input = "system-baseline"
output = "out/baseline.svg"
title = "baseline run"
arrivals = [0, 5, 0]

[[job]]
input = "logs/system-neochain.log"
"#;

    #[test]
    fn test_load_config() {
        let config: Config = toml::from_str(CONFIG).unwrap();
        assert_eq!(config.jobs.len(), 2);
        assert_eq!(config.jobs[0].arrivals, [0, 5, 0]);
        assert_eq!(config.chart.width, 1200);
        assert_eq!(config.chart.height, 300);
        assert_eq!(config.chart.format, ImageFormat::Svg);
        assert_eq!(config.chart.category("exe"), "execution");
        assert_eq!(config.chart.category("commit"), "commit");

        let options = config.extract.options().unwrap();
        assert_eq!(options.anchor, EventKey::start("consensus", 2));
        assert_eq!(options.bounds, IndexBounds::new(Some(1), Some(63)));
        assert_eq!(options.max_rows, None);
        assert_eq!(
            options.scale,
            TimeScale::new(TimeUnit::Nanoseconds, TimeUnit::Milliseconds)
        );
    }

    #[test]
    fn test_default_config() {
        let config = Config::default().with_default_jobs();
        let inputs: Vec<_> = config.jobs.iter().map(|job| job.input_path()).collect();
        assert_eq!(
            inputs,
            [
                PathBuf::from("system-baseline.log"),
                PathBuf::from("system-neochain.log")
            ]
        );
        assert_eq!(config.chart.category("exe"), "execution");
        assert_eq!(config.chart.category("commit"), "commitment");
        assert_eq!(config.chart.category("consensus"), "consensus");

        let options = config.extract.options().unwrap();
        assert_eq!(options.max_rows, Some(3));
        assert_eq!(options.anchor_policy, AnchorPolicy::Required);
        assert!(options.scale.is_identity());
    }

    #[test]
    fn test_unknown_field() {
        assert!(toml::from_str::<Config>("[extract]\nrange = 3\n").is_err());
    }

    #[test]
    fn test_invalid_anchor() {
        let section = ExtractSection {
            anchor: Some("consensus".to_string()),
            ..ExtractSection::default()
        };
        assert!(section.options().is_err());
    }

    #[test]
    fn test_job_paths() {
        let job = Job::new("logs/system-baseline");
        assert_eq!(job.input_path(), PathBuf::from("logs/system-baseline.log"));
        assert_eq!(
            job.output_path(None, ImageFormat::Png),
            PathBuf::from("logs/system-baseline.png")
        );
        assert_eq!(
            job.output_path(Some(Path::new("charts")), ImageFormat::Svg),
            PathBuf::from("charts/system-baseline.svg")
        );
        assert_eq!(job.title(), "baseline");
    }

    #[test]
    fn test_default_title() {
        assert_eq!(default_title(Path::new("system-neochain.log")), "neochain");
        assert_eq!(default_title(Path::new("a-b-c")), "b");
        assert_eq!(default_title(Path::new("baseline.log")), "baseline");
        assert_eq!(default_title(Path::new("system-.log")), "system-");
    }
}
