//! Convert command implementation.
//!
//! The convert command:
//! 1. Reads the upload from disk
//! 2. Builds upload metadata from the CLI arguments
//! 3. Parses the profile into records
//! 4. Writes records as JSON (file or stdout)

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};
use profile_convert::output::{records_to_string, write_records};
use profile_convert::utils::config::DEFAULT_WINDOW_SECS;
use profile_convert::{parse_profile, Format, LabelSet, Meta};
use std::path::PathBuf;
use std::time::Instant;

/// Arguments for the convert command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone)]
pub struct ConvertArgs {
    /// Wire format of the input
    pub format: Format,

    /// Profile file or captured multipart body
    pub input: PathBuf,

    /// Multipart content type (None = raw profile bytes)
    pub content_type: Option<String>,

    /// Source language of the profiler
    pub spy_name: String,

    /// Static tags recorded in the metadata
    pub tags: Vec<(String, String)>,

    /// Labels overriding per-stack labels in every record
    pub labels: Vec<(String, String)>,

    /// Sampling rate in Hz (0 = unknown)
    pub sample_rate: u32,

    /// Profiling window; defaults to the last few seconds
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,

    /// Output path for JSON records (None = stdout)
    pub output: Option<PathBuf>,
}

impl Default for ConvertArgs {
    fn default() -> Self {
        Self {
            format: Format::Pprof,
            input: PathBuf::new(),
            content_type: None,
            spy_name: "unknown".to_string(),
            tags: Vec::new(),
            labels: Vec::new(),
            sample_rate: 0,
            start: None,
            end: None,
            output: None,
        }
    }
}

/// Parse a `key=value` pair
///
/// **Public** - clap value parser for `--tag` and `--label`
pub fn parse_key_value(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", raw));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Validate convert arguments
///
/// **Public** - called before execution to fail fast
pub fn validate_args(args: &ConvertArgs) -> Result<()> {
    if args.input.as_os_str().is_empty() {
        bail!("Input path cannot be empty");
    }
    if !args.input.is_file() {
        bail!("Input file not found: {}", args.input.display());
    }
    if args.spy_name.trim().is_empty() {
        bail!("Spy name cannot be empty");
    }
    if let (Some(start), Some(end)) = (args.start, args.end) {
        if start > end {
            bail!("Start time {} is after end time {}", start, end);
        }
    }
    Ok(())
}

/// Build upload metadata from the arguments
pub fn build_meta(args: &ConvertArgs) -> Meta {
    let end_time = args.end.unwrap_or_else(Utc::now);
    let start_time = args
        .start
        .unwrap_or_else(|| end_time - Duration::seconds(DEFAULT_WINDOW_SECS));

    Meta {
        start_time,
        end_time,
        tags: args.tags.iter().cloned().collect(),
        spy_name: args.spy_name.clone(),
        sample_rate: args.sample_rate,
        ..Default::default()
    }
}

/// Execute the convert command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Input read failures
/// * Profile extraction or decoding errors
/// * File write errors
pub fn execute_convert(args: ConvertArgs) -> Result<()> {
    let started = Instant::now();

    info!(
        "Converting {} profile: {}",
        args.format,
        args.input.display()
    );

    let data = std::fs::read(&args.input)
        .with_context(|| format!("Failed to read input file {}", args.input.display()))?;
    debug!("Read {} bytes", data.len());

    let mut meta = build_meta(&args);
    let labels: LabelSet = args.labels.iter().cloned().collect();

    let records = parse_profile(
        args.format,
        data,
        args.content_type.as_deref(),
        &mut meta,
        &labels,
    )
    .with_context(|| format!("Failed to convert {}", args.input.display()))?;

    match &args.output {
        Some(path) => {
            write_records(&records, path).context("Failed to write records")?;
            info!("✓ {} records written to: {}", records.len(), path.display());
        }
        None => {
            println!("{}", records_to_string(&records).context("Failed to serialize records")?);
        }
    }

    info!("Conversion completed in {:.2}s", started.elapsed().as_secs_f64());
    Ok(())
}
