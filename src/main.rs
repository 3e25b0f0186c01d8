//! Profile Convert CLI
//!
//! Converts pprof and JFR profiler uploads into per-stack sample records
//! written as JSON.

use anyhow::Result;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use env_logger::Env;
use profile_convert::Format;
use std::path::PathBuf;

mod commands;

use commands::{
    display_version, execute_convert, parse_key_value, validate_args, validate_records_file,
    ConvertArgs,
};

/// Profile Convert - normalize profiler uploads into sample records
#[derive(Parser, Debug)]
#[command(name = "profile-convert")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a profile into records
    Convert {
        /// Wire format of the input
        #[arg(short, long, value_enum)]
        format: Format,

        /// Profile file, or a captured multipart body with --content-type
        #[arg(short, long)]
        input: PathBuf,

        /// Multipart content type including the boundary
        #[arg(long, env = "PROFILE_CONTENT_TYPE")]
        content_type: Option<String>,

        /// Source language of the profiler (go, java, py, ...)
        #[arg(long, default_value = "unknown")]
        spy_name: String,

        /// Static tag recorded in the metadata (repeatable)
        #[arg(long = "tag", value_parser = parse_key_value)]
        tags: Vec<(String, String)>,

        /// Label overriding per-stack labels (repeatable)
        #[arg(long = "label", value_parser = parse_key_value)]
        labels: Vec<(String, String)>,

        /// Sampling rate in Hz
        #[arg(long, default_value = "0")]
        sample_rate: u32,

        /// Window start (RFC 3339)
        #[arg(long)]
        start: Option<DateTime<Utc>>,

        /// Window end (RFC 3339), defaults to now
        #[arg(long)]
        end: Option<DateTime<Utc>>,

        /// Output path for JSON records (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a records JSON file
    Validate {
        /// Path to records JSON file
        #[arg(short, long)]
        file: PathBuf,
    },

    /// Display version information
    Version,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(log_level)).init();

    match cli.command {
        Commands::Convert {
            format,
            input,
            content_type,
            spy_name,
            tags,
            labels,
            sample_rate,
            start,
            end,
            output,
        } => {
            let args = ConvertArgs {
                format,
                input,
                content_type,
                spy_name,
                tags,
                labels,
                sample_rate,
                start,
                end,
                output,
            };

            validate_args(&args)?;
            execute_convert(args)?;
        }

        Commands::Validate { file } => {
            validate_records_file(&file)?;
        }

        Commands::Version => {
            display_version();
        }
    }

    Ok(())
}
