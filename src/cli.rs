//! CLI argument parsing for rdmreport

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Output format for the view report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ViewFormat {
    /// CSV matrix written to a file (default)
    Csv,
    /// JSON object printed to stdout
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "rdmreport")]
#[command(version)]
#[command(about = "Upload coverage reports from a saved research-data portal export", long_about = None)]
pub struct Cli {
    /// Saved portal export (bare array or data.getStudy.files document)
    #[arg(long, value_name = "PATH", default_value = "all_records.json", global = true)]
    pub records: PathBuf,

    /// Settings file naming our uploader identity
    #[arg(long, value_name = "PATH", default_value = "settings.json", global = true)]
    pub settings: PathBuf,

    /// Fail on the first record with a malformed description instead of skipping it
    #[arg(long, global = true)]
    pub strict: bool,

    /// Cut recording windows into days in UTC instead of local time
    #[arg(long, global = true)]
    pub utc: bool,

    /// Log progress to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub task: Task,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Task {
    /// First and last recorded day plus device count per participant and device type
    View {
        /// Study site letter (participant id prefix)
        #[arg(value_parser = parse_site)]
        site: char,

        /// Report format
        #[arg(long, value_enum, default_value = "csv")]
        format: ViewFormat,

        /// CSV destination (default: <output_dir>/view_<SITE>.csv)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
    /// Devices uploaded only by us or only by others, per participant
    Diff {
        /// Study site letter (participant id prefix)
        #[arg(value_parser = parse_site)]
        site: char,

        /// Substring a device id must contain (e.g. BTF)
        #[arg(value_parser = parse_device_type)]
        device_type: String,
    },
}

/// Study sites are a single letter; accepted in either case
fn parse_site(s: &str) -> Result<char, String> {
    let mut chars = s.trim().chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_alphanumeric() => Ok(c.to_ascii_uppercase()),
        _ => Err(format!("study site must be a single character, got '{}'", s)),
    }
}

fn parse_device_type(s: &str) -> Result<String, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("device type must not be empty".to_string());
    }
    Ok(s.to_uppercase())
}
