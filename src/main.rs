use anyhow::{Context, Result};
use clap::Parser;
use rdmreport::cli::{Cli, Task, ViewFormat};
use rdmreport::csv_output::CsvViewOutput;
use rdmreport::diff::{self, DiffFilter};
use rdmreport::error::ReportError;
use rdmreport::json_output;
use rdmreport::records::{self, Record, RecordPolicy};
use rdmreport::settings::Settings;
use rdmreport::view::{self, DayBoundary};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber; warnings always reach stderr, --debug adds the rest
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into())
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Print the diff report for one site and device filter
fn run_diff(
    settings: &Settings,
    records: &[Record],
    site: char,
    device_type: String,
) -> Result<()> {
    let our_id = settings.require_our_id()?;
    let filter = DiffFilter {
        site,
        device: device_type,
    };
    let report = diff::diff_report(records, &filter, our_id);
    print!("{}", json_output::format_diff(&report)?);
    Ok(())
}

/// Print or write the view report for one site
fn run_view(
    settings: &Settings,
    records: &[Record],
    site: char,
    format: ViewFormat,
    output: Option<PathBuf>,
    boundary: DayBoundary,
) -> Result<()> {
    if format == ViewFormat::Json && output.is_some() {
        return Err(ReportError::Usage("--output only applies to --format csv".to_string()).into());
    }

    let report = view::view_report(records, site, boundary, &settings.device_types);

    match format {
        ViewFormat::Json => print!("{}", json_output::format_view(&report)?),
        ViewFormat::Csv => {
            let path = output.unwrap_or_else(|| settings.output_dir.join(format!("view_{}.csv", site)));
            CsvViewOutput::new(&report)
                .write_to(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            tracing::info!(path = %path.display(), rows = report.rows.len(), "wrote view report");
            println!("{}", path.display());
        }
    }
    Ok(())
}

fn run(args: Cli) -> Result<()> {
    let settings = Settings::load(&args.settings)?;

    let policy = if args.strict {
        RecordPolicy::Strict
    } else {
        RecordPolicy::Skip
    };
    let boundary = if args.utc {
        DayBoundary::Utc
    } else {
        DayBoundary::Local
    };

    // Fail on a missing identity before touching the export
    if matches!(args.task, Task::Diff { .. }) {
        settings.require_our_id()?;
    }

    let loaded = records::load_records(&args.records, policy)?;
    if loaded.skipped > 0 {
        tracing::warn!(skipped = loaded.skipped, "some records were left out");
    }

    match args.task {
        Task::Diff { site, device_type } => run_diff(&settings, &loaded.records, site, device_type),
        Task::View {
            site,
            format,
            output,
        } => run_view(&settings, &loaded.records, site, format, output, boundary),
    }
}

fn main() {
    let args = Cli::parse();
    init_tracing(args.debug);

    if let Err(err) = run(args) {
        eprintln!("Error: {:#}", err);
        let code = err
            .downcast_ref::<ReportError>()
            .map_or(1, ReportError::exit_code);
        std::process::exit(code);
    }
}
