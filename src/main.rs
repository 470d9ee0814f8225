use anyhow::Result;
use clap::Parser;
use dumpship::config::{AppConfig, Region};
use dumpship::core::identity::{UNKNOWN_UUID, resolve_system_uuid};
use dumpship::core::{
    HttpTransport, Orchestrator, PipelineError, RunReport, StatvfsCapacity, TransferMode,
};
use dumpship::logging;
use serde::Serialize;
use std::path::PathBuf;
use std::process::ExitCode;

/// Split a diagnostic dump into parts, fingerprint everything and upload
/// it to vendor support.
#[derive(Parser)]
#[command(name = "dumpship")]
#[command(about = "Diagnostic dump upload tool", long_about = None)]
struct Cli {
    /// Upload to the Americas endpoint
    #[arg(short = 'A', conflicts_with = "emea")]
    americas: bool,

    /// Upload to the EMEA endpoint
    #[arg(short = 'E')]
    emea: bool,

    /// Re-upload only these parts (comma separated), skipping the split
    #[arg(short = 'm', value_name = "PARTS", value_delimiter = ',')]
    missing: Option<Vec<String>>,

    /// Dry run: split and fingerprint locally, upload nothing
    #[arg(short = 'n')]
    dry_run: bool,

    /// Maximum part size (e.g. 512m, 1g, or bare bytes)
    #[arg(short = 's', value_name = "SIZE")]
    chunk_size: Option<String>,

    /// Appliance system UUID (auto-detected when omitted)
    #[arg(short = 'u', value_name = "UUID")]
    system_uuid: Option<String>,

    /// Support case identifier (mandatory)
    #[arg(short = 'c', value_name = "CASE")]
    case: Option<String>,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json: bool,

    /// The dump file to split and upload (required unless -m is given)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,
}

/// CLI settings layered on top of file and environment configuration.
/// Absent flags serialize to nothing so they never mask lower layers.
#[derive(Serialize)]
struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    region: Option<Region>,

    #[serde(skip_serializing_if = "Option::is_none")]
    chunk_size: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    verbose: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    json_logs: Option<bool>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let overrides = CliOverrides {
        region: if cli.emea {
            Some(Region::Emea)
        } else if cli.americas {
            Some(Region::Americas)
        } else {
            None
        },
        chunk_size: cli.chunk_size.clone(),
        verbose: cli.verbose.then_some(true),
        json_logs: cli.json.then_some(true),
    };

    let config = match AppConfig::new(Some(&overrides)) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    logging::init(logging::LogConfig {
        json: config.json_logs,
        verbose: config.verbose,
    });

    match run(cli, config).await {
        Ok(report) if report.failures.is_empty() => {
            print_report(&report);
            ExitCode::SUCCESS
        }
        Ok(report) => {
            print_report(&report);
            let summary = PipelineError::UploadsFailed {
                failed: report.failures.len(),
                attempted: report.transfer.len(),
            };
            eprintln!("Error: {summary}");
            for failure in &report.failures {
                eprintln!("  - {} -> {}: {}", failure.name, failure.destination, failure.error);
            }
            eprintln!("Retry the failed parts with: dumpship -m <parts> -c <case>");
            ExitCode::FAILURE
        }
        Err(e) => {
            // Insufficient space is a safe abort: nothing was written,
            // the operator just needs a bigger volume.
            let safe_abort = e
                .downcast_ref::<PipelineError>()
                .is_some_and(PipelineError::is_safe_abort);
            eprintln!("{}{e:#}", if safe_abort { "" } else { "Error: " });
            if safe_abort {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

async fn run(cli: Cli, config: AppConfig) -> Result<RunReport> {
    let case_id = cli.case.clone().ok_or(PipelineError::MissingCase)?;

    let mode = if let Some(names) = cli.missing.clone() {
        TransferMode::Selective(names)
    } else if cli.dry_run {
        TransferMode::DryRun
    } else {
        TransferMode::Full
    };

    // Dry runs upload nothing, so an undetectable identity is tolerated
    // there; upload modes refuse to guess.
    let resolved = resolve_system_uuid(cli.system_uuid.as_deref(), &config.appliance_conf);
    let system_uuid = match (&mode, resolved) {
        (_, Some(uuid)) => uuid,
        (TransferMode::DryRun, None) => UNKNOWN_UUID.to_string(),
        (_, None) => return Err(PipelineError::MissingSystemUuid.into()),
    };

    let transport = Box::new(HttpTransport::new(config.base_url()));
    let orchestrator = Orchestrator::new(
        config,
        case_id,
        system_uuid,
        transport,
        Box::new(StatvfsCapacity),
    );
    orchestrator.run(mode, cli.file.as_deref()).await
}

fn print_report(report: &RunReport) {
    if report.transfer.is_empty() && !report.produced.is_empty() {
        println!("No upload performed. Transfer these artifacts manually:");
        for name in &report.produced {
            println!("  {name}");
        }
        return;
    }

    println!(
        "Uploaded {} of {} artifact(s).",
        report.uploaded,
        report.transfer.len()
    );
}
