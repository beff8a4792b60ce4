//! Run Exporter - write experiment document streams to TIFF files.
//!
//! This binary replays a recorded document stream into the serializer
//! and reports the artifacts written.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use run_exporter::{export, Artifacts, Config, DocumentKind};

fn main() -> ExitCode {
    let config = Config::parse();

    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    info!("Configuration:");
    info!("  Input: {}", config.input.display());
    info!("  Output directory: {}", config.output.display());
    info!("  File prefix: {}", config.file_prefix);
    info!("  Layout: {}", config.layout);
    info!("  Dtype: {}", config.dtype);
    if config.bigtiff {
        info!("  Container: BigTIFF");
    }

    match run_export(&config) {
        Ok(artifacts) => {
            print_summary(&artifacts);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Export failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Read the document stream and drive the export.
fn run_export(config: &Config) -> Result<Artifacts, Box<dyn std::error::Error>> {
    let file = File::open(&config.input)
        .map_err(|e| format!("cannot open {}: {e}", config.input.display()))?;
    let reader = BufReader::new(file);

    let mut documents = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let (kind, doc): (String, serde_json::Value) = serde_json::from_str(&line)
            .map_err(|e| format!("line {}: not a [kind, document] pair: {e}", index + 1))?;
        let kind: DocumentKind = kind
            .parse()
            .map_err(|e| format!("line {}: {e}", index + 1))?;
        documents.push((kind, doc));
    }

    info!("Read {} document(s)", documents.len());
    Ok(export(documents, &config.output, config.serializer_options())?)
}

/// Print the artifacts written, grouped by label.
fn print_summary(artifacts: &Artifacts) {
    info!("Export complete:");
    for (label, paths) in artifacts {
        info!("  {}: {} artifact(s)", label, paths.len());
        for path in paths {
            info!("    {}", path.display());
        }
    }
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "run_exporter=debug"
    } else {
        "run_exporter=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
