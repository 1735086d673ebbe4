use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use crate::commands::{self, CommandReport};
use crate::logging;
use crate::migrate::config::load_config;
use crate::migrate::paths::MigrationRequest;

const USAGE_GUIDANCE: &str = "Usage of migration tool : iron-migrate <SOURCE> <GLOBAL_NAMESPACE> <ENTITY_NAMESPACE> <TARGET>\n\tGLOBAL_NAMESPACE and ENTITY_NAMESPACE must match the store manager names configured in the application";

/// Migrate an iron snapshot directory to the transaction-keyed namespace layout
#[derive(Debug, Parser)]
#[command(name = "iron-migrate", version, about, long_about = None)]
struct Cli {
    /// Legacy iron directory to read snapshots from
    source: PathBuf,
    /// Store manager name receiving the global snapshots
    global_namespace: String,
    /// Store manager name receiving the per-store snapshots
    entity_namespace: String,
    /// Directory the new namespaces are created in
    target: PathBuf,
    /// Print the run report as JSON
    #[arg(long)]
    json: bool,
    /// Log every relocated and carried file
    #[arg(short, long)]
    verbose: bool,
}

fn render(report: &CommandReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    for line in &report.details {
        println!("  {line}");
    }
    Ok(())
}

pub fn run() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            if err.use_stderr() {
                eprintln!("{USAGE_GUIDANCE}");
            }
            err.exit();
        }
    };
    logging::init(cli.verbose);

    let req = MigrationRequest {
        source: cli.source,
        global_namespace: cli.global_namespace,
        entity_namespace: cli.entity_namespace,
        target: cli.target,
    };

    let result = load_config().and_then(|cfg| commands::migrate::run(&req, &cfg));
    match result {
        Ok(report) => {
            let done = format!(
                "Migration done from {} to {}",
                req.source.display(),
                req.target.display()
            );
            // stdout carries nothing but the report under --json.
            if cli.json {
                eprintln!("{done}");
            } else {
                println!("{done}");
            }
            render(&report, cli.json)
        }
        Err(err) => {
            eprintln!("{USAGE_GUIDANCE}");
            if cli.json {
                let mut report = CommandReport::new("migrate");
                report.issue(format!("{} {err}", err.kind().as_str()));
                render(&report, true)?;
            }
            Err(err).context("migration aborted")
        }
    }
}
