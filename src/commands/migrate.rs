use crate::commands::CommandReport;
use crate::error::MigrateError;
use crate::migrate::config::MigrateConfig;
use crate::migrate::paths::MigrationRequest;
use crate::migrate::{self, MigrationOutcome};

pub fn report_for(req: &MigrationRequest, outcome: &MigrationOutcome) -> CommandReport {
    let mut report = CommandReport::new("migrate");
    report.detail(format!("source={}", req.source.display()));
    report.detail(format!("target={}", req.target.display()));
    report.detail(format!("global_namespace={}", req.global_namespace));
    report.detail(format!("entity_namespace={}", req.entity_namespace));
    report.detail(format!("global_relocated={}", outcome.global_relocated));
    report.detail(format!("global_skipped={}", outcome.global_skipped));
    report.detail(format!("entity_relocated={}", outcome.entity_relocated));
    report.detail(format!("pruned_subtrees={}", outcome.pruned_subtrees));
    report.detail(format!("generations={}", outcome.generations));
    report.detail(format!("filled={}", outcome.filled));
    report.detail(format!("bytes_copied={}", outcome.bytes_copied));
    report
}

pub fn run(req: &MigrationRequest, cfg: &MigrateConfig) -> Result<CommandReport, MigrateError> {
    let outcome = migrate::run(req, cfg)?;
    Ok(report_for(req, &outcome))
}
