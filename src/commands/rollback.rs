use anyhow::Result;

use crate::commands::CommandReport;
use crate::logging::Reporter;
use crate::merge::config::load_config;
use crate::merge::engine::{EngineOptions, MergeEngine};
use crate::merge::paths::resolve_paths;
use crate::timesheet::client::TimesheetClient;

pub fn run(reporter: &Reporter) -> Result<CommandReport> {
    let paths = resolve_paths();
    let config = load_config()?;
    let mut report = CommandReport::new("rollback");

    let mut client = TimesheetClient::new(reporter, &config)?;
    let mut engine = MergeEngine::new(
        reporter,
        EngineOptions {
            match_file: paths.match_file,
            ledger_file: paths.ledger_file,
            archive_file: paths.archive_file,
            strict_no_match: config.merge.strict_no_match,
        },
    )?;

    let before = engine.ledger().len();
    let outcome = engine.rollback(&mut client)?;
    report.detail(format!("ledger_entries_before={before}"));
    // delete failures are warnings by design; the ledger is drained either way
    report.detail(format!(
        "deleted={} delete_failures={}",
        outcome.deleted, outcome.failed
    ));
    Ok(report)
}
