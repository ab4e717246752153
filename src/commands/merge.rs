use anyhow::Result;

use crate::commands::CommandReport;
use crate::logging::Reporter;
use crate::merge::config::load_config;
use crate::merge::engine::{EngineOptions, MergeEngine};
use crate::merge::paths::resolve_paths;
use crate::merge::source;
use crate::timesheet::client::TimesheetClient;

#[derive(Debug, Clone, Copy)]
pub struct MergeOptions {
    pub strict: bool,
}

pub fn run(reporter: &Reporter, opts: &MergeOptions) -> Result<CommandReport> {
    let paths = resolve_paths();
    let config = load_config()?;
    let mut report = CommandReport::new("merge");

    let sources = source::load_dir(&paths.data_dir, reporter)?;
    report.detail(format!("source_entries={}", sources.len()));

    let mut client = TimesheetClient::new(reporter, &config)?;
    let mut engine = MergeEngine::new(
        reporter,
        EngineOptions {
            match_file: paths.match_file,
            ledger_file: paths.ledger_file,
            archive_file: paths.archive_file,
            strict_no_match: opts.strict || config.merge.strict_no_match,
        },
    )?;

    let outcome = engine.merge(&mut client, sources.entries())?;
    report.detail(format!(
        "submitted={} duplicates={} unmatched={}",
        outcome.submitted, outcome.duplicates, outcome.unmatched
    ));
    report.detail(format!("ledger_entries={}", engine.ledger().len()));
    Ok(report)
}
