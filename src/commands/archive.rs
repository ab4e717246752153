use anyhow::Result;

use crate::commands::CommandReport;
use crate::logging::Reporter;
use crate::merge::engine::{EngineOptions, MergeEngine};
use crate::merge::paths::resolve_paths;

pub fn run(reporter: &Reporter) -> Result<CommandReport> {
    let paths = resolve_paths();
    let mut report = CommandReport::new("archive");

    let mut engine = MergeEngine::new(
        reporter,
        EngineOptions {
            match_file: paths.match_file,
            ledger_file: paths.ledger_file,
            archive_file: paths.archive_file,
            strict_no_match: false,
        },
    )?;

    let outcome = engine.archive()?;
    report.detail(format!(
        "moved={} archive_total={}",
        outcome.moved, outcome.archive_total
    ));
    Ok(report)
}
