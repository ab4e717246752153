use anyhow::Result;

use crate::commands::CommandReport;
use crate::logging::Reporter;
use crate::merge::paths::resolve_paths;
use crate::merge::source;

/// List the distinct task labels found in the source directory, one per
/// line. Offline; useful when curating the match table.
pub fn run(reporter: &Reporter) -> Result<CommandReport> {
    let paths = resolve_paths();
    let mut report = CommandReport::new("tasks");

    let sources = source::load_dir(&paths.data_dir, reporter)?;
    let labels = sources.tasks();
    for label in &labels {
        println!("{label}");
    }
    report.detail(format!("tasks={}", labels.len()));
    Ok(report)
}
