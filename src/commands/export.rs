use std::collections::BTreeMap;
use std::fs;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::commands::CommandReport;
use crate::logging::Reporter;
use crate::merge::config::load_config;
use crate::merge::paths::resolve_paths;
use crate::merge::source;
use crate::timesheet::client::{Project, TimesheetClient, suggested_matches};

/// Operator-facing snapshot used to hand-build the match configuration
/// document: local task labels, the remote project tree, and suggested
/// match-key → billing-key rows.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExportSnapshot {
    source_tasks: Vec<String>,
    projects: Vec<Project>,
    suggested_matches: BTreeMap<String, String>,
}

pub fn run(reporter: &Reporter) -> Result<CommandReport> {
    let paths = resolve_paths();
    let config = load_config()?;
    let mut report = CommandReport::new("export");

    let sources = source::load_dir(&paths.data_dir, reporter)?;
    let mut client = TimesheetClient::new(reporter, &config)?;
    let projects = client.projects()?;

    let snapshot = ExportSnapshot {
        source_tasks: sources.tasks(),
        suggested_matches: suggested_matches(&projects),
        projects,
    };

    if let Some(parent) = paths.export_file.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let data = serde_json::to_string_pretty(&snapshot)?;
    fs::write(&paths.export_file, format!("{data}\n"))
        .with_context(|| format!("failed to write {}", paths.export_file.display()))?;

    if snapshot.projects.is_empty() {
        report.issue("remote project tree is empty; nothing to suggest matches from");
    }
    report.detail(format!("source_tasks={}", snapshot.source_tasks.len()));
    report.detail(format!("projects={}", snapshot.projects.len()));
    report.detail(format!(
        "suggested_matches={}",
        snapshot.suggested_matches.len()
    ));
    report.detail(format!("export_file={}", paths.export_file.display()));
    Ok(report)
}
