use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;
use crate::logging::Reporter;

/// Merge time-tracker CSV exports into the remote timesheet service.
#[derive(Parser, Debug)]
#[command(name = "tsmerge", version)]
struct Args {
    /// Suppress INFO output; warnings and errors still go to stderr.
    #[arg(long, global = true)]
    quiet: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Submit unseen source entries to the timesheet service
    Merge {
        /// Treat a source entry without a match table key as a fatal error
        #[arg(long)]
        strict: bool,
    },

    /// Delete previously submitted entries and drain the working ledger
    Rollback,

    /// Fold the working ledger into the archive ledger and reset it
    Archive,

    /// Write a JSON snapshot of source tasks, remote projects, and match suggestions
    Export,

    /// List distinct task labels found in the source directory
    Tasks,
}

pub fn run() -> Result<()> {
    let args = Args::parse();
    let reporter = Reporter::new(args.quiet);

    let report = match args.command {
        Command::Merge { strict } => {
            commands::merge::run(&reporter, &commands::merge::MergeOptions { strict })?
        }
        Command::Rollback => commands::rollback::run(&reporter)?,
        Command::Archive => commands::archive::run(&reporter)?,
        Command::Export => commands::export::run(&reporter)?,
        Command::Tasks => commands::tasks::run(&reporter)?,
    };

    for detail in &report.details {
        reporter.info(format!("{}: {detail}", report.command));
    }
    for issue in &report.issues {
        reporter.error(format!("{}: {issue}", report.command));
    }
    if !report.ok {
        anyhow::bail!("{} completed with issues", report.command);
    }
    Ok(())
}
