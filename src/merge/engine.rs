use std::path::PathBuf;

use anyhow::Result;
use chrono::NaiveDate;

use crate::error::MergeError;
use crate::logging::Reporter;
use crate::merge::fingerprint::fingerprint;
use crate::merge::keys::{BillingKey, match_key};
use crate::merge::ledger::{self, Ledger};
use crate::merge::matches;
use crate::merge::source::SourceEntry;

/// The normalized record about to be submitted. Built fresh per source
/// entry, never reused between submissions.
#[derive(Debug, Clone, PartialEq)]
pub struct BillingEntry {
    pub date: NaiveDate,
    pub duration_hours: f64,
    pub description: String,
    pub key: BillingKey,
}

/// Seam between the merge engine and the remote service. The engine only
/// needs submission and deletion; everything else the client offers is
/// operator tooling.
pub trait BillingApi {
    fn submit(&mut self, entry: &BillingEntry) -> Result<String, MergeError>;
    fn delete(&mut self, entry_id: &str) -> Result<(), MergeError>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOutcome {
    pub submitted: usize,
    pub duplicates: usize,
    pub unmatched: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RollbackOutcome {
    pub deleted: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ArchiveOutcome {
    pub moved: usize,
    pub archive_total: usize,
}

#[derive(Debug, Clone)]
pub struct EngineOptions {
    pub match_file: PathBuf,
    pub ledger_file: PathBuf,
    pub archive_file: PathBuf,
    pub strict_no_match: bool,
}

pub struct MergeEngine<'a> {
    reporter: &'a Reporter,
    options: EngineOptions,
    ledger: Ledger,
}

/// Remote description embedding folder, task, the entry's free text, and
/// the source uuid so the remote record is traceable back to its source.
fn compose_description(entry: &SourceEntry) -> String {
    if entry.folder.is_empty() {
        format!(
            "{} - {} - [ref.{}]",
            entry.task, entry.description, entry.uuid
        )
    } else {
        format!(
            "{} - {} - {} - [ref.{}]",
            entry.folder, entry.task, entry.description, entry.uuid
        )
    }
}

impl<'a> MergeEngine<'a> {
    /// Load the working ledger (creating and persisting it when absent).
    pub fn new(reporter: &'a Reporter, options: EngineOptions) -> Result<Self> {
        let ledger = ledger::load_working(&options.ledger_file)?;
        Ok(Self {
            reporter,
            options,
            ledger,
        })
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    fn persist(&self) -> Result<()> {
        ledger::save(&self.options.ledger_file, &self.ledger)
    }

    /// Submit every unseen matched entry, in canonical (ascending-date)
    /// order. The ledger is persisted after every processed entry, so an
    /// interrupted run resumes without re-submitting prior work. A remote
    /// rejection halts the run after persisting; re-running later picks up
    /// exactly where this run stopped.
    pub fn merge(
        &mut self,
        api: &mut dyn BillingApi,
        entries: &[SourceEntry],
    ) -> Result<MergeOutcome> {
        let table = matches::load(&self.options.match_file)?;
        self.reporter
            .info(format!("loaded {} match table entries", table.len()));

        let mut outcome = MergeOutcome::default();
        for entry in entries {
            let key = match_key(&entry.folder, &entry.task);
            let Some(raw_target) = table.lookup(&key) else {
                if self.options.strict_no_match {
                    self.persist()?;
                    return Err(MergeError::Config(format!(
                        "no match found for `{key}` (strict mode)"
                    ))
                    .into());
                }
                self.reporter.warn(format!("no match found for {key}"));
                outcome.unmatched += 1;
                self.persist()?;
                continue;
            };

            let target = BillingKey::parse(raw_target)?;
            let description = compose_description(entry);
            let digest = fingerprint(entry, &target, &description);

            if self.ledger.contains(&digest) {
                self.reporter.warn(format!("duplicate entry found for {key}"));
                outcome.duplicates += 1;
                self.persist()?;
                continue;
            }

            let billing = BillingEntry {
                date: entry.date,
                duration_hours: entry.duration_hours,
                description,
                key: target,
            };
            match api.submit(&billing) {
                Ok(remote_id) => {
                    self.reporter
                        .info(format!("saved entry {remote_id} for {key}"));
                    self.ledger.insert(digest, remote_id);
                    outcome.submitted += 1;
                    self.persist()?;
                }
                Err(err) => {
                    self.reporter.error(format!(
                        "unable to save entry for {key} ({}): {err}",
                        billing.description
                    ));
                    self.persist()?;
                    return Err(err.into());
                }
            }
        }
        Ok(outcome)
    }

    /// Delete every submitted entry the ledger claims exists, draining the
    /// ledger as it goes. Remote delete failures are logged and skipped;
    /// the fingerprint is removed either way because the user's intent is
    /// that the ledger no longer claims these submissions exist.
    pub fn rollback(&mut self, api: &mut dyn BillingApi) -> Result<RollbackOutcome> {
        let pending: Vec<(String, String)> = self
            .ledger
            .iter()
            .map(|(fp, id)| (fp.clone(), id.clone()))
            .collect();

        let mut outcome = RollbackOutcome::default();
        for (digest, entry_id) in pending {
            self.reporter.info(format!("deleting entry {entry_id}"));
            match api.delete(&entry_id) {
                Ok(()) => outcome.deleted += 1,
                Err(err) => {
                    self.reporter
                        .error(format!("unable to delete entry {entry_id}: {err}"));
                    outcome.failed += 1;
                }
            }
            self.ledger.remove(&digest);
            self.persist()?;
        }
        Ok(outcome)
    }

    /// Fold the working ledger into the pre-provisioned archive ledger
    /// (working entries win on collision), then reset the working ledger.
    /// One-way; there is no unarchive.
    pub fn archive(&mut self) -> Result<ArchiveOutcome> {
        let mut archive = ledger::load_archive(&self.options.archive_file)?;
        let moved = self.ledger.len();

        archive.absorb(self.ledger.clone());
        ledger::save(&self.options.archive_file, &archive)?;

        self.ledger.clear();
        self.persist()?;

        self.reporter.info(format!(
            "archived {moved} ledger entries into {}",
            self.options.archive_file.display()
        ));
        Ok(ArchiveOutcome {
            moved,
            archive_total: archive.len(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merge::ledger::load_working;
    use std::fs;
    use std::path::Path;

    #[derive(Default)]
    struct MockApi {
        submitted: Vec<BillingEntry>,
        deleted: Vec<String>,
        fail_submissions_after: Option<usize>,
        fail_deletes: bool,
        next_id: u32,
    }

    impl BillingApi for MockApi {
        fn submit(&mut self, entry: &BillingEntry) -> Result<String, MergeError> {
            if self.fail_submissions_after == Some(self.submitted.len()) {
                return Err(MergeError::Submission(crate::error::RemoteRejection {
                    status_code: 422,
                    reason: "Unprocessable Entity".to_string(),
                    message: "rejected".to_string(),
                    details: Vec::new(),
                }));
            }
            self.submitted.push(entry.clone());
            self.next_id += 1;
            Ok(format!("{}", 100 + self.next_id))
        }

        fn delete(&mut self, entry_id: &str) -> Result<(), MergeError> {
            if self.fail_deletes {
                return Err(MergeError::Deletion {
                    entry_id: entry_id.to_string(),
                    reason: "gone".to_string(),
                });
            }
            self.deleted.push(entry_id.to_string());
            Ok(())
        }
    }

    fn entry(uuid: &str, folder: &str, task: &str, date: &str, hours: f64) -> SourceEntry {
        SourceEntry {
            uuid: uuid.to_string(),
            date: date.parse().expect("date"),
            folder: folder.to_string(),
            task: task.to_string(),
            duration_hours: hours,
            description: "worked on things".to_string(),
        }
    }

    fn setup(dir: &Path, matches_json: &str) -> EngineOptions {
        let match_file = dir.join("matches.json");
        fs::write(&match_file, matches_json).expect("write matches");
        EngineOptions {
            match_file,
            ledger_file: dir.join("ledger.json"),
            archive_file: dir.join("archive.json"),
            strict_no_match: false,
        }
    }

    const REPORTER: Reporter = Reporter::new(true);

    #[test]
    fn matched_entry_is_submitted_and_recorded() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let options = setup(tmp.path(), r#"{"ProjA/Dev":"ORD1/SUB2/PH3"}"#);
        let mut engine = MergeEngine::new(&REPORTER, options.clone()).expect("engine");
        let mut api = MockApi::default();

        let outcome = engine
            .merge(&mut api, &[entry("100200", "ProjA", "Dev", "2024-01-05", 2.5)])
            .expect("merge");

        assert_eq!(outcome.submitted, 1);
        assert_eq!(api.submitted.len(), 1);
        let sent = &api.submitted[0];
        assert_eq!(sent.key.to_string(), "ORD1/SUB2/PH3");
        assert!(sent.description.contains("ProjA - Dev"));
        assert!(sent.description.contains("100200"));
        assert_eq!(engine.ledger().len(), 1);

        // the persisted ledger maps the fingerprint to the remote id
        let persisted = load_working(&options.ledger_file).expect("reload");
        assert_eq!(persisted.iter().next().map(|(_, id)| id.as_str()), Some("101"));
    }

    #[test]
    fn second_run_is_an_idempotent_no_op() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let options = setup(tmp.path(), r#"{"ProjA/Dev":"ORD1/SUB2/PH3"}"#);
        let entries = [entry("100200", "ProjA", "Dev", "2024-01-05", 2.5)];

        let mut api = MockApi::default();
        let mut engine = MergeEngine::new(&REPORTER, options.clone()).expect("engine");
        engine.merge(&mut api, &entries).expect("first merge");

        // fresh engine against the persisted ledger, as a new process would
        let mut engine = MergeEngine::new(&REPORTER, options).expect("engine");
        let outcome = engine.merge(&mut api, &entries).expect("second merge");

        assert_eq!(outcome.submitted, 0);
        assert_eq!(outcome.duplicates, 1);
        assert_eq!(api.submitted.len(), 1);
    }

    #[test]
    fn unmatched_entry_is_skipped_without_remote_call() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let options = setup(tmp.path(), r#"{"ProjA/Dev":"ORD1/SUB2/PH3"}"#);
        let mut engine = MergeEngine::new(&REPORTER, options).expect("engine");
        let mut api = MockApi::default();

        let outcome = engine
            .merge(&mut api, &[entry("555666", "", "Admin", "2024-01-06", 0.5)])
            .expect("merge");

        assert_eq!(outcome.unmatched, 1);
        assert_eq!(outcome.submitted, 0);
        assert!(api.submitted.is_empty());
        assert!(engine.ledger().is_empty());
    }

    #[test]
    fn strict_mode_turns_no_match_into_an_error() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let mut options = setup(tmp.path(), r#"{"ProjA/Dev":"ORD1/SUB2/PH3"}"#);
        options.strict_no_match = true;
        let mut engine = MergeEngine::new(&REPORTER, options).expect("engine");
        let mut api = MockApi::default();

        let err = engine
            .merge(&mut api, &[entry("555666", "", "Admin", "2024-01-06", 0.5)])
            .expect_err("must fail");
        assert!(err.to_string().contains("Admin"));
        assert!(api.submitted.is_empty());
    }

    #[test]
    fn submission_failure_halts_the_run_but_keeps_prior_progress() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let options = setup(
            tmp.path(),
            r#"{"ProjA/Dev":"ORD1/SUB2/PH3","ProjB/Ops":"ORD2/SUB1/PH1"}"#,
        );
        let mut engine = MergeEngine::new(&REPORTER, options.clone()).expect("engine");
        let mut api = MockApi {
            fail_submissions_after: Some(1),
            ..MockApi::default()
        };

        let entries = [
            entry("1a", "ProjA", "Dev", "2024-01-05", 2.5),
            entry("2b", "ProjB", "Ops", "2024-01-06", 1.0),
            entry("3c", "ProjA", "Dev", "2024-01-07", 4.0),
        ];
        let err = engine.merge(&mut api, &entries).expect_err("must halt");
        assert!(err.to_string().contains("rejected"));

        // first entry submitted and persisted, third never attempted
        assert_eq!(api.submitted.len(), 1);
        let persisted = load_working(&options.ledger_file).expect("reload");
        assert_eq!(persisted.len(), 1);
    }

    #[test]
    fn rollback_drains_the_ledger_despite_delete_failures() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let options = setup(tmp.path(), r#"{"ProjA/Dev":"ORD1/SUB2/PH3"}"#);
        let entries = [
            entry("1a", "ProjA", "Dev", "2024-01-05", 2.5),
            entry("2b", "ProjA", "Dev", "2024-01-06", 1.0),
        ];
        let mut api = MockApi::default();
        let mut engine = MergeEngine::new(&REPORTER, options.clone()).expect("engine");
        engine.merge(&mut api, &entries).expect("merge");
        assert_eq!(engine.ledger().len(), 2);

        api.fail_deletes = true;
        let outcome = engine.rollback(&mut api).expect("rollback");
        assert_eq!(outcome.failed, 2);
        assert_eq!(outcome.deleted, 0);
        assert!(engine.ledger().is_empty());

        let persisted = load_working(&options.ledger_file).expect("reload");
        assert!(persisted.is_empty());
    }

    #[test]
    fn rollback_issues_one_delete_per_ledger_entry() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let options = setup(tmp.path(), r#"{"ProjA/Dev":"ORD1/SUB2/PH3"}"#);
        let entries = [
            entry("1a", "ProjA", "Dev", "2024-01-05", 2.5),
            entry("2b", "ProjA", "Dev", "2024-01-06", 1.0),
            entry("3c", "ProjA", "Dev", "2024-01-07", 3.0),
        ];
        let mut api = MockApi::default();
        let mut engine = MergeEngine::new(&REPORTER, options).expect("engine");
        engine.merge(&mut api, &entries).expect("merge");

        let outcome = engine.rollback(&mut api).expect("rollback");
        assert_eq!(outcome.deleted, 3);
        assert_eq!(api.deleted.len(), 3);
        assert!(engine.ledger().is_empty());
    }

    #[test]
    fn archive_is_a_lossless_transfer() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let options = setup(tmp.path(), r#"{"ProjA/Dev":"ORD1/SUB2/PH3"}"#);
        fs::write(&options.archive_file, r#"{"old-fp":"7"}"#).expect("seed archive");

        let mut api = MockApi::default();
        let mut engine = MergeEngine::new(&REPORTER, options.clone()).expect("engine");
        engine
            .merge(&mut api, &[entry("1a", "ProjA", "Dev", "2024-01-05", 2.5)])
            .expect("merge");

        let outcome = engine.archive().expect("archive");
        assert_eq!(outcome.moved, 1);
        assert_eq!(outcome.archive_total, 2);

        let archive = ledger::load_archive(&options.archive_file).expect("archive");
        assert_eq!(archive.len(), 2);
        assert_eq!(archive.get("old-fp"), Some("7"));
        let working = load_working(&options.ledger_file).expect("working");
        assert!(working.is_empty());
    }

    #[test]
    fn archive_requires_a_preprovisioned_target() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let options = setup(tmp.path(), r#"{"ProjA/Dev":"ORD1/SUB2/PH3"}"#);
        let mut engine = MergeEngine::new(&REPORTER, options).expect("engine");
        assert!(engine.archive().is_err());
    }

    #[test]
    fn description_omits_separator_for_empty_folder() {
        let description = compose_description(&entry("9z", "", "Admin", "2024-01-05", 1.0));
        assert!(description.starts_with("Admin - "));
        assert!(description.ends_with("[ref.9z]"));
    }
}
