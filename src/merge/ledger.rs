use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::MergeError;

/// Durable fingerprint → remote-entry-id record of what has been
/// submitted. Serialized as a bare JSON object and rewritten wholesale on
/// every persist.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct Ledger {
    entries: BTreeMap<String, String>,
}

impl Ledger {
    pub fn contains(&self, fingerprint: &str) -> bool {
        self.entries.contains_key(fingerprint)
    }

    pub fn insert(&mut self, fingerprint: String, remote_id: String) {
        self.entries.insert(fingerprint, remote_id);
    }

    pub fn remove(&mut self, fingerprint: &str) {
        self.entries.remove(fingerprint);
    }

    pub fn get(&self, fingerprint: &str) -> Option<&str> {
        self.entries.get(fingerprint).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.entries.iter()
    }

    /// Fold `other` into this ledger; entries from `other` win on key
    /// collision.
    pub fn absorb(&mut self, other: Ledger) {
        self.entries.extend(other.entries);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

pub fn save(path: &Path, ledger: &Ledger) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let data = serde_json::to_string_pretty(ledger)?;
    fs::write(path, format!("{data}\n"))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Load the working ledger. A missing file yields an empty ledger which is
/// immediately persisted, so the file always exists afterwards.
pub fn load_working(path: &Path) -> Result<Ledger> {
    if !path.exists() {
        let ledger = Ledger::default();
        save(path, &ledger)?;
        return Ok(ledger);
    }

    let raw =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let ledger: Ledger = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(ledger)
}

/// Load the archive ledger. Archive targets must be pre-provisioned; a
/// missing file is fatal.
pub fn load_archive(path: &Path) -> Result<Ledger, MergeError> {
    let raw = fs::read_to_string(path).map_err(|err| {
        MergeError::Config(format!("archive ledger {}: {err}", path.display()))
    })?;
    serde_json::from_str(&raw).map_err(|err| {
        MergeError::Config(format!("archive ledger {}: {err}", path.display()))
    })
}
