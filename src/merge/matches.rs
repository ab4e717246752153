use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::MergeError;

/// Operator-curated mapping from a source task label (`folder/task`) to a
/// billing key string. Loaded once per run, read-only during merge. A
/// missing key for an entry is not an error; a missing or unparsable file
/// is.
#[derive(Debug, Clone, Default)]
pub struct MatchTable {
    map: BTreeMap<String, String>,
}

impl MatchTable {
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.map.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

pub fn load(path: &Path) -> Result<MatchTable, MergeError> {
    let raw = fs::read_to_string(path).map_err(|err| {
        MergeError::Config(format!("match file {}: {err}", path.display()))
    })?;
    let map: BTreeMap<String, String> = serde_json::from_str(&raw).map_err(|err| {
        MergeError::Config(format!("match file {}: {err}", path.display()))
    })?;
    Ok(MatchTable { map })
}
