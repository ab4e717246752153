use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;

use crate::error::MergeError;
use crate::logging::Reporter;
use crate::merge::keys::match_key;

/// Fixed column order of the time-tracker CSV export. Files carry one
/// header row which is skipped; every data row must have exactly this many
/// columns.
const COLUMNS: [&str; 15] = [
    "unix_begin",
    "unix_end",
    "date",
    "begin",
    "end",
    "folder",
    "task",
    "duration",
    "duration_decimal",
    "rounding_to",
    "rounding_method",
    "hourly_rate",
    "revenue",
    "billing_status",
    "notes",
];

const COL_UNIX_BEGIN: usize = 0;
const COL_UNIX_END: usize = 1;
const COL_DATE: usize = 2;
const COL_FOLDER: usize = 5;
const COL_TASK: usize = 6;
const COL_DURATION_DECIMAL: usize = 8;
const COL_NOTES: usize = 14;

/// One recorded time-tracking interval, immutable after parsing.
///
/// `uuid` is derived from the interval's begin/end unix timestamps, so the
/// same raw record always reproduces the same identifier.
#[derive(Debug, Clone)]
pub struct SourceEntry {
    pub uuid: String,
    pub date: NaiveDate,
    pub folder: String,
    pub task: String,
    pub duration_hours: f64,
    pub description: String,
}

/// The deduplicated source set, sorted ascending by date. This order is the
/// canonical read order for the merge loop.
#[derive(Debug, Clone, Default)]
pub struct SourceEntries {
    entries: Vec<SourceEntry>,
}

impl SourceEntries {
    pub fn entries(&self) -> &[SourceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct task labels (`folder/task`, or bare task) for operator
    /// listing, in sorted order.
    pub fn tasks(&self) -> Vec<String> {
        let labels: BTreeSet<String> = self
            .entries
            .iter()
            .map(|entry| match_key(&entry.folder, &entry.task))
            .collect();
        labels.into_iter().collect()
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d.%m.%Y"))
        .ok()
}

// the exporter writes decimals with a locale-dependent separator
fn parse_decimal(raw: &str) -> Option<f64> {
    raw.parse::<f64>()
        .or_else(|_| raw.replace(',', ".").parse::<f64>())
        .ok()
}

fn entry_from_record(record: &csv::StringRecord) -> Result<SourceEntry, String> {
    if record.len() != COLUMNS.len() {
        return Err(format!(
            "expected {} columns, found {}",
            COLUMNS.len(),
            record.len()
        ));
    }

    let field = |idx: usize| record.get(idx).unwrap_or_default().trim();

    let unix_begin = field(COL_UNIX_BEGIN);
    let unix_end = field(COL_UNIX_END);
    if unix_begin.is_empty() || unix_end.is_empty() {
        return Err("missing begin/end timestamps".to_string());
    }

    let raw_date = field(COL_DATE);
    let date =
        parse_date(raw_date).ok_or_else(|| format!("unparsable date `{raw_date}`"))?;

    let raw_duration = field(COL_DURATION_DECIMAL);
    let duration_hours = parse_decimal(raw_duration)
        .ok_or_else(|| format!("unparsable decimal duration `{raw_duration}`"))?;

    Ok(SourceEntry {
        uuid: format!("{unix_begin}{unix_end}"),
        date,
        folder: field(COL_FOLDER).to_string(),
        task: field(COL_TASK).to_string(),
        duration_hours,
        description: field(COL_NOTES).to_string(),
    })
}

fn parse_file(path: &Path) -> Result<Vec<SourceEntry>, MergeError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_path(path)
        .map_err(|err| MergeError::Parse(format!("{}: {err}", path.display())))?;

    let mut entries = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record
            .map_err(|err| MergeError::Parse(format!("{}: {err}", path.display())))?;
        let entry = entry_from_record(&record).map_err(|reason| {
            MergeError::Parse(format!("{} row {}: {reason}", path.display(), idx + 2))
        })?;
        entries.push(entry);
    }
    Ok(entries)
}

fn dedupe_and_sort(raw: Vec<SourceEntry>) -> Vec<SourceEntry> {
    let mut seen: BTreeSet<String> = BTreeSet::new();
    let mut entries: Vec<SourceEntry> = Vec::with_capacity(raw.len());
    for entry in raw {
        if seen.insert(entry.uuid.clone()) {
            entries.push(entry);
        }
    }
    // stable: equal dates keep file order
    entries.sort_by_key(|entry| entry.date);
    entries
}

/// Read every `.csv` file in `dir` (non-recursively), deduplicate by uuid
/// (first occurrence wins), and sort ascending by date. Any file that fails
/// the schema aborts the whole read.
pub fn load_dir(dir: &Path, reporter: &Reporter) -> Result<SourceEntries, MergeError> {
    if !dir.is_dir() {
        return Err(MergeError::Config(format!(
            "source directory does not exist: {}",
            dir.display()
        )));
    }

    let read_dir = fs::read_dir(dir)
        .map_err(|err| MergeError::Config(format!("{}: {err}", dir.display())))?;

    let mut raw = Vec::new();
    for dir_entry in read_dir {
        let dir_entry =
            dir_entry.map_err(|err| MergeError::Config(format!("{}: {err}", dir.display())))?;
        let path = dir_entry.path();
        if !path.is_file() || path.extension().and_then(|ext| ext.to_str()) != Some("csv") {
            continue;
        }
        reporter.info(format!("processing file: {}", path.display()));
        raw.extend(parse_file(&path)?);
    }

    let entries = dedupe_and_sort(raw);
    reporter.info(format!("found {} unique entries", entries.len()));
    Ok(SourceEntries { entries })
}
