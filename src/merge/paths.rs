use std::env;
use std::path::PathBuf;

/// File layout of one merge workspace. Defaults mirror the conventional
/// project checkout: sources under `./data`, operator-curated match table
/// under `./config`, ledgers and exports under `./export`.
#[derive(Debug, Clone)]
pub struct MergePaths {
    pub data_dir: PathBuf,
    pub match_file: PathBuf,
    pub ledger_file: PathBuf,
    pub archive_file: PathBuf,
    pub export_file: PathBuf,
}

fn env_or_default_path(var: &str, fallback: PathBuf) -> PathBuf {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => PathBuf::from(v.trim()),
        _ => fallback,
    }
}

pub fn resolve_paths() -> MergePaths {
    let data_dir = env_or_default_path("TSMERGE_DATA_DIR", PathBuf::from("data"));
    let match_file =
        env_or_default_path("TSMERGE_MATCH_FILE", PathBuf::from("config/matches.json"));
    let ledger_file =
        env_or_default_path("TSMERGE_LEDGER_FILE", PathBuf::from("export/ledger.json"));
    let archive_file = env_or_default_path(
        "TSMERGE_ARCHIVE_FILE",
        PathBuf::from("export/archive.json"),
    );
    let export_file =
        env_or_default_path("TSMERGE_EXPORT_FILE", PathBuf::from("export/export.json"));

    MergePaths {
        data_dir,
        match_file,
        ledger_file,
        archive_file,
        export_file,
    }
}
