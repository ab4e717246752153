use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::error::MergeError;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RemoteConfig {
    /// Base URL of the timesheet service, e.g. `https://timesheets.example.com`.
    pub base_url: String,
    /// Company code used in the login path and the submission payload.
    pub company: String,
}

/// Per-submission constants the remote service requires beyond what a
/// source entry carries. A fresh payload is built from these on every
/// submission; they are never mutated in place.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionConfig {
    pub user_id: String,
    pub status: String,
    pub site_id: String,
    pub trip_hours: f64,
    /// Default line item, overridden by a 4-component billing key.
    pub line_item_id: String,
    pub cost_center: String,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            user_id: String::new(),
            status: "DRAFT".to_string(),
            site_id: String::new(),
            trip_hours: 0.0,
            line_item_id: String::new(),
            cost_center: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MergeBehavior {
    /// When true, a source entry without a match table key aborts the run
    /// instead of being skipped with a warning.
    pub strict_no_match: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MergeConfig {
    pub remote: RemoteConfig,
    pub submission: SubmissionConfig,
    pub merge: MergeBehavior,
}

#[derive(Debug, Clone, Deserialize, Default)]
struct PartialMergeConfig {
    remote: Option<RemoteConfig>,
    submission: Option<SubmissionConfig>,
    merge: Option<MergeBehavior>,
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

fn env_or_string(var: &str, fallback: &str) -> String {
    match env::var(var) {
        Ok(v) if !v.trim().is_empty() => v.trim().to_string(),
        _ => fallback.to_string(),
    }
}

fn env_or_bool(var: &str, fallback: bool) -> bool {
    match env::var(var) {
        Ok(v) => match v.trim() {
            "1" | "true" | "TRUE" | "yes" | "on" => true,
            "0" | "false" | "FALSE" | "no" | "off" => false,
            _ => fallback,
        },
        Err(_) => fallback,
    }
}

fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(custom) = env::var("TSMERGE_CONFIG_PATH") {
        let trimmed = custom.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }

    let local = PathBuf::from("tsmerge.toml");
    if local.exists() {
        return Some(local);
    }

    let home = dirs::home_dir()?;
    Some(home.join(".tsmerge").join("config.toml"))
}

fn merge_file_config(base: &mut MergeConfig) -> Result<()> {
    let Some(path) = resolve_config_path() else {
        return Ok(());
    };
    if !path.exists() {
        return Ok(());
    }

    let raw = fs::read_to_string(&path)?;
    let parsed: PartialMergeConfig = toml::from_str(&raw)
        .map_err(|err| anyhow!("failed to parse config {}: {err}", path.display()))?;
    if let Some(remote) = parsed.remote {
        base.remote = remote;
    }
    if let Some(submission) = parsed.submission {
        base.submission = submission;
    }
    if let Some(merge) = parsed.merge {
        base.merge = merge;
    }
    Ok(())
}

pub fn load_config() -> Result<MergeConfig> {
    let mut cfg = MergeConfig::default();
    merge_file_config(&mut cfg)?;

    cfg.remote.base_url = env_or_string("TSMERGE_BASE_URL", &cfg.remote.base_url);
    cfg.remote.company = env_or_string("TSMERGE_COMPANY", &cfg.remote.company);
    cfg.submission.user_id = env_or_string("TSMERGE_USER_ID", &cfg.submission.user_id);
    cfg.submission.site_id = env_or_string("TSMERGE_SITE_ID", &cfg.submission.site_id);
    cfg.submission.line_item_id =
        env_or_string("TSMERGE_LINE_ITEM_ID", &cfg.submission.line_item_id);
    cfg.submission.cost_center =
        env_or_string("TSMERGE_COST_CENTER", &cfg.submission.cost_center);
    cfg.merge.strict_no_match =
        env_or_bool("TSMERGE_STRICT_NO_MATCH", cfg.merge.strict_no_match);

    Ok(cfg)
}

/// Credentials for the password-grant login, kept out of the config file on
/// purpose; `.env` is the supported place for them.
pub fn credentials_from_env() -> Result<Credentials, MergeError> {
    let username = env::var("TSMERGE_USERNAME").unwrap_or_default();
    let password = env::var("TSMERGE_PASSWORD").unwrap_or_default();
    if username.trim().is_empty() || password.trim().is_empty() {
        return Err(MergeError::Config(
            "missing credentials: set TSMERGE_USERNAME and TSMERGE_PASSWORD".to_string(),
        ));
    }
    Ok(Credentials {
        username: username.trim().to_string(),
        password: password.trim().to_string(),
    })
}

/// Remote access needs a base URL before any call can be made; checked at
/// client construction rather than config load so offline subcommands keep
/// working without it.
pub fn require_remote(cfg: &MergeConfig) -> Result<(), MergeError> {
    if cfg.remote.base_url.trim().is_empty() {
        return Err(MergeError::Config(
            "remote.base_url is not configured: set it in tsmerge.toml or TSMERGE_BASE_URL"
                .to_string(),
        ));
    }
    if cfg.remote.company.trim().is_empty() {
        return Err(MergeError::Config(
            "remote.company is not configured: set it in tsmerge.toml or TSMERGE_COMPANY"
                .to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_offline_safe() {
        let cfg = MergeConfig::default();
        assert!(!cfg.merge.strict_no_match);
        assert_eq!(cfg.submission.status, "DRAFT");
        assert!(require_remote(&cfg).is_err());
    }

    #[test]
    fn partial_toml_overlays_only_named_sections() {
        let mut cfg = MergeConfig::default();
        let parsed: PartialMergeConfig = toml::from_str(
            r#"
            [remote]
            base_url = "https://timesheets.example.com"
            company = "ACME"
            "#,
        )
        .expect("parse");
        if let Some(remote) = parsed.remote {
            cfg.remote = remote;
        }
        assert_eq!(cfg.remote.company, "ACME");
        assert_eq!(cfg.submission.status, "DRAFT");
        assert!(require_remote(&cfg).is_ok());
    }
}
