use std::collections::BTreeMap;

use anyhow::Context;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{MergeError, RemoteRejection};
use crate::logging::Reporter;
use crate::merge::config::{self, Credentials, MergeConfig, SubmissionConfig};
use crate::merge::engine::{BillingApi, BillingEntry};
use crate::merge::keys::BillingKey;

/// Bearer credential cached after the first successful login and reused
/// until the process ends. There is no proactive refresh; an expired token
/// surfaces as an auth failure on the next call.
#[derive(Debug, Clone)]
struct BearerToken {
    token_type: String,
    access_token: String,
}

/// Client for the remote timesheet service: password-grant login, entry
/// creation and deletion, and the project/phase tree.
pub struct TimesheetClient<'a> {
    reporter: &'a Reporter,
    http: Client,
    base_url: String,
    company: String,
    credentials: Credentials,
    submission: SubmissionConfig,
    token: Option<BearerToken>,
}

/// Wire shape of one entry creation request. Built fresh for every
/// submission so no field can leak between calls.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EntryPayload {
    date: String,
    description: String,
    order_id: String,
    id_sub_prj: String,
    phase_id: String,
    user_id: String,
    company: String,
    status: String,
    site_id: String,
    hours: f64,
    billing_hours: f64,
    trip_hours: f64,
    op_de_linenum_id: String,
    centro_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSite {
    pub site_id: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPhase {
    #[serde(rename = "idSubPRJ")]
    pub sub_project_id: String,
    pub phase_id: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub op_de_linenum_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub order_id: String,
    pub description: String,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub ord_type: Option<String>,
    #[serde(default)]
    pub phases: Vec<ProjectPhase>,
    #[serde(default)]
    pub sites: Vec<ProjectSite>,
}

fn build_payload(
    entry: &BillingEntry,
    company: &str,
    submission: &SubmissionConfig,
) -> EntryPayload {
    EntryPayload {
        date: entry.date.format("%Y-%m-%d").to_string(),
        description: entry.description.clone(),
        order_id: entry.key.order_id.clone(),
        id_sub_prj: entry.key.sub_project_id.clone(),
        phase_id: entry.key.phase_id.clone(),
        user_id: submission.user_id.clone(),
        company: company.to_string(),
        status: submission.status.clone(),
        site_id: submission.site_id.clone(),
        hours: entry.duration_hours,
        billing_hours: entry.duration_hours,
        trip_hours: submission.trip_hours,
        op_de_linenum_id: entry
            .key
            .line_item_id
            .clone()
            .unwrap_or_else(|| submission.line_item_id.clone()),
        centro_id: submission.cost_center.clone(),
    }
}

fn created_entry_id(body: &Value) -> Result<String, MergeError> {
    match body.get("id") {
        Some(Value::String(id)) => Ok(id.clone()),
        Some(Value::Number(id)) => Ok(id.to_string()),
        _ => Err(MergeError::Parse(
            "create response did not contain an entry id".to_string(),
        )),
    }
}

/// Decode the remote's structured rejection payload; degrade to the raw
/// body text when the shape is unexpected.
fn rejection_from_body(status_code: u16, fallback_reason: &str, text: &str) -> RemoteRejection {
    #[derive(Deserialize)]
    #[serde(rename_all = "camelCase")]
    struct RejectionBody {
        status_code: Option<u16>,
        status_reason: Option<String>,
        message: Option<String>,
        #[serde(default)]
        details: Vec<String>,
    }

    match serde_json::from_str::<RejectionBody>(text) {
        Ok(body) => RemoteRejection {
            status_code: body.status_code.unwrap_or(status_code),
            reason: body
                .status_reason
                .unwrap_or_else(|| fallback_reason.to_string()),
            message: body.message.unwrap_or_else(|| text.trim().to_string()),
            details: body.details,
        },
        Err(_) => RemoteRejection {
            status_code,
            reason: fallback_reason.to_string(),
            message: text.trim().to_string(),
            details: Vec::new(),
        },
    }
}

fn transport_rejection(err: &reqwest::Error) -> RemoteRejection {
    RemoteRejection {
        status_code: 0,
        reason: "transport failure".to_string(),
        message: err.to_string(),
        details: Vec::new(),
    }
}

/// Match-table suggestions derived from the remote tree:
/// `projectDescription/phaseDescription` → billing key. Operators copy the
/// rows they need into the match configuration document.
pub fn suggested_matches(projects: &[Project]) -> BTreeMap<String, String> {
    let mut out = BTreeMap::new();
    for project in projects {
        for phase in &project.phases {
            let key = format!("{}/{}", project.description, phase.description);
            let target = BillingKey {
                order_id: project.order_id.clone(),
                sub_project_id: phase.sub_project_id.clone(),
                phase_id: phase.phase_id.clone(),
                line_item_id: None,
            };
            out.insert(key, target.to_string());
        }
    }
    out
}

impl<'a> TimesheetClient<'a> {
    pub fn new(reporter: &'a Reporter, config: &MergeConfig) -> Result<Self, MergeError> {
        config::require_remote(config)?;
        let credentials = config::credentials_from_env()?;
        let http = Client::builder()
            .build()
            .map_err(|err| MergeError::Config(format!("http client: {err}")))?;
        Ok(Self {
            reporter,
            http,
            base_url: config.remote.base_url.trim_end_matches('/').to_string(),
            company: config.remote.company.clone(),
            credentials,
            submission: config.submission.clone(),
            token: None,
        })
    }

    fn login(&self) -> Result<BearerToken, MergeError> {
        self.reporter
            .info(format!("logging in as {}", self.credentials.username));
        let url = format!("{}/token/oauth2/{}", self.base_url, self.company);
        let response = self
            .http
            .post(&url)
            .form(&[
                ("username", self.credentials.username.as_str()),
                ("password", self.credentials.password.as_str()),
                ("grant_type", "password"),
            ])
            .send()
            .map_err(|err| MergeError::Auth(format!("login request failed: {err}")))?;
        if !response.status().is_success() {
            return Err(MergeError::Auth(format!(
                "login failed with status {}",
                response.status()
            )));
        }

        #[derive(Deserialize)]
        struct TokenResponse {
            token_type: String,
            access_token: String,
        }
        let parsed: TokenResponse = response
            .json()
            .map_err(|err| MergeError::Parse(format!("unexpected login response: {err}")))?;
        Ok(BearerToken {
            token_type: parsed.token_type,
            access_token: parsed.access_token,
        })
    }

    fn bearer_header(&mut self) -> Result<String, MergeError> {
        if let Some(token) = &self.token {
            return Ok(format!("{} {}", token.token_type, token.access_token));
        }
        let token = self.login()?;
        let header = format!("{} {}", token.token_type, token.access_token);
        self.token = Some(token);
        Ok(header)
    }

    /// Fetch the remote project/phase tree for operator tooling.
    pub fn projects(&mut self) -> anyhow::Result<Vec<Project>> {
        let auth = self.bearer_header()?;
        let url = format!("{}/orders/tree", self.base_url);
        let response = self
            .http
            .get(&url)
            .header(AUTHORIZATION, &auth)
            .send()
            .with_context(|| format!("project tree request to {url} failed"))?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(MergeError::Auth(format!(
                "project tree request rejected with status {status}"
            ))
            .into());
        }
        if !status.is_success() {
            anyhow::bail!("project tree request failed with status {status}");
        }

        let projects: Vec<Project> = response
            .json()
            .map_err(|err| MergeError::Parse(format!("unexpected project tree shape: {err}")))?;
        Ok(projects)
    }
}

impl BillingApi for TimesheetClient<'_> {
    fn submit(&mut self, entry: &BillingEntry) -> Result<String, MergeError> {
        let auth = self.bearer_header()?;
        let payload = build_payload(entry, &self.company, &self.submission);
        let url = format!("{}/timesheets", self.base_url);
        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, &auth)
            .json(&payload)
            .send()
            .map_err(|err| MergeError::Submission(transport_rejection(&err)))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(MergeError::Auth(format!(
                "submission rejected with status {status}: credential expired or invalid"
            )));
        }
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("rejected").to_string();
            let text = response.text().unwrap_or_default();
            return Err(MergeError::Submission(rejection_from_body(
                status.as_u16(),
                &reason,
                &text,
            )));
        }

        let body: Value = response
            .json()
            .map_err(|err| MergeError::Parse(format!("unexpected create response: {err}")))?;
        created_entry_id(&body)
    }

    fn delete(&mut self, entry_id: &str) -> Result<(), MergeError> {
        let auth = self.bearer_header()?;
        let url = format!("{}/timesheets/{entry_id}", self.base_url);
        let response = self
            .http
            .delete(&url)
            .header(AUTHORIZATION, &auth)
            .send()
            .map_err(|err| MergeError::Deletion {
                entry_id: entry_id.to_string(),
                reason: err.to_string(),
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(MergeError::Auth(format!(
                "delete rejected with status {status}: credential expired or invalid"
            )));
        }
        if !status.is_success() {
            return Err(MergeError::Deletion {
                entry_id: entry_id.to_string(),
                reason: format!("status {status}"),
            });
        }
        Ok(())
    }
}
