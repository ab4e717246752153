use std::fmt;

use thiserror::Error;

/// Structured rejection payload returned by the timesheet service when it
/// refuses an entry. `status_code` is 0 when the request never reached the
/// service (transport failure).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRejection {
    pub status_code: u16,
    pub reason: String,
    pub message: String,
    pub details: Vec<String>,
}

impl fmt::Display for RemoteRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.reason, self.status_code, self.message)?;
        if !self.details.is_empty() {
            write!(f, " - {}", self.details.join(", "))?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum MergeError {
    /// Malformed source file or unexpected remote response shape. Fatal for
    /// the whole read: a bad file implies the dataset does not match
    /// expectations.
    #[error("parse failed: {0}")]
    Parse(String),

    /// Match document or app configuration missing/unusable. Fatal at
    /// initialization.
    #[error("configuration invalid: {0}")]
    Config(String),

    /// Remote login failed. Fatal for any call requiring auth.
    #[error("timesheet login failed: {0}")]
    Auth(String),

    /// Remote rejected an entry. Halts the remainder of the merge run but
    /// leaves prior progress intact.
    #[error("timesheet rejected entry: {0}")]
    Submission(RemoteRejection),

    /// Remote rejected a delete during rollback. Logged, non-fatal, the
    /// rollback loop continues.
    #[error("timesheet rejected delete of entry {entry_id}: {reason}")]
    Deletion { entry_id: String, reason: String },
}

#[cfg(test)]
mod tests {
    use super::RemoteRejection;

    #[test]
    fn rejection_display_includes_details() {
        let rejection = RemoteRejection {
            status_code: 422,
            reason: "Unprocessable Entity".to_string(),
            message: "phase closed".to_string(),
            details: vec!["phaseId PH3".to_string(), "order ORD1".to_string()],
        };
        assert_eq!(
            rejection.to_string(),
            "Unprocessable Entity (422): phase closed - phaseId PH3, order ORD1"
        );
    }

    #[test]
    fn rejection_display_without_details() {
        let rejection = RemoteRejection {
            status_code: 500,
            reason: "Internal Server Error".to_string(),
            message: "boom".to_string(),
            details: Vec::new(),
        };
        assert_eq!(rejection.to_string(), "Internal Server Error (500): boom");
    }
}
