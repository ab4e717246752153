use std::fmt;

use crate::error::MergeError;

/// Lookup key for the match table: `folder/task`, or the bare task label
/// when the entry has no folder.
pub fn match_key(folder: &str, task: &str) -> String {
    if folder.is_empty() {
        task.to_string()
    } else {
        format!("{folder}/{task}")
    }
}

/// Billing coordinate on the timesheet side. Rendered as
/// `orderId/subProjectId/phaseId` with an optional fourth line-item
/// component; parsing and rendering round-trip exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillingKey {
    pub order_id: String,
    pub sub_project_id: String,
    pub phase_id: String,
    pub line_item_id: Option<String>,
}

impl BillingKey {
    pub fn parse(key: &str) -> Result<Self, MergeError> {
        let parts: Vec<&str> = key.split('/').collect();
        match parts.as_slice() {
            [order_id, sub_project_id, phase_id] => Ok(Self {
                order_id: (*order_id).to_string(),
                sub_project_id: (*sub_project_id).to_string(),
                phase_id: (*phase_id).to_string(),
                line_item_id: None,
            }),
            [order_id, sub_project_id, phase_id, line_item_id] => Ok(Self {
                order_id: (*order_id).to_string(),
                sub_project_id: (*sub_project_id).to_string(),
                phase_id: (*phase_id).to_string(),
                line_item_id: Some((*line_item_id).to_string()),
            }),
            _ => Err(MergeError::Config(format!(
                "invalid billing key `{key}`: expected 3 or 4 `/`-separated components"
            ))),
        }
    }
}

impl fmt::Display for BillingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}",
            self.order_id, self.sub_project_id, self.phase_id
        )?;
        if let Some(line_item_id) = &self.line_item_id {
            write!(f, "/{line_item_id}")?;
        }
        Ok(())
    }
}
