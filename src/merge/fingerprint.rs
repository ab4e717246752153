use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

use crate::merge::keys::BillingKey;
use crate::merge::source::SourceEntry;

/// Deterministic digest identifying one billing submission.
///
/// Base64 over the concatenated field tuple; the same tuple always yields
/// the same fingerprint, which is what makes submission idempotent across
/// runs. Collision avoidance within the tuple domain is all that is needed;
/// this is not a security boundary.
pub fn fingerprint(entry: &SourceEntry, key: &BillingKey, description: &str) -> String {
    let raw = format!(
        "{}-{}-{}-{}-{}-{}-{}-{}",
        entry.uuid,
        entry.folder,
        entry.task,
        entry.duration_hours,
        key.order_id,
        key.sub_project_id,
        key.phase_id,
        description,
    );
    STANDARD.encode(raw)
}
