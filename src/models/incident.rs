use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

use crate::consts::SEVERITY_LABELS;
use crate::models::lifecycle::IncidentStatus;
use crate::utils::record_id::as_string;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Incident {
    #[serde(serialize_with = "as_string")]
    pub id: RecordId,
    pub title: String,
    pub location: String,
    pub severity: u8,
    pub severity_label: String,
    pub description: String,
    pub status: IncidentStatus,
    #[serde(serialize_with = "as_string")]
    pub reported_by: RecordId,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct CreateIncident {
    pub title: String,
    pub location: String,
    pub severity: u8,
    pub severity_label: String,
    pub description: String,
    pub status: IncidentStatus,
    pub reported_by: RecordId,
    pub created_at: String,
}

/// `None` outside 1..=5.
pub fn severity_label(severity: u8) -> Option<&'static str> {
    severity
        .checked_sub(1)
        .and_then(|i| SEVERITY_LABELS.get(i as usize).copied())
}
