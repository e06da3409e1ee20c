use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use surrealdb::RecordId;
use validator::Validate;

use crate::models::lifecycle::{ApplicationStatus, DutyStatus};
use crate::utils::record_id::{as_string, option_as_string};
use crate::utils::validator::validate_not_blank;

/// References to credentials uploaded out of band.
#[derive(Serialize, Deserialize, Debug, Clone, Validate)]
pub struct Documents {
    #[validate(length(min = 1, max = 512), custom(function = "validate_not_blank"))]
    pub identity_proof: String,
    #[validate(length(min = 1, max = 512), custom(function = "validate_not_blank"))]
    pub address_proof: String,
    #[serde(default)]
    pub certificates: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Volunteer {
    #[serde(serialize_with = "as_string")]
    pub id: RecordId,
    #[serde(serialize_with = "as_string")]
    pub user: RecordId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub skills: BTreeSet<String>,
    pub documents: Documents,
    pub application_status: ApplicationStatus,
    pub task_status: DutyStatus,
    #[serde(serialize_with = "option_as_string", default)]
    pub assigned_task: Option<RecordId>,
    #[serde(serialize_with = "option_as_string", default)]
    pub assigned_shelter: Option<RecordId>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl Volunteer {
    /// Idle duty status and no task or shelter link.
    pub fn is_assignable(&self) -> bool {
        self.task_status.is_assignable()
            && self.assigned_task.is_none()
            && self.assigned_shelter.is_none()
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct CreateVolunteer {
    pub user: RecordId,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub skills: BTreeSet<String>,
    pub documents: Documents,
    pub application_status: ApplicationStatus,
    pub task_status: DutyStatus,
    pub created_at: String,
}

pub fn normalize_skills<I: IntoIterator<Item = String>>(skills: I) -> BTreeSet<String> {
    skills
        .into_iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skills_are_deduplicated_case_insensitively() {
        let skills = normalize_skills(vec![
            "First Aid".to_string(),
            " first aid ".to_string(),
            "Driving".to_string(),
        ]);
        assert_eq!(skills.into_iter().collect::<Vec<_>>(), vec!["driving", "first aid"]);
    }

    #[test]
    fn documents_require_both_proofs() {
        let docs: Documents = serde_json::from_value(serde_json::json!({
            "identity_proof": "doc://id/42",
            "address_proof": "   ",
        }))
        .unwrap();
        let errors = docs.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("address_proof"));
    }
}
