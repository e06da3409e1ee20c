use serde::{Deserialize, Serialize};
use surrealdb::RecordId;
use validator::ValidationError;

use crate::models::lifecycle::TaskStatus;
use crate::utils::record_id::{as_string, option_as_string};

/// Kind-specific task parameters, tagged by `kind`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskDetails {
    Transportation {
        pickup_location: String,
        dropoff_location: String,
        vehicle_type: Option<String>,
        passenger_count: u32,
    },
    FoodService {
        location: String,
        meal_target: u32,
        dietary_notes: Option<String>,
    },
    Rescue {
        area: String,
        people_missing: u32,
        #[serde(default)]
        equipment: Vec<String>,
    },
    MedicalAid {
        facility: String,
        #[serde(default)]
        supplies_needed: Vec<String>,
    },
    General {
        notes: Option<String>,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Transportation,
    FoodService,
    Rescue,
    MedicalAid,
    General,
}

impl TaskDetails {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskDetails::Transportation { .. } => TaskKind::Transportation,
            TaskDetails::FoodService { .. } => TaskKind::FoodService,
            TaskDetails::Rescue { .. } => TaskKind::Rescue,
            TaskDetails::MedicalAid { .. } => TaskKind::MedicalAid,
            TaskDetails::General { .. } => TaskKind::General,
        }
    }
}

pub fn validate_task_details(details: &TaskDetails) -> Result<(), ValidationError> {
    let required: Vec<&str> = match details {
        TaskDetails::Transportation {
            pickup_location,
            dropoff_location,
            ..
        } => vec![pickup_location.as_str(), dropoff_location.as_str()],
        TaskDetails::FoodService { location, .. } => vec![location.as_str()],
        TaskDetails::Rescue { area, .. } => vec![area.as_str()],
        TaskDetails::MedicalAid { facility, .. } => vec![facility.as_str()],
        TaskDetails::General { .. } => Vec::new(),
    };
    if required.iter().any(|v| v.trim().is_empty()) {
        return Err(ValidationError::new("missing_task_detail"));
    }
    Ok(())
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Task {
    #[serde(serialize_with = "as_string")]
    pub id: RecordId,
    pub title: String,
    pub description: String,
    pub kind: TaskKind,
    pub details: TaskDetails,
    #[serde(serialize_with = "option_as_string", default)]
    pub incident: Option<RecordId>,
    #[serde(serialize_with = "option_as_string", default)]
    pub shelter: Option<RecordId>,
    #[serde(serialize_with = "as_string")]
    pub volunteer: RecordId,
    pub status: TaskStatus,
    #[serde(serialize_with = "as_string")]
    pub assigned_by: RecordId,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct CreateTask {
    pub title: String,
    pub description: String,
    pub kind: TaskKind,
    pub details: TaskDetails,
    pub incident: Option<RecordId>,
    pub shelter: Option<RecordId>,
    pub volunteer: RecordId,
    pub status: TaskStatus,
    pub assigned_by: RecordId,
    pub created_at: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn details_are_tagged_by_kind() {
        let details: TaskDetails = serde_json::from_value(serde_json::json!({
            "kind": "food_service",
            "location": "Camp 4",
            "meal_target": 300,
        }))
        .unwrap();
        assert_eq!(details.kind(), TaskKind::FoodService);
        assert!(validate_task_details(&details).is_ok());
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let parsed = serde_json::from_value::<TaskDetails>(serde_json::json!({
            "kind": "teleportation",
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn blank_required_detail_fails_validation() {
        let details = TaskDetails::Transportation {
            pickup_location: "Depot".into(),
            dropoff_location: " ".into(),
            vehicle_type: None,
            passenger_count: 4,
        };
        assert!(validate_task_details(&details).is_err());
    }
}
