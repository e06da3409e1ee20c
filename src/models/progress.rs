use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

use crate::errors::{Error, Result};
use crate::models::task::TaskKind;
use crate::utils::record_id::as_string;

/// Kind-specific counters. The variant always matches the task's kind.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressCounters {
    Transportation {
        trips_completed: u32,
        people_transported: u32,
    },
    FoodService {
        meals_served: u32,
    },
    Rescue {
        people_found: u32,
        people_rescued: u32,
    },
    MedicalAid {
        patients_treated: u32,
    },
    General,
}

impl ProgressCounters {
    pub fn zeroed(kind: TaskKind) -> Self {
        match kind {
            TaskKind::Transportation => ProgressCounters::Transportation {
                trips_completed: 0,
                people_transported: 0,
            },
            TaskKind::FoodService => ProgressCounters::FoodService { meals_served: 0 },
            TaskKind::Rescue => ProgressCounters::Rescue {
                people_found: 0,
                people_rescued: 0,
            },
            TaskKind::MedicalAid => ProgressCounters::MedicalAid {
                patients_treated: 0,
            },
            TaskKind::General => ProgressCounters::General,
        }
    }

    pub fn kind(&self) -> TaskKind {
        match self {
            ProgressCounters::Transportation { .. } => TaskKind::Transportation,
            ProgressCounters::FoodService { .. } => TaskKind::FoodService,
            ProgressCounters::Rescue { .. } => TaskKind::Rescue,
            ProgressCounters::MedicalAid { .. } => TaskKind::MedicalAid,
            ProgressCounters::General => TaskKind::General,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProgressNote {
    pub note: String,
    pub percentage: u8,
    pub at: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TaskProgress {
    #[serde(serialize_with = "as_string")]
    pub id: RecordId,
    #[serde(serialize_with = "as_string")]
    pub task: RecordId,
    #[serde(serialize_with = "as_string")]
    pub volunteer: RecordId,
    pub progress_percentage: u8,
    pub completed: bool,
    #[serde(default)]
    pub updates: Vec<ProgressNote>,
    pub counters: ProgressCounters,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct CreateTaskProgress {
    pub task: RecordId,
    pub volunteer: RecordId,
    pub progress_percentage: u8,
    pub completed: bool,
    pub updates: Vec<ProgressNote>,
    pub counters: ProgressCounters,
    pub created_at: String,
}

impl CreateTaskProgress {
    pub fn start(task: RecordId, volunteer: RecordId, kind: TaskKind, now: String) -> Self {
        Self {
            task,
            volunteer,
            progress_percentage: 0,
            completed: false,
            updates: Vec::new(),
            counters: ProgressCounters::zeroed(kind),
            created_at: now,
        }
    }
}

/// Fields written back to the progress document after an update.
#[derive(Serialize, Debug, Clone)]
pub struct ProgressPatch {
    pub progress_percentage: u8,
    pub completed: bool,
    pub updates: Vec<ProgressNote>,
    pub counters: ProgressCounters,
    pub updated_at: String,
}

#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub progress_percentage: u8,
    pub note: Option<String>,
    pub counters: Option<ProgressCounters>,
    pub completed: bool,
}

impl TaskProgress {
    /// Folds an update into the stored record. Completion pins the percentage to 100.
    pub fn apply(&self, kind: TaskKind, update: ProgressUpdate, now: &str) -> Result<ProgressPatch> {
        if self.completed {
            return Err(Error::BadRequest("task progress is already completed".into()));
        }
        if update.progress_percentage > 100 {
            return Err(Error::BadRequest(
                "progress_percentage must be between 0 and 100".into(),
            ));
        }
        let counters = match update.counters {
            Some(counters) if counters.kind() != kind => {
                return Err(Error::BadRequest(format!(
                    "counters of kind {:?} do not match a {:?} task",
                    counters.kind(),
                    kind
                )));
            }
            Some(counters) => counters,
            None => self.counters.clone(),
        };
        let progress_percentage = if update.completed {
            100
        } else {
            update.progress_percentage
        };
        let mut updates = self.updates.clone();
        if let Some(note) = update.note.filter(|n| !n.trim().is_empty()) {
            updates.push(ProgressNote {
                note: note.trim().to_string(),
                percentage: progress_percentage,
                at: now.to_string(),
            });
        }
        Ok(ProgressPatch {
            progress_percentage,
            completed: update.completed,
            updates,
            counters,
            updated_at: now.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(kind: TaskKind) -> TaskProgress {
        TaskProgress {
            id: RecordId::from_table_key("task_progress", "p1"),
            task: RecordId::from_table_key("tasks", "t1"),
            volunteer: RecordId::from_table_key("volunteers", "v1"),
            progress_percentage: 10,
            completed: false,
            updates: Vec::new(),
            counters: ProgressCounters::zeroed(kind),
            created_at: "2024-01-01T00:00:00Z".into(),
            updated_at: None,
        }
    }

    fn update(pct: u8, counters: Option<ProgressCounters>, completed: bool) -> ProgressUpdate {
        ProgressUpdate {
            progress_percentage: pct,
            note: Some("served lunch".into()),
            counters,
            completed,
        }
    }

    #[test]
    fn completion_pins_percentage_and_records_note() {
        let patch = progress(TaskKind::FoodService)
            .apply(
                TaskKind::FoodService,
                update(60, Some(ProgressCounters::FoodService { meals_served: 250 }), true),
                "now",
            )
            .unwrap();
        assert_eq!(patch.progress_percentage, 100);
        assert!(patch.completed);
        assert_eq!(patch.updates.len(), 1);
        assert_eq!(patch.counters, ProgressCounters::FoodService { meals_served: 250 });
    }

    #[test]
    fn counters_of_another_kind_are_rejected() {
        let err = progress(TaskKind::Rescue)
            .apply(
                TaskKind::Rescue,
                update(50, Some(ProgressCounters::FoodService { meals_served: 1 }), false),
                "now",
            )
            .unwrap_err();
        assert!(matches!(err, Error::BadRequest(_)));
    }

    #[test]
    fn completed_progress_is_frozen() {
        let mut done = progress(TaskKind::General);
        done.completed = true;
        assert!(done.apply(TaskKind::General, update(100, None, true), "now").is_err());
    }

    #[test]
    fn general_counters_round_trip_as_tag_only() {
        let json = serde_json::to_value(ProgressCounters::General).unwrap();
        assert_eq!(json, serde_json::json!({ "kind": "general" }));
    }
}
