use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

use crate::errors::{Error, Result};
use crate::models::lifecycle::DutyStatus;
use crate::utils::record_id::{as_string, option_as_string};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Shelter {
    #[serde(serialize_with = "as_string")]
    pub id: RecordId,
    pub name: String,
    pub location: String,
    pub total_capacity: u32,
    pub inmates: u32,
    pub contact: Option<String>,
    #[serde(serialize_with = "option_as_string", default)]
    pub assigned_volunteer: Option<RecordId>,
    /// Mirrors the assigned volunteer's `task_status` while the duty lasts.
    pub task_status: Option<DutyStatus>,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl Shelter {
    pub fn available_beds(&self) -> u32 {
        self.total_capacity.saturating_sub(self.inmates)
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct CreateShelter {
    pub name: String,
    pub location: String,
    pub total_capacity: u32,
    pub inmates: u32,
    pub contact: Option<String>,
    pub created_at: String,
}

pub fn check_occupancy(inmates: u32, total_capacity: u32) -> Result<()> {
    if inmates > total_capacity {
        return Err(Error::CapacityExceeded {
            capacity: total_capacity,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occupancy_cannot_exceed_capacity() {
        assert!(check_occupancy(10, 10).is_ok());
        assert!(matches!(
            check_occupancy(11, 10),
            Err(Error::CapacityExceeded { capacity: 10 })
        ));
    }
}
