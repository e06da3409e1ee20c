use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};

use crate::{
    consts::tables::{
        CAMPAIGN_TABLE, CONTRIBUTION_TABLE, INCIDENT_TABLE, SHELTER_TABLE, TASK_TABLE,
        VOLUNTEER_TABLE,
    },
    errors::Result,
    models::lifecycle::{ApplicationStatus, IncidentStatus, TaskStatus, VerificationStatus},
    state::AppState,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DashboardStats {
    pub pending_volunteers: u64,
    pub approved_volunteers: u64,
    pub active_incidents: u64,
    pub shelters: u64,
    pub sheltered_people: u64,
    pub open_tasks: u64,
    pub completed_tasks: u64,
    pub pending_contributions: u64,
    pub total_raised: i64,
}

#[derive(Debug, Deserialize)]
struct Count {
    count: u64,
}

/// Counters for the admin dashboard, computed in one round trip.
pub async fn stats(State(state): State<AppState>) -> Result<Json<DashboardStats>> {
    let mut response = state
        .sdb
        .query(format!(
            "SELECT count() FROM {VOLUNTEER_TABLE} WHERE application_status = $pending GROUP ALL;
            SELECT count() FROM {VOLUNTEER_TABLE} WHERE application_status = $approved GROUP ALL;
            SELECT count() FROM {INCIDENT_TABLE} WHERE status IN [$incident_pending, $incident_verified] GROUP ALL;
            SELECT VALUE inmates FROM {SHELTER_TABLE};
            SELECT count() FROM {TASK_TABLE} WHERE status IN [$assigned, $accepted] GROUP ALL;
            SELECT count() FROM {TASK_TABLE} WHERE status = $completed GROUP ALL;
            SELECT count() FROM {CONTRIBUTION_TABLE} WHERE status = $contribution_pending GROUP ALL;
            SELECT VALUE collected_amount FROM {CAMPAIGN_TABLE};"
        ))
        .bind(("pending", ApplicationStatus::Pending))
        .bind(("approved", ApplicationStatus::Approved))
        .bind(("incident_pending", IncidentStatus::Pending))
        .bind(("incident_verified", IncidentStatus::Verified))
        .bind(("assigned", TaskStatus::Assigned))
        .bind(("accepted", TaskStatus::Accepted))
        .bind(("completed", TaskStatus::Completed))
        .bind(("contribution_pending", VerificationStatus::Pending))
        .await?;

    let mut count = |index: usize| -> Result<u64> {
        let rows: Vec<Count> = response.take(index)?;
        Ok(rows.first().map(|c| c.count).unwrap_or(0))
    };
    let pending_volunteers = count(0)?;
    let approved_volunteers = count(1)?;
    let active_incidents = count(2)?;
    let open_tasks = count(4)?;
    let completed_tasks = count(5)?;
    let pending_contributions = count(6)?;

    let inmates: Vec<u64> = response.take(3)?;
    let collected: Vec<i64> = response.take(7)?;

    Ok(Json(DashboardStats {
        pending_volunteers,
        approved_volunteers,
        active_incidents,
        shelters: inmates.len() as u64,
        sheltered_people: inmates.into_iter().sum(),
        open_tasks,
        completed_tasks,
        pending_contributions,
        total_raised: collected.into_iter().sum(),
    }))
}
