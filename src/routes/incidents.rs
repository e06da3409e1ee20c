use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::{
    consts::{SEVERITY_LABELS, tables::INCIDENT_TABLE},
    db::{Stale, commit, fetch, stale},
    errors::{Error, Result},
    middleware::AuthUser,
    models::{
        incident::{CreateIncident, Incident, severity_label},
        lifecycle::{IncidentStatus, Lifecycle},
    },
    state::AppState,
    utils::{
        record_id::parse_record_id, time::time_now, validated_form::{QueryParams, ValidatedJson},
        validator::validate_not_blank,
    },
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReportIncidentRequest {
    #[validate(length(min = 3, max = 200), custom(function = "validate_not_blank"))]
    pub title: String,
    #[validate(length(min = 2, max = 300), custom(function = "validate_not_blank"))]
    pub location: String,
    #[validate(range(min = 1, max = 5))]
    pub severity: u8,
    #[validate(length(min = 1, max = 5000))]
    pub description: String,
}

pub async fn report_incident(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(input): ValidatedJson<ReportIncidentRequest>,
) -> Result<(StatusCode, Json<Incident>)> {
    let label = severity_label(input.severity)
        .ok_or_else(|| Error::BadRequest("severity must be between 1 and 5".into()))?;
    let incident_data = CreateIncident {
        title: input.title.trim().to_string(),
        location: input.location.trim().to_string(),
        severity: input.severity,
        severity_label: label.to_string(),
        description: input.description,
        status: IncidentStatus::Pending,
        reported_by: auth.id,
        created_at: time_now(),
    };
    let incident = state
        .sdb
        .create::<Option<Incident>>(INCIDENT_TABLE)
        .content(incident_data)
        .await?
        .ok_or(Error::InternalServerError)?;
    info!(
        "incident {} reported at {} ({})",
        incident.id, incident.location, incident.severity_label
    );
    Ok((StatusCode::CREATED, Json(incident)))
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListIncidentsQuery {
    pub status: Option<IncidentStatus>,
}

/// Deleted incidents are only listed when asked for explicitly.
pub async fn list_incidents(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ListIncidentsQuery>,
) -> Result<Json<Vec<Incident>>> {
    let incidents = match query.status {
        Some(status) => state
            .sdb
            .query("SELECT * FROM type::table($table) WHERE status = $status ORDER BY severity DESC, created_at DESC;")
            .bind(("table", INCIDENT_TABLE))
            .bind(("status", status))
            .await?
            .take::<Vec<Incident>>(0)?,
        None => state
            .sdb
            .query("SELECT * FROM type::table($table) WHERE status != $deleted ORDER BY severity DESC, created_at DESC;")
            .bind(("table", INCIDENT_TABLE))
            .bind(("deleted", IncidentStatus::Deleted))
            .await?
            .take::<Vec<Incident>>(0)?,
    };
    Ok(Json(incidents))
}

pub async fn read_incident(
    State(state): State<AppState>,
    Path(incident_id): Path<String>,
) -> Result<Json<Incident>> {
    let incident_id = parse_record_id(INCIDENT_TABLE, &incident_id)?;
    Ok(Json(fetch(&state.sdb, &incident_id).await?))
}

#[derive(Debug, Clone, Serialize)]
pub struct SeverityLevel {
    pub severity: u8,
    pub label: &'static str,
}

pub async fn severity_levels() -> Json<Vec<SeverityLevel>> {
    Json(
        SEVERITY_LABELS
            .iter()
            .zip(1u8..)
            .map(|(label, severity)| SeverityLevel { severity, label })
            .collect(),
    )
}

// ! admin

/// Moves an incident only if nobody changed its status since it was read.
async fn move_incident(
    state: &AppState,
    incident_id: String,
    next: IncidentStatus,
) -> Result<Incident> {
    let incident_id = parse_record_id(INCIDENT_TABLE, &incident_id)?;
    let incident: Incident = fetch(&state.sdb, &incident_id).await?;
    let status = incident.status.transition(next)?;
    let response = state
        .sdb
        .query(format!(
            "BEGIN TRANSACTION;
            IF $incident.status != $expected {{ THROW \"{}\" }};
            UPDATE $incident SET status = $next, updated_at = $now;
            COMMIT TRANSACTION;",
            stale(Stale::Incident)
        ))
        .bind(("incident", incident.id.clone()))
        .bind(("expected", incident.status))
        .bind(("next", status))
        .bind(("now", time_now()))
        .await?;
    commit(response)?;

    let incident: Incident = fetch(&state.sdb, &incident.id).await?;
    info!("incident {} is now {:?}", incident.id, incident.status);
    Ok(incident)
}

pub async fn verify_incident(
    State(state): State<AppState>,
    Path(incident_id): Path<String>,
) -> Result<Json<Incident>> {
    Ok(Json(
        move_incident(&state, incident_id, IncidentStatus::Verified).await?,
    ))
}

pub async fn complete_incident(
    State(state): State<AppState>,
    Path(incident_id): Path<String>,
) -> Result<Json<Incident>> {
    Ok(Json(
        move_incident(&state, incident_id, IncidentStatus::Completed).await?,
    ))
}

/// Soft delete: the record stays for the audit trail with status `deleted`.
pub async fn delete_incident(
    State(state): State<AppState>,
    Path(incident_id): Path<String>,
) -> Result<Json<Incident>> {
    Ok(Json(
        move_incident(&state, incident_id, IncidentStatus::Deleted).await?,
    ))
}
