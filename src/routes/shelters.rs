use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use crate::{
    consts::tables::{SHELTER_TABLE, VOLUNTEER_TABLE},
    db::{VOLUNTEER_UNAVAILABLE, Stale, commit, fetch, stale},
    errors::{Error, Result},
    middleware::AuthUser,
    models::{
        lifecycle::{ApplicationStatus, DutyStatus, Lifecycle},
        shelter::{CreateShelter, Shelter, check_occupancy},
        volunteer::Volunteer,
    },
    notify::{deliver, messages},
    routes::volunteers::volunteer_for_user,
    state::AppState,
    utils::{
        record_id::parse_record_id, time::time_now, validated_form::ValidatedJson,
        validator::validate_not_blank,
    },
};

pub async fn list_shelters(State(state): State<AppState>) -> Result<Json<Vec<Shelter>>> {
    let shelters = state
        .sdb
        .query("SELECT * FROM type::table($table) ORDER BY name;")
        .bind(("table", SHELTER_TABLE))
        .await?
        .take::<Vec<Shelter>>(0)?;
    Ok(Json(shelters))
}

pub async fn read_shelter(
    State(state): State<AppState>,
    Path(shelter_id): Path<String>,
) -> Result<Json<Shelter>> {
    let shelter_id = parse_record_id(SHELTER_TABLE, &shelter_id)?;
    Ok(Json(fetch(&state.sdb, &shelter_id).await?))
}

// ! admin

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateShelterRequest {
    #[validate(length(min = 2, max = 200), custom(function = "validate_not_blank"))]
    pub name: String,
    #[validate(length(min = 2, max = 300), custom(function = "validate_not_blank"))]
    pub location: String,
    #[validate(range(min = 1))]
    pub total_capacity: u32,
    #[serde(default)]
    pub inmates: u32,
    #[validate(length(max = 100))]
    pub contact: Option<String>,
}

pub async fn create_shelter(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateShelterRequest>,
) -> Result<(StatusCode, Json<Shelter>)> {
    check_occupancy(input.inmates, input.total_capacity)?;
    let shelter_data = CreateShelter {
        name: input.name.trim().to_string(),
        location: input.location.trim().to_string(),
        total_capacity: input.total_capacity,
        inmates: input.inmates,
        contact: input.contact,
        created_at: time_now(),
    };
    let shelter = state
        .sdb
        .create::<Option<Shelter>>(SHELTER_TABLE)
        .content(shelter_data)
        .await?
        .ok_or(Error::InternalServerError)?;
    info!("shelter {} created with {} beds", shelter.id, shelter.total_capacity);
    Ok((StatusCode::CREATED, Json(shelter)))
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateShelterRequest {
    #[validate(length(min = 2, max = 200))]
    pub name: Option<String>,
    #[validate(length(min = 2, max = 300))]
    pub location: Option<String>,
    #[validate(range(min = 1))]
    pub total_capacity: Option<u32>,
    #[validate(length(max = 100))]
    pub contact: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct ShelterPatch {
    name: String,
    location: String,
    total_capacity: u32,
    contact: Option<String>,
    updated_at: String,
}

impl UpdateShelterRequest {
    fn apply_to(self, shelter: &Shelter) -> Result<ShelterPatch> {
        let total_capacity = self.total_capacity.unwrap_or(shelter.total_capacity);
        check_occupancy(shelter.inmates, total_capacity)?;
        Ok(ShelterPatch {
            name: self.name.unwrap_or_else(|| shelter.name.clone()),
            location: self.location.unwrap_or_else(|| shelter.location.clone()),
            total_capacity,
            contact: self.contact.or_else(|| shelter.contact.clone()),
            updated_at: time_now(),
        })
    }
}

pub async fn update_shelter(
    State(state): State<AppState>,
    Path(shelter_id): Path<String>,
    ValidatedJson(input): ValidatedJson<UpdateShelterRequest>,
) -> Result<Json<Shelter>> {
    let shelter_id = parse_record_id(SHELTER_TABLE, &shelter_id)?;
    let shelter: Shelter = fetch(&state.sdb, &shelter_id).await?;
    let patch = input.apply_to(&shelter)?;
    let shelter = state
        .sdb
        .update::<Option<Shelter>>(shelter.id)
        .merge(patch)
        .await?
        .ok_or(Error::NotFound)?;
    Ok(Json(shelter))
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateInmatesRequest {
    pub inmates: u32,
}

/// The capacity check is repeated inside the write so a concurrent capacity
/// change cannot slip an overfull shelter through.
pub async fn update_inmates(
    State(state): State<AppState>,
    Path(shelter_id): Path<String>,
    ValidatedJson(input): ValidatedJson<UpdateInmatesRequest>,
) -> Result<Json<Shelter>> {
    let shelter_id = parse_record_id(SHELTER_TABLE, &shelter_id)?;
    let shelter: Shelter = fetch(&state.sdb, &shelter_id).await?;
    check_occupancy(input.inmates, shelter.total_capacity)?;

    let updated = state
        .sdb
        .query("UPDATE $shelter SET inmates = $inmates, updated_at = $now WHERE total_capacity >= $inmates;")
        .bind(("shelter", shelter.id.clone()))
        .bind(("inmates", input.inmates))
        .bind(("now", time_now()))
        .await?
        .take::<Vec<Shelter>>(0)?
        .into_iter()
        .next();
    match updated {
        Some(shelter) => {
            info!("shelter {} occupancy {}/{}", shelter.id, shelter.inmates, shelter.total_capacity);
            Ok(Json(shelter))
        }
        None => {
            let current: Shelter = fetch(&state.sdb, &shelter.id).await?;
            Err(Error::CapacityExceeded {
                capacity: current.total_capacity,
            })
        }
    }
}

pub async fn delete_shelter(
    State(state): State<AppState>,
    Path(shelter_id): Path<String>,
) -> Result<StatusCode> {
    let shelter_id = parse_record_id(SHELTER_TABLE, &shelter_id)?;
    let shelter: Shelter = fetch(&state.sdb, &shelter_id).await?;
    if shelter.assigned_volunteer.is_some() {
        return Err(Error::BadRequest(
            "shelter still has an assigned volunteer".into(),
        ));
    }
    let _ = state
        .sdb
        .delete::<Option<Shelter>>(shelter.id.clone())
        .await?
        .ok_or(Error::NotFound)?;
    info!("shelter {} deleted", shelter.id);
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AssignVolunteerRequest {
    #[validate(length(min = 1))]
    pub volunteer_id: String,
}

pub async fn assign_shelter_volunteer(
    State(state): State<AppState>,
    Path(shelter_id): Path<String>,
    ValidatedJson(input): ValidatedJson<AssignVolunteerRequest>,
) -> Result<Json<Shelter>> {
    let shelter_id = parse_record_id(SHELTER_TABLE, &shelter_id)?;
    let volunteer_id = parse_record_id(VOLUNTEER_TABLE, &input.volunteer_id)?;
    let shelter: Shelter = fetch(&state.sdb, &shelter_id).await?;
    let volunteer: Volunteer = fetch(&state.sdb, &volunteer_id).await?;

    if shelter.assigned_volunteer.is_some() {
        return Err(Error::BadRequest("shelter already has a volunteer".into()));
    }
    if volunteer.application_status != ApplicationStatus::Approved || !volunteer.is_assignable() {
        return Err(Error::VolunteerUnavailable);
    }
    let next = volunteer.task_status.transition(DutyStatus::Assigned)?;

    let response = state
        .sdb
        .query(format!(
            "BEGIN TRANSACTION;
            IF $volunteer.task_status != $expected OR $volunteer.assigned_task != NONE OR $volunteer.assigned_shelter != NONE {{ THROW \"{VOLUNTEER_UNAVAILABLE}\" }};
            IF $shelter.assigned_volunteer != NONE {{ THROW \"{}\" }};
            UPDATE $shelter SET assigned_volunteer = $volunteer, task_status = $next, updated_at = $now;
            UPDATE $volunteer SET task_status = $next, assigned_shelter = $shelter, updated_at = $now;
            COMMIT TRANSACTION;",
            stale(Stale::Shelter)
        ))
        .bind(("shelter", shelter.id.clone()))
        .bind(("volunteer", volunteer.id.clone()))
        .bind(("expected", volunteer.task_status))
        .bind(("next", next))
        .bind(("now", time_now()))
        .await?;
    commit(response)?;

    deliver(
        state.mailer.as_ref(),
        messages::shelter_assigned(&volunteer.email, &shelter.name),
    )
    .await;
    info!("volunteer {} assigned to shelter {}", volunteer.id, shelter.id);
    Ok(Json(fetch(&state.sdb, &shelter.id).await?))
}

// ! volunteer

pub async fn my_shelter(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Shelter>> {
    let volunteer = volunteer_for_user(&state.sdb, &auth.id).await?;
    let shelter_id = volunteer.assigned_shelter.ok_or(Error::NotFound)?;
    Ok(Json(fetch(&state.sdb, &shelter_id).await?))
}

async fn shelter_duty(
    state: &AppState,
    auth: &AuthUser,
    shelter_id: String,
    next: DutyStatus,
) -> Result<Shelter> {
    let shelter_id = parse_record_id(SHELTER_TABLE, &shelter_id)?;
    let volunteer = volunteer_for_user(&state.sdb, &auth.id).await?;
    let shelter: Shelter = fetch(&state.sdb, &shelter_id).await?;
    if shelter.assigned_volunteer.as_ref() != Some(&volunteer.id) {
        return Err(Error::AccessDenied);
    }
    let current = shelter
        .task_status
        .ok_or_else(|| Error::BadRequest("shelter has no active duty".into()))?;
    let next = current.transition(next)?;
    volunteer.task_status.transition(next)?;

    // a finished or declined duty frees both sides
    let release = matches!(next, DutyStatus::Rejected | DutyStatus::Completed);
    let (shelter_update, volunteer_update) = if release {
        (
            "UPDATE $shelter SET assigned_volunteer = NONE, task_status = NONE, updated_at = $now;",
            "UPDATE $volunteer SET task_status = $next, assigned_shelter = NONE, updated_at = $now;",
        )
    } else {
        (
            "UPDATE $shelter SET task_status = $next, updated_at = $now;",
            "UPDATE $volunteer SET task_status = $next, updated_at = $now;",
        )
    };

    let response = state
        .sdb
        .query(format!(
            "BEGIN TRANSACTION;
            IF $shelter.assigned_volunteer != $volunteer OR $shelter.task_status != $expected {{ THROW \"{}\" }};
            IF $volunteer.task_status != $volunteer_expected {{ THROW \"{}\" }};
            {shelter_update}
            {volunteer_update}
            COMMIT TRANSACTION;",
            stale(Stale::Shelter),
            stale(Stale::Volunteer),
        ))
        .bind(("shelter", shelter.id.clone()))
        .bind(("volunteer", volunteer.id.clone()))
        .bind(("expected", current))
        .bind(("volunteer_expected", volunteer.task_status))
        .bind(("next", next))
        .bind(("now", time_now()))
        .await?;
    commit(response)?;

    info!("volunteer {} shelter duty at {} is now {:?}", volunteer.id, shelter.id, next);
    fetch(&state.sdb, &shelter.id).await
}

pub async fn accept_shelter_duty(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(shelter_id): Path<String>,
) -> Result<Json<Shelter>> {
    Ok(Json(
        shelter_duty(&state, &auth, shelter_id, DutyStatus::Accepted).await?,
    ))
}

pub async fn reject_shelter_duty(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(shelter_id): Path<String>,
) -> Result<Json<Shelter>> {
    Ok(Json(
        shelter_duty(&state, &auth, shelter_id, DutyStatus::Rejected).await?,
    ))
}

pub async fn complete_shelter_duty(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(shelter_id): Path<String>,
) -> Result<Json<Shelter>> {
    Ok(Json(
        shelter_duty(&state, &auth, shelter_id, DutyStatus::Completed).await?,
    ))
}
