use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use surrealdb::{RecordId, Surreal, engine::any::Any};
use tracing::info;
use validator::Validate;

use crate::{
    consts::tables::{PROGRESS_TABLE, USER_TABLE, VOLUNTEER_TABLE},
    db::{Stale, commit, fetch, find_user_by_email, stale},
    errors::{Error, Result},
    middleware::AuthUser,
    models::{
        lifecycle::{ApplicationStatus, DutyStatus, Lifecycle, TaskStatus},
        task::Task,
        user::{CreateUser, Role},
        volunteer::{CreateVolunteer, Documents, Volunteer, normalize_skills},
    },
    notify::{deliver, messages},
    state::AppState,
    utils::{
        ids::new_record_id,
        pwd::hash_password,
        record_id::parse_record_id,
        time::time_now,
        validated_form::{QueryParams, ValidatedJson},
        validator::{validate_not_blank, validate_password, validate_skills},
    },
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct VolunteerSignUpRequest {
    #[validate(length(min = 2, max = 100), custom(function = "validate_not_blank"))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(custom(function = "validate_password"))]
    pub password: String,
    #[validate(length(min = 5, max = 20))]
    pub phone: String,
    #[validate(length(min = 1), custom(function = "validate_skills"))]
    pub skills: Vec<String>,
    /// Both proofs are mandatory; a missing object fails deserialization with 400 as well.
    #[validate(nested)]
    pub documents: Documents,
}

pub async fn volunteer_sign_up(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<VolunteerSignUpRequest>,
) -> Result<(StatusCode, Json<Volunteer>)> {
    if find_user_by_email(&state.sdb, &input.email).await?.is_some() {
        return Err(Error::EmailExist(input.email));
    }
    let now = time_now();
    let user_id = new_record_id(USER_TABLE);
    let volunteer_id = new_record_id(VOLUNTEER_TABLE);
    let user = CreateUser::new(
        input.name,
        input.email,
        hash_password(&input.password)?,
        Role::Volunteer,
        false,
    );
    let volunteer = CreateVolunteer {
        user: user_id.clone(),
        name: user.name.clone(),
        email: user.email.clone(),
        phone: input.phone.trim().to_string(),
        skills: normalize_skills(input.skills),
        documents: input.documents,
        application_status: ApplicationStatus::Pending,
        task_status: DutyStatus::Available,
        created_at: now,
    };
    let email = user.email.clone();

    let response = state
        .sdb
        .query(
            "BEGIN TRANSACTION;
            CREATE $user_id CONTENT $user;
            CREATE $volunteer_id CONTENT $volunteer;
            COMMIT TRANSACTION;",
        )
        .bind(("user_id", user_id))
        .bind(("user", user))
        .bind(("volunteer_id", volunteer_id.clone()))
        .bind(("volunteer", volunteer))
        .await?;
    commit(response).map_err(|e| match e {
        Error::SurrealError(err) if err.to_string().contains("users_email") => {
            Error::EmailExist(email.clone())
        }
        other => other,
    })?;

    let volunteer: Volunteer = fetch(&state.sdb, &volunteer_id).await?;
    info!("volunteer application {} received", volunteer.id);
    Ok((StatusCode::CREATED, Json(volunteer)))
}

pub async fn volunteer_for_user(sdb: &Surreal<Any>, user: &RecordId) -> Result<Volunteer> {
    sdb.query("SELECT * FROM type::table($table) WHERE user = $user;")
        .bind(("table", VOLUNTEER_TABLE))
        .bind(("user", user.clone()))
        .await?
        .take::<Vec<Volunteer>>(0)?
        .into_iter()
        .next()
        .ok_or(Error::NotFound)
}

pub async fn my_profile(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Volunteer>> {
    Ok(Json(volunteer_for_user(&state.sdb, &auth.id).await?))
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateSkillsRequest {
    #[validate(length(min = 1), custom(function = "validate_skills"))]
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
struct SkillsPatch {
    skills: std::collections::BTreeSet<String>,
    updated_at: String,
}

pub async fn update_skills(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(input): ValidatedJson<UpdateSkillsRequest>,
) -> Result<Json<Volunteer>> {
    let volunteer = volunteer_for_user(&state.sdb, &auth.id).await?;
    let patch = SkillsPatch {
        skills: normalize_skills(input.skills),
        updated_at: time_now(),
    };
    let volunteer = state
        .sdb
        .update::<Option<Volunteer>>(volunteer.id)
        .merge(patch)
        .await?
        .ok_or(Error::NotFound)?;
    Ok(Json(volunteer))
}

// ! admin

#[derive(Debug, Clone, Deserialize)]
pub struct ListVolunteersQuery {
    pub status: Option<ApplicationStatus>,
}

pub async fn list_volunteers(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ListVolunteersQuery>,
) -> Result<Json<Vec<Volunteer>>> {
    let volunteers = match query.status {
        Some(status) => state
            .sdb
            .query("SELECT * FROM type::table($table) WHERE application_status = $status ORDER BY created_at;")
            .bind(("table", VOLUNTEER_TABLE))
            .bind(("status", status))
            .await?
            .take::<Vec<Volunteer>>(0)?,
        None => state
            .sdb
            .query("SELECT * FROM type::table($table) ORDER BY created_at;")
            .bind(("table", VOLUNTEER_TABLE))
            .await?
            .take::<Vec<Volunteer>>(0)?,
    };
    Ok(Json(volunteers))
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailableQuery {
    pub skill: Option<String>,
}

/// Approved volunteers free for a new task or shelter duty.
pub async fn available_volunteers(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<AvailableQuery>,
) -> Result<Json<Vec<Volunteer>>> {
    let skill = query.skill.map(|s| s.trim().to_lowercase());
    let volunteers = state
        .sdb
        .query("SELECT * FROM type::table($table) WHERE application_status = $status ORDER BY created_at;")
        .bind(("table", VOLUNTEER_TABLE))
        .bind(("status", ApplicationStatus::Approved))
        .await?
        .take::<Vec<Volunteer>>(0)?
        .into_iter()
        .filter(Volunteer::is_assignable)
        .filter(|v| skill.as_ref().is_none_or(|s| v.skills.contains(s)))
        .collect();
    Ok(Json(volunteers))
}

pub async fn approve_volunteer(
    State(state): State<AppState>,
    Path(volunteer_id): Path<String>,
) -> Result<Json<Volunteer>> {
    let volunteer_id = parse_record_id(VOLUNTEER_TABLE, &volunteer_id)?;
    let volunteer: Volunteer = fetch(&state.sdb, &volunteer_id).await?;
    let next = volunteer
        .application_status
        .transition(ApplicationStatus::Approved)?;

    let response = state
        .sdb
        .query(format!(
            "BEGIN TRANSACTION;
            IF $volunteer.application_status != $expected {{ THROW \"{}\" }};
            UPDATE $volunteer SET application_status = $next, updated_at = $now;
            UPDATE $user SET approved = true, updated_at = $now;
            COMMIT TRANSACTION;",
            stale(Stale::Volunteer)
        ))
        .bind(("volunteer", volunteer.id.clone()))
        .bind(("user", volunteer.user.clone()))
        .bind(("expected", volunteer.application_status))
        .bind(("next", next))
        .bind(("now", time_now()))
        .await?;
    commit(response)?;

    deliver(
        state.mailer.as_ref(),
        messages::volunteer_approved(&volunteer.email, &volunteer.name),
    )
    .await;
    info!("volunteer {} approved", volunteer.id);
    Ok(Json(fetch(&state.sdb, &volunteer.id).await?))
}

/// Rejection removes the application and its account.
pub async fn reject_volunteer(
    State(state): State<AppState>,
    Path(volunteer_id): Path<String>,
) -> Result<StatusCode> {
    let volunteer_id = parse_record_id(VOLUNTEER_TABLE, &volunteer_id)?;
    let volunteer: Volunteer = fetch(&state.sdb, &volunteer_id).await?;
    volunteer
        .application_status
        .transition(ApplicationStatus::Rejected)?;

    let response = state
        .sdb
        .query(format!(
            "BEGIN TRANSACTION;
            IF $volunteer.application_status != $expected {{ THROW \"{}\" }};
            DELETE $volunteer;
            DELETE $user;
            COMMIT TRANSACTION;",
            stale(Stale::Volunteer)
        ))
        .bind(("volunteer", volunteer.id.clone()))
        .bind(("user", volunteer.user.clone()))
        .bind(("expected", volunteer.application_status))
        .await?;
    commit(response)?;

    deliver(
        state.mailer.as_ref(),
        messages::volunteer_rejected(&volunteer.email, &volunteer.name),
    )
    .await;
    info!("volunteer {} rejected and removed", volunteer.id);
    Ok(StatusCode::NO_CONTENT)
}

/// Takes a volunteer off the task or shelter duty they hold. A held task goes
/// back to `rejected` (its progress is discarded) so it can be reassigned.
pub async fn release_volunteer(
    State(state): State<AppState>,
    Path(volunteer_id): Path<String>,
) -> Result<Json<Volunteer>> {
    let volunteer_id = parse_record_id(VOLUNTEER_TABLE, &volunteer_id)?;
    let volunteer: Volunteer = fetch(&state.sdb, &volunteer_id).await?;
    let next = volunteer.task_status.transition(DutyStatus::Available)?;

    let mut guards = vec!["$volunteer.task_status != $expected".to_string()];
    let mut statements = Vec::new();
    let task = match &volunteer.assigned_task {
        Some(task_id) => {
            let task: Task = fetch(&state.sdb, task_id).await?;
            let task_next = task.status.transition(TaskStatus::Rejected)?;
            guards.push("$volunteer.assigned_task != $task".into());
            statements.push(format!(
                "IF $task.status != $task_expected OR $task.volunteer != $volunteer {{ THROW \"{}\" }};
                UPDATE $task SET status = $task_next, updated_at = $now;
                DELETE type::table($progress_table) WHERE task = $task;",
                stale(Stale::Task)
            ));
            Some((task, task_next))
        }
        None => {
            guards.push("$volunteer.assigned_task != NONE".into());
            None
        }
    };
    match &volunteer.assigned_shelter {
        Some(_) => {
            guards.push("$volunteer.assigned_shelter != $shelter".into());
            statements.push(format!(
                "IF $shelter.assigned_volunteer != $volunteer {{ THROW \"{}\" }};
                UPDATE $shelter SET assigned_volunteer = NONE, task_status = NONE, updated_at = $now;",
                stale(Stale::Shelter)
            ));
        }
        None => guards.push("$volunteer.assigned_shelter != NONE".into()),
    }

    let mut query = state
        .sdb
        .query(format!(
            "BEGIN TRANSACTION;
            IF {} {{ THROW \"{}\" }};
            {}
            UPDATE $volunteer SET task_status = $next, assigned_task = NONE, assigned_shelter = NONE, updated_at = $now;
            COMMIT TRANSACTION;",
            guards.join(" OR "),
            stale(Stale::Volunteer),
            statements.join("\n"),
        ))
        .bind(("volunteer", volunteer.id.clone()))
        .bind(("expected", volunteer.task_status))
        .bind(("next", next))
        .bind(("now", time_now()));
    if let Some((task, task_next)) = &task {
        query = query
            .bind(("task", task.id.clone()))
            .bind(("task_expected", task.status))
            .bind(("task_next", *task_next))
            .bind(("progress_table", PROGRESS_TABLE));
    }
    if let Some(shelter) = &volunteer.assigned_shelter {
        query = query.bind(("shelter", shelter.clone()));
    }
    commit(query.await?)?;

    info!("volunteer {} released from duty", volunteer.id);
    Ok(Json(fetch(&state.sdb, &volunteer.id).await?))
}
