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
    consts::tables::{
        INCIDENT_TABLE, PROGRESS_TABLE, SHELTER_TABLE, TASK_TABLE, VOLUNTEER_TABLE,
    },
    db::{VOLUNTEER_UNAVAILABLE, Stale, commit, fetch, stale},
    errors::{Error, Result},
    middleware::AuthUser,
    models::{
        incident::Incident,
        lifecycle::{ApplicationStatus, DutyStatus, IncidentStatus, Lifecycle, TaskStatus},
        progress::{CreateTaskProgress, ProgressCounters, ProgressUpdate, TaskProgress},
        shelter::Shelter,
        task::{CreateTask, Task, TaskDetails, validate_task_details},
        volunteer::Volunteer,
    },
    notify::{deliver, messages},
    routes::volunteers::volunteer_for_user,
    state::AppState,
    utils::{
        ids::new_record_id, record_id::parse_record_id, time::time_now,
        validated_form::{QueryParams, ValidatedJson}, validator::validate_not_blank,
    },
};

async fn progress_for_task(sdb: &Surreal<Any>, task: &RecordId) -> Result<Option<TaskProgress>> {
    Ok(sdb
        .query("SELECT * FROM type::table($table) WHERE task = $task;")
        .bind(("table", PROGRESS_TABLE))
        .bind(("task", task.clone()))
        .await?
        .take::<Vec<TaskProgress>>(0)?
        .into_iter()
        .next())
}

fn ensure_assignable(volunteer: &Volunteer) -> Result<DutyStatus> {
    if volunteer.application_status != ApplicationStatus::Approved || !volunteer.is_assignable() {
        return Err(Error::VolunteerUnavailable);
    }
    volunteer.task_status.transition(DutyStatus::Assigned)
}

/// Links a volunteer to a task that is being created (`CREATE`) or handed over (`UPDATE`).
fn assignment_query(task_statement: &str) -> String {
    format!(
        "BEGIN TRANSACTION;
        IF $volunteer.task_status != $expected OR $volunteer.assigned_task != NONE OR $volunteer.assigned_shelter != NONE {{ THROW \"{VOLUNTEER_UNAVAILABLE}\" }};
        {task_statement}
        UPDATE $volunteer SET task_status = $next, assigned_task = $task, updated_at = $now;
        COMMIT TRANSACTION;"
    )
}

// ! admin

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(min = 3, max = 200), custom(function = "validate_not_blank"))]
    pub title: String,
    #[validate(length(max = 5000))]
    #[serde(default)]
    pub description: String,
    #[validate(custom(function = "validate_task_details"))]
    pub details: TaskDetails,
    pub incident_id: Option<String>,
    pub shelter_id: Option<String>,
    #[validate(length(min = 1))]
    pub volunteer_id: String,
}

pub async fn create_task(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(input): ValidatedJson<CreateTaskRequest>,
) -> Result<(StatusCode, Json<Task>)> {
    let volunteer_id = parse_record_id(VOLUNTEER_TABLE, &input.volunteer_id)?;
    let volunteer: Volunteer = fetch(&state.sdb, &volunteer_id).await?;
    let next = ensure_assignable(&volunteer)?;

    let incident = match input.incident_id {
        Some(raw) => {
            let incident: Incident =
                fetch(&state.sdb, &parse_record_id(INCIDENT_TABLE, &raw)?).await?;
            if matches!(incident.status, IncidentStatus::Deleted | IncidentStatus::Completed) {
                return Err(Error::BadRequest(format!(
                    "incident {} is closed",
                    incident.id
                )));
            }
            Some(incident.id)
        }
        None => None,
    };
    let shelter = match input.shelter_id {
        Some(raw) => {
            let shelter: Shelter = fetch(&state.sdb, &parse_record_id(SHELTER_TABLE, &raw)?).await?;
            Some(shelter.id)
        }
        None => None,
    };

    let task_id = new_record_id(TASK_TABLE);
    let now = time_now();
    let task_data = CreateTask {
        title: input.title.trim().to_string(),
        description: input.description,
        kind: input.details.kind(),
        details: input.details,
        incident,
        shelter,
        volunteer: volunteer.id.clone(),
        status: TaskStatus::Assigned,
        assigned_by: auth.id,
        created_at: now.clone(),
    };
    let title = task_data.title.clone();

    let response = state
        .sdb
        .query(assignment_query("CREATE $task CONTENT $task_data;"))
        .bind(("task", task_id.clone()))
        .bind(("task_data", task_data))
        .bind(("volunteer", volunteer.id.clone()))
        .bind(("expected", volunteer.task_status))
        .bind(("next", next))
        .bind(("now", now))
        .await?;
    commit(response)?;

    deliver(
        state.mailer.as_ref(),
        messages::task_assigned(&volunteer.email, &title),
    )
    .await;
    let task: Task = fetch(&state.sdb, &task_id).await?;
    info!("task {} ({:?}) assigned to {}", task.id, task.kind, volunteer.id);
    Ok((StatusCode::CREATED, Json(task)))
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListTasksQuery {
    pub status: Option<TaskStatus>,
}

pub async fn list_tasks(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ListTasksQuery>,
) -> Result<Json<Vec<Task>>> {
    let tasks = match query.status {
        Some(status) => state
            .sdb
            .query("SELECT * FROM type::table($table) WHERE status = $status ORDER BY created_at DESC;")
            .bind(("table", TASK_TABLE))
            .bind(("status", status))
            .await?
            .take::<Vec<Task>>(0)?,
        None => state
            .sdb
            .query("SELECT * FROM type::table($table) ORDER BY created_at DESC;")
            .bind(("table", TASK_TABLE))
            .await?
            .take::<Vec<Task>>(0)?,
    };
    Ok(Json(tasks))
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskWithProgress {
    pub task: Task,
    pub progress: Option<TaskProgress>,
}

pub async fn read_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
) -> Result<Json<TaskWithProgress>> {
    let task_id = parse_record_id(TASK_TABLE, &task_id)?;
    let task: Task = fetch(&state.sdb, &task_id).await?;
    let progress = progress_for_task(&state.sdb, &task.id).await?;
    Ok(Json(TaskWithProgress { task, progress }))
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ReassignTaskRequest {
    #[validate(length(min = 1))]
    pub volunteer_id: String,
}

/// Hands a rejected task to another volunteer.
pub async fn reassign_task(
    State(state): State<AppState>,
    Path(task_id): Path<String>,
    ValidatedJson(input): ValidatedJson<ReassignTaskRequest>,
) -> Result<Json<Task>> {
    let task_id = parse_record_id(TASK_TABLE, &task_id)?;
    let volunteer_id = parse_record_id(VOLUNTEER_TABLE, &input.volunteer_id)?;
    let task: Task = fetch(&state.sdb, &task_id).await?;
    let volunteer: Volunteer = fetch(&state.sdb, &volunteer_id).await?;
    let task_next = task.status.transition(TaskStatus::Assigned)?;
    let next = ensure_assignable(&volunteer)?;

    let task_statement = format!(
        "IF $task.status != $task_expected {{ THROW \"{}\" }};
        UPDATE $task SET status = $task_next, volunteer = $volunteer, updated_at = $now;",
        stale(Stale::Task)
    );
    let response = state
        .sdb
        .query(assignment_query(&task_statement))
        .bind(("task", task.id.clone()))
        .bind(("task_expected", task.status))
        .bind(("task_next", task_next))
        .bind(("volunteer", volunteer.id.clone()))
        .bind(("expected", volunteer.task_status))
        .bind(("next", next))
        .bind(("now", time_now()))
        .await?;
    commit(response)?;

    deliver(
        state.mailer.as_ref(),
        messages::task_assigned(&volunteer.email, &task.title),
    )
    .await;
    info!("task {} reassigned to {}", task.id, volunteer.id);
    Ok(Json(fetch(&state.sdb, &task.id).await?))
}

// ! volunteer

pub async fn my_tasks(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Vec<Task>>> {
    let volunteer = volunteer_for_user(&state.sdb, &auth.id).await?;
    let tasks = state
        .sdb
        .query("SELECT * FROM type::table($table) WHERE volunteer = $volunteer ORDER BY created_at DESC;")
        .bind(("table", TASK_TABLE))
        .bind(("volunteer", volunteer.id))
        .await?
        .take::<Vec<Task>>(0)?;
    Ok(Json(tasks))
}

async fn owned_task(state: &AppState, auth: &AuthUser, task_id: &str) -> Result<(Volunteer, Task)> {
    let task_id = parse_record_id(TASK_TABLE, task_id)?;
    let volunteer = volunteer_for_user(&state.sdb, &auth.id).await?;
    let task: Task = fetch(&state.sdb, &task_id).await?;
    if task.volunteer != volunteer.id {
        return Err(Error::AccessDenied);
    }
    Ok((volunteer, task))
}

pub async fn accept_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<String>,
) -> Result<Json<TaskWithProgress>> {
    let (volunteer, task) = owned_task(&state, &auth, &task_id).await?;
    let task_next = task.status.transition(TaskStatus::Accepted)?;
    let next = volunteer.task_status.transition(DutyStatus::Accepted)?;
    let now = time_now();
    let progress = CreateTaskProgress::start(task.id.clone(), volunteer.id.clone(), task.kind, now.clone());

    let response = state
        .sdb
        .query(format!(
            "BEGIN TRANSACTION;
            IF $task.status != $task_expected OR $task.volunteer != $volunteer {{ THROW \"{}\" }};
            IF $volunteer.task_status != $expected {{ THROW \"{}\" }};
            UPDATE $task SET status = $task_next, updated_at = $now;
            UPDATE $volunteer SET task_status = $next, updated_at = $now;
            CREATE $progress CONTENT $progress_data;
            COMMIT TRANSACTION;",
            stale(Stale::Task),
            stale(Stale::Volunteer),
        ))
        .bind(("task", task.id.clone()))
        .bind(("task_expected", task.status))
        .bind(("task_next", task_next))
        .bind(("volunteer", volunteer.id.clone()))
        .bind(("expected", volunteer.task_status))
        .bind(("next", next))
        .bind(("progress", new_record_id(PROGRESS_TABLE)))
        .bind(("progress_data", progress))
        .bind(("now", now))
        .await?;
    commit(response)?;

    info!("volunteer {} accepted task {}", volunteer.id, task.id);
    let task: Task = fetch(&state.sdb, &task.id).await?;
    let progress = progress_for_task(&state.sdb, &task.id).await?;
    Ok(Json(TaskWithProgress { task, progress }))
}

pub async fn reject_task(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<String>,
) -> Result<Json<Task>> {
    let (volunteer, task) = owned_task(&state, &auth, &task_id).await?;
    let task_next = task.status.transition(TaskStatus::Rejected)?;
    let next = volunteer.task_status.transition(DutyStatus::Rejected)?;

    let response = state
        .sdb
        .query(format!(
            "BEGIN TRANSACTION;
            IF $task.status != $task_expected OR $task.volunteer != $volunteer {{ THROW \"{}\" }};
            IF $volunteer.task_status != $expected {{ THROW \"{}\" }};
            UPDATE $task SET status = $task_next, updated_at = $now;
            UPDATE $volunteer SET task_status = $next, assigned_task = NONE, updated_at = $now;
            COMMIT TRANSACTION;",
            stale(Stale::Task),
            stale(Stale::Volunteer),
        ))
        .bind(("task", task.id.clone()))
        .bind(("task_expected", task.status))
        .bind(("task_next", task_next))
        .bind(("volunteer", volunteer.id.clone()))
        .bind(("expected", volunteer.task_status))
        .bind(("next", next))
        .bind(("now", time_now()))
        .await?;
    commit(response)?;

    info!("volunteer {} rejected task {}", volunteer.id, task.id);
    Ok(Json(fetch(&state.sdb, &task.id).await?))
}

pub async fn read_progress(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<String>,
) -> Result<Json<TaskProgress>> {
    let (_, task) = owned_task(&state, &auth, &task_id).await?;
    Ok(Json(
        progress_for_task(&state.sdb, &task.id)
            .await?
            .ok_or(Error::NotFound)?,
    ))
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProgressRequest {
    #[validate(range(max = 100))]
    pub progress_percentage: u8,
    #[validate(length(max = 2000))]
    pub note: Option<String>,
    pub counters: Option<ProgressCounters>,
    #[serde(default)]
    pub completed: bool,
}

/// Saves progress; with `completed` it also closes the task and frees the volunteer.
pub async fn update_progress(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(task_id): Path<String>,
    ValidatedJson(input): ValidatedJson<ProgressRequest>,
) -> Result<Json<TaskWithProgress>> {
    let (volunteer, task) = owned_task(&state, &auth, &task_id).await?;
    if task.status != TaskStatus::Accepted {
        return Err(Error::InvalidTransition {
            entity: "task",
            from: format!("{:?}", task.status),
            to: "progress update".to_string(),
        });
    }
    let progress = progress_for_task(&state.sdb, &task.id)
        .await?
        .ok_or(Error::NotFound)?;
    let now = time_now();
    let patch = progress.apply(
        task.kind,
        ProgressUpdate {
            progress_percentage: input.progress_percentage,
            note: input.note,
            counters: input.counters,
            completed: input.completed,
        },
        &now,
    )?;

    let response = if patch.completed {
        let task_next = task.status.transition(TaskStatus::Completed)?;
        let next = volunteer.task_status.transition(DutyStatus::Completed)?;
        state
            .sdb
            .query(format!(
                "BEGIN TRANSACTION;
                IF $task.status != $task_expected {{ THROW \"{}\" }};
                IF $volunteer.task_status != $expected {{ THROW \"{}\" }};
                UPDATE $progress MERGE $patch;
                UPDATE $task SET status = $task_next, updated_at = $now;
                UPDATE $volunteer SET task_status = $next, assigned_task = NONE, updated_at = $now;
                COMMIT TRANSACTION;",
                stale(Stale::Task),
                stale(Stale::Volunteer),
            ))
            .bind(("progress", progress.id.clone()))
            .bind(("patch", patch))
            .bind(("task", task.id.clone()))
            .bind(("task_expected", task.status))
            .bind(("task_next", task_next))
            .bind(("volunteer", volunteer.id.clone()))
            .bind(("expected", volunteer.task_status))
            .bind(("next", next))
            .bind(("now", now))
            .await?
    } else {
        state
            .sdb
            .query(format!(
                "BEGIN TRANSACTION;
                IF $progress.completed = true {{ THROW \"{}\" }};
                UPDATE $progress MERGE $patch;
                COMMIT TRANSACTION;",
                stale(Stale::Task),
            ))
            .bind(("progress", progress.id.clone()))
            .bind(("patch", patch))
            .await?
    };
    commit(response)?;

    let task: Task = fetch(&state.sdb, &task.id).await?;
    let progress: TaskProgress = fetch(&state.sdb, &progress.id).await?;
    info!(
        "task {} progress {}%{}",
        task.id,
        progress.progress_percentage,
        if progress.completed { " (completed)" } else { "" }
    );
    Ok(Json(TaskWithProgress {
        task,
        progress: Some(progress),
    }))
}
