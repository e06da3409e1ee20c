use std::{sync::Arc, time::Duration};

use axum::{
    Json, Router,
    middleware::{from_fn, from_fn_with_state},
    routing::{delete, get, patch, post},
};
use serde_json::{Value, json};
use tower_governor::{
    GovernorLayer, governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor,
};
use tracing::{info, warn};

use crate::{
    middleware::{auth_jwt_middleware, require_admin, require_volunteer},
    state::AppState,
};

pub mod admin;
pub mod auth;
pub mod donations;
pub mod incidents;
pub mod resources;
pub mod shelters;
pub mod tasks;
pub mod volunteers;

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Everything under `/api`.
pub fn api_router(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(credentials(state.clone()))
        .merge(public(state.clone()))
        .merge(authenticated(state.clone()))
        .nest("/volunteer", volunteer(state.clone()))
        .nest("/admin", admin(state.clone()))
        .with_state(state)
}

/// Sign-in and sign-up, throttled per client IP.
fn credentials(state: AppState) -> Router<AppState> {
    let router = Router::new()
        .route("/auth/signin", post(auth::sign_in))
        .route("/auth/signup", post(auth::sign_up))
        .route("/volunteers/signup", post(volunteers::volunteer_sign_up));

    let burst = state.config.auth_rate_burst;
    if burst == 0 {
        warn!("rate limiting for credentials routes is disabled");
        return router.with_state(state);
    }
    let Some(governor_conf) = GovernorConfigBuilder::default()
        .per_second(60)
        .burst_size(burst)
        .key_extractor(SmartIpKeyExtractor)
        .finish()
    else {
        warn!("invalid rate limit burst {burst}, credentials routes are not throttled");
        return router.with_state(state);
    };
    let governor_conf = Arc::new(governor_conf);
    let governor_limiter = governor_conf.limiter().clone();
    let interval = Duration::from_secs(60);
    // prune limiter state in the background
    std::thread::spawn(move || {
        loop {
            std::thread::sleep(interval);
            info!("rate limiting storage size: {}", governor_limiter.len());
            governor_limiter.retain_recent();
        }
    });

    router
        .layer(GovernorLayer {
            config: governor_conf,
        })
        .with_state(state)
}

fn public(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/incidents", get(incidents::list_incidents))
        .route("/incidents/severity-levels", get(incidents::severity_levels))
        .route("/shelters", get(shelters::list_shelters))
        .route("/shelters/{shelter_id}", get(shelters::read_shelter))
        .route("/campaigns", get(donations::list_campaigns))
        .route("/campaigns/{campaign_id}", get(donations::read_campaign))
        .route("/resources", get(resources::list_resource_types))
        .route("/contributions", post(resources::submit_contribution))
        .route("/donations/webhook", post(donations::donation_webhook))
        .with_state(state)
}

fn authenticated(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/auth/me", get(auth::me))
        .route("/incidents", post(incidents::report_incident))
        .route("/incidents/{incident_id}", get(incidents::read_incident))
        .layer(from_fn_with_state(state.clone(), auth_jwt_middleware))
        .with_state(state)
}

fn volunteer(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/me", get(volunteers::my_profile))
        .route("/me/skills", patch(volunteers::update_skills))
        .route("/tasks", get(tasks::my_tasks))
        .route("/tasks/{task_id}/accept", post(tasks::accept_task))
        .route("/tasks/{task_id}/reject", post(tasks::reject_task))
        .route(
            "/tasks/{task_id}/progress",
            get(tasks::read_progress).post(tasks::update_progress),
        )
        .route("/shelter", get(shelters::my_shelter))
        .route("/shelters/{shelter_id}/accept", post(shelters::accept_shelter_duty))
        .route("/shelters/{shelter_id}/reject", post(shelters::reject_shelter_duty))
        .route(
            "/shelters/{shelter_id}/complete",
            post(shelters::complete_shelter_duty),
        )
        .layer(from_fn(require_volunteer))
        .layer(from_fn_with_state(state.clone(), auth_jwt_middleware))
        .with_state(state)
}

fn admin(state: AppState) -> Router<AppState> {
    Router::new()
        // ! volunteers
        .route("/volunteers", get(volunteers::list_volunteers))
        .route("/volunteers/available", get(volunteers::available_volunteers))
        .route(
            "/volunteers/{volunteer_id}/approve",
            post(volunteers::approve_volunteer),
        )
        .route(
            "/volunteers/{volunteer_id}/reject",
            post(volunteers::reject_volunteer),
        )
        .route(
            "/volunteers/{volunteer_id}/release",
            post(volunteers::release_volunteer),
        )
        // ! incidents
        .route("/incidents/{incident_id}", delete(incidents::delete_incident))
        .route(
            "/incidents/{incident_id}/verify",
            post(incidents::verify_incident),
        )
        .route(
            "/incidents/{incident_id}/complete",
            post(incidents::complete_incident),
        )
        // ! shelters
        .route("/shelters", post(shelters::create_shelter))
        .route(
            "/shelters/{shelter_id}",
            patch(shelters::update_shelter).delete(shelters::delete_shelter),
        )
        .route("/shelters/{shelter_id}/inmates", patch(shelters::update_inmates))
        .route(
            "/shelters/{shelter_id}/assign",
            post(shelters::assign_shelter_volunteer),
        )
        // ! resources
        .route("/resources", post(resources::create_resource_type))
        .route(
            "/resources/{resource_id}",
            patch(resources::update_resource_type),
        )
        .route("/contributions", get(resources::list_contributions))
        .route(
            "/contributions/{contribution_id}/verify",
            post(resources::verify_contribution),
        )
        .route(
            "/contributions/{contribution_id}/reject",
            post(resources::reject_contribution),
        )
        .route(
            "/allocations",
            post(resources::create_allocation).get(resources::list_allocations),
        )
        .route("/allocations/summary", get(resources::allocation_summary))
        // ! tasks
        .route("/tasks", post(tasks::create_task).get(tasks::list_tasks))
        .route("/tasks/{task_id}", get(tasks::read_task))
        .route("/tasks/{task_id}/reassign", post(tasks::reassign_task))
        // ! donations
        .route("/campaigns", post(donations::create_campaign))
        .route(
            "/campaigns/{campaign_id}/close",
            post(donations::close_campaign),
        )
        .route("/donations", get(donations::list_donations))
        .route("/stats", get(admin::stats))
        .layer(from_fn(require_admin))
        .layer(from_fn_with_state(state.clone(), auth_jwt_middleware))
        .with_state(state)
}
