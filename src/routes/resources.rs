use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};
use surrealdb::{Surreal, engine::any::Any};
use tracing::{info, warn};
use validator::Validate;

use crate::{
    consts::tables::{
        ALLOCATION_TABLE, CAMPAIGN_TABLE, CONTRIBUTION_TABLE, RESOURCE_TABLE, SHELTER_TABLE,
    },
    db::{Stale, commit, fetch, stale},
    errors::{Error, Result},
    middleware::AuthUser,
    models::{
        lifecycle::{Lifecycle, VerificationStatus},
        resource::{
            Allocation, AllocationSummary, Contribution, CreateAllocation, CreateContribution,
            CreateResourceType, ResourceType,
        },
        shelter::Shelter,
        user::normalize_email,
    },
    state::AppState,
    utils::{
        ids::new_record_id, record_id::parse_record_id, time::time_now,
        validated_form::{QueryParams, ValidatedJson}, validator::validate_not_blank,
    },
};

// ! resource types

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateResourceRequest {
    #[validate(length(min = 2, max = 100), custom(function = "validate_not_blank"))]
    pub name: String,
    #[validate(length(min = 2, max = 100))]
    pub category: String,
    #[validate(length(min = 1, max = 30))]
    pub unit: String,
    #[validate(range(min = 0))]
    pub unit_cost: i64,
    #[validate(range(min = 0))]
    #[serde(default)]
    pub quantity_available: i64,
}

async fn resource_named(sdb: &Surreal<Any>, name: &str) -> Result<Option<ResourceType>> {
    Ok(sdb
        .query("SELECT * FROM type::table($table) WHERE name = $name;")
        .bind(("table", RESOURCE_TABLE))
        .bind(("name", name.to_string()))
        .await?
        .take::<Vec<ResourceType>>(0)?
        .into_iter()
        .next())
}

fn duplicate_name(name: String) -> impl FnOnce(Error) -> Error {
    move |e| match e {
        Error::SurrealError(err) if err.to_string().contains("resources_name") => {
            Error::AlreadyExists(format!("resource `{name}`"))
        }
        other => other,
    }
}

pub async fn create_resource_type(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateResourceRequest>,
) -> Result<(StatusCode, Json<ResourceType>)> {
    let name = input.name.trim().to_string();
    if resource_named(&state.sdb, &name).await?.is_some() {
        return Err(Error::AlreadyExists(format!("resource `{name}`")));
    }
    let resource = state
        .sdb
        .create::<Option<ResourceType>>(RESOURCE_TABLE)
        .content(CreateResourceType {
            name: name.clone(),
            category: input.category.trim().to_lowercase(),
            unit: input.unit.trim().to_string(),
            unit_cost: input.unit_cost,
            quantity_available: input.quantity_available,
            created_at: time_now(),
        })
        .await
        .map_err(|e| duplicate_name(name)(e.into()))?
        .ok_or(Error::InternalServerError)?;
    info!("resource type {} ({}) created", resource.id, resource.name);
    Ok((StatusCode::CREATED, Json(resource)))
}

pub async fn list_resource_types(State(state): State<AppState>) -> Result<Json<Vec<ResourceType>>> {
    let resources = state
        .sdb
        .query("SELECT * FROM type::table($table) ORDER BY category, name;")
        .bind(("table", RESOURCE_TABLE))
        .await?
        .take::<Vec<ResourceType>>(0)?;
    Ok(Json(resources))
}

/// Stock is not editable here; it moves through contributions and allocations.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateResourceRequest {
    #[validate(length(min = 2, max = 100), custom(function = "validate_not_blank"))]
    pub name: Option<String>,
    #[validate(length(min = 2, max = 100))]
    pub category: Option<String>,
    #[validate(length(min = 1, max = 30))]
    pub unit: Option<String>,
    #[validate(range(min = 0))]
    pub unit_cost: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
struct ResourcePatch {
    name: String,
    category: String,
    unit: String,
    unit_cost: i64,
    updated_at: String,
}

pub async fn update_resource_type(
    State(state): State<AppState>,
    Path(resource_id): Path<String>,
    ValidatedJson(input): ValidatedJson<UpdateResourceRequest>,
) -> Result<Json<ResourceType>> {
    let resource_id = parse_record_id(RESOURCE_TABLE, &resource_id)?;
    let resource: ResourceType = fetch(&state.sdb, &resource_id).await?;
    let name = input
        .name
        .map(|n| n.trim().to_string())
        .unwrap_or(resource.name.clone());
    if name != resource.name && resource_named(&state.sdb, &name).await?.is_some() {
        return Err(Error::AlreadyExists(format!("resource `{name}`")));
    }
    let patch = ResourcePatch {
        name: name.clone(),
        category: input
            .category
            .map(|c| c.trim().to_lowercase())
            .unwrap_or(resource.category),
        unit: input.unit.map(|u| u.trim().to_string()).unwrap_or(resource.unit),
        unit_cost: input.unit_cost.unwrap_or(resource.unit_cost),
        updated_at: time_now(),
    };
    let resource = state
        .sdb
        .update::<Option<ResourceType>>(resource.id)
        .merge(patch)
        .await
        .map_err(|e| duplicate_name(name)(e.into()))?
        .ok_or(Error::NotFound)?;
    Ok(Json(resource))
}

// ! contributions

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ContributionRequest {
    #[validate(length(min = 2, max = 100), custom(function = "validate_not_blank"))]
    pub contributor_name: String,
    #[validate(email)]
    pub contributor_email: String,
    #[validate(length(min = 1))]
    pub resource_id: String,
    #[validate(range(min = 1))]
    pub quantity: i64,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Open to everyone; signed-in contributors are linked to their account.
pub async fn submit_contribution(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    ValidatedJson(input): ValidatedJson<ContributionRequest>,
) -> Result<(StatusCode, Json<Contribution>)> {
    let resource_id = parse_record_id(RESOURCE_TABLE, &input.resource_id)?;
    let resource: ResourceType = fetch(&state.sdb, &resource_id).await?;
    let contribution = state
        .sdb
        .create::<Option<Contribution>>(CONTRIBUTION_TABLE)
        .content(CreateContribution {
            contributor_name: input.contributor_name.trim().to_string(),
            contributor_email: normalize_email(&input.contributor_email),
            contributor: auth.map(|a| a.id),
            resource: resource.id,
            quantity: input.quantity,
            notes: input.notes,
            status: VerificationStatus::Pending,
            created_at: time_now(),
        })
        .await?
        .ok_or(Error::InternalServerError)?;
    info!(
        "contribution {} of {} {} pending review",
        contribution.id, contribution.quantity, resource.name
    );
    Ok((StatusCode::CREATED, Json(contribution)))
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListContributionsQuery {
    pub status: Option<VerificationStatus>,
}

pub async fn list_contributions(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ListContributionsQuery>,
) -> Result<Json<Vec<Contribution>>> {
    let contributions = match query.status {
        Some(status) => state
            .sdb
            .query("SELECT * FROM type::table($table) WHERE status = $status ORDER BY created_at DESC;")
            .bind(("table", CONTRIBUTION_TABLE))
            .bind(("status", status))
            .await?
            .take::<Vec<Contribution>>(0)?,
        None => state
            .sdb
            .query("SELECT * FROM type::table($table) ORDER BY created_at DESC;")
            .bind(("table", CONTRIBUTION_TABLE))
            .await?
            .take::<Vec<Contribution>>(0)?,
    };
    Ok(Json(contributions))
}

async fn review_contribution(
    state: &AppState,
    auth: AuthUser,
    contribution_id: String,
    verdict: VerificationStatus,
) -> Result<Contribution> {
    let contribution_id = parse_record_id(CONTRIBUTION_TABLE, &contribution_id)?;
    let contribution: Contribution = fetch(&state.sdb, &contribution_id).await?;
    let next = contribution.status.transition(verdict)?;
    let restock = if next == VerificationStatus::Verified {
        "UPDATE $resource SET quantity_available += $quantity, updated_at = $now;"
    } else {
        ""
    };

    let response = state
        .sdb
        .query(format!(
            "BEGIN TRANSACTION;
            IF $contribution.status != $expected {{ THROW \"{}\" }};
            UPDATE $contribution SET status = $next, reviewed_by = $reviewer, updated_at = $now;
            {restock}
            COMMIT TRANSACTION;",
            stale(Stale::Contribution)
        ))
        .bind(("contribution", contribution.id.clone()))
        .bind(("resource", contribution.resource.clone()))
        .bind(("quantity", contribution.quantity))
        .bind(("expected", contribution.status))
        .bind(("next", next))
        .bind(("reviewer", auth.id))
        .bind(("now", time_now()))
        .await?;
    commit(response)?;

    info!("contribution {} is now {:?}", contribution.id, next);
    fetch(&state.sdb, &contribution.id).await
}

pub async fn verify_contribution(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(contribution_id): Path<String>,
) -> Result<Json<Contribution>> {
    Ok(Json(
        review_contribution(&state, auth, contribution_id, VerificationStatus::Verified).await?,
    ))
}

pub async fn reject_contribution(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(contribution_id): Path<String>,
) -> Result<Json<Contribution>> {
    Ok(Json(
        review_contribution(&state, auth, contribution_id, VerificationStatus::Rejected).await?,
    ))
}

// ! allocations

async fn total_raised(sdb: &Surreal<Any>) -> Result<i64> {
    let collected = sdb
        .query("SELECT VALUE collected_amount FROM type::table($table);")
        .bind(("table", CAMPAIGN_TABLE))
        .await?
        .take::<Vec<i64>>(0)?;
    Ok(collected.into_iter().sum())
}

async fn all_allocations(sdb: &Surreal<Any>) -> Result<Vec<Allocation>> {
    Ok(sdb
        .query("SELECT * FROM type::table($table) ORDER BY created_at DESC;")
        .bind(("table", ALLOCATION_TABLE))
        .await?
        .take::<Vec<Allocation>>(0)?)
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AllocationRequest {
    #[validate(length(min = 1))]
    pub shelter_id: String,
    #[validate(length(min = 1))]
    pub resource_id: String,
    #[validate(range(min = 1))]
    pub quantity: i64,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

/// Sends stock to a shelter, paid for out of the donations raised so far.
pub async fn create_allocation(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(input): ValidatedJson<AllocationRequest>,
) -> Result<(StatusCode, Json<Allocation>)> {
    let shelter_id = parse_record_id(SHELTER_TABLE, &input.shelter_id)?;
    let resource_id = parse_record_id(RESOURCE_TABLE, &input.resource_id)?;
    let shelter: Shelter = fetch(&state.sdb, &shelter_id).await?;
    let resource: ResourceType = fetch(&state.sdb, &resource_id).await?;

    if resource.quantity_available < input.quantity {
        warn!(
            "allocation of {} {} refused, {} in stock",
            input.quantity, resource.name, resource.quantity_available
        );
        return Err(Error::InsufficientStock {
            available: resource.quantity_available,
        });
    }
    let cost = input
        .quantity
        .checked_mul(resource.unit_cost)
        .ok_or_else(|| Error::BadRequest("allocation cost is out of range".into()))?;
    let spent: i64 = all_allocations(&state.sdb).await?.iter().map(|a| a.cost).sum();
    let balance = total_raised(&state.sdb).await? - spent;
    if balance < cost {
        warn!("allocation costing {cost} refused, balance is {balance}");
        return Err(Error::InsufficientFunds { balance });
    }

    let allocation_id = new_record_id(ALLOCATION_TABLE);
    let response = state
        .sdb
        .query(format!(
            "BEGIN TRANSACTION;
            LET $raised = math::sum((SELECT VALUE collected_amount FROM {CAMPAIGN_TABLE}));
            LET $spent = math::sum((SELECT VALUE cost FROM {ALLOCATION_TABLE}));
            IF $resource.quantity_available < $allocation_data.quantity {{ THROW \"{}\" }};
            IF $raised - $spent < $allocation_data.cost {{ THROW \"{}\" }};
            UPDATE $resource SET quantity_available -= $allocation_data.quantity, updated_at = $now;
            CREATE $allocation CONTENT $allocation_data;
            COMMIT TRANSACTION;",
            stale(Stale::ResourceStock),
            stale(Stale::DonationBalance),
        ))
        .bind(("resource", resource.id.clone()))
        .bind(("allocation", allocation_id.clone()))
        .bind((
            "allocation_data",
            CreateAllocation {
                shelter: shelter.id.clone(),
                resource: resource.id.clone(),
                quantity: input.quantity,
                cost,
                notes: input.notes,
                allocated_by: auth.id,
                created_at: time_now(),
            },
        ))
        .bind(("now", time_now()))
        .await?;
    commit(response)?;

    let allocation: Allocation = fetch(&state.sdb, &allocation_id).await?;
    info!(
        "allocated {} {} to shelter {} for {}",
        allocation.quantity, resource.name, shelter.name, allocation.cost
    );
    Ok((StatusCode::CREATED, Json(allocation)))
}

pub async fn list_allocations(State(state): State<AppState>) -> Result<Json<Vec<Allocation>>> {
    Ok(Json(all_allocations(&state.sdb).await?))
}

pub async fn allocation_summary(State(state): State<AppState>) -> Result<Json<AllocationSummary>> {
    let allocations = all_allocations(&state.sdb).await?;
    let raised = total_raised(&state.sdb).await?;
    Ok(Json(AllocationSummary::build(raised, &allocations)))
}
