use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use serde::{Deserialize, Serialize};
use surrealdb::{RecordId, Surreal, engine::any::Any};
use tracing::{info, warn};
use validator::Validate;

use crate::{
    consts::{
        PAYMENT_CAPTURED_EVENT, WEBHOOK_SIGNATURE_HEADER,
        tables::{CAMPAIGN_TABLE, DONATION_TABLE},
    },
    db::{Stale, commit, fetch, stale},
    errors::{Error, Result},
    middleware::AuthUser,
    models::donation::{Campaign, CreateCampaign, CreateDonation, Donation},
    notify::{deliver, messages},
    state::AppState,
    utils::{
        record_id::parse_record_id, signature::verify_signature, slug::to_slug, time::time_now,
        validated_form::{QueryParams, ValidatedJson}, validator::validate_not_blank,
    },
};

pub async fn list_campaigns(State(state): State<AppState>) -> Result<Json<Vec<Campaign>>> {
    let campaigns = state
        .sdb
        .query("SELECT * FROM type::table($table) ORDER BY active DESC, created_at DESC;")
        .bind(("table", CAMPAIGN_TABLE))
        .await?
        .take::<Vec<Campaign>>(0)?;
    Ok(Json(campaigns))
}

pub async fn read_campaign(
    State(state): State<AppState>,
    Path(campaign_id): Path<String>,
) -> Result<Json<Campaign>> {
    let campaign_id = parse_record_id(CAMPAIGN_TABLE, &campaign_id)?;
    Ok(Json(fetch(&state.sdb, &campaign_id).await?))
}

// ! admin

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateCampaignRequest {
    #[validate(length(min = 3, max = 200), custom(function = "validate_not_blank"))]
    pub title: String,
    #[validate(length(max = 5000))]
    #[serde(default)]
    pub description: String,
    #[validate(range(min = 1))]
    pub goal_amount: i64,
}

pub async fn create_campaign(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(input): ValidatedJson<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<Campaign>)> {
    let slug = to_slug(&input.title);
    if slug.is_empty() {
        return Err(Error::BadRequest(
            "title must contain letters or digits".into(),
        ));
    }
    let existing: Vec<Campaign> = state
        .sdb
        .query("SELECT * FROM type::table($table) WHERE slug = $slug;")
        .bind(("table", CAMPAIGN_TABLE))
        .bind(("slug", slug.clone()))
        .await?
        .take(0)?;
    if !existing.is_empty() {
        return Err(Error::AlreadyExists(format!("campaign `{slug}`")));
    }

    let campaign = state
        .sdb
        .create::<Option<Campaign>>(CAMPAIGN_TABLE)
        .content(CreateCampaign {
            title: input.title.trim().to_string(),
            slug: slug.clone(),
            description: input.description,
            goal_amount: input.goal_amount,
            collected_amount: 0,
            active: true,
            created_by: auth.id,
            created_at: time_now(),
        })
        .await
        .map_err(|e| match Error::from(e) {
            Error::SurrealError(err) if err.to_string().contains("campaigns_slug") => {
                Error::AlreadyExists(format!("campaign `{slug}`"))
            }
            other => other,
        })?
        .ok_or(Error::InternalServerError)?;
    info!("campaign {} ({}) opened", campaign.id, campaign.slug);
    Ok((StatusCode::CREATED, Json(campaign)))
}

/// A closed campaign stays listed and keeps what it collected.
pub async fn close_campaign(
    State(state): State<AppState>,
    Path(campaign_id): Path<String>,
) -> Result<Json<Campaign>> {
    let campaign_id = parse_record_id(CAMPAIGN_TABLE, &campaign_id)?;
    let campaign: Campaign = fetch(&state.sdb, &campaign_id).await?;
    if !campaign.active {
        return Err(Error::InvalidTransition {
            entity: "campaign",
            from: "Closed".to_string(),
            to: "Closed".to_string(),
        });
    }
    let response = state
        .sdb
        .query(format!(
            "BEGIN TRANSACTION;
            IF $campaign.active != true {{ THROW \"{}\" }};
            UPDATE $campaign SET active = false, updated_at = $now;
            COMMIT TRANSACTION;",
            stale(Stale::Campaign)
        ))
        .bind(("campaign", campaign.id.clone()))
        .bind(("now", time_now()))
        .await?;
    commit(response)?;

    let campaign: Campaign = fetch(&state.sdb, &campaign.id).await?;
    info!("campaign {} closed at {}", campaign.id, campaign.collected_amount);
    Ok(Json(campaign))
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListDonationsQuery {
    pub campaign: Option<String>,
}

pub async fn list_donations(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<ListDonationsQuery>,
) -> Result<Json<Vec<Donation>>> {
    let donations = match query.campaign {
        Some(raw) => state
            .sdb
            .query("SELECT * FROM type::table($table) WHERE campaign = $campaign ORDER BY created_at DESC;")
            .bind(("table", DONATION_TABLE))
            .bind(("campaign", parse_record_id(CAMPAIGN_TABLE, &raw)?))
            .await?
            .take::<Vec<Donation>>(0)?,
        None => state
            .sdb
            .query("SELECT * FROM type::table($table) ORDER BY created_at DESC;")
            .bind(("table", DONATION_TABLE))
            .await?
            .take::<Vec<Donation>>(0)?,
    };
    Ok(Json(donations))
}

// ! payment gateway

#[derive(Debug, Clone, Deserialize)]
struct GatewayEvent {
    event: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PaymentNotification {
    #[validate(length(min = 1, max = 100))]
    pub payment_id: String,
    #[validate(length(min = 1))]
    pub campaign_id: String,
    #[validate(range(min = 1))]
    pub amount: i64,
    #[validate(length(equal = 3))]
    pub currency: String,
    #[validate(length(min = 1, max = 100))]
    pub donor_name: String,
    #[validate(email)]
    pub donor_email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WebhookAck {
    Recorded { donation: Donation },
    Duplicate { payment_id: String },
    Ignored { event: String },
}

async fn existing_donation(sdb: &Surreal<Any>, id: &RecordId) -> Result<Option<Donation>> {
    Ok(sdb.select::<Option<Donation>>(id.clone()).await?)
}

/// Records a captured payment once; redelivered notifications are acknowledged
/// without touching the campaign total.
pub async fn donation_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>> {
    let signature = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(Error::InvalidSignature)?;
    verify_signature(&state.config.webhook_secret, &body, signature).inspect_err(|_| {
        warn!("rejected webhook with a bad signature");
    })?;

    let envelope: GatewayEvent = serde_json::from_slice(&body)
        .map_err(|e| Error::BadRequest(format!("invalid notification: {e}")))?;
    if envelope.event != PAYMENT_CAPTURED_EVENT {
        info!("ignoring gateway event {}", envelope.event);
        return Ok(Json(WebhookAck::Ignored {
            event: envelope.event,
        }));
    }
    let notification: PaymentNotification = serde_json::from_slice(&body)
        .map_err(|e| Error::BadRequest(format!("invalid notification: {e}")))?;
    notification.validate()?;

    let donation_id = parse_record_id(DONATION_TABLE, &notification.payment_id)?;
    if existing_donation(&state.sdb, &donation_id).await?.is_some() {
        info!("payment {} already recorded", notification.payment_id);
        return Ok(Json(WebhookAck::Duplicate {
            payment_id: notification.payment_id,
        }));
    }
    let campaign_id = parse_record_id(CAMPAIGN_TABLE, &notification.campaign_id)?;
    let campaign: Campaign = fetch(&state.sdb, &campaign_id).await?;
    if !campaign.active {
        warn!(
            "payment {} captured for closed campaign {}",
            notification.payment_id, campaign.id
        );
    }

    let donation = CreateDonation {
        campaign: campaign.id.clone(),
        donor_name: notification.donor_name.trim().to_string(),
        donor_email: notification.donor_email.trim().to_lowercase(),
        amount: notification.amount,
        currency: notification.currency.to_uppercase(),
        payment_id: notification.payment_id.clone(),
        created_at: time_now(),
    };
    let response = state
        .sdb
        .query(
            "BEGIN TRANSACTION;
            CREATE $donation CONTENT $donation_data;
            UPDATE $campaign SET collected_amount += $donation_data.amount, updated_at = $now;
            COMMIT TRANSACTION;",
        )
        .bind(("donation", donation_id.clone()))
        .bind(("donation_data", donation))
        .bind(("campaign", campaign.id.clone()))
        .bind(("now", time_now()))
        .await?;
    if let Err(err) = commit(response) {
        // a concurrent delivery of the same payment won the race
        if existing_donation(&state.sdb, &donation_id).await?.is_some() {
            return Ok(Json(WebhookAck::Duplicate {
                payment_id: notification.payment_id,
            }));
        }
        return Err(err);
    }

    let donation: Donation = fetch(&state.sdb, &donation_id).await?;
    deliver(
        state.mailer.as_ref(),
        messages::donation_receipt(
            &donation.donor_email,
            &donation.donor_name,
            donation.amount,
            &donation.currency,
            &campaign.title,
        ),
    )
    .await;
    info!(
        "donation {} of {} {} recorded for {}",
        donation.payment_id, donation.amount, donation.currency, campaign.slug
    );
    Ok(Json(WebhookAck::Recorded { donation }))
}
