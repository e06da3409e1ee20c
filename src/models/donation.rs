use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

use crate::utils::record_id::as_string;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Campaign {
    #[serde(serialize_with = "as_string")]
    pub id: RecordId,
    pub title: String,
    pub slug: String, // ! unique
    pub description: String,
    pub goal_amount: i64,
    pub collected_amount: i64,
    pub active: bool,
    #[serde(serialize_with = "as_string")]
    pub created_by: RecordId,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct CreateCampaign {
    pub title: String,
    pub slug: String,
    pub description: String,
    pub goal_amount: i64,
    pub collected_amount: i64,
    pub active: bool,
    pub created_by: RecordId,
    pub created_at: String,
}

/// Keyed by the gateway's payment id so a replayed notification cannot count twice.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Donation {
    #[serde(serialize_with = "as_string")]
    pub id: RecordId,
    #[serde(serialize_with = "as_string")]
    pub campaign: RecordId,
    pub donor_name: String,
    pub donor_email: String,
    pub amount: i64,
    pub currency: String,
    pub payment_id: String,
    pub created_at: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct CreateDonation {
    pub campaign: RecordId,
    pub donor_name: String,
    pub donor_email: String,
    pub amount: i64,
    pub currency: String,
    pub payment_id: String,
    pub created_at: String,
}
