use serde::{Deserialize, Serialize};
use surrealdb::RecordId;

use crate::utils::record_id::as_string;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Volunteer,
    Public,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct User {
    #[serde(serialize_with = "as_string")]
    pub id: RecordId,
    pub name: String,
    pub email: String, // ! unique
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    /// Volunteers stay unapproved until an admin accepts their application.
    pub approved: bool,
    pub created_at: String,
    pub updated_at: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct CreateUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub approved: bool,
    pub created_at: String,
}

impl CreateUser {
    pub fn new(name: String, email: String, password_hash: String, role: Role, approved: bool) -> Self {
        Self {
            name: name.trim().to_string(),
            email: normalize_email(&email),
            password_hash,
            role,
            approved,
            created_at: crate::utils::time::time_now(),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
