//! Schema bootstrap and the conventions shared by multi-document transactions.
//!
//! Every write that touches more than one document runs as a single
//! `BEGIN TRANSACTION ... COMMIT TRANSACTION` query. Each transaction first
//! re-checks the statuses the handler read and `THROW`s a guard marker when
//! they no longer hold, which cancels every statement in it.

use serde::de::DeserializeOwned;
use surrealdb::{RecordId, Response, Surreal, engine::any::Any};
use tracing::{error, info, warn};

use crate::consts::tables::{
    ALL, CAMPAIGN_TABLE, PROGRESS_TABLE, RESOURCE_TABLE, USER_TABLE, VOLUNTEER_TABLE,
};
use crate::errors::{Error, Result};
use crate::models::user::{CreateUser, Role, User, normalize_email};
use crate::utils::pwd::hash_password;

pub const VOLUNTEER_UNAVAILABLE: &str = "guard:volunteer_unavailable";

/// Raised by the datastore when two transactions wrote the same record.
const WRITE_CONFLICT: &str = "read or write conflict";

/// Documents whose status a transaction re-checks before writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stale {
    Volunteer,
    Task,
    Shelter,
    Contribution,
    ResourceStock,
    DonationBalance,
    Incident,
    Campaign,
}

impl Stale {
    pub const ALL: [Stale; 8] = [
        Stale::Volunteer,
        Stale::Task,
        Stale::Shelter,
        Stale::Contribution,
        Stale::ResourceStock,
        Stale::DonationBalance,
        Stale::Incident,
        Stale::Campaign,
    ];

    /// Text `THROW`n by the transaction; unique per variant.
    pub const fn marker(self) -> &'static str {
        match self {
            Stale::Volunteer => "guard:stale_volunteer",
            Stale::Task => "guard:stale_task",
            Stale::Shelter => "guard:stale_shelter",
            Stale::Contribution => "guard:stale_contribution",
            Stale::ResourceStock => "guard:stale_resource",
            Stale::DonationBalance => "guard:stale_funds",
            Stale::Incident => "guard:stale_incident",
            Stale::Campaign => "guard:stale_campaign",
        }
    }

    pub const fn entity(self) -> &'static str {
        match self {
            Stale::Volunteer => "volunteer",
            Stale::Task => "task",
            Stale::Shelter => "shelter",
            Stale::Contribution => "contribution",
            Stale::ResourceStock => "resource stock",
            Stale::DonationBalance => "donation balance",
            Stale::Incident => "incident",
            Stale::Campaign => "campaign",
        }
    }
}

pub fn stale(guard: Stale) -> &'static str {
    guard.marker()
}

/// Turns statement errors of a finished query into a crate error.
pub fn commit(mut response: Response) -> Result<Response> {
    let errors = response.take_errors();
    if errors.is_empty() {
        return Ok(response);
    }
    let messages: Vec<String> = errors.values().map(|e| e.to_string()).collect();
    if let Some(err) = guard_error(&messages) {
        warn!("transaction cancelled: {err}");
        return Err(err);
    }
    let mut errors: Vec<_> = errors.into_iter().collect();
    errors.sort_by_key(|(index, _)| *index);
    match errors.into_iter().next() {
        Some((index, err)) => {
            error!("statement {index} failed: {err}");
            Err(Error::SurrealError(err))
        }
        None => Err(Error::InternalServerError),
    }
}

fn guard_error(messages: &[String]) -> Option<Error> {
    if messages.iter().any(|m| m.contains(VOLUNTEER_UNAVAILABLE)) {
        return Some(Error::VolunteerUnavailable);
    }
    Stale::ALL
        .into_iter()
        .find(|guard| messages.iter().any(|m| m.contains(guard.marker())))
        .map(|guard| Error::Conflict(guard.entity()))
        .or_else(|| {
            messages
                .iter()
                .any(|m| m.contains(WRITE_CONFLICT))
                .then_some(Error::Conflict("record"))
        })
}

pub async fn init_schema(sdb: &Surreal<Any>) -> Result<()> {
    let mut statements: String = ALL
        .iter()
        .map(|table| format!("DEFINE TABLE IF NOT EXISTS {table} SCHEMALESS;\n"))
        .collect();
    for (name, table, field) in [
        ("users_email", USER_TABLE, "email"),
        ("volunteers_user", VOLUNTEER_TABLE, "user"),
        ("resources_name", RESOURCE_TABLE, "name"),
        ("campaigns_slug", CAMPAIGN_TABLE, "slug"),
        ("task_progress_task", PROGRESS_TABLE, "task"),
    ] {
        statements.push_str(&format!(
            "DEFINE INDEX IF NOT EXISTS {name} ON TABLE {table} FIELDS {field} UNIQUE;\n"
        ));
    }
    sdb.query(statements).await?.check()?;
    info!("schema ready: {} tables", ALL.len());
    Ok(())
}

pub async fn fetch<T: DeserializeOwned>(sdb: &Surreal<Any>, id: &RecordId) -> Result<T> {
    sdb.select::<Option<T>>(id.clone())
        .await?
        .ok_or(Error::NotFound)
}

pub async fn find_user_by_email(sdb: &Surreal<Any>, email: &str) -> Result<Option<User>> {
    let users: Vec<User> = sdb
        .query("SELECT * FROM type::table($table) WHERE email = $email;")
        .bind(("table", USER_TABLE))
        .bind(("email", normalize_email(email)))
        .await?
        .take(0)?;
    Ok(users.into_iter().next())
}

/// Creates the configured admin account on first start.
pub async fn bootstrap_admin(sdb: &Surreal<Any>, email: &str, password: &str) -> Result<()> {
    if find_user_by_email(sdb, email).await?.is_some() {
        return Ok(());
    }
    let admin = CreateUser::new(
        "Administrator".to_string(),
        email.to_string(),
        hash_password(password)?,
        Role::Admin,
        true,
    );
    let _: Option<User> = sdb.create(USER_TABLE).content(admin).await?;
    info!("bootstrapped admin account {email}");
    Ok(())
}
