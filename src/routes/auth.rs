use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::Validate;

use crate::{
    consts::tables::USER_TABLE,
    db::{fetch, find_user_by_email},
    errors::{Error, Result},
    middleware::AuthUser,
    models::user::{CreateUser, Role, User},
    state::AppState,
    utils::{
        jwt::{Claims, encode_jwt},
        pwd::{hash_password, verify_password},
        validated_form::ValidatedJson,
        validator::{validate_not_blank, validate_password},
    },
};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignUpRequest {
    #[validate(length(min = 2, max = 100), custom(function = "validate_not_blank"))]
    pub name: String,
    #[validate(email)]
    pub email: String,
    #[validate(custom(function = "validate_password"))]
    pub password: String,
}

pub async fn sign_up(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<SignUpRequest>,
) -> Result<(StatusCode, Json<User>)> {
    let user = create_public_account(&state, input.name, input.email, &input.password).await?;
    info!("public account {} created", user.id);
    Ok((StatusCode::CREATED, Json(user)))
}

/// Public accounts need no approval and can sign in straight away.
async fn create_public_account(
    state: &AppState,
    name: String,
    email: String,
    password: &str,
) -> Result<User> {
    if find_user_by_email(&state.sdb, &email).await?.is_some() {
        return Err(Error::EmailExist(email));
    }
    let password_hash = hash_password(password)?;
    let user_data = CreateUser::new(name, email.clone(), password_hash, Role::Public, true);
    state
        .sdb
        .create::<Option<User>>(USER_TABLE)
        .content(user_data)
        .await
        .map_err(|e| {
            // the unique index catches a concurrent signup with the same email
            if e.to_string().contains("users_email") {
                Error::EmailExist(email.clone())
            } else {
                Error::SurrealError(e)
            }
        })?
        .ok_or(Error::InternalServerError)
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SignInRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignInResponse {
    pub token: String,
    pub user: User,
}

pub async fn sign_in(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<SignInRequest>,
) -> Result<Json<SignInResponse>> {
    let user = find_user_by_email(&state.sdb, &input.email)
        .await?
        .ok_or(Error::InvalidLoginDetails)?;

    if !verify_password(&input.password, &user.password_hash)? {
        warn!("failed sign in for {}", user.id);
        return Err(Error::InvalidLoginDetails);
    }
    if !user.approved {
        return Err(Error::AccountNotApproved);
    }

    let claims = Claims::new(user.id.to_string(), user.role, state.config.jwt_ttl_hours);
    let token = encode_jwt(&claims, &state.config.jwt_secret)?;
    info!("{} signed in as {:?}", user.id, user.role);
    Ok(Json(SignInResponse { token, user }))
}

pub async fn me(State(state): State<AppState>, auth: AuthUser) -> Result<Json<User>> {
    Ok(Json(fetch(&state.sdb, &auth.id).await?))
}
