use axum::{
    extract::{FromRequestParts, OptionalFromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use surrealdb::RecordId;

use crate::consts::tables::USER_TABLE;
use crate::errors::{Error, Result as RResult};
use crate::models::user::Role;
use crate::state::AppState;
use crate::utils::{jwt::decode_jwt, record_id::parse_record_id};

/// The caller resolved from a bearer token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: RecordId,
    pub role: Role,
}

impl AuthUser {
    pub fn require(&self, role: Role) -> RResult<()> {
        if self.role == role {
            Ok(())
        } else {
            tracing::warn!("{} with role {:?} denied {:?} route", self.id, self.role, role);
            Err(Error::AccessDenied)
        }
    }
}

pub async fn auth_jwt_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<impl IntoResponse, Response> {
    let (mut parts, body) = request.into_parts();
    let user = check_auth_parts(&parts, &state.config.jwt_secret).map_err(IntoResponse::into_response)?;
    parts.extensions.insert(user);

    Ok(next.run(Request::from_parts(parts, body)).await)
}

pub async fn require_admin(request: Request, next: Next) -> Result<impl IntoResponse, Response> {
    require_role(request, next, Role::Admin).await
}

pub async fn require_volunteer(request: Request, next: Next) -> Result<impl IntoResponse, Response> {
    require_role(request, next, Role::Volunteer).await
}

async fn require_role(request: Request, next: Next, role: Role) -> Result<Response, Response> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or(Error::MissingToken)
        .map_err(IntoResponse::into_response)?;
    user.require(role).map_err(IntoResponse::into_response)?;
    Ok(next.run(request).await)
}

fn check_auth_parts(parts: &Parts, secret: &str) -> RResult<AuthUser> {
    let header_value = parts
        .headers
        .get(AUTHORIZATION)
        .ok_or(Error::MissingToken)?
        .to_str()
        .map_err(|_| Error::InvalidToken)?;

    let mut parts = header_value.trim().splitn(2, ' ');

    let scheme = parts.next().ok_or(Error::MissingToken)?;
    let token = parts.next().ok_or(Error::MissingToken)?;

    if scheme != "Bearer" {
        tracing::warn!("Invalid auth scheme: {scheme}");
        return Err(Error::InvalidScheme);
    }

    let claims = decode_jwt(token.trim(), secret)?.claims;
    let id = parse_record_id(USER_TABLE, &claims.id).map_err(|_| Error::InvalidToken)?;
    Ok(AuthUser {
        id,
        role: claims.role,
    })
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> RResult<Self> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or(Error::MissingToken)
    }
}

/// Routes open to the public still record the caller when a token is sent.
impl OptionalFromRequestParts<AppState> for AuthUser {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> RResult<Option<Self>> {
        if !parts.headers.contains_key(AUTHORIZATION) {
            return Ok(None);
        }
        check_auth_parts(parts, &state.config.jwt_secret).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request as HttpRequest;

    use super::*;
    use crate::utils::jwt::{Claims, encode_jwt};

    fn parts_with(header: Option<&str>) -> Parts {
        let mut builder = HttpRequest::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn bearer_token_resolves_user_and_role() {
        let token = encode_jwt(&Claims::new("users:abc".into(), Role::Admin, 1), "k").unwrap();
        let user = check_auth_parts(&parts_with(Some(&format!("Bearer {token}"))), "k").unwrap();
        assert_eq!(user.id, RecordId::from_table_key("users", "abc"));
        assert!(user.require(Role::Admin).is_ok());
        assert!(user.require(Role::Volunteer).is_err());
    }

    #[test]
    fn missing_or_malformed_headers_are_rejected() {
        assert!(matches!(check_auth_parts(&parts_with(None), "k"), Err(Error::MissingToken)));
        assert!(matches!(
            check_auth_parts(&parts_with(Some("Basic abc")), "k"),
            Err(Error::InvalidScheme)
        ));
        assert!(matches!(
            check_auth_parts(&parts_with(Some("Bearer nonsense")), "k"),
            Err(Error::InvalidToken)
        ));
    }
}
