use chrono::{Duration, Utc};
use jsonwebtoken::{
    DecodingKey, EncodingKey, Header, TokenData, Validation, decode, encode,
    errors::ErrorKind,
};

use crate::errors::{Error, Result};
use crate::models::user::Role;

pub const ISSUER: &str = "relief-coord";

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    /// `users:<key>`
    pub id: String,
    pub role: Role,
    pub exp: usize,
    pub iat: usize,
    pub iss: String,
}

impl Claims {
    pub fn new(id: String, role: Role, ttl_hours: i64) -> Self {
        let now = Utc::now();
        Self {
            id,
            role,
            iat: now.timestamp() as usize,
            exp: (now + Duration::hours(ttl_hours)).timestamp() as usize,
            iss: ISSUER.to_string(),
        }
    }
}

pub fn encode_jwt(claim: &Claims, secret: &str) -> Result<String> {
    let token = encode(
        &Header::default(),
        claim,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;
    Ok(token)
}

pub fn decode_jwt(token: &str, secret: &str) -> Result<TokenData<Claims>> {
    let mut validation = Validation::default();
    validation.set_issuer(&[ISSUER]);
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => Error::TokenExpired,
        _ => Error::InvalidToken,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip_keeps_role() {
        let claims = Claims::new("users:abc".into(), Role::Volunteer, 1);
        let token = encode_jwt(&claims, "s3cret").unwrap();
        let data = decode_jwt(&token, "s3cret").unwrap();
        assert_eq!(data.claims.id, "users:abc");
        assert_eq!(data.claims.role, Role::Volunteer);
    }

    #[test]
    fn wrong_secret_and_expiry_are_rejected() {
        let claims = Claims::new("users:abc".into(), Role::Admin, 1);
        let token = encode_jwt(&claims, "s3cret").unwrap();
        assert!(matches!(decode_jwt(&token, "other"), Err(Error::InvalidToken)));

        let expired = Claims::new("users:abc".into(), Role::Admin, -2);
        let token = encode_jwt(&expired, "s3cret").unwrap();
        assert!(matches!(decode_jwt(&token, "s3cret"), Err(Error::TokenExpired)));
    }
}
