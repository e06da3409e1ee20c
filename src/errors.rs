use argon2::password_hash::Error as ArError;
use axum::{Json, http::StatusCode, response::IntoResponse};
use jsonwebtoken::errors::Error as JWError;
use serde::Serialize;
use surrealdb::Error as SError;

use thiserror::Error;
use tracing::{error, warn};

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Argon 2 Error: {0}")]
    Argon2Error(#[from] ArError),

    #[error("Json web token Error: {0}")]
    JwTError(#[from] JWError),

    #[error("SurrealDb Error: {0}")]
    SurrealError(#[from] SError),

    #[error("Io Error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Axum Error: {0}")]
    AxumError(#[from] axum::Error),

    #[error("Validator Error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Json Rejection Error: {0}")]
    AxumJsonRejection(#[from] axum::extract::rejection::JsonRejection),

    #[error("Query Rejection Error: {0}")]
    AxumQueryRejection(#[from] axum::extract::rejection::QueryRejection),

    #[error("{0}")]
    BadRequest(String),

    #[error("Invalid login detail")]
    InvalidLoginDetails,

    #[error("Account with email `{0}` already exists!")]
    EmailExist(String),

    #[error("{0} already exists")]
    AlreadyExists(String),

    #[error("Account is awaiting approval")]
    AccountNotApproved,

    #[error("Not Found")]
    NotFound,

    #[error("Invalid {entity} transition from {from} to {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    #[error("{0} was modified concurrently, retry the request")]
    Conflict(&'static str),

    #[error("Volunteer is not available for a new assignment")]
    VolunteerUnavailable,

    #[error("Shelter capacity of {capacity} exceeded")]
    CapacityExceeded { capacity: u32 },

    #[error("Insufficient stock: {available} available")]
    InsufficientStock { available: i64 },

    #[error("Insufficient funds: balance is {balance}")]
    InsufficientFunds { balance: i64 },

    #[error("Internal Server Error")]
    InternalServerError,

    // ! Auth
    #[error("Missing authorization token")]
    MissingToken,
    #[error("Invalid authorization token")]
    InvalidToken,
    #[error("Invalid authorization scheme")]
    InvalidScheme,
    #[error("Token expired")]
    TokenExpired,
    #[error("Access denied")]
    AccessDenied,
    #[error("Invalid webhook signature")]
    InvalidSignature,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<String>,
}

fn internal(kind: &str, detail: &dyn std::fmt::Debug) -> (StatusCode, String) {
    error!("{kind} Error:{:#?}", detail);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal Error".to_string(),
    )
}

impl IntoResponse for Error {
    fn into_response(self) -> axum::response::Response {
        let mut fields = Vec::new();
        let (status, message) = match self {
            Error::Argon2Error(error) => internal("Argon 2", &error),
            Error::JwTError(error) => internal("JWT", &error),
            Error::SurrealError(error) => internal("Surreal", &error),
            Error::IoError(error) => internal("Io", &error),
            Error::AxumError(error) => internal("Axum", &error),
            Error::InternalServerError => internal("Internal", &"unspecified"),
            Error::ValidationError(error) => {
                let mut names: Vec<String> =
                    error.field_errors().keys().map(|k| k.to_string()).collect();
                names.sort();
                fields = names;
                let message = format!("Input validation error: [{}]", error).replace('\n', ", ");
                warn!("Validation Error:{:#?}", error);
                (StatusCode::BAD_REQUEST, message)
            }
            Error::AxumJsonRejection(error) => {
                warn!("Axum Json Rejection Error:{:#?}", error);
                (StatusCode::BAD_REQUEST, error.body_text())
            }
            Error::AxumQueryRejection(error) => {
                warn!("Axum Query Rejection Error:{:#?}", error);
                (StatusCode::BAD_REQUEST, error.body_text())
            }
            e @ (Error::BadRequest(_)
            | Error::CapacityExceeded { .. }
            | Error::InsufficientStock { .. }
            | Error::InsufficientFunds { .. }) => (StatusCode::BAD_REQUEST, e.to_string()),
            Error::InvalidLoginDetails => {
                warn!("Invalid login details");
                (StatusCode::UNAUTHORIZED, "Invalid Login Details".to_string())
            }
            e @ (Error::EmailExist(_)
            | Error::AlreadyExists(_)
            | Error::InvalidTransition { .. }
            | Error::Conflict(_)
            | Error::VolunteerUnavailable) => (StatusCode::CONFLICT, e.to_string()),
            e @ (Error::AccountNotApproved | Error::AccessDenied) => {
                (StatusCode::FORBIDDEN, e.to_string())
            }
            Error::NotFound => (StatusCode::NOT_FOUND, "Not Found".to_string()),
            e @ (Error::MissingToken
            | Error::InvalidToken
            | Error::InvalidScheme
            | Error::TokenExpired
            | Error::InvalidSignature) => (StatusCode::UNAUTHORIZED, e.to_string()),
        };
        (
            status,
            Json(ErrorBody {
                error: message,
                fields,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        let cases = [
            (Error::NotFound, StatusCode::NOT_FOUND),
            (Error::CapacityExceeded { capacity: 3 }, StatusCode::BAD_REQUEST),
            (Error::InsufficientFunds { balance: 0 }, StatusCode::BAD_REQUEST),
            (Error::VolunteerUnavailable, StatusCode::CONFLICT),
            (Error::AccountNotApproved, StatusCode::FORBIDDEN),
            (Error::TokenExpired, StatusCode::UNAUTHORIZED),
            (Error::InternalServerError, StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn transition_error_names_both_states() {
        let err = Error::InvalidTransition {
            entity: "task",
            from: "Assigned".into(),
            to: "Completed".into(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid task transition from Assigned to Completed"
        );
    }
}
