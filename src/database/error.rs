use std::collections::BTreeMap;

use serde::Serialize;
use thiserror::Error;
use validator::ValidationErrors;
use warp::{http::StatusCode, reject};

/// Field name to the list of messages raised for it.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub const NON_FIELD_ERRORS: &str = "non_field_errors";

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Invalid input")]
    Validation(FieldErrors),

    #[error("{0}")]
    InvalidRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    InvalidSession(String),

    #[error("You do not have permission to perform this action.")]
    Forbidden,

    #[error("Not found.")]
    NotFound,

    #[error("Database error: {0}")]
    Query(#[from] sqlx::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("{0}")]
    InternalServerError(String),
}

impl ApiError {
    pub fn field(field: &str, message: &str) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(field.to_string(), vec![message.to_string()]);
        Self::Validation(errors)
    }

    pub fn non_field(message: &str) -> Self {
        Self::field(NON_FIELD_ERRORS, message)
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) | ApiError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Unauthorized(_) | ApiError::InvalidSession(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Query(_) | ApiError::Storage(_) | ApiError::InternalServerError(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// JSON body sent to the client. Server-side failures never leak their cause.
    pub fn body(&self) -> ErrorBody {
        match self {
            ApiError::Validation(errors) => ErrorBody::Fields(errors.clone()),
            ApiError::Query(_) | ApiError::Storage(_) | ApiError::InternalServerError(_) => {
                ErrorBody::Detail {
                    detail: String::from("A server error occurred."),
                }
            }
            other => ErrorBody::Detail {
                detail: other.to_string(),
            },
        }
    }

    /// Whether `err` is a Postgres unique constraint violation.
    pub fn is_unique_violation(err: &sqlx::Error) -> bool {
        match err {
            sqlx::Error::Database(e) => e.code().as_deref() == Some("23505"),
            _ => false,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ErrorBody {
    Fields(FieldErrors),
    Detail { detail: String },
}

impl From<ValidationErrors> for ApiError {
    fn from(value: ValidationErrors) -> Self {
        let errors = value
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let messages = errors
                    .iter()
                    .map(|e| match &e.message {
                        Some(message) => message.to_string(),
                        None => format!("Invalid value ({})", e.code),
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();

        ApiError::Validation(errors)
    }
}

impl reject::Reject for ApiError {}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ApiError::field("email", "taken"), StatusCode::BAD_REQUEST)]
    #[case(ApiError::Unauthorized("no".into()), StatusCode::UNAUTHORIZED)]
    #[case(ApiError::Forbidden, StatusCode::FORBIDDEN)]
    #[case(ApiError::NotFound, StatusCode::NOT_FOUND)]
    #[case(ApiError::Query(sqlx::Error::RowNotFound), StatusCode::INTERNAL_SERVER_ERROR)]
    fn maps_to_status(#[case] error: ApiError, #[case] status: StatusCode) {
        assert_eq!(error.status(), status);
    }

    #[test]
    fn validation_body_is_keyed_by_field() {
        let body = serde_json::to_value(ApiError::field("email", "taken").body()).unwrap();
        assert_eq!(body, serde_json::json!({ "email": ["taken"] }));
    }

    #[test]
    fn server_errors_hide_their_cause() {
        let body = serde_json::to_value(ApiError::Query(sqlx::Error::PoolClosed).body()).unwrap();
        assert_eq!(body, serde_json::json!({ "detail": "A server error occurred." }));
    }
}
