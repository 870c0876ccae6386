use axum::{
    Json,
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde_json::json;
use tracing::error;

use bizmate_db::DbError;

use crate::credentials::CredentialError;
use crate::token::TokenError;

/// Why a request was refused before reaching a resource store. Each kind has
/// its own message so clients can tell "log in again" from "rejected".
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthFailure {
    #[error("Not authenticated")]
    MissingToken,
    #[error("Could not validate credentials")]
    InvalidToken,
    #[error("Session expired, please log in again")]
    ExpiredToken,
    #[error("Could not validate credentials")]
    UnknownUser,
    #[error("Inactive user")]
    InactiveUser,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Unauthenticated(AuthFailure),
    #[error("Incorrect email or password")]
    InvalidCredentials,
    #[error("Email already registered")]
    DuplicateEmail,
    /// Absent and not-yours are the same answer.
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    BadRequest(String),
    #[error("Internal server error")]
    Internal,
}

impl ApiError {
    /// Give a generic `NotFound` the name of the resource the handler was
    /// looking for.
    pub fn named(self, what: &'static str) -> Self {
        match self {
            ApiError::NotFound(_) => ApiError::NotFound(what),
            other => other,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated(_) | ApiError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            ApiError::DuplicateEmail => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = Json(json!({ "detail": self.to_string() }));

        if status == StatusCode::UNAUTHORIZED {
            (status, [(header::WWW_AUTHENTICATE, "Bearer")], body).into_response()
        } else {
            (status, body).into_response()
        }
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::DuplicateEmail => ApiError::DuplicateEmail,
            DbError::NotFound => ApiError::NotFound("Resource"),
            other => {
                error!("Database error: {}", other);
                ApiError::Internal
            }
        }
    }
}

impl From<TokenError> for ApiError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => ApiError::Unauthenticated(AuthFailure::ExpiredToken),
            TokenError::Invalid => ApiError::Unauthenticated(AuthFailure::InvalidToken),
        }
    }
}

impl From<CredentialError> for ApiError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::DuplicateEmail => ApiError::DuplicateEmail,
            CredentialError::InvalidCredentials => ApiError::InvalidCredentials,
            CredentialError::Inactive => ApiError::Unauthenticated(AuthFailure::InactiveUser),
            CredentialError::Invalid(msg) => ApiError::BadRequest(msg),
            CredentialError::Store(db) => db.into(),
            CredentialError::Hash(msg) => {
                error!("Password hashing failed: {}", msg);
                ApiError::Internal
            }
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        error!("Internal error: {:#}", e);
        ApiError::Internal
    }
}
