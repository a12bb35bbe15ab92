use axum::{http::StatusCode, Json};
use serde_json::json;
use thiserror::Error;

/// Input that is reported inline to the visitor and never logged as an error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Please enter a valid email address.")]
    InvalidEmail,
    #[error("Please enter a certificate ID.")]
    EmptyCertificateId,
}

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("Document store request failed: {0}")]
    Remote(String),
    #[error("Document store returned an empty identifier")]
    EmptyIdentifier,
    #[error("Document store is not configured")]
    NotConfigured,
    #[error("Local store database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("Local store connection error: {0}")]
    Pool(String),
    #[error("Local store holds malformed data: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Error, Debug)]
pub enum WaitlistError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("A submission is already in progress")]
    InProgress,
    #[error("Local fallback write failed: {0}")]
    LocalPersistence(PersistenceError),
}

impl WaitlistError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            WaitlistError::Validation(_) => StatusCode::BAD_REQUEST,
            WaitlistError::InProgress => StatusCode::CONFLICT,
            WaitlistError::LocalPersistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn into_response_parts(self) -> (StatusCode, Json<serde_json::Value>) {
        let message = match &self {
            WaitlistError::LocalPersistence(_) => "Something went wrong, please try again later".to_string(),
            other => other.to_string(),
        };
        (self.status_code(), Json(json!({"error": message})))
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

impl From<ValidationError> for (StatusCode, Json<serde_json::Value>) {
    fn from(err: ValidationError) -> Self {
        (StatusCode::BAD_REQUEST, Json(json!({"error": err.to_string()})))
    }
}
