// Response types for API endpoints

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::core::errors::IdentityError;
use crate::core::models::AccountId;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub store: String,
}

/// Account resolved from a bearer token
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    pub account_id: AccountId,
}

/// API error type that converts domain errors to HTTP responses
///
/// Only the status code reaches the client. The underlying error is logged
/// server-side by the handler before conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
}

impl ApiError {
    /// Create a new API error
    pub fn new(status: StatusCode) -> Self {
        Self { status }
    }

    /// Create from IdentityError
    pub fn from_identity_error(err: &IdentityError) -> Self {
        let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self { status }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.status.into_response()
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        ApiError::from_identity_error(&err)
    }
}
