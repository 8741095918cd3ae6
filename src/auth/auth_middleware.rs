// Axum bearer-token middleware

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::warn;

use crate::api::responses::ApiError;
use crate::core::crypto::TokenIssuer;
use crate::core::errors::{CryptoError, IdentityError};

/// Bearer authentication middleware
///
/// Verifies the token in the `Authorization` header and inserts the
/// authenticated `AccountId` into request extensions for handlers to use.
/// Apply with `axum::middleware::from_fn_with_state(issuer, require_account)`.
pub async fn require_account(
    State(issuer): State<Arc<TokenIssuer>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = extract_bearer_token(request.headers()).ok_or_else(|| {
        warn!("Missing bearer token");
        ApiError::from(IdentityError::Unauthorized(CryptoError::MalformedToken(
            "missing Authorization header".to_string(),
        )))
    })?;

    let claims = issuer.verify_token(&token).map_err(|e| {
        warn!(error = %e, "Bearer token rejected");
        ApiError::from(IdentityError::Unauthorized(e))
    })?;

    let account_id = claims.account_id().ok_or_else(|| {
        warn!(sub = %claims.sub, "Bearer token subject is not an account id");
        ApiError::from(IdentityError::Unauthorized(CryptoError::MalformedToken(
            "subject".to_string(),
        )))
    })?;

    request.extensions_mut().insert(account_id);
    Ok(next.run(request).await)
}

/// Extract the token from the `Authorization` header
///
/// Accepts both `Bearer <token>` and the bare token that the register and
/// login endpoints hand out.
fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?.trim();
    let token = match value.split_once(' ') {
        Some((scheme, rest)) if scheme.eq_ignore_ascii_case("bearer") => rest.trim(),
        Some(_) => return None,
        None if value.eq_ignore_ascii_case("bearer") => return None,
        None => value,
    };
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}
