// Request handlers for API endpoints

use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
    Extension,
};
use std::time::Duration;
use tracing::{error, info, warn};

use crate::api::middleware::RequestId;
use crate::api::responses::{AccountResponse, ApiError, HealthResponse};
use crate::api::AppState;
use crate::auth::audit_logger::{AuthEvent, ClientInfo};
use crate::auth::flows::AuthFlow;
use crate::core::errors::{CryptoError, IdentityError};
use crate::core::models::{AccountId, CredentialPayload, IssuedToken};

/// Store ping budget for the health endpoint
const HEALTH_PING_TIMEOUT: Duration = Duration::from_millis(500);

/// Register a new account
///
/// POST /api/user/register
///
/// 200 with `Authorization: <token>` and an empty body on success;
/// 400 malformed or invalid body, 409 login taken, 500 storage or signing fault.
pub async fn register_handler(
    State(app_state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let mut login = None;
    let result = match CredentialPayload::decode(&body) {
        Ok(payload) => {
            login = Some(payload.login.clone());
            app_state.identity.register(payload).await
        }
        Err(e) => Err(e),
    };

    finish(&app_state, AuthFlow::Register, &request_id, &headers, login.as_deref(), result)
}

/// Log in to an existing account
///
/// POST /api/user/login
///
/// 200 with `Authorization: <token>` on success; 400 malformed body,
/// 401 bad credentials, 500 storage or signing fault.
pub async fn login_handler(
    State(app_state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let mut login = None;
    let result = match CredentialPayload::decode(&body) {
        Ok(payload) => {
            login = Some(payload.login.clone());
            app_state.identity.login(payload).await
        }
        Err(e) => Err(e),
    };

    finish(&app_state, AuthFlow::Login, &request_id, &headers, login.as_deref(), result)
}

/// Shared tail of both flows: log, count, audit, and build the response
fn finish(
    app_state: &AppState,
    flow: AuthFlow,
    request_id: &RequestId,
    headers: &HeaderMap,
    login: Option<&str>,
    result: Result<IssuedToken, IdentityError>,
) -> Result<Response, ApiError> {
    let client = ClientInfo::from_headers(headers);

    let result = result.and_then(|issued| {
        HeaderValue::from_str(&issued.token)
            .map(|value| (issued, value))
            .map_err(|e| IdentityError::TokenSigning(CryptoError::SigningError(e.to_string())))
    });

    match result {
        Ok((issued, authorization)) => {
            info!(
                flow = flow.as_str(),
                request_id = %request_id.as_str(),
                account_id = %issued.account_id,
                expires_at = issued.expires_at,
                "Token issued"
            );
            app_state.metrics.record(flow.as_str(), "success");
            app_state
                .audit_logger
                .log_auth_event(AuthEvent::for_outcome(flow, None), login, &client);

            Ok((StatusCode::OK, [(header::AUTHORIZATION, authorization)]).into_response())
        }
        Err(e) => {
            if e.is_client_error() {
                warn!(
                    flow = flow.as_str(),
                    request_id = %request_id.as_str(),
                    kind = e.kind(),
                    error = %e,
                    "Request rejected"
                );
            } else {
                error!(
                    flow = flow.as_str(),
                    request_id = %request_id.as_str(),
                    kind = e.kind(),
                    error = %e,
                    "Request failed"
                );
            }
            app_state.metrics.record(flow.as_str(), e.kind());
            app_state
                .audit_logger
                .log_auth_event(AuthEvent::for_outcome(flow, Some(e.kind())), login, &client);

            Err(ApiError::from(e))
        }
    }
}

/// Account behind the bearer token
///
/// GET /api/user/me
///
/// Mounted behind `require_account`, which supplies the `AccountId`.
pub async fn account_handler(Extension(account_id): Extension<AccountId>) -> Json<AccountResponse> {
    Json(AccountResponse { account_id })
}

/// Health check handler
///
/// GET /health
///
/// 200 when the account store answers a ping within 500ms, 503 otherwise.
pub async fn health_handler(State(app_state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let store_status = match tokio::time::timeout(HEALTH_PING_TIMEOUT, app_state.account_store.ping()).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => {
            warn!(error = %e, "Account store ping failed");
            Err("unavailable")
        }
        Err(_) => {
            warn!("Account store ping timed out");
            Err("timeout")
        }
    };

    match store_status {
        Ok(()) => (
            StatusCode::OK,
            Json(HealthResponse {
                status: "healthy".to_string(),
                store: "connected".to_string(),
            }),
        ),
        Err(reason) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(HealthResponse {
                status: "degraded".to_string(),
                store: reason.to_string(),
            }),
        ),
    }
}

/// Metrics handler
///
/// GET /metrics
///
/// Returns Prometheus metrics in text format
pub async fn metrics_handler(State(app_state): State<AppState>) -> Result<String, ApiError> {
    app_state.metrics.render().map_err(|e| {
        error!(error = %e, "Failed to render metrics");
        ApiError::new(StatusCode::INTERNAL_SERVER_ERROR)
    })
}
