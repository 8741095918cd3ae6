// Axum web server layer

use axum::{error_handling::HandleErrorLayer, http::StatusCode, routing, BoxError, Router};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;

pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod responses;

use crate::auth::audit_logger::AuditLogger;
use crate::auth::auth_middleware::require_account;
use crate::auth::flows::IdentityService;
use crate::core::crypto::TokenIssuer;
use crate::core::errors::IdentityError;
use crate::core::models::{AccountId, Credentials};
use crate::api::metrics::AuthMetrics;

// Re-export Config from config module
pub use crate::config::Config;

/// Application state containing all shared dependencies
///
/// All components are wrapped in Arc for shared ownership across request
/// tasks. Nothing here is mutated after startup except through the store.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<IdentityService>,
    pub account_store: Arc<dyn AccountStore + Send + Sync>,
    pub token_issuer: Arc<TokenIssuer>,
    pub audit_logger: Arc<AuditLogger>,
    pub metrics: Arc<AuthMetrics>,
    pub config: Arc<Config>,
}

/// Persistent account storage used by the registration and login flows
///
/// Implementations own the account records. `create_account` is the
/// authority on login uniqueness and must decide it atomically at the point
/// of write; `exists` is only an early exit.
#[async_trait::async_trait]
pub trait AccountStore: Send + Sync {
    /// Whether an account with this login exists. Storage failures are errors, not `false`.
    async fn exists(&self, login: &str) -> Result<bool, IdentityError>;

    /// Hash the password and persist a new account, or fail with `DuplicateLogin`
    ///
    /// Callers bound the whole call, hashing included, with the store timeout.
    async fn create_account(&self, credentials: &Credentials) -> Result<AccountId, IdentityError>;

    /// Resolve credentials to an account, or fail with `AuthenticationFailed`
    async fn authenticate(&self, credentials: &Credentials) -> Result<AccountId, IdentityError>;

    /// Connectivity probe for the health endpoint
    async fn ping(&self) -> Result<(), IdentityError>;
}

/// Create the Axum router with all routes and middleware
///
/// `/api/user/me` sits behind `require_account`; the other routes are public.
///
/// Middleware stack (outermost to innermost):
/// - Request timeout (tower::timeout) with HandleErrorLayer → 408
/// - Body size limit (tower-http::limit) → 413
/// - Tracing (tower-http::trace)
/// - Request id propagation (`x-request-id`)
pub fn create_router(app_state: &AppState) -> Router<AppState> {
    // Routes behind a bearer token
    let protected = Router::new()
        .route("/api/user/me", routing::get(handlers::account_handler))
        .route_layer(axum::middleware::from_fn_with_state(
            app_state.token_issuer.clone(),
            require_account,
        ));

    let router = Router::new()
        .route("/api/user/register", routing::post(handlers::register_handler))
        .route("/api/user/login", routing::post(handlers::login_handler))
        .route("/health", routing::get(handlers::health_handler))
        .route("/metrics", routing::get(handlers::metrics_handler))
        .merge(protected)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(middleware::tracing_layer());

    let body_limit = app_state.config.body_size_limit_bytes;
    let timeout_secs = app_state.config.request_timeout_secs;

    let router = router.layer(RequestBodyLimitLayer::new(body_limit));

    // HandleErrorLayer must come before timeout to catch the timeout error
    let middleware_stack = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(|e: BoxError| async move {
            if e.is::<tower::timeout::error::Elapsed>() {
                StatusCode::REQUEST_TIMEOUT
            } else {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }))
        .timeout(Duration::from_secs(timeout_secs))
        .into_inner();

    router.layer(middleware_stack)
}
