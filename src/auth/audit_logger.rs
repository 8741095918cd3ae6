// Security event logging

use crate::auth::flows::AuthFlow;
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{info, warn};

/// Authentication event type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEvent {
    RegisterSuccess,
    RegisterFailure { reason: String },
    LoginSuccess,
    LoginFailure { reason: String },
}

impl AuthEvent {
    /// Build the event for a finished flow; `reason` is the error kind on failure
    pub fn for_outcome(flow: AuthFlow, reason: Option<&str>) -> Self {
        match (flow, reason) {
            (AuthFlow::Register, None) => AuthEvent::RegisterSuccess,
            (AuthFlow::Register, Some(r)) => AuthEvent::RegisterFailure { reason: r.to_string() },
            (AuthFlow::Login, None) => AuthEvent::LoginSuccess,
            (AuthFlow::Login, Some(r)) => AuthEvent::LoginFailure { reason: r.to_string() },
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            AuthEvent::RegisterSuccess => "REGISTER_SUCCESS",
            AuthEvent::RegisterFailure { .. } => "REGISTER_FAILURE",
            AuthEvent::LoginSuccess => "LOGIN_SUCCESS",
            AuthEvent::LoginFailure { .. } => "LOGIN_FAILURE",
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            AuthEvent::RegisterFailure { reason } | AuthEvent::LoginFailure { reason } => Some(reason),
            _ => None,
        }
    }
}

/// Client details attached to audit events
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    /// Extract client details from request headers
    ///
    /// Checks `X-Forwarded-For` first (for proxied requests), then `X-Real-IP`.
    pub fn from_headers(headers: &axum::http::HeaderMap) -> Self {
        let ip_address = headers
            .get("x-forwarded-for")
            .or_else(|| headers.get("x-real-ip"))
            .and_then(|v| v.to_str().ok())
            .map(|s| s.split(',').next().unwrap_or(s).trim().to_string());
        let user_agent = headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        Self { ip_address, user_agent }
    }
}

/// Audit logger for security events
pub struct AuditLogger {
    db_pool: Option<Arc<PgPool>>,
}

impl AuditLogger {
    /// Create a new audit logger
    ///
    /// If `db_pool` is `None`, only structured logging will be used (no database persistence).
    pub fn new(db_pool: Option<Arc<PgPool>>) -> Self {
        Self { db_pool }
    }

    /// Log an authentication event
    ///
    /// This is fire-and-forget: it spawns an async task and doesn't block the request.
    /// Errors are logged but don't affect the request flow.
    pub fn log_auth_event(&self, event: AuthEvent, login: Option<&str>, client: &ClientInfo) {
        let db_pool = self.db_pool.clone();
        let login = login.map(|s| s.to_string());
        let client = client.clone();

        tokio::spawn(async move {
            match event.reason() {
                None => {
                    info!(
                        event = event.event_type(),
                        login = ?login,
                        ip_address = ?client.ip_address,
                        user_agent = ?client.user_agent,
                        "Authentication event"
                    );
                }
                Some(reason) => {
                    warn!(
                        event = event.event_type(),
                        login = ?login,
                        ip_address = ?client.ip_address,
                        user_agent = ?client.user_agent,
                        reason = %reason,
                        "Authentication event"
                    );
                }
            }

            if let Some(pool) = db_pool {
                if let Err(e) = sqlx::query(
                    "INSERT INTO auth_audit_log (login, event_type, reason, ip_address, user_agent)
                     VALUES ($1, $2, $3, $4, $5)",
                )
                .bind(&login)
                .bind(event.event_type())
                .bind(event.reason())
                .bind(&client.ip_address)
                .bind(&client.user_agent)
                .execute(pool.as_ref())
                .await
                {
                    warn!(error = %e, "Failed to write audit log to database");
                }
            }
        });
    }
}
