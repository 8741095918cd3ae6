// Common test utilities and helpers for all test modules
#![allow(dead_code)]

use axum::{
    body::Body,
    http::{header, Request, Response},
};
use keeper_identity::api::metrics::AuthMetrics;
use keeper_identity::api::{create_router, AccountStore, AppState};
use keeper_identity::auth::audit_logger::AuditLogger;
use keeper_identity::auth::flows::IdentityService;
use keeper_identity::auth::memory_store::MemoryAccountStore;
use keeper_identity::auth::password::CredentialHasher;
use keeper_identity::config::Config;
use keeper_identity::core::crypto::TokenIssuer;
use keeper_identity::core::errors::IdentityError;
use keeper_identity::core::models::{AccountId, Credentials};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower::ServiceExt;

/// Mock AccountStore with failure injection
///
/// Passwords are kept in plaintext; hashing is covered by the real stores.
#[derive(Default)]
pub struct MockAccountStore {
    pub accounts: Mutex<HashMap<String, (AccountId, String)>>,
    pub exists_should_fail: bool,
    pub create_should_fail: bool,
    pub authenticate_should_fail: bool,
    pub ping_should_fail: bool,
    pub hang: bool,
}

impl MockAccountStore {
    async fn maybe_hang(&self) {
        if self.hang {
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait::async_trait]
impl AccountStore for MockAccountStore {
    async fn exists(&self, login: &str) -> Result<bool, IdentityError> {
        self.maybe_hang().await;
        if self.exists_should_fail {
            return Err(IdentityError::Storage("connection refused".to_string()));
        }
        Ok(self.accounts.lock().await.contains_key(login))
    }

    async fn create_account(&self, credentials: &Credentials) -> Result<AccountId, IdentityError> {
        self.maybe_hang().await;
        if self.create_should_fail {
            return Err(IdentityError::Storage("insert failed".to_string()));
        }
        let mut accounts = self.accounts.lock().await;
        if accounts.contains_key(credentials.login()) {
            return Err(IdentityError::DuplicateLogin(credentials.login().to_string()));
        }
        let id = AccountId::new(accounts.len() as i64 + 1);
        accounts.insert(
            credentials.login().to_string(),
            (id, credentials.expose_password().to_string()),
        );
        Ok(id)
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<AccountId, IdentityError> {
        self.maybe_hang().await;
        if self.authenticate_should_fail {
            return Err(IdentityError::Storage("connection refused".to_string()));
        }
        match self.accounts.lock().await.get(credentials.login()) {
            Some((id, password)) if password == credentials.expose_password() => Ok(*id),
            _ => Err(IdentityError::AuthenticationFailed),
        }
    }

    async fn ping(&self) -> Result<(), IdentityError> {
        if self.ping_should_fail {
            return Err(IdentityError::Storage("ping failed".to_string()));
        }
        Ok(())
    }
}

/// Fast hasher for tests (argon2 minimum costs)
pub fn test_hasher() -> CredentialHasher {
    CredentialHasher::new(8, 1, 1).unwrap()
}

/// Build an AppState around the given store and config
pub fn app_state_with(store: Arc<dyn AccountStore + Send + Sync>, config: Config) -> AppState {
    let token_issuer = Arc::new(TokenIssuer::generate());
    let identity = Arc::new(IdentityService::new(
        store.clone(),
        token_issuer.clone(),
        config.credential_policy(),
        config.store_timeout(),
    ));

    AppState {
        identity,
        account_store: store,
        token_issuer,
        audit_logger: Arc::new(AuditLogger::new(None)),
        metrics: Arc::new(AuthMetrics::new().unwrap()),
        config: Arc::new(config),
    }
}

/// AppState backed by the real in-memory store
pub fn memory_app_state() -> (AppState, Arc<MemoryAccountStore>) {
    let store = Arc::new(MemoryAccountStore::new(test_hasher()));
    let state = app_state_with(store.clone(), Config::test_config());
    (state, store)
}

/// AppState backed by a mock store
pub fn mock_app_state(store: MockAccountStore) -> AppState {
    app_state_with(Arc::new(store), Config::test_config())
}

/// AppState whose store never answers, with a short store timeout
pub fn hanging_app_state() -> AppState {
    let mut config = Config::test_config();
    config.store_timeout_secs = 1;
    app_state_with(
        Arc::new(MockAccountStore {
            hang: true,
            ..Default::default()
        }),
        config,
    )
}

pub fn credentials_body(login: &str, password: &str) -> String {
    serde_json::json!({ "login": login, "password": password }).to_string()
}

pub fn post_json(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

pub fn register_request(login: &str, password: &str) -> Request<Body> {
    post_json("/api/user/register", credentials_body(login, password))
}

pub fn login_request(login: &str, password: &str) -> Request<Body> {
    post_json("/api/user/login", credentials_body(login, password))
}

/// Send one request through a fresh router over the given state
pub async fn send(state: &AppState, request: Request<Body>) -> Response<Body> {
    create_router(state)
        .with_state(state.clone())
        .oneshot(request)
        .await
        .unwrap()
}

/// Token from the Authorization response header, if any
pub fn authorization(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::AUTHORIZATION)
        .map(|v| v.to_str().unwrap().to_string())
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}
