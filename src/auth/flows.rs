//! Registration and login flows.
//!
//! Both flows are linear and stop at the first failure:
//!
//! - register: validate → exists (advisory) → create_account (authoritative) → issue token
//! - login: validate shape → authenticate → issue token
//!
//! Every store call is bounded by the configured store timeout. Stores hash
//! and verify passwords inside `create_account` and `authenticate`, so that
//! Argon2 work, including any wait for a blocking-pool thread, counts against
//! the same budget. Size `STORE_TIMEOUT_SECS` for the configured Argon2 cost.

use crate::api::AccountStore;
use crate::auth::validator::CredentialPolicy;
use crate::core::crypto::TokenIssuer;
use crate::core::errors::IdentityError;
use crate::core::models::{CredentialPayload, IssuedToken};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Which flow a request went through, for logs, metrics and audit events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlow {
    Register,
    Login,
}

impl AuthFlow {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthFlow::Register => "register",
            AuthFlow::Login => "login",
        }
    }
}

/// Orchestrates credential validation, the account store and the token issuer
pub struct IdentityService {
    store: Arc<dyn AccountStore + Send + Sync>,
    issuer: Arc<TokenIssuer>,
    policy: CredentialPolicy,
    store_timeout: Duration,
}

impl IdentityService {
    pub fn new(
        store: Arc<dyn AccountStore + Send + Sync>,
        issuer: Arc<TokenIssuer>,
        policy: CredentialPolicy,
        store_timeout: Duration,
    ) -> Self {
        Self {
            store,
            issuer,
            policy,
            store_timeout,
        }
    }

    /// Register a new account and issue its first token
    pub async fn register(&self, payload: CredentialPayload) -> Result<IssuedToken, IdentityError> {
        let credentials = self.policy.validate_registration(payload)?;

        if self.bounded(self.store.exists(credentials.login())).await? {
            return Err(IdentityError::DuplicateLogin(credentials.login().to_string()));
        }

        let account_id = self.bounded(self.store.create_account(&credentials)).await?;
        debug!(account_id = %account_id, "Account created");

        Ok(self.issuer.issue_token(account_id)?)
    }

    /// Authenticate an existing account and issue a token
    pub async fn login(&self, payload: CredentialPayload) -> Result<IssuedToken, IdentityError> {
        let credentials = self.policy.validate_shape(payload)?;

        let account_id = self.bounded(self.store.authenticate(&credentials)).await?;
        debug!(account_id = %account_id, "Credentials verified");

        Ok(self.issuer.issue_token(account_id)?)
    }

    /// Run a store call under the store timeout
    ///
    /// On timeout the store future is dropped, which cancels the call.
    async fn bounded<T>(&self, call: impl Future<Output = Result<T, IdentityError>>) -> Result<T, IdentityError> {
        tokio::time::timeout(self.store_timeout, call)
            .await
            .map_err(|_| {
                IdentityError::Storage(format!(
                    "store call timed out after {}ms",
                    self.store_timeout.as_millis()
                ))
            })?
    }
}
