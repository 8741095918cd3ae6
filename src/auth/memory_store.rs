// In-memory account store for development and tests

use crate::api::AccountStore;
use crate::auth::password::CredentialHasher;
use crate::core::errors::IdentityError;
use crate::core::models::{Account, AccountId, Credentials};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

struct MemoryState {
    accounts: HashMap<String, Account>,
    next_id: i64,
}

/// Account store backed by a process-local map
///
/// Uniqueness is decided under the write lock, so concurrent registrations
/// of one login produce exactly one account. Contents are lost on restart.
pub struct MemoryAccountStore {
    hasher: CredentialHasher,
    state: RwLock<MemoryState>,
}

impl MemoryAccountStore {
    pub fn new(hasher: CredentialHasher) -> Self {
        Self {
            hasher,
            state: RwLock::new(MemoryState {
                accounts: HashMap::new(),
                next_id: 1,
            }),
        }
    }

    /// Number of stored accounts
    pub async fn account_count(&self) -> usize {
        self.state.read().await.accounts.len()
    }

    /// Look up an account by login
    pub async fn get(&self, login: &str) -> Option<Account> {
        self.state.read().await.accounts.get(login).cloned()
    }
}

#[async_trait]
impl AccountStore for MemoryAccountStore {
    async fn exists(&self, login: &str) -> Result<bool, IdentityError> {
        Ok(self.state.read().await.accounts.contains_key(login))
    }

    async fn create_account(&self, credentials: &Credentials) -> Result<AccountId, IdentityError> {
        // Hash outside the lock; Argon2 is the slow part
        let password_hash = self
            .hasher
            .hash_blocking(credentials.expose_password().to_string())
            .await?;

        let mut state = self.state.write().await;
        if state.accounts.contains_key(credentials.login()) {
            return Err(IdentityError::DuplicateLogin(credentials.login().to_string()));
        }

        let id = AccountId::new(state.next_id);
        state.next_id += 1;
        state.accounts.insert(
            credentials.login().to_string(),
            Account {
                id,
                login: credentials.login().to_string(),
                password_hash,
            },
        );
        Ok(id)
    }

    async fn authenticate(&self, credentials: &Credentials) -> Result<AccountId, IdentityError> {
        let account = self.get(credentials.login()).await;
        let stored_hash = account.as_ref().map(|a| a.password_hash.clone());

        let verified = self
            .hasher
            .verify_blocking(credentials.expose_password().to_string(), stored_hash)
            .await?;

        match account {
            Some(account) if verified => Ok(account.id),
            _ => Err(IdentityError::AuthenticationFailed),
        }
    }

    async fn ping(&self) -> Result<(), IdentityError> {
        Ok(())
    }
}
