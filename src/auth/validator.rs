// Credential policy: semantic validation of decoded credential payloads

use crate::core::errors::IdentityError;
use crate::core::models::{CredentialPayload, Credentials};

/// Minimal credential policy
///
/// Both flows require non-empty fields. Registration additionally applies
/// length and character limits; login deliberately does not, so tightening
/// the policy never locks existing accounts out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPolicy {
    pub login_max_len: usize,
    pub password_min_len: usize,
    pub password_max_len: usize,
}

impl Default for CredentialPolicy {
    fn default() -> Self {
        Self {
            login_max_len: 128,
            password_min_len: 1,
            password_max_len: 1024,
        }
    }
}

impl CredentialPolicy {
    /// Shape check shared by both flows: fields non-empty after trimming
    pub fn validate_shape(&self, payload: CredentialPayload) -> Result<Credentials, IdentityError> {
        if payload.login.trim().is_empty() {
            return Err(IdentityError::InvalidCredentialFormat("login is empty".to_string()));
        }
        if payload.password.trim().is_empty() {
            return Err(IdentityError::InvalidCredentialFormat("password is empty".to_string()));
        }
        Ok(Credentials::new(payload.login, payload.password))
    }

    /// Full policy applied before an account is created
    pub fn validate_registration(&self, payload: CredentialPayload) -> Result<Credentials, IdentityError> {
        let login_len = payload.login.chars().count();
        let password_len = payload.password.chars().count();

        let credentials = self.validate_shape(payload)?;
        let login = credentials.login();

        if login_len > self.login_max_len {
            return Err(IdentityError::InvalidCredentialFormat(format!(
                "login longer than {} characters",
                self.login_max_len
            )));
        }
        if login.trim() != login {
            return Err(IdentityError::InvalidCredentialFormat(
                "login has leading or trailing whitespace".to_string(),
            ));
        }
        if login.chars().any(char::is_control) {
            return Err(IdentityError::InvalidCredentialFormat(
                "login contains control characters".to_string(),
            ));
        }
        if password_len < self.password_min_len {
            return Err(IdentityError::InvalidCredentialFormat(format!(
                "password shorter than {} characters",
                self.password_min_len
            )));
        }
        if password_len > self.password_max_len {
            return Err(IdentityError::InvalidCredentialFormat(format!(
                "password longer than {} characters",
                self.password_max_len
            )));
        }

        Ok(credentials)
    }
}
