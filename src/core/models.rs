//! Domain models for the identity service.
//!
//! The credential payload goes through two stages: [`CredentialPayload`] is the
//! structural decode of a request body, and [`Credentials`] is the value that
//! passed the credential policy. Only the latter reaches the account store.

use crate::core::errors::IdentityError;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Newtype wrapper around the store-assigned account identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(i64);

impl AccountId {
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    pub fn get(&self) -> i64 {
        self.0
    }
}

impl FromStr for AccountId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<i64>().map(AccountId)
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Credential payload as decoded from a JSON request body
#[derive(Clone, Deserialize)]
pub struct CredentialPayload {
    pub login: String,
    pub password: String,
}

impl CredentialPayload {
    /// Structural decode of a request body
    ///
    /// Missing fields, wrong types and malformed JSON all fail with
    /// `IdentityError::Decode`. Semantic checks happen in the credential policy.
    pub fn decode(body: &[u8]) -> Result<Self, IdentityError> {
        serde_json::from_slice(body).map_err(|e| IdentityError::Decode(e.to_string()))
    }
}

impl fmt::Debug for CredentialPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPayload")
            .field("login", &self.login)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

/// Validated credential pair
///
/// Constructed only by `CredentialPolicy`. The password is kept behind
/// `secrecy::Secret` so it cannot end up in logs.
pub struct Credentials {
    login: String,
    password: Secret<String>,
}

impl Credentials {
    pub(crate) fn new(login: String, password: String) -> Self {
        Self {
            login,
            password: Secret::new(password),
        }
    }

    pub fn login(&self) -> &str {
        &self.login
    }

    /// Expose the plaintext password (hashing and verification only)
    pub fn expose_password(&self) -> &str {
        self.password.expose_secret()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("login", &self.login)
            .field("password", &"<REDACTED>")
            .finish()
    }
}

/// Persisted account record
#[derive(Debug, Clone)]
pub struct Account {
    pub id: AccountId,
    pub login: String,
    pub password_hash: String,
}

/// Claims carried by a bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub iss: String,
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl TokenClaims {
    /// Account the token was issued to
    pub fn account_id(&self) -> Option<AccountId> {
        self.sub.parse().ok()
    }
}

/// Result of a successful registration or login
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub account_id: AccountId,
    pub token: String,
    pub expires_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_valid_payload() {
        let payload = CredentialPayload::decode(br#"{"login":"alice","password":"pw1"}"#).unwrap();
        assert_eq!(payload.login, "alice");
        assert_eq!(payload.password, "pw1");
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let payload =
            CredentialPayload::decode(br#"{"login":"alice","password":"pw1","remember":true}"#).unwrap();
        assert_eq!(payload.login, "alice");
    }

    #[test]
    fn test_decode_rejects_missing_field() {
        let result = CredentialPayload::decode(br#"{"login":"alice"}"#);
        assert!(matches!(result, Err(IdentityError::Decode(_))));
    }

    #[test]
    fn test_decode_rejects_malformed_json() {
        assert!(matches!(CredentialPayload::decode(b"{login:"), Err(IdentityError::Decode(_))));
        assert!(matches!(CredentialPayload::decode(b""), Err(IdentityError::Decode(_))));
        assert!(matches!(
            CredentialPayload::decode(br#"{"login":1,"password":"x"}"#),
            Err(IdentityError::Decode(_))
        ));
    }

    #[test]
    fn test_password_redacted_in_debug() {
        let payload = CredentialPayload::decode(br#"{"login":"alice","password":"hunter2"}"#).unwrap();
        assert!(!format!("{:?}", payload).contains("hunter2"));

        let credentials = Credentials::new("alice".to_string(), "hunter2".to_string());
        let debug_str = format!("{:?}", credentials);
        assert!(!debug_str.contains("hunter2"));
        assert!(debug_str.contains("<REDACTED>"));
        assert_eq!(credentials.expose_password(), "hunter2");
    }

    #[test]
    fn test_account_id_roundtrip_through_subject() {
        let claims = TokenClaims {
            iss: "keeper-identity".to_string(),
            sub: AccountId::new(42).to_string(),
            iat: 0,
            exp: 60,
            jti: "n".to_string(),
        };
        assert_eq!(claims.account_id(), Some(AccountId::new(42)));

        let bogus = TokenClaims { sub: "not-a-number".to_string(), ..claims };
        assert_eq!(bogus.account_id(), None);
    }
}
