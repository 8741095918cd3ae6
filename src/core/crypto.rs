// Bearer token cryptography: Ed25519-signed compact JWTs

use crate::core::errors::CryptoError;
use crate::core::models::{AccountId, IssuedToken, TokenClaims};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use der::Decode;
use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use pkcs8::PrivateKeyInfo;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Default `iss` claim
pub const DEFAULT_ISSUER: &str = "keeper-identity";

/// Default token lifetime in seconds
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;

/// Longest accepted token lifetime (one year)
pub const MAX_TOKEN_TTL_SECS: i64 = 365 * 24 * 60 * 60;

/// DER prefix of the OCTET STRING wrapping an Ed25519 private key in PKCS8
const CURVE_PRIVATE_KEY_PREFIX: [u8; 2] = [0x04, 0x20];

#[derive(Serialize, Deserialize)]
struct TokenHeader {
    alg: String,
    typ: String,
}

/// Token issuer holding the process-wide signing key
///
/// The key is injected at construction and never changes for the lifetime of
/// the issuer.
pub struct TokenIssuer {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    issuer: String,
    ttl_secs: i64,
}

impl TokenIssuer {
    /// Create a new TokenIssuer from a SigningKey
    pub fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
            issuer: DEFAULT_ISSUER.to_string(),
            ttl_secs: DEFAULT_TOKEN_TTL_SECS,
        }
    }

    /// Create a TokenIssuer with a freshly generated key
    ///
    /// Tokens minted with an ephemeral key stop verifying after a restart.
    pub fn generate() -> Self {
        Self::from_signing_key(SigningKey::generate(&mut OsRng))
    }

    /// Create a new TokenIssuer by loading Ed25519 private key from PEM file
    ///
    /// The PEM file should contain a PKCS8-encoded Ed25519 private key
    /// (`openssl genpkey -algorithm ed25519`).
    pub fn from_pem_file(path: &Path) -> Result<Self, CryptoError> {
        let pem_bytes = fs::read(path)
            .map_err(|e| CryptoError::KeyLoadError(format!("Failed to read key file: {}", e)))?;

        let pem_str = std::str::from_utf8(&pem_bytes)
            .map_err(|e| CryptoError::KeyLoadError(format!("Invalid PEM encoding: {}", e)))?;

        Self::from_pem_str(pem_str)
    }

    /// Parse a PKCS8 PEM document containing an Ed25519 private key
    pub fn from_pem_str(pem_str: &str) -> Result<Self, CryptoError> {
        let pem = pem::parse(pem_str)
            .map_err(|e| CryptoError::KeyLoadError(format!("Failed to parse PEM: {}", e)))?;

        let pkcs8_key = PrivateKeyInfo::from_der(pem.contents())
            .map_err(|e| CryptoError::KeyLoadError(format!("Failed to parse PKCS8 DER: {}", e)))?;

        // RFC 8410 wraps the 32 key bytes in another OCTET STRING
        let key_bytes = match pkcs8_key.private_key {
            bytes if bytes.len() == 34 && bytes[..2] == CURVE_PRIVATE_KEY_PREFIX => &bytes[2..],
            bytes => bytes,
        };

        let key_array: [u8; 32] = key_bytes.try_into().map_err(|_| {
            CryptoError::KeyLoadError(format!(
                "Invalid Ed25519 key length: expected 32 bytes, got {}",
                key_bytes.len()
            ))
        })?;

        Ok(Self::from_signing_key(SigningKey::from_bytes(&key_array)))
    }

    /// Override the `iss` claim
    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.issuer = issuer.into();
        self
    }

    /// Override the token lifetime
    pub fn with_ttl_secs(mut self, ttl_secs: i64) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.verifying_key
    }

    /// Mint a bearer token for an account
    ///
    /// Payload structure:
    /// - iss: configured issuer
    /// - sub: account id
    /// - iat: current timestamp
    /// - exp: iat + ttl
    /// - jti: UUID v4, makes every token distinct
    pub fn issue_token(&self, account_id: AccountId) -> Result<IssuedToken, CryptoError> {
        let now = chrono::Utc::now().timestamp();
        if now < 0 {
            return Err(CryptoError::SigningError("System clock is before the epoch".to_string()));
        }
        self.issue_token_at(account_id, now)
    }

    /// Mint a token with an explicit issue time
    pub fn issue_token_at(&self, account_id: AccountId, now: i64) -> Result<IssuedToken, CryptoError> {
        if self.ttl_secs <= 0 {
            return Err(CryptoError::SigningError(format!("Invalid token ttl {}", self.ttl_secs)));
        }
        let exp = now
            .checked_add(self.ttl_secs)
            .ok_or_else(|| CryptoError::SigningError("Token expiry overflows".to_string()))?;

        let claims = TokenClaims {
            iss: self.issuer.clone(),
            sub: account_id.to_string(),
            iat: now,
            exp,
            jti: uuid::Uuid::new_v4().to_string(),
        };

        let header = TokenHeader {
            alg: "EdDSA".to_string(),
            typ: "JWT".to_string(),
        };

        // Encode header and payload as base64url (no padding)
        let header_b64 = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&header)
                .map_err(|e| CryptoError::SigningError(format!("Failed to serialize header: {}", e)))?,
        );
        let payload_b64 = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&claims)
                .map_err(|e| CryptoError::SigningError(format!("Failed to serialize claims: {}", e)))?,
        );

        let message = format!("{}.{}", header_b64, payload_b64);
        let signature = self.signing_key.sign(message.as_bytes());
        let signature_b64 = URL_SAFE_NO_PAD.encode(signature.to_bytes());

        Ok(IssuedToken {
            account_id,
            token: format!("{}.{}", message, signature_b64),
            expires_at: claims.exp,
        })
    }

    /// Verify a bearer token and return its claims
    pub fn verify_token(&self, token: &str) -> Result<TokenClaims, CryptoError> {
        self.verify_token_at(token, chrono::Utc::now().timestamp())
    }

    /// Verify a token against an explicit clock
    pub fn verify_token_at(&self, token: &str, now: i64) -> Result<TokenClaims, CryptoError> {
        let mut parts = token.split('.');
        let (header_b64, payload_b64, signature_b64) = match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(h), Some(p), Some(s), None) => (h, p, s),
            _ => return Err(CryptoError::MalformedToken("expected three segments".to_string())),
        };

        let header: TokenHeader = decode_segment(header_b64)?;
        if header.alg != "EdDSA" {
            return Err(CryptoError::MalformedToken(format!("unsupported alg '{}'", header.alg)));
        }

        let signature_bytes = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|e| CryptoError::MalformedToken(format!("signature encoding: {}", e)))?;
        let signature = Signature::from_slice(&signature_bytes)
            .map_err(|_| CryptoError::MalformedToken("signature length".to_string()))?;

        let message = format!("{}.{}", header_b64, payload_b64);
        self.verifying_key
            .verify_strict(message.as_bytes(), &signature)
            .map_err(|_| CryptoError::InvalidSignature)?;

        let claims: TokenClaims = decode_segment(payload_b64)?;
        if claims.iss != self.issuer {
            return Err(CryptoError::InvalidSignature);
        }
        if claims.exp <= now {
            return Err(CryptoError::TokenExpired);
        }

        Ok(claims)
    }
}

fn decode_segment<T: for<'de> Deserialize<'de>>(segment: &str) -> Result<T, CryptoError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| CryptoError::MalformedToken(format!("segment encoding: {}", e)))?;
    serde_json::from_slice(&bytes).map_err(|e| CryptoError::MalformedToken(format!("segment json: {}", e)))
}
