// Domain error types - status codes only, no information disclosure

use thiserror::Error;

/// Main error type for the identity service
#[derive(Error, Debug)]
pub enum IdentityError {
    /// Request body is not a structurally valid credential payload (HTTP 400)
    #[error("Cannot decode credential payload: {0}")]
    Decode(String),

    /// Credential pair violates the credential policy (HTTP 400)
    #[error("Invalid credential format: {0}")]
    InvalidCredentialFormat(String),

    /// Login is already registered (HTTP 409)
    #[error("Login '{0}' already exists")]
    DuplicateLogin(String),

    /// Persistent store failure or timeout (HTTP 500)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Unknown login or wrong password, deliberately undifferentiated (HTTP 401)
    #[error("Authentication failed")]
    AuthenticationFailed,

    /// Token could not be minted (HTTP 500)
    #[error("Token signing error: {0}")]
    TokenSigning(#[from] CryptoError),

    /// Bearer token rejected by the verifier (HTTP 401)
    #[error("Unauthorized: {0}")]
    Unauthorized(CryptoError),

    /// Configuration error (HTTP 500)
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Token cryptography errors
#[derive(Error, Debug)]
pub enum CryptoError {
    /// Failed to load private key
    #[error("Failed to load private key: {0}")]
    KeyLoadError(String),

    /// Failed to sign token
    #[error("Failed to sign token: {0}")]
    SigningError(String),

    /// Token is not a well-formed compact JWT
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    /// Signature or issuer does not match
    #[error("Invalid token signature")]
    InvalidSignature,

    /// Token is past its expiry
    #[error("Token expired")]
    TokenExpired,
}

impl IdentityError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            IdentityError::Decode(_) => 400,
            IdentityError::InvalidCredentialFormat(_) => 400,
            IdentityError::DuplicateLogin(_) => 409,
            IdentityError::Storage(_) => 500,
            IdentityError::AuthenticationFailed => 401,
            IdentityError::TokenSigning(_) => 500,
            IdentityError::Unauthorized(_) => 401,
            IdentityError::Configuration(_) => 500,
        }
    }

    /// Stable label used for log fields and metric outcomes
    pub fn kind(&self) -> &'static str {
        match self {
            IdentityError::Decode(_) => "decode_error",
            IdentityError::InvalidCredentialFormat(_) => "invalid_credential_format",
            IdentityError::DuplicateLogin(_) => "duplicate_login",
            IdentityError::Storage(_) => "storage_error",
            IdentityError::AuthenticationFailed => "authentication_failed",
            IdentityError::TokenSigning(_) => "token_signing_error",
            IdentityError::Unauthorized(_) => "unauthorized",
            IdentityError::Configuration(_) => "configuration_error",
        }
    }

    /// Client-caused failures (4xx) as opposed to infrastructure faults (5xx)
    pub fn is_client_error(&self) -> bool {
        self.status_code() < 500
    }
}
