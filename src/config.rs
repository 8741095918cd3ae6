// Configuration management

use crate::auth::password::CredentialHasher;
use crate::auth::validator::CredentialPolicy;
use crate::core::crypto::MAX_TOKEN_TTL_SECS;
use crate::core::errors::IdentityError;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration loaded from environment variables
///
/// Runs against PostgreSQL when `DATABASE_URL` is set and against the
/// in-memory store otherwise. All values are validated on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Server configuration
    pub bind_address: String,
    pub port: u16,

    // Database configuration (optional)
    pub database_url: Option<String>,
    pub database_max_connections: u32,

    // Token configuration
    pub token_signing_key_path: Option<PathBuf>,
    pub token_ttl_secs: u64,
    pub token_issuer: String,

    // Store and middleware configuration
    pub store_timeout_secs: u64,
    pub request_timeout_secs: u64,
    pub body_size_limit_bytes: usize,

    // Credential policy
    pub login_max_len: usize,
    pub password_min_len: usize,
    pub password_max_len: usize,

    // Argon2 cost parameters
    pub argon2_memory_kib: u32,
    pub argon2_iterations: u32,
    pub argon2_parallelism: u32,

    // Logging configuration
    pub log_level: String,
    pub log_format: String, // "json" or "text"
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Supports `.env` file loading in development (via dotenv crate).
    pub fn from_env() -> Result<Self, IdentityError> {
        // Skip in test environment to avoid interfering with test environment variables
        #[cfg(not(test))]
        {
            dotenv::dotenv().ok();
        }

        let config = Self {
            bind_address: Self::get_env_or_default("BIND_ADDRESS", "0.0.0.0"),
            port: Self::parse_port()?,
            database_url: Self::get_optional_env("DATABASE_URL"),
            database_max_connections: Self::parse_or_default("DATABASE_MAX_CONNECTIONS", 10)?,
            token_signing_key_path: Self::get_optional_env("TOKEN_SIGNING_KEY_PATH").map(PathBuf::from),
            token_ttl_secs: Self::parse_or_default("TOKEN_TTL_SECS", 3600)?,
            token_issuer: Self::get_env_or_default("TOKEN_ISSUER", crate::core::crypto::DEFAULT_ISSUER),
            store_timeout_secs: Self::parse_or_default("STORE_TIMEOUT_SECS", 5)?,
            request_timeout_secs: Self::parse_or_default("REQUEST_TIMEOUT_SECS", 30)?,
            body_size_limit_bytes: Self::parse_or_default("BODY_SIZE_LIMIT_BYTES", 64 * 1024)?,
            login_max_len: Self::parse_or_default("LOGIN_MAX_LEN", 128)?,
            password_min_len: Self::parse_or_default("PASSWORD_MIN_LEN", 1)?,
            password_max_len: Self::parse_or_default("PASSWORD_MAX_LEN", 1024)?,
            argon2_memory_kib: Self::parse_or_default("ARGON2_MEMORY_KIB", 19 * 1024)?,
            argon2_iterations: Self::parse_or_default("ARGON2_ITERATIONS", 2)?,
            argon2_parallelism: Self::parse_or_default("ARGON2_PARALLELISM", 1)?,
            log_level: Self::get_env_or_default("LOG_LEVEL", "info"),
            log_format: Self::get_env_or_default("LOG_FORMAT", "json"),
        };

        config.validate()?;

        Ok(config)
    }

    /// Get environment variable or return default value
    fn get_env_or_default(key: &str, default: &str) -> String {
        env::var(key).unwrap_or_else(|_| default.to_string())
    }

    /// Get optional environment variable, treating empty as unset
    fn get_optional_env(key: &str) -> Option<String> {
        match env::var(key) {
            Ok(value) if !value.is_empty() => Some(value),
            _ => None,
        }
    }

    /// Parse port from PORT environment variable
    fn parse_port() -> Result<u16, IdentityError> {
        let port_str = env::var("PORT").unwrap_or_else(|_| "8080".to_string());
        let port = port_str.parse::<u16>().map_err(|e| {
            IdentityError::Configuration(format!("Invalid PORT value '{}': {}", port_str, e))
        })?;

        if port == 0 {
            return Err(IdentityError::Configuration(
                "PORT must be between 1 and 65535".to_string(),
            ));
        }

        Ok(port)
    }

    /// Parse a positive number from an environment variable or return default
    fn parse_or_default<T>(key: &str, default: T) -> Result<T, IdentityError>
    where
        T: std::str::FromStr + PartialEq + Default,
        T::Err: std::fmt::Display,
    {
        match env::var(key) {
            Ok(value) => {
                let parsed = value.parse::<T>().map_err(|e| {
                    IdentityError::Configuration(format!("Invalid {} value '{}': {}", key, value, e))
                })?;

                if parsed == T::default() {
                    return Err(IdentityError::Configuration(format!(
                        "{} must be greater than 0",
                        key
                    )));
                }

                Ok(parsed)
            }
            _ => Ok(default),
        }
    }

    /// Validate all configuration values
    fn validate(&self) -> Result<(), IdentityError> {
        if let Some(ref path) = self.token_signing_key_path {
            Self::validate_file_path(path, "Token signing key file")?;
        }

        if let Some(ref url) = self.database_url {
            Self::validate_url(url, "Database URL")?;
        }

        self.token_ttl()?;

        if self.password_min_len > self.password_max_len {
            return Err(IdentityError::Configuration(format!(
                "PASSWORD_MIN_LEN ({}) exceeds PASSWORD_MAX_LEN ({})",
                self.password_min_len, self.password_max_len
            )));
        }

        // Rejects memory below 8 KiB per lane and similar
        self.credential_hasher()?;

        Self::validate_log_level(&self.log_level)?;
        Self::validate_log_format(&self.log_format)?;

        Ok(())
    }

    /// Validate that a file path exists and is readable
    fn validate_file_path(path: &PathBuf, description: &str) -> Result<(), IdentityError> {
        if !path.is_file() {
            return Err(IdentityError::Configuration(format!(
                "{} not found at {:?}",
                description, path
            )));
        }

        std::fs::File::open(path).map_err(|e| {
            IdentityError::Configuration(format!("Cannot read {} at {:?}: {}", description, path, e))
        })?;

        Ok(())
    }

    /// Validate URL format
    fn validate_url(url: &str, description: &str) -> Result<(), IdentityError> {
        url::Url::parse(url).map_err(|e| {
            IdentityError::Configuration(format!("Invalid {} '{}': {}", description, url, e))
        })?;
        Ok(())
    }

    /// Validate log level
    fn validate_log_level(level: &str) -> Result<(), IdentityError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&level.to_lowercase().as_str()) {
            return Err(IdentityError::Configuration(format!(
                "Invalid LOG_LEVEL '{}': must be one of {}",
                level,
                valid_levels.join(", ")
            )));
        }
        Ok(())
    }

    /// Validate log format
    fn validate_log_format(format: &str) -> Result<(), IdentityError> {
        if format != "json" && format != "text" {
            return Err(IdentityError::Configuration(format!(
                "Invalid LOG_FORMAT '{}': must be 'json' or 'text'",
                format
            )));
        }
        Ok(())
    }

    /// Credential policy described by this configuration
    pub fn credential_policy(&self) -> CredentialPolicy {
        CredentialPolicy {
            login_max_len: self.login_max_len,
            password_min_len: self.password_min_len,
            password_max_len: self.password_max_len,
        }
    }

    /// Password hasher described by this configuration
    pub fn credential_hasher(&self) -> Result<CredentialHasher, IdentityError> {
        CredentialHasher::new(self.argon2_memory_kib, self.argon2_iterations, self.argon2_parallelism)
    }

    /// Token lifetime, bounded by `MAX_TOKEN_TTL_SECS`
    pub fn token_ttl(&self) -> Result<i64, IdentityError> {
        i64::try_from(self.token_ttl_secs)
            .ok()
            .filter(|ttl| *ttl <= MAX_TOKEN_TTL_SECS)
            .ok_or_else(|| {
                IdentityError::Configuration(format!(
                    "TOKEN_TTL_SECS ({}) exceeds the maximum of {}",
                    self.token_ttl_secs, MAX_TOKEN_TTL_SECS
                ))
            })
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_secs(self.store_timeout_secs)
    }

    /// Create a test configuration for unit tests
    ///
    /// This bypasses environment variable loading and file validation.
    /// Argon2 costs are set to the minimum so tests stay fast.
    pub fn test_config() -> Self {
        Self {
            bind_address: "127.0.0.1".to_string(),
            port: 8080,
            database_url: None,
            database_max_connections: 10,
            token_signing_key_path: None,
            token_ttl_secs: 3600,
            token_issuer: crate::core::crypto::DEFAULT_ISSUER.to_string(),
            store_timeout_secs: 5,
            request_timeout_secs: 30,
            body_size_limit_bytes: 64 * 1024,
            login_max_len: 128,
            password_min_len: 1,
            password_max_len: 1024,
            argon2_memory_kib: 8,
            argon2_iterations: 1,
            argon2_parallelism: 1,
            log_level: "info".to_string(),
            log_format: "json".to_string(),
        }
    }
}
