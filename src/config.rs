// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! Everything is read once at startup and handed to the services explicitly;
//! request handling never looks at the process environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Minimum length for HS256 signing secrets (256 bits).
const MIN_SECRET_LENGTH: usize = 32;

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    // --- Environment Variables (non-sensitive) ---
    /// Server port
    pub port: u16,
    /// Browser origin allowed by CORS
    pub cors_origin: String,
    /// GCP project ID (Firestore)
    pub gcp_project_id: String,
    /// Where multipart uploads are staged before going to the media host
    pub upload_dir: PathBuf,
    /// Access token lifetime
    pub access_token_ttl: Duration,
    /// Refresh token lifetime
    pub refresh_token_ttl: Duration,

    // --- Secrets ---
    /// JWT signing key for access tokens (raw bytes)
    pub access_token_secret: Vec<u8>,
    /// JWT signing key for refresh tokens (raw bytes)
    pub refresh_token_secret: Vec<u8>,
    /// Media host credentials
    pub media: MediaConfig,
}

/// Credentials for the Cloudinary-compatible media host.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl Default for Config {
    /// Default config for testing only.
    fn default() -> Self {
        Self {
            port: 8000,
            cors_origin: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            upload_dir: env::temp_dir().join("vidtube-uploads"),
            access_token_ttl: Duration::from_secs(15 * 60),
            refresh_token_ttl: Duration::from_secs(10 * 24 * 60 * 60),
            access_token_secret: b"test_access_secret_32_bytes_min!!".to_vec(),
            refresh_token_secret: b"test_refresh_secret_32_bytes_min!".to_vec(),
            media: MediaConfig {
                cloud_name: "test-cloud".to_string(),
                api_key: "test_api_key".to_string(),
                api_secret: "test_api_secret".to_string(),
            },
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is honoured for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let config = Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT", "not a port number".to_string()))?,
            cors_origin: env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            upload_dir: env::var("UPLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./public/temp")),
            access_token_ttl: parse_ttl(
                "ACCESS_TOKEN_EXPIRY",
                &env::var("ACCESS_TOKEN_EXPIRY").unwrap_or_else(|_| "1d".to_string()),
            )?,
            refresh_token_ttl: parse_ttl(
                "REFRESH_TOKEN_EXPIRY",
                &env::var("REFRESH_TOKEN_EXPIRY").unwrap_or_else(|_| "10d".to_string()),
            )?,

            access_token_secret: required("ACCESS_TOKEN_SECRET")?.into_bytes(),
            refresh_token_secret: required("REFRESH_TOKEN_SECRET")?.into_bytes(),
            media: MediaConfig {
                cloud_name: required("CLOUDINARY_CLOUD_NAME")?,
                api_key: required("CLOUDINARY_API_KEY")?,
                api_secret: required("CLOUDINARY_API_SECRET")?,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject signing secrets that are too short or shared between token classes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, secret) in [
            ("ACCESS_TOKEN_SECRET", &self.access_token_secret),
            ("REFRESH_TOKEN_SECRET", &self.refresh_token_secret),
        ] {
            if secret.len() < MIN_SECRET_LENGTH {
                return Err(ConfigError::Invalid(
                    name,
                    format!("must be at least {} bytes", MIN_SECRET_LENGTH),
                ));
            }
        }

        if self.access_token_secret == self.refresh_token_secret {
            return Err(ConfigError::Invalid(
                "REFRESH_TOKEN_SECRET",
                "must differ from ACCESS_TOKEN_SECRET".to_string(),
            ));
        }

        Ok(())
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .map(|v| v.trim().to_string())
        .map_err(|_| ConfigError::Missing(name))
}

/// Longest accepted token lifetime (one year).
pub const MAX_TTL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Parse a token lifetime such as `900`, `15m`, `12h` or `10d`.
///
/// A bare number is taken as seconds. Lifetimes above [`MAX_TTL`] are rejected.
pub fn parse_ttl(name: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    let raw = raw.trim();
    let invalid = || ConfigError::Invalid(name, format!("unrecognised duration '{}'", raw));

    let (digits, unit) = match raw.char_indices().find(|(_, c)| !c.is_ascii_digit()) {
        Some((idx, _)) => raw.split_at(idx),
        None => (raw, "s"),
    };

    let value: u64 = digits.parse().map_err(|_| invalid())?;
    let multiplier = match unit {
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        "d" => 24 * 60 * 60,
        "w" => 7 * 24 * 60 * 60,
        _ => return Err(invalid()),
    };

    if value == 0 {
        return Err(ConfigError::Invalid(name, "must be positive".to_string()));
    }

    let ttl = value
        .checked_mul(multiplier)
        .map(Duration::from_secs)
        .filter(|ttl| *ttl <= MAX_TTL)
        .ok_or_else(|| ConfigError::Invalid(name, format!("'{}' exceeds one year", raw)))?;

    Ok(ttl)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1}")]
    Invalid(&'static str, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_env() {
        // Set required env vars for test
        env::set_var("ACCESS_TOKEN_SECRET", "test_access_secret_32_bytes_min!!");
        env::set_var("REFRESH_TOKEN_SECRET", "test_refresh_secret_32_bytes_min!");
        env::set_var("ACCESS_TOKEN_EXPIRY", "15m");
        env::set_var("CLOUDINARY_CLOUD_NAME", "demo");
        env::set_var("CLOUDINARY_API_KEY", "key");
        env::set_var("CLOUDINARY_API_SECRET", "secret");

        let config = Config::from_env().expect("Config should load");

        assert_eq!(config.access_token_ttl, Duration::from_secs(900));
        assert_eq!(config.media.cloud_name, "demo");
        assert_ne!(config.access_token_secret, config.refresh_token_secret);
    }

    #[test]
    fn test_parse_ttl_units() {
        assert_eq!(parse_ttl("X", "900").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_ttl("X", "15m").unwrap(), Duration::from_secs(900));
        assert_eq!(parse_ttl("X", "1h").unwrap(), Duration::from_secs(3600));
        assert_eq!(parse_ttl("X", " 10d ").unwrap(), Duration::from_secs(864_000));
    }

    #[test]
    fn test_parse_ttl_rejects_garbage() {
        assert!(parse_ttl("X", "").is_err());
        assert!(parse_ttl("X", "d").is_err());
        assert!(parse_ttl("X", "10y").is_err());
        assert!(parse_ttl("X", "0").is_err());
        assert!(parse_ttl("X", "1.5h").is_err());
    }

    #[test]
    fn test_parse_ttl_rejects_oversized() {
        assert!(matches!(
            parse_ttl("REFRESH_TOKEN_EXPIRY", "99999999999999999d"),
            Err(ConfigError::Invalid("REFRESH_TOKEN_EXPIRY", _))
        ));
        assert!(parse_ttl("X", "53w").is_err());
        assert_eq!(parse_ttl("X", "365d").unwrap(), MAX_TTL);
    }

    #[test]
    fn test_validate_rejects_shared_secret() {
        let mut config = Config::default();
        config.refresh_token_secret = config.access_token_secret.clone();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid("REFRESH_TOKEN_SECRET", _))
        ));
    }

    #[test]
    fn test_validate_rejects_short_secret() {
        let config = Config {
            access_token_secret: b"short".to_vec(),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid("ACCESS_TOKEN_SECRET", _))
        ));
        assert!(Config::default().validate().is_ok());
    }
}
