//! Centralized configuration for the token issuer.
//!
//! All configuration is loaded from environment variables and validated
//! at startup.

use std::env;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::auth::OPENID_SCOPE;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid URL format
    #[error("Invalid URL for {field}: {reason}")]
    InvalidUrl {
        /// Variable holding the URL
        field: String,
        /// Parser message
        reason: String,
    },

    /// A duration was configured as zero
    #[error("Invalid {0}: must be greater than 0")]
    ZeroDuration(&'static str),

    /// Missing required field
    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    /// Environment variable parse error
    #[error("Failed to parse environment variable {name}: {reason}")]
    ParseError {
        /// Variable name
        name: String,
        /// Parser message
        reason: String,
    },
}

/// Token issuer configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Issuer (`iss`) and identifier of this server as a resource, an
    /// absolute URL in normalized form
    pub issuer: String,
    /// Audience stamped on access tokens
    pub audience: String,
    /// Lifetime of issued access and identity tokens
    pub access_token_ttl: Duration,
    /// Name of the parameter holding the certificate configuration
    pub certificate_parameter_name: String,
    /// Period of the certificate updater
    pub certificate_refresh_interval: Duration,
    /// Allow token requests without a client id
    pub accept_anonymous_clients: bool,
    /// Scopes granted on every request
    pub default_scopes: Vec<String>,
    /// Log level used when `RUST_LOG` is unset
    pub log_level: String,
    /// Emit JSON logs
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            issuer: DEFAULT_ISSUER.to_string(),
            audience: DEFAULT_ISSUER.to_string(),
            access_token_ttl: Duration::from_secs(3600),
            certificate_parameter_name: DEFAULT_PARAMETER_NAME.to_string(),
            certificate_refresh_interval: Duration::from_secs(60),
            accept_anonymous_clients: false,
            default_scopes: vec![OPENID_SCOPE.to_string()],
            log_level: "info".to_string(),
            log_json: true,
        }
    }
}

const DEFAULT_ISSUER: &str = "https://auth.local/";
const DEFAULT_PARAMETER_NAME: &str = "/token-issuer/signing-certificates";

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if variables are unparseable or fail validation.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let issuer = String::from(parse_url_env("TOKEN_ISSUER", DEFAULT_ISSUER)?);
        let audience = env::var("TOKEN_AUDIENCE").unwrap_or_else(|_| issuer.clone());

        let config = Self {
            audience,
            issuer,
            access_token_ttl: Duration::from_secs(parse_env("ACCESS_TOKEN_TTL", 3600)?),
            certificate_parameter_name: env::var("CERTIFICATE_PARAMETER_NAME")
                .unwrap_or_else(|_| DEFAULT_PARAMETER_NAME.to_string()),
            certificate_refresh_interval: Duration::from_secs(parse_env(
                "CERTIFICATE_REFRESH_INTERVAL",
                60,
            )?),
            accept_anonymous_clients: parse_env("ACCEPT_ANONYMOUS_CLIENTS", false)?,
            default_scopes: with_openid(parse_list_env("DEFAULT_SCOPES")),
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_json: parse_env("LOG_JSON", true)?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Err(e) = Url::parse(&self.issuer) {
            return Err(ConfigError::InvalidUrl {
                field: "TOKEN_ISSUER".to_string(),
                reason: e.to_string(),
            });
        }
        if self.access_token_ttl.is_zero() {
            return Err(ConfigError::ZeroDuration("ACCESS_TOKEN_TTL"));
        }
        if self.certificate_refresh_interval.is_zero() {
            return Err(ConfigError::ZeroDuration("CERTIFICATE_REFRESH_INTERVAL"));
        }
        if self.certificate_parameter_name.trim().is_empty() {
            return Err(ConfigError::MissingRequired(
                "CERTIFICATE_PARAMETER_NAME".to_string(),
            ));
        }
        if self.audience.trim().is_empty() {
            return Err(ConfigError::MissingRequired("TOKEN_AUDIENCE".to_string()));
        }
        Ok(())
    }

    /// The issuer as it appears in the `iss` claim.
    #[must_use]
    pub fn issuer_str(&self) -> &str {
        &self.issuer
    }
}

/// Ensure `openid` is part of the mandatory scope set.
fn with_openid(mut scopes: Vec<String>) -> Vec<String> {
    if !scopes.iter().any(|s| s == OPENID_SCOPE) {
        scopes.insert(0, OPENID_SCOPE.to_string());
    }
    scopes
}

/// Parse environment variable with default value.
fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(val) => val.parse().map_err(|e: T::Err| ConfigError::ParseError {
            name: name.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Ok(default),
    }
}

/// Parse a URL environment variable with a default value.
fn parse_url_env(name: &str, default: &str) -> Result<Url, ConfigError> {
    let url_str = env::var(name).unwrap_or_else(|_| default.to_string());
    Url::parse(&url_str).map_err(|e| ConfigError::InvalidUrl {
        field: name.to_string(),
        reason: e.to_string(),
    })
}

/// Parse a comma-separated list environment variable.
fn parse_list_env(name: &str) -> Vec<String> {
    env::var(name)
        .map(|v| {
            v.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.issuer_str(), "https://auth.local/");
        assert_eq!(config.audience, "https://auth.local/");
        assert_eq!(config.certificate_refresh_interval, Duration::from_secs(60));
        assert_eq!(config.default_scopes, vec!["openid".to_string()]);
    }

    #[test]
    fn test_relative_issuer_rejected() {
        let config = Config {
            issuer: "auth.local".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let config = Config {
            access_token_ttl: Duration::ZERO,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroDuration("ACCESS_TOKEN_TTL"))
        ));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = Config {
            certificate_refresh_interval: Duration::ZERO,
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroDuration("CERTIFICATE_REFRESH_INTERVAL"))
        ));
    }

    #[test]
    fn test_empty_parameter_name_rejected() {
        let config = Config {
            certificate_parameter_name: "  ".to_string(),
            ..Config::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingRequired(_))
        ));
    }

    #[test]
    fn test_openid_always_present() {
        assert_eq!(with_openid(vec![]), vec!["openid".to_string()]);
        assert_eq!(
            with_openid(vec!["profile".to_string()]),
            vec!["openid".to_string(), "profile".to_string()]
        );
        assert_eq!(
            with_openid(vec!["profile".to_string(), "openid".to_string()]),
            vec!["profile".to_string(), "openid".to_string()]
        );
    }

    #[test]
    fn test_parse_url_env_invalid() {
        let result = parse_url_env("TOKEN_ISSUER_NONEXISTENT_VAR", "not a url");
        assert!(matches!(result, Err(ConfigError::InvalidUrl { .. })));
    }

    #[test]
    fn test_parse_env_default_when_unset() {
        let value: u64 = parse_env("TOKEN_ISSUER_UNSET_NUMBER", 42).unwrap();
        assert_eq!(value, 42);
    }
}
