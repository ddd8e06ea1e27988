use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::token::TokenConfig;

/// Configuration loading failures. All of these abort startup; there are
/// no insecure runtime fallbacks.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingVar(&'static str),

    #[error("invalid value for {var}: {reason}")]
    InvalidVar { var: &'static str, reason: String },

    #[error("no identity provider configured; set GOOGLE_CLIENT_ID or APPLE_CLIENT_ID")]
    NoProvider,
}

/// Configuration for a single OIDC provider with a static client secret.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: Url,
}

/// Apple-specific configuration (uses a signed JWT as the client secret).
#[derive(Debug, Clone)]
pub struct AppleConfig {
    pub client_id: String,
    pub team_id: String,
    pub key_id: String,
    /// PEM-encoded ES256 private key.
    pub private_key: String,
    pub redirect_uri: Url,
}

/// Complete auth configuration.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub google: Option<ProviderConfig>,
    pub apple: Option<AppleConfig>,
    pub token: TokenConfig,
    pub base_url: Url,
}

impl AuthConfig {
    /// Load from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `AUTH_BASE_URL`: Base URL callback redirects are derived from (required)
    /// - `TOKEN_SIGNING_SECRET`: HMAC secret for session tokens (required, non-empty)
    /// - `TOKEN_TTL_SECS`: Session token TTL in seconds (required)
    /// - `GOOGLE_CLIENT_ID` / `GOOGLE_CLIENT_SECRET`: enable Google auth
    /// - `APPLE_CLIENT_ID` / `APPLE_TEAM_ID` / `APPLE_KEY_ID` / `APPLE_PRIVATE_KEY`:
    ///   enable Apple auth
    ///
    /// At least one provider must be fully configured.
    ///
    /// # Errors
    ///
    /// Returns an error when a required variable is absent or unparsable,
    /// when a provider is partially configured, or when no provider is
    /// configured at all.
    pub fn from_env() -> Result<Self, ConfigError> {
        let base_url: Url = require("AUTH_BASE_URL")?
            .parse()
            .map_err(|e: url::ParseError| ConfigError::InvalidVar {
                var: "AUTH_BASE_URL",
                reason: e.to_string(),
            })?;

        let google = match std::env::var("GOOGLE_CLIENT_ID") {
            Ok(client_id) => Some(ProviderConfig {
                client_id,
                client_secret: require("GOOGLE_CLIENT_SECRET")?,
                redirect_uri: join(&base_url, "/auth/google/callback")?,
            }),
            Err(_) => None,
        };

        let apple = match std::env::var("APPLE_CLIENT_ID") {
            Ok(client_id) => Some(AppleConfig {
                client_id,
                team_id: require("APPLE_TEAM_ID")?,
                key_id: require("APPLE_KEY_ID")?,
                private_key: require("APPLE_PRIVATE_KEY")?,
                redirect_uri: join(&base_url, "/auth/apple/callback")?,
            }),
            Err(_) => None,
        };

        if google.is_none() && apple.is_none() {
            return Err(ConfigError::NoProvider);
        }

        let signing_secret = require("TOKEN_SIGNING_SECRET")?;
        if signing_secret.is_empty() {
            return Err(ConfigError::InvalidVar {
                var: "TOKEN_SIGNING_SECRET",
                reason: "must not be empty".to_string(),
            });
        }

        let ttl_secs: u64 =
            require("TOKEN_TTL_SECS")?
                .parse()
                .map_err(|e: std::num::ParseIntError| ConfigError::InvalidVar {
                    var: "TOKEN_TTL_SECS",
                    reason: e.to_string(),
                })?;

        Ok(Self {
            google,
            apple,
            token: TokenConfig {
                signing_secret,
                ttl: Duration::from_secs(ttl_secs),
            },
            base_url,
        })
    }
}

fn require(var: &'static str) -> Result<String, ConfigError> {
    std::env::var(var).map_err(|_| ConfigError::MissingVar(var))
}

fn join(base: &Url, path: &str) -> Result<Url, ConfigError> {
    base.join(path).map_err(|e| ConfigError::InvalidVar {
        var: "AUTH_BASE_URL",
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_var_error_names_the_variable() {
        let err = ConfigError::MissingVar("TOKEN_SIGNING_SECRET");
        assert!(err.to_string().contains("TOKEN_SIGNING_SECRET"));
    }

    #[test]
    fn callback_urls_derive_from_base_url() {
        let base: Url = "https://app.example.com".parse().unwrap();
        let joined = join(&base, "/auth/google/callback").unwrap();
        assert_eq!(
            joined.as_str(),
            "https://app.example.com/auth/google/callback"
        );
    }
}
