//! Application configuration.
//!
//! Configuration is loaded from a YAML file and overridden by `GYMGATE_`
//! prefixed environment variables (nested fields use `__`, e.g.
//! `GYMGATE_AUTH__THROTTLE__MAX_ATTEMPTS`). All fields have defaults; the
//! only value without a usable default is `secret_key`, which is required
//! and validated at startup.

use clap::Parser;
use figment::{
    providers::{Env, Format, Yaml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::Error;

/// Simple CLI args - just for specifying the config file
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to configuration file
    #[arg(short = 'f', long, env = "GYMGATE_CONFIG", default_value = "config.yaml")]
    pub config: String,

    /// Validate configuration and exit without starting the server.
    #[arg(long)]
    pub validate: bool,
}

/// Main application configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// HTTP server host to bind to (e.g., "0.0.0.0" for all interfaces)
    pub host: String,
    /// HTTP server port to bind to
    pub port: u16,
    /// PostgreSQL connection string. When unset the service runs against an
    /// in-memory store (development and tests only; state is lost on restart).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,
    /// Secret key for signing session tokens (required)
    pub secret_key: Option<String>,
    /// Username for the initial trainer account (created on startup if missing)
    pub admin_username: Option<String>,
    /// Password for the initial trainer account
    pub admin_password: Option<String>,
    /// Authentication configuration
    pub auth: AuthConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            database_url: None,
            secret_key: None,
            admin_username: None,
            admin_password: None,
            auth: AuthConfig::default(),
        }
    }
}

/// Authentication configuration.
///
/// This is the single canonical place for every tunable the token core
/// consults; handlers and middleware read from here rather than carrying
/// their own constants.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct AuthConfig {
    /// Failed-login throttling
    pub throttle: ThrottleConfig,
    /// Token signing, expiry and header conventions
    pub security: SecurityConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            throttle: ThrottleConfig::default(),
            security: SecurityConfig::default(),
        }
    }
}

/// Failed-login throttling configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThrottleConfig {
    /// Consecutive failures before a username is locked out
    pub max_attempts: u32,
    /// How long a locked-out username stays blocked
    #[serde(with = "humantime_serde")]
    pub lockout_duration: Duration,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            lockout_duration: Duration::from_secs(5 * 60),
        }
    }
}

/// Token signing and transport configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SecurityConfig {
    /// Session token lifetime
    #[serde(with = "humantime_serde")]
    pub token_lifetime: Duration,
    /// HTTP header carrying the session token
    pub header_name: String,
    /// Prefix expected in front of the token inside the header
    pub token_prefix: String,
    /// How often the revocation ledger drops entries for expired tokens
    #[serde(with = "humantime_serde")]
    pub revocation_sweep_interval: Duration,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            token_lifetime: Duration::from_secs(24 * 60 * 60),
            header_name: "Authorization".to_string(),
            token_prefix: "Bearer ".to_string(),
            revocation_sweep_interval: Duration::from_secs(60),
        }
    }
}

impl Config {
    pub fn figment(args: &Args) -> Figment {
        Figment::new()
            // Load base config file
            .merge(Yaml::file(&args.config))
            // Environment variables can still override specific values
            .merge(Env::prefixed("GYMGATE_").split("__"))
            // Common DATABASE_URL pattern
            .merge(Env::raw().only(&["DATABASE_URL"]))
    }

    pub fn load(args: &Args) -> Result<Self, figment::Error> {
        let config: Self = Self::figment(args).extract()?;
        config
            .validate()
            .map_err(|e| figment::Error::from(e.to_string()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.secret_key.is_none() {
            return Err(Error::Internal {
                operation: "Config validation: secret_key is not configured. \
                     Please set GYMGATE_SECRET_KEY or add secret_key to the config file."
                    .to_string(),
            });
        }

        if self.auth.throttle.max_attempts < 1 {
            return Err(Error::Internal {
                operation: "Config validation: throttle max_attempts must be at least 1".to_string(),
            });
        }

        // Token lifetime must be reasonable; the platform once shipped with an
        // effectively infinite constant, so the bounds are enforced here.
        if self.auth.security.token_lifetime.as_secs() < 300 {
            return Err(Error::Internal {
                operation: "Config validation: token lifetime is too short (minimum 5 minutes)"
                    .to_string(),
            });
        }

        if self.auth.security.token_lifetime.as_secs() > 86400 * 30 {
            return Err(Error::Internal {
                operation: "Config validation: token lifetime is too long (maximum 30 days)"
                    .to_string(),
            });
        }

        if self.auth.security.token_prefix.trim().is_empty() {
            return Err(Error::Internal {
                operation: "Config validation: token_prefix cannot be empty".to_string(),
            });
        }

        if self.admin_username.is_some() != self.admin_password.is_some() {
            return Err(Error::Internal {
                operation: "Config validation: admin_username and admin_password must be set together"
                    .to_string(),
            });
        }

        Ok(())
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Secret key, after `validate` has established it is present.
    pub fn secret_key(&self) -> &str {
        self.secret_key.as_deref().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    fn args_for(path: &str) -> Args {
        Args {
            config: path.to_string(),
            validate: false,
        }
    }

    #[test]
    fn defaults_match_platform_conventions() {
        let config = Config::default();
        assert_eq!(config.auth.throttle.max_attempts, 3);
        assert_eq!(
            config.auth.throttle.lockout_duration,
            Duration::from_secs(300)
        );
        assert_eq!(config.auth.security.header_name, "Authorization");
        assert_eq!(config.auth.security.token_prefix, "Bearer ");
        assert_eq!(
            config.auth.security.token_lifetime,
            Duration::from_secs(86400)
        );
    }

    #[test]
    fn loads_yaml_and_env_overrides() {
        Jail::expect_with(|jail| {
            jail.create_file(
                "config.yaml",
                r#"
secret_key: "test-secret"
port: 9090
auth:
  throttle:
    max_attempts: 5
  security:
    token_lifetime: "2h"
"#,
            )?;
            jail.set_env("GYMGATE_AUTH__THROTTLE__LOCKOUT_DURATION", "30s");

            let config = Config::load(&args_for("config.yaml")).expect("config should load");
            assert_eq!(config.port, 9090);
            assert_eq!(config.auth.throttle.max_attempts, 5);
            assert_eq!(
                config.auth.throttle.lockout_duration,
                Duration::from_secs(30)
            );
            assert_eq!(
                config.auth.security.token_lifetime,
                Duration::from_secs(2 * 60 * 60)
            );
            Ok(())
        });
    }

    #[test]
    fn missing_secret_key_is_rejected() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("secret_key is not configured"));
    }

    #[test]
    fn unreasonable_token_lifetime_is_rejected() {
        let mut config = Config {
            secret_key: Some("k".to_string()),
            ..Config::default()
        };

        config.auth.security.token_lifetime = Duration::from_secs(60);
        assert!(config.validate().is_err());

        config.auth.security.token_lifetime = Duration::from_secs(86400 * 365);
        assert!(config.validate().is_err());

        config.auth.security.token_lifetime = Duration::from_secs(3600);
        assert!(config.validate().is_ok());
    }
}
