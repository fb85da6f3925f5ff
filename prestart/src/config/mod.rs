//! Environment-sourced bootstrap configuration.
//!
//! All inputs come from the environment (a `.env` file is honored via
//! dotenvy). Missing or malformed values are a startup-time fatal error:
//! nothing is probed, migrated or seeded until the whole configuration has
//! validated.

mod sources;

pub use sources::EnvConfig;

use std::time::Duration;

use prestart_core::AdminSeed;
use thiserror::Error;
use url::Url;

use sources::parse_bool;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
// Mirrors the classic "retry once a second for five minutes" pre-start
// budget.
const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(300);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {var}")]
    Missing { var: &'static str },

    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("failed to load .env file: {0}")]
    DotEnv(#[from] dotenvy::Error),
}

/// Validated bootstrap settings.
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub redis_url: String,
    pub mongo_url: String,
    pub mongo_db: String,
    pub mongo_init: bool,
    pub admin: AdminSeed,
    pub poll_interval: Duration,
    pub database_max_wait: Duration,
    pub redis_max_wait: Duration,
    pub mongo_max_wait: Duration,
}

impl Settings {
    /// Load and validate settings from the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().map(|_| ()).or_else(|err| match err {
            dotenvy::Error::Io(_) => Ok(()),
            other => Err(other),
        })?;

        Self::compose(EnvConfig::gather())
    }

    /// Validate raw environment values into settings.
    pub fn compose(env: EnvConfig) -> Result<Self, ConfigError> {
        let database_url = require_url(
            "DATABASE_URL",
            env.database_url,
            &["postgres", "postgresql"],
        )?;
        let redis_url =
            require_url("REDIS_URL", env.redis_url, &["redis", "rediss"])?;
        let mongo_url = require_url(
            "MONGO_URL",
            env.mongo_url,
            &["mongodb", "mongodb+srv"],
        )?;

        let mongo_db = env.mongo_db.unwrap_or_else(|| "app".to_string());
        let mongo_init = match env.mongo_init {
            None => true,
            Some(raw) => parse_bool(&raw).ok_or(ConfigError::Invalid {
                var: "MONGO_INIT",
                reason: format!("expected a boolean, got '{raw}'"),
            })?,
        };

        let email = env.first_superuser.ok_or(ConfigError::Missing {
            var: "FIRST_SUPERUSER",
        })?;
        let password =
            env.first_superuser_password
                .ok_or(ConfigError::Missing {
                    var: "FIRST_SUPERUSER_PASSWORD",
                })?;

        let poll_interval = parse_duration(
            "BOOTSTRAP_POLL_INTERVAL",
            env.poll_interval,
            DEFAULT_POLL_INTERVAL,
        )?;
        let max_wait = parse_duration(
            "BOOTSTRAP_MAX_WAIT",
            env.max_wait,
            DEFAULT_MAX_WAIT,
        )?;
        let database_max_wait = parse_duration(
            "DATABASE_MAX_WAIT",
            env.database_max_wait,
            max_wait,
        )?;
        let redis_max_wait =
            parse_duration("REDIS_MAX_WAIT", env.redis_max_wait, max_wait)?;
        let mongo_max_wait =
            parse_duration("MONGO_MAX_WAIT", env.mongo_max_wait, max_wait)?;

        Ok(Self {
            database_url,
            redis_url,
            mongo_url,
            mongo_db,
            mongo_init,
            admin: AdminSeed { email, password },
            poll_interval,
            database_max_wait,
            redis_max_wait,
            mongo_max_wait,
        })
    }
}

fn require_url(
    var: &'static str,
    value: Option<String>,
    schemes: &[&str],
) -> Result<String, ConfigError> {
    let raw = value.ok_or(ConfigError::Missing { var })?;
    let parsed = Url::parse(&raw).map_err(|err| ConfigError::Invalid {
        var,
        reason: err.to_string(),
    })?;
    if !schemes.contains(&parsed.scheme()) {
        return Err(ConfigError::Invalid {
            var,
            reason: format!(
                "unsupported scheme '{}', expected one of {:?}",
                parsed.scheme(),
                schemes
            ),
        });
    }
    Ok(raw)
}

fn parse_duration(
    var: &'static str,
    value: Option<String>,
    default: Duration,
) -> Result<Duration, ConfigError> {
    match value {
        None => Ok(default),
        Some(raw) => humantime::parse_duration(raw.trim()).map_err(|err| {
            ConfigError::Invalid {
                var,
                reason: err.to_string(),
            }
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_env() -> EnvConfig {
        EnvConfig {
            database_url: Some("postgres://app:secret@db:5432/app".into()),
            redis_url: Some("redis://cache:6379".into()),
            mongo_url: Some("mongodb://docs:27017".into()),
            first_superuser: Some("admin@example.com".into()),
            first_superuser_password: Some("changethis".into()),
            ..Default::default()
        }
    }

    #[test]
    fn minimal_environment_composes_with_defaults() {
        let settings = Settings::compose(full_env()).unwrap();

        assert_eq!(settings.mongo_db, "app");
        assert!(settings.mongo_init);
        assert_eq!(settings.poll_interval, DEFAULT_POLL_INTERVAL);
        assert_eq!(settings.database_max_wait, DEFAULT_MAX_WAIT);
        assert_eq!(settings.redis_max_wait, DEFAULT_MAX_WAIT);
        assert_eq!(settings.admin.email, "admin@example.com");
    }

    #[test]
    fn missing_database_url_is_fatal() {
        let env = EnvConfig {
            database_url: None,
            ..full_env()
        };
        let err = Settings::compose(env).unwrap_err();
        assert!(
            matches!(err, ConfigError::Missing { var: "DATABASE_URL" }),
            "got {err:?}"
        );
    }

    #[test]
    fn wrong_scheme_is_rejected() {
        let env = EnvConfig {
            redis_url: Some("http://cache:6379".into()),
            ..full_env()
        };
        let err = Settings::compose(env).unwrap_err();
        assert!(
            matches!(err, ConfigError::Invalid { var: "REDIS_URL", .. }),
            "got {err:?}"
        );
    }

    #[test]
    fn malformed_duration_is_rejected() {
        let env = EnvConfig {
            max_wait: Some("soon".into()),
            ..full_env()
        };
        let err = Settings::compose(env).unwrap_err();
        assert!(
            matches!(
                err,
                ConfigError::Invalid { var: "BOOTSTRAP_MAX_WAIT", .. }
            ),
            "got {err:?}"
        );
    }

    #[test]
    fn per_dependency_override_beats_global_max_wait() {
        let env = EnvConfig {
            max_wait: Some("2m".into()),
            mongo_max_wait: Some("30s".into()),
            ..full_env()
        };
        let settings = Settings::compose(env).unwrap();

        assert_eq!(settings.database_max_wait, Duration::from_secs(120));
        assert_eq!(settings.mongo_max_wait, Duration::from_secs(30));
    }

    #[test]
    fn mongo_init_flag_parses_leniently() {
        for (raw, expected) in
            [("0", false), ("off", false), ("Yes", true), ("1", true)]
        {
            let env = EnvConfig {
                mongo_init: Some(raw.into()),
                ..full_env()
            };
            let settings = Settings::compose(env).unwrap();
            assert_eq!(settings.mongo_init, expected, "raw = {raw}");
        }

        let env = EnvConfig {
            mongo_init: Some("maybe".into()),
            ..full_env()
        };
        assert!(Settings::compose(env).is_err());
    }
}
