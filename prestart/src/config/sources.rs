//! Raw environment-derived configuration values.

/// Everything we read from the environment, unparsed.
///
/// Gathering is separated from validation so the compose step can be tested
/// against hand-built values instead of the process environment.
#[derive(Debug, Default, Clone)]
pub struct EnvConfig {
    pub database_url: Option<String>,
    pub redis_url: Option<String>,
    pub mongo_url: Option<String>,
    pub mongo_db: Option<String>,
    pub mongo_init: Option<String>,
    pub first_superuser: Option<String>,
    pub first_superuser_password: Option<String>,
    pub poll_interval: Option<String>,
    pub max_wait: Option<String>,
    pub database_max_wait: Option<String>,
    pub redis_max_wait: Option<String>,
    pub mongo_max_wait: Option<String>,
}

impl EnvConfig {
    pub fn gather() -> Self {
        let mut env_config = Self::default();

        env_config.database_url = std::env::var("DATABASE_URL").ok();
        env_config.redis_url = std::env::var("REDIS_URL").ok();
        env_config.mongo_url = std::env::var("MONGO_URL").ok();
        env_config.mongo_db = std::env::var("MONGO_DB").ok();
        env_config.mongo_init = std::env::var("MONGO_INIT").ok();
        env_config.first_superuser = std::env::var("FIRST_SUPERUSER").ok();
        env_config.first_superuser_password =
            std::env::var("FIRST_SUPERUSER_PASSWORD").ok();
        env_config.poll_interval =
            std::env::var("BOOTSTRAP_POLL_INTERVAL").ok();
        env_config.max_wait = std::env::var("BOOTSTRAP_MAX_WAIT").ok();
        env_config.database_max_wait =
            std::env::var("DATABASE_MAX_WAIT").ok();
        env_config.redis_max_wait = std::env::var("REDIS_MAX_WAIT").ok();
        env_config.mongo_max_wait = std::env::var("MONGO_MAX_WAIT").ok();

        env_config
    }
}

/// Lenient boolean parsing shared by flag-like variables.
pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
