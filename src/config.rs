use std::env;

use thiserror::Error;

use crate::auth::password::PasswordPolicy;

/// Secret used when `SESSION_SECRET_KEY` is not set outside production.
const LOCAL_SESSION_SECRET: &str = "local-postline-session-secret-value";

/// Thirty days, in seconds.
pub const DEFAULT_SESSION_EXPIRE_TIME: i64 = 60 * 60 * 24 * 30;
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_AUTH_MODE: &str = "native";

/// AppConfig
///
/// Holds the application's entire configuration state. It is loaded once at
/// startup, never mutated afterwards, and shared through `AppState`.
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Runtime environment marker. Controls logging format and secret fallbacks.
    pub env: Env,
    // Postgres connection string. `None` selects the in-memory store (local only).
    pub db_url: Option<String>,
    // Prepended to every table name.
    pub db_table_prefix: String,
    pub port: u16,
    // HMAC key used to sign and verify access tokens.
    pub session_secret_key: String,
    // Access token lifetime in seconds.
    pub session_expire_time: i64,
    // Auth provider tag stamped on new users and checked by the session guard.
    pub auth_mode: String,
    // Adds the `Secure` attribute to the session cookie.
    pub secure_cookie: bool,
    pub password_policy: PasswordPolicy,
}

/// Env
///
/// Defines the runtime context.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),
    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

impl Default for AppConfig {
    /// default
    ///
    /// Provides a non-panicking AppConfig instance used for test setup.
    fn default() -> Self {
        Self {
            env: Env::Local,
            db_url: None,
            db_table_prefix: String::new(),
            port: DEFAULT_PORT,
            session_secret_key: LOCAL_SESSION_SECRET.to_string(),
            session_expire_time: DEFAULT_SESSION_EXPIRE_TIME,
            auth_mode: DEFAULT_AUTH_MODE.to_string(),
            secure_cookie: false,
            password_policy: PasswordPolicy::default(),
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads every parameter from environment variables. Production requires
    /// `DATABASE_URL` and `SESSION_SECRET_KEY`; local runs fall back to an
    /// in-memory store and a fixed development secret.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").unwrap_or_else(|_| "local".to_string()).as_str() {
            "production" => Env::Production,
            _ => Env::Local,
        };

        let db_url = non_empty_var("DATABASE_URL");
        let session_secret_key = non_empty_var("SESSION_SECRET_KEY");

        let (db_url, session_secret_key) = match env {
            Env::Production => (
                Some(db_url.ok_or(ConfigError::Missing("DATABASE_URL"))?),
                session_secret_key.ok_or(ConfigError::Missing("SESSION_SECRET_KEY"))?,
            ),
            Env::Local => (
                db_url,
                session_secret_key.unwrap_or_else(|| LOCAL_SESSION_SECRET.to_string()),
            ),
        };

        let db_table_prefix = env::var("DB_TABLE_PREFIX").unwrap_or_default();
        if !db_table_prefix
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(ConfigError::Invalid {
                key: "DB_TABLE_PREFIX",
                value: db_table_prefix,
            });
        }

        let session_expire_time =
            parse_var("SESSION_EXPIRE_TIME", DEFAULT_SESSION_EXPIRE_TIME)?;
        if session_expire_time <= 0 {
            return Err(ConfigError::Invalid {
                key: "SESSION_EXPIRE_TIME",
                value: session_expire_time.to_string(),
            });
        }

        let password_policy = PasswordPolicy {
            minimum_length: parse_var(
                "PASSWORD_MIN_LENGTH",
                PasswordPolicy::default().minimum_length,
            )?,
            ..PasswordPolicy::default()
        };

        Ok(Self {
            env,
            db_url,
            db_table_prefix,
            port: parse_var("PORT", DEFAULT_PORT)?,
            session_secret_key,
            session_expire_time,
            auth_mode: non_empty_var("AUTH_MODE").unwrap_or_else(|| DEFAULT_AUTH_MODE.to_string()),
            secure_cookie: parse_var("SECURE_COOKIE", false)?,
            password_policy,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match non_empty_var(key) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}
