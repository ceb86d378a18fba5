//! Process configuration read from environment variables.
//!
//! | Variable | Default |
//! |----------|---------|
//! | `BIND_ADDR` | `0.0.0.0:8080` |
//! | `DATABASE_URL` | unset (in-memory store) |
//! | `DATABASE_MAX_CONNECTIONS` | `10` |
//! | `CORS_ALLOWED_ORIGINS` | `*` |
//! | `CORS_ALLOWED_METHODS` | `GET,POST,PUT,DELETE,OPTIONS` (`*` = any) |
//! | `CORS_ALLOWED_HEADERS` | `*` |
//! | `CORS_ALLOW_CREDENTIALS` | `true` unless any list is `*` |
//! | `CORS_MAX_AGE` | `3600` |

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;

use thiserror::Error;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;
const DEFAULT_METHODS: &str = "GET,POST,PUT,DELETE,OPTIONS";
const DEFAULT_MAX_AGE_SECS: u64 = 3600;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

impl ConfigError {
    fn invalid(key: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            message: message.into(),
        }
    }
}

#[derive(Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

// The URL usually carries a password.
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("url", &"<redacted>")
            .field("max_connections", &self.max_connections)
            .finish()
    }
}

/// `*` or an explicit comma-separated list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllowList {
    Any,
    List(Vec<String>),
}

impl AllowList {
    pub fn is_any(&self) -> bool {
        matches!(self, AllowList::Any)
    }

    fn parse(raw: &str) -> Self {
        let items: Vec<String> = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if items.is_empty() || items.iter().any(|s| s == "*") {
            AllowList::Any
        } else {
            AllowList::List(items)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorsConfig {
    pub allowed_origins: AllowList,
    pub allowed_methods: AllowList,
    pub allowed_headers: AllowList,
    pub allow_credentials: bool,
    pub max_age_secs: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: AllowList::Any,
            allowed_methods: AllowList::List(split_methods(DEFAULT_METHODS)),
            allowed_headers: AllowList::Any,
            allow_credentials: false,
            max_age_secs: DEFAULT_MAX_AGE_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    /// `None` selects the in-memory store.
    pub database: Option<DatabaseConfig>,
    pub cors: CorsConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup.
    ///
    /// Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = parse_or("BIND_ADDR", get("BIND_ADDR"), DEFAULT_BIND_ADDR.parse().ok())?;

        let database = match get("DATABASE_URL") {
            Some(url) => Some(DatabaseConfig {
                url,
                max_connections: parse_or(
                    "DATABASE_MAX_CONNECTIONS",
                    get("DATABASE_MAX_CONNECTIONS"),
                    Some(DEFAULT_MAX_CONNECTIONS),
                )?,
            }),
            None => None,
        };
        if database.as_ref().is_some_and(|db| db.max_connections == 0) {
            return Err(ConfigError::invalid("DATABASE_MAX_CONNECTIONS", "must be at least 1"));
        }

        let allowed_origins = get("CORS_ALLOWED_ORIGINS")
            .map(|v| AllowList::parse(&v))
            .unwrap_or(AllowList::Any);
        let allowed_headers = get("CORS_ALLOWED_HEADERS")
            .map(|v| AllowList::parse(&v))
            .unwrap_or(AllowList::Any);
        let allowed_methods = match AllowList::parse(&get("CORS_ALLOWED_METHODS").unwrap_or_else(|| DEFAULT_METHODS.to_string())) {
            AllowList::Any => AllowList::Any,
            AllowList::List(methods) => {
                let methods: Vec<String> = methods.iter().map(|m| m.to_ascii_uppercase()).collect();
                if let Some(bad) = methods.iter().find(|m| !m.bytes().all(|b| b.is_ascii_alphabetic())) {
                    return Err(ConfigError::invalid("CORS_ALLOWED_METHODS", format!("not an HTTP method: {bad:?}")));
                }
                AllowList::List(methods)
            }
        };
        let wildcard = allowed_origins.is_any() || allowed_headers.is_any() || allowed_methods.is_any();

        let allow_credentials = match get("CORS_ALLOW_CREDENTIALS") {
            Some(raw) => parse_bool("CORS_ALLOW_CREDENTIALS", &raw)?,
            None => !wildcard,
        };
        if allow_credentials && wildcard {
            return Err(ConfigError::invalid(
                "CORS_ALLOW_CREDENTIALS",
                "credentials cannot be allowed together with a wildcard origin, method or header list",
            ));
        }

        let max_age_secs = parse_or("CORS_MAX_AGE", get("CORS_MAX_AGE"), Some(DEFAULT_MAX_AGE_SECS))?;

        Ok(Self {
            bind_addr,
            database,
            cors: CorsConfig {
                allowed_origins,
                allowed_methods,
                allowed_headers,
                allow_credentials,
                max_age_secs,
            },
        })
    }
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: Option<T>) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| ConfigError::invalid(key, format!("{raw:?}: {e}"))),
        None => default.ok_or_else(|| ConfigError::invalid(key, "missing value")),
    }
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(ConfigError::invalid(key, format!("expected a boolean, got {other:?}"))),
    }
}

fn split_methods(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_ascii_uppercase())
        .filter(|s| !s.is_empty())
        .collect()
}
