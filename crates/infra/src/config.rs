//! Process configuration read from environment variables.

use std::net::SocketAddr;

use thiserror::Error;

use fatoura_core::Currency;
use fatoura_observability::LogFormat;

/// Signing secret used when `JWT_SECRET` is unset. Never use outside development.
pub const DEV_JWT_SECRET: &str = "fatoura-dev-secret-change-me";

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    /// When set, the Postgres store is used; otherwise the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub log_format: LogFormat,
    pub reporting_currency: Currency,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let bind_addr = get("BIND_ADDR")
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string())
            .parse()
            .map_err(|e| invalid("BIND_ADDR", e))?;

        let database_max_connections = match get("DATABASE_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse::<u32>()
                .map_err(|e| invalid("DATABASE_MAX_CONNECTIONS", e))
                .and_then(|n| {
                    if n == 0 {
                        Err(invalid("DATABASE_MAX_CONNECTIONS", "must be at least 1"))
                    } else {
                        Ok(n)
                    }
                })?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        let log_format = match get("LOG_FORMAT").as_deref() {
            None | Some("json") => LogFormat::Json,
            Some("text") => LogFormat::Text,
            Some(other) => {
                return Err(invalid(
                    "LOG_FORMAT",
                    format!("expected json or text, got {other}"),
                ));
            }
        };

        let reporting_currency = match get("REPORTING_CURRENCY") {
            Some(raw) => raw
                .parse::<Currency>()
                .map_err(|e| invalid("REPORTING_CURRENCY", e))?,
            None => Currency::Mad,
        };

        Ok(Self {
            bind_addr,
            jwt_secret: get("JWT_SECRET").unwrap_or_else(|| DEV_JWT_SECRET.to_string()),
            database_url: get("DATABASE_URL"),
            database_max_connections,
            log_format,
            reporting_currency,
        })
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

fn invalid(key: &'static str, message: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        key,
        message: message.to_string(),
    }
}
