use std::env;
use std::str::FromStr;

use chrono::NaiveTime;
use thiserror::Error;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::SecurityHeadersLayer;

use crate::services::codes::DEFAULT_CODE_LENGTH;

const DEFAULT_DATABASE_URL: &str = "postgres://localhost/eventfinder";
const DEFAULT_ALLOWED_ORIGINS: &str = "http://localhost:3000,http://localhost:5173";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} has an invalid value '{value}'")]
    Invalid { key: &'static str, value: String },

    #[error("{0} must be set when SMTP_HOST is configured")]
    Missing(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "postgres" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub store_backend: StoreBackend,
    pub host: String,
    pub port: u16,
    /// Enables HSTS.
    pub production: bool,
    pub cors_allowed_origins: Vec<String>,
    /// `None` selects the log-only mailer.
    pub smtp: Option<SmtpConfig>,
    pub mail_max_attempts: u32,
    pub ticket_code_length: usize,
    pub default_country: String,
    pub expiry_sweep_at: NaiveTime,
    pub reminder_at: NaiveTime,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let smtp = match get("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: parse(&lookup, "SMTP_PORT", 587)?,
                username: get("SMTP_USERNAME"),
                password: get("SMTP_PASSWORD"),
                from: get("MAIL_FROM").ok_or(ConfigError::Missing("MAIL_FROM"))?,
            }),
            None => None,
        };

        let store_backend = match get("STORE_BACKEND") {
            Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                key: "STORE_BACKEND",
                value,
            })?,
            None => StoreBackend::Postgres,
        };

        let ticket_code_length = parse(&lookup, "TICKET_CODE_LENGTH", DEFAULT_CODE_LENGTH)?;
        if ticket_code_length == 0 {
            return Err(ConfigError::Invalid {
                key: "TICKET_CODE_LENGTH",
                value: "0".to_string(),
            });
        }

        Ok(Self {
            database_url: get("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            database_max_connections: parse(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?,
            store_backend,
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse(&lookup, "PORT", 4000)?,
            production: get("RUST_ENV")
                .map(|v| v.eq_ignore_ascii_case("production"))
                .unwrap_or(false),
            cors_allowed_origins: get("CORS_ALLOWED_ORIGINS")
                .unwrap_or_else(|| DEFAULT_ALLOWED_ORIGINS.to_string())
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect(),
            smtp,
            mail_max_attempts: parse(&lookup, "MAIL_MAX_ATTEMPTS", 3)?,
            ticket_code_length,
            default_country: get("DEFAULT_COUNTRY").unwrap_or_else(|| "GB".to_string()),
            expiry_sweep_at: parse_time(&lookup, "EXPIRY_SWEEP_AT", NaiveTime::MIN)?,
            reminder_at: parse_time(
                &lookup,
                "REMINDER_AT",
                NaiveTime::from_hms_opt(1, 0, 0).unwrap_or(NaiveTime::MIN),
            )?,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}

fn parse_time(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: NaiveTime,
) -> Result<NaiveTime, ConfigError> {
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        Some(value) => NaiveTime::parse_from_str(value.trim(), "%H:%M")
            .map_err(|_| ConfigError::Invalid { key, value }),
        None => Ok(default),
    }
}
