use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

use crate::directory::DirectoryConfig;
use crate::notify::SmtpConfig;

pub mod cors;
pub mod security;

pub use cors::create_cors_layer;
pub use security::create_security_headers_layer;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3001";
const DEFAULT_APPROVAL_BASE_URL: &str = "http://localhost:3001/api";
const DEFAULT_TOKEN_TTL_SECS: i64 = 3600;
const DEFAULT_APPROVAL_LINK_TTL_SECS: i64 = 7 * 24 * 3600;
const DEFAULT_OPERATION_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_SMTP_PORT: u16 = 587;
const MIN_SECRET_LEN: usize = 32;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    /// `None` runs on the in-memory store.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub production: bool,
    pub cors_allowed_origins: Option<String>,
    pub jwt_secret: String,
    pub token_ttl: chrono::Duration,
    /// Bearer key for the organizer administration routes; `None` disables them.
    pub admin_api_key: Option<String>,
    pub admin_email: Option<String>,
    pub approval_base_url: String,
    pub approval_link_ttl: chrono::Duration,
    pub operation_timeout: Duration,
    /// `None` captures outgoing mail in the in-process outbox.
    pub smtp: Option<SmtpConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from any variable source; blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let bind_addr = parse_or(&get, "BIND_ADDR", DEFAULT_BIND_ADDR.parse().ok())?;

        let jwt_secret = get("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;
        check_secret_len("JWT_SECRET", &jwt_secret)?;

        let admin_api_key = get("ADMIN_API_KEY");
        if let Some(key) = &admin_api_key {
            check_secret_len("ADMIN_API_KEY", key)?;
        }

        let token_ttl_secs = positive_secs(&get, "JWT_TTL_SECS", DEFAULT_TOKEN_TTL_SECS)?;
        let approval_link_ttl_secs = positive_secs(
            &get,
            "APPROVAL_LINK_TTL_SECS",
            DEFAULT_APPROVAL_LINK_TTL_SECS,
        )?;

        let operation_timeout_secs: u64 = parse_or(
            &get,
            "OPERATION_TIMEOUT_SECS",
            Some(DEFAULT_OPERATION_TIMEOUT_SECS),
        )?;

        let smtp = match get("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: parse_or(&get, "SMTP_PORT", Some(DEFAULT_SMTP_PORT))?,
                username: get("SMTP_USERNAME").unwrap_or_default(),
                password: get("SMTP_PASSWORD").unwrap_or_default(),
                from_email: get("SMTP_FROM_EMAIL").ok_or(ConfigError::Missing("SMTP_FROM_EMAIL"))?,
                from_name: get("SMTP_FROM_NAME").unwrap_or_else(|| "Event Desk".to_string()),
            }),
            None => None,
        };

        Ok(Self {
            bind_addr,
            database_url: get("DATABASE_URL"),
            database_max_connections: parse_or(
                &get,
                "DATABASE_MAX_CONNECTIONS",
                Some(DEFAULT_MAX_CONNECTIONS),
            )?,
            production: get("RUST_ENV")
                .map(|v| v.to_lowercase() == "production")
                .unwrap_or(false),
            cors_allowed_origins: get("CORS_ALLOWED_ORIGINS"),
            jwt_secret,
            token_ttl: chrono::Duration::seconds(token_ttl_secs),
            admin_api_key,
            admin_email: get("ADMIN_EMAIL").map(|v| v.trim().to_string()),
            approval_base_url: get("APPROVAL_BASE_URL")
                .unwrap_or_else(|| DEFAULT_APPROVAL_BASE_URL.to_string()),
            approval_link_ttl: chrono::Duration::seconds(approval_link_ttl_secs),
            operation_timeout: Duration::from_secs(operation_timeout_secs),
            smtp,
        })
    }

    pub fn directory(&self) -> DirectoryConfig {
        DirectoryConfig {
            admin_email: self.admin_email.clone(),
            approval_base_url: self.approval_base_url.clone(),
            approval_link_ttl: self.approval_link_ttl,
            operation_timeout: self.operation_timeout,
        }
    }
}

fn parse_or<T, G>(get: &G, name: &'static str, default: Option<T>) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(name) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
        None => default.ok_or(ConfigError::Missing(name)),
    }
}

fn check_secret_len(name: &'static str, value: &str) -> Result<(), ConfigError> {
    if value.len() < MIN_SECRET_LEN {
        return Err(ConfigError::Invalid {
            name,
            reason: format!("must be at least {} bytes", MIN_SECRET_LEN),
        });
    }
    Ok(())
}

fn positive_secs<G>(get: &G, name: &'static str, default: i64) -> Result<i64, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let secs: i64 = parse_or(get, name, Some(default))?;
    if secs <= 0 {
        return Err(ConfigError::Invalid {
            name,
            reason: "must be positive".to_string(),
        });
    }
    Ok(secs)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("JWT_SECRET", SECRET)]).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:3001".parse::<SocketAddr>().unwrap());
        assert_eq!(config.database_url, None);
        assert!(!config.production);
        assert_eq!(config.token_ttl, chrono::Duration::hours(1));
        assert_eq!(config.admin_email, None);
        assert_eq!(config.approval_base_url, DEFAULT_APPROVAL_BASE_URL);
        assert_eq!(config.approval_link_ttl, chrono::Duration::days(7));
        assert_eq!(config.admin_api_key, None);
        assert_eq!(config.operation_timeout, Duration::from_secs(10));
        assert!(config.smtp.is_none());
    }

    #[test]
    fn test_jwt_secret_is_required_and_long_enough() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing("JWT_SECRET"))));
        assert!(matches!(
            load(&[("JWT_SECRET", "short")]),
            Err(ConfigError::Invalid { name: "JWT_SECRET", .. })
        ));
    }

    #[test]
    fn test_admin_api_key_must_be_long_enough() {
        assert!(matches!(
            load(&[("JWT_SECRET", SECRET), ("ADMIN_API_KEY", "letmein")]),
            Err(ConfigError::Invalid { name: "ADMIN_API_KEY", .. })
        ));

        let config = load(&[("JWT_SECRET", SECRET), ("ADMIN_API_KEY", SECRET)]).unwrap();
        assert_eq!(config.admin_api_key.as_deref(), Some(SECRET));
    }

    #[test]
    fn test_non_positive_ttls_are_rejected() {
        assert!(matches!(
            load(&[("JWT_SECRET", SECRET), ("APPROVAL_LINK_TTL_SECS", "0")]),
            Err(ConfigError::Invalid { name: "APPROVAL_LINK_TTL_SECS", .. })
        ));
    }

    #[test]
    fn test_invalid_numbers_are_reported() {
        let err = load(&[("JWT_SECRET", SECRET), ("JWT_TTL_SECS", "soon")]).unwrap_err();
        assert!(err.to_string().starts_with("JWT_TTL_SECS is invalid"));
    }

    #[test]
    fn test_smtp_block_requires_from_address() {
        let err = load(&[("JWT_SECRET", SECRET), ("SMTP_HOST", "smtp.example.com")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing("SMTP_FROM_EMAIL")));

        let config = load(&[
            ("JWT_SECRET", SECRET),
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_PORT", "2525"),
            ("SMTP_FROM_EMAIL", "desk@example.com"),
        ])
        .unwrap();
        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.port, 2525);
        assert_eq!(smtp.from_name, "Event Desk");
    }

    #[test]
    fn test_production_and_admin_flags() {
        let config = load(&[
            ("JWT_SECRET", SECRET),
            ("RUST_ENV", "Production"),
            ("ADMIN_EMAIL", " admin@mail.com "),
            ("DATABASE_URL", "postgres://localhost/eventdesk"),
        ])
        .unwrap();
        assert!(config.production);
        assert_eq!(config.admin_email.as_deref(), Some("admin@mail.com"));
        assert_eq!(config.directory().admin_email.as_deref(), Some("admin@mail.com"));
        assert!(config.database_url.is_some());
    }
}
