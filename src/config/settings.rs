//! Process settings read from the environment (and a `.env` file when present).

use crate::error::ConfigError;
use std::net::SocketAddr;
use std::str::FromStr;

const DEFAULT_MAX_CONNECTIONS: u32 = 5;
const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";
const DEFAULT_API_PREFIX: &str = "/api/v1";
const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    /// `DATABASE_URL`; `None` runs without PostgreSQL.
    pub database_url: Option<String>,
    pub max_connections: u32,
    pub bind_addr: SocketAddr,
    /// Where resource routers are nested, e.g. `/api/v1`.
    pub api_prefix: String,
    pub body_limit: usize,
}

impl Settings {
    /// Loads `.env` (if any), then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads settings through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let api_prefix = get("REST_API_PREFIX").unwrap_or_else(|| DEFAULT_API_PREFIX.to_string());
        if !api_prefix.starts_with('/') {
            return Err(ConfigError::Load(format!(
                "REST_API_PREFIX must start with '/': {}",
                api_prefix
            )));
        }

        Ok(Settings {
            database_url: get("DATABASE_URL"),
            max_connections: parse(
                "DATABASE_MAX_CONNECTIONS",
                get("DATABASE_MAX_CONNECTIONS"),
                DEFAULT_MAX_CONNECTIONS,
            )?,
            bind_addr: match get("REST_BIND_ADDR") {
                Some(raw) => parse_value("REST_BIND_ADDR", &raw)?,
                None => parse_value("REST_BIND_ADDR", DEFAULT_BIND_ADDR)?,
            },
            api_prefix: api_prefix.trim_end_matches('/').to_string(),
            body_limit: parse("REST_BODY_LIMIT", get("REST_BODY_LIMIT"), DEFAULT_BODY_LIMIT)?,
        })
    }
}

fn parse<V: FromStr>(name: &str, raw: Option<String>, default: V) -> Result<V, ConfigError>
where
    V::Err: std::fmt::Display,
{
    match raw {
        Some(raw) => parse_value(name, &raw),
        None => Ok(default),
    }
}

fn parse_value<V: FromStr>(name: &str, raw: &str) -> Result<V, ConfigError>
where
    V::Err: std::fmt::Display,
{
    raw.parse()
        .map_err(|e: V::Err| ConfigError::Load(format!("{}='{}': {}", name, raw, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<Settings, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| env.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let s = load(&[]).unwrap();
        assert_eq!(s.database_url, None);
        assert_eq!(s.max_connections, 5);
        assert_eq!(s.bind_addr, "127.0.0.1:8080".parse::<SocketAddr>().unwrap());
        assert_eq!(s.api_prefix, "/api/v1");
        assert_eq!(s.body_limit, 1024 * 1024);
    }

    #[test]
    fn values_are_read_and_trimmed() {
        let s = load(&[
            ("DATABASE_URL", " postgres://localhost/app "),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("REST_BIND_ADDR", "0.0.0.0:3000"),
            ("REST_API_PREFIX", "/api/"),
            ("REST_BODY_LIMIT", "2048"),
        ])
        .unwrap();
        assert_eq!(s.database_url.as_deref(), Some("postgres://localhost/app"));
        assert_eq!(s.max_connections, 12);
        assert_eq!(s.bind_addr.port(), 3000);
        assert_eq!(s.api_prefix, "/api");
        assert_eq!(s.body_limit, 2048);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let s = load(&[("DATABASE_URL", "  "), ("REST_BODY_LIMIT", "")]).unwrap();
        assert_eq!(s.database_url, None);
        assert_eq!(s.body_limit, 1024 * 1024);
    }

    #[test]
    fn malformed_values_fail() {
        let err = load(&[("DATABASE_MAX_CONNECTIONS", "many")]).unwrap_err();
        assert!(matches!(err, ConfigError::Load(ref m) if m.starts_with("DATABASE_MAX_CONNECTIONS")));
        assert!(load(&[("REST_BIND_ADDR", "localhost")]).is_err());
        assert!(load(&[("REST_API_PREFIX", "api")]).is_err());
    }
}
