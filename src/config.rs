use std::{env, fmt::Display, fs::read_to_string, str::FromStr};

use tracing::{info, warn};

const DEV_JWT_SECRET: &str = "relief-dev-secret";

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub database_ns: String,
    pub database_db: String,
    pub database_user: Option<String>,
    pub database_pass: Option<String>,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub webhook_secret: String,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
    pub cors_origin: Option<String>,
    /// Requests allowed per client IP before sign-in/sign-up are throttled. `0` disables.
    pub auth_rate_burst: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3587,
            database_url: "mem://".to_string(),
            database_ns: "relief".to_string(),
            database_db: "relief".to_string(),
            database_user: None,
            database_pass: None,
            jwt_secret: DEV_JWT_SECRET.to_string(),
            jwt_ttl_hours: 12,
            webhook_secret: DEV_JWT_SECRET.to_string(),
            admin_email: None,
            admin_password: None,
            cors_origin: None,
            auth_rate_burst: 0,
        }
    }
}

impl Config {
    pub fn load() -> Self {
        Self {
            host: try_load("RELIEF_HOST", "127.0.0.1"),
            port: try_load("RELIEF_PORT", "3587"),
            database_url: try_load("DATABASE_URL", "mem://"),
            database_ns: try_load("DATABASE_NS", "relief"),
            database_db: try_load("DATABASE_DB", "relief"),
            database_user: optional("DATABASE_USER"),
            database_pass: secret("DATABASE_PASS"),
            jwt_secret: secret("JWT_SECRET").unwrap_or_else(|| {
                warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }),
            jwt_ttl_hours: try_load("JWT_TTL_HOURS", "12"),
            webhook_secret: secret("WEBHOOK_SECRET").unwrap_or_else(|| {
                warn!("WEBHOOK_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }),
            admin_email: optional("ADMIN_EMAIL"),
            admin_password: secret("ADMIN_PASSWORD"),
            cors_origin: optional("CORS_ORIGIN"),
            auth_rate_burst: try_load("AUTH_RATE_BURST", "10"),
        }
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn optional(key: &str) -> Option<String> {
    let value = var(key);
    if value.is_none() {
        info!("{key} not set");
    }
    value
}

/// Environment first, then a docker secret file at `/run/secrets/<key>`.
fn secret(key: &str) -> Option<String> {
    var(key).or_else(|| {
        let path = format!("/run/secrets/{key}");
        read_to_string(&path)
            .map(|s| s.trim().to_string())
            .ok()
            .filter(|s| !s.is_empty())
    })
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    parse_or_default(key, var(key), default)
}

fn parse_or_default<T: FromStr>(key: &str, raw: Option<String>, default: &str) -> T
where
    T::Err: Display,
{
    let raw = raw.unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    match raw.parse() {
        Ok(value) => value,
        Err(e) => {
            warn!("Invalid {key} value `{raw}`: {e}, using default: {default}");
            match default.parse() {
                Ok(value) => value,
                Err(_) => unreachable!("default for {key} must parse"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_values_fall_back_to_default() {
        let port: u16 = parse_or_default("RELIEF_PORT", Some("not-a-port".into()), "3587");
        assert_eq!(port, 3587);
    }

    #[test]
    fn present_values_are_parsed() {
        let burst: u32 = parse_or_default("AUTH_RATE_BURST", Some("4".into()), "10");
        assert_eq!(burst, 4);
        let ttl: i64 = parse_or_default("JWT_TTL_HOURS", None, "12");
        assert_eq!(ttl, 12);
    }

    #[test]
    fn address_joins_host_and_port() {
        let config = Config {
            host: "0.0.0.0".into(),
            port: 8080,
            ..Config::default()
        };
        assert_eq!(config.address(), "0.0.0.0:8080");
    }
}
