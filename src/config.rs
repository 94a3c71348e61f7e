use std::{env, path::PathBuf, str::FromStr};

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Runtime settings, read from the environment (and `.env` via dotenvy).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub jwt: JwtSettings,
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
    pub admin: Option<AdminAccount>,
}

#[derive(Debug, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_ttl: chrono::Duration,
    pub refresh_ttl: chrono::Duration,
    pub cookie_max_age: time::Duration,
}

impl JwtSettings {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_ttl: chrono::Duration::minutes(5),
            refresh_ttl: chrono::Duration::hours(24),
            cookie_max_age: time::Duration::seconds(86_400),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AdminAccount {
    pub username: String,
    pub password: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &'static str| -> Result<String, ConfigError> {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or(ConfigError::Missing(name))
        };

        let database_url = required("DATABASE_URL")?;
        let secret = required("JWT_SECRET")?;

        let port = parse_or(&lookup, "PORT", 3000u16)?;
        let access_minutes = parse_or(&lookup, "ACCESS_TOKEN_MINUTES", 5i64)?;
        let refresh_hours = parse_or(&lookup, "REFRESH_TOKEN_HOURS", 24i64)?;
        let cookie_seconds = parse_or(&lookup, "COOKIE_MAX_AGE_SECONDS", 86_400i64)?;
        let max_upload_bytes = parse_or(&lookup, "MAX_UPLOAD_BYTES", 10 * 1024 * 1024usize)?;

        let upload_dir = lookup("UPLOAD_DIR")
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("uploads"));

        let admin = match (lookup("ADMIN_USERNAME"), lookup("ADMIN_PASSWORD")) {
            (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
                Some(AdminAccount { username, password })
            }
            _ => None,
        };

        Ok(Self {
            database_url,
            port,
            jwt: JwtSettings {
                secret,
                access_ttl: chrono::Duration::minutes(access_minutes),
                refresh_ttl: chrono::Duration::hours(refresh_hours),
                cookie_max_age: time::Duration::seconds(cookie_seconds),
            },
            upload_dir,
            max_upload_bytes,
            admin,
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(value) if !value.is_empty() => value
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        _ => Ok(default),
    }
}
