use chrono::{Duration, Utc};
use thiserror::Error;
use tracing::warn;

use crate::image::{CloudinaryConfig, DEFAULT_API_BASE};
use crate::user::password::DEFAULT_ITERATIONS;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
pub const DEFAULT_EXTERNAL_TIMEOUT_SECS: u64 = 10;
const DEV_JWT_SECRET: &str = "bookshelf-dev-secret-change-me";
const DEFAULT_EXPIRES_IN: &str = "7d";
const DEFAULT_CLOUDINARY_FOLDER: &str = "books";

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Cloudinary is partially configured, missing {0}")]
    IncompleteCloudinary(&'static str),
}

/// Process configuration read from the environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub port: u16,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub jwt_expires_in: Duration,
    pub password_hash_iterations: u32,
    pub max_upload_bytes: usize,
    pub external_timeout: std::time::Duration,
    pub cloudinary: Option<CloudinaryConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from any variable source; blank values count as unset
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let port = parse_or("PORT", var("PORT"), DEFAULT_PORT)?;
        let password_hash_iterations = parse_or(
            "PASSWORD_HASH_ITERATIONS",
            var("PASSWORD_HASH_ITERATIONS"),
            DEFAULT_ITERATIONS,
        )?;
        if password_hash_iterations == 0 {
            return Err(invalid("PASSWORD_HASH_ITERATIONS", "0", "must be positive"));
        }
        let max_upload_bytes = parse_or(
            "MAX_UPLOAD_BYTES",
            var("MAX_UPLOAD_BYTES"),
            DEFAULT_MAX_UPLOAD_BYTES,
        )?;
        let timeout_secs = parse_or(
            "EXTERNAL_TIMEOUT_SECS",
            var("EXTERNAL_TIMEOUT_SECS"),
            DEFAULT_EXTERNAL_TIMEOUT_SECS,
        )?;
        if timeout_secs == 0 {
            return Err(invalid("EXTERNAL_TIMEOUT_SECS", "0", "must be positive"));
        }
        let external_timeout = std::time::Duration::from_secs(timeout_secs);

        let expires_raw = var("JWT_EXPIRES_IN").unwrap_or_else(|| DEFAULT_EXPIRES_IN.to_string());
        let jwt_expires_in = parse_duration(&expires_raw)
            .ok_or_else(|| invalid("JWT_EXPIRES_IN", &expires_raw, "expected <n>[smhd] or seconds"))?;
        if Utc::now().checked_add_signed(jwt_expires_in).is_none() {
            return Err(invalid("JWT_EXPIRES_IN", &expires_raw, "token lifetime is out of range"));
        }

        let jwt_secret = var("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set, using the development secret");
            DEV_JWT_SECRET.to_string()
        });

        let cloudinary = match (
            var("CLOUDINARY_CLOUD_NAME"),
            var("CLOUDINARY_API_KEY"),
            var("CLOUDINARY_API_SECRET"),
        ) {
            (None, None, None) => None,
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
                folder: Some(
                    var("CLOUDINARY_FOLDER")
                        .unwrap_or_else(|| DEFAULT_CLOUDINARY_FOLDER.to_string()),
                ),
                api_base: var("CLOUDINARY_API_BASE")
                    .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
                timeout: external_timeout,
            }),
            (None, _, _) => return Err(ConfigError::IncompleteCloudinary("CLOUDINARY_CLOUD_NAME")),
            (_, None, _) => return Err(ConfigError::IncompleteCloudinary("CLOUDINARY_API_KEY")),
            (_, _, None) => return Err(ConfigError::IncompleteCloudinary("CLOUDINARY_API_SECRET")),
        };

        Ok(Self {
            port,
            database_url: var("DATABASE_URL"),
            jwt_secret,
            jwt_expires_in,
            password_hash_iterations,
            max_upload_bytes,
            external_timeout,
            cloudinary,
        })
    }
}

fn invalid(name: &'static str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        name,
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_or<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.parse().map_err(|e: T::Err| invalid(name, &value, e.to_string())),
    }
}

/// Parses `<n>[smhd]` or a bare number of seconds; zero is rejected
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let (digits, unit) = match raw.char_indices().last()? {
        (index, c) if c.is_ascii_alphabetic() => (&raw[..index], c.to_ascii_lowercase()),
        _ => (raw, 's'),
    };

    let amount: i64 = digits.trim().parse().ok().filter(|n| *n > 0)?;
    match unit {
        's' => Duration::try_seconds(amount),
        'm' => Duration::try_minutes(amount),
        'h' => Duration::try_hours(amount),
        'd' => Duration::try_days(amount),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config(&[]).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.database_url, None);
        assert_eq!(config.jwt_secret, DEV_JWT_SECRET);
        assert_eq!(config.jwt_expires_in, Duration::days(7));
        assert_eq!(config.password_hash_iterations, DEFAULT_ITERATIONS);
        assert_eq!(config.max_upload_bytes, 10 * 1024 * 1024);
        assert_eq!(config.external_timeout, std::time::Duration::from_secs(10));
        assert!(config.cloudinary.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config(&[
            ("PORT", "8080"),
            ("DATABASE_URL", "postgres://localhost/books"),
            ("JWT_SECRET", "s3cret"),
            ("JWT_EXPIRES_IN", "12h"),
            ("CLOUDINARY_CLOUD_NAME", "demo"),
            ("CLOUDINARY_API_KEY", "key"),
            ("CLOUDINARY_API_SECRET", "secret"),
            ("EXTERNAL_TIMEOUT_SECS", "3"),
        ])
        .unwrap();

        assert_eq!(config.port, 8080);
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/books"));
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.jwt_expires_in, Duration::hours(12));

        let cloudinary = config.cloudinary.unwrap();
        assert_eq!(cloudinary.cloud_name, "demo");
        assert_eq!(cloudinary.folder.as_deref(), Some("books"));
        assert_eq!(cloudinary.api_base, DEFAULT_API_BASE);
        assert_eq!(cloudinary.timeout, std::time::Duration::from_secs(3));
    }

    #[test]
    fn test_partial_cloudinary_is_rejected() {
        let result = config(&[("CLOUDINARY_CLOUD_NAME", "demo")]);
        assert_eq!(
            result.unwrap_err(),
            ConfigError::IncompleteCloudinary("CLOUDINARY_API_KEY")
        );
    }

    #[rstest]
    #[case("PORT", "http")]
    #[case("PORT", "70000")]
    #[case("JWT_EXPIRES_IN", "7w")]
    #[case("JWT_EXPIRES_IN", "0")]
    #[case("JWT_EXPIRES_IN", "99999999d")]
    #[case("PASSWORD_HASH_ITERATIONS", "0")]
    #[case("EXTERNAL_TIMEOUT_SECS", "-1")]
    fn test_invalid_values(#[case] name: &str, #[case] value: &str) {
        assert!(matches!(
            config(&[(name, value)]),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[rstest]
    #[case("7d", Some(Duration::days(7)))]
    #[case("30m", Some(Duration::minutes(30)))]
    #[case("2H", Some(Duration::hours(2)))]
    #[case("45s", Some(Duration::seconds(45)))]
    #[case("3600", Some(Duration::seconds(3600)))]
    #[case("d", None)]
    #[case("", None)]
    #[case("-5m", None)]
    fn test_parse_duration(#[case] raw: &str, #[case] expected: Option<Duration>) {
        assert_eq!(parse_duration(raw), expected);
    }
}
