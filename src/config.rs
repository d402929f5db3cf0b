use std::env;
use std::net::SocketAddr;
use std::str::FromStr;

use crate::error::{invalid_config_error, Error};
use crate::external::placeholder_api::DEFAULT_FEED_URL;

pub const ADDR_KEY: &str = "RIDEWAVE_ADDR";
pub const DATABASE_URL_KEY: &str = "DATABASE_URL";
pub const DATABASE_MAX_CONNECTIONS_KEY: &str = "DATABASE_MAX_CONNECTIONS";
pub const HISTORY_FEED_URL_KEY: &str = "HISTORY_FEED_URL";

const DEFAULT_ADDR: &str = "127.0.0.1:3000";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub addr: SocketAddr,
    /// Sessions are kept in memory when unset.
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub history_feed_url: String,
}

impl Config {
    /// Reads the process environment, after loading `.env` when one exists.
    pub fn from_env() -> Result<Self, Error> {
        if let Err(err) = dotenv::dotenv() {
            tracing::debug!("no .env loaded: {}", err);
        }

        Self::from_lookup(|key| match env::var(key) {
            Ok(value) => Ok(Some(value)),
            Err(env::VarError::NotPresent) => Ok(None),
            Err(err) => Err(err.into()),
        })
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, Error>
    where
        F: Fn(&str) -> Result<Option<String>, Error>,
    {
        let lookup = |key: &str| -> Result<Option<String>, Error> {
            Ok(lookup(key)?.filter(|value| !value.trim().is_empty()))
        };

        Ok(Self {
            addr: parse_or(lookup(ADDR_KEY)?, ADDR_KEY, DEFAULT_ADDR.parse().ok())?,
            database_url: lookup(DATABASE_URL_KEY)?,
            database_max_connections: parse_or(
                lookup(DATABASE_MAX_CONNECTIONS_KEY)?,
                DATABASE_MAX_CONNECTIONS_KEY,
                Some(DEFAULT_MAX_CONNECTIONS),
            )?,
            history_feed_url: lookup(HISTORY_FEED_URL_KEY)?
                .unwrap_or_else(|| DEFAULT_FEED_URL.into()),
        })
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: Option<T>) -> Result<T, Error>
where
    T: FromStr,
{
    let parsed = match raw {
        Some(raw) => raw.trim().parse::<T>().ok(),
        None => default,
    };

    parsed.ok_or_else(|| invalid_config_error(key))
}

#[test]
fn defaults_when_unset() {
    let config = Config::from_lookup(|_| Ok(None)).unwrap();

    assert_eq!(config.addr, "127.0.0.1:3000".parse::<SocketAddr>().unwrap());
    assert_eq!(config.database_url, None);
    assert_eq!(config.database_max_connections, 5);
    assert_eq!(config.history_feed_url, DEFAULT_FEED_URL);
}

#[test]
fn reads_overrides() {
    let config = Config::from_lookup(|key| Ok(match key {
        ADDR_KEY => Some("0.0.0.0:8080".into()),
        DATABASE_URL_KEY => Some("postgresql://ridewave@localhost/ridewave".into()),
        DATABASE_MAX_CONNECTIONS_KEY => Some(" 12 ".into()),
        HISTORY_FEED_URL_KEY => Some("http://localhost:9000/items".into()),
        _ => None,
    }))
    .unwrap();

    assert_eq!(config.addr.port(), 8080);
    assert_eq!(
        config.database_url.as_deref(),
        Some("postgresql://ridewave@localhost/ridewave")
    );
    assert_eq!(config.database_max_connections, 12);
    assert_eq!(config.history_feed_url, "http://localhost:9000/items");
}

#[test]
fn blank_database_url_means_memory_sessions() {
    let config = Config::from_lookup(|key| Ok(match key {
        DATABASE_URL_KEY => Some("  ".into()),
        _ => None,
    }))
    .unwrap();

    assert_eq!(config.database_url, None);
}

#[test]
fn unparseable_values_are_reported() {
    let err = Config::from_lookup(|key| Ok(match key {
        DATABASE_MAX_CONNECTIONS_KEY => Some("many".into()),
        _ => None,
    }))
    .unwrap_err();

    assert_eq!(err, invalid_config_error(DATABASE_MAX_CONNECTIONS_KEY));

    let err = Config::from_lookup(|key| Ok(match key {
        ADDR_KEY => Some("localhost".into()),
        _ => None,
    }))
    .unwrap_err();

    assert!(err.is_internal());
}

#[test]
fn unreadable_variables_are_reported() {
    use crate::error::env_var_error;
    use std::ffi::OsString;

    let err = Config::from_lookup(|key| match key {
        HISTORY_FEED_URL_KEY => Err(env::VarError::NotUnicode(OsString::from("feed")).into()),
        _ => Ok(None),
    })
    .unwrap_err();

    assert_eq!(err, env_var_error(env::VarError::NotPresent));
    assert!(err.is_internal());
}
