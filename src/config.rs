use std::{net::SocketAddr, str::FromStr};

use anyhow::Context;

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_url: String,
    pub db_max_connections: u32,
    pub bind_addr: SocketAddr,
    pub session_idle_minutes: i64,
    pub secure_cookies: bool,
    pub realtime_capacity: usize,
    pub bcrypt_cost: u32,
}

impl Config {
    /// Reads the environment, with `.env` values filling in whatever isn't set.
    pub fn from_env() -> anyhow::Result<Config> {
        Self::from_lookup(|key| dotenv::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Config> {
        fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> anyhow::Result<T>
        where
            T: FromStr,
            T::Err: std::error::Error + Send + Sync + 'static,
        {
            match lookup(key) {
                Some(value) => value
                    .trim()
                    .parse()
                    .with_context(|| format!("invalid {key}: {value:?}")),
                None => Ok(default),
            }
        }

        Ok(Config {
            database_url: lookup("DATABASE_URL").unwrap_or_else(|| "sqlite://huddle.db?mode=rwc".to_owned()),
            db_max_connections: parse(&lookup, "DB_MAX_CONNECTIONS", 16)?,
            bind_addr: parse(&lookup, "BIND_ADDR", SocketAddr::from(([0, 0, 0, 0], 8080)))?,
            session_idle_minutes: parse(&lookup, "SESSION_IDLE_MINUTES", 60)?,
            secure_cookies: parse(&lookup, "SECURE_COOKIES", false)?,
            realtime_capacity: parse(&lookup, "REALTIME_CAPACITY", 256)?,
            bcrypt_cost: parse(&lookup, "BCRYPT_COST", bcrypt::DEFAULT_COST)?,
        })
    }
}
