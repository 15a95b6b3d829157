// ⚙️ Runtime configuration from environment variables

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};

pub const DEFAULT_BIND: &str = "0.0.0.0:8000";
pub const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Address the HTTP server listens on
    pub bind_addr: SocketAddr,

    /// SQLite file; None keeps everything in memory
    pub database_path: Option<PathBuf>,

    /// Load the demo client/debt when the store starts empty
    pub seed: bool,

    /// tracing-subscriber filter directive
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            database_path: None,
            seed: true,
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup (the environment in production, a map in tests)
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let bind = lookup("FINFIT_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind_addr: SocketAddr = bind
            .parse()
            .with_context(|| format!("FINFIT_BIND is not a socket address: {}", bind))?;

        let database_path = lookup("DATABASE_URL")
            .or_else(|| lookup("FINFIT_DB"))
            .filter(|s| !s.trim().is_empty())
            .map(|s| sqlite_path(&s))
            .transpose()?;

        let seed = match lookup("FINFIT_SEED") {
            Some(value) => parse_bool(&value)
                .ok_or_else(|| anyhow!("FINFIT_SEED must be true or false, got {}", value))?,
            None => true,
        };

        let log_filter = lookup("FINFIT_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        Ok(Config {
            bind_addr,
            database_path,
            seed,
            log_filter,
        })
    }
}

/// Accepts a bare path or a `sqlite://` URL
fn sqlite_path(value: &str) -> Result<PathBuf> {
    let value = value.trim();
    if let Some(rest) = value.strip_prefix("sqlite:///") {
        return Ok(PathBuf::from(rest));
    }
    if let Some(rest) = value.strip_prefix("sqlite://") {
        return Ok(PathBuf::from(rest));
    }
    if value.contains("://") {
        return Err(anyhow!("only sqlite databases are supported, got {}", value));
    }
    Ok(PathBuf::from(value))
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_sqlite_url_prefix_stripped() {
        let config = config_from(&[("DATABASE_URL", "sqlite:///./finfit.db")]).unwrap();
        assert_eq!(config.database_path, Some(PathBuf::from("./finfit.db")));

        let config = config_from(&[("FINFIT_DB", "/tmp/debts.db")]).unwrap();
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/debts.db")));
    }

    #[test]
    fn test_postgres_url_rejected() {
        assert!(config_from(&[("DATABASE_URL", "postgres://host/db")]).is_err());
    }

    #[test]
    fn test_invalid_values_rejected() {
        assert!(config_from(&[("FINFIT_BIND", "not-an-address")]).is_err());
        assert!(config_from(&[("FINFIT_SEED", "maybe")]).is_err());

        let config = config_from(&[("FINFIT_SEED", "off")]).unwrap();
        assert!(!config.seed);
    }
}
