//! Server settings read from the environment.

use std::fmt::Display;
use std::str::FromStr;

/// Server configuration loaded from environment variables.
///
/// | Env Var                 | Default                 |
/// |-------------------------|-------------------------|
/// | `HOST`                  | `0.0.0.0`               |
/// | `PORT`                  | `3000`                  |
/// | `CORS_ORIGINS`          | `http://localhost:5173` |
/// | `REQUEST_TIMEOUT_SECS`  | `30`                    |
/// | `SHUTDOWN_TIMEOUT_SECS` | `30`                    |
/// | `REPAIR_INTERVAL_SECS`  | `0` (disabled)          |
/// | `DB_MAX_CONNECTIONS`    | `20`                    |
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Comma-separated in `CORS_ORIGINS`; blanks are dropped.
    pub cors_origins: Vec<String>,
    pub request_timeout_secs: u64,
    /// Grace period for background tasks once the server has drained.
    pub shutdown_timeout_secs: u64,
    /// Seconds between background repair sweeps; `0` disables them.
    pub repair_interval_secs: u64,
    pub db_max_connections: u32,
}

impl ServerConfig {
    /// Load from the process environment. Malformed values abort startup.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let cors_origins = lookup("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Self {
            host: lookup("HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: env_or(&lookup, "PORT", 3000),
            cors_origins,
            request_timeout_secs: env_or(&lookup, "REQUEST_TIMEOUT_SECS", 30),
            shutdown_timeout_secs: env_or(&lookup, "SHUTDOWN_TIMEOUT_SECS", 30),
            repair_interval_secs: env_or(&lookup, "REPAIR_INTERVAL_SECS", 0),
            db_max_connections: env_or(
                &lookup,
                "DB_MAX_CONNECTIONS",
                coursepath_db::DEFAULT_MAX_CONNECTIONS,
            ),
        }
    }
}

fn env_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} has invalid value '{raw}': {e}")),
        None => default,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(vars: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let c = config(&[]);
        assert_eq!(c.host, "0.0.0.0");
        assert_eq!(c.port, 3000);
        assert_eq!(c.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(c.repair_interval_secs, 0);
        assert_eq!(c.db_max_connections, coursepath_db::DEFAULT_MAX_CONNECTIONS);
    }

    #[test]
    fn overrides_are_parsed() {
        let c = config(&[
            ("PORT", "8080"),
            ("REPAIR_INTERVAL_SECS", " 600 "),
            ("CORS_ORIGINS", "https://a.test, ,https://b.test"),
        ]);
        assert_eq!(c.port, 8080);
        assert_eq!(c.repair_interval_secs, 600);
        assert_eq!(c.cors_origins, vec!["https://a.test", "https://b.test"]);
    }

    #[test]
    #[should_panic(expected = "PORT has invalid value")]
    fn malformed_number_panics() {
        config(&[("PORT", "eighty")]);
    }
}
