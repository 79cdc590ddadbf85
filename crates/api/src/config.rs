use std::str::FromStr;
use std::time::Duration;

use axum::http::HeaderValue;
use klyra_core::policy::EnginePolicy;
use rust_decimal::Decimal;

use crate::auth::jwt::JwtConfig;

/// Startup configuration problems. The server refuses to start on any of them.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} must be set in the environment")]
    Missing(&'static str),

    #[error("{key} has an invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Which [`klyra_core::store::ParkingStore`] implementation backs the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    /// Process-local store for demos and tests; state is lost on restart.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(format!("expected `postgres` or `memory`, got `{other}`")),
        }
    }
}

/// Intervals of the background monitors.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub overstay_sweep_interval: Duration,
    pub start_validation_interval: Duration,
    /// Upper bound on one monitor tick; a tick running longer is abandoned.
    pub tick_timeout: Duration,
}

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS`.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// How long shutdown waits for background tasks (default: `30`).
    pub shutdown_timeout_secs: u64,
    pub jwt: JwtConfig,
    pub store_backend: StoreBackend,
    /// Required when `store_backend` is `Postgres`.
    pub database_url: Option<String>,
    pub policy: EnginePolicy,
    pub monitor: MonitorConfig,
}

impl ServerConfig {
    /// Load configuration from the process environment.
    ///
    /// | Env Var                          | Default                 |
    /// |----------------------------------|-------------------------|
    /// | `HOST`                           | `0.0.0.0`               |
    /// | `PORT`                           | `3000`                  |
    /// | `CORS_ORIGINS`                   | `http://localhost:5173` |
    /// | `REQUEST_TIMEOUT_SECS`           | `30`                    |
    /// | `SHUTDOWN_TIMEOUT_SECS`          | `30`                    |
    /// | `JWT_SECRET`                     | required                |
    /// | `JWT_ACCESS_EXPIRY_MINS`         | `60`                    |
    /// | `STORE_BACKEND`                  | `postgres`              |
    /// | `DATABASE_URL`                   | required for `postgres` |
    /// | `HOURLY_RATE`                    | `50`                    |
    /// | `OVERSTAY_HOURLY_RATE`           | `100`                   |
    /// | `CANCELLATION_COMPENSATION`      | `50`                    |
    /// | `REASSIGN_ACROSS_LOCATIONS`      | `false`                 |
    /// | `OVERSTAY_SWEEP_INTERVAL_SECS`   | `60`                    |
    /// | `START_VALIDATION_INTERVAL_SECS` | `30`                    |
    /// | `MONITOR_TICK_TIMEOUT_SECS`      | `20`                    |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars { lookup: &lookup };

        let host = vars.get("HOST").unwrap_or_else(|| "0.0.0.0".into());
        let port = vars.parse("PORT", 3000u16)?;
        let cors_origins: Vec<String> = vars
            .get("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        for origin in &cors_origins {
            HeaderValue::from_str(origin).map_err(|e| ConfigError::Invalid {
                key: "CORS_ORIGINS",
                value: origin.clone(),
                reason: e.to_string(),
            })?;
        }
        let request_timeout_secs = vars.parse("REQUEST_TIMEOUT_SECS", 30u64)?;
        let shutdown_timeout_secs = vars.parse("SHUTDOWN_TIMEOUT_SECS", 30u64)?;

        let jwt = JwtConfig {
            secret: vars.require("JWT_SECRET")?,
            access_token_expiry_mins: vars.parse("JWT_ACCESS_EXPIRY_MINS", 60i64)?,
        };

        let store_backend = vars.parse("STORE_BACKEND", StoreBackend::Postgres)?;
        let database_url = match store_backend {
            StoreBackend::Postgres => Some(vars.require("DATABASE_URL")?),
            StoreBackend::Memory => vars.get("DATABASE_URL"),
        };

        let defaults = EnginePolicy::default();
        let policy = EnginePolicy {
            hourly_rate: vars.money("HOURLY_RATE", defaults.hourly_rate)?,
            overstay_hourly_rate: vars.money("OVERSTAY_HOURLY_RATE", defaults.overstay_hourly_rate)?,
            cancellation_compensation: vars
                .money("CANCELLATION_COMPENSATION", defaults.cancellation_compensation)?,
            reassign_across_locations: vars
                .parse("REASSIGN_ACROSS_LOCATIONS", defaults.reassign_across_locations)?,
        };

        let monitor = MonitorConfig {
            overstay_sweep_interval: vars.secs("OVERSTAY_SWEEP_INTERVAL_SECS", 60)?,
            start_validation_interval: vars.secs("START_VALIDATION_INTERVAL_SECS", 30)?,
            tick_timeout: vars.secs("MONITOR_TICK_TIMEOUT_SECS", 20)?,
        };

        Ok(Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            jwt,
            store_backend,
            database_url,
            policy,
            monitor,
        })
    }
}

struct Vars<'a, F: Fn(&str) -> Option<String>> {
    lookup: &'a F,
}

impl<F: Fn(&str) -> Option<String>> Vars<'_, F> {
    /// A set, non-blank value.
    fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn require(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key).ok_or(ConfigError::Missing(key))
    }

    fn parse<T>(&self, key: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
                key,
                reason: e.to_string(),
                value,
            }),
        }
    }

    fn money(&self, key: &'static str, default: Decimal) -> Result<Decimal, ConfigError> {
        let amount: Decimal = self.parse(key, default)?;
        if amount.is_sign_negative() {
            return Err(ConfigError::Invalid {
                key,
                value: amount.to_string(),
                reason: "must not be negative".into(),
            });
        }
        Ok(amount)
    }

    fn secs(&self, key: &'static str, default: u64) -> Result<Duration, ConfigError> {
        let secs: u64 = self.parse(key, default)?;
        if secs == 0 {
            return Err(ConfigError::Invalid {
                key,
                value: secs.to_string(),
                reason: "must be at least 1 second".into(),
            });
        }
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;
    use rust_decimal_macros::dec;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<ServerConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_with_minimal_environment() {
        let config = load(&[("JWT_SECRET", "s3cret"), ("DATABASE_URL", "postgres://x")]).unwrap();

        assert_eq!(config.port, 3000);
        assert_eq!(config.cors_origins, vec!["http://localhost:5173"]);
        assert_eq!(config.store_backend, StoreBackend::Postgres);
        assert_eq!(config.policy, EnginePolicy::default());
        assert_eq!(config.monitor.overstay_sweep_interval, Duration::from_secs(60));
        assert_eq!(config.monitor.start_validation_interval, Duration::from_secs(30));
        assert_eq!(config.monitor.tick_timeout, Duration::from_secs(20));
    }

    #[test]
    fn jwt_secret_is_required() {
        let err = load(&[("DATABASE_URL", "postgres://x")]).unwrap_err();
        assert_matches!(err, ConfigError::Missing("JWT_SECRET"));
    }

    #[test]
    fn memory_backend_needs_no_database() {
        let config = load(&[("JWT_SECRET", "s"), ("STORE_BACKEND", "memory")]).unwrap();
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert!(config.database_url.is_none());

        let err = load(&[("JWT_SECRET", "s")]).unwrap_err();
        assert_matches!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn policy_overrides_are_parsed() {
        let config = load(&[
            ("JWT_SECRET", "s"),
            ("STORE_BACKEND", "memory"),
            ("HOURLY_RATE", "40.50"),
            ("REASSIGN_ACROSS_LOCATIONS", "true"),
        ])
        .unwrap();
        assert_eq!(config.policy.hourly_rate, dec!(40.50));
        assert!(config.policy.reassign_across_locations);
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = load(&[("JWT_SECRET", "s"), ("STORE_BACKEND", "memory"), ("PORT", "http")])
            .unwrap_err();
        assert_matches!(err, ConfigError::Invalid { key: "PORT", .. });

        let err = load(&[
            ("JWT_SECRET", "s"),
            ("STORE_BACKEND", "memory"),
            ("OVERSTAY_HOURLY_RATE", "-1"),
        ])
        .unwrap_err();
        assert_matches!(err, ConfigError::Invalid { key: "OVERSTAY_HOURLY_RATE", .. });

        let err = load(&[
            ("JWT_SECRET", "s"),
            ("STORE_BACKEND", "sqlite"),
        ])
        .unwrap_err();
        assert_matches!(err, ConfigError::Invalid { key: "STORE_BACKEND", .. });
    }
}
