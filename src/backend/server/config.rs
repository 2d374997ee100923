/**
 * Server Configuration
 *
 * This module loads and validates the server configuration from
 * environment variables (a `.env` file is loaded first by `main`).
 *
 * # Variables
 *
 * | Variable             | Default   | Meaning                                      |
 * |----------------------|-----------|----------------------------------------------|
 * | `HOST`               | `0.0.0.0` | Bind address                                 |
 * | `PORT`               | `9090`    | Bind port                                    |
 * | `LOCK_STORE`         | `memory`  | `memory` or `postgres`                       |
 * | `LOCK_BACKPLANE`     | `memory`  | `memory` or `postgres`                       |
 * | `DATABASE_URL`       | -         | Required when either of the above is postgres |
 * | `LOCK_TTL_SECS`      | `30`      | Lease lifetime without a heartbeat           |
 * | `LOCK_REFRESH_SECS`  | `10`      | Heartbeat and sweep interval                 |
 * | `REAP_SCANS_STORE`   | `true`    | Reaper also scans the store by owner         |
 * | `BROADCAST_CAPACITY` | `1000`    | Per-subscriber backplane buffer              |
 *
 * # Error Handling
 *
 * Invalid values are rejected with `ConfigError` rather than silently
 * replaced, since a wrong store choice would break exclusivity across
 * instances.
 */

use crate::backend::coordinator::CoordinatorConfig;
use std::time::Duration;
use thiserror::Error;

/// Which adapter backs the store or the backplane
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// In-process (single instance)
    Memory,
    /// PostgreSQL (multi-instance)
    Postgres,
}

impl std::str::FromStr for BackendKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "memory" | "mem" => Ok(Self::Memory),
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            other => Err(ConfigError::InvalidValue {
                name: "backend",
                value: other.to_string(),
            }),
        }
    }
}

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("refresh interval ({refresh:?}) must be shorter than the lock TTL ({ttl:?})")]
    RefreshNotShorterThanTtl { refresh: Duration, ttl: Duration },
}

/// Complete server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub store: BackendKind,
    pub backplane: BackendKind,
    pub database_url: Option<String>,
    pub broadcast_capacity: usize,
    pub coordinator: CoordinatorConfig,
}

impl ServerConfig {
    /// Create a new ServerConfigBuilder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }

    /// Load from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(host) = lookup("HOST") {
            builder = builder.host(host);
        }
        if let Some(port) = lookup("PORT") {
            builder = builder.port(parse_var("PORT", &port)?);
        }
        if let Some(store) = lookup("LOCK_STORE") {
            builder = builder.store(parse_backend("LOCK_STORE", &store)?);
        }
        if let Some(backplane) = lookup("LOCK_BACKPLANE") {
            builder = builder.backplane(parse_backend("LOCK_BACKPLANE", &backplane)?);
        }
        if let Some(url) = lookup("DATABASE_URL") {
            builder = builder.database_url(url);
        }
        if let Some(ttl) = lookup("LOCK_TTL_SECS") {
            builder = builder.lock_ttl(Duration::from_secs(parse_var("LOCK_TTL_SECS", &ttl)?));
        }
        if let Some(refresh) = lookup("LOCK_REFRESH_SECS") {
            builder = builder
                .refresh_interval(Duration::from_secs(parse_var("LOCK_REFRESH_SECS", &refresh)?));
        }
        if let Some(scan) = lookup("REAP_SCANS_STORE") {
            builder = builder.reap_scans_store(parse_var("REAP_SCANS_STORE", &scan)?);
        }
        if let Some(capacity) = lookup("BROADCAST_CAPACITY") {
            builder = builder.broadcast_capacity(parse_var("BROADCAST_CAPACITY", &capacity)?);
        }

        builder.build()
    }

    /// Socket address to bind
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Whether any component needs a database connection
    pub fn needs_database(&self) -> bool {
        self.store == BackendKind::Postgres || self.backplane == BackendKind::Postgres
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.needs_database() && self.database_url.is_none() {
            return Err(ConfigError::MissingValue("DATABASE_URL"));
        }
        if self.broadcast_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                name: "BROADCAST_CAPACITY",
                value: "0".to_string(),
            });
        }
        let CoordinatorConfig { lock_ttl, refresh_interval, .. } = self.coordinator;
        if refresh_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                name: "LOCK_REFRESH_SECS",
                value: "0".to_string(),
            });
        }
        if refresh_interval >= lock_ttl {
            return Err(ConfigError::RefreshNotShorterThanTtl {
                refresh: refresh_interval,
                ttl: lock_ttl,
            });
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: value.to_string(),
    })
}

fn parse_backend(name: &'static str, value: &str) -> Result<BackendKind, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidValue {
        name,
        value: value.to_string(),
    })
}

/// Builder for ServerConfig
#[derive(Debug)]
pub struct ServerConfigBuilder {
    host: String,
    port: u16,
    store: BackendKind,
    backplane: BackendKind,
    database_url: Option<String>,
    broadcast_capacity: usize,
    coordinator: CoordinatorConfig,
}

impl Default for ServerConfigBuilder {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9090,
            store: BackendKind::Memory,
            backplane: BackendKind::Memory,
            database_url: None,
            broadcast_capacity: 1000,
            coordinator: CoordinatorConfig::default(),
        }
    }
}

impl ServerConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn store(mut self, store: BackendKind) -> Self {
        self.store = store;
        self
    }

    pub fn backplane(mut self, backplane: BackendKind) -> Self {
        self.backplane = backplane;
        self
    }

    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn broadcast_capacity(mut self, capacity: usize) -> Self {
        self.broadcast_capacity = capacity;
        self
    }

    pub fn lock_ttl(mut self, ttl: Duration) -> Self {
        self.coordinator.lock_ttl = ttl;
        self
    }

    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.coordinator.refresh_interval = interval;
        self
    }

    pub fn reap_scans_store(mut self, scan: bool) -> Self {
        self.coordinator.reap_scans_store = scan;
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<ServerConfig, ConfigError> {
        let config = ServerConfig {
            host: self.host,
            port: self.port,
            store: self.store,
            backplane: self.backplane,
            database_url: self.database_url,
            broadcast_capacity: self.broadcast_capacity,
            coordinator: self.coordinator,
        };
        config.validate()?;
        Ok(config)
    }
}
