//! Environment configuration.

use std::env;
use std::time::Duration;

/// Runtime configuration for the fan-out subsystem.
///
/// Read once at startup and passed by value to whatever needs it; no
/// component consults the environment on its own.
#[derive(Clone, Debug)]
pub struct Config {
    /// Broker connection URL. A `rediss://` scheme connects over TLS.
    pub redis_url: String,
    /// Port the gateway listens on.
    pub port: u16,
    /// Allowed CORS origin for the transport handshake; `*` allows any.
    pub cors_origin: String,
    /// Default TTL for read-through cache entries.
    pub cache_ttl: Duration,
    /// Initial delay of the broker reconnect backoff.
    pub reconnect_initial: Duration,
    /// Ceiling of the broker reconnect backoff.
    pub reconnect_max: Duration,
}

impl Config {
    /// Build a configuration from the environment, falling back to the
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            redis_url: env::var("REDIS_URL").unwrap_or(defaults.redis_url),
            port: parse_var("PORT").unwrap_or(defaults.port),
            cors_origin: env::var("CORS_ORIGIN").unwrap_or(defaults.cors_origin),
            cache_ttl: parse_var("CACHE_TTL_SECS")
                .map(Duration::from_secs)
                .unwrap_or(defaults.cache_ttl),
            reconnect_initial: parse_var("RECONNECT_INITIAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.reconnect_initial),
            reconnect_max: parse_var("RECONNECT_MAX_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.reconnect_max),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".into(),
            port: 5003,
            cors_origin: "http://localhost:3000".into(),
            cache_ttl: Duration::from_secs(300),
            reconnect_initial: Duration::from_millis(100),
            reconnect_max: Duration::from_millis(5000),
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|v| v.parse().ok())
}
