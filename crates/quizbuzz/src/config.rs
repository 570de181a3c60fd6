//! Server configuration.
//!
//! Every field has a default. [`ServerConfig::from_env`] overrides them
//! from `QUIZBUZZ_*` variables; the binary loads `.env` first.

use std::str::FromStr;
use std::time::Duration;

use quizbuzz_room::{RoomLimits, RoomTiming};

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind: String,
    /// A connection that sends nothing for this long is dropped.
    pub idle_timeout: Duration,
    /// Time a new connection has to send its handshake.
    pub handshake_timeout: Duration,
    pub limits: RoomLimits,
    pub timing: RoomTiming,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            idle_timeout: Duration::from_secs(60),
            handshake_timeout: Duration::from_secs(5),
            limits: RoomLimits::default(),
            timing: RoomTiming::default(),
        }
    }
}

impl ServerConfig {
    /// Reads `QUIZBUZZ_BIND`, `QUIZBUZZ_IDLE_TIMEOUT_SECS`, and
    /// `QUIZBUZZ_COLLABORATOR_TIMEOUT_MS`. Unset or unparsable values keep
    /// their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) but with a custom variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(bind) = lookup("QUIZBUZZ_BIND").filter(|b| !b.trim().is_empty()) {
            config.bind = bind.trim().to_string();
        }
        if let Some(secs) = parse(&lookup, "QUIZBUZZ_IDLE_TIMEOUT_SECS") {
            config.idle_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = parse(&lookup, "QUIZBUZZ_COLLABORATOR_TIMEOUT_MS") {
            config.timing.collaborator_timeout = Duration::from_millis(ms);
        }
        config
    }
}

fn parse<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_variables() {
        let config = ServerConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.bind, "127.0.0.1:8080");
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
        assert_eq!(config.timing.collaborator_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_variables_override_defaults() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("QUIZBUZZ_BIND", "0.0.0.0:9000"),
            ("QUIZBUZZ_IDLE_TIMEOUT_SECS", "120"),
            ("QUIZBUZZ_COLLABORATOR_TIMEOUT_MS", "2500"),
        ]));
        assert_eq!(config.bind, "0.0.0.0:9000");
        assert_eq!(config.idle_timeout, Duration::from_secs(120));
        assert_eq!(config.timing.collaborator_timeout, Duration::from_millis(2500));
    }

    #[test]
    fn test_garbage_keeps_default() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("QUIZBUZZ_IDLE_TIMEOUT_SECS", "soon"),
            ("QUIZBUZZ_BIND", "  "),
        ]));
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
        assert_eq!(config.bind, DEFAULT_BIND);
    }
}
