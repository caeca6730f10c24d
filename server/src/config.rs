use crate::models::{parse_comma_separated, ListenerVariant, ProxySource, RelayMode};
use dotenvy::dotenv;
use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub host: IpAddr,
    pub port: u16,
    pub variant: ListenerVariant,
    pub allowed_domains: Vec<String>,
    pub upstream_timeout: Duration,
    /// Overrides the host variant's preferred relay mode when set.
    pub relay_mode: Option<RelayMode>,
    pub max_body_bytes: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: DEFAULT_PORT,
            variant: ListenerVariant::default(),
            allowed_domains: Vec::new(),
            upstream_timeout: DEFAULT_TIMEOUT,
            relay_mode: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ProxyConfig {
    /// Reads the configuration from the environment, loading `.env` first if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup("HOST") {
            config.host = parse_value("HOST", &value)?;
        }
        if let Some(value) = lookup("PORT") {
            config.port = parse_value("PORT", &value)?;
        }
        if let Some(value) = lookup("PROXY_VARIANT") {
            config.variant = parse_value("PROXY_VARIANT", &value)?;
        }
        if let Some(value) = lookup("PROXY_ALLOWED_DOMAINS") {
            config.allowed_domains = parse_comma_separated(&value);
        }
        if let Some(value) = lookup("PROXY_TIMEOUT_SECS") {
            let secs: u64 = parse_value("PROXY_TIMEOUT_SECS", &value)?;
            if secs == 0 {
                return Err(ConfigError::Invalid {
                    key: "PROXY_TIMEOUT_SECS",
                    value,
                    reason: "must be greater than zero".to_string(),
                });
            }
            config.upstream_timeout = Duration::from_secs(secs);
        }
        if let Some(value) = lookup("PROXY_RELAY_MODE") {
            config.relay_mode = Some(parse_value("PROXY_RELAY_MODE", &value)?);
        }
        if let Some(value) = lookup("PROXY_MAX_BODY_BYTES") {
            config.max_body_bytes = parse_value("PROXY_MAX_BODY_BYTES", &value)?;
        }

        Ok(config)
    }

    pub fn listen_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn relay_mode_for(&self, source: ProxySource) -> RelayMode {
        self.relay_mode
            .unwrap_or_else(|| source.default_relay_mode())
    }
}

fn parse_value<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: value.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<ProxyConfig, ConfigError> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ProxyConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.listen_addr(), "0.0.0.0:8000".parse().unwrap());
        assert_eq!(config.variant, ListenerVariant::Edge);
        assert!(config.allowed_domains.is_empty());
        assert_eq!(config.upstream_timeout, Duration::from_secs(15));
        assert_eq!(config.max_body_bytes, DEFAULT_MAX_BODY_BYTES);
        assert_eq!(config.relay_mode_for(ProxySource::Edge), RelayMode::Stream);
        assert_eq!(config.relay_mode_for(ProxySource::Function), RelayMode::Buffer);
    }

    #[test]
    fn reads_every_key() {
        let config = config_from(&[
            ("HOST", "127.0.0.1"),
            ("PORT", "9090"),
            ("PROXY_VARIANT", "socket"),
            ("PROXY_ALLOWED_DOMAINS", "example.com, example.org"),
            ("PROXY_TIMEOUT_SECS", "3"),
            ("PROXY_RELAY_MODE", "buffer"),
            ("PROXY_MAX_BODY_BYTES", "2048"),
        ])
        .unwrap();

        assert_eq!(config.listen_addr(), "127.0.0.1:9090".parse().unwrap());
        assert_eq!(config.variant, ListenerVariant::Socket);
        assert_eq!(config.allowed_domains, vec!["example.com", "example.org"]);
        assert_eq!(config.upstream_timeout, Duration::from_secs(3));
        assert_eq!(config.relay_mode_for(ProxySource::Socket), RelayMode::Buffer);
        assert_eq!(config.max_body_bytes, 2048);
    }

    #[test]
    fn rejects_malformed_values() {
        let err = config_from(&[("PORT", "eighty")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));

        let err = config_from(&[("PROXY_TIMEOUT_SECS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PROXY_TIMEOUT_SECS", .. }));

        let err = config_from(&[("PROXY_VARIANT", "function")]).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PROXY_VARIANT", .. }));
    }
}
