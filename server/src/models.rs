use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Body of an inbound proxy request: `{ "url": "<absolute http/https URL>" }`.
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    #[serde(default, deserialize_with = "deserialize_string_or_empty")]
    pub url: String,
}

impl FetchRequest {
    /// Reads the request out of an already parsed JSON document.
    ///
    /// Anything but a string under a top-level `url` key yields an empty url,
    /// which later fails validation.
    pub fn from_json(value: &Value) -> Self {
        // A struct would also deserialize from a JSON array, positionally.
        if !value.is_object() {
            return Self::default();
        }
        Self::deserialize(value).unwrap_or_default()
    }
}

fn deserialize_string_or_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        _ => Ok(String::new()),
    }
}

/// Hosting variant that produced a response, sent back as `x-proxy-source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxySource {
    Function,
    Edge,
    Socket,
}

impl ProxySource {
    pub fn as_str(self) -> &'static str {
        match self {
            ProxySource::Function => "serverless-function",
            ProxySource::Edge => "edge-listener",
            ProxySource::Socket => "standalone-server",
        }
    }

    /// Streaming is preferred wherever the host can forward a live body.
    pub fn default_relay_mode(self) -> RelayMode {
        match self {
            ProxySource::Function => RelayMode::Buffer,
            ProxySource::Edge | ProxySource::Socket => RelayMode::Stream,
        }
    }
}

impl fmt::Display for ProxySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Variants that own a listening socket and can be started by the binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ListenerVariant {
    #[default]
    Edge,
    Socket,
}

impl ListenerVariant {
    pub fn source(self) -> ProxySource {
        match self {
            ListenerVariant::Edge => ProxySource::Edge,
            ListenerVariant::Socket => ProxySource::Socket,
        }
    }
}

impl FromStr for ListenerVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "edge" => Ok(ListenerVariant::Edge),
            "socket" => Ok(ListenerVariant::Socket),
            other => Err(format!("expected `edge` or `socket`, got `{}`", other)),
        }
    }
}

/// How the upstream body reaches the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayMode {
    /// Forward chunks as they arrive.
    Stream,
    /// Read the whole body before responding.
    Buffer,
}

impl FromStr for RelayMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stream" => Ok(RelayMode::Stream),
            "buffer" => Ok(RelayMode::Buffer),
            other => Err(format!("expected `stream` or `buffer`, got `{}`", other)),
        }
    }
}

pub fn parse_comma_separated(s: &str) -> Vec<String> {
    s.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
