use crate::error::ProxyError;
use tracing::warn;
use url::Url;

/// Decides which target URLs the proxy is willing to fetch.
///
/// Only absolute `http`/`https` URLs pass. When the allow-list is non-empty the
/// hostname must also match one of its entries exactly.
#[derive(Debug, Clone, Default)]
pub struct UrlPolicy {
    allowed_domains: Vec<String>,
}

impl UrlPolicy {
    pub fn new<I, S>(allowed_domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let allowed_domains = allowed_domains
            .into_iter()
            .map(|d| d.as_ref().trim().to_ascii_lowercase())
            .filter(|d| !d.is_empty())
            .collect();
        Self { allowed_domains }
    }

    pub fn allowed_domains(&self) -> &[String] {
        &self.allowed_domains
    }

    pub fn is_host_allowed(&self, host: &str) -> bool {
        self.allowed_domains.is_empty()
            || self
                .allowed_domains
                .iter()
                .any(|d| d.eq_ignore_ascii_case(host))
    }

    pub fn validate(&self, candidate: &str) -> Result<Url, ProxyError> {
        let invalid = || ProxyError::InvalidUrl(candidate.to_string());

        let url = Url::parse(candidate).map_err(|_| invalid())?;
        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(invalid());
        }

        let host = url.host_str().unwrap_or_default();
        if !self.is_host_allowed(host) {
            warn!("Rejected url for host '{}': not in allowed domains", host);
            return Err(invalid());
        }

        Ok(url)
    }
}
