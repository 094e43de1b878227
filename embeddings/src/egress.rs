//! Network egress policy.
//!
//! Embedding calls are the only network traffic this system performs, so
//! every outgoing request URL is checked against an explicit allow-list of
//! origins before the HTTP client is touched. An empty allow-list blocks
//! all egress.

use url::Url;

use crate::error::{EmbeddingError, Result};

/// Allow-list of origins that embedding requests may reach.
#[derive(Debug, Clone, Default)]
pub struct EgressPolicy {
    allowed_origins: Vec<String>,
}

impl EgressPolicy {
    /// A policy that blocks all egress.
    pub fn deny_all() -> Self {
        Self::default()
    }

    /// Build a policy from a list of origin URLs.
    pub fn allow_origins<I, S>(origins: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut allowed = Vec::new();
        for origin in origins {
            allowed.push(origin_of(origin.as_ref())?);
        }
        Ok(Self {
            allowed_origins: allowed,
        })
    }

    /// Check whether a request to `url` is permitted.
    pub fn check(&self, url: &str) -> Result<()> {
        let origin = origin_of(url)?;
        if self.allowed_origins.iter().any(|o| *o == origin) {
            Ok(())
        } else {
            Err(EmbeddingError::EgressBlocked {
                url: url.to_string(),
            })
        }
    }
}

/// Canonical `scheme://host:port` origin of a URL.
fn origin_of(url: &str) -> Result<String> {
    let parsed = Url::parse(url)?;
    Ok(parsed.origin().ascii_serialization())
}
