//! Membership hash providers
//!
//! The program stores a hash of each member's secret, never the secret. How
//! that hash is produced is outside this crate's concern: it is a capability
//! chosen once at startup from [`HashProviderConfig`].

use async_trait::async_trait;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::codec::{field_from_bytes, ScalarKind, ScalarValue};
use crate::config::{ClientConfig, HashProviderConfig};
use crate::error::{ClientError, Result};
use crate::wire::parse_mapping_response;

/// Bytes of digest kept so the value fits below the field modulus
const FIELD_BYTES: usize = 31;

/// Computes the membership hash of a secret
#[async_trait]
pub trait HashProvider: Send + Sync {
    /// Provider name for logs
    fn name(&self) -> &'static str;

    async fn membership_hash(&self, secret: &ScalarValue) -> Result<ScalarValue>;
}

/// Build the provider selected in configuration
pub fn from_config(config: &ClientConfig) -> Result<Box<dyn HashProvider>> {
    match &config.hash_provider {
        HashProviderConfig::Digest => Ok(Box::new(DigestHashProvider)),
        HashProviderConfig::Remote { url } => Ok(Box::new(RemoteHashProvider::new(
            url.clone(),
            config.request_timeout(),
        )?)),
    }
}

/// In-process provider: SHA-256 of the secret literal, truncated to a field
#[derive(Debug, Clone, Copy, Default)]
pub struct DigestHashProvider;

#[async_trait]
impl HashProvider for DigestHashProvider {
    fn name(&self) -> &'static str {
        "digest"
    }

    async fn membership_hash(&self, secret: &ScalarValue) -> Result<ScalarValue> {
        let digest = Sha256::digest(secret.as_str().as_bytes());
        Ok(field_from_bytes(&digest[..FIELD_BYTES]))
    }
}

#[derive(Serialize)]
struct HashRequest<'a> {
    secret: &'a str,
}

/// Provider delegating to a hashing service
///
/// Sends `{"secret": "<literal>"}` and expects a `field` literal back, bare
/// or JSON-quoted.
pub struct RemoteHashProvider {
    url: String,
    http_client: reqwest::Client,
}

impl RemoteHashProvider {
    pub fn new(url: impl Into<String>, timeout: std::time::Duration) -> Result<Self> {
        let http_client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            url: url.into(),
            http_client,
        })
    }
}

#[async_trait]
impl HashProvider for RemoteHashProvider {
    fn name(&self) -> &'static str {
        "remote"
    }

    async fn membership_hash(&self, secret: &ScalarValue) -> Result<ScalarValue> {
        let response = self
            .http_client
            .post(&self.url)
            .json(&HashRequest {
                secret: secret.as_str(),
            })
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Hash(format!("HTTP {} - {}", status, body)));
        }

        let body = response.text().await?;
        debug!(url = %self.url, "Remote membership hash received");

        parse_mapping_response(Some(&body))
            .and_then(|v| v.as_scalar().and_then(ScalarValue::parse))
            .filter(|v| v.kind() == ScalarKind::Field)
            .ok_or_else(|| ClientError::Hash(format!("unexpected hash reply: {body}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::normalize_scalar;

    #[tokio::test]
    async fn test_digest_is_deterministic_field() {
        let provider = DigestHashProvider;
        let secret = normalize_scalar("123456", ScalarKind::Field);

        let a = provider.membership_hash(&secret).await.unwrap();
        let b = provider.membership_hash(&secret).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.kind(), ScalarKind::Field);

        let other = provider
            .membership_hash(&normalize_scalar("654321", ScalarKind::Field))
            .await
            .unwrap();
        assert_ne!(a, other);
    }

    #[test]
    fn test_from_config_selects_provider() {
        let config = ClientConfig::default();
        assert_eq!(from_config(&config).unwrap().name(), "digest");

        let config = ClientConfig {
            hash_provider: HashProviderConfig::Remote {
                url: "http://localhost:9/hash".into(),
            },
            ..Default::default()
        };
        assert_eq!(from_config(&config).unwrap().name(), "remote");
    }
}
