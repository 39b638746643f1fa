//! Read-side adapter over the ledger's HTTP query endpoint
//!
//! Every method absorbs failure into a sentinel (`None`, `0`, `false`): a
//! failed read must never block the optimistic local view.

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use crate::codec::ScalarValue;
use crate::config::ClientConfig;
use crate::wire::{parse_mapping_response, StructValue, WireValue};

/// Mapping names used by the reporting program
pub mod mappings {
    pub const ORGANIZATIONS: &str = "organizations";
    pub const REPORTS: &str = "reports";
    pub const MEMBERS: &str = "members";
    pub const ORG_COUNT: &str = "org_count";
    pub const TOTAL_REPORTS: &str = "total_reports";
}

/// Key under which the program keeps its singleton counters
const COUNTER_KEY: &str = "0u8";

/// Query interface of the network
#[async_trait]
pub trait ReadEndpoint: Send + Sync {
    /// Raw body for `mapping[key]`, `None` when absent or unreachable
    async fn fetch_mapping_raw(&self, mapping: &str, key: &str) -> Option<String>;

    /// Latest block height, 0 when unreachable
    async fn fetch_latest_height(&self) -> u64;

    /// Whether the transaction is visible on the network
    async fn transaction_exists(&self, handle: &str) -> bool;

    /// Parsed `mapping[key]`
    async fn fetch_mapping(&self, mapping: &str, key: &str) -> Option<WireValue> {
        let raw = self.fetch_mapping_raw(mapping, key).await;
        parse_mapping_response(raw.as_deref())
    }

    /// Public record of an organization; a non-struct reply counts as absent
    async fn organization(&self, org_id: &ScalarValue) -> Option<StructValue> {
        self.fetch_mapping(mappings::ORGANIZATIONS, org_id.as_str())
            .await
            .and_then(WireValue::into_struct)
    }

    /// Public record of a report; a non-struct reply counts as absent
    async fn report(&self, report_id: &ScalarValue) -> Option<StructValue> {
        self.fetch_mapping(mappings::REPORTS, report_id.as_str())
            .await
            .and_then(WireValue::into_struct)
    }

    /// Whether a membership hash is registered
    async fn is_member(&self, member_hash: &ScalarValue) -> bool {
        match self.fetch_mapping(mappings::MEMBERS, member_hash.as_str()).await {
            Some(WireValue::Scalar(s)) => s.contains("true"),
            Some(WireValue::Struct(s)) => s.iter().any(|(_, v)| v.contains("true")),
            None => false,
        }
    }

    /// Number of organizations registered on chain
    async fn org_count(&self) -> u64 {
        self.counter(mappings::ORG_COUNT).await
    }

    /// Number of reports submitted on chain
    async fn total_reports(&self) -> u64 {
        self.counter(mappings::TOTAL_REPORTS).await
    }

    #[doc(hidden)]
    async fn counter(&self, mapping: &str) -> u64 {
        self.fetch_mapping(mapping, COUNTER_KEY)
            .await
            .and_then(|v| v.as_scalar().and_then(ScalarValue::parse))
            .and_then(|s| s.as_u64())
            .unwrap_or(0)
    }
}

/// HTTP implementation of [`ReadEndpoint`]
///
/// # Example
///
/// ```rust,no_run
/// use whistle_client::{ClientConfig, LedgerReadClient, ReadEndpoint};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = LedgerReadClient::new(&ClientConfig::default())?;
/// let height = client.fetch_latest_height().await;
/// let orgs = client.org_count().await;
/// # Ok(())
/// # }
/// ```
pub struct LedgerReadClient {
    base_url: String,
    program_id: String,
    client: Client,
}

impl LedgerReadClient {
    /// Create a client for the configured endpoint and program
    pub fn new(config: &ClientConfig) -> crate::Result<Self> {
        let client = Client::builder().timeout(config.request_timeout()).build()?;

        Ok(Self {
            base_url: config.api_base().to_string(),
            program_id: config.program_id.clone(),
            client,
        })
    }

    pub fn program_id(&self) -> &str {
        &self.program_id
    }

    async fn get_text(&self, url: &str) -> Option<String> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(url, error = %e, "Ledger read failed");
                return None;
            }
        };

        if !response.status().is_success() {
            debug!(url, status = response.status().as_u16(), "Ledger read returned no value");
            return None;
        }

        match response.text().await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!(url, error = %e, "Ledger read body unreadable");
                None
            }
        }
    }
}

#[async_trait]
impl ReadEndpoint for LedgerReadClient {
    async fn fetch_mapping_raw(&self, mapping: &str, key: &str) -> Option<String> {
        let url = format!(
            "{}/program/{}/mapping/{}/{}",
            self.base_url, self.program_id, mapping, key
        );
        self.get_text(&url).await
    }

    async fn fetch_latest_height(&self) -> u64 {
        let url = format!("{}/latest/height", self.base_url);
        self.get_text(&url)
            .await
            .and_then(|body| body.trim().parse().ok())
            .unwrap_or(0)
    }

    async fn transaction_exists(&self, handle: &str) -> bool {
        let url = format!("{}/transaction/{}", self.base_url, handle);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!(handle, error = %e, "Transaction lookup failed");
                false
            }
        }
    }
}
