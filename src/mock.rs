//! Mock collaborators for testing.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::read_client::ReadEndpoint;
use crate::signer::{CallRequest, Signer, SignerError, SubmissionHandle};

/// Mock read endpoint.
///
/// Mapping values and block height are configured up front; transaction
/// lookups replay a scripted sequence of answers.
#[derive(Default)]
pub struct MockEndpoint {
    mappings: HashMap<(String, String), String>,
    height: u64,
    tx_answers: Mutex<VecDeque<bool>>,
    tx_default: bool,
    tx_calls: AtomicU32,
    cancel_on_call: Option<(u32, CancellationToken)>,
}

impl MockEndpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `mapping[key]` with a raw body.
    pub fn with_mapping(
        mut self,
        mapping: impl Into<String>,
        key: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        self.mappings.insert((mapping.into(), key.into()), body.into());
        self
    }

    pub fn with_height(mut self, height: u64) -> Self {
        self.height = height;
        self
    }

    /// Answers for successive transaction lookups.
    pub fn with_tx_answers(self, answers: impl IntoIterator<Item = bool>) -> Self {
        self.tx_answers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .extend(answers);
        self
    }

    /// Answer once the scripted sequence runs out.
    pub fn with_tx_default(mut self, answer: bool) -> Self {
        self.tx_default = answer;
        self
    }

    /// Cancel `token` while serving the `call`-th transaction lookup (1-based).
    pub fn cancel_during_call(mut self, call: u32, token: CancellationToken) -> Self {
        self.cancel_on_call = Some((call, token));
        self
    }

    /// Number of transaction lookups served.
    pub fn tx_calls(&self) -> u32 {
        self.tx_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReadEndpoint for MockEndpoint {
    async fn fetch_mapping_raw(&self, mapping: &str, key: &str) -> Option<String> {
        self.mappings
            .get(&(mapping.to_string(), key.to_string()))
            .cloned()
    }

    async fn fetch_latest_height(&self) -> u64 {
        self.height
    }

    async fn transaction_exists(&self, _handle: &str) -> bool {
        let call = self.tx_calls.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((at, token)) = &self.cancel_on_call {
            if *at == call {
                token.cancel();
            }
        }
        self.tx_answers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or(self.tx_default)
    }
}

/// Mock signer.
///
/// Hands out numbered handles and records every request it accepts.
pub struct MockSigner {
    address: String,
    handle_prefix: String,
    failure: Option<SignerError>,
    requests: Mutex<Vec<CallRequest>>,
}

impl MockSigner {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            handle_prefix: "at1mock".to_string(),
            failure: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Prefix for generated handles; include `-` to mimic wallet-local tokens.
    pub fn with_handle_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.handle_prefix = prefix.into();
        self
    }

    /// Fail every request with `error`.
    pub fn failing(mut self, error: SignerError) -> Self {
        self.failure = Some(error);
        self
    }

    /// Requests accepted so far.
    pub fn requests(&self) -> Vec<CallRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Default for MockSigner {
    fn default() -> Self {
        Self::new("aleo1mockaddress")
    }
}

#[async_trait]
impl Signer for MockSigner {
    fn address(&self) -> String {
        self.address.clone()
    }

    async fn request_transaction(
        &self,
        request: CallRequest,
    ) -> Result<SubmissionHandle, SignerError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        let mut requests = self.requests.lock().unwrap_or_else(|e| e.into_inner());
        requests.push(request);
        Ok(SubmissionHandle::new(format!(
            "{}{}",
            self.handle_prefix,
            requests.len()
        )))
    }
}
