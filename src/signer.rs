//! Boundary to the external wallet that signs and submits program calls

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Errors reported by the signer; their messages reach the user verbatim
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignerError {
    /// The user declined the request in the wallet
    #[error("{0}")]
    Rejected(String),

    /// The account cannot pay the call fee
    #[error("{0}")]
    InsufficientBalance(String),

    /// The wallet could not build the call
    #[error("{0}")]
    Malformed(String),

    /// Any other wallet failure
    #[error("{0}")]
    Other(String),
}

/// A program call handed to the signer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRequest {
    pub program_id: String,
    pub function: String,
    /// Encoded scalar arguments, in program order
    pub inputs: Vec<String>,
    /// Fee budget in microcredits
    pub fee: u64,
    /// Pay the fee from a private record
    pub fee_private: bool,
}

/// Opaque handle returned by the signer for a submitted call
///
/// Either a ledger transaction id or a wallet-local token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionHandle(String);

impl SubmissionHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubmissionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// External signer
#[async_trait]
pub trait Signer: Send + Sync {
    /// Address of the connected account
    fn address(&self) -> String;

    /// Sign and submit a call, returning its handle
    async fn request_transaction(
        &self,
        request: CallRequest,
    ) -> Result<SubmissionHandle, SignerError>;
}
