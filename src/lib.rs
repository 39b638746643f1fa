//! Whistle client - anonymous reporting over a privacy-preserving ledger
//!
//! Client-side layer for the `zkwhistle` program: organizations register,
//! members join with a secret, and members file reports that reveal neither
//! their identity nor their plaintext.
//!
//! # Architecture
//!
//! - **codec / wire**: typed scalars in, loosely formatted mapping bodies out
//! - **signer**: the external wallet that signs and broadcasts calls
//! - **read_client**: HTTP queries against the public ledger
//! - **store**: optimistic local mirror of what this user submitted
//! - **tracker**: polls a submission until it lands or the client gives up
//! - **service**: the workflows tying these together
//!
//! The ledger is the authority. The local mirror is only a cache and may
//! disagree with it until confirmation.
//!
//! # Example
//!
//! ```rust,ignore
//! use whistle_client::{ClientConfig, Severity, WhistleClient};
//! use tokio_util::sync::CancellationToken;
//!
//! let client = WhistleClient::connect(ClientConfig::default(), wallet)?;
//!
//! let org = client.register_organization("Acme").await?;
//! client.spawn_tracker(org.handle.clone(), CancellationToken::new());
//!
//! let secret = client.generate_secret();
//! client.join_organization(org.subject.as_str(), secret.as_str()).await?;
//! client
//!     .submit_report(org.subject.as_str(), secret.as_str(), "Ledger fraud in Q3", Severity::High)
//!     .await?;
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod hash;
pub mod model;
pub mod read_client;
pub mod service;
pub mod signer;
pub mod store;
pub mod tracker;
pub mod wire;

// Mock collaborators for tests and local tooling
pub mod mock;

pub use codec::{decode_text, encode_text, normalize_scalar, ScalarKind, ScalarValue};
pub use config::{ClientConfig, FeeConfig, HashProviderConfig};
pub use error::{ClientError, Result};
pub use hash::{DigestHashProvider, HashProvider, RemoteHashProvider};
pub use model::{
    ActivityEntry, ActivityKind, Member, Organization, Report, ReportStatus, Severity,
};
pub use read_client::{LedgerReadClient, ReadEndpoint};
pub use service::{DashboardStats, Submission, WhistleClient};
pub use signer::{CallRequest, Signer, SignerError, SubmissionHandle};
pub use store::{FileBackend, LocalLedgerStore, MemoryBackend, StorageBackend};
pub use tracker::{ConfirmationTracker, TrackerOutcome, TrackerState};
pub use wire::{parse_mapping_response, StructValue, WireValue};
