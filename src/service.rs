//! Program workflows
//!
//! Each state-changing workflow follows the same path: validate inputs,
//! encode them, hand the call to the signer, then mirror the result
//! locally. The mirror is written before any confirmation tracking starts,
//! so a submitted call is never lost from the local view.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::codec::{
    encode_text, excerpt, normalize_scalar, truncate_utf8, ScalarKind, ScalarValue,
    EXCERPT_MAX_CHARS, ORG_NAME_MAX_BYTES, REPORT_CONTENT_MAX_BYTES,
};
use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::hash::{self, HashProvider};
use crate::model::{now_ms, Member, Organization, Report, ReportStatus, Severity};
use crate::read_client::{LedgerReadClient, ReadEndpoint};
use crate::signer::{CallRequest, Signer, SubmissionHandle};
use crate::store::{FileBackend, LocalLedgerStore};
use crate::tracker::{ConfirmationTracker, TrackerOutcome};
use crate::wire::StructValue;

/// Program function names
pub mod functions {
    pub const REGISTER_ORG: &str = "register_org";
    pub const JOIN_ORG: &str = "join_org";
    pub const ADD_MEMBER: &str = "add_member";
    pub const SUBMIT_REPORT: &str = "submit_report";
    pub const UPDATE_REPORT_STATUS: &str = "update_report_status";
}

/// Upper bound (exclusive) for locally generated organization and report ids
const ID_BOUND: u64 = 1_000_000_000;

/// Upper bound (exclusive) for generated secrets
const SECRET_BOUND: u64 = 1 << 53;

/// Result of a submitted call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub handle: SubmissionHandle,
    /// Primary id the call acted on (new org id, new report id, member hash...)
    pub subject: ScalarValue,
}

/// Network-wide counters shown on the dashboard
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub org_count: u64,
    pub total_reports: u64,
    pub block_height: u64,
}

impl DashboardStats {
    /// Fetch all counters concurrently; unreachable values read as 0
    pub async fn fetch(reader: &dyn ReadEndpoint) -> Self {
        let (org_count, total_reports, block_height) = tokio::join!(
            reader.org_count(),
            reader.total_reports(),
            reader.fetch_latest_height()
        );
        Self {
            org_count,
            total_reports,
            block_height,
        }
    }
}

/// Client for the reporting program
///
/// # Example
///
/// ```rust,ignore
/// use whistle_client::{ClientConfig, WhistleClient};
///
/// let client = WhistleClient::connect(ClientConfig::default(), my_wallet)?;
/// let submission = client.register_organization("Acme").await?;
/// let outcome = client.track(submission.handle, CancellationToken::new()).await;
/// ```
pub struct WhistleClient<S: Signer> {
    config: ClientConfig,
    store: Arc<LocalLedgerStore>,
    reader: Arc<dyn ReadEndpoint>,
    signer: S,
    hasher: Box<dyn HashProvider>,
}

impl<S: Signer> WhistleClient<S> {
    /// Assemble a client from explicit collaborators
    pub fn new(
        config: ClientConfig,
        store: Arc<LocalLedgerStore>,
        reader: Arc<dyn ReadEndpoint>,
        signer: S,
        hasher: Box<dyn HashProvider>,
    ) -> Self {
        Self {
            config,
            store,
            reader,
            signer,
            hasher,
        }
    }

    /// Client with the HTTP read endpoint, a file-backed mirror in
    /// `config.data_dir` and the configured hash provider
    pub fn connect(config: ClientConfig, signer: S) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(LocalLedgerStore::new(FileBackend::new(&config.data_dir)));
        let reader: Arc<dyn ReadEndpoint> = Arc::new(LedgerReadClient::new(&config)?);
        let hasher = hash::from_config(&config)?;
        info!(
            program = %config.program_id,
            api = %config.api_base(),
            hasher = hasher.name(),
            "Whistle client ready"
        );
        Ok(Self::new(config, store, reader, signer, hasher))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<LocalLedgerStore> {
        &self.store
    }

    pub fn reader(&self) -> &Arc<dyn ReadEndpoint> {
        &self.reader
    }

    pub fn signer(&self) -> &S {
        &self.signer
    }

    // ==================== Submissions ====================

    /// Register a new organization administered by the signer's account
    ///
    /// Only the encoding of the name goes on chain.
    pub async fn register_organization(&self, name: &str) -> Result<Submission> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::missing("Enter an organization name."));
        }
        let name = truncate_utf8(name, ORG_NAME_MAX_BYTES);

        let org_id = draw_unused(
            || random_field(ID_BOUND),
            |id| self.store.has_organization(id),
        );
        let name_hash = encode_text(name, ORG_NAME_MAX_BYTES);
        let handle = self
            .submit(
                functions::REGISTER_ORG,
                vec![org_id.to_string(), name_hash.to_string()],
                self.config.fees.call,
            )
            .await?;

        let mirrored = self.store.insert_organization(Organization {
            org_id: org_id.clone(),
            name: name.to_string(),
            admin_address: self.signer.address(),
            tx_id: handle.to_string(),
            created_at: now_ms(),
        });
        if !mirrored {
            warn!(org_id = %org_id, handle = %handle, "Registration submitted but not mirrored");
        }

        Ok(Submission {
            handle,
            subject: org_id,
        })
    }

    /// Join an organization; the program hashes the secret on chain
    pub async fn join_organization(&self, org_id: &str, secret: &str) -> Result<Submission> {
        let org_id = field_input(org_id, "Select or enter Organization ID.")?;
        let secret = field_input(secret, "Generate or enter a secret.")?;

        let handle = self
            .submit(
                functions::JOIN_ORG,
                vec![org_id.to_string(), secret.to_string()],
                self.config.fees.call,
            )
            .await?;

        self.store.insert_member(Member {
            org_id: Some(org_id.clone()),
            member_hash: None,
            secret: Some(secret),
            tx_id: Some(handle.to_string()),
            created_at: now_ms(),
        });

        Ok(Submission {
            handle,
            subject: org_id,
        })
    }

    /// Admin path: add a member by an already computed hash
    pub async fn add_member_by_hash(&self, org_id: &str, member_hash: &str) -> Result<Submission> {
        let org_id = field_input(org_id, "Select or enter Organization ID.")?;
        let member_hash = field_input(member_hash, "Enter member hash.")?;

        let handle = self
            .submit(
                functions::ADD_MEMBER,
                vec![org_id.to_string(), member_hash.to_string()],
                self.config.fees.call,
            )
            .await?;

        self.store.insert_member(Member {
            org_id: Some(org_id),
            member_hash: Some(member_hash.clone()),
            secret: None,
            tx_id: Some(handle.to_string()),
            created_at: now_ms(),
        });

        Ok(Submission {
            handle,
            subject: member_hash,
        })
    }

    /// Compute the membership hash of a secret and remember the pair locally
    pub async fn compute_member_hash(&self, secret: &str) -> Result<ScalarValue> {
        let secret = field_input(secret, "Generate or enter a secret.")?;
        let hash = self.hasher.membership_hash(&secret).await?;
        debug!(provider = self.hasher.name(), "Membership hash computed");
        self.store.attach_secret_to_member(&hash, &secret);
        Ok(hash)
    }

    /// Submit an anonymous report
    ///
    /// The content is committed as a bounded encoding; the local mirror keeps
    /// a short excerpt for display.
    pub async fn submit_report(
        &self,
        org_id: &str,
        secret: &str,
        content: &str,
        severity: Severity,
    ) -> Result<Submission> {
        let org_id = field_input(org_id, "Select or enter Organization ID.")?;
        let secret = field_input(secret, "Enter your private secret.")?;
        let content = content.trim();
        if content.is_empty() {
            return Err(ClientError::missing("Enter report content."));
        }

        let report_id = draw_unused(
            || random_field(ID_BOUND),
            |id| self.store.has_report(id),
        );
        let content_hash = encode_text(content, REPORT_CONTENT_MAX_BYTES);
        let severity_arg = ScalarValue::from_u64(severity.ordinal().into(), ScalarKind::U8);

        let handle = self
            .submit(
                functions::SUBMIT_REPORT,
                vec![
                    org_id.to_string(),
                    secret.to_string(),
                    report_id.to_string(),
                    content_hash.to_string(),
                    severity_arg.to_string(),
                ],
                self.config.fees.report,
            )
            .await?;

        let mirrored = self.store.insert_report(Report {
            report_id: report_id.clone(),
            org_id,
            severity,
            excerpt: excerpt(content, EXCERPT_MAX_CHARS),
            tx_id: handle.to_string(),
            status: ReportStatus::Open,
            created_at: now_ms(),
        });
        if !mirrored {
            warn!(report_id = %report_id, handle = %handle, "Report submitted but not mirrored");
        }

        Ok(Submission {
            handle,
            subject: report_id,
        })
    }

    /// Admin path: change a report's review status
    ///
    /// The mirrored status is only a cache; re-read the report from the
    /// ledger before relying on it.
    pub async fn update_report_status(
        &self,
        org_id: &str,
        report_id: &str,
        status: ReportStatus,
    ) -> Result<Submission> {
        let report_id = field_input(report_id, "Enter Report ID.")?;
        let org_id = field_input(org_id, "Enter Org ID.")?;
        let status_arg = ScalarValue::from_u64(status.ordinal().into(), ScalarKind::U8);

        let handle = self
            .submit(
                functions::UPDATE_REPORT_STATUS,
                vec![
                    org_id.to_string(),
                    report_id.to_string(),
                    status_arg.to_string(),
                ],
                self.config.fees.call,
            )
            .await?;

        self.store.update_report_status(&report_id, status);

        Ok(Submission {
            handle,
            subject: report_id,
        })
    }

    /// Fresh member secret
    pub fn generate_secret(&self) -> ScalarValue {
        random_field(SECRET_BOUND)
    }

    // ==================== Confirmation ====================

    /// Tracker for a handle, recording its outcome in the mirror
    pub fn tracker(&self, handle: SubmissionHandle, cancel: CancellationToken) -> ConfirmationTracker {
        ConfirmationTracker::new(handle, self.config.tracker_config(), cancel)
            .with_store(self.store.clone())
    }

    /// Follow a handle to a terminal state on the current task
    pub async fn track(&self, handle: SubmissionHandle, cancel: CancellationToken) -> TrackerOutcome {
        self.tracker(handle, cancel).run(self.reader.as_ref()).await
    }

    /// Follow a handle on a background task
    pub fn spawn_tracker(
        &self,
        handle: SubmissionHandle,
        cancel: CancellationToken,
    ) -> JoinHandle<TrackerOutcome> {
        self.tracker(handle, cancel).spawn(self.reader.clone())
    }

    // ==================== Lookups ====================

    /// Authoritative organization record, `None` if not on chain
    pub async fn lookup_organization(&self, org_id: &str) -> Result<Option<StructValue>> {
        let org_id = field_input(org_id, "Enter an ID to search.")?;
        Ok(self.reader.organization(&org_id).await)
    }

    /// Authoritative report record, `None` if not on chain
    pub async fn lookup_report(&self, report_id: &str) -> Result<Option<StructValue>> {
        let report_id = field_input(report_id, "Enter an ID to search.")?;
        Ok(self.reader.report(&report_id).await)
    }

    /// Whether a membership hash is registered on chain
    pub async fn check_member(&self, member_hash: &str) -> Result<bool> {
        let member_hash = field_input(member_hash, "Enter an ID to search.")?;
        Ok(self.reader.is_member(&member_hash).await)
    }

    pub async fn dashboard_stats(&self) -> DashboardStats {
        DashboardStats::fetch(self.reader.as_ref()).await
    }

    /// Refresh dashboard counters every `period` until cancelled
    ///
    /// The first refresh happens immediately. Pass
    /// [`ClientConfig::dashboard_refresh`] for the configured cadence.
    pub fn spawn_dashboard_refresh(
        &self,
        period: Duration,
        cancel: CancellationToken,
    ) -> (watch::Receiver<DashboardStats>, JoinHandle<()>) {
        let (tx, rx) = watch::channel(DashboardStats::default());
        let reader = self.reader.clone();

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period.max(Duration::from_millis(1)));
            loop {
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                let stats = DashboardStats::fetch(reader.as_ref()).await;
                if cancel.is_cancelled() {
                    break;
                }
                if tx.send(stats).is_err() {
                    debug!("Dashboard receiver dropped, stopping refresh");
                    break;
                }
            }
        });

        (rx, task)
    }

    // ==================== Internals ====================

    async fn submit(
        &self,
        function: &str,
        inputs: Vec<String>,
        fee: u64,
    ) -> Result<SubmissionHandle> {
        let request = CallRequest {
            program_id: self.config.program_id.clone(),
            function: function.to_string(),
            inputs,
            fee,
            fee_private: self.config.fees.private,
        };

        match self.signer.request_transaction(request).await {
            Ok(handle) => {
                info!(function, handle = %handle, "Call submitted");
                Ok(handle)
            }
            Err(e) => {
                warn!(function, error = %e, "Signer refused call");
                Err(e.into())
            }
        }
    }
}

/// Required numeric field input, suffixed if the user left it off
fn field_input(input: &str, missing: &str) -> Result<ScalarValue> {
    if input.trim().is_empty() {
        return Err(ClientError::missing(missing));
    }
    let normalized = normalize_scalar(input, ScalarKind::Field);
    ScalarValue::parse(normalized.as_str())
        .filter(|v| v.kind() == ScalarKind::Field)
        .ok_or_else(|| {
            ClientError::Validation(format!("{} is not a field value", input.trim()))
        })
}

/// Draw until the id is not already mirrored
fn draw_unused(
    mut draw: impl FnMut() -> ScalarValue,
    taken: impl Fn(&ScalarValue) -> bool,
) -> ScalarValue {
    loop {
        let candidate = draw();
        if !taken(&candidate) {
            return candidate;
        }
    }
}

fn random_field(bound: u64) -> ScalarValue {
    let value = rand::thread_rng().gen_range(0..bound);
    ScalarValue::from_u64(value, ScalarKind::Field)
}
