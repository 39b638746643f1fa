//! Confirmation tracking for submitted calls
//!
//! The read endpoint has no subscriptions, so a submission is followed by
//! polling `transaction/{handle}` until it appears or the attempt ceiling is
//! reached:
//!
//! ```text
//! Pending ──success──▶ Confirmed
//!    │ └──max failures──▶ TimedOut
//!    └──wallet-local handle, after delay──▶ Sent
//! ```
//!
//! `TimedOut` only means the client stopped looking; the call may still
//! land. Cancellation is cooperative: the token is checked before every
//! transition and raced against every sleep, so a torn-down view never sees
//! a late transition.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::model::{ActivityEntry, ActivityKind};
use crate::read_client::ReadEndpoint;
use crate::signer::SubmissionHandle;
use crate::store::LocalLedgerStore;

/// Decides whether a handle is a wallet-local token rather than a ledger id
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LocalHandleRule {
    /// Local if the handle contains this substring
    Contains(String),
    /// Every handle is traceable
    Never,
}

impl LocalHandleRule {
    pub fn is_local(&self, handle: &str) -> bool {
        match self {
            LocalHandleRule::Contains(marker) => handle.contains(marker.as_str()),
            LocalHandleRule::Never => false,
        }
    }
}

impl Default for LocalHandleRule {
    // Wallets hand out UUIDs for calls they have not broadcast yet
    fn default() -> Self {
        Self::Contains("-".to_string())
    }
}

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub poll_interval: Duration,
    pub max_attempts: u32,
    pub local_delay: Duration,
    pub local_rule: LocalHandleRule,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(3),
            max_attempts: 40,
            local_delay: Duration::from_secs(2),
            local_rule: LocalHandleRule::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerState {
    Pending,
    /// Handed to the wallet; no further visibility
    Sent,
    Confirmed,
    TimedOut,
}

impl TrackerState {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TrackerState::Pending)
    }
}

/// How a tracking run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerOutcome {
    Finished(TrackerState),
    /// The owner went away before a terminal state
    Cancelled,
}

/// Follows one submission handle to a terminal state
pub struct ConfirmationTracker {
    handle: SubmissionHandle,
    config: TrackerConfig,
    state: TrackerState,
    attempts: u32,
    cancel: CancellationToken,
    store: Option<Arc<LocalLedgerStore>>,
}

impl ConfirmationTracker {
    pub fn new(handle: SubmissionHandle, config: TrackerConfig, cancel: CancellationToken) -> Self {
        Self {
            handle,
            config,
            state: TrackerState::Pending,
            attempts: 0,
            cancel,
            store: None,
        }
    }

    /// Record terminal outcomes in the local activity log
    pub fn with_store(mut self, store: Arc<LocalLedgerStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn handle(&self) -> &SubmissionHandle {
        &self.handle
    }

    pub fn state(&self) -> TrackerState {
        self.state
    }

    /// Failed polls so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_local(&self) -> bool {
        self.config.local_rule.is_local(self.handle.as_str())
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Apply one poll result
    ///
    /// No-op once terminal or cancelled.
    pub fn observe(&mut self, confirmed: bool) -> TrackerState {
        if self.state.is_terminal() || self.is_cancelled() {
            return self.state;
        }

        if confirmed {
            return self.transition(TrackerState::Confirmed);
        }

        self.attempts += 1;
        debug!(
            handle = %self.handle,
            attempt = self.attempts,
            max = self.config.max_attempts,
            "Transaction not yet visible"
        );
        if self.attempts >= self.config.max_attempts {
            return self.transition(TrackerState::TimedOut);
        }
        self.state
    }

    /// Mark a wallet-local handle as handed off
    ///
    /// No-op once terminal or cancelled.
    pub fn mark_sent(&mut self) -> TrackerState {
        if self.state.is_terminal() || self.is_cancelled() {
            return self.state;
        }
        self.transition(TrackerState::Sent)
    }

    /// Drive the tracker to a terminal state or until cancelled
    ///
    /// The first poll is immediate; later polls wait `poll_interval`.
    pub async fn run(&mut self, endpoint: &dyn ReadEndpoint) -> TrackerOutcome {
        if self.state.is_terminal() {
            return TrackerOutcome::Finished(self.state);
        }

        if self.is_local() {
            debug!(handle = %self.handle, "Wallet-local handle, not polling");
            if !self.wait(self.config.local_delay).await {
                return self.cancelled();
            }
            return match self.mark_sent() {
                TrackerState::Pending => self.cancelled(),
                state => TrackerOutcome::Finished(state),
            };
        }

        loop {
            if self.is_cancelled() {
                return self.cancelled();
            }

            let visible = endpoint.transaction_exists(self.handle.as_str()).await;
            let state = self.observe(visible);
            if state.is_terminal() {
                return TrackerOutcome::Finished(state);
            }
            if self.is_cancelled() {
                return self.cancelled();
            }

            if !self.wait(self.config.poll_interval).await {
                return self.cancelled();
            }
        }
    }

    /// Run on a background task
    pub fn spawn(mut self, endpoint: Arc<dyn ReadEndpoint>) -> JoinHandle<TrackerOutcome> {
        tokio::spawn(async move { self.run(endpoint.as_ref()).await })
    }

    /// Sleep unless cancelled first; `false` means cancelled
    async fn wait(&self, duration: Duration) -> bool {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(duration) => true,
        }
    }

    fn cancelled(&self) -> TrackerOutcome {
        debug!(handle = %self.handle, attempts = self.attempts, "Tracking cancelled");
        TrackerOutcome::Cancelled
    }

    fn transition(&mut self, next: TrackerState) -> TrackerState {
        self.state = next;
        match next {
            TrackerState::Confirmed => {
                info!(handle = %self.handle, attempts = self.attempts, "Transaction confirmed");
                self.record(ActivityKind::TxConfirmed, "Transaction confirmed on chain");
            }
            TrackerState::TimedOut => {
                warn!(
                    handle = %self.handle,
                    attempts = self.attempts,
                    "Gave up waiting for confirmation"
                );
                self.record(
                    ActivityKind::TxTimedOut,
                    "Confirmation not seen yet, check the explorer",
                );
            }
            TrackerState::Sent => info!(handle = %self.handle, "Transaction handed to wallet"),
            TrackerState::Pending => {}
        }
        next
    }

    fn record(&self, kind: ActivityKind, message: &str) {
        if let Some(store) = &self.store {
            store.append_activity(ActivityEntry::new(
                kind,
                message,
                Some(self.handle.to_string()),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockEndpoint;

    fn config(max_attempts: u32) -> TrackerConfig {
        TrackerConfig {
            max_attempts,
            ..Default::default()
        }
    }

    fn tracker(handle: &str, max_attempts: u32) -> ConfirmationTracker {
        ConfirmationTracker::new(
            SubmissionHandle::new(handle),
            config(max_attempts),
            CancellationToken::new(),
        )
    }

    #[test]
    fn test_first_success_confirms() {
        let mut t = tracker("at1abc", 3);
        assert_eq!(t.observe(true), TrackerState::Confirmed);
        assert_eq!(t.attempts(), 0);
    }

    #[test]
    fn test_times_out_after_exactly_max_failures() {
        let mut t = tracker("at1abc", 3);
        assert_eq!(t.observe(false), TrackerState::Pending);
        assert_eq!(t.observe(false), TrackerState::Pending);
        assert_eq!(t.observe(false), TrackerState::TimedOut);
        assert_eq!(t.attempts(), 3);

        // Terminal states are sticky
        assert_eq!(t.observe(true), TrackerState::TimedOut);
    }

    #[test]
    fn test_cancel_suppresses_transitions() {
        let token = CancellationToken::new();
        let mut t = ConfirmationTracker::new(SubmissionHandle::new("at1abc"), config(1), token.clone());
        token.cancel();
        assert_eq!(t.observe(true), TrackerState::Pending);
        assert_eq!(t.observe(false), TrackerState::Pending);
        assert_eq!(t.mark_sent(), TrackerState::Pending);
        assert_eq!(t.attempts(), 0);
    }

    #[test]
    fn test_local_handle_rule() {
        assert!(tracker("4b1e6c1a-22d3-4e55-9a10-0c4e2f0d1b77", 1).is_local());
        assert!(!tracker("at1qqqqqq", 1).is_local());
        assert!(!LocalHandleRule::Never.is_local("a-b"));
        assert!(LocalHandleRule::Contains("local:".into()).is_local("local:7"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_confirms_after_failures() {
        let endpoint = MockEndpoint::new().with_tx_answers([false, false, true]);
        let mut t = tracker("at1abc", 40);
        let started = tokio::time::Instant::now();

        let outcome = t.run(&endpoint).await;
        assert_eq!(outcome, TrackerOutcome::Finished(TrackerState::Confirmed));
        assert_eq!(endpoint.tx_calls(), 3);
        // Immediate first poll, then two intervals
        assert!(started.elapsed() >= Duration::from_secs(6));
        assert!(started.elapsed() < Duration::from_secs(9));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_times_out_at_ceiling() {
        let endpoint = MockEndpoint::new();
        let mut t = tracker("at1abc", 5);

        let outcome = t.run(&endpoint).await;
        assert_eq!(outcome, TrackerOutcome::Finished(TrackerState::TimedOut));
        assert_eq!(endpoint.tx_calls(), 5);
        assert_eq!(t.attempts(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_local_handle_is_sent_without_polling() {
        let endpoint = MockEndpoint::new().with_tx_default(true);
        let mut t = tracker("wallet-local-token", 5);
        let started = tokio::time::Instant::now();

        let outcome = t.run(&endpoint).await;
        assert_eq!(outcome, TrackerOutcome::Finished(TrackerState::Sent));
        assert_eq!(endpoint.tx_calls(), 0);
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_backoff_stops_polling() {
        let endpoint = Arc::new(MockEndpoint::new());
        let token = CancellationToken::new();
        let t = ConfirmationTracker::new(SubmissionHandle::new("at1abc"), config(40), token.clone());

        let task = t.spawn(endpoint.clone());
        tokio::time::sleep(Duration::from_millis(4500)).await;
        token.cancel();

        assert_eq!(task.await.unwrap(), TrackerOutcome::Cancelled);
        assert_eq!(endpoint.tx_calls(), 2);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(endpoint.tx_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_while_poll_in_flight_drops_its_result() {
        let token = CancellationToken::new();
        let endpoint = MockEndpoint::new()
            .with_tx_default(true)
            .cancel_during_call(1, token.clone());
        let mut t = ConfirmationTracker::new(SubmissionHandle::new("at1abc"), config(40), token);

        assert_eq!(t.run(&endpoint).await, TrackerOutcome::Cancelled);
        assert_eq!(t.state(), TrackerState::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_before_local_delay_elapses() {
        let token = CancellationToken::new();
        let t = ConfirmationTracker::new(SubmissionHandle::new("a-b"), config(1), token.clone());
        let task = t.spawn(Arc::new(MockEndpoint::new()));

        tokio::time::sleep(Duration::from_millis(500)).await;
        token.cancel();
        assert_eq!(task.await.unwrap(), TrackerOutcome::Cancelled);
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminal_states_reach_activity_log() {
        let store = Arc::new(LocalLedgerStore::in_memory());

        let mut confirmed = tracker("at1ok", 3).with_store(store.clone());
        confirmed.run(&MockEndpoint::new().with_tx_default(true)).await;

        let mut timed_out = tracker("at1slow", 2).with_store(store.clone());
        timed_out.run(&MockEndpoint::new()).await;

        let mut sent = tracker("x-y", 2).with_store(store.clone());
        sent.run(&MockEndpoint::new()).await;

        let activity = store.list_activity();
        assert_eq!(activity.len(), 2);
        assert_eq!(activity[0].kind, ActivityKind::TxTimedOut);
        assert_eq!(activity[0].ref_id.as_deref(), Some("at1slow"));
        assert_eq!(activity[1].kind, ActivityKind::TxConfirmed);
    }
}
