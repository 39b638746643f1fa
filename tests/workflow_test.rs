//! End-to-end workflow tests against a mock wallet and mock ledger

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

use whistle_client::mock::{MockEndpoint, MockSigner};
use whistle_client::{
    ActivityKind, ClientConfig, DigestHashProvider, FileBackend, LocalLedgerStore, ReportStatus,
    Severity, SignerError, TrackerOutcome, TrackerState, WhistleClient,
};

fn client_in(dir: &TempDir, signer: MockSigner, endpoint: MockEndpoint) -> WhistleClient<MockSigner> {
    let config = ClientConfig {
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let store = Arc::new(LocalLedgerStore::new(FileBackend::new(dir.path())));
    WhistleClient::new(config, store, Arc::new(endpoint), signer, Box::new(DigestHashProvider))
}

#[tokio::test(start_paused = true)]
async fn test_register_report_and_review() {
    let dir = TempDir::new().unwrap();
    let endpoint = MockEndpoint::new().with_tx_answers([false, true]);
    let client = client_in(&dir, MockSigner::default(), endpoint);

    // Register
    let org = client.register_organization("Acme").await.unwrap();
    let orgs = client.store().list_organizations();
    assert_eq!(orgs.len(), 1);
    assert_eq!(orgs[0].org_id, org.subject);
    let activity = client.store().list_activity();
    assert_eq!(activity.len(), 1);
    assert_eq!(activity[0].message, "Organization \"Acme\" registered");

    // Second poll confirms
    let outcome = client.track(org.handle.clone(), CancellationToken::new()).await;
    assert_eq!(outcome, TrackerOutcome::Finished(TrackerState::Confirmed));
    assert_eq!(client.store().list_activity()[0].kind, ActivityKind::TxConfirmed);

    // Join and report
    let secret = client.generate_secret();
    client
        .join_organization(org.subject.as_str(), secret.as_str())
        .await
        .unwrap();
    assert_eq!(client.store().secret_for_org(&org.subject), Some(secret.clone()));

    let report = client
        .submit_report(
            org.subject.as_str(),
            secret.as_str(),
            "Invoices for Q3 were backdated",
            Severity::High,
        )
        .await
        .unwrap();
    let reports = client.store().list_reports();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].severity, Severity::High);
    assert_eq!(reports[0].status, ReportStatus::Open);
    assert_eq!(reports[0].excerpt, "Invoices for Q3 were backdated");

    // Review
    let before = client.store().list_activity().len();
    client
        .update_report_status(org.subject.as_str(), report.subject.as_str(), ReportStatus::Resolved)
        .await
        .unwrap();
    assert_eq!(client.store().list_reports()[0].status, ReportStatus::Resolved);
    let activity = client.store().list_activity();
    assert_eq!(activity.len(), before + 1);
    assert_eq!(activity[0].message, "Report status updated to Resolved");

    // Every call reached the wallet in order
    let functions: Vec<String> = client
        .signer()
        .requests()
        .into_iter()
        .map(|r| r.function)
        .collect();
    assert_eq!(
        functions,
        ["register_org", "join_org", "submit_report", "update_report_status"]
    );

    // The mirror survives a restart
    let reopened = LocalLedgerStore::new(FileBackend::new(dir.path()));
    assert_eq!(reopened.snapshot(), client.store().snapshot());
}

#[tokio::test]
async fn test_rejected_call_leaves_mirror_empty() {
    let dir = TempDir::new().unwrap();
    let signer = MockSigner::default().failing(SignerError::InsufficientBalance(
        "Insufficient balance for fee".into(),
    ));
    let client = client_in(&dir, signer, MockEndpoint::new());

    let err = client.register_organization("Acme").await.unwrap_err();
    assert_eq!(err.to_string(), "Insufficient balance for fee");

    let err = client
        .submit_report("1", "2", "content", Severity::Low)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Insufficient balance for fee");

    let snapshot = client.store().snapshot();
    assert!(snapshot.orgs.is_empty());
    assert!(snapshot.reports.is_empty());
    assert!(snapshot.activity.is_empty());
    assert!(!dir.path().join("zkwhistle_data.json").exists());
}

#[tokio::test(start_paused = true)]
async fn test_unconfirmed_submission_times_out() {
    let dir = TempDir::new().unwrap();
    let client = client_in(&dir, MockSigner::default(), MockEndpoint::new());

    let org = client.register_organization("Acme").await.unwrap();
    let started = tokio::time::Instant::now();
    let outcome = client.track(org.handle, CancellationToken::new()).await;

    assert_eq!(outcome, TrackerOutcome::Finished(TrackerState::TimedOut));
    // 40 attempts, 39 waits of 3s between them
    assert!(started.elapsed() >= Duration::from_secs(39 * 3));
    // The registration stays mirrored; only the tracking gave up
    assert_eq!(client.store().list_organizations().len(), 1);
    assert_eq!(client.store().list_activity()[0].kind, ActivityKind::TxTimedOut);
}

#[tokio::test(start_paused = true)]
async fn test_cancelled_tracker_records_nothing() {
    let dir = TempDir::new().unwrap();
    let cancel = CancellationToken::new();
    let endpoint = MockEndpoint::new()
        .with_tx_default(false)
        .cancel_during_call(2, cancel.clone());
    let client = client_in(&dir, MockSigner::default(), endpoint);

    let org = client.register_organization("Acme").await.unwrap();
    let outcome = client.spawn_tracker(org.handle, cancel).await.unwrap();

    assert_eq!(outcome, TrackerOutcome::Cancelled);
    assert_eq!(client.store().list_activity().len(), 1);
}
