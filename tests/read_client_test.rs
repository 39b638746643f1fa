//! HTTP read client against a mock ledger endpoint

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use whistle_client::{normalize_scalar, ClientConfig, LedgerReadClient, ReadEndpoint, ScalarKind};

const PROGRAM: &str = "zkwhistle_kumar_v1.aleo";

fn client_for(server: &MockServer) -> LedgerReadClient {
    let config = ClientConfig {
        api_base: format!("{}/v1/testnet/", server.uri()),
        ..Default::default()
    };
    LedgerReadClient::new(&config).unwrap()
}

fn mapping_path(mapping: &str, key: &str) -> String {
    format!("/v1/testnet/program/{PROGRAM}/mapping/{mapping}/{key}")
}

#[tokio::test]
async fn test_struct_mapping_is_parsed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(mapping_path("organizations", "7field")))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#""{\n  admin: aleo1qyqsz,\n  name_hash: 1097035109field,\n  active: true\n}""#,
        ))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let org = client
        .organization(&normalize_scalar("7", ScalarKind::Field))
        .await
        .unwrap();
    assert_eq!(org.get("admin"), Some("aleo1qyqsz"));
    assert_eq!(org.get("name_hash"), Some("1097035109field"));
    assert_eq!(org.get("active"), Some("true"));
}

#[tokio::test]
async fn test_missing_values_read_as_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let id = normalize_scalar("8", ScalarKind::Field);
    assert_eq!(client.fetch_mapping_raw("reports", "8field").await, None);
    assert_eq!(client.report(&id).await, None);
    assert!(!client.is_member(&id).await);
    assert_eq!(client.org_count().await, 0);
    assert_eq!(client.fetch_latest_height().await, 0);
    assert!(!client.transaction_exists("at1abc").await);
}

#[tokio::test]
async fn test_null_body_reads_as_absent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(mapping_path("reports", "8field")))
        .respond_with(ResponseTemplate::new(200).set_body_string("null"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(
        client.report(&normalize_scalar("8", ScalarKind::Field)).await,
        None
    );
}

#[tokio::test]
async fn test_counters_height_and_membership() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(mapping_path("org_count", "0u8")))
        .respond_with(ResponseTemplate::new(200).set_body_string("\"12u64\""))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(mapping_path("total_reports", "0u8")))
        .respond_with(ResponseTemplate::new(200).set_body_string("\"5u64\""))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(mapping_path("members", "99field")))
        .respond_with(ResponseTemplate::new(200).set_body_string("\"true\""))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/testnet/latest/height"))
        .respond_with(ResponseTemplate::new(200).set_body_string("4242"))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/testnet/transaction/at1seen"))
        .respond_with(ResponseTemplate::new(200).set_body_string("{}"))
        .mount(&server)
        .await;

    let client = client_for(&server);
    assert_eq!(client.org_count().await, 12);
    assert_eq!(client.total_reports().await, 5);
    assert_eq!(client.fetch_latest_height().await, 4242);
    assert!(client.is_member(&normalize_scalar("99", ScalarKind::Field)).await);
    assert!(client.transaction_exists("at1seen").await);
    assert!(!client.transaction_exists("at1unseen").await);
}

#[tokio::test]
async fn test_unreachable_endpoint_yields_sentinels() {
    // Nothing listens on the discard port
    let config = ClientConfig {
        api_base: "http://127.0.0.1:9".into(),
        request_timeout_secs: 2,
        ..Default::default()
    };
    let client = LedgerReadClient::new(&config).unwrap();

    assert_eq!(client.fetch_mapping_raw("organizations", "1field").await, None);
    assert_eq!(client.fetch_latest_height().await, 0);
    assert_eq!(client.total_reports().await, 0);
    assert!(!client.transaction_exists("at1abc").await);
}
