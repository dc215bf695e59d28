//! End-to-end connector tests against a mock Graph API.
//!
//! These tests stand up a local mock of the identity and Graph endpoints
//! and drive the full token -> paginate -> project -> emit pipeline.

use pretty_assertions::assert_eq;
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use graph_mail_connector::connector::{ConnectorError, ControlSignal, FetchOutcome};
use graph_mail_connector::domain::{CellValue, IncludedColumns, MessageId, Row};
use graph_mail_connector::{ConnectorConfig, GraphMailConnector, MailSource};

const MAILBOX: &str = "inbox@example.com";
const SENDER: &str = "sender@example.com";

fn init_tracing() {
    static INIT: std::sync::Once = std::sync::Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

fn test_config() -> ConnectorConfig {
    ConnectorConfig::from_parameters(&[
        ("TenantId".to_string(), "tenant-1".to_string()),
        ("ClientId".to_string(), "client-1".to_string()),
        ("ClientSecret".to_string(), "s3cr3t".to_string()),
        ("UserPrincipalName".to_string(), MAILBOX.to_string()),
        ("SenderEmail".to_string(), SENDER.to_string()),
    ])
    .expect("test parameters are complete")
}

fn connector(server: &MockServer) -> GraphMailConnector {
    init_tracing();
    GraphMailConnector::with_endpoints(
        test_config(),
        format!("{}/token", server.uri()),
        format!("{}/v1.0", server.uri()),
    )
}

fn messages_path() -> String {
    format!("/v1.0/users/{}/messages", MAILBOX)
}

/// Mounts a token endpoint issuing `test-token` with the given lifetime.
async fn mount_token(server: &MockServer, expires_in: u64, expected_requests: u64) {
    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=client_credentials"))
        .and(body_string_contains("client_id=client-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token_type": "Bearer",
            "expires_in": expires_in,
            "access_token": "test-token",
        })))
        .expect(expected_requests)
        .mount(server)
        .await;
}

// Two linked pages emit the concatenation of their records, in server
// order, with no gaps or duplicates.
#[tokio::test]
async fn fetch_follows_cursor_across_pages() {
    let server = MockServer::start().await;
    mount_token(&server, 3600, 1).await;

    Mock::given(method("GET"))
        .and(path(messages_path()))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"id": "1", "subject": "Hi"}],
            "@odata.nextLink": format!("{}/v1.0/next-page", server.uri()),
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1.0/next-page"))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"id": "2", "subject": "Bye"}],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let connector = connector(&server);
    let included = IncludedColumns::all(connector.schema());

    let mut collected: Vec<Row> = Vec::new();
    let mut sink = |row: Row| {
        collected.push(row);
        ControlSignal::Continue
    };
    let outcome = connector.fetch_rows(&included, &mut sink).await.unwrap();

    assert_eq!(outcome, FetchOutcome::Completed { rows: 2 });
    let ids: Vec<&str> = collected.iter().map(|r| r.identifier.0.as_str()).collect();
    assert_eq!(ids, vec!["1", "2"]);
    assert_eq!(
        collected[0].get("subject"),
        Some(&CellValue::Text("Hi".to_string()))
    );
    assert_eq!(
        collected[1].get("subject"),
        Some(&CellValue::Text("Bye".to_string()))
    );
}

// An abort signal returned mid-page stops emission immediately and no
// further HTTP requests are issued.
#[tokio::test]
async fn abort_stops_mid_page_and_skips_next_pages() {
    let server = MockServer::start().await;
    mount_token(&server, 3600, 1).await;

    Mock::given(method("GET"))
        .and(path(messages_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [
                {"id": "1", "subject": "a"},
                {"id": "2", "subject": "b"},
                {"id": "3", "subject": "c"},
            ],
            "@odata.nextLink": format!("{}/v1.0/next-page", server.uri()),
        })))
        .expect(1)
        .mount(&server)
        .await;

    // The cursor must never be followed after an abort.
    Mock::given(method("GET"))
        .and(path("/v1.0/next-page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .expect(0)
        .mount(&server)
        .await;

    let connector = connector(&server);
    let included = IncludedColumns::all(connector.schema());

    let mut emitted: Vec<MessageId> = Vec::new();
    let mut sink = |row: Row| {
        emitted.push(row.identifier.clone());
        if emitted.len() == 2 {
            ControlSignal::Abort
        } else {
            ControlSignal::Continue
        }
    };

    let outcome = connector.fetch_rows(&included, &mut sink).await.unwrap();

    assert_eq!(outcome, FetchOutcome::Aborted { rows: 2 });
    assert_eq!(emitted, vec![MessageId::from("1"), MessageId::from("2")]);
}

// A token still inside its validity window is reused across operations.
#[tokio::test]
async fn token_is_reused_within_validity_window() {
    let server = MockServer::start().await;
    mount_token(&server, 3600, 1).await;

    Mock::given(method("GET"))
        .and(path(messages_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .expect(2)
        .mount(&server)
        .await;

    let connector = connector(&server);
    let included = IncludedColumns::all(connector.schema());

    for _ in 0..2 {
        let mut sink = |_row: Row| ControlSignal::Continue;
        connector.fetch_rows(&included, &mut sink).await.unwrap();
    }
}

// An expired token triggers a second token request on the next use.
#[tokio::test]
async fn expired_token_is_refreshed() {
    let server = MockServer::start().await;
    // expires_in equal to the safety margin leaves a zero lifetime, so the
    // token is already expired on the next use.
    mount_token(&server, 30, 2).await;

    Mock::given(method("GET"))
        .and(path(messages_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .expect(2)
        .mount(&server)
        .await;

    let connector = connector(&server);
    let included = IncludedColumns::all(connector.schema());

    for _ in 0..2 {
        let mut sink = |_row: Row| ControlSignal::Continue;
        connector.fetch_rows(&included, &mut sink).await.unwrap();
    }
}

// An empty result set terminates normally with zero rows.
#[tokio::test]
async fn empty_result_set_is_not_an_error() {
    let server = MockServer::start().await;
    mount_token(&server, 3600, 1).await;

    Mock::given(method("GET"))
        .and(path(messages_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .expect(1)
        .mount(&server)
        .await;

    let connector = connector(&server);
    let included = IncludedColumns::all(connector.schema());

    let mut collected: Vec<Row> = Vec::new();
    let mut sink = |row: Row| {
        collected.push(row);
        ControlSignal::Continue
    };
    let outcome = connector.fetch_rows(&included, &mut sink).await.unwrap();

    assert_eq!(outcome, FetchOutcome::Completed { rows: 0 });
    assert!(collected.is_empty());
}

// A page without a `value` field is an empty page; its cursor is still
// followed.
#[tokio::test]
async fn page_without_value_continues_pagination() {
    let server = MockServer::start().await;
    mount_token(&server, 3600, 1).await;

    Mock::given(method("GET"))
        .and(path(messages_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "@odata.nextLink": format!("{}/v1.0/next-page", server.uri()),
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1.0/next-page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"id": "7", "subject": "late"}],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let connector = connector(&server);
    let included = IncludedColumns::all(connector.schema());

    let mut collected: Vec<Row> = Vec::new();
    let mut sink = |row: Row| {
        collected.push(row);
        ControlSignal::Continue
    };
    let outcome = connector.fetch_rows(&included, &mut sink).await.unwrap();

    assert_eq!(outcome, FetchOutcome::Completed { rows: 1 });
    assert_eq!(collected[0].identifier, MessageId::from("7"));
}

// A rejected token request fails the operation before any list request is
// issued, and never leaks the client secret.
#[tokio::test]
async fn rejected_token_request_fails_before_listing() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_string(r#"{"error":"invalid_client","secret_echo":"s3cr3t"}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(messages_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"value": []})))
        .expect(0)
        .mount(&server)
        .await;

    let connector = connector(&server);
    let included = IncludedColumns::all(connector.schema());

    let mut sink = |_row: Row| ControlSignal::Continue;
    let err = connector
        .fetch_rows(&included, &mut sink)
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectorError::Authentication(_)));
    let message = err.to_string();
    assert!(!message.contains("s3cr3t"));
    assert!(message.contains("[redacted]"));
}

// A page body that is not JSON fails the operation; rows already emitted
// from earlier pages stay emitted.
#[tokio::test]
async fn malformed_page_is_a_fetch_error() {
    let server = MockServer::start().await;
    mount_token(&server, 3600, 1).await;

    Mock::given(method("GET"))
        .and(path(messages_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{"id": "1", "subject": "ok"}],
            "@odata.nextLink": format!("{}/v1.0/next-page", server.uri()),
        })))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v1.0/next-page"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway error</html>"))
        .expect(1)
        .mount(&server)
        .await;

    let connector = connector(&server);
    let included = IncludedColumns::all(connector.schema());

    let mut collected: Vec<Row> = Vec::new();
    let mut sink = |row: Row| {
        collected.push(row);
        ControlSignal::Continue
    };
    let err = connector
        .fetch_rows(&included, &mut sink)
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectorError::Fetch(_)));
    assert_eq!(collected.len(), 1);
    assert_eq!(collected[0].identifier, MessageId::from("1"));
}

// A 401 from the list endpoint means the bearer token was rejected, which
// surfaces as an authentication failure rather than a page failure.
#[tokio::test]
async fn unauthorized_list_response_is_an_authentication_error() {
    let server = MockServer::start().await;
    mount_token(&server, 3600, 1).await;

    Mock::given(method("GET"))
        .and(path(messages_path()))
        .respond_with(
            ResponseTemplate::new(401).set_body_string(r#"{"error":{"code":"InvalidAuthenticationToken"}}"#),
        )
        .expect(1)
        .mount(&server)
        .await;

    let connector = connector(&server);
    let included = IncludedColumns::all(connector.schema());

    let mut sink = |_row: Row| ControlSignal::Continue;
    let err = connector
        .fetch_rows(&included, &mut sink)
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectorError::Authentication(_)));
    assert!(err.to_string().contains("InvalidAuthenticationToken"));
}

// Missing fields project to null rather than erroring, and the identifier
// is taken verbatim from the record regardless of the inclusion filter.
#[tokio::test]
async fn null_fields_and_identifier_invariance() {
    let server = MockServer::start().await;
    mount_token(&server, 3600, 1).await;

    Mock::given(method("GET"))
        .and(path(messages_path()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "value": [{
                "id": "AAMkAGI2=",
                "internetMessageId": "<m@example.com>",
                "receivedDateTime": "2024-01-15T10:30:00Z",
            }],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let connector = connector(&server);
    // id deliberately excluded from the projection
    let included = IncludedColumns::new(["subject", "receivedDateTime"]);

    let mut collected: Vec<Row> = Vec::new();
    let mut sink = |row: Row| {
        collected.push(row);
        ControlSignal::Continue
    };
    connector.fetch_rows(&included, &mut sink).await.unwrap();

    let row = &collected[0];
    assert_eq!(row.identifier, MessageId::from("AAMkAGI2="));
    assert_eq!(row.get("subject"), Some(&CellValue::Null));
    assert_eq!(row.get("id"), None);
    assert_eq!(row.get("internetMessageId"), None);
    assert!(matches!(
        row.get("receivedDateTime"),
        Some(CellValue::DateTime(_))
    ));
}

// Blob downloads land in distinct, caller-owned temp files.
#[tokio::test]
async fn blob_download_writes_scoped_temp_file() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    mount_token(&server, 3600, 1).await;

    let body = b"MIME-Version: 1.0\r\nSubject: full message\r\n\r\nhello".to_vec();
    Mock::given(method("GET"))
        .and(path(format!("/v1.0/users/{}/messages/42/$value", MAILBOX)))
        .and(header("authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
        .expect(2)
        .mount(&server)
        .await;

    let connector = connector(&server);
    let id = MessageId::from("42");

    let first = connector.fetch_blob(&id).await?;
    assert_eq!(std::fs::read(&first)?, body);

    std::fs::remove_file(&first)?;

    let second = connector.fetch_blob(&id).await?;
    assert_ne!(first, second);
    assert_eq!(std::fs::read(&second)?.len(), body.len());

    std::fs::remove_file(&second)?;

    assert_eq!(connector.blob_file_name(&id), "42.eml");
    Ok(())
}

// A failed blob download surfaces as an error and leaves nothing behind to
// clean up.
#[tokio::test]
async fn blob_not_found_is_an_error() {
    let server = MockServer::start().await;
    mount_token(&server, 3600, 1).await;

    Mock::given(method("GET"))
        .and(path(format!(
            "/v1.0/users/{}/messages/missing/$value",
            MAILBOX
        )))
        .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
        .expect(1)
        .mount(&server)
        .await;

    let connector = connector(&server);
    let err = connector
        .fetch_blob(&MessageId::from("missing"))
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectorError::BlobFetch(_)));
    assert!(err.to_string().contains("missing"));
}
