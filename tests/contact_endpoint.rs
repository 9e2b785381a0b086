// tests/contact_endpoint.rs
//
// POST /contact: field validation, the best-effort email path, and the
// stored submission record.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value as Json};
use tower::ServiceExt as _;

use accizard_news::api::{router, AppState, CONTACT_COLLECTION};
use accizard_news::config::AppConfig;
use accizard_news::fetch::NewsDataClient;
use accizard_news::notify::{ContactMessage, ContactNotifier, DisabledSender};
use accizard_news::store::{MemoryBlobStore, MemoryDocumentStore};

const BODY_LIMIT: usize = 1024 * 1024;

fn test_cfg() -> AppConfig {
    AppConfig {
        api_key: "pub_test".into(),
        manual_fetch_token: "test-token".into(),
        country: "ph".into(),
        query: "government".into(),
        page_size: 10,
        data_dir: PathBuf::from("."),
        fetch_interval_secs: 18_000,
        smtp: None,
    }
}

/// Always-succeeding mailer for the happy path.
struct OkMailer;

#[async_trait]
impl ContactNotifier for OkMailer {
    async fn notify(&self, _msg: &ContactMessage) -> Result<()> {
        Ok(())
    }
}

fn app_with_mailer(
    mailer: Arc<dyn ContactNotifier>,
) -> (Router, Arc<MemoryDocumentStore>) {
    let docs = Arc::new(MemoryDocumentStore::default());
    let state = AppState {
        cfg: Arc::new(test_cfg()),
        provider: Arc::new(NewsDataClient::from_fixture(r#"{"status":"success"}"#)),
        blobs: Arc::new(MemoryBlobStore::default()),
        docs: docs.clone(),
        mailer,
    };
    (router(state), docs)
}

async fn post_contact(app: Router, payload: Json) -> (StatusCode, Json) {
    let req = Request::builder()
        .method("POST")
        .uri("/contact")
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("build POST /contact");
    let resp = app.oneshot(req).await.expect("oneshot /contact");
    let status = resp.status();
    let bytes = body::to_bytes(resp.into_body(), BODY_LIMIT)
        .await
        .expect("read body")
        .to_vec();
    let v = serde_json::from_slice(&bytes).expect("parse json");
    (status, v)
}

fn valid_payload() -> Json {
    json!({
        "firstName": "Juan",
        "lastName": "Dela Cruz",
        "email": "juan@example.com",
        "subject": "Flood report",
        "message": "The river near our barangay is rising."
    })
}

#[tokio::test]
async fn invalid_email_is_rejected_with_400() {
    let (app, docs) = app_with_mailer(Arc::new(OkMailer));

    let mut payload = valid_payload();
    payload["email"] = json!("not-an-email");
    let (status, v) = post_contact(app, payload).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["success"], false);
    assert_eq!(v["error"], "Invalid email format");
    assert!(docs.collection(CONTACT_COLLECTION).await.is_empty());
}

#[tokio::test]
async fn missing_field_is_rejected_with_400() {
    let (app, _docs) = app_with_mailer(Arc::new(OkMailer));

    let mut payload = valid_payload();
    payload.as_object_mut().unwrap().remove("message");
    let (status, v) = post_contact(app, payload).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(v["error"], "All fields are required");
}

#[tokio::test]
async fn valid_submission_stores_record_and_reports_email_sent() {
    let (app, docs) = app_with_mailer(Arc::new(OkMailer));

    let (status, v) = post_contact(app, valid_payload()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(v["success"], true);
    assert_eq!(v["emailSent"], true);
    let id = v["submissionId"].as_str().unwrap_or_default().to_string();
    assert!(!id.is_empty());

    let records = docs.collection(CONTACT_COLLECTION).await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].0, id);
    let rec = &records[0].1;
    assert_eq!(rec["firstName"], "Juan");
    assert_eq!(rec["email"], "juan@example.com");
    assert_eq!(rec["status"], "new");
    assert_eq!(rec["processed"], false);
    assert_eq!(rec["emailSent"], true);
    assert!(rec.get("emailError").is_none());
}

#[tokio::test]
async fn email_failure_still_returns_200_with_submission_id() {
    let (app, docs) = app_with_mailer(Arc::new(DisabledSender));

    let (status, v) = post_contact(app, valid_payload()).await;
    assert_eq!(status, StatusCode::OK, "email failure must not fail the request");
    assert_eq!(v["success"], true);
    assert_eq!(v["emailSent"], false);
    assert!(!v["submissionId"].as_str().unwrap_or_default().is_empty());

    let records = docs.collection(CONTACT_COLLECTION).await;
    assert_eq!(records.len(), 1);
    let rec = &records[0].1;
    assert_eq!(rec["emailSent"], false);
    assert!(
        rec.get("emailError").is_some(),
        "delivery error recorded alongside the submission"
    );
}

#[tokio::test]
async fn email_is_normalized_to_lowercase_and_fields_trimmed() {
    let (app, docs) = app_with_mailer(Arc::new(OkMailer));

    let mut payload = valid_payload();
    payload["email"] = json!("  Juan@Example.COM  ");
    payload["firstName"] = json!("  Juan  ");
    let (status, _) = post_contact(app, payload).await;
    assert_eq!(status, StatusCode::OK);

    let records = docs.collection(CONTACT_COLLECTION).await;
    assert_eq!(records[0].1["email"], "juan@example.com");
    assert_eq!(records[0].1["firstName"], "Juan");
}
