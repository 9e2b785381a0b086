// src/api.rs
//! HTTP surface: the frontend news proxy, the manual fetch trigger, and
//! the contact-form endpoint. All responses are JSON except /health.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::fetch::NewsProvider;
use crate::notify::{ContactMessage, ContactNotifier};
use crate::pipeline::{self, iso, NewsDocument, NEWS_BLOB_KEY};
use crate::store::{BlobStore, DocumentStore};

pub const CONTACT_COLLECTION: &str = "contact-submissions";

/// 5-minute client cache on the news proxy.
const NEWS_CACHE_CONTROL: &str = "public, max-age=300";

// Same shape the original form validation used: local@domain.tld, no spaces.
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex"));

/// Shared application state; every collaborator is injected so tests can
/// substitute in-memory fakes.
#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<AppConfig>,
    pub provider: Arc<dyn NewsProvider>,
    pub blobs: Arc<dyn BlobStore>,
    pub docs: Arc<dyn DocumentStore>,
    pub mailer: Arc<dyn ContactNotifier>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/news", get(get_news))
        .route("/fetch", get(manual_fetch).post(manual_fetch))
        .route("/contact", post(send_contact))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Frontend proxy for the stored news document. Serves the last stored
/// batch verbatim; a missing blob yields the empty payload shape, never
/// an error. Only a store-access failure surfaces as 5xx.
async fn get_news(State(state): State<AppState>) -> Response {
    match state.blobs.read(NEWS_BLOB_KEY).await {
        Ok(Some(body)) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/json"),
                (header::CACHE_CONTROL, NEWS_CACHE_CONTROL),
            ],
            body,
        )
            .into_response(),
        Ok(None) => Json(NewsDocument::empty(Utc::now())).into_response(),
        Err(e) => {
            error!(target: "api", error = ?e, "failed to read stored news");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "Failed to fetch news data",
                    "message": e.to_string(),
                    "timestamp": iso(Utc::now()),
                })),
            )
                .into_response()
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

fn presented_token(headers: &HeaderMap, query: TokenQuery) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(|h| h.strip_prefix("Bearer ").unwrap_or(h).to_string())
        .or(query.token)
}

/// Manual trigger: same pipeline as the scheduled run, gated by a shared
/// secret (bearer header or `?token=`). A quota refusal is still a 200
/// with a structured summary; only real failures are 5xx.
async fn manual_fetch(
    State(state): State<AppState>,
    Query(query): Query<TokenQuery>,
    headers: HeaderMap,
) -> Response {
    let authorized = presented_token(&headers, query)
        .is_some_and(|t| t == state.cfg.manual_fetch_token);
    if !authorized {
        counter!("manual_fetch_unauthorized_total").increment(1);
        warn!(target: "auth", "unauthorized manual fetch attempt");
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "error": "Unauthorized",
                "message": "Valid token required for manual fetch",
            })),
        )
            .into_response();
    }

    info!(target: "api", "manual news fetch triggered");
    let outcome = pipeline::run_fetch_cycle(
        &state.cfg,
        state.provider.as_ref(),
        state.docs.as_ref(),
        state.blobs.as_ref(),
    )
    .await;

    let status = if outcome.error.is_some() {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    };
    (status, Json(outcome)).into_response()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactForm {
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    last_name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    subject: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn validate_contact(form: ContactForm) -> Result<ContactMessage, &'static str> {
    let take = |v: Option<String>| {
        v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
    };

    let (Some(first_name), Some(last_name), Some(email), Some(subject), Some(message)) = (
        take(form.first_name),
        take(form.last_name),
        take(form.email),
        take(form.subject),
        take(form.message),
    ) else {
        return Err("All fields are required");
    };

    if !EMAIL_RE.is_match(&email) {
        return Err("Invalid email format");
    }

    Ok(ContactMessage {
        first_name,
        last_name,
        email: email.to_lowercase(),
        subject,
        message,
    })
}

/// Contact submission: validate, notify by email (best-effort), store the
/// record. Email failure does not fail the request; it is recorded on the
/// stored submission and reflected in `emailSent`.
async fn send_contact(State(state): State<AppState>, Json(form): Json<ContactForm>) -> Response {
    let msg = match validate_contact(form) {
        Ok(m) => m,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "success": false, "error": e })),
            )
                .into_response();
        }
    };

    let mut email_sent = false;
    let mut email_error = None;
    match state.mailer.notify(&msg).await {
        Ok(()) => {
            email_sent = true;
            info!(target: "api", "contact notification email sent");
        }
        Err(e) => {
            warn!(target: "api", error = ?e, "contact notification email failed");
            email_error = Some(e.to_string());
        }
    }

    let mut record = json!({
        "firstName": msg.first_name,
        "lastName": msg.last_name,
        "email": msg.email,
        "subject": msg.subject,
        "message": msg.message,
        "timestamp": iso(Utc::now()),
        "status": "new",
        "processed": false,
        "emailSent": email_sent,
    });
    if let Some(err) = email_error {
        record["emailError"] = Value::String(err);
    }

    match state.docs.add(CONTACT_COLLECTION, &record).await {
        Ok(id) => {
            counter!("contact_submissions_total").increment(1);
            info!(target: "api", submission = %id, email_sent, "contact submission stored");
            (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "message": if email_sent {
                        "Message sent successfully! We'll get back to you soon."
                    } else {
                        "Message received and stored. Email notification may be delayed."
                    },
                    "submissionId": id,
                    "emailSent": email_sent,
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!(target: "api", error = ?e, "failed to store contact submission");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": "Failed to send message. Please try again later.",
                })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(email: &str) -> ContactForm {
        ContactForm {
            first_name: Some("Juan".into()),
            last_name: Some("Dela Cruz".into()),
            email: Some(email.into()),
            subject: Some("Flood report".into()),
            message: Some("The river is rising.".into()),
        }
    }

    #[test]
    fn valid_form_passes_and_lowercases_email() {
        let msg = validate_contact(form("Juan.DelaCruz@Example.COM")).unwrap();
        assert_eq!(msg.email, "juan.delacruz@example.com");
        assert_eq!(msg.first_name, "Juan");
    }

    #[test]
    fn missing_or_blank_fields_are_rejected() {
        let mut f = form("juan@example.com");
        f.message = None;
        assert_eq!(validate_contact(f).unwrap_err(), "All fields are required");

        let mut f = form("juan@example.com");
        f.subject = Some("   ".into());
        assert_eq!(validate_contact(f).unwrap_err(), "All fields are required");
    }

    #[test]
    fn malformed_emails_are_rejected() {
        for bad in ["no-at-sign", "a@b", "a @b.com", "a@b c.com", "@example.com"] {
            assert_eq!(
                validate_contact(form(bad)).unwrap_err(),
                "Invalid email format",
                "{bad} should be invalid"
            );
        }
    }

    #[test]
    fn bearer_prefix_and_query_token_both_work() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, "Bearer s3cret".parse().unwrap());
        assert_eq!(
            presented_token(&headers, TokenQuery { token: None }),
            Some("s3cret".to_string())
        );

        let headers = HeaderMap::new();
        assert_eq!(
            presented_token(
                &headers,
                TokenQuery {
                    token: Some("s3cret".into())
                }
            ),
            Some("s3cret".to_string())
        );
        assert_eq!(presented_token(&headers, TokenQuery { token: None }), None);
    }
}
