// src/pipeline.rs
//! One fetch cycle: quota governor -> upstream fetch -> classifier -> blob
//! store. Shared by the scheduled trigger and the manual trigger endpoint.
//! Every failure is caught here and converted into a structured outcome;
//! nothing propagates to the host runtime.

use chrono::{DateTime, SecondsFormat, Utc};
use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info, warn};

use crate::classify::{self, AcceptedArticle};
use crate::config::AppConfig;
use crate::fetch::NewsProvider;
use crate::quota::{self, QuotaState};
use crate::store::{BlobStore, DocumentStore};

pub const NEWS_BLOB_KEY: &str = "news.json";
pub const QUOTA_DOC_ID: &str = "daily-fetch-counter";

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("news_fetch_runs_total", "Fetch cycles started.");
        describe_counter!(
            "news_fetch_refused_total",
            "Cycles refused by the quota governor."
        );
        describe_counter!(
            "news_fetch_errors_total",
            "Cycles that failed upstream or on storage."
        );
        describe_counter!(
            "news_articles_kept_total",
            "Articles accepted by the classifier."
        );
        describe_counter!(
            "contact_submissions_total",
            "Contact-form submissions stored."
        );
        describe_counter!(
            "manual_fetch_unauthorized_total",
            "Manual trigger calls with a bad token."
        );
        describe_gauge!(
            "news_pipeline_last_run_ts",
            "Unix ts when a fetch cycle last stored news."
        );
    });
}

/// The stored `news.json` payload served verbatim by the read endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewsDocument {
    pub fetched_at: String,
    pub total_articles: usize,
    pub source: String,
    pub query: String,
    pub country: String,
    pub articles: Vec<AcceptedArticle>,
}

impl NewsDocument {
    /// Well-formed empty payload for the read path when nothing has been
    /// stored yet; never an error.
    pub fn empty(now: DateTime<Utc>) -> serde_json::Value {
        json!({
            "fetchedAt": iso(now),
            "totalArticles": 0,
            "articles": [],
            "message": "No news data available yet. First fetch will occur automatically.",
        })
    }
}

/// Result summary of a fetch cycle. `error` is set only for upstream or
/// storage failures; a quota refusal is a non-success outcome with
/// `error: None`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub articles_count: Option<usize>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: String,
    pub duration_ms: u64,
}

pub(crate) fn iso(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Run one governed fetch cycle against the injected collaborators.
pub async fn run_fetch_cycle(
    cfg: &AppConfig,
    provider: &dyn NewsProvider,
    docs: &dyn DocumentStore,
    blobs: &dyn BlobStore,
) -> FetchOutcome {
    ensure_metrics_described();
    let started = std::time::Instant::now();
    let now = Utc::now();
    let today = now.date_naive();
    counter!("news_fetch_runs_total").increment(1);

    let outcome = |success: bool, count: Option<usize>, message: String, error: Option<String>| {
        FetchOutcome {
            success,
            articles_count: count,
            message,
            error,
            timestamp: iso(now),
            duration_ms: started.elapsed().as_millis() as u64,
        }
    };

    // Load prior quota state; a broken store must not halt news delivery,
    // so degrade to an empty state (best-effort quota under storage outage).
    let prior = match docs.get(QUOTA_DOC_ID).await {
        Ok(Some(v)) => match serde_json::from_value::<QuotaState>(v) {
            Ok(state) => state,
            Err(e) => {
                warn!(target: "pipeline", error = ?e, "quota state unreadable, using empty state");
                QuotaState::empty(today)
            }
        },
        Ok(None) => QuotaState::empty(today),
        Err(e) => {
            warn!(target: "pipeline", error = ?e, "quota state unavailable, using empty state");
            QuotaState::empty(today)
        }
    };

    let decision = quota::evaluate_and_reserve(today, prior);

    // Persist regardless of the verdict so a refusal is durably recorded
    // and rollover does not re-trigger within the same invocation.
    persist_quota(docs, &decision.state).await;

    if let Some(refusal) = decision.refusal {
        counter!("news_fetch_refused_total").increment(1);
        info!(
            target: "pipeline",
            %refusal,
            date = %decision.state.date,
            count = decision.state.count,
            "fetch refused by quota governor"
        );
        return outcome(false, None, refusal.to_string(), None);
    }

    info!(
        target: "pipeline",
        daily = decision.state.count,
        monthly = decision
            .state
            .monthly_stats
            .get(&quota::month_key(today))
            .map(|s| s.fetches)
            .unwrap_or_default(),
        "fetch slot reserved"
    );

    let mut state = decision.state;

    let candidates = match provider.fetch_latest().await {
        Ok(c) => c,
        Err(e) => {
            counter!("news_fetch_errors_total").increment(1);
            error!(target: "pipeline", error = ?e, provider = provider.name(), "upstream fetch failed");
            record_last_error(docs, &mut state, &e.to_string(), now).await;
            return outcome(
                false,
                None,
                "Upstream fetch failed".into(),
                Some(e.to_string()),
            );
        }
    };
    info!(target: "pipeline", received = candidates.len(), "candidates received from upstream");

    let articles = classify::classify(&candidates, now);
    counter!("news_articles_kept_total").increment(articles.len() as u64);

    let doc = NewsDocument {
        fetched_at: iso(now),
        total_articles: articles.len(),
        source: provider.name().to_string(),
        query: cfg.query.clone(),
        country: cfg.country.clone(),
        articles,
    };

    let payload = match serde_json::to_string_pretty(&doc) {
        Ok(p) => p,
        Err(e) => {
            counter!("news_fetch_errors_total").increment(1);
            error!(target: "pipeline", error = ?e, "serializing news document failed");
            record_last_error(docs, &mut state, &e.to_string(), now).await;
            return outcome(
                false,
                None,
                "Serialization failed".into(),
                Some(e.to_string()),
            );
        }
    };

    if let Err(e) = blobs.write(NEWS_BLOB_KEY, &payload).await {
        counter!("news_fetch_errors_total").increment(1);
        error!(target: "pipeline", error = ?e, "storing news document failed");
        record_last_error(docs, &mut state, &e.to_string(), now).await;
        return outcome(
            false,
            None,
            "Storage save failed".into(),
            Some(e.to_string()),
        );
    }

    gauge!("news_pipeline_last_run_ts").set(now.timestamp() as f64);
    info!(
        target: "pipeline",
        articles = doc.total_articles,
        duration_ms = started.elapsed().as_millis() as u64,
        "news fetch completed"
    );

    outcome(
        true,
        Some(doc.total_articles),
        format!("Stored {} articles", doc.total_articles),
        None,
    )
}

/// Persist the quota document; failures are logged, never escalated.
async fn persist_quota(docs: &dyn DocumentStore, state: &QuotaState) {
    match serde_json::to_value(state) {
        Ok(v) => {
            if let Err(e) = docs.set(QUOTA_DOC_ID, &v).await {
                warn!(target: "pipeline", error = ?e, "failed to persist quota state");
            }
        }
        Err(e) => warn!(target: "pipeline", error = ?e, "failed to serialize quota state"),
    }
}

/// Best-effort diagnostic write after a failed cycle. Independently
/// fallible; a failure here is logged and swallowed.
async fn record_last_error(
    docs: &dyn DocumentStore,
    state: &mut QuotaState,
    message: &str,
    now: DateTime<Utc>,
) {
    state.last_error = Some(message.to_string());
    state.last_error_time = Some(now);
    persist_quota(docs, state).await;
}
