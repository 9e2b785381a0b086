// src/fetch.rs
//! Upstream news source collaborator (NewsData.io wire shape): one blocking
//! call with a fixed timeout, no internal retries. The next scheduled run
//! is the de facto retry.

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::classify::Candidate;
use crate::config::AppConfig;

pub const FETCH_TIMEOUT_SECS: u64 = 30;

const NEWSDATA_ENDPOINT: &str = "https://newsdata.io/api/1/news";
const USER_AGENT: &str = "AcciZard-News-System/1.0";

/// Response envelope: `status` is `"success"` on 2xx happy paths; anything
/// else carries a `message` and counts as an upstream error.
#[derive(Debug, Deserialize)]
struct NewsDataEnvelope {
    status: String,
    #[serde(default)]
    results: Option<Vec<Candidate>>,
    #[serde(default)]
    message: Option<String>,
}

#[async_trait]
pub trait NewsProvider: Send + Sync {
    async fn fetch_latest(&self) -> Result<Vec<Candidate>>;
    fn name(&self) -> &'static str;
}

pub struct NewsDataClient {
    mode: Mode,
}

enum Mode {
    Http {
        client: reqwest::Client,
        api_key: String,
        country: String,
        query: String,
        page_size: u32,
    },
    // Owned copy so tests and offline runs need no 'static fixture.
    Fixture(String),
}

impl NewsDataClient {
    pub fn from_config(cfg: &AppConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .context("building news http client")?;
        Ok(Self {
            mode: Mode::Http {
                client,
                api_key: cfg.api_key.clone(),
                country: cfg.country.clone(),
                query: cfg.query.clone(),
                page_size: cfg.page_size,
            },
        })
    }

    pub fn from_fixture(body: &str) -> Self {
        Self {
            mode: Mode::Fixture(body.to_string()),
        }
    }

    fn parse_envelope(body: &str) -> Result<Vec<Candidate>> {
        let envelope: NewsDataEnvelope =
            serde_json::from_str(body).context("parsing newsdata response")?;
        if envelope.status != "success" {
            return Err(anyhow!(
                "newsdata api failed: {}",
                envelope.message.unwrap_or_else(|| "Unknown error".into())
            ));
        }
        Ok(envelope.results.unwrap_or_default())
    }
}

#[async_trait]
impl NewsProvider for NewsDataClient {
    async fn fetch_latest(&self) -> Result<Vec<Candidate>> {
        match &self.mode {
            Mode::Fixture(body) => Self::parse_envelope(body),

            Mode::Http {
                client,
                api_key,
                country,
                query,
                page_size,
            } => {
                let params: [(&str, String); 4] = [
                    ("apikey", api_key.clone()),
                    ("country", country.clone()),
                    ("q", query.clone()),
                    ("size", page_size.to_string()),
                ];
                let resp = client
                    .get(NEWSDATA_ENDPOINT)
                    .query(&params)
                    .send()
                    .await
                    .context("newsdata request failed")?;

                let status = resp.status();
                let body = resp.text().await.context("reading newsdata body")?;
                if !status.is_success() {
                    return Err(anyhow!("newsdata api error: {status} - {body}"));
                }
                Self::parse_envelope(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "NewsData.io"
    }
}
