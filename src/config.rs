// src/config.rs
//! Process configuration. Built once at startup from the environment and
//! injected into the scheduler, pipeline, and endpoint handlers; nothing
//! performs ambient env lookups after boot.

use std::path::PathBuf;

use anyhow::{Context, Result};

// --- env names ---
pub const ENV_NEWSDATA_API_KEY: &str = "NEWSDATA_API_KEY";
pub const ENV_MANUAL_FETCH_TOKEN: &str = "MANUAL_FETCH_TOKEN";
pub const ENV_NEWS_COUNTRY: &str = "NEWS_COUNTRY";
pub const ENV_NEWS_QUERY: &str = "NEWS_QUERY";
pub const ENV_NEWS_DATA_DIR: &str = "NEWS_DATA_DIR";
pub const ENV_FETCH_INTERVAL_SECS: &str = "FETCH_INTERVAL_SECS";

pub const ENV_SMTP_HOST: &str = "SMTP_HOST";
pub const ENV_SMTP_USER: &str = "SMTP_USER";
pub const ENV_SMTP_PASS: &str = "SMTP_PASS";
pub const ENV_CONTACT_EMAIL_FROM: &str = "CONTACT_EMAIL_FROM";
pub const ENV_CONTACT_EMAIL_TO: &str = "CONTACT_EMAIL_TO";

// --- defaults ---
pub const DEFAULT_COUNTRY: &str = "ph";
pub const DEFAULT_QUERY: &str =
    "government OR disaster OR weather OR politics OR PAGASA OR DOST OR NDRRMC";
pub const DEFAULT_DATA_DIR: &str = "data";
/// Every 5 hours, 5 runs per day.
pub const DEFAULT_FETCH_INTERVAL_SECS: u64 = 5 * 60 * 60;
/// Articles requested from the upstream API per fetch.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// SMTP settings for the contact-form notification email.
/// Present only when all five variables are set.
#[derive(Debug, Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub user: String,
    pub pass: String,
    pub from: String,
    pub to: String,
}

impl SmtpConfig {
    fn from_env() -> Option<Self> {
        let host = std::env::var(ENV_SMTP_HOST).ok()?;
        let user = std::env::var(ENV_SMTP_USER).ok()?;
        let pass = std::env::var(ENV_SMTP_PASS).ok()?;
        let from = std::env::var(ENV_CONTACT_EMAIL_FROM).ok()?;
        let to = std::env::var(ENV_CONTACT_EMAIL_TO).ok()?;
        Some(Self {
            host,
            user,
            pass,
            from,
            to,
        })
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    /// NewsData.io API key.
    pub api_key: String,
    /// Shared secret for the manual fetch trigger.
    pub manual_fetch_token: String,
    pub country: String,
    pub query: String,
    pub page_size: u32,
    /// Root directory for the filesystem-backed stores.
    pub data_dir: PathBuf,
    pub fetch_interval_secs: u64,
    pub smtp: Option<SmtpConfig>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(ENV_NEWSDATA_API_KEY)
            .with_context(|| format!("{ENV_NEWSDATA_API_KEY} missing"))?;
        let manual_fetch_token = std::env::var(ENV_MANUAL_FETCH_TOKEN)
            .with_context(|| format!("{ENV_MANUAL_FETCH_TOKEN} missing"))?;

        let country = env_or(ENV_NEWS_COUNTRY, DEFAULT_COUNTRY);
        let query = env_or(ENV_NEWS_QUERY, DEFAULT_QUERY);
        let data_dir = PathBuf::from(env_or(ENV_NEWS_DATA_DIR, DEFAULT_DATA_DIR));

        let fetch_interval_secs = std::env::var(ENV_FETCH_INTERVAL_SECS)
            .ok()
            .and_then(|v| v.trim().parse::<u64>().ok())
            .unwrap_or(DEFAULT_FETCH_INTERVAL_SECS);

        Ok(Self {
            api_key,
            manual_fetch_token,
            country,
            query,
            page_size: DEFAULT_PAGE_SIZE,
            data_dir,
            fetch_interval_secs,
            smtp: SmtpConfig::from_env(),
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => v,
        _ => default.to_string(),
    }
}
