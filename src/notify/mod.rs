// src/notify/mod.rs
//! Contact-form notification collaborators. Email delivery is best-effort:
//! a failure flips `emailSent` on the stored submission, never the request.

pub mod email;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

/// Validated contact-form payload relayed to the site operator.
#[derive(Debug, Clone)]
pub struct ContactMessage {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub subject: String,
    pub message: String,
}

#[async_trait]
pub trait ContactNotifier: Send + Sync {
    async fn notify(&self, msg: &ContactMessage) -> Result<()>;
}

/// Stand-in when SMTP is not configured. Submissions are still stored;
/// the response just reports `emailSent: false`.
pub struct DisabledSender;

#[async_trait]
impl ContactNotifier for DisabledSender {
    async fn notify(&self, _msg: &ContactMessage) -> Result<()> {
        Err(anyhow!("email notifications are not configured"))
    }
}
