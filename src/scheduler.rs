// src/scheduler.rs
//! Scheduled trigger: a tokio interval task running the fetch pipeline.
//! The outcome is logged and discarded; errors never escape the task, so
//! the host sees no crash-retry signal.

use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::api::AppState;
use crate::pipeline;

#[derive(Clone, Copy, Debug)]
pub struct FetchSchedulerCfg {
    pub interval_secs: u64,
}

/// Spawn the periodic fetch task. The first tick fires immediately, then
/// every `interval_secs` (default cadence: every 5 hours).
pub fn spawn_fetch_scheduler(cfg: FetchSchedulerCfg, app: AppState) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(cfg.interval_secs));
        loop {
            ticker.tick().await;
            let outcome = pipeline::run_fetch_cycle(
                &app.cfg,
                app.provider.as_ref(),
                app.docs.as_ref(),
                app.blobs.as_ref(),
            )
            .await;

            if outcome.success {
                info!(
                    target: "scheduler",
                    articles = ?outcome.articles_count,
                    duration_ms = outcome.duration_ms,
                    "scheduled fetch tick"
                );
            } else {
                warn!(
                    target: "scheduler",
                    message = %outcome.message,
                    error = ?outcome.error,
                    "scheduled fetch did not store news"
                );
            }
        }
    })
}
