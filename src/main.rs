//! AcciZard News Relay — Binary Entrypoint
//! Boots the Axum HTTP server, the periodic fetch scheduler, and the
//! Prometheus exporter, wiring the injected collaborators once at startup.

use std::sync::Arc;

use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use accizard_news::api::{self, AppState};
use accizard_news::config::AppConfig;
use accizard_news::fetch::NewsDataClient;
use accizard_news::metrics::Metrics;
use accizard_news::notify::{email::EmailSender, ContactNotifier, DisabledSender};
use accizard_news::scheduler::{spawn_fetch_scheduler, FetchSchedulerCfg};
use accizard_news::store::{FsBlobStore, FsDocumentStore};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // try_init: the runtime may have installed a subscriber already.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = Arc::new(AppConfig::from_env().expect("failed to load configuration"));

    let blobs = Arc::new(
        FsBlobStore::new(cfg.data_dir.join("storage")).expect("failed to init blob store"),
    );
    let docs = Arc::new(
        FsDocumentStore::new(cfg.data_dir.join("documents"))
            .expect("failed to init document store"),
    );
    let provider = Arc::new(NewsDataClient::from_config(&cfg).expect("failed to init news client"));

    let mailer: Arc<dyn ContactNotifier> = match &cfg.smtp {
        Some(smtp) => {
            Arc::new(EmailSender::from_config(smtp).expect("failed to init smtp sender"))
        }
        None => {
            tracing::warn!("SMTP not configured; contact notifications disabled");
            Arc::new(DisabledSender)
        }
    };

    let metrics = Metrics::init(cfg.fetch_interval_secs);

    let state = AppState {
        cfg: cfg.clone(),
        provider,
        blobs,
        docs,
        mailer,
    };

    spawn_fetch_scheduler(
        FetchSchedulerCfg {
            interval_secs: cfg.fetch_interval_secs,
        },
        state.clone(),
    );

    let router = api::router(state).merge(metrics.router());
    Ok(router.into())
}
