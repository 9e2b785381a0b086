// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod api;
pub mod classify;
pub mod config;
pub mod fetch;
pub mod metrics;
pub mod notify;
pub mod pipeline;
pub mod quota;
pub mod scheduler;
pub mod store;

// ---- Re-exports for stable public API ----
pub use crate::api::{router, AppState};
pub use crate::notify::{ContactMessage, ContactNotifier};
pub use crate::pipeline::{run_fetch_cycle, FetchOutcome, NewsDocument};
