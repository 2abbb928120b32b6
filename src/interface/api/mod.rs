//! HTTP interface: carrier webhooks, AI tool endpoints and metrics

pub mod ai_webhooks;
pub mod callback;
pub mod metrics_handler;
pub mod router;
pub mod state;
pub mod tools;
pub mod webhooks;

pub use metrics_handler::{detached_handle, init_metrics};
pub use router::build_router;
pub use state::AppState;
