//! Application layer - Use cases and application services
//!
//! This layer orchestrates domain objects to fulfill use cases.
//! It's responsible for:
//! - Coordinating the carrier, the system of record and the registry
//! - Turning failures into the outcomes the callers expect
//! - Recording metrics for every use case

pub mod ai_events;
pub mod call_lifecycle;
pub mod callback_urls;
pub mod conference_tracker;
pub mod reconciler;
pub mod telemetry;
pub mod termination;
pub mod transfer;

pub use ai_events::AiEventHandler;
pub use call_lifecycle::{CallLifecycleService, CallStatusUpdate};
pub use callback_urls::CallbackUrls;
pub use conference_tracker::ConferencePresenceTracker;
pub use reconciler::CallbackReconciler;
pub use telemetry::ActiveCallReporter;
pub use termination::CallTerminationHandler;
pub use transfer::{ConferenceEntry, TransferInitiator};
