//! Domain layer - Core business logic and rules
//!
//! This layer contains:
//! - Entities and value objects of a live call and its transfer conference
//! - Control documents handed to the carrier
//! - Ports: the carrier, the system of record, the AI provider and the
//!   active-call registry

pub mod ai_event;
pub mod ai_session;
pub mod assessment;
pub mod carrier;
pub mod conference;
pub mod control_document;
pub mod hangup;
pub mod recording;
pub mod session;
pub mod shared;
pub mod system_of_record;
pub mod transfer;

// Re-export commonly used types
pub use shared::{CallbackFields, DomainError, Result};
