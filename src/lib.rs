//! CallBridge - glue between a voice carrier, an AI voice agent and a
//! business system of record
//!
//! Inbound calls are bridged to an AI session; the AI can transfer the
//! caller to a human agent through a carrier conference or hang up.
//! Every lifecycle event is reported to the system of record.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interface;

// Re-export commonly used types
pub use domain::shared::error::DomainError;
pub use domain::shared::result::Result;
