//! Infrastructure layer - Technical implementations
//!
//! This layer contains:
//! - The in-memory active-call registry
//! - The Twilio call-control adapter
//! - The ERP system-of-record client
//! - The voice-AI session client

pub mod ai;
pub mod backend;
pub mod carrier;
pub mod persistence;
