//! Call session bounded context
//!
//! Links the AI-side session identifier to the carrier-side call leg for
//! as long as the original call is alive.

pub mod entity;
pub mod registry;

pub use entity::{CallDirection, CallSession, SessionStatus};
pub use registry::ActiveCallRegistry;

#[cfg(test)]
pub use registry::MockActiveCallRegistry;
