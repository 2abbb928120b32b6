//! Interface layer - External interfaces
//!
//! This layer handles:
//! - Carrier webhook endpoints
//! - AI tool endpoints
//! - Request/response formatting

pub mod api;
