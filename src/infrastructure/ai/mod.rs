//! Conversational-AI provider adapters

pub mod signature;
pub mod ultravox;

pub use signature::{SignatureError, WebhookVerifier};
pub use ultravox::UltravoxClient;
