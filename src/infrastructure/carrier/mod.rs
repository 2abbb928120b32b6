//! Carrier adapters

pub mod twilio;

pub use twilio::{TwilioClient, TwilioClientFactory};
