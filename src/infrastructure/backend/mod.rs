//! System-of-record adapters

pub mod erp;

pub use erp::ErpClient;
