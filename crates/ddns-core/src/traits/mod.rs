//! Core traits for the DDNS update system
//!
//! - [`DnsUpdater`]: Apply one dynamic update and classify the answer
//! - [`UpdateTransport`]: Deliver one encoded message to the master

pub mod updater;
pub mod transport;

pub use updater::DnsUpdater;
pub use transport::{TransportError, UpdateTransport};
