// # Update Transport Trait
//
// The network seam of an updater: deliver one encoded DNS message to the
// master and hand back the raw answer. The real implementation speaks UDP;
// tests substitute stubs that record what was sent.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Transport failures
#[derive(Error, Debug)]
pub enum TransportError {
    /// No matching response arrived in time
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The master's name did not resolve to any address
    #[error("could not resolve master '{0}'")]
    Resolve(String),

    /// Socket errors
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for one-shot DNS message exchanges
///
/// Implementations must not retry: one send, at most one answer, bounded by
/// `timeout`.
#[async_trait]
pub trait UpdateTransport: Send + Sync {
    /// Send `payload` to `master:port` over UDP and wait for the answer
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<u8>)`: the raw response datagram
    /// - `Err(TransportError::Timeout)`: nothing arrived within `timeout`
    /// - `Err(_)`: resolution or socket failure
    async fn send_udp(
        &self,
        master: &str,
        port: u16,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError>;
}
