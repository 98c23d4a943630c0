//! UDP transport
//!
//! One datagram out, one matching datagram back. The whole exchange
//! (name resolution, send and receive) is bounded by the caller's timeout.

use async_trait::async_trait;
use ddns_core::{TransportError, UpdateTransport};
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::net::{UdpSocket, lookup_host};

/// Largest datagram accepted from the master
const MAX_RESPONSE_SIZE: usize = 65_535;

/// Real UDP transport on a fresh ephemeral socket per exchange
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpTransport;

impl UdpTransport {
    /// Create a UDP transport
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl UpdateTransport for UdpTransport {
    async fn send_udp(
        &self,
        master: &str,
        port: u16,
        payload: &[u8],
        timeout: Duration,
    ) -> Result<Vec<u8>, TransportError> {
        match tokio::time::timeout(timeout, exchange(master, port, payload)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(timeout)),
        }
    }
}

async fn exchange(master: &str, port: u16, payload: &[u8]) -> Result<Vec<u8>, TransportError> {
    let server = lookup_host((master, port))
        .await?
        .next()
        .ok_or_else(|| TransportError::Resolve(master.to_string()))?;

    let local: SocketAddr = if server.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };

    let socket = UdpSocket::bind(local).await?;
    // Connected sockets only receive from the master
    socket.connect(server).await?;
    socket.send(payload).await?;

    tracing::debug!("Sent {} byte update to {}", payload.len(), server);

    let mut buf = vec![0u8; MAX_RESPONSE_SIZE];
    loop {
        let len = socket.recv(&mut buf).await?;
        if len >= 2 && payload.len() >= 2 && buf[..2] == payload[..2] {
            buf.truncate(len);
            return Ok(buf);
        }

        tracing::debug!("Discarding {} byte datagram with mismatched id from {}", len, server);
    }
}
