//! Socket options for camouflaged connections

use socket2::{SockRef, TcpKeepalive};
use std::fmt;
use std::time::Duration;
use tokio::net::TcpStream;

/// Idle time before the first keepalive probe
const KEEPALIVE_IDLE: Duration = Duration::from_secs(120);
const KEEPALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Which end of the tunnel owns the socket
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Side {
    Dialer,
    Listener,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Dialer => f.write_str("dialer"),
            Side::Listener => f.write_str("listener"),
        }
    }
}

/// Disable Nagle so the prefix and the first cipher record leave together,
/// and keep idle tunnels alive through NAT. Failures are logged, not returned.
pub(crate) fn tune_socket(stream: &TcpStream, side: Side) {
    let peer = stream
        .peer_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| "unknown peer".to_string());

    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!("[Socket] {} could not set TCP_NODELAY for {}: {}", side, peer, e);
    }

    let keepalive = TcpKeepalive::new()
        .with_time(KEEPALIVE_IDLE)
        .with_interval(KEEPALIVE_INTERVAL);
    if let Err(e) = SockRef::from(stream).set_tcp_keepalive(&keepalive) {
        tracing::debug!("[Socket] {} could not enable keepalive for {}: {}", side, peer, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_tune_both_sides() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (client, accepted) = tokio::join!(TcpStream::connect(addr), listener.accept());
        let client = client.unwrap();
        let (server, _) = accepted.unwrap();

        tune_socket(&client, Side::Dialer);
        tune_socket(&server, Side::Listener);

        assert!(client.nodelay().unwrap());
        assert!(server.nodelay().unwrap());
        assert!(SockRef::from(&client).keepalive().unwrap());
    }
}
