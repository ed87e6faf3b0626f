//! Server side: accept, absorb the prefix, hand the stream to the cipher
//!
//! Every accepted socket gets its own task, so a slow or silent peer only
//! holds up itself, and only until the absorb deadline. Connections whose
//! prefix does not check out are logged and dropped; to an observer that looks
//! like any other closed connection.

use crate::prefix::PrefixAbsorber;
use crate::transport::cipher::ServerCipher;
use crate::transport::config::ListenerConfig;
use crate::transport::conn::EofOnClose;
use crate::transport::socket::{Side, tune_socket};
use crate::util::{CamoError, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout_at};
use tracing::{Instrument, info_span};

const ACCEPT_BACKLOG: usize = 128;

type Accepted<S> = (EofOnClose<S>, SocketAddr);

/// Listener yielding connections whose prefix has been absorbed
pub struct PrefixListener<C: ServerCipher> {
    local_addr: SocketAddr,
    incoming: mpsc::Receiver<Accepted<C::Stream>>,
    accept_task: JoinHandle<()>,
}

impl<C: ServerCipher> PrefixListener<C> {
    /// Bind `addr` and start accepting
    pub async fn bind(addr: &str, absorber: PrefixAbsorber, cipher: C) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Self::wrap(listener, absorber, cipher)
    }

    /// Build from config; the absorb policy is validated here
    pub async fn from_config(config: &ListenerConfig, cipher: C) -> Result<Self> {
        let absorber = config.absorber()?;
        if config.replay_history > 0 {
            tracing::debug!(
                "[Listener] Replay history of {} salts is left to the cipher layer",
                config.replay_history
            );
        }
        Self::bind(&config.addr, absorber, cipher).await
    }

    /// Take over an already bound listener
    pub fn wrap(listener: TcpListener, absorber: PrefixAbsorber, cipher: C) -> Result<Self> {
        let local_addr = listener.local_addr()?;
        let (tx, incoming) = mpsc::channel(ACCEPT_BACKLOG);

        tracing::info!("[Listener] Listening on {}", local_addr);
        let accept_task = tokio::spawn(accept_loop(
            listener,
            Arc::new(absorber),
            Arc::new(cipher),
            tx,
        ));

        Ok(Self {
            local_addr,
            incoming,
            accept_task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Next connection that passed prefix absorption and the cipher handshake
    pub async fn accept(&mut self) -> Result<Accepted<C::Stream>> {
        self.incoming.recv().await.ok_or(CamoError::ListenerClosed)
    }

    /// Stop accepting; connections already yielded are unaffected
    pub fn close(&mut self) {
        self.accept_task.abort();
        self.incoming.close();
    }
}

impl<C: ServerCipher> Drop for PrefixListener<C> {
    fn drop(&mut self) {
        self.accept_task.abort();
    }
}

async fn accept_loop<C: ServerCipher>(
    listener: TcpListener,
    absorber: Arc<PrefixAbsorber>,
    cipher: Arc<C>,
    tx: mpsc::Sender<Accepted<C::Stream>>,
) {
    loop {
        let (stream, peer_addr) = tokio::select! {
            _ = tx.closed() => {
                tracing::debug!("[Listener] Receiver dropped, stopping accept loop");
                return;
            }
            accepted = listener.accept() => match accepted {
                Ok(accepted) => accepted,
                Err(e) => {
                    tracing::error!("[Listener] Accept error: {}", e);
                    continue;
                }
            },
        };

        let span = info_span!("camo.connection", peer_addr = %peer_addr);
        let absorber = Arc::clone(&absorber);
        let cipher = Arc::clone(&cipher);
        let tx = tx.clone();

        tokio::spawn(
            async move {
                match handle_connection(stream, &absorber, cipher.as_ref()).await {
                    Ok(conn) => {
                        if tx.send((EofOnClose::new(conn), peer_addr)).await.is_err() {
                            tracing::debug!("[Listener] Listener closed before hand-off");
                        }
                    }
                    Err(e) => {
                        tracing::warn!(
                            fault = ?e.kind(),
                            "[Listener] Dropping connection from {}: {}",
                            peer_addr,
                            e
                        );
                    }
                }
            }
            .instrument(span),
        );
    }
}

/// Absorb the prefix, then let the cipher layer take the stream.
///
/// The absorber's deadline bounds both steps together; the cipher handshake
/// only gets what the prefix left of it.
async fn handle_connection<C: ServerCipher>(
    mut stream: TcpStream,
    absorber: &PrefixAbsorber,
    cipher: &C,
) -> Result<C::Stream> {
    tune_socket(&stream, Side::Listener);

    let deadline = absorber.timeout().map(|timeout| (timeout, Instant::now() + timeout));

    let prefix = absorber.absorb(&mut stream).await?;
    tracing::trace!("[Listener] Absorbed {} byte prefix", prefix.len());

    match deadline {
        Some((timeout, deadline)) => timeout_at(deadline, cipher.accept(stream))
            .await
            .map_err(|_| CamoError::HandshakeTimeout { timeout })?,
        None => cipher.accept(stream).await,
    }
}
