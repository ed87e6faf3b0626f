//! Client side: connect, write the prefix, hand the stream to the cipher

use crate::prefix::PrefixMaker;
use crate::transport::cipher::ClientCipher;
use crate::transport::config::DialerConfig;
use crate::transport::conn::EofOnClose;
use crate::transport::upstream::UpstreamGenerator;
use crate::transport::socket::{Side, tune_socket};
use crate::util::Result;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Dials the server with a fresh camouflage prefix on every connection
pub struct PrefixDialer<C> {
    addr: String,
    prefix: PrefixMaker,
    upstream: UpstreamGenerator,
    cipher: C,
}

impl<C: ClientCipher> PrefixDialer<C> {
    pub fn new(addr: String, prefix: PrefixMaker, upstream: UpstreamGenerator, cipher: C) -> Self {
        tracing::debug!("[Dialer] Creating dialer for server: {}", addr);
        Self {
            addr,
            prefix,
            upstream,
            cipher,
        }
    }

    /// Build from config; parses the prefix program once, here
    pub fn from_config(config: &DialerConfig, cipher: C) -> Result<Self> {
        let prefix = config.prefix.build()?;
        let upstream = UpstreamGenerator::new(config.upstream.clone())?;
        Ok(Self::new(config.addr.clone(), prefix, upstream, cipher))
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    /// Open one connection.
    ///
    /// The prefix is generated before connecting so a failing program costs no
    /// socket. Nothing is retried here.
    pub async fn dial(&self) -> Result<EofOnClose<C::Stream>> {
        let prefix = self.prefix.make_prefix()?;

        let mut stream = TcpStream::connect(&self.addr).await.map_err(|e| {
            tracing::debug!("[Dialer] Failed to connect to {}: {}", self.addr, e);
            e
        })?;
        tune_socket(&stream, Side::Dialer);

        if !prefix.is_empty() {
            stream.write_all(&prefix).await?;
            tracing::trace!("[Dialer] Wrote {} byte prefix to {}", prefix.len(), self.addr);
        }

        let upstream = self.upstream.new_upstream();
        tracing::trace!("[Dialer] Requesting placeholder upstream {}", upstream);
        let conn = self.cipher.connect(stream, &upstream).await?;

        tracing::debug!("[Dialer] Connection established to {}", self.addr);
        Ok(EofOnClose::new(conn))
    }
}
