//! Cipher layer seams
//!
//! Encryption, trial decryption over several keys and salt replay tracking are
//! provided by an external Shadowsocks implementation. The transport only
//! needs two hooks: wrap a dialed stream whose prefix has been written, and
//! wrap an accepted stream whose prefix has been absorbed.
//!
//! [`PlainCipher`] implements the Shadowsocks `plain` method: a target address
//! header followed by unencrypted data. It is useful for testing deployments
//! and for running the prefix layer behind a separate encrypting hop.

use crate::util::{CamoError, Result};
use std::future::Future;
use std::io;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadBuf};
use tokio::net::TcpStream;

const ATYP_IPV4: u8 = 0x01;
const ATYP_DOMAIN: u8 = 0x03;
const ATYP_IPV6: u8 = 0x04;

/// Client half of the cipher layer
pub trait ClientCipher: Send + Sync + 'static {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Wrap `stream`, whose prefix has already been written, and request `target`
    fn connect(
        &self,
        stream: TcpStream,
        target: &str,
    ) -> impl Future<Output = Result<Self::Stream>> + Send;
}

/// Server half of the cipher layer
pub trait ServerCipher: Send + Sync + 'static {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Wrap `stream`, whose prefix has already been absorbed
    fn accept(&self, stream: TcpStream) -> impl Future<Output = Result<Self::Stream>> + Send;
}

/// Cipher identifiers the bundled [`PlainCipher`] answers to
pub const PLAIN_CIPHERS: &[&str] = &["plain", "none"];

/// Shadowsocks `plain` method
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainCipher;

impl PlainCipher {
    /// Accepts the identifiers in [`PLAIN_CIPHERS`]
    pub fn from_name(name: &str) -> Result<Self> {
        if PLAIN_CIPHERS.contains(&name) {
            Ok(PlainCipher)
        } else {
            Err(CamoError::Config(format!(
                "unsupported cipher '{}'; supply a cipher implementation for it",
                name
            )))
        }
    }
}

/// Stream produced by [`PlainCipher`], carrying the requested target
#[derive(Debug)]
pub struct PlainStream {
    inner: TcpStream,
    target: String,
}

impl PlainStream {
    /// The `host:port` the client asked for
    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn get_ref(&self) -> &TcpStream {
        &self.inner
    }
}

impl ClientCipher for PlainCipher {
    type Stream = PlainStream;

    async fn connect(&self, mut stream: TcpStream, target: &str) -> Result<PlainStream> {
        let header = encode_target(target)?;
        stream.write_all(&header).await?;
        Ok(PlainStream {
            inner: stream,
            target: target.to_string(),
        })
    }
}

impl ServerCipher for PlainCipher {
    type Stream = PlainStream;

    async fn accept(&self, mut stream: TcpStream) -> Result<PlainStream> {
        let target = read_target(&mut stream).await?;
        Ok(PlainStream {
            inner: stream,
            target,
        })
    }
}

/// Encode `host:port` as `[ATYP | ADDR | PORT]`
pub fn encode_target(target: &str) -> Result<Vec<u8>> {
    let (host, port) = target
        .rsplit_once(':')
        .ok_or_else(|| CamoError::Cipher(format!("target '{}' has no port", target)))?;
    let port = port
        .parse::<u16>()
        .map_err(|_| CamoError::Cipher(format!("invalid port in target '{}'", target)))?;
    let host = host.trim_start_matches('[').trim_end_matches(']');

    let mut buf = Vec::with_capacity(host.len() + 4);
    if let Ok(ipv4) = host.parse::<Ipv4Addr>() {
        buf.push(ATYP_IPV4);
        buf.extend_from_slice(&ipv4.octets());
    } else if let Ok(ipv6) = host.parse::<Ipv6Addr>() {
        buf.push(ATYP_IPV6);
        buf.extend_from_slice(&ipv6.octets());
    } else {
        let domain = host.as_bytes();
        if domain.is_empty() || domain.len() > 255 {
            return Err(CamoError::Cipher(format!(
                "invalid domain length {}",
                domain.len()
            )));
        }
        buf.push(ATYP_DOMAIN);
        buf.push(domain.len() as u8);
        buf.extend_from_slice(domain);
    }
    buf.extend_from_slice(&port.to_be_bytes());
    Ok(buf)
}

/// Read an `[ATYP | ADDR | PORT]` header and return `host:port`
pub async fn read_target<R: AsyncRead + Unpin>(reader: &mut R) -> Result<String> {
    let atyp = reader.read_u8().await?;
    let host = match atyp {
        ATYP_IPV4 => {
            let mut ip = [0u8; 4];
            reader.read_exact(&mut ip).await?;
            IpAddr::V4(Ipv4Addr::from(ip)).to_string()
        }
        ATYP_DOMAIN => {
            let len = reader.read_u8().await? as usize;
            if len == 0 {
                return Err(CamoError::Cipher("invalid domain length 0".to_string()));
            }
            let mut domain = vec![0u8; len];
            reader.read_exact(&mut domain).await?;
            String::from_utf8(domain)
                .map_err(|e| CamoError::Cipher(format!("invalid domain name: {}", e)))?
        }
        ATYP_IPV6 => {
            let mut ip = [0u8; 16];
            reader.read_exact(&mut ip).await?;
            format!("[{}]", Ipv6Addr::from(ip))
        }
        other => {
            return Err(CamoError::Cipher(format!(
                "unsupported address type: 0x{:02x}",
                other
            )));
        }
    };
    let port = reader.read_u16().await?;
    Ok(format!("{}:{}", host, port))
}

impl AsyncRead for PlainStream {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl AsyncWrite for PlainStream {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}
