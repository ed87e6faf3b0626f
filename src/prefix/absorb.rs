//! Receiving side: strip the prefix before the cipher layer sees the stream

use crate::prefix::MAX_PREFIX_LEN;
use crate::prefix::dns::DnsPrefix;
use crate::util::{CamoError, Result};
use bytes::{Bytes, BytesMut};
use std::io;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt};

/// Read exactly `len` bytes; any shortfall is a protocol fault.
pub(crate) async fn read_prefix<R: AsyncRead + Unpin>(reader: &mut R, len: usize) -> Result<Bytes> {
    if len > MAX_PREFIX_LEN {
        return Err(CamoError::AbsorbTooLarge {
            size: len,
            limit: MAX_PREFIX_LEN,
        });
    }
    let mut buf = BytesMut::zeroed(len);
    reader
        .read_exact(&mut buf)
        .await
        .map_err(|source| CamoError::ShortPrefix {
            expected: len,
            source,
        })?;
    Ok(buf.freeze())
}

/// Read `expected.len()` bytes and require them to equal `expected`
pub async fn absorb_exact<R: AsyncRead + Unpin>(reader: &mut R, expected: &[u8]) -> Result<Bytes> {
    let actual = read_prefix(reader, expected.len()).await?;
    if actual[..] != *expected {
        return Err(CamoError::PrefixMismatch {
            expected: hex::encode(expected),
            actual: hex::encode(&actual),
        });
    }
    Ok(actual)
}

/// Read `size` bytes without looking at them
pub async fn absorb_len<R: AsyncRead + Unpin>(reader: &mut R, size: usize) -> Result<Bytes> {
    read_prefix(reader, size).await
}

/// How a listener recognizes the prefix its dialers send
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AbsorbPolicy {
    /// No prefix expected
    #[default]
    None,
    /// Constant prefix, compared byte for byte
    Exact(Bytes),
    /// Randomized prefix of known length, content unchecked
    Length(usize),
    /// DNS-over-TCP header with the given message length
    DnsOverTcp(DnsPrefix),
}

impl AbsorbPolicy {
    /// Number of bytes this policy consumes
    pub fn prefix_len(&self) -> usize {
        match self {
            AbsorbPolicy::None => 0,
            AbsorbPolicy::Exact(expected) => expected.len(),
            AbsorbPolicy::Length(size) => *size,
            AbsorbPolicy::DnsOverTcp(_) => crate::prefix::dns::DNS_PREFIX_LEN,
        }
    }
}

/// Strip a prefix from `reader` according to `policy`
pub async fn absorb_prefix<R: AsyncRead + Unpin>(reader: &mut R, policy: &AbsorbPolicy) -> Result<Bytes> {
    match policy {
        AbsorbPolicy::None => Ok(Bytes::new()),
        AbsorbPolicy::Exact(expected) => absorb_exact(reader, expected).await,
        AbsorbPolicy::Length(size) => absorb_len(reader, *size).await,
        AbsorbPolicy::DnsOverTcp(dns) => dns.absorb(reader).await,
    }
}

/// Policy plus the deadline for the whole prefix to arrive
#[derive(Debug, Clone, Default)]
pub struct PrefixAbsorber {
    policy: AbsorbPolicy,
    timeout: Option<Duration>,
}

impl PrefixAbsorber {
    pub fn new(policy: AbsorbPolicy) -> Self {
        Self {
            policy,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn policy(&self) -> &AbsorbPolicy {
        &self.policy
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Strip the prefix. A timeout is reported like a short read.
    pub async fn absorb<R: AsyncRead + Unpin>(&self, reader: &mut R) -> Result<Bytes> {
        let Some(timeout) = self.timeout else {
            return absorb_prefix(reader, &self.policy).await;
        };

        match tokio::time::timeout(timeout, absorb_prefix(reader, &self.policy)).await {
            Ok(result) => result,
            Err(_) => Err(CamoError::ShortPrefix {
                expected: self.policy.prefix_len(),
                source: io::Error::new(
                    io::ErrorKind::TimedOut,
                    format!("prefix not received within {:?}", timeout),
                ),
            }),
        }
    }
}
