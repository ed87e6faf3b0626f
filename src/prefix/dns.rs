//! DNS-over-TCP prefix
//!
//! Layout (6 bytes):
//! - message length (2 bytes, big-endian, fixed per deployment)
//! - transaction id (2 bytes, random)
//! - flags `0x0120`: standard query, recursion desired

use crate::prefix::absorb::read_prefix;
use crate::util::{CamoError, Result};
use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::AsyncRead;

/// Message length known to pass on networks that throttle unrecognized
/// Shadowsocks handshakes.
pub const DEFAULT_DNS_MSG_LEN: u16 = 1500;

/// Size of the DNS-over-TCP prefix
pub const DNS_PREFIX_LEN: usize = 6;

/// Flags: standard query, recursion desired
pub const DNS_FLAGS: [u8; 2] = [0x01, 0x20];

/// A validated DNS-over-TCP prefix configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DnsPrefix {
    msg_len: u16,
}

impl DnsPrefix {
    /// Fails with a configuration error when `msg_len` does not fit below `0xFFFF`
    pub fn new(msg_len: usize) -> Result<Self> {
        if msg_len >= 0xffff {
            return Err(CamoError::Config(format!(
                "Invalid DNS-over-TCP message length {}",
                msg_len
            )));
        }
        Ok(Self {
            msg_len: msg_len as u16,
        })
    }

    pub fn msg_len(&self) -> u16 {
        self.msg_len
    }

    /// Build a prefix with a fresh transaction id
    pub fn make(&self) -> Bytes {
        let txid: [u8; 2] = rand::random();

        let mut buf = BytesMut::with_capacity(DNS_PREFIX_LEN);
        buf.put_u16(self.msg_len);
        buf.put_slice(&txid);
        buf.put_slice(&DNS_FLAGS);
        buf.freeze()
    }

    /// Read and validate a prefix; the transaction id is not checked
    pub async fn absorb<R: AsyncRead + Unpin>(&self, reader: &mut R) -> Result<Bytes> {
        let prefix = read_prefix(reader, DNS_PREFIX_LEN).await?;

        let actual_len = u16::from_be_bytes([prefix[0], prefix[1]]);
        if actual_len != self.msg_len {
            return Err(CamoError::DnsLength {
                expected: self.msg_len,
                actual: actual_len,
            });
        }

        if prefix[4..6] != DNS_FLAGS {
            return Err(CamoError::DnsFlags {
                actual: u16::from_be_bytes([prefix[4], prefix[5]]),
            });
        }

        Ok(prefix)
    }
}

impl Default for DnsPrefix {
    fn default() -> Self {
        Self {
            msg_len: DEFAULT_DNS_MSG_LEN,
        }
    }
}

/// Build a DNS-over-TCP prefix for `msg_len`
pub fn make_dns_prefix(msg_len: usize) -> Result<Bytes> {
    Ok(DnsPrefix::new(msg_len)?.make())
}

/// Read a DNS-over-TCP prefix for `msg_len` from `reader`
pub async fn absorb_dns_prefix<R: AsyncRead + Unpin>(reader: &mut R, msg_len: u16) -> Result<Bytes> {
    DnsPrefix::new(msg_len as usize)?.absorb(reader).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::FaultKind;

    #[tokio::test]
    async fn test_round_trip() {
        for _ in 0..100 {
            let prefix = make_dns_prefix(DEFAULT_DNS_MSG_LEN as usize).unwrap();
            let mut reader = &prefix[..];
            let absorbed = absorb_dns_prefix(&mut reader, DEFAULT_DNS_MSG_LEN)
                .await
                .unwrap();
            assert_eq!(absorbed, prefix);
        }
    }

    #[test]
    fn test_layout() {
        let prefix = make_dns_prefix(0x1234).unwrap();
        assert_eq!(prefix.len(), DNS_PREFIX_LEN);
        assert_eq!(DnsPrefix::new(0x1234).unwrap().msg_len(), 0x1234);
        assert_eq!(DnsPrefix::default().msg_len(), DEFAULT_DNS_MSG_LEN);
        assert_eq!(&prefix[..2], &[0x12, 0x34]);
        assert_eq!(&prefix[4..], &DNS_FLAGS);
    }

    #[test]
    fn test_length_limit() {
        assert!(make_dns_prefix(0xfffe).is_ok());
        for len in [0xffff, 0x10000, usize::MAX] {
            let err = make_dns_prefix(len).unwrap_err();
            assert_eq!(err.kind(), FaultKind::Config);
        }
    }

    #[tokio::test]
    async fn test_transaction_id_ignored() {
        let mut reader: &[u8] = &[0x05, 0xdc, 0xde, 0xad, 0x01, 0x20, 0xff];
        let absorbed = absorb_dns_prefix(&mut reader, 1500).await.unwrap();
        assert_eq!(&absorbed[..], &[0x05, 0xdc, 0xde, 0xad, 0x01, 0x20]);
        // only the prefix is consumed
        assert_eq!(reader, &[0xff]);
    }

    #[tokio::test]
    async fn test_length_mismatch() {
        let mut reader: &[u8] = &[0x05, 0xdd, 0x00, 0x00, 0x01, 0x20];
        match absorb_dns_prefix(&mut reader, 1500).await {
            Err(CamoError::DnsLength { expected, actual }) => {
                assert_eq!(expected, 1500);
                assert_eq!(actual, 1501);
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_flags_mismatch() {
        let mut reader: &[u8] = &[0x05, 0xdc, 0x00, 0x00, 0x01, 0x00];
        let err = absorb_dns_prefix(&mut reader, 1500).await.unwrap_err();
        assert!(matches!(err, CamoError::DnsFlags { actual: 0x0100 }));
        assert_eq!(err.kind(), FaultKind::Protocol);
    }

    #[tokio::test]
    async fn test_short_read() {
        let mut reader: &[u8] = &[0x05, 0xdc, 0x00];
        let err = absorb_dns_prefix(&mut reader, 1500).await.unwrap_err();
        assert!(matches!(err, CamoError::ShortPrefix { expected: 6, .. }));
    }
}
