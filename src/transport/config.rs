//! Dialer and listener configuration
//!
//! Configs deserialize with serde for embedding in a host configuration, or
//! load from `key=value` text (see [`StringMap`]):
//!
//! ```text
//! addr=203.0.113.7:8388
//! secret=correct horse
//! cipher=plain
//! upstream=cdn.example.com
//! prefix=v1.0 GET /$random_string(5, 10) HTTP/1.1\r\n
//! ```

use crate::generator::Generator;
use crate::prefix::{AbsorbPolicy, DnsPrefix, PrefixAbsorber, PrefixMaker};
use crate::util::{CamoError, Result, StringMap};
use bytes::Bytes;
use serde::Deserialize;
use std::time::Duration;

/// Default deadline for a peer to deliver its whole prefix
pub const DEFAULT_ABSORB_TIMEOUT_MS: u64 = 10_000;

fn default_absorb_timeout_ms() -> u64 {
    DEFAULT_ABSORB_TIMEOUT_MS
}

/// Which prefix a dialer writes
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefixConfig {
    #[default]
    None,
    /// Generator program, e.g. `v1.0 GET /$random_string(5, 10) HTTP/1.1`
    Generator(String),
    /// Constant prefix as hex
    Hex(String),
    /// DNS-over-TCP header with this message length
    DnsOverTcp(usize),
}

impl PrefixConfig {
    /// Parse and validate; fails on bad programs, bad hex or bad lengths
    pub fn build(&self) -> Result<PrefixMaker> {
        match self {
            PrefixConfig::None => Ok(PrefixMaker::None),
            PrefixConfig::Generator(program) => Ok(PrefixMaker::Generator(Generator::new(program)?)),
            PrefixConfig::Hex(digits) => Ok(PrefixMaker::Fixed(decode_hex(digits)?)),
            PrefixConfig::DnsOverTcp(msg_len) => Ok(PrefixMaker::DnsOverTcp(DnsPrefix::new(*msg_len)?)),
        }
    }
}

/// Which prefix a listener strips
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsorbConfig {
    #[default]
    None,
    /// Constant prefix as hex, compared byte for byte
    Exact(String),
    /// Number of bytes to discard unchecked
    Length(usize),
    /// DNS-over-TCP header with this message length
    DnsOverTcp(usize),
}

impl AbsorbConfig {
    pub fn build(&self) -> Result<AbsorbPolicy> {
        match self {
            AbsorbConfig::None => Ok(AbsorbPolicy::None),
            AbsorbConfig::Exact(digits) => Ok(AbsorbPolicy::Exact(decode_hex(digits)?)),
            AbsorbConfig::Length(size) => {
                if *size > crate::prefix::MAX_PREFIX_LEN {
                    return Err(CamoError::Config(format!(
                        "absorb length {} exceeds limit of {}",
                        size,
                        crate::prefix::MAX_PREFIX_LEN
                    )));
                }
                Ok(AbsorbPolicy::Length(*size))
            }
            AbsorbConfig::DnsOverTcp(msg_len) => Ok(AbsorbPolicy::DnsOverTcp(DnsPrefix::new(*msg_len)?)),
        }
    }
}

fn decode_hex(digits: &str) -> Result<Bytes> {
    let bytes = hex::decode(digits.trim())
        .map_err(|e| CamoError::Config(format!("invalid hex prefix '{}': {}", digits, e)))?;
    if bytes.len() > crate::prefix::MAX_PREFIX_LEN {
        return Err(CamoError::Config(format!(
            "prefix of {} bytes exceeds limit of {}",
            bytes.len(),
            crate::prefix::MAX_PREFIX_LEN
        )));
    }
    Ok(Bytes::from(bytes))
}

fn required(map: &StringMap, key: &str) -> Result<String> {
    map.get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| CamoError::Config(format!("missing '{}'", key)))
}

fn parsed<T>(map: &StringMap, key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    map.get_parsed(key).map_err(CamoError::Config)
}

/// Pick at most one of several mutually exclusive keys
fn exclusive<'a>(map: &'a StringMap, keys: &[&'a str]) -> Result<Option<(&'a str, &'a str)>> {
    let present: Vec<(&str, &str)> = keys
        .iter()
        .filter_map(|key| map.get(key).map(|value| (*key, value)))
        .collect();
    match present.as_slice() {
        [] => Ok(None),
        [one] => Ok(Some(*one)),
        _ => Err(CamoError::Config(format!(
            "only one of {} may be set",
            keys.join(", ")
        ))),
    }
}

/// Client side settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DialerConfig {
    /// Server `host:port`
    pub addr: String,
    /// Shared key material, handed to the cipher layer
    pub secret: String,
    /// Cipher identifier, handed to the cipher layer
    pub cipher: String,
    /// Base name for placeholder upstream addresses
    pub upstream: String,
    #[serde(default)]
    pub prefix: PrefixConfig,
}

impl DialerConfig {
    /// Load from `key=value` settings.
    ///
    /// Prefix keys (at most one): `prefix` (generator program), `prefix_hex`,
    /// `prefix_dns` (message length).
    pub fn from_string_map(map: &StringMap) -> Result<Self> {
        let prefix = match exclusive(map, &["prefix", "prefix_hex", "prefix_dns"])? {
            None => PrefixConfig::None,
            Some(("prefix", program)) => PrefixConfig::Generator(program.to_string()),
            Some(("prefix_hex", digits)) => PrefixConfig::Hex(digits.to_string()),
            Some((_, _)) => PrefixConfig::DnsOverTcp(
                parsed(map, "prefix_dns")?.unwrap_or(crate::prefix::DEFAULT_DNS_MSG_LEN as usize),
            ),
        };

        Ok(Self {
            addr: required(map, "addr")?,
            secret: map.get("secret").unwrap_or_default().to_string(),
            cipher: required(map, "cipher")?,
            upstream: required(map, "upstream")?,
            prefix,
        })
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_string_map(&StringMap::from_bytes(data))
    }
}

/// Server side settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ListenerConfig {
    /// Listen `host:port`
    pub addr: String,
    /// Shared key material, handed to the cipher layer
    pub secret: String,
    /// Cipher identifier, handed to the cipher layer
    pub cipher: String,
    /// Salt history size for replay detection in the cipher layer
    #[serde(default)]
    pub replay_history: usize,
    #[serde(default)]
    pub absorb: AbsorbConfig,
    #[serde(default = "default_absorb_timeout_ms")]
    pub absorb_timeout_ms: u64,
}

impl ListenerConfig {
    /// Load from `key=value` settings.
    ///
    /// Absorb keys (at most one): `absorb_hex`, `absorb_len`, `absorb_dns`.
    /// An empty `absorb_dns` means the default message length.
    pub fn from_string_map(map: &StringMap) -> Result<Self> {
        let absorb = match exclusive(map, &["absorb_hex", "absorb_len", "absorb_dns"])? {
            None => AbsorbConfig::None,
            Some(("absorb_hex", digits)) => AbsorbConfig::Exact(digits.to_string()),
            Some(("absorb_len", _)) => AbsorbConfig::Length(
                parsed(map, "absorb_len")?
                    .ok_or_else(|| CamoError::Config("'absorb_len' needs a length".to_string()))?,
            ),
            Some((_, _)) => AbsorbConfig::DnsOverTcp(
                parsed(map, "absorb_dns")?.unwrap_or(crate::prefix::DEFAULT_DNS_MSG_LEN as usize),
            ),
        };

        Ok(Self {
            addr: required(map, "addr")?,
            secret: map.get("secret").unwrap_or_default().to_string(),
            cipher: required(map, "cipher")?,
            replay_history: parsed(map, "replay_history")?.unwrap_or(0),
            absorb,
            absorb_timeout_ms: parsed(map, "absorb_timeout_ms")?.unwrap_or(DEFAULT_ABSORB_TIMEOUT_MS),
        })
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::from_string_map(&StringMap::from_bytes(data))
    }

    /// Build the absorber described by this config
    pub fn absorber(&self) -> Result<PrefixAbsorber> {
        let absorber = PrefixAbsorber::new(self.absorb.build()?);
        Ok(match self.absorb_timeout_ms {
            0 => absorber,
            ms => absorber.with_timeout(Duration::from_millis(ms)),
        })
    }
}
