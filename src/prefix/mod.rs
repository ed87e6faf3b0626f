//! Protocol camouflage prefixes
//!
//! The sending side writes a prefix ahead of the encrypted handshake; the
//! prefix carries no length of its own, so the receiving side must be
//! configured to know how many bytes to strip.

/// Receiving side absorbers
pub mod absorb;
/// DNS-over-TCP prefix codec
pub mod dns;

pub use absorb::*;
pub use dns::*;

use crate::generator::Generator;
use crate::util::Result;
use bytes::Bytes;

/// Upper bound on any generated prefix
pub const MAX_PREFIX_LEN: usize = 16 * 1024;

/// Sending side: produces one prefix per outbound connection
#[derive(Debug, Clone, Default)]
pub enum PrefixMaker {
    /// No prefix
    #[default]
    None,
    /// The same bytes every time
    Fixed(Bytes),
    /// A generator program, re-run on every call
    Generator(Generator),
    /// DNS-over-TCP header with a random transaction id
    DnsOverTcp(DnsPrefix),
}

impl PrefixMaker {
    /// Produce the prefix for one connection attempt.
    ///
    /// Must be called once per attempt; prefixes are never reused across retries.
    pub fn make_prefix(&self) -> Result<Bytes> {
        match self {
            PrefixMaker::None => Ok(Bytes::new()),
            PrefixMaker::Fixed(bytes) => Ok(bytes.clone()),
            PrefixMaker::Generator(generator) => generator.generate(),
            PrefixMaker::DnsOverTcp(dns) => Ok(dns.make()),
        }
    }

    /// The absorb policy a peer can use to strip this maker's prefixes.
    ///
    /// Static programs pair with an exact match, randomized programs of a fixed
    /// length with a length-only absorber. `None` means the length varies from
    /// one connection to the next and no absorber can strip the prefix.
    pub fn matching_policy(&self) -> Option<AbsorbPolicy> {
        match self {
            PrefixMaker::None => Some(AbsorbPolicy::None),
            PrefixMaker::Fixed(bytes) => Some(AbsorbPolicy::Exact(bytes.clone())),
            PrefixMaker::Generator(generator) if generator.program().is_static() => {
                generator.generate().ok().map(AbsorbPolicy::Exact)
            }
            PrefixMaker::Generator(generator) => {
                generator.program().fixed_len().map(AbsorbPolicy::Length)
            }
            PrefixMaker::DnsOverTcp(dns) => Some(AbsorbPolicy::DnsOverTcp(*dns)),
        }
    }
}
