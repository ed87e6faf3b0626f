//! Transport adapter: prefixes wired around the cipher layer

/// Cipher layer seams and the bundled `plain` method
pub mod cipher;
/// Dialer and listener configuration
pub mod config;
/// Close-error smoothing
pub mod conn;
pub mod dialer;
pub mod listener;
/// Socket options shared by dialer and listener
mod socket;
/// Placeholder upstream addresses
pub mod upstream;

pub use cipher::*;
pub use config::*;
pub use conn::*;
pub use dialer::*;
pub use listener::*;
pub use upstream::*;

use crate::util::Result;

/// Entry point mirroring a pluggable transport: config in, dialer or listener out.
///
/// Uses [`PlainCipher`]; pass a cipher to [`PrefixDialer::from_config`] or
/// [`PrefixListener::from_config`] for anything else.
#[derive(Debug, Clone, Copy, Default)]
pub struct Transport;

impl Transport {
    pub fn new_dialer(&self, config: &DialerConfig) -> Result<PrefixDialer<PlainCipher>> {
        let cipher = PlainCipher::from_name(&config.cipher)?;
        PrefixDialer::from_config(config, cipher)
    }

    pub async fn new_listener(&self, config: &ListenerConfig) -> Result<PrefixListener<PlainCipher>> {
        let cipher = PlainCipher::from_name(&config.cipher)?;
        PrefixListener::from_config(config, cipher).await
    }
}
