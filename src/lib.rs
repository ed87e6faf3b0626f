//! Protocol camouflage prefixes for Shadowsocks-style tunnels
//!
//! A dialer writes a synthetic prefix (a fake DNS-over-TCP header, an HTTP
//! request line, ...) before the encrypted handshake so that middleboxes see
//! something other than a recognizable proxy handshake. The listener strips
//! the same number of bytes before the cipher layer takes over.
//!
//! # Architecture
//!
//! - **generator**: prefix program parser, builtins and interpreter
//! - **prefix**: prefix makers, absorbers and the DNS-over-TCP codec
//! - **transport**: dialer/listener wiring around the cipher layer
//! - **util**: Utilities (error handling, random source, settings map)

/// Generator programs: parser, builtins and interpreter
pub mod generator;
/// Prefix makers and absorbers
pub mod prefix;
/// Dialer and listener wiring
pub mod transport;
/// Utility modules (error, random source, settings map)
pub mod util;

pub use generator::{Builtins, Generator, parse};
pub use prefix::*;
pub use transport::*;

// Re-export commonly used types
pub use util::error::{CamoError, FaultKind, Result};
pub use util::{RandomSource, StringMap};
