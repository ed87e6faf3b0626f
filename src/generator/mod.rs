//! Prefix generator programs
//!
//! A generator is a rudimentary program describing how to build a prefix:
//! a version specifier followed by literal text mixed with builtin calls.
//!
//! ```text
//! httpGet    = v1.0 GET /$random_string(5, 10) HTTP/1.1
//! dnsOverTCP = v1.0 $hex(05DC)$random_bytes(2, 2)$hex(0120)
//! ```
//!
//! The version specifier drives parsing decisions and is left out of the
//! output. Programs are parsed once; every [`Generator::generate`] call runs
//! the builtins again, so randomized programs yield a fresh prefix each time.

/// Builtin registry and the standard builtins
pub mod builtins;
/// Program parser
pub mod parser;
/// Parsed program and interpreter
pub mod program;

pub use builtins::*;
pub use parser::*;
pub use program::*;

use crate::util::{RandomSource, Result};
use bytes::Bytes;
use std::sync::Arc;

/// A parsed program bound to a random source
#[derive(Debug, Clone)]
pub struct Generator {
    program: Arc<Program>,
    rng: RandomSource,
}

impl Generator {
    /// Parse `text` against the standard builtins with an OS-seeded source
    pub fn new(text: &str) -> Result<Self> {
        Self::with_builtins(text, Builtins::standard(), RandomSource::from_os())
    }

    pub fn with_builtins(text: &str, builtins: &Builtins, rng: RandomSource) -> Result<Self> {
        let program = parse(text, builtins)?;
        Ok(Self {
            program: Arc::new(program),
            rng,
        })
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    /// Produce one prefix
    pub fn generate(&self) -> Result<Bytes> {
        self.program.evaluate(&self.rng)
    }
}
