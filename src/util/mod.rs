/// String-based key-value map implementation
pub mod string_map;
/// Error types and Result alias
pub mod error;
/// Shared random source
pub mod rng;

pub use string_map::*;
pub use error::*;
pub use rng::*;
