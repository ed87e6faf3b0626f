use thiserror::Error;

/// Camouflage transport errors
#[derive(Error, Debug)]
pub enum CamoError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid static configuration (fatal at startup)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed or unsupported generator program (fatal at load time)
    #[error("Generator parse error: {0}")]
    Parse(String),

    /// A builtin failed during one generator invocation
    #[error("Builtin ${name} failed: {reason}")]
    Builtin { name: String, reason: String },

    #[error("Prefix too large: {size} bytes exceeds limit of {limit}")]
    PrefixTooLarge { size: usize, limit: usize },

    /// Connection closed or timed out before the whole prefix arrived
    #[error("Short prefix: expected {expected} bytes: {source}")]
    ShortPrefix {
        expected: usize,
        #[source]
        source: std::io::Error,
    },

    /// Absorb length beyond what any prefix may be
    #[error("Absorb length {size} exceeds limit of {limit}")]
    AbsorbTooLarge { size: usize, limit: usize },

    /// Peer did not finish prefix plus cipher handshake in time
    #[error("Handshake not completed within {timeout:?}")]
    HandshakeTimeout { timeout: std::time::Duration },

    #[error("Invalid prefix. Expected {expected} but got {actual}")]
    PrefixMismatch { expected: String, actual: String },

    #[error("Invalid prefix length (expected {expected}; got {actual})")]
    DnsLength { expected: u16, actual: u16 },

    #[error("Invalid prefix flags (expected 0x0120; got 0x{actual:04x})")]
    DnsFlags { actual: u16 },

    /// Failure reported by the cipher collaborator
    #[error("Cipher error: {0}")]
    Cipher(String),

    #[error("Listener closed")]
    ListenerClosed,
}

/// Fault classes callers use to decide between abandoning the configuration,
/// the connection attempt, or the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    Config,
    Parse,
    Runtime,
    Protocol,
    Io,
}

impl CamoError {
    pub fn kind(&self) -> FaultKind {
        match self {
            CamoError::Config(_) => FaultKind::Config,
            CamoError::Parse(_) => FaultKind::Parse,
            CamoError::Builtin { .. } | CamoError::PrefixTooLarge { .. } => FaultKind::Runtime,
            CamoError::ShortPrefix { .. }
            | CamoError::AbsorbTooLarge { .. }
            | CamoError::HandshakeTimeout { .. }
            | CamoError::PrefixMismatch { .. }
            | CamoError::DnsLength { .. }
            | CamoError::DnsFlags { .. }
            | CamoError::Cipher(_) => FaultKind::Protocol,
            CamoError::Io(_) | CamoError::ListenerClosed => FaultKind::Io,
        }
    }

    /// True for faults that only concern a single connection attempt.
    pub fn is_per_connection(&self) -> bool {
        !matches!(self.kind(), FaultKind::Config | FaultKind::Parse)
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CamoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_kinds() {
        assert_eq!(CamoError::Config("x".into()).kind(), FaultKind::Config);
        assert_eq!(CamoError::Parse("x".into()).kind(), FaultKind::Parse);
        assert_eq!(
            CamoError::DnsLength { expected: 1500, actual: 1 }.kind(),
            FaultKind::Protocol
        );
        assert!(!CamoError::Parse("x".into()).is_per_connection());
        assert!(
            CamoError::Builtin {
                name: "hex".into(),
                reason: "bad".into()
            }
            .is_per_connection()
        );
    }

    #[test]
    fn test_dns_flags_display() {
        let err = CamoError::DnsFlags { actual: 0x0100 };
        assert_eq!(
            err.to_string(),
            "Invalid prefix flags (expected 0x0120; got 0x0100)"
        );
    }
}
