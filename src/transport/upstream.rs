//! Placeholder upstream addresses
//!
//! The dialer never asks the server for a real destination; the actual
//! upstream is decided on the far side. A fixed marker would be an easy
//! fingerprint, so each dial gets a short random label in front of the
//! configured base name.

use crate::util::{RandomSource, Result};

/// Port appended to every placeholder
pub const UPSTREAM_PORT: u16 = 443;

const LETTERS: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";
const MIN_LABEL_LEN: usize = 2;
const MAX_LABEL_LEN: usize = 22;

/// Generates `<label>.<base>:443` marker addresses
#[derive(Debug, Clone)]
pub struct UpstreamGenerator {
    base: String,
    rng: RandomSource,
}

impl UpstreamGenerator {
    /// Create a generator with a fresh OS-seeded source
    pub fn new(base: impl Into<String>) -> Result<Self> {
        Ok(Self::with_rng(base, RandomSource::try_from_os()?))
    }

    pub fn with_rng(base: impl Into<String>, rng: RandomSource) -> Self {
        Self {
            base: base.into(),
            rng,
        }
    }

    /// A new placeholder; safe to call from any number of tasks
    pub fn new_upstream(&self) -> String {
        let len = self.rng.range_inclusive(MIN_LABEL_LEN, MAX_LABEL_LEN);
        let label = self.rng.choose_from(LETTERS, len);
        // LETTERS is ASCII
        let label = String::from_utf8_lossy(&label);
        format!("{}.{}:{}", label, self.base, UPSTREAM_PORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn split(upstream: &str) -> (&str, &str, &str) {
        let (host, port) = upstream.rsplit_once(':').unwrap();
        let (label, base) = host.split_once('.').unwrap();
        (label, base, port)
    }

    #[test]
    fn test_shape() {
        let generator = UpstreamGenerator::new("local").unwrap();
        for _ in 0..500 {
            let upstream = generator.new_upstream();
            let (label, base, port) = split(&upstream);
            assert!((MIN_LABEL_LEN..=MAX_LABEL_LEN).contains(&label.len()));
            assert!(label.bytes().all(|c| c.is_ascii_alphabetic()));
            assert_eq!(base, "local");
            assert_eq!(port, "443");
        }
    }

    #[test]
    fn test_dotted_base() {
        let generator = UpstreamGenerator::new("cdn.example.com").unwrap();
        let upstream = generator.new_upstream();
        assert!(upstream.ends_with(".cdn.example.com:443"));
    }

    #[test]
    fn test_upstreams_vary() {
        let generator = UpstreamGenerator::new("local").unwrap();
        let seen: HashSet<String> = (0..100).map(|_| generator.new_upstream()).collect();
        assert!(seen.len() > 90);
    }

    #[test]
    fn test_label_lengths_cover_range() {
        let generator = UpstreamGenerator::with_rng("x", RandomSource::from_seed(3));
        let lengths: HashSet<usize> = (0..5000)
            .map(|_| split(&generator.new_upstream()).0.len())
            .collect();
        assert!(lengths.contains(&MIN_LABEL_LEN));
        assert!(lengths.contains(&MAX_LABEL_LEN));
        assert_eq!(lengths.len(), MAX_LABEL_LEN - MIN_LABEL_LEN + 1);
    }

    #[test]
    fn test_concurrent_use() {
        let generator = UpstreamGenerator::new("local").unwrap();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let generator = generator.clone();
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        assert!(generator.new_upstream().ends_with(".local:443"));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
