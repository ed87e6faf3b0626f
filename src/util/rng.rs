//! Shared random source
//!
//! A single seeded generator guarded by a mutex. The seed is drawn from the OS
//! CSPRNG once, then every draw is a cheap PRNG step. Clones share the same
//! generator state.

use rand::distr::{Alphanumeric, Distribution, Uniform};
use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use std::sync::{Arc, Mutex, MutexGuard};

/// Injectable handle to a shared, mutex-guarded random generator
#[derive(Debug, Clone)]
pub struct RandomSource {
    inner: Arc<Mutex<StdRng>>,
}

impl RandomSource {
    /// Create a source seeded from the operating system
    pub fn from_os() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    /// Like [`RandomSource::from_os`], reporting an unavailable OS source as a
    /// configuration error instead of panicking
    pub fn try_from_os() -> crate::util::Result<Self> {
        StdRng::try_from_os_rng()
            .map(Self::from_rng)
            .map_err(|e| crate::util::CamoError::Config(format!("unable to initialize rng: {}", e)))
    }

    /// Create a deterministic source, for tests and reproducible sampling
    pub fn from_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            inner: Arc::new(Mutex::new(rng)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, StdRng> {
        // Poisoning is ignored; the generator state is always valid.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fill `buf` with random bytes
    pub fn fill(&self, buf: &mut [u8]) {
        self.lock().fill_bytes(buf);
    }

    /// Uniform integer in `[min, max]`
    pub fn range_inclusive(&self, min: usize, max: usize) -> usize {
        if min >= max {
            return min;
        }
        self.lock().random_range(min..=max)
    }

    /// `len` random bytes
    pub fn bytes(&self, len: usize) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        self.fill(&mut buf);
        buf
    }

    /// `len` characters drawn from `[A-Za-z0-9]`
    pub fn alphanumeric(&self, len: usize) -> Vec<u8> {
        let mut rng = self.lock();
        Alphanumeric.sample_iter(&mut *rng).take(len).collect()
    }

    /// `len` characters drawn uniformly from `alphabet`
    pub fn choose_from(&self, alphabet: &[u8], len: usize) -> Vec<u8> {
        if alphabet.is_empty() {
            return Vec::new();
        }
        let Ok(dist) = Uniform::new(0, alphabet.len()) else {
            return Vec::new();
        };
        let mut rng = self.lock();
        (0..len).map(|_| alphabet[dist.sample(&mut *rng)]).collect()
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::from_os()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_inclusive_bounds() {
        let rng = RandomSource::from_seed(7);
        for _ in 0..1000 {
            let n = rng.range_inclusive(2, 22);
            assert!((2..=22).contains(&n));
        }
        assert_eq!(rng.range_inclusive(5, 5), 5);
    }

    #[test]
    fn test_seeded_sources_repeat() {
        let a = RandomSource::from_seed(42);
        let b = RandomSource::from_seed(42);
        assert_eq!(a.bytes(16), b.bytes(16));
    }

    #[test]
    fn test_clones_share_state() {
        let a = RandomSource::from_seed(42);
        let b = a.clone();
        let fresh = RandomSource::from_seed(42);
        let first = a.bytes(8);
        assert_eq!(first, fresh.bytes(8));
        // b continues where a left off
        assert_ne!(b.bytes(8), first);
    }

    #[test]
    fn test_alphanumeric() {
        let rng = RandomSource::from_os();
        let s = rng.alphanumeric(64);
        assert_eq!(s.len(), 64);
        assert!(s.iter().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_choose_from() {
        let rng = RandomSource::from_os();
        let s = rng.choose_from(b"ab", 32);
        assert!(s.iter().all(|c| *c == b'a' || *c == b'b'));
        assert!(rng.choose_from(b"", 4).is_empty());
    }
}
