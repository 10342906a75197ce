//! Random sources and the deterministic seed hierarchy.
//!
//! Draws can use the operating system's entropy source, a fast userspace
//! generator seeded from entropy, or a seeded generator for reproducible runs.
//! Parallel work derives one sub-seed per `(run_id, stream, index)` tuple via
//! BLAKE3, independently of thread scheduling order, so results are identical
//! regardless of thread count.

use rand::rngs::{OsRng, StdRng};
use rand::{RngCore, SeedableRng};
use serde::{Deserialize, Serialize};

/// Which generator backs a sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RngSource {
    /// Operating system entropy, one request per random value.
    #[default]
    Os,
    /// `StdRng` seeded once from entropy.
    Fast,
    /// `StdRng` with a fixed seed.
    Seeded(u64),
}

impl RngSource {
    /// Instantiate the generator.
    pub fn build(self) -> Box<dyn RngCore + Send> {
        match self {
            RngSource::Os => Box::new(OsRng),
            RngSource::Fast => Box::new(StdRng::from_entropy()),
            RngSource::Seeded(seed) => Box::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// True for sources that repeat across runs.
    pub fn is_deterministic(self) -> bool {
        matches!(self, RngSource::Seeded(_))
    }
}

/// Deterministic seed hierarchy.
///
/// The master seed is expanded into per-(stream, index) sub-seeds using
/// BLAKE3. Because derivation is hash-based (not order-dependent), the same
/// master seed produces identical sub-seeds regardless of the order in which
/// chunks are processed.
#[derive(Debug, Clone)]
pub struct SeedHierarchy {
    master_seed: u64,
}

impl SeedHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    pub fn master_seed(&self) -> u64 {
        self.master_seed
    }

    /// Derive a deterministic sub-seed for a specific (run_id, stream, index).
    pub fn sub_seed(&self, run_id: &str, stream: &str, index: u64) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(run_id.as_bytes());
        hasher.update(&[0]);
        hasher.update(stream.as_bytes());
        hasher.update(&index.to_le_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    /// Create a seeded StdRng from a sub-seed.
    pub fn rng_for(&self, run_id: &str, stream: &str, index: u64) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(run_id, stream, index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn sub_seeds_are_deterministic() {
        let hierarchy = SeedHierarchy::new(42);
        let s1 = hierarchy.sub_seed("run", "validate", 0);
        let s2 = hierarchy.sub_seed("run", "validate", 0);
        assert_eq!(s1, s2);
    }

    #[test]
    fn different_indices_different_seeds() {
        let hierarchy = SeedHierarchy::new(42);
        let i0 = hierarchy.sub_seed("run", "validate", 0);
        let i1 = hierarchy.sub_seed("run", "validate", 1);
        assert_ne!(i0, i1);
    }

    #[test]
    fn stream_boundary_is_unambiguous() {
        let hierarchy = SeedHierarchy::new(42);
        assert_ne!(
            hierarchy.sub_seed("ab", "c", 0),
            hierarchy.sub_seed("a", "bc", 0)
        );
    }

    #[test]
    fn different_master_seeds_different_output() {
        let h1 = SeedHierarchy::new(42);
        let h2 = SeedHierarchy::new(43);
        assert_ne!(h1.sub_seed("run", "x", 0), h2.sub_seed("run", "x", 0));
    }

    #[test]
    fn seeded_source_repeats() {
        let mut a = RngSource::Seeded(7).build();
        let mut b = RngSource::Seeded(7).build();
        let xs: Vec<f64> = (0..8).map(|_| a.gen()).collect();
        let ys: Vec<f64> = (0..8).map(|_| b.gen()).collect();
        assert_eq!(xs, ys);
        assert!(RngSource::Seeded(7).is_deterministic());
        assert!(!RngSource::Os.is_deterministic());
    }

    #[test]
    fn entropy_sources_produce_unit_values() {
        for source in [RngSource::Os, RngSource::Fast] {
            let mut rng = source.build();
            for _ in 0..100 {
                let v: f64 = rng.gen();
                assert!((0.0..1.0).contains(&v));
            }
        }
    }
}
