//! Random number generator abstraction for determinism.
//!
//! Typewriter jitter, comic tilt and particle placement all draw from this
//! trait. Production wraps a real RNG; tests inject a fixed one.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub trait DeterministicRng {
    /// Generate a random `u32` in the range `[min, max]` inclusive.
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32;

    /// Generate a random `f64` in `[0.0, 1.0)`.
    fn next_f64(&mut self) -> f64;
}

/// Production RNG seeded from the OS.
#[derive(Debug)]
pub struct SystemRng(StdRng);

impl SystemRng {
    pub fn new() -> Self {
        SystemRng(StdRng::from_entropy())
    }

    pub fn seeded(seed: u64) -> Self {
        SystemRng(StdRng::seed_from_u64(seed))
    }
}

impl Default for SystemRng {
    fn default() -> Self {
        Self::new()
    }
}

impl DeterministicRng for SystemRng {
    fn next_u32_range(&mut self, min: u32, max: u32) -> u32 {
        if min >= max {
            return min;
        }
        self.0.gen_range(min..=max)
    }

    fn next_f64(&mut self) -> f64 {
        self.0.r#gen::<f64>()
    }
}

/// Symmetric jitter in `[-spread/2, +spread/2]` milliseconds.
pub fn jitter(rng: &mut dyn DeterministicRng, spread_ms: u64) -> f64 {
    rng.next_f64() * spread_ms as f64 - spread_ms as f64 / 2.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_rng_stays_in_range() {
        let mut rng = SystemRng::seeded(7);
        for _ in 0..200 {
            let v = rng.next_u32_range(3, 5);
            assert!((3..=5).contains(&v));
            let f = rng.next_f64();
            assert!((0.0..1.0).contains(&f));
            let j = jitter(&mut rng, 20);
            assert!((-10.0..=10.0).contains(&j));
        }
    }

    #[test]
    fn degenerate_range_returns_min() {
        let mut rng = SystemRng::seeded(1);
        assert_eq!(rng.next_u32_range(4, 4), 4);
        assert_eq!(rng.next_u32_range(9, 2), 9);
    }
}
