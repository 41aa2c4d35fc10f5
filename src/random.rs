//! Uniform random samples for draws and particle placement.

use crate::CHANCE;

/// Source of uniform samples in `[0, 1)`.
pub trait RandomSource {
    fn next_unit(&mut self) -> f64;
}

/// Maps one uniform sample onto the fixed `CHANCE`-sided draw. Only the lowest
/// bucket counts as a hit, so the success probability is `1 / CHANCE`.
pub fn is_hit(sample: f64) -> bool {
    (sample * CHANCE as f64).floor() as u32 == 0
}

/// Sample returned when the entropy source fails. Lands in a miss bucket.
const FALLBACK_SAMPLE: f64 = 0.5;

/// Browser-backed source (`crypto.getRandomValues` through getrandom's `js` backend).
#[derive(Debug, Default)]
pub struct CryptoRandom;

impl RandomSource for CryptoRandom {
    fn next_unit(&mut self) -> f64 {
        let mut buf = [0u8; 8];
        match getrandom::getrandom(&mut buf) {
            Ok(()) => unit_from_bits(u64::from_le_bytes(buf)),
            Err(e) => {
                crate::log::error(&format!("entropy source failed: {e}"));
                FALLBACK_SAMPLE
            }
        }
    }
}

// Top 53 bits become the mantissa, giving an evenly spaced value in [0, 1).
fn unit_from_bits(bits: u64) -> f64 {
    (bits >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
}

/// Replays a fixed list of samples, cycling when exhausted.
#[cfg(test)]
pub(crate) struct Scripted {
    samples: Vec<f64>,
    pos: usize,
}

#[cfg(test)]
impl Scripted {
    pub(crate) fn new(samples: &[f64]) -> Self {
        Self {
            samples: samples.to_vec(),
            pos: 0,
        }
    }
}

#[cfg(test)]
impl RandomSource for Scripted {
    fn next_unit(&mut self) -> f64 {
        let v = self.samples[self.pos % self.samples.len()];
        self.pos += 1;
        v
    }
}
