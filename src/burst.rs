//! Falling-particle burst shown on a successful draw.
//!
//! A burst is a fixed batch of randomized particle descriptors. The view turns each
//! one into a falling glyph; the burst clears itself after `BURST_LIFETIME_MS`.

use crate::random::RandomSource;
use crate::session::OneShot;

pub const BURST_SIZE: usize = 20;
pub const BURST_LIFETIME_MS: f64 = 4_000.0;

const SIZE_MIN_PX: f64 = 24.0;
const SIZE_SPAN_PX: f64 = 32.0;
const DURATION_MIN_S: f64 = 3.0;
const DURATION_SPAN_S: f64 = 2.0;

/// One falling glyph.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Particle {
    pub id: u64,
    /// Horizontal position as a percentage of the container width, 0..=100.
    pub left: f64,
    /// Glyph size in px, 24..=56.
    pub size: f64,
    /// Fall duration in seconds, 3..=5.
    pub duration: f64,
}

#[derive(Debug, Default)]
pub struct Burst {
    particles: Vec<Particle>,
    clear: OneShot,
}

impl Burst {
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn is_active(&self) -> bool {
        !self.particles.is_empty()
    }

    /// Replaces the active burst with a fresh one and re-arms the clear timer.
    /// Ids are drawn from `next_id`, which is advanced past the new batch.
    pub fn trigger(&mut self, rng: &mut dyn RandomSource, next_id: &mut u64, now: f64) {
        self.particles = spawn_particles(rng, next_id);
        self.clear.arm(now, BURST_LIFETIME_MS);
    }

    /// Drops the particles once the lifetime has elapsed. Returns true if it did.
    pub fn tick(&mut self, now: f64) -> bool {
        if self.clear.fire(now) {
            self.particles.clear();
            true
        } else {
            false
        }
    }

    pub fn clear(&mut self) {
        self.particles.clear();
        self.clear.cancel();
    }
}

pub fn spawn_particles(rng: &mut dyn RandomSource, next_id: &mut u64) -> Vec<Particle> {
    (0..BURST_SIZE)
        .map(|_| {
            let id = *next_id;
            *next_id = next_id.wrapping_add(1);
            Particle {
                id,
                left: rng.next_unit() * 100.0,
                size: SIZE_MIN_PX + rng.next_unit() * SIZE_SPAN_PX,
                duration: DURATION_MIN_S + rng.next_unit() * DURATION_SPAN_S,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::{CryptoRandom, Scripted};
    use std::collections::HashSet;

    #[test]
    fn particles_fall_within_ranges() {
        let mut rng = CryptoRandom;
        let mut next = 0;
        let ps = spawn_particles(&mut rng, &mut next);
        assert_eq!(ps.len(), BURST_SIZE);
        assert_eq!(next, BURST_SIZE as u64);
        for p in &ps {
            assert!((0.0..=100.0).contains(&p.left));
            assert!((24.0..=56.0).contains(&p.size));
            assert!((3.0..=5.0).contains(&p.duration));
        }
    }

    #[test]
    fn ids_stay_unique_across_bursts() {
        let mut rng = Scripted::new(&[0.25, 0.5, 0.75]);
        let mut next = 7;
        let mut burst = Burst::default();
        let mut seen = HashSet::new();
        burst.trigger(&mut rng, &mut next, 0.0);
        seen.extend(burst.particles().iter().map(|p| p.id));
        burst.trigger(&mut rng, &mut next, 10.0);
        seen.extend(burst.particles().iter().map(|p| p.id));
        assert_eq!(seen.len(), 2 * BURST_SIZE);
        assert_eq!(burst.particles().len(), BURST_SIZE);
    }

    #[test]
    fn scripted_samples_map_to_extremes() {
        let mut rng = Scripted::new(&[0.0]);
        let mut next = 0;
        let p = spawn_particles(&mut rng, &mut next)[0];
        assert_eq!((p.left, p.size, p.duration), (0.0, 24.0, 3.0));
    }

    #[test]
    fn clears_after_lifetime_and_retrigger_extends_it() {
        let mut rng = Scripted::new(&[0.5]);
        let mut next = 0;
        let mut burst = Burst::default();
        burst.trigger(&mut rng, &mut next, 1_000.0);
        assert!(!burst.tick(3_000.0));
        // A second trigger cancels the first clear deadline (5000 ms).
        burst.trigger(&mut rng, &mut next, 3_000.0);
        assert!(!burst.tick(5_000.0));
        assert!(burst.is_active());
        assert!(burst.tick(7_000.0));
        assert!(!burst.is_active());
        assert!(!burst.tick(9_000.0));
    }
}
