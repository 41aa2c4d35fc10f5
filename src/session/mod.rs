//! Session controller: counters, the draw state machine, and the timed effects
//! (particle burst and delayed result reveal) that follow a hit.
//!
//! Lifecycle:
//! - `Session::load` restores counters from the store, or starts fresh when the
//!   record is missing or unusable.
//! - `draw` performs one 1/`CHANCE` trial and writes the full state back.
//! - `tick` is fed frame timestamps and fires the pending timers.
//! - `reset` wipes the record and returns to a fresh session.

mod timer;

pub use timer::OneShot;

use crate::burst::Burst;
use crate::random::{self, RandomSource};
use crate::storage::{self, KeyValueStore};
use crate::{REVEAL_DELAY_MS, STORAGE_KEY};

/// Result of a single draw.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Hit,
    Miss,
}

/// Persisted counters.
///
/// Invariants: `success_count + failure_count == attempts` and
/// `terminal == first_success_attempt.is_some()`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    pub attempts: u32,
    pub success_count: u32,
    pub failure_count: u32,
    /// `None` until the first draw.
    pub last_outcome: Option<Outcome>,
    /// Attempt number of the first hit; never changes once set.
    pub first_success_attempt: Option<u32>,
    pub terminal: bool,
}

impl SessionState {
    /// Applies one draw result. Returns `None` (and changes nothing) once the
    /// session is terminal or the attempt counter is exhausted.
    pub fn record(&mut self, hit: bool) -> Option<Outcome> {
        if !self.accepts_draw() {
            return None;
        }
        // success + failure == attempts < u32::MAX, so neither side can overflow.
        self.attempts += 1;
        if hit {
            self.success_count += 1;
            self.last_outcome = Some(Outcome::Hit);
            if self.first_success_attempt.is_none() {
                self.first_success_attempt = Some(self.attempts);
                self.terminal = true;
            }
            Some(Outcome::Hit)
        } else {
            self.failure_count += 1;
            self.last_outcome = Some(Outcome::Miss);
            Some(Outcome::Miss)
        }
    }

    pub fn accepts_draw(&self) -> bool {
        !self.terminal && self.attempts < u32::MAX
    }
}

/// Which screen the view should show.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Screen {
    Play,
    Result { first_success_attempt: u32 },
}

pub struct Session {
    state: SessionState,
    store: Box<dyn KeyValueStore>,
    rng: Box<dyn RandomSource>,
    burst: Burst,
    next_particle_id: u64,
    revealed: bool,
    reveal: OneShot,
}

impl Session {
    /// Restores the stored session. A missing, unreadable or inconsistent record
    /// yields a fresh session; the failure is logged and otherwise ignored.
    pub fn load(store: Box<dyn KeyValueStore>, rng: Box<dyn RandomSource>) -> Self {
        let state = match storage::load_state(store.as_ref(), STORAGE_KEY) {
            Ok(Some(s)) => {
                crate::log::info(&format!("restored session after {} tries", s.attempts));
                s
            }
            Ok(None) => SessionState::default(),
            Err(e) => {
                crate::log::warn(&format!("discarding stored session: {e}"));
                SessionState::default()
            }
        };
        let mut session = Self {
            state,
            store,
            rng,
            burst: Burst::default(),
            next_particle_id: 0,
            revealed: false,
            reveal: OneShot::default(),
        };
        session.persist();
        session
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn burst(&self) -> &Burst {
        &self.burst
    }

    pub fn store(&self) -> &dyn KeyValueStore {
        self.store.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn is_revealed(&self) -> bool {
        self.revealed
    }

    pub fn can_draw(&self) -> bool {
        self.state.accepts_draw()
    }

    pub fn screen(&self) -> Screen {
        match self.state.first_success_attempt {
            Some(at) if self.revealed => Screen::Result {
                first_success_attempt: at,
            },
            _ => Screen::Play,
        }
    }

    /// One trial at `now` (ms). Ignored once the session has ended.
    pub fn draw(&mut self, now: f64) -> Option<Outcome> {
        if !self.state.accepts_draw() {
            return None;
        }
        let hit = random::is_hit(self.rng.next_unit());
        let first_hit = hit && self.state.first_success_attempt.is_none();
        let outcome = self.state.record(hit)?;
        self.persist();

        if outcome == Outcome::Hit {
            self.burst
                .trigger(self.rng.as_mut(), &mut self.next_particle_id, now);
            if first_hit {
                self.reveal.arm(now, REVEAL_DELAY_MS);
                crate::log::info(&format!("hit on try {}", self.state.attempts));
            }
        }
        Some(outcome)
    }

    /// Fires due timers. Returns true when anything visible changed.
    pub fn tick(&mut self, now: f64) -> bool {
        let mut changed = self.burst.tick(now);
        if self.reveal.fire(now) {
            self.revealed = true;
            changed = true;
        }
        changed
    }

    /// Removes the stored record and returns to a fresh session.
    pub fn reset(&mut self) {
        if let Err(e) = self.store.remove(STORAGE_KEY) {
            crate::log::warn(&format!("could not clear stored session: {e}"));
        }
        self.state = SessionState::default();
        self.burst.clear();
        self.next_particle_id = 0;
        self.revealed = false;
        self.reveal.cancel();
    }

    // Write failures leave the in-memory state authoritative.
    fn persist(&mut self) {
        if let Err(e) = storage::save_state(self.store.as_mut(), STORAGE_KEY, &self.state) {
            crate::log::warn(&format!("could not save session: {e}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::Scripted;
    use crate::storage::MemoryStore;

    const HIT: f64 = 0.0;

    fn session(samples: &[f64]) -> Session {
        Session::load(Box::new(MemoryStore::new()), Box::new(Scripted::new(samples)))
    }

    #[test]
    fn record_keeps_counter_invariant() {
        let mut s = SessionState::default();
        for _ in 0..10 {
            s.record(false);
            assert_eq!(s.attempts, s.success_count + s.failure_count);
        }
        assert_eq!(s.record(true), Some(Outcome::Hit));
        assert_eq!(s.first_success_attempt, Some(11));
        assert!(s.terminal);
        assert_eq!(s.record(true), None);
        assert_eq!(s.attempts, 11);
    }

    #[test]
    fn record_refuses_draws_past_counter_limit() {
        let full = SessionState {
            attempts: u32::MAX,
            success_count: 0,
            failure_count: u32::MAX,
            last_outcome: Some(Outcome::Miss),
            first_success_attempt: None,
            terminal: false,
        };
        for hit in [true, false] {
            let mut s = full;
            assert!(!s.accepts_draw());
            assert_eq!(s.record(hit), None);
            assert_eq!(s, full);
        }

        let mut one_left = SessionState {
            attempts: u32::MAX - 1,
            failure_count: u32::MAX - 1,
            ..full
        };
        assert_eq!(one_left.record(true), Some(Outcome::Hit));
        assert_eq!(
            one_left.attempts,
            one_left.success_count + one_left.failure_count
        );
        assert_eq!(one_left.first_success_attempt, Some(u32::MAX));
    }

    #[test]
    fn exhausted_session_survives_reload() {
        let raw = concat!(
            r#"{"tries":4294967295,"success":0,"fail":4294967295,"#,
            r#""last":"miss","firstHitAt":null,"ended":false}"#
        );
        let mut s = Session::load(
            Box::new(MemoryStore::with_item(STORAGE_KEY, raw)),
            Box::new(Scripted::new(&[HIT])),
        );
        assert!(!s.can_draw());
        assert_eq!(s.draw(0.0), None);
        assert!(!s.burst().is_active());

        let stored = s.store().get(STORAGE_KEY).unwrap().unwrap();
        let reloaded = storage::decode_state(&stored).unwrap();
        assert_eq!(reloaded, *s.state());
        assert_eq!(reloaded.attempts, u32::MAX);
    }

    #[test]
    fn reveal_waits_for_delay() {
        let mut s = session(&[HIT]);
        assert_eq!(s.draw(1_000.0), Some(Outcome::Hit));
        assert!(!s.can_draw());
        assert!(s.burst().is_active());
        assert_eq!(s.screen(), Screen::Play);
        assert!(!s.tick(2_999.0));
        assert!(s.tick(3_000.0));
        assert_eq!(
            s.screen(),
            Screen::Result {
                first_success_attempt: 1
            }
        );
    }

    #[test]
    fn burst_outlives_reveal_then_clears() {
        let mut s = session(&[HIT]);
        s.draw(0.0);
        s.tick(2_000.0);
        assert!(s.is_revealed());
        assert!(s.burst().is_active());
        assert!(s.tick(4_000.0));
        assert!(!s.burst().is_active());
    }

    #[test]
    fn reset_cancels_pending_reveal() {
        let mut s = session(&[HIT]);
        s.draw(0.0);
        s.reset();
        assert!(!s.tick(10_000.0));
        assert_eq!(s.screen(), Screen::Play);
        assert_eq!(*s.state(), SessionState::default());
        assert!(s.store().get(STORAGE_KEY).unwrap().is_none());
    }
}
