/// One-shot deadline timer driven by frame timestamps (`performance.now()` ms).
///
/// Each timer kind owns exactly one slot: arming again replaces the previous
/// deadline, which cancels it.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct OneShot {
    deadline_ms: Option<f64>,
}

impl OneShot {
    pub fn arm(&mut self, now: f64, delay_ms: f64) {
        self.deadline_ms = Some(now + delay_ms);
    }

    pub fn cancel(&mut self) {
        self.deadline_ms = None;
    }

    #[cfg(test)]
    pub(crate) fn is_pending(&self) -> bool {
        self.deadline_ms.is_some()
    }

    /// Returns true exactly once, on the first call at or after the deadline.
    pub fn fire(&mut self, now: f64) -> bool {
        match self.deadline_ms {
            Some(at) if now >= at => {
                self.deadline_ms = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_once_at_deadline() {
        let mut t = OneShot::default();
        assert!(!t.fire(0.0));
        t.arm(100.0, 50.0);
        assert!(t.is_pending());
        assert!(!t.fire(149.9));
        assert!(t.fire(150.0));
        assert!(!t.fire(400.0));
        assert!(!t.is_pending());
    }

    #[test]
    fn rearming_replaces_the_pending_deadline() {
        let mut t = OneShot::default();
        t.arm(0.0, 100.0);
        t.arm(80.0, 100.0);
        assert!(!t.fire(120.0));
        assert!(t.fire(180.0));
    }

    #[test]
    fn cancel_clears_deadline() {
        let mut t = OneShot::default();
        t.arm(0.0, 10.0);
        t.cancel();
        assert!(!t.fire(1_000.0));
    }
}
