//! Wall-clock abstraction.
//!
//! Cache freshness is measured in epoch milliseconds. The browser reads
//! `Date.now()`; tests and replays drive a [`ManualClock`].

use std::cell::Cell;
use std::rc::Rc;

/// Source of the current wall-clock time.
pub trait Clock {
    /// Milliseconds since the Unix epoch.
    fn now_epoch_ms(&self) -> i64;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now_epoch_ms(&self) -> i64 {
        (**self).now_epoch_ms()
    }
}

impl<C: Clock + ?Sized> Clock for Rc<C> {
    fn now_epoch_ms(&self) -> i64 {
        (**self).now_epoch_ms()
    }
}

/// Deterministic clock controlled by the host.
///
/// Uses interior mutability so a clock shared with a [`Decorator`] can still be
/// advanced between calls.
///
/// [`Decorator`]: crate::metadata::Decorator
#[derive(Debug, Default, Clone)]
pub struct ManualClock {
    now: Cell<i64>,
}

impl ManualClock {
    /// Create a clock reading `now_ms`.
    #[must_use]
    pub fn new(now_ms: i64) -> Self {
        Self {
            now: Cell::new(now_ms),
        }
    }

    /// Set the current time.
    pub fn set(&self, now_ms: i64) {
        self.now.set(now_ms);
    }

    /// Advance the current time by `dt_ms`, saturating at the numeric bounds.
    pub fn advance(&self, dt_ms: i64) {
        self.now.set(self.now.get().saturating_add(dt_ms));
    }
}

impl Clock for ManualClock {
    fn now_epoch_ms(&self) -> i64 {
        self.now.get()
    }
}

/// System wall clock for native hosts.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

#[cfg(not(target_arch = "wasm32"))]
impl Clock for SystemClock {
    fn now_epoch_ms(&self) -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn manual_clock_advances_and_saturates() {
        let clock = ManualClock::new(1_000);
        assert_eq!(clock.now_epoch_ms(), 1_000);

        clock.advance(250);
        assert_eq!(clock.now_epoch_ms(), 1_250);

        clock.set(i64::MAX - 1);
        clock.advance(10);
        assert_eq!(clock.now_epoch_ms(), i64::MAX);
    }

    #[test]
    fn shared_clock_sees_updates() {
        let clock = Rc::new(ManualClock::new(0));
        let shared = Rc::clone(&clock);
        clock.advance(42);
        assert_eq!(shared.now_epoch_ms(), 42);
        assert_eq!((&*clock).now_epoch_ms(), 42);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn system_clock_is_after_2020() {
        assert!(SystemClock.now_epoch_ms() > 1_577_836_800_000);
    }
}
