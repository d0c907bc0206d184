//! Time sources for identity generation.
//!
//! Lifecycle operations never read the system time directly. They ask a [`Clock`], which is
//! [`SystemClock`] in production and a [`FixedClock`] or [`SteppingClock`] in tests.
use std::cell::Cell;

use jiff::{SignedDuration, Timestamp};

pub trait Clock {
    fn now(&self) -> Timestamp;
}

/// Reads the current system time.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// Always returns the same instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}

/// Returns `start` on the first reading and advances by `step` on each following one.
///
/// Readings saturate at the last representable instant instead of overflowing.
#[derive(Debug)]
pub struct SteppingClock {
    next: Cell<Timestamp>,
    step: SignedDuration,
}

impl SteppingClock {
    pub fn new(start: Timestamp, step: SignedDuration) -> Self {
        Self {
            next: Cell::new(start),
            step,
        }
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> Timestamp {
        let current = self.next.get();
        self.next
            .set(current.checked_add(self.step).unwrap_or(current));
        current
    }
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Timestamp {
        (**self).now()
    }
}
