//! Sources of time for driving a [`Simulation`](crate::Simulation) from outside.
//!
//! The engine itself only ever sees virtual time. A driver reads a [`Clock`] and asks the
//! simulation to catch up with it; tests use a [`ManualClock`], interactive drivers a
//! [`WallClock`].

use std::cell::Cell;
use std::time::Instant;

use crate::units::Millisecs;

pub trait Clock {
    /// Milliseconds elapsed since the clock's origin.
    fn now(&self) -> Millisecs;
}

impl<C: Clock + ?Sized> Clock for &C {
    fn now(&self) -> Millisecs {
        (**self).now()
    }
}

/// Real elapsed time since construction.
#[derive(Debug, Clone, Copy)]
pub struct WallClock {
    origin: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for WallClock {
    fn now(&self) -> Millisecs {
        self.origin.elapsed().into()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Millisecs>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Millisecs) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, to: Millisecs) {
        self.now.set(to);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Millisecs {
        self.now.get()
    }
}
