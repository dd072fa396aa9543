//! Platform abstraction traits for the reconciler's cooperative scheduling.
//!
//! The engine never blocks or sleeps. The host is asked to schedule work
//! through [`RuntimeScheduler`] and, when it calls back in, hands the
//! reconciler a [`Deadline`] describing how long the current slice may run.

use std::cell::Cell;
use std::time::Duration;

/// Asks the host to call back into the reconciler.
///
/// Implementations must be safe to use from multiple threads so a host can
/// wake the thread that drives the reconciler.
pub trait RuntimeScheduler: Send + Sync {
    /// Request that the host run another slice of work soon.
    fn schedule_work(&self);
}

/// Remaining budget of the slice the reconciler is currently running in.
pub trait Deadline {
    fn time_remaining(&self) -> Duration;
}

/// Provides timing information for deadline implementations.
pub trait Clock: Send + Sync {
    /// Instant type produced by this clock implementation.
    type Instant: Copy + Send + Sync;

    fn now(&self) -> Self::Instant;

    fn elapsed(&self, since: Self::Instant) -> Duration;
}

/// Deadline that never runs out. Work runs to completion.
#[derive(Clone, Copy, Debug, Default)]
pub struct Unbounded;

impl Deadline for Unbounded {
    fn time_remaining(&self) -> Duration {
        Duration::MAX
    }
}

/// Deterministic deadline that allows a fixed number of budget checks.
///
/// Each call to [`Deadline::time_remaining`] consumes one unit; once the units
/// are spent the deadline reports no time left.
#[derive(Debug)]
pub struct UnitBudget {
    remaining: Cell<usize>,
}

impl UnitBudget {
    pub fn new(units: usize) -> Self {
        Self {
            remaining: Cell::new(units),
        }
    }

    pub fn remaining(&self) -> usize {
        self.remaining.get()
    }
}

impl Deadline for UnitBudget {
    fn time_remaining(&self) -> Duration {
        match self.remaining.get() {
            0 => Duration::ZERO,
            units => {
                self.remaining.set(units - 1);
                Duration::MAX
            }
        }
    }
}
