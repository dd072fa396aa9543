//! Drive a [`Reconciler`] in wall-clock slices on a std host.
//!
//! A host thread sleeps until [`StdScheduler`] reports that the reconciler
//! asked for another step, then calls [`run_slice`] with a budget measured by
//! [`StdClock`]. [`run_until_idle`] repeats that until every queued update is
//! committed.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use fiber_core::{
    Applier, Clock, CommitReport, Deadline, ReconcileError, Reconciler, ReconcilerConfig, Runtime,
    RuntimeHandle, RuntimeScheduler, StepOutcome,
};

/// Budget of one slice when the host has no frame deadline of its own.
pub const DEFAULT_SLICE: Duration = Duration::from_millis(16);

type Waker = Arc<dyn Fn() + Send + Sync + 'static>;

/// Records that the reconciler wants another step and pokes the host thread.
pub struct StdScheduler {
    work_requested: AtomicBool,
    waker: RwLock<Option<Waker>>,
}

impl StdScheduler {
    pub fn new() -> Self {
        Self {
            work_requested: AtomicBool::new(false),
            waker: RwLock::new(None),
        }
    }

    /// Consume the pending step request, if any.
    pub fn take_work_request(&self) -> bool {
        self.work_requested.swap(false, Ordering::SeqCst)
    }

    /// Called on every step request, e.g. to unpark the thread running slices.
    pub fn set_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        *self.waker.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(waker));
    }

    pub fn clear_waker(&self) {
        *self.waker.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn wake(&self) {
        let waker = self
            .waker
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(waker) = waker {
            waker();
        }
    }
}

impl Default for StdScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdScheduler")
            .field("work_requested", &self.work_requested.load(Ordering::SeqCst))
            .finish()
    }
}

impl RuntimeScheduler for StdScheduler {
    fn schedule_work(&self) {
        self.work_requested.store(true, Ordering::SeqCst);
        self.wake();
    }
}

/// Monotonic clock for slice budgets.
#[derive(Debug, Default, Clone)]
pub struct StdClock;

impl Clock for StdClock {
    type Instant = Instant;

    fn now(&self) -> Self::Instant {
        Instant::now()
    }

    fn elapsed(&self, since: Self::Instant) -> Duration {
        since.elapsed()
    }
}

/// Deadline that expires `budget` after it was started on `clock`.
pub struct ClockDeadline<'a, C: Clock> {
    clock: &'a C,
    started: C::Instant,
    budget: Duration,
}

impl<'a, C: Clock> ClockDeadline<'a, C> {
    pub fn start(clock: &'a C, budget: Duration) -> Self {
        Self {
            clock,
            started: clock.now(),
            budget,
        }
    }
}

impl<C: Clock> Deadline for ClockDeadline<'_, C> {
    fn time_remaining(&self) -> Duration {
        self.budget
            .saturating_sub(self.clock.elapsed(self.started))
    }
}

/// Update queue wired to a [`StdScheduler`], plus the clock its slices use.
#[derive(Clone)]
pub struct StdRuntime {
    scheduler: Arc<StdScheduler>,
    clock: Arc<StdClock>,
    runtime: Runtime,
}

impl StdRuntime {
    pub fn new() -> Self {
        let scheduler = Arc::new(StdScheduler::default());
        let runtime = Runtime::new(scheduler.clone());
        Self {
            scheduler,
            clock: Arc::new(StdClock),
            runtime,
        }
    }

    pub fn runtime(&self) -> Runtime {
        self.runtime.clone()
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    pub fn scheduler(&self) -> Arc<StdScheduler> {
        Arc::clone(&self.scheduler)
    }

    pub fn clock(&self) -> Arc<StdClock> {
        Arc::clone(&self.clock)
    }

    /// Whether a step was requested since the last poll.
    pub fn take_work_request(&self) -> bool {
        self.scheduler.take_work_request()
    }

    pub fn set_waker(&self, waker: impl Fn() + Send + Sync + 'static) {
        self.scheduler.set_waker(waker);
    }

    pub fn clear_waker(&self) {
        self.scheduler.clear_waker();
    }

    /// Build a reconciler whose updates are queued on this runtime. Settings
    /// come from the environment (see [`ReconcilerConfig::from_env`]).
    pub fn reconciler<A: Applier>(&self, applier: A) -> Reconciler<A> {
        Reconciler::with_runtime(applier, self.runtime()).with_config(ReconcilerConfig::from_env())
    }
}

impl Default for StdRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for StdRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdRuntime")
            .field("scheduler", &self.scheduler)
            .field("runtime", &self.runtime)
            .finish()
    }
}

/// Run one host callback's worth of work: a single step bounded by `slice`.
pub fn run_slice<A: Applier, C: Clock>(
    reconciler: &mut Reconciler<A>,
    clock: &C,
    slice: Duration,
) -> Result<StepOutcome, ReconcileError> {
    let deadline = ClockDeadline::start(clock, slice);
    reconciler.step(&deadline)
}

/// Keep running slices until no work is left.
///
/// A failed pass is logged and dropped; the remaining queue still runs.
pub fn run_until_idle<A: Applier, C: Clock>(
    reconciler: &mut Reconciler<A>,
    clock: &C,
    slice: Duration,
) -> Vec<CommitReport> {
    let mut commits = Vec::new();
    loop {
        match run_slice(reconciler, clock, slice) {
            Ok(outcome) => {
                commits.extend(outcome.commit);
                if !outcome.more_work {
                    return commits;
                }
            }
            Err(err) => {
                log::error!("render pass failed: {err}");
                if reconciler.is_idle() {
                    return commits;
                }
            }
        }
    }
}
