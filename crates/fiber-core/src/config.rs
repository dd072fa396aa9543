use std::env;
use std::time::Duration;

/// Minimum slice left in the deadline before another unit of work is started.
pub const DEFAULT_MIN_SLICE: Duration = Duration::from_millis(1);

/// Tuning knobs for a [`Reconciler`](crate::Reconciler).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// A unit of work only starts while the deadline reports more than this.
    pub min_slice: Duration,
    /// Warn when a hook slot holds a value of a different type than requested.
    pub check_hook_types: bool,
    /// Log the committed fiber tree after every commit.
    pub dump_tree_on_commit: bool,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            min_slice: DEFAULT_MIN_SLICE,
            check_hook_types: cfg!(debug_assertions),
            dump_tree_on_commit: false,
        }
    }
}

impl ReconcilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `FIBER_MIN_SLICE_MS` and `FIBER_DEBUG`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(ms) = env::var("FIBER_MIN_SLICE_MS")
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
        {
            config.min_slice = Duration::from_millis(ms);
        }
        if env::var("FIBER_DEBUG").is_ok_and(|value| value != "0") {
            config.check_hook_types = true;
            config.dump_tree_on_commit = true;
        }
        config
    }

    pub fn with_min_slice(mut self, min_slice: Duration) -> Self {
        self.min_slice = min_slice;
        self
    }

    pub fn with_hook_type_checks(mut self, enabled: bool) -> Self {
        self.check_hook_types = enabled;
        self
    }

    pub fn with_tree_dumps(mut self, enabled: bool) -> Self {
        self.dump_tree_on_commit = enabled;
        self
    }
}
