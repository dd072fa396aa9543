use fiber_core::{
    CommitReport, Element, MemoryApplier, NodeId, ReconcileError, Reconciler, ReconcilerConfig,
    RuntimeHandle, UnitBudget,
};

/// Failure of a harness lookup or of the work it drove.
#[derive(Debug, thiserror::Error)]
pub enum TestRenderError {
    #[error("no <{tag}> element is mounted")]
    TagNotFound { tag: String },
    #[error(transparent)]
    Reconcile(#[from] ReconcileError),
}

/// Headless harness for exercising render passes in tests.
///
/// `TestRenderer` owns a reconciler over an in-memory applier with a single
/// container, keeps every commit report it observed, and exposes helpers for
/// driving work to completion or one budgeted slice at a time.
pub struct TestRenderer {
    reconciler: Reconciler<MemoryApplier>,
    container: NodeId,
    commits: Vec<CommitReport>,
}

impl TestRenderer {
    /// Create a renderer with a fresh container and default settings.
    pub fn new() -> Self {
        Self::with_config(ReconcilerConfig::default())
    }

    pub fn with_config(config: ReconcilerConfig) -> Self {
        let mut applier = MemoryApplier::new();
        let container = applier.create_container();
        Self {
            reconciler: Reconciler::new(applier).with_config(config),
            container,
            commits: Vec::new(),
        }
    }

    /// Queue `element` for the container without doing any work.
    pub fn render(&mut self, element: Element) {
        self.reconciler.render(element, self.container);
    }

    /// Render `element` and drive the reconciler until it is idle.
    pub fn mount(&mut self, element: Element) -> Result<(), ReconcileError> {
        self.render(element);
        self.pump_until_idle()
    }

    /// Drive the reconciler until no queued update or pass in progress remains.
    pub fn pump_until_idle(&mut self) -> Result<(), ReconcileError> {
        let commits = self.reconciler.flush()?;
        self.commits.extend(commits);
        Ok(())
    }

    /// Run one step that may perform at most `units` units of work.
    /// Returns whether more work remains.
    pub fn step_with_budget(&mut self, units: usize) -> Result<bool, ReconcileError> {
        let outcome = self.reconciler.step(&UnitBudget::new(units))?;
        self.commits.extend(outcome.commit);
        Ok(outcome.more_work)
    }

    /// Fire `event` on `target`, then process whatever the handlers queued.
    pub fn dispatch(&mut self, target: NodeId, event: &str) -> Result<usize, ReconcileError> {
        let handled = self.reconciler.applier().dispatch(target, event)?;
        self.pump_until_idle()?;
        Ok(handled)
    }

    /// Fire `event` on the first element with `tag`.
    pub fn dispatch_on_tag(&mut self, tag: &str, event: &str) -> Result<usize, TestRenderError> {
        let target = self
            .find_by_tag(tag)
            .first()
            .copied()
            .ok_or_else(|| TestRenderError::TagNotFound {
                tag: tag.to_owned(),
            })?;
        Ok(self.dispatch(target, event)?)
    }

    pub fn container(&self) -> NodeId {
        self.container
    }

    pub fn commits(&self) -> &[CommitReport] {
        &self.commits
    }

    pub fn last_commit(&self) -> Option<&CommitReport> {
        self.commits.last()
    }

    /// Forget the commits observed so far.
    pub fn take_commits(&mut self) -> Vec<CommitReport> {
        std::mem::take(&mut self.commits)
    }

    pub fn text(&self) -> String {
        self.applier().text_content(self.container)
    }

    pub fn html(&self) -> String {
        self.applier().to_markup(self.container)
    }

    pub fn find_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.applier().find_by_tag(self.container, tag)
    }

    pub fn applier(&self) -> &MemoryApplier {
        self.reconciler.applier()
    }

    pub fn applier_mut(&mut self) -> &mut MemoryApplier {
        self.reconciler.applier_mut()
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.reconciler.runtime_handle()
    }

    /// Gain access to the raw reconciler for advanced scenarios.
    pub fn reconciler(&mut self) -> &mut Reconciler<MemoryApplier> {
        &mut self.reconciler
    }
}

impl Default for TestRenderer {
    fn default() -> Self {
        Self::new()
    }
}

/// Convenience helper for tests that only need temporary access to a
/// `TestRenderer`.
pub fn run_test_render<R>(f: impl FnOnce(&mut TestRenderer) -> R) -> R {
    let mut renderer = TestRenderer::new();
    f(&mut renderer)
}
