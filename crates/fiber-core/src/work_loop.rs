//! Cooperative, interruptible render passes.
//!
//! A pass starts when an update is dequeued into a fresh work-in-progress
//! root. [`Reconciler::step`] walks that tree one fiber at a time while the
//! deadline leaves room, and commits once the walk returns to the root.

use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use log::{debug, trace, warn};

use crate::applier::{Applier, NodeKind};
use crate::config::ReconcilerConfig;
use crate::element::{Element, Props};
use crate::error::ReconcileError;
use crate::fiber::{EffectTag, Fiber, FiberArena, FiberBase, FiberId, FiberKind, FiberType};
use crate::hooks::{ComponentInstance, RenderContext};
use crate::map::HashMap;
use crate::platform::{Deadline, RuntimeScheduler, Unbounded};
use crate::props_diff::update_properties;
use crate::reconcile::{clone_child_fibers, reconcile_children};
use crate::runtime::{DefaultScheduler, Runtime, RuntimeHandle, Update};
use crate::NodeId;

/// One mutation applied during a commit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EffectRecord {
    pub tag: EffectTag,
    pub kind: FiberKind,
    /// Tag name, `#text`, or the component name.
    pub label: String,
    /// Host node the effect touched, if the fiber had one.
    pub node: Option<NodeId>,
}

/// Effects of one committed update, in application order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CommitReport {
    pub container: NodeId,
    pub effects: Vec<EffectRecord>,
}

impl CommitReport {
    pub fn count(&self, tag: EffectTag) -> usize {
        self.effects.iter().filter(|effect| effect.tag == tag).count()
    }

    /// Effects with `tag` on fibers labelled `label`.
    pub fn count_labelled(&self, tag: EffectTag, label: &str) -> usize {
        self.effects
            .iter()
            .filter(|effect| effect.tag == tag && effect.label == label)
            .count()
    }

    pub fn len(&self) -> usize {
        self.effects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.effects.is_empty()
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// Another step is needed: the walk was suspended or updates are queued.
    pub more_work: bool,
    pub commit: Option<CommitReport>,
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct WorkInProgress {
    pub(crate) root: FiberId,
    pub(crate) container: NodeId,
}

/// Drives render passes for every container rendered through one applier.
pub struct Reconciler<A: Applier> {
    pub(crate) applier: A,
    pub(crate) arena: FiberArena,
    pub(crate) runtime: Runtime,
    pub(crate) config: ReconcilerConfig,
    /// Current tree per container.
    pub(crate) roots: HashMap<NodeId, FiberId>,
    pub(crate) wip: Option<WorkInProgress>,
    pub(crate) next_unit: Option<FiberId>,
    pub(crate) pending_commit: Option<FiberId>,
    /// Host nodes created by the pass in progress.
    pub(crate) created: Vec<NodeId>,
}

impl<A: Applier> Reconciler<A> {
    pub fn new(applier: A) -> Self {
        Self::with_runtime(applier, Runtime::new(Arc::new(DefaultScheduler)))
    }

    pub fn with_scheduler(applier: A, scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self::with_runtime(applier, Runtime::new(scheduler))
    }

    pub fn with_runtime(applier: A, runtime: Runtime) -> Self {
        Self {
            applier,
            arena: FiberArena::new(),
            runtime,
            config: ReconcilerConfig::default(),
            roots: HashMap::default(),
            wip: None,
            next_unit: None,
            pending_commit: None,
            created: Vec::new(),
        }
    }

    pub fn with_config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    pub fn applier(&self) -> &A {
        &self.applier
    }

    pub fn applier_mut(&mut self) -> &mut A {
        &mut self.applier
    }

    pub fn arena(&self) -> &FiberArena {
        &self.arena
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn runtime_handle(&self) -> RuntimeHandle {
        self.runtime.handle()
    }

    /// Root fiber of the committed tree rendered into `container`.
    pub fn current_root(&self, container: NodeId) -> Option<FiberId> {
        self.roots.get(&container).copied()
    }

    /// Root of the pass in progress, if any.
    pub fn work_in_progress(&self) -> Option<FiberId> {
        self.wip.map(|wip| wip.root)
    }

    /// Queue `element` to replace whatever was rendered into `container`.
    pub fn render(&self, element: Element, container: NodeId) {
        self.runtime_handle().render(element, container);
    }

    pub fn is_idle(&self) -> bool {
        self.wip.is_none() && !self.runtime.has_pending_updates()
    }

    /// Run units of work while `deadline` leaves more than the configured
    /// minimum slice, then commit if the walk finished.
    ///
    /// At most one update is committed per call. A failing component or host
    /// call abandons the pass; the update is not retried, and updates queued
    /// behind it are still announced to the scheduler.
    pub fn step(&mut self, deadline: &dyn Deadline) -> Result<StepOutcome, ReconcileError> {
        if self.next_unit.is_none() && self.pending_commit.is_none() {
            self.dequeue();
        }

        while let Some(unit) = self.next_unit {
            if deadline.time_remaining() <= self.config.min_slice {
                break;
            }
            match self.perform_unit_of_work(unit) {
                Ok(next) => self.next_unit = next,
                Err(err) => {
                    self.abandon_work();
                    self.request_remaining_work();
                    return Err(err);
                }
            }
        }

        let mut commit = None;
        if self.next_unit.is_none() {
            if let Some(root) = self.pending_commit.take() {
                match self.commit_all_work(root) {
                    Ok(report) => commit = Some(report),
                    Err(err) => {
                        self.abandon_work();
                        self.request_remaining_work();
                        return Err(err.into());
                    }
                }
            }
        }

        let more_work = self.request_remaining_work();
        Ok(StepOutcome { more_work, commit })
    }

    /// Ask the host for another step if a walk is suspended or updates are
    /// still queued. Returns whether it asked.
    fn request_remaining_work(&self) -> bool {
        let more_work = self.next_unit.is_some() || self.runtime.has_pending_updates();
        if more_work {
            self.runtime.schedule();
        } else {
            self.runtime.set_needs_work(false);
        }
        more_work
    }

    /// Step with an unbounded deadline until every queued update is committed.
    pub fn flush(&mut self) -> Result<Vec<CommitReport>, ReconcileError> {
        let mut commits = Vec::new();
        loop {
            let outcome = self.step(&Unbounded)?;
            commits.extend(outcome.commit);
            if !outcome.more_work {
                return Ok(commits);
            }
        }
    }

    fn dequeue(&mut self) {
        while let Some(update) = self.runtime.dequeue() {
            if let Some(root) = self.begin_update(update) {
                self.next_unit = Some(root);
                return;
            }
        }
    }

    /// Allocate the work-in-progress root for `update`.
    fn begin_update(&mut self, update: Update) -> Option<FiberId> {
        let (container, props, alternate) = match update {
            Update::Root { container, props } => {
                (container, props, self.current_root(container))
            }
            Update::State { instance, state } => {
                let Some(instance) = instance.upgrade() else {
                    debug!("dropping state update for a released component");
                    return None;
                };
                let Some(fiber) = instance
                    .fiber()
                    .filter(|&fiber| self.is_current_fiber_of(fiber, &instance))
                else {
                    debug!(
                        "dropping state update for unmounted {}",
                        instance.component().name()
                    );
                    return None;
                };
                self.arena[fiber].pending_state = Some(state);
                let root = self.arena.root_of(fiber);
                let container = self.arena[root].node()?;
                (container, Rc::clone(&self.arena[root].props), Some(root))
            }
        };
        let root = self.arena.alloc(Fiber::root(container, props, alternate));
        self.wip = Some(WorkInProgress { root, container });
        debug!("render pass started for container {container}");
        Some(root)
    }

    fn is_current_fiber_of(&self, fiber: FiberId, instance: &Rc<ComponentInstance>) -> bool {
        self.arena
            .get(fiber)
            .and_then(|fiber| fiber.base.instance())
            .is_some_and(|owner| Rc::ptr_eq(owner, instance))
    }

    /// Begin `fiber`, then return the next fiber in depth-first order,
    /// completing every fiber whose subtree is finished on the way.
    fn perform_unit_of_work(&mut self, fiber: FiberId) -> Result<Option<FiberId>, ReconcileError> {
        trace!("begin {} {}", fiber.index(), self.arena[fiber].ty.label());
        self.begin_work(fiber)?;
        if let Some(child) = self.arena[fiber].child {
            return Ok(Some(child));
        }
        let mut unit = Some(fiber);
        while let Some(current) = unit {
            self.complete_work(current);
            if let Some(sibling) = self.arena[current].sibling {
                return Ok(Some(sibling));
            }
            unit = self.arena[current].parent;
        }
        Ok(None)
    }

    fn begin_work(&mut self, fiber: FiberId) -> Result<(), ReconcileError> {
        match self.arena[fiber].kind {
            FiberKind::Component => self.update_component(fiber),
            FiberKind::Host | FiberKind::Root => self.update_host_component(fiber),
        }
    }

    fn update_host_component(&mut self, fiber: FiberId) -> Result<(), ReconcileError> {
        let props = Rc::clone(&self.arena[fiber].props);
        if matches!(self.arena[fiber].base, FiberBase::Empty) {
            let kind = match &self.arena[fiber].ty {
                FiberType::Host(tag) => NodeKind::Element(&**tag),
                _ => NodeKind::Text,
            };
            let node = self.applier.create_node(kind)?;
            self.created.push(node);
            update_properties(&mut self.applier, node, &Props::default(), &props)?;
            self.arena[fiber].base = FiberBase::Node(node);
        }
        reconcile_children(&mut self.arena, fiber, props.children());
        Ok(())
    }

    fn update_component(&mut self, fiber: FiberId) -> Result<(), ReconcileError> {
        let FiberType::Component(component) = self.arena[fiber].ty.clone() else {
            return Ok(());
        };
        let props = Rc::clone(&self.arena[fiber].props);
        let instance = match self.arena[fiber].base.instance() {
            Some(instance) => {
                let instance = Rc::clone(instance);
                let unchanged = self.arena[fiber]
                    .alternate
                    .and_then(|alternate| self.arena.get(alternate))
                    .is_some_and(|alternate| Rc::ptr_eq(&alternate.props, &props));
                if unchanged && self.arena[fiber].pending_state.is_none() {
                    trace!("{} bailed out", component.name());
                    clone_child_fibers(&mut self.arena, fiber);
                    return Ok(());
                }
                instance
            }
            None => {
                let instance = ComponentInstance::new(component.clone(), Rc::clone(&props));
                self.arena[fiber].base = FiberBase::Instance(Rc::clone(&instance));
                instance
            }
        };

        if let Some(state) = self.arena[fiber].pending_state.take() {
            instance.adopt_state(state);
        }
        instance.set_props(Rc::clone(&props));

        let runtime = self.runtime.handle();
        let mut cx = RenderContext::new(&instance, &runtime, self.config.check_hook_types);
        let elements = component
            .render(&props, &mut cx)
            .map_err(|source| ReconcileError::Component {
                name: component.name(),
                source,
            })?;
        reconcile_children(&mut self.arena, fiber, &elements);
        Ok(())
    }

    /// Hand `fiber`'s accumulated effects, then its own, to its parent.
    fn complete_work(&mut self, fiber: FiberId) {
        let Some(parent) = self.arena[fiber].parent else {
            self.pending_commit = Some(fiber);
            return;
        };
        let mut effects = std::mem::take(&mut self.arena[fiber].effects);
        if self.arena[fiber].effect_tag.is_some() {
            effects.push(fiber);
        }
        self.arena[parent].effects.extend(effects);
    }

    /// Drop the pass in progress and leave the current tree as it was.
    ///
    /// Host nodes created for the abandoned tree are disposed unless a partial
    /// commit already attached them.
    fn abandon_work(&mut self) {
        for node in std::mem::take(&mut self.created) {
            if let Err(err) = self.applier.dispose_node(node) {
                warn!("could not dispose host node {node}: {err}");
            }
        }
        if let Some(wip) = self.wip.take() {
            let current = self.arena.get(wip.root).and_then(Fiber::alternate);
            self.arena.release_tree(wip.root);
            if let Some(current) = current {
                for id in self.arena.descendants(current) {
                    let fiber = &mut self.arena[id];
                    fiber.effect_tag = None;
                    fiber.pending_state = None;
                    fiber.effects.clear();
                }
            }
            debug!("render pass for container {} abandoned", wip.container);
        }
        self.next_unit = None;
        self.pending_commit = None;
    }
}

impl<A: Applier> fmt::Debug for Reconciler<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("fibers", &self.arena.len())
            .field("roots", &self.roots.len())
            .field("wip", &self.wip)
            .field("runtime", &self.runtime)
            .finish()
    }
}

#[cfg(test)]
#[path = "tests/work_loop_tests.rs"]
mod tests;
