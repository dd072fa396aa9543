use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::Arc;

use crate::element::{Element, Props};
use crate::hooks::{ComponentInstance, SharedState};
use crate::platform::RuntimeScheduler;
use crate::NodeId;

/// A request for a render pass.
pub enum Update {
    /// Render new content into a host container.
    Root { container: NodeId, props: Rc<Props> },
    /// Re-render the tree owning `instance` with `state` as its local state.
    State {
        instance: Weak<ComponentInstance>,
        state: SharedState,
    },
}

impl fmt::Debug for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Root { container, props } => f
                .debug_struct("Root")
                .field("container", container)
                .field("children", &props.children().len())
                .finish(),
            Update::State { instance, .. } => f
                .debug_struct("State")
                .field("instance", &instance.upgrade().map(|instance| instance.id()))
                .finish(),
        }
    }
}

pub(crate) struct RuntimeInner {
    scheduler: Arc<dyn RuntimeScheduler>,
    needs_work: Cell<bool>,
    updates: RefCell<VecDeque<Update>>,
}

impl RuntimeInner {
    fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            scheduler,
            needs_work: Cell::new(false),
            updates: RefCell::new(VecDeque::new()),
        }
    }

    fn schedule(&self) {
        self.needs_work.set(true);
        self.scheduler.schedule_work();
    }

    fn enqueue(&self, update: Update) {
        self.updates.borrow_mut().push_back(update);
        self.schedule();
    }

    fn dequeue(&self) -> Option<Update> {
        self.updates.borrow_mut().pop_front()
    }

    fn pending_updates(&self) -> usize {
        self.updates.borrow().len()
    }
}

/// Owner of the FIFO update queue shared by a reconciler and its setters.
#[derive(Clone)]
pub struct Runtime {
    inner: Rc<RuntimeInner>,
}

impl Runtime {
    pub fn new(scheduler: Arc<dyn RuntimeScheduler>) -> Self {
        Self {
            inner: Rc::new(RuntimeInner::new(scheduler)),
        }
    }

    pub fn handle(&self) -> RuntimeHandle {
        RuntimeHandle(Rc::downgrade(&self.inner))
    }

    pub fn has_pending_updates(&self) -> bool {
        self.inner.pending_updates() > 0
    }

    pub fn pending_updates(&self) -> usize {
        self.inner.pending_updates()
    }

    /// Whether work was scheduled and not yet run to idle.
    pub fn needs_work(&self) -> bool {
        self.inner.needs_work.get()
    }

    pub fn set_needs_work(&self, value: bool) {
        self.inner.needs_work.set(value);
    }

    pub(crate) fn schedule(&self) {
        self.inner.schedule();
    }

    pub(crate) fn dequeue(&self) -> Option<Update> {
        self.inner.dequeue()
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("needs_work", &self.needs_work())
            .field("pending_updates", &self.pending_updates())
            .finish()
    }
}

/// Weak handle to a [`Runtime`]; operations on a dropped runtime do nothing.
#[derive(Clone)]
pub struct RuntimeHandle(pub(crate) Weak<RuntimeInner>);

impl RuntimeHandle {
    /// Queue `element` to be rendered into `container`.
    pub fn render(&self, element: Element, container: NodeId) {
        self.enqueue(Update::Root {
            container,
            props: Rc::new(Props::new().with_children(element)),
        });
    }

    pub fn enqueue(&self, update: Update) {
        if let Some(inner) = self.0.upgrade() {
            inner.enqueue(update);
        }
    }

    pub fn schedule(&self) {
        if let Some(inner) = self.0.upgrade() {
            inner.schedule();
        }
    }

    pub fn has_pending_updates(&self) -> bool {
        self.0
            .upgrade()
            .map(|inner| inner.pending_updates() > 0)
            .unwrap_or(false)
    }

    pub fn is_alive(&self) -> bool {
        self.0.strong_count() > 0
    }
}

impl fmt::Debug for RuntimeHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RuntimeHandle").field(&self.is_alive()).finish()
    }
}

/// Scheduler for hosts that drive the reconciler themselves.
#[derive(Debug, Default)]
pub struct DefaultScheduler;

impl RuntimeScheduler for DefaultScheduler {
    fn schedule_work(&self) {}
}

#[cfg(test)]
#[path = "tests/runtime_tests.rs"]
mod tests;
