//! Call-order keyed local state for component instances.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, warn};

use crate::element::{ComponentRef, Props};
use crate::fiber::FiberId;
use crate::map::HashMap;
use crate::runtime::{RuntimeHandle, Update};

static NEXT_INSTANCE_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InstanceId(u64);

impl InstanceId {
    fn next() -> Self {
        Self(NEXT_INSTANCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Slot key derived from the position of a `use_state` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HookKey(usize);

impl HookKey {
    pub fn new(position: usize) -> Self {
        Self(position)
    }

    pub fn position(self) -> usize {
        self.0
    }
}

impl fmt::Display for HookKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "h{}", self.0)
    }
}

pub type StateBag = HashMap<HookKey, Rc<dyn Any>>;

/// State bag shared between an instance, its setters and queued updates.
pub type SharedState = Rc<RefCell<StateBag>>;

/// Live instance behind a component fiber; survives as long as the fiber is
/// matched across renders.
pub struct ComponentInstance {
    id: InstanceId,
    component: ComponentRef,
    props: RefCell<Rc<Props>>,
    state: RefCell<SharedState>,
    fiber: Cell<Option<FiberId>>,
}

impl ComponentInstance {
    pub(crate) fn new(component: ComponentRef, props: Rc<Props>) -> Rc<Self> {
        Rc::new(Self {
            id: InstanceId::next(),
            component,
            props: RefCell::new(props),
            state: RefCell::new(SharedState::default()),
            fiber: Cell::new(None),
        })
    }

    pub fn id(&self) -> InstanceId {
        self.id
    }

    pub fn component(&self) -> &ComponentRef {
        &self.component
    }

    /// Props of the last evaluation.
    pub fn props(&self) -> Rc<Props> {
        Rc::clone(&self.props.borrow())
    }

    pub fn state(&self) -> SharedState {
        Rc::clone(&self.state.borrow())
    }

    /// Fiber of the committed tree this instance belongs to.
    pub fn fiber(&self) -> Option<FiberId> {
        self.fiber.get()
    }

    /// Value stored under `key`, if it was ever set and has type `T`.
    pub fn stored<T: Clone + 'static>(&self, key: HookKey) -> Option<T> {
        let state = self.state();
        let value = state.borrow().get(&key).cloned()?;
        value.downcast_ref::<T>().cloned()
    }

    pub(crate) fn set_props(&self, props: Rc<Props>) {
        *self.props.borrow_mut() = props;
    }

    pub(crate) fn adopt_state(&self, state: SharedState) {
        *self.state.borrow_mut() = state;
    }

    pub(crate) fn set_fiber(&self, fiber: Option<FiberId>) {
        self.fiber.set(fiber);
    }
}

impl fmt::Debug for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentInstance")
            .field("id", &self.id)
            .field("component", &self.component.name())
            .field("fiber", &self.fiber.get())
            .finish()
    }
}

/// Active rendering context handed to a component body.
///
/// The hook cursor starts at zero for every evaluation, so state slots are
/// identified by the order of `use_state` calls.
pub struct RenderContext<'a> {
    instance: &'a Rc<ComponentInstance>,
    runtime: &'a RuntimeHandle,
    cursor: usize,
    check_hook_types: bool,
}

impl<'a> RenderContext<'a> {
    pub(crate) fn new(
        instance: &'a Rc<ComponentInstance>,
        runtime: &'a RuntimeHandle,
        check_hook_types: bool,
    ) -> Self {
        Self {
            instance,
            runtime,
            cursor: 0,
            check_hook_types,
        }
    }

    /// Returns the stored value for this call position, or `initial` when
    /// nothing was stored yet. `initial` itself is not persisted.
    pub fn use_state<T: Clone + 'static>(&mut self, initial: T) -> (T, StateSetter<T>) {
        let key = HookKey(self.cursor);
        self.cursor += 1;
        let setter = StateSetter {
            instance: Rc::downgrade(self.instance),
            key,
            runtime: self.runtime.clone(),
            _marker: PhantomData,
        };
        let stored = self.instance.state().borrow().get(&key).cloned();
        let Some(stored) = stored else {
            return (initial, setter);
        };
        match stored.downcast_ref::<T>() {
            Some(value) => (value.clone(), setter),
            None => {
                if self.check_hook_types {
                    warn!(
                        "{} slot {key} holds a different type than {}; hooks were called out of order",
                        self.instance.component().name(),
                        std::any::type_name::<T>()
                    );
                }
                (initial, setter)
            }
        }
    }

    pub fn instance_id(&self) -> InstanceId {
        self.instance.id()
    }

    pub fn runtime(&self) -> &RuntimeHandle {
        self.runtime
    }

    /// Number of hook slots requested so far in this evaluation.
    pub fn hook_count(&self) -> usize {
        self.cursor
    }
}

/// Writes one state slot of its owning instance and queues a re-render.
pub struct StateSetter<T> {
    instance: Weak<ComponentInstance>,
    key: HookKey,
    runtime: RuntimeHandle,
    _marker: PhantomData<fn(T)>,
}

impl<T> Clone for StateSetter<T> {
    fn clone(&self) -> Self {
        Self {
            instance: Weak::clone(&self.instance),
            key: self.key,
            runtime: self.runtime.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for StateSetter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateSetter")
            .field("key", &self.key)
            .field("mounted", &(self.instance.strong_count() > 0))
            .finish()
    }
}

impl<T: 'static> StateSetter<T> {
    pub fn key(&self) -> HookKey {
        self.key
    }

    pub fn set(&self, value: T) {
        let Some(instance) = self.instance.upgrade() else {
            debug!("ignoring {} update for an unmounted component", self.key);
            return;
        };
        let state = instance.state();
        state.borrow_mut().insert(self.key, Rc::new(value));
        self.runtime.enqueue(Update::State {
            instance: Rc::downgrade(&instance),
            state,
        });
    }
}

impl<T: Clone + 'static> StateSetter<T> {
    /// Derive the next value from the stored one (`None` if never set).
    pub fn update(&self, f: impl FnOnce(Option<T>) -> T) {
        let current = self
            .instance
            .upgrade()
            .and_then(|instance| instance.stored::<T>(self.key));
        self.set(f(current));
    }
}

#[cfg(test)]
#[path = "tests/hooks_tests.rs"]
mod tests;
