//! Fiber nodes and the arena that owns them.
//!
//! Fibers link to each other by [`FiberId`] (parent, first child, next sibling
//! and alternate) so the double-buffered trees never form ownership cycles.

use std::fmt::Write as _;
use std::ops::{Index, IndexMut};
use std::rc::Rc;

use crate::element::{ComponentRef, ElementType, Props};
use crate::hooks::{ComponentInstance, SharedState};
use crate::NodeId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FiberId(usize);

impl FiberId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FiberKind {
    Host,
    Component,
    Root,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FiberType {
    Root,
    Host(Rc<str>),
    Text,
    Component(ComponentRef),
}

impl FiberType {
    pub fn kind(&self) -> FiberKind {
        match self {
            FiberType::Root => FiberKind::Root,
            FiberType::Host(_) | FiberType::Text => FiberKind::Host,
            FiberType::Component(_) => FiberKind::Component,
        }
    }

    /// Whether an element of type `ty` may reuse a fiber of this type.
    pub fn matches(&self, ty: &ElementType) -> bool {
        match (self, ty) {
            (FiberType::Host(current), ElementType::Host(next)) => current == next,
            (FiberType::Text, ElementType::Text) => true,
            (FiberType::Component(current), ElementType::Component(next)) => current == next,
            _ => false,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            FiberType::Root => "#root",
            FiberType::Host(tag) => tag,
            FiberType::Text => "#text",
            FiberType::Component(component) => component.name(),
        }
    }
}

impl From<&ElementType> for FiberType {
    fn from(ty: &ElementType) -> Self {
        match ty {
            ElementType::Host(tag) => FiberType::Host(Rc::clone(tag)),
            ElementType::Text => FiberType::Text,
            ElementType::Component(component) => FiberType::Component(component.clone()),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EffectTag {
    Place,
    Update,
    Delete,
}

/// What a fiber controls: a host node, a component instance, or nothing yet.
#[derive(Clone, Debug, Default)]
pub enum FiberBase {
    #[default]
    Empty,
    Node(NodeId),
    Instance(Rc<ComponentInstance>),
}

impl FiberBase {
    pub fn node(&self) -> Option<NodeId> {
        match self {
            FiberBase::Node(id) => Some(*id),
            _ => None,
        }
    }

    pub fn instance(&self) -> Option<&Rc<ComponentInstance>> {
        match self {
            FiberBase::Instance(instance) => Some(instance),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub struct Fiber {
    pub(crate) ty: FiberType,
    pub(crate) kind: FiberKind,
    pub(crate) props: Rc<Props>,
    pub(crate) base: FiberBase,
    /// State delivered by a queued update; forces re-evaluation once.
    pub(crate) pending_state: Option<SharedState>,
    pub(crate) parent: Option<FiberId>,
    pub(crate) child: Option<FiberId>,
    pub(crate) sibling: Option<FiberId>,
    pub(crate) alternate: Option<FiberId>,
    pub(crate) effect_tag: Option<EffectTag>,
    pub(crate) effects: Vec<FiberId>,
}

impl Fiber {
    pub(crate) fn new(ty: FiberType, props: Rc<Props>, parent: Option<FiberId>) -> Self {
        Self {
            kind: ty.kind(),
            ty,
            props,
            base: FiberBase::Empty,
            pending_state: None,
            parent,
            child: None,
            sibling: None,
            alternate: None,
            effect_tag: None,
            effects: Vec::new(),
        }
    }

    pub(crate) fn root(container: NodeId, props: Rc<Props>, alternate: Option<FiberId>) -> Self {
        Self {
            base: FiberBase::Node(container),
            alternate,
            ..Self::new(FiberType::Root, props, None)
        }
    }

    pub fn ty(&self) -> &FiberType {
        &self.ty
    }

    pub fn kind(&self) -> FiberKind {
        self.kind
    }

    pub fn props(&self) -> &Rc<Props> {
        &self.props
    }

    pub fn base(&self) -> &FiberBase {
        &self.base
    }

    pub fn node(&self) -> Option<NodeId> {
        self.base.node()
    }

    pub fn has_pending_state(&self) -> bool {
        self.pending_state.is_some()
    }

    pub fn parent(&self) -> Option<FiberId> {
        self.parent
    }

    pub fn child(&self) -> Option<FiberId> {
        self.child
    }

    pub fn sibling(&self) -> Option<FiberId> {
        self.sibling
    }

    pub fn alternate(&self) -> Option<FiberId> {
        self.alternate
    }

    pub fn effect_tag(&self) -> Option<EffectTag> {
        self.effect_tag
    }

    pub fn effects(&self) -> &[FiberId] {
        &self.effects
    }
}

/// Slab of fibers. Released slots are recycled.
#[derive(Debug, Default)]
pub struct FiberArena {
    slots: Vec<Option<Fiber>>,
    free: Vec<usize>,
}

impl FiberArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn alloc(&mut self, fiber: Fiber) -> FiberId {
        match self.free.pop() {
            Some(index) => {
                self.slots[index] = Some(fiber);
                FiberId(index)
            }
            None => {
                self.slots.push(Some(fiber));
                FiberId(self.slots.len() - 1)
            }
        }
    }

    pub fn get(&self, id: FiberId) -> Option<&Fiber> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, id: FiberId) -> Option<&mut Fiber> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    pub(crate) fn release(&mut self, id: FiberId) {
        if let Some(slot) = self.slots.get_mut(id.0) {
            if slot.take().is_some() {
                self.free.push(id.0);
            }
        }
    }

    /// Number of live fibers.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Child chain of `id`, in sibling order.
    pub fn children(&self, id: FiberId) -> Vec<FiberId> {
        let mut out = Vec::new();
        let mut next = self.get(id).and_then(Fiber::child);
        while let Some(child) = next {
            out.push(child);
            next = self.get(child).and_then(Fiber::sibling);
        }
        out
    }

    /// `root` and everything below it, depth first, children in order.
    pub fn descendants(&self, root: FiberId) -> Vec<FiberId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if self.get(id).is_none() {
                continue;
            }
            out.push(id);
            stack.extend(self.children(id).into_iter().rev());
        }
        out
    }

    pub fn root_of(&self, id: FiberId) -> FiberId {
        let mut node = id;
        while let Some(parent) = self.get(node).and_then(Fiber::parent) {
            node = parent;
        }
        node
    }

    /// Nearest ancestor host node, skipping component fibers that have no
    /// host footprint of their own.
    pub fn host_parent(&self, id: FiberId) -> Option<NodeId> {
        let mut parent = self.get(id)?.parent;
        while let Some(candidate) = parent {
            let fiber = self.get(candidate)?;
            if fiber.kind != FiberKind::Component {
                return fiber.node();
            }
            parent = fiber.parent;
        }
        None
    }

    pub(crate) fn release_tree(&mut self, root: FiberId) {
        for id in self.descendants(root) {
            self.release(id);
        }
    }

    pub fn dump_tree(&self, root: FiberId) -> String {
        let mut output = String::new();
        self.dump_fiber(&mut output, root, 0);
        output
    }

    fn dump_fiber(&self, output: &mut String, id: FiberId, depth: usize) {
        let indent = "  ".repeat(depth);
        let Some(fiber) = self.get(id) else {
            let _ = writeln!(output, "{indent}[{}] (released)", id.0);
            return;
        };
        let _ = write!(output, "{indent}[{}] {}", id.0, fiber.ty.label());
        if let Some(node) = fiber.node() {
            let _ = write!(output, " node={node}");
        }
        if let Some(tag) = fiber.effect_tag {
            let _ = write!(output, " {tag:?}");
        }
        output.push('\n');
        for child in self.children(id) {
            self.dump_fiber(output, child, depth + 1);
        }
    }
}

impl Index<FiberId> for FiberArena {
    type Output = Fiber;

    fn index(&self, id: FiberId) -> &Fiber {
        match self.get(id) {
            Some(fiber) => fiber,
            None => panic!("fiber {} was released", id.0),
        }
    }
}

impl IndexMut<FiberId> for FiberArena {
    fn index_mut(&mut self, id: FiberId) -> &mut Fiber {
        match self.get_mut(id) {
            Some(fiber) => fiber,
            None => panic!("fiber {} was released", id.0),
        }
    }
}
