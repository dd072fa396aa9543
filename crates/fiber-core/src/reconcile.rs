//! Positional diff of a fiber's new child elements against its alternate's children.

use std::rc::Rc;

use crate::element::Element;
use crate::fiber::{EffectTag, Fiber, FiberArena, FiberId, FiberType};

/// Build the child chain of `wip` from `elements`.
///
/// Children are matched strictly by index: a new element reuses the old fiber
/// at the same position when their types agree (UPDATE), otherwise a fresh
/// fiber is placed (PLACE) and the old one, if any, is queued for deletion on
/// `wip`'s effect list (DELETE).
pub(crate) fn reconcile_children(arena: &mut FiberArena, wip: FiberId, elements: &[Element]) {
    let mut old = arena[wip]
        .alternate
        .and_then(|alternate| arena.get(alternate))
        .and_then(Fiber::child);
    let mut previous: Option<FiberId> = None;
    arena[wip].child = None;

    let mut index = 0;
    while index < elements.len() || old.is_some() {
        let element = elements.get(index);
        let same_type = match (old, element) {
            (Some(old), Some(element)) => arena[old].ty.matches(element.ty()),
            _ => false,
        };

        let created = match (element, old) {
            (Some(element), Some(old)) if same_type => {
                let current = &arena[old];
                let fiber = Fiber {
                    base: current.base.clone(),
                    pending_state: current.pending_state.clone(),
                    alternate: Some(old),
                    effect_tag: Some(EffectTag::Update),
                    ..Fiber::new(
                        current.ty.clone(),
                        Rc::clone(element.props()),
                        Some(wip),
                    )
                };
                Some(arena.alloc(fiber))
            }
            (Some(element), _) => {
                let fiber = Fiber {
                    effect_tag: Some(EffectTag::Place),
                    ..Fiber::new(
                        FiberType::from(element.ty()),
                        Rc::clone(element.props()),
                        Some(wip),
                    )
                };
                Some(arena.alloc(fiber))
            }
            (None, _) => None,
        };

        if let Some(old_id) = old {
            if !same_type {
                arena[old_id].effect_tag = Some(EffectTag::Delete);
                arena[wip].effects.push(old_id);
            }
            old = arena[old_id].sibling;
        }

        if let Some(created) = created {
            match previous {
                Some(previous) => arena[previous].sibling = Some(created),
                None => arena[wip].child = Some(created),
            }
            previous = Some(created);
        }
        index += 1;
    }
}

/// Shallow-copy the alternate's child chain under `wip` without effect tags.
///
/// Used when a component bails out: the copies keep their bases and pending
/// state, so a state update deeper in the subtree still re-renders.
pub(crate) fn clone_child_fibers(arena: &mut FiberArena, wip: FiberId) {
    let mut old = arena[wip]
        .alternate
        .and_then(|alternate| arena.get(alternate))
        .and_then(Fiber::child);
    let mut previous: Option<FiberId> = None;
    arena[wip].child = None;

    while let Some(old_id) = old {
        let current = &arena[old_id];
        let fiber = Fiber {
            base: current.base.clone(),
            pending_state: current.pending_state.clone(),
            alternate: Some(old_id),
            ..Fiber::new(current.ty.clone(), Rc::clone(&current.props), Some(wip))
        };
        old = current.sibling;
        let created = arena.alloc(fiber);
        match previous {
            Some(previous) => arena[previous].sibling = Some(created),
            None => arena[wip].child = Some(created),
        }
        previous = Some(created);
    }
}

#[cfg(test)]
#[path = "tests/reconcile_tests.rs"]
mod tests;
