//! Commit phase: apply a finished pass's effects to the host tree in one go.

use log::{debug, warn};

use crate::applier::Applier;
use crate::error::NodeError;
use crate::fiber::{EffectTag, FiberArena, FiberId, FiberKind};
use crate::props_diff::update_properties;
use crate::work_loop::{CommitReport, EffectRecord, Reconciler};

impl<A: Applier> Reconciler<A> {
    /// Apply every effect collected on `root`, then make `root` the current
    /// tree of its container and release the tree it replaces.
    ///
    /// A host failure stops the commit where it happened; mutations already
    /// applied stay applied.
    pub(crate) fn commit_all_work(&mut self, root: FiberId) -> Result<CommitReport, NodeError> {
        let Some(container) = self.arena[root].node() else {
            warn!("root fiber {} has no container", root.index());
            return Ok(CommitReport::default());
        };
        let effects = std::mem::take(&mut self.arena[root].effects);
        let mut records = Vec::with_capacity(effects.len());
        for &fiber in &effects {
            if let Some(record) = self.commit_work(fiber)? {
                records.push(record);
            }
        }

        let previous = self.arena[root].alternate;
        self.roots.insert(container, root);
        finish_tree(&mut self.arena, root);
        if let Some(previous) = previous {
            self.arena.release_tree(previous);
        }
        self.wip = None;
        self.next_unit = None;
        self.pending_commit = None;
        self.created.clear();

        debug!(
            "committed {} effects to container {container} ({} fibers live)",
            records.len(),
            self.arena.len()
        );
        if self.config.dump_tree_on_commit {
            debug!("fiber tree:\n{}", self.arena.dump_tree(root));
        }
        Ok(CommitReport {
            container,
            effects: records,
        })
    }

    fn commit_work(&mut self, id: FiberId) -> Result<Option<EffectRecord>, NodeError> {
        let fiber = &self.arena[id];
        let Some(tag) = fiber.effect_tag else {
            return Ok(None);
        };
        if fiber.kind == FiberKind::Root {
            return Ok(None);
        }
        let record = EffectRecord {
            tag,
            kind: fiber.kind,
            label: fiber.ty.label().to_owned(),
            node: fiber.node(),
        };

        match (tag, fiber.kind, fiber.node()) {
            (EffectTag::Place, FiberKind::Host, Some(node)) => {
                match self.arena.host_parent(id) {
                    Some(parent) => self.applier.insert_child(parent, node)?,
                    None => warn!("placed {} has no host parent", fiber.ty.label()),
                }
            }
            (EffectTag::Update, FiberKind::Host, Some(node)) => {
                if let Some(previous) = fiber.alternate.and_then(|alt| self.arena.get(alt)) {
                    update_properties(&mut self.applier, node, &previous.props, &fiber.props)?;
                }
            }
            (EffectTag::Delete, _, _) => commit_deletion(&self.arena, &mut self.applier, id)?,
            _ => {}
        }
        Ok(Some(record))
    }
}

/// Remove every host node `fiber` produced from its host parent.
///
/// Component fibers have no node of their own, so deletion descends through
/// them to the nearest host fibers of each branch.
fn commit_deletion<A: Applier + ?Sized>(
    arena: &FiberArena,
    applier: &mut A,
    fiber: FiberId,
) -> Result<(), NodeError> {
    let Some(parent) = arena.host_parent(fiber) else {
        return Ok(());
    };
    let mut stack = vec![fiber];
    while let Some(id) = stack.pop() {
        let Some(current) = arena.get(id) else {
            continue;
        };
        match current.kind {
            FiberKind::Component => stack.extend(arena.children(id).into_iter().rev()),
            FiberKind::Host | FiberKind::Root => {
                if let Some(node) = current.node() {
                    applier.remove_child(parent, node)?;
                }
            }
        }
    }
    Ok(())
}

/// Settle a committed tree: drop links to the replaced tree, clear effect
/// bookkeeping, and point each component instance at its new fiber.
fn finish_tree(arena: &mut FiberArena, root: FiberId) {
    for id in arena.descendants(root) {
        let fiber = &mut arena[id];
        fiber.alternate = None;
        fiber.effect_tag = None;
        fiber.effects.clear();
        fiber.pending_state = None;
        if let Some(instance) = fiber.base.instance() {
            instance.set_fiber(Some(id));
        }
    }
}

#[cfg(test)]
#[path = "tests/commit_tests.rs"]
mod tests;
