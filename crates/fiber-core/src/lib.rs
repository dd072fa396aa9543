#![doc = r"Fiber-based incremental reconciliation engine.

Elements describe a UI tree as plain data. A [`Reconciler`] diffs each new
description against the fiber tree of the previous render, walks the
work-in-progress tree in budgeted slices, and commits the resulting effects to
a host tree through an [`Applier`]."]

extern crate self as fiber_core;

pub mod applier;
pub mod config;
pub mod element;
pub mod error;
pub mod fiber;
pub mod hooks;
pub mod platform;
pub mod props_diff;
pub mod runtime;

mod commit;
mod reconcile;
mod work_loop;

pub use applier::{Applier, HostNode, HostNodeKind, HostOp, MemoryApplier, NodeKind};
pub use config::ReconcilerConfig;
pub use element::{
    h, text, Child, ComponentRef, Element, ElementType, EventHandler, HostEvent, IntoChildren,
    PropValue, Props, StyleMap, NODE_VALUE, STYLE,
};
pub use error::{ComponentError, NodeError, ReconcileError};
pub use fiber::{EffectTag, Fiber, FiberArena, FiberBase, FiberId, FiberKind, FiberType};
pub use hooks::{ComponentInstance, HookKey, InstanceId, RenderContext, SharedState, StateSetter};
pub use platform::{Clock, Deadline, RuntimeScheduler, Unbounded, UnitBudget};
pub use props_diff::update_properties;
pub use runtime::{DefaultScheduler, Runtime, RuntimeHandle, Update};
pub use work_loop::{CommitReport, EffectRecord, Reconciler, StepOutcome};

/// Host node handle handed out by an [`Applier`].
pub type NodeId = usize;

#[cfg(feature = "std-hash")]
pub(crate) mod map {
    pub use std::collections::HashMap;
}

#[cfg(not(feature = "std-hash"))]
pub(crate) mod map {
    pub use hashbrown::HashMap;
}
