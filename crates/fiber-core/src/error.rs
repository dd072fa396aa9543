use thiserror::Error;

use crate::NodeId;

/// Failure reported by an [`Applier`](crate::Applier) while mutating the host tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    #[error("host node {id} missing")]
    Missing { id: NodeId },
    #[error("host node {child} is not a child of {parent}")]
    NotAChild { parent: NodeId, child: NodeId },
    #[error("host node {id} cannot hold children")]
    NotAContainer { id: NodeId },
}

/// Evaluation fault raised by a component body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComponentError {
    /// The component produced something that is not a well-formed element tree.
    #[error("malformed element: {0}")]
    Malformed(String),
    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileError {
    #[error(transparent)]
    Host(#[from] NodeError),
    #[error("component `{name}` failed to render")]
    Component {
        name: &'static str,
        #[source]
        source: ComponentError,
    },
}
