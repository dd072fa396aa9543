//! Host tree mutation primitives and an in-memory host.

use std::fmt::Write as _;

use indexmap::IndexMap;

use crate::element::{EventHandler, HostEvent, PropValue, NODE_VALUE};
use crate::error::NodeError;
use crate::NodeId;

/// Kind of host node the reconciler asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind<'a> {
    Element(&'a str),
    Text,
}

/// Mutation surface of a host tree.
///
/// The reconciler only calls these during the commit phase, except for
/// [`create_node`](Applier::create_node) and the initial property writes,
/// which happen while a fiber is first visited and touch detached nodes, and
/// [`dispose_node`](Applier::dispose_node) when such a pass is abandoned.
pub trait Applier {
    fn create_node(&mut self, kind: NodeKind<'_>) -> Result<NodeId, NodeError>;

    fn set_property(&mut self, node: NodeId, key: &str, value: &PropValue)
        -> Result<(), NodeError>;

    fn remove_property(&mut self, node: NodeId, key: &str) -> Result<(), NodeError>;

    fn set_style(&mut self, node: NodeId, key: &str, value: &str) -> Result<(), NodeError>;

    fn remove_style(&mut self, node: NodeId, key: &str) -> Result<(), NodeError>;

    fn set_event_handler(
        &mut self,
        node: NodeId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), NodeError>;

    fn remove_event_handler(
        &mut self,
        node: NodeId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), NodeError>;

    /// Append `child` to `parent`, detaching it from a previous parent first.
    fn insert_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError>;

    /// Detach `child` from `parent` and dispose of its subtree.
    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError>;

    /// Drop a node created for a pass that never committed, along with any
    /// children it was given. Nodes attached to a parent, containers and
    /// unknown ids are left alone.
    fn dispose_node(&mut self, node: NodeId) -> Result<(), NodeError>;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostNodeKind {
    /// Root a render targets. Never created by the reconciler.
    Container,
    Element(String),
    Text,
}

#[derive(Clone, Debug)]
pub struct HostNode {
    pub kind: HostNodeKind,
    pub properties: IndexMap<String, PropValue>,
    pub style: IndexMap<String, String>,
    pub listeners: Vec<(String, EventHandler)>,
    pub children: Vec<NodeId>,
    pub parent: Option<NodeId>,
}

impl HostNode {
    fn new(kind: HostNodeKind) -> Self {
        Self {
            kind,
            properties: IndexMap::new(),
            style: IndexMap::new(),
            listeners: Vec::new(),
            children: Vec::new(),
            parent: None,
        }
    }

    pub fn tag(&self) -> Option<&str> {
        match &self.kind {
            HostNodeKind::Element(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn property(&self, key: &str) -> Option<&PropValue> {
        self.properties.get(key)
    }

    pub fn has_listener(&self, event: &str) -> bool {
        self.listeners.iter().any(|(name, _)| name == event)
    }
}

/// Mutation recorded by [`MemoryApplier`], in call order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostOp {
    Create { node: NodeId, kind: HostNodeKind },
    SetProperty { node: NodeId, key: String, value: String },
    RemoveProperty { node: NodeId, key: String },
    SetStyle { node: NodeId, key: String, value: String },
    RemoveStyle { node: NodeId, key: String },
    AddListener { node: NodeId, event: String },
    RemoveListener { node: NodeId, event: String },
    Insert { parent: NodeId, child: NodeId },
    Remove { parent: NodeId, child: NodeId },
    Dispose { node: NodeId },
}

/// Host tree kept in memory, with a log of every mutation applied to it.
#[derive(Default)]
pub struct MemoryApplier {
    nodes: Vec<Option<HostNode>>,
    ops: Vec<HostOp>,
}

impl MemoryApplier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a root node for [`Reconciler::render`](crate::Reconciler::render).
    pub fn create_container(&mut self) -> NodeId {
        self.push(HostNode::new(HostNodeKind::Container))
    }

    fn push(&mut self, node: HostNode) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Some(node));
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&HostNode> {
        self.nodes.get(id).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut HostNode, NodeError> {
        self.nodes
            .get_mut(id)
            .and_then(Option::as_mut)
            .ok_or(NodeError::Missing { id })
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id).map_or(&[], |node| node.children.as_slice())
    }

    /// Concatenated text of every text node below `id`.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut output = String::new();
        self.collect_text(id, &mut output);
        output
    }

    fn collect_text(&self, id: NodeId, output: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        if node.kind == HostNodeKind::Text {
            if let Some(value) = node.property(NODE_VALUE) {
                let _ = write!(output, "{value}");
            }
        }
        for &child in &node.children {
            self.collect_text(child, output);
        }
    }

    /// Invoke the `event` listeners registered on `target`. Returns how many ran.
    pub fn dispatch(&self, target: NodeId, event: &str) -> Result<usize, NodeError> {
        let node = self.node(target).ok_or(NodeError::Missing { id: target })?;
        let handlers: Vec<EventHandler> = node
            .listeners
            .iter()
            .filter(|(name, _)| name == event)
            .map(|(_, handler)| handler.clone())
            .collect();
        let host_event = HostEvent {
            event_type: event.to_owned(),
            target,
        };
        for handler in &handlers {
            handler.call(&host_event);
        }
        Ok(handlers.len())
    }

    /// Element nodes below `root` (inclusive) with the given tag, in document order.
    pub fn find_by_tag(&self, root: NodeId, tag: &str) -> Vec<NodeId> {
        let mut found = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            let Some(node) = self.node(id) else {
                continue;
            };
            if node.tag() == Some(tag) {
                found.push(id);
            }
            stack.extend(node.children.iter().rev().copied());
        }
        found
    }

    pub fn ops(&self) -> &[HostOp] {
        &self.ops
    }

    pub fn take_ops(&mut self) -> Vec<HostOp> {
        std::mem::take(&mut self.ops)
    }

    /// Number of live host nodes, containers included.
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Markup of everything below `id`, e.g. `<div id="x">A</div>`.
    pub fn to_markup(&self, id: NodeId) -> String {
        let mut output = String::new();
        if let Some(node) = self.node(id) {
            for &child in &node.children {
                self.write_markup(&mut output, child);
            }
        }
        output
    }

    fn write_markup(&self, output: &mut String, id: NodeId) {
        let Some(node) = self.node(id) else {
            return;
        };
        match &node.kind {
            HostNodeKind::Text => {
                if let Some(value) = node.property(NODE_VALUE) {
                    let _ = write!(output, "{value}");
                }
            }
            HostNodeKind::Container => {
                for &child in &node.children {
                    self.write_markup(output, child);
                }
            }
            HostNodeKind::Element(tag) => {
                let _ = write!(output, "<{tag}");
                for (key, value) in &node.properties {
                    let _ = write!(output, " {key}=\"{value}\"");
                }
                if !node.style.is_empty() {
                    output.push_str(" style=\"");
                    for (key, value) in &node.style {
                        let _ = write!(output, "{key}: {value};");
                    }
                    output.push('"');
                }
                output.push('>');
                for &child in &node.children {
                    self.write_markup(output, child);
                }
                let _ = write!(output, "</{tag}>");
            }
        }
    }

    pub fn dump_tree(&self, root: Option<NodeId>) -> String {
        let mut output = String::new();
        if let Some(root_id) = root {
            self.dump_node(&mut output, root_id, 0);
        } else {
            output.push_str("(no root)\n");
        }
        output
    }

    fn dump_node(&self, output: &mut String, id: NodeId, depth: usize) {
        let indent = "  ".repeat(depth);
        let Some(node) = self.node(id) else {
            let _ = writeln!(output, "{indent}[{id}] (missing)");
            return;
        };
        match &node.kind {
            HostNodeKind::Container => {
                let _ = writeln!(output, "{indent}[{id}] #container");
            }
            HostNodeKind::Element(tag) => {
                let _ = writeln!(output, "{indent}[{id}] <{tag}>");
            }
            HostNodeKind::Text => {
                let value = node
                    .property(NODE_VALUE)
                    .map(ToString::to_string)
                    .unwrap_or_default();
                let _ = writeln!(output, "{indent}[{id}] {value:?}");
            }
        }
        for &child in &node.children {
            self.dump_node(output, child, depth + 1);
        }
    }

    fn dispose(&mut self, id: NodeId) {
        let Some(node) = self.nodes.get_mut(id).and_then(Option::take) else {
            return;
        };
        for child in node.children {
            self.dispose(child);
        }
    }
}

impl Applier for MemoryApplier {
    fn create_node(&mut self, kind: NodeKind<'_>) -> Result<NodeId, NodeError> {
        let kind = match kind {
            NodeKind::Element(tag) => HostNodeKind::Element(tag.to_owned()),
            NodeKind::Text => HostNodeKind::Text,
        };
        let id = self.push(HostNode::new(kind.clone()));
        self.ops.push(HostOp::Create { node: id, kind });
        Ok(id)
    }

    fn set_property(
        &mut self,
        node: NodeId,
        key: &str,
        value: &PropValue,
    ) -> Result<(), NodeError> {
        self.node_mut(node)?
            .properties
            .insert(key.to_owned(), value.clone());
        self.ops.push(HostOp::SetProperty {
            node,
            key: key.to_owned(),
            value: value.to_string(),
        });
        Ok(())
    }

    fn remove_property(&mut self, node: NodeId, key: &str) -> Result<(), NodeError> {
        self.node_mut(node)?.properties.shift_remove(key);
        self.ops.push(HostOp::RemoveProperty {
            node,
            key: key.to_owned(),
        });
        Ok(())
    }

    fn set_style(&mut self, node: NodeId, key: &str, value: &str) -> Result<(), NodeError> {
        self.node_mut(node)?
            .style
            .insert(key.to_owned(), value.to_owned());
        self.ops.push(HostOp::SetStyle {
            node,
            key: key.to_owned(),
            value: value.to_owned(),
        });
        Ok(())
    }

    fn remove_style(&mut self, node: NodeId, key: &str) -> Result<(), NodeError> {
        self.node_mut(node)?.style.shift_remove(key);
        self.ops.push(HostOp::RemoveStyle {
            node,
            key: key.to_owned(),
        });
        Ok(())
    }

    fn set_event_handler(
        &mut self,
        node: NodeId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), NodeError> {
        self.node_mut(node)?
            .listeners
            .push((event.to_owned(), handler.clone()));
        self.ops.push(HostOp::AddListener {
            node,
            event: event.to_owned(),
        });
        Ok(())
    }

    fn remove_event_handler(
        &mut self,
        node: NodeId,
        event: &str,
        handler: &EventHandler,
    ) -> Result<(), NodeError> {
        let listeners = &mut self.node_mut(node)?.listeners;
        if let Some(index) = listeners
            .iter()
            .position(|(name, registered)| name == event && registered == handler)
        {
            listeners.remove(index);
        }
        self.ops.push(HostOp::RemoveListener {
            node,
            event: event.to_owned(),
        });
        Ok(())
    }

    fn insert_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError> {
        if self.node_mut(parent)?.kind == HostNodeKind::Text {
            return Err(NodeError::NotAContainer { id: parent });
        }
        let previous = self.node_mut(child)?.parent;
        if let Some(previous) = previous {
            self.node_mut(previous)?.children.retain(|&id| id != child);
        }
        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);
        self.ops.push(HostOp::Insert { parent, child });
        Ok(())
    }

    fn remove_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), NodeError> {
        let children = &mut self.node_mut(parent)?.children;
        let Some(index) = children.iter().position(|&id| id == child) else {
            return Err(NodeError::NotAChild { parent, child });
        };
        children.remove(index);
        self.dispose(child);
        self.ops.push(HostOp::Remove { parent, child });
        Ok(())
    }

    fn dispose_node(&mut self, node: NodeId) -> Result<(), NodeError> {
        let Some(host) = self.node(node) else {
            return Ok(());
        };
        if host.parent.is_some() || host.kind == HostNodeKind::Container {
            return Ok(());
        }
        self.dispose(node);
        self.ops.push(HostOp::Dispose { node });
        Ok(())
    }
}

#[cfg(test)]
#[path = "tests/applier_tests.rs"]
mod tests;
