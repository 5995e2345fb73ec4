//! Graph arena and node structure
//!
//! Nodes live in an append-only arena addressed by `NodeId`. The parent
//! link is a non-owning id; the ordered child list is owned by the parent.
//! Removal unlinks and detaches the element linkage but never frees the
//! arena slot - disposal is the caller's concern.

use std::collections::HashMap;
use std::fmt;

use crate::elements::ElementKind;
use crate::events::EventDispatcher;
use crate::host::ElementHandle;
use crate::property::{Filter, Listener, Property, PropertyValue};
use crate::schema::{default_registry, SchemaRegistry};
use crate::NodeId;

/// One node of the retained tree.
pub struct GraphNode {
    pub(crate) id: NodeId,
    pub name: String,
    /// Friendly label for inspection; defaults to the kind's schema name.
    pub display_name: String,
    pub(crate) parent: NodeId,
    pub(crate) children: Vec<NodeId>,
    pub(crate) properties: HashMap<String, Property>,
    /// Snapshot taken on the first layout pass; None until then.
    pub(crate) initial_properties: Option<HashMap<String, PropertyValue>>,
    pub(crate) events: HashMap<String, EventDispatcher>,
    pub(crate) node_listeners: HashMap<String, Vec<Listener>>,
    pub(crate) node_filters: HashMap<String, Vec<Filter>>,
    pub(crate) any_changed: Vec<Listener>,
    pub kind: ElementKind,
    pub html_tag: String,
    pub(crate) element: Option<ElementHandle>,
    /// Tag the element was materialized with; a mismatch forces a rebuild.
    pub(crate) element_tag: String,
    /// Host element this node's element was last appended under.
    pub(crate) attached_under: Option<ElementHandle>,
}

impl GraphNode {
    fn new(id: NodeId, kind: ElementKind, html_tag: &str) -> Self {
        let display_name = kind.schema_name().to_string();
        Self {
            id,
            name: String::new(),
            display_name,
            parent: NodeId::NONE,
            children: Vec::new(),
            properties: HashMap::new(),
            initial_properties: None,
            events: HashMap::new(),
            node_listeners: HashMap::new(),
            node_filters: HashMap::new(),
            any_changed: Vec::new(),
            kind,
            html_tag: html_tag.to_string(),
            element: None,
            element_tag: String::new(),
            attached_under: None,
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn parent(&self) -> NodeId {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// The materialized host element, if any.
    pub fn element(&self) -> Option<ElementHandle> {
        self.element
    }

    /// Whether the node has been through its first layout pass.
    pub fn is_initialized(&self) -> bool {
        self.initial_properties.is_some()
    }

    /// Clear the element linkage. The element itself is the host's to
    /// reclaim; the next layout pass will materialize a fresh one.
    pub(crate) fn detach(&mut self) {
        self.element = None;
        self.element_tag.clear();
        self.attached_under = None;
    }
}

impl fmt::Debug for GraphNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphNode")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("html_tag", &self.html_tag)
            .field("children", &self.children.len())
            .field("properties", &self.properties.len())
            .finish()
    }
}

/// Arena-backed node tree plus the schema registry it resolves static
/// properties against.
pub struct Graph {
    pub(crate) nodes: Vec<GraphNode>,
    pub(crate) schemas: SchemaRegistry,
    /// Set from `DomHost::is_client()` at layout time; gates the redraw
    /// signal returned by `set_value`.
    pub(crate) ui_enabled: bool,
}

impl Graph {
    /// New graph with the built-in schema registry.
    pub fn new() -> Self {
        Self::with_registry(default_registry())
    }

    pub fn with_registry(schemas: SchemaRegistry) -> Self {
        Self {
            nodes: Vec::new(),
            schemas,
            ui_enabled: false,
        }
    }

    /// Allocate a node. Ids are monotonic; slots are never reused.
    pub fn create_node(&mut self, kind: ElementKind, html_tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(GraphNode::new(id, kind, html_tag));
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&GraphNode> {
        if id.is_none() {
            return None;
        }
        self.nodes.get(id.index())
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut GraphNode> {
        if id.is_none() {
            return None;
        }
        self.nodes.get_mut(id.index())
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn schemas(&self) -> &SchemaRegistry {
        &self.schemas
    }

    pub fn schemas_mut(&mut self) -> &mut SchemaRegistry {
        &mut self.schemas
    }

    /// Whether the graph is currently bound to a UI-capable host.
    pub fn ui_enabled(&self) -> bool {
        self.ui_enabled
    }

    /// Append a child. Idempotent: a child already under this parent is
    /// left alone. A child owned by another parent is moved - it is
    /// detached from the old parent first, keeping the single-ownership
    /// invariant active rather than assumed.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if parent == child || self.get(parent).is_none() || self.get(child).is_none() {
            return false;
        }
        let old_parent = self.nodes[child.index()].parent;
        if old_parent == parent {
            return false;
        }
        if !old_parent.is_none() {
            self.remove_child(old_parent, child);
        }
        self.nodes[parent.index()].children.push(child);
        self.nodes[child.index()].parent = parent;
        true
    }

    /// Unlink a child and clear its element linkage. Does not dispose the
    /// subtree.
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.get(parent).is_none() || self.get(child).is_none() {
            return false;
        }
        let children = &mut self.nodes[parent.index()].children;
        let before = children.len();
        children.retain(|c| *c != child);
        if children.len() == before {
            return false;
        }
        let node = &mut self.nodes[child.index()];
        node.parent = NodeId::NONE;
        node.detach();
        true
    }

    /// Unlink the child at a position; returns its id.
    pub fn remove_child_at(&mut self, parent: NodeId, index: usize) -> Option<NodeId> {
        let child = *self.get(parent)?.children.get(index)?;
        self.remove_child(parent, child);
        Some(child)
    }

    /// Unlink every child of a node.
    pub fn remove_all_children(&mut self, parent: NodeId) {
        let children: Vec<NodeId> = match self.get(parent) {
            Some(n) => n.children.clone(),
            None => return,
        };
        for child in children {
            self.remove_child(parent, child);
        }
    }

    /// Depth-first search for the first node whose `id` property equals the
    /// given value. Linear scan; not indexed.
    pub fn get_item(&self, root: NodeId, id_value: &str) -> Option<NodeId> {
        let node = self.get(root)?;
        if let Some(v) = node.properties.get("id") {
            if v.value().as_str() == Some(id_value) {
                return Some(root);
            }
        }
        for &child in &node.children {
            if let Some(found) = self.get_item(child, id_value) {
                return Some(found);
            }
        }
        None
    }

    /// Iterate a subtree depth-first, pre-order.
    pub fn descendants(&self, root: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if self.get(id).is_none() {
                continue;
            }
            out.push(id);
            for &child in self.nodes[id.index()].children.iter().rev() {
                stack.push(child);
            }
        }
        out
    }
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Graph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Graph")
            .field("nodes", &self.nodes.len())
            .field("ui_enabled", &self.ui_enabled)
            .finish()
    }
}
