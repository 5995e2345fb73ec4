//! CoreXT graph - retained node tree with observable properties
//!
//! An arena-backed UI node tree (`Graph`/`GraphNode`) with a three-tier
//! property observation model (interceptors, listeners, filters) layered on
//! per-kind schemas, plus capture/bubble event dispatch and a host-abstracted
//! layout pass that mirrors the tree to DOM-like elements.

mod elements;
mod events;
mod host;
mod layout;
mod node;
mod property;
mod schema;

pub use elements::{
    header_level_for_tag, is_void_element, phrase_type_for_tag, ElementKind, NodeTypeRegistry,
    PhraseTypes,
};
pub use events::{EventDispatcher, EventHandler, EventPhase, GraphEvent};
pub use host::{DomHost, ElementHandle, HeadlessHost, MemoryDom};
pub use node::{Graph, GraphNode};
pub use property::{Filter, Interceptor, Listener, Property, PropertyValue};
pub use schema::{default_registry, Schema, SchemaRegistry, StaticProperty};

use serde::Serialize;

/// Node identifier (index into the graph arena)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Sentinel for "no node" (detached parent link)
    pub const NONE: NodeId = NodeId(u32::MAX);

    /// Check whether this id is the NONE sentinel
    #[inline]
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    #[inline]
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}
