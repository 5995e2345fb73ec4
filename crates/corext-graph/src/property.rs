//! Observable property values
//!
//! Properties are read and written exclusively through the graph's
//! `get_value`/`set_value`/`get_property` API. Three extension points hang
//! off every property: interceptors (pre-change transforms), listeners
//! (post-change callbacks) and filters (read-time transforms). Chains exist
//! at three tiers - static (per element kind, see `schema`), node-level and
//! property-instance-level - and always run in that order.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde::Serialize;

use crate::{Graph, NodeId};

/// A property value. Closed set of primitives; assigning one `Property` to
/// another unwraps the source value eagerly at set time (no live aliasing).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Int(i64),
    Number(f64),
    Str(String),
}

impl PropertyValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(i) => Some(*i),
            PropertyValue::Number(n) => Some(*n as i64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Null => Ok(()),
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::Int(i) => write!(f, "{}", i),
            PropertyValue::Number(n) => write!(f, "{}", n),
            PropertyValue::Str(s) => f.write_str(s),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        PropertyValue::Bool(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        PropertyValue::Int(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        PropertyValue::Int(v as i64)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        PropertyValue::Number(v)
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        PropertyValue::Str(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        PropertyValue::Str(v)
    }
}

/// Pre-change transform; receives the candidate value, returns the value to
/// commit. Chained in registration order, each feeding the next.
pub type Interceptor = Rc<dyn Fn(&PropertyValue) -> PropertyValue>;

/// Post-change callback: (owner node, property name, committed value).
pub type Listener = Rc<dyn Fn(NodeId, &str, &PropertyValue)>;

/// Read-time transform applied by `get_value`; never mutates the stored value.
pub type Filter = Rc<dyn Fn(&PropertyValue) -> PropertyValue>;

/// An instance-level value holder bound to an owner node. Created lazily on
/// first access when no static descriptor pre-registered the name.
pub struct Property {
    name: String,
    value: PropertyValue,
    pub(crate) interceptors: Vec<Interceptor>,
    pub(crate) listeners: Vec<Listener>,
    pub(crate) filters: Vec<Filter>,
}

impl Property {
    pub fn new(name: &str, value: PropertyValue) -> Self {
        Self {
            name: name.to_string(),
            value,
            interceptors: Vec::new(),
            listeners: Vec::new(),
            filters: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The stored (unfiltered) value.
    pub fn value(&self) -> &PropertyValue {
        &self.value
    }

    pub(crate) fn commit(&mut self, value: PropertyValue) {
        self.value = value;
    }

    /// Register an instance-level interceptor.
    pub fn add_interceptor(&mut self, f: Interceptor) {
        self.interceptors.push(f);
    }

    /// Register an instance-level listener.
    pub fn add_listener(&mut self, f: Listener) {
        self.listeners.push(f);
    }

    /// Register an instance-level filter.
    pub fn add_filter(&mut self, f: Filter) {
        self.filters.push(f);
    }

    /// Clone this property: deep-copies the wrapped value, shares the chains.
    pub fn clone_property(&self) -> Property {
        Property {
            name: self.name.clone(),
            value: self.value.clone(),
            interceptors: self.interceptors.clone(),
            listeners: self.listeners.clone(),
            filters: self.filters.clone(),
        }
    }
}

impl fmt::Debug for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.name)
            .field("value", &self.value)
            .field("interceptors", &self.interceptors.len())
            .field("listeners", &self.listeners.len())
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl Graph {
    /// Set a property value. Returns true when the property is visual and
    /// the graph is currently bound to a UI-capable host, signalling the
    /// caller that a redraw is warranted.
    ///
    /// The change machinery only fires when the new value differs from the
    /// current one. Interceptors are bypassed until the node has been
    /// through its first layout pass.
    pub fn set_value<V: Into<PropertyValue>>(&mut self, id: NodeId, name: &str, value: V) -> bool {
        let mut value = value.into();
        if self.get(id).is_none() {
            return false;
        }
        let idx = id.index();

        let kind_name = self.nodes[idx].kind.schema_name().to_string();
        let (is_visual, static_interceptors) = match self.schemas.lookup(&kind_name, name) {
            Some(s) => (s.is_visual, s.interceptors.clone()),
            None => (false, Vec::new()),
        };

        let initialized = self.nodes[idx].initial_properties.is_some();
        {
            let prop = self.nodes[idx]
                .properties
                .entry(name.to_string())
                .or_insert_with(|| Property::new(name, PropertyValue::Null));
            if prop.value == value {
                return false;
            }
            if initialized {
                for f in &static_interceptors {
                    value = f(&value);
                }
                let instance: Vec<Interceptor> = prop.interceptors.clone();
                for f in &instance {
                    value = f(&value);
                }
            }
            prop.commit(value.clone());
        }

        self.notify_changed(id, name, &value);
        is_visual && self.ui_enabled
    }

    /// Assign from another property, unwrapping its value eagerly. No live
    /// binding is retained across the assignment.
    pub fn set_value_from(&mut self, id: NodeId, name: &str, source: &Property) -> bool {
        self.set_value(id, name, source.value().clone())
    }

    /// Read a property value with all read-time filters applied (static,
    /// then node-level, then instance-level). The stored value is never
    /// mutated. Returns None for unknown nodes or unset properties.
    pub fn get_value(&self, id: NodeId, name: &str) -> Option<PropertyValue> {
        let node = self.get(id)?;
        let prop = node.properties.get(name)?;
        let mut value = prop.value().clone();
        if let Some(s) = self.schemas.lookup(node.kind.schema_name(), name) {
            for f in &s.filters {
                value = f(&value);
            }
        }
        if let Some(fs) = node.node_filters.get(name) {
            for f in fs {
                value = f(&value);
            }
        }
        for f in &prop.filters {
            value = f(&value);
        }
        Some(value)
    }

    /// The stored value with no filters applied.
    pub fn raw_value(&self, id: NodeId, name: &str) -> Option<&PropertyValue> {
        self.get(id)?.properties.get(name).map(|p| p.value())
    }

    /// Fetch the property instance, creating a dynamic one on first access.
    pub fn get_property(&mut self, id: NodeId, name: &str) -> Option<&mut Property> {
        self.get(id)?;
        let idx = id.index();
        Some(
            self.nodes[idx]
                .properties
                .entry(name.to_string())
                .or_insert_with(|| Property::new(name, PropertyValue::Null)),
        )
    }

    /// Register a node-level listener for one property name.
    pub fn add_node_listener(&mut self, id: NodeId, name: &str, f: Listener) {
        if let Some(node) = self.get_mut(id) {
            node.node_listeners.entry(name.to_string()).or_default().push(f);
        }
    }

    /// Register a node-level read filter for one property name.
    pub fn add_node_filter(&mut self, id: NodeId, name: &str, f: Filter) {
        if let Some(node) = self.get_mut(id) {
            node.node_filters.entry(name.to_string()).or_default().push(f);
        }
    }

    /// Register a handler fired after any property of the node changes.
    pub fn add_any_changed_listener(&mut self, id: NodeId, f: Listener) {
        if let Some(node) = self.get_mut(id) {
            node.any_changed.push(f);
        }
    }

    /// Fire the post-commit listener chains for one property, in tier order:
    /// static, node-level, instance-level, then node-wide handlers. Returns
    /// the redraw-warranted flag exactly as `set_value` does.
    pub(crate) fn notify_changed(&mut self, id: NodeId, name: &str, value: &PropertyValue) -> bool {
        let idx = id.index();
        let kind_name = self.nodes[idx].kind.schema_name().to_string();
        let (is_visual, static_listeners) = match self.schemas.lookup(&kind_name, name) {
            Some(s) => (s.is_visual, s.listeners.clone()),
            None => (false, Vec::new()),
        };
        let node_listeners: Vec<Listener> = self.nodes[idx]
            .node_listeners
            .get(name)
            .cloned()
            .unwrap_or_default();
        let instance_listeners: Vec<Listener> = self.nodes[idx]
            .properties
            .get(name)
            .map(|p| p.listeners.clone())
            .unwrap_or_default();
        let any_changed: Vec<Listener> = self.nodes[idx].any_changed.clone();

        for l in &static_listeners {
            l(id, name, value);
        }
        for l in &node_listeners {
            l(id, name, value);
        }
        for l in &instance_listeners {
            l(id, name, value);
        }
        for l in &any_changed {
            l(id, name, value);
        }
        is_visual && self.ui_enabled
    }

    /// Snapshot of all current property values on a node.
    pub(crate) fn property_snapshot(&self, id: NodeId) -> HashMap<String, PropertyValue> {
        match self.get(id) {
            Some(node) => node
                .properties
                .iter()
                .map(|(k, p)| (k.clone(), p.value().clone()))
                .collect(),
            None => HashMap::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ElementKind, HeadlessHost};
    use std::cell::RefCell;

    #[test]
    fn test_set_then_get_identity() {
        let mut graph = Graph::new();
        let n = graph.create_node(ElementKind::Html, "div");
        graph.set_value(n, "title", "hello");
        assert_eq!(graph.get_value(n, "title"), Some(PropertyValue::from("hello")));
    }

    #[test]
    fn test_equal_value_fires_nothing() {
        let mut graph = Graph::new();
        let n = graph.create_node(ElementKind::Html, "div");
        let count = Rc::new(RefCell::new(0));
        let c = count.clone();
        graph.add_node_listener(n, "x", Rc::new(move |_, _, _| *c.borrow_mut() += 1));

        graph.set_value(n, "x", 1);
        graph.set_value(n, "x", 1); // no change, no listener
        graph.set_value(n, "x", 2);
        assert_eq!(*count.borrow(), 2);
    }

    #[test]
    fn test_interceptors_bypassed_before_first_layout() {
        let mut graph = Graph::new();
        let n = graph.create_node(ElementKind::Html, "div");
        if let Some(p) = graph.get_property(n, "x") {
            p.add_interceptor(Rc::new(|v| match v.as_int() {
                Some(i) => PropertyValue::Int(i + 10),
                None => v.clone(),
            }));
        }

        // No layout pass yet: interceptor must not run.
        graph.set_value(n, "x", 1);
        assert_eq!(graph.raw_value(n, "x"), Some(&PropertyValue::Int(1)));

        let mut host = HeadlessHost::new();
        graph.update_layout(&mut host, n, true);

        graph.set_value(n, "x", 2);
        assert_eq!(graph.raw_value(n, "x"), Some(&PropertyValue::Int(12)));
    }

    #[test]
    fn test_interceptor_chain_order() {
        let mut graph = Graph::new();
        let n = graph.create_node(ElementKind::Html, "div");
        let mut host = HeadlessHost::new();
        graph.update_layout(&mut host, n, true);

        if let Some(p) = graph.get_property(n, "x") {
            // A doubles, B adds one; B must observe A's output.
            p.add_interceptor(Rc::new(|v| PropertyValue::Int(v.as_int().unwrap_or(0) * 2)));
            p.add_interceptor(Rc::new(|v| PropertyValue::Int(v.as_int().unwrap_or(0) + 1)));
        }
        graph.set_value(n, "x", 3);
        assert_eq!(graph.raw_value(n, "x"), Some(&PropertyValue::Int(7)));
    }

    #[test]
    fn test_filters_transform_reads_only() {
        let mut graph = Graph::new();
        let n = graph.create_node(ElementKind::Html, "div");
        graph.set_value(n, "label", "plain");
        if let Some(p) = graph.get_property(n, "label") {
            p.add_filter(Rc::new(|v| {
                PropertyValue::Str(format!("[{}]", v))
            }));
        }
        assert_eq!(
            graph.get_value(n, "label"),
            Some(PropertyValue::from("[plain]"))
        );
        // Stored value untouched.
        assert_eq!(graph.raw_value(n, "label"), Some(&PropertyValue::from("plain")));
    }

    #[test]
    fn test_clone_property_copies_value_and_shares_chains() {
        let mut original = Property::new("x", PropertyValue::Int(1));
        original.add_listener(Rc::new(|_, _, _| {}));
        original.add_filter(Rc::new(|v| v.clone()));

        let mut copy = original.clone_property();
        copy.commit(PropertyValue::Int(2));

        // Independent value, shared chain entries.
        assert_eq!(original.value(), &PropertyValue::Int(1));
        assert_eq!(copy.value(), &PropertyValue::Int(2));
        assert_eq!(copy.name(), "x");
        assert!(Rc::ptr_eq(&original.listeners[0], &copy.listeners[0]));
        assert!(Rc::ptr_eq(&original.filters[0], &copy.filters[0]));
    }

    #[test]
    fn test_property_aliasing_unwraps_eagerly() {
        let mut graph = Graph::new();
        let n = graph.create_node(ElementKind::Html, "div");
        let source = Property::new("src", PropertyValue::from("aliased"));
        graph.set_value_from(n, "dst", &source);
        assert_eq!(graph.raw_value(n, "dst"), Some(&PropertyValue::from("aliased")));
    }
}
