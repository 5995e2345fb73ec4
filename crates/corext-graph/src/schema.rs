//! Per-kind property schemas
//!
//! Each element kind owns a schema descriptor built at initialization time.
//! Static properties registered on a schema are inherited by subtypes
//! through a parent-name chain walked at lookup - never copied. This
//! replaces the original design's mutable per-type registry attached to a
//! shared type object.

use std::collections::HashMap;
use std::fmt;

use crate::property::{Filter, Interceptor, Listener};

/// Per-type property descriptor. One instance per (kind, name) pair; the
/// chains registered here apply to every node of that kind.
pub struct StaticProperty {
    name: String,
    /// A change to a visual property warrants a redraw.
    pub is_visual: bool,
    pub(crate) interceptors: Vec<Interceptor>,
    pub(crate) listeners: Vec<Listener>,
    pub(crate) filters: Vec<Filter>,
}

impl StaticProperty {
    pub fn new(name: &str, is_visual: bool) -> Self {
        Self {
            name: name.to_string(),
            is_visual,
            interceptors: Vec::new(),
            listeners: Vec::new(),
            filters: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Register a static-level interceptor (runs before any node- or
    /// instance-level interceptor).
    pub fn add_interceptor(&mut self, f: Interceptor) {
        self.interceptors.push(f);
    }

    /// Register a static-level listener (fires before node- and
    /// instance-level listeners).
    pub fn add_listener(&mut self, f: Listener) {
        self.listeners.push(f);
    }

    /// Register a static-level read filter.
    pub fn add_filter(&mut self, f: Filter) {
        self.filters.push(f);
    }
}

impl fmt::Debug for StaticProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticProperty")
            .field("name", &self.name)
            .field("is_visual", &self.is_visual)
            .finish()
    }
}

/// Schema descriptor for one element kind.
#[derive(Debug)]
pub struct Schema {
    type_name: String,
    parent: Option<String>,
    statics: HashMap<String, StaticProperty>,
}

impl Schema {
    pub fn new(type_name: &str, parent: Option<&str>) -> Self {
        Self {
            type_name: type_name.to_string(),
            parent: parent.map(|p| p.to_string()),
            statics: HashMap::new(),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    /// Register a static property on this schema. Replaces any existing
    /// descriptor with the same name and returns it for chain registration.
    pub fn register_property(&mut self, prop: StaticProperty) -> &mut StaticProperty {
        let name = prop.name().to_string();
        self.statics.insert(name.clone(), prop);
        self.statics
            .get_mut(&name)
            .unwrap_or_else(|| unreachable!("property just inserted"))
    }

    /// Look up a property declared directly on this schema (no inheritance).
    pub fn own_property(&self, name: &str) -> Option<&StaticProperty> {
        self.statics.get(name)
    }

    pub fn own_property_mut(&mut self, name: &str) -> Option<&mut StaticProperty> {
        self.statics.get_mut(name)
    }
}

/// Registry of all schemas, keyed by kind name.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: HashMap<String, Schema>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or fetch) the schema for a kind.
    pub fn register_type(&mut self, type_name: &str, parent: Option<&str>) -> &mut Schema {
        self.schemas
            .entry(type_name.to_string())
            .or_insert_with(|| Schema::new(type_name, parent))
    }

    pub fn schema(&self, type_name: &str) -> Option<&Schema> {
        self.schemas.get(type_name)
    }

    pub fn schema_mut(&mut self, type_name: &str) -> Option<&mut Schema> {
        self.schemas.get_mut(type_name)
    }

    /// Resolve a static property for a kind, walking the parent chain.
    /// A subtype's descriptor shadows its parent's.
    pub fn lookup(&self, type_name: &str, prop: &str) -> Option<&StaticProperty> {
        let mut current = Some(type_name);
        // Cycle guard: chains are registered acyclically, but a bad parent
        // name must not hang the lookup.
        let mut hops = 0;
        while let Some(name) = current {
            let schema = self.schemas.get(name)?;
            if let Some(p) = schema.own_property(prop) {
                return Some(p);
            }
            current = schema.parent();
            hops += 1;
            if hops > 32 {
                return None;
            }
        }
        None
    }

    /// Whether a property is visual for the given kind.
    pub fn is_visual(&self, type_name: &str, prop: &str) -> bool {
        self.lookup(type_name, prop).map(|p| p.is_visual).unwrap_or(false)
    }
}

/// Build the registry of built-in kinds and their static properties.
pub fn default_registry() -> SchemaRegistry {
    let mut reg = SchemaRegistry::new();

    let base = reg.register_type("GraphNode", None);
    base.register_property(StaticProperty::new("id", false));
    base.register_property(StaticProperty::new("name", false));

    let html = reg.register_type("HtmlElement", Some("GraphNode"));
    html.register_property(StaticProperty::new("class", true));
    html.register_property(StaticProperty::new("style", true));
    html.register_property(StaticProperty::new("title", true));

    let anchor = reg.register_type("Anchor", Some("HtmlElement"));
    anchor.register_property(StaticProperty::new("href", true));
    anchor.register_property(StaticProperty::new("target", true));
    anchor.register_property(StaticProperty::new("rel", true));

    let header = reg.register_type("Header", Some("HtmlElement"));
    header.register_property(StaticProperty::new("headerLevel", true));

    let phrase = reg.register_type("Phrase", Some("HtmlElement"));
    phrase.register_property(StaticProperty::new("phraseType", true));

    let plain = reg.register_type("PlainText", Some("GraphNode"));
    plain.register_property(StaticProperty::new("text", true));

    let html_text = reg.register_type("HtmlText", Some("HtmlElement"));
    html_text.register_property(StaticProperty::new("html", true));

    reg
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inherited_lookup_walks_parent_chain() {
        let reg = default_registry();
        // "class" is declared on HtmlElement; Anchor inherits it.
        let p = reg.lookup("Anchor", "class");
        assert!(p.is_some());
        assert!(reg.is_visual("Anchor", "class"));
        // "id" comes from the GraphNode base.
        assert!(reg.lookup("Anchor", "id").is_some());
        assert!(!reg.is_visual("Anchor", "id"));
    }

    #[test]
    fn test_subtype_shadows_parent_descriptor() {
        let mut reg = default_registry();
        reg.register_type("Anchor", Some("HtmlElement"))
            .register_property(StaticProperty::new("class", false));
        assert!(!reg.is_visual("Anchor", "class"));
        assert!(reg.is_visual("HtmlElement", "class"));
    }

    #[test]
    fn test_unknown_type_resolves_nothing() {
        let reg = default_registry();
        assert!(reg.lookup("NoSuchKind", "id").is_none());
    }
}
