//! Element kinds
//!
//! The markup tag-name → node-subtype mapping as a closed tagged union,
//! plus an explicit registry for user-extensible types resolved from dotted
//! `class` attribute names.

use std::collections::HashMap;

use bitflags::bitflags;

bitflags! {
    /// Phrase element flavours (`<em>`, `<strong>`, ...). Flags so a single
    /// phrase node can carry several emphases at once.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PhraseTypes: u16 {
        const EM           = 1;
        const STRONG       = 2;
        const CITE         = 4;
        const DEFINING     = 8;
        const CODE         = 16;
        const SAMPLE       = 32;
        const KEYBOARD     = 64;
        const VARIABLE     = 128;
        const ABBREVIATION = 256;
        const ACRONYM      = 512;
    }
}

/// The kind of a graph node. Closed set of built-ins; `Custom` carries the
/// registered dotted type name resolved through a [`NodeTypeRegistry`].
#[derive(Debug, Clone, PartialEq)]
pub enum ElementKind {
    /// Generic HTML element.
    Html,
    /// `<a>` element.
    Anchor,
    /// Phrase element with its flavour flags.
    Phrase(PhraseTypes),
    /// `<h1>`..`<h6>` with the header level.
    Header(u8),
    /// Running text without entities.
    PlainText,
    /// Running text containing entities, materialized as raw HTML.
    HtmlText,
    /// User-registered type (dotted name).
    Custom(String),
}

impl ElementKind {
    /// Schema name used for static-property lookup.
    pub fn schema_name(&self) -> &str {
        match self {
            ElementKind::Html => "HtmlElement",
            ElementKind::Anchor => "Anchor",
            ElementKind::Phrase(_) => "Phrase",
            ElementKind::Header(_) => "Header",
            ElementKind::PlainText => "PlainText",
            ElementKind::HtmlText => "HtmlText",
            ElementKind::Custom(name) => name,
        }
    }

    /// Resolve the kind for a (lowercased) tag name.
    pub fn for_tag(tag: &str) -> ElementKind {
        if let Some(level) = header_level_for_tag(tag) {
            return ElementKind::Header(level);
        }
        if let Some(flags) = phrase_type_for_tag(tag) {
            return ElementKind::Phrase(flags);
        }
        match tag {
            "a" => ElementKind::Anchor,
            _ => ElementKind::Html,
        }
    }
}

/// Header level for `h1`..`h6`, if the tag is a header.
pub fn header_level_for_tag(tag: &str) -> Option<u8> {
    match tag {
        "h1" => Some(1),
        "h2" => Some(2),
        "h3" => Some(3),
        "h4" => Some(4),
        "h5" => Some(5),
        "h6" => Some(6),
        _ => None,
    }
}

/// Phrase flags for the phrase tag set, if the tag is a phrase element.
pub fn phrase_type_for_tag(tag: &str) -> Option<PhraseTypes> {
    match tag {
        "em" => Some(PhraseTypes::EM),
        "strong" => Some(PhraseTypes::STRONG),
        "cite" => Some(PhraseTypes::CITE),
        "dfn" => Some(PhraseTypes::DEFINING),
        "code" => Some(PhraseTypes::CODE),
        "samp" => Some(PhraseTypes::SAMPLE),
        "kbd" => Some(PhraseTypes::KEYBOARD),
        "var" => Some(PhraseTypes::VARIABLE),
        "abbr" => Some(PhraseTypes::ABBREVIATION),
        "acronym" => Some(PhraseTypes::ACRONYM),
        _ => None,
    }
}

/// Void elements close immediately: no children, no matching end tag.
pub fn is_void_element(tag: &str) -> bool {
    matches!(
        tag,
        "area"
            | "base"
            | "br"
            | "col"
            | "command"
            | "embed"
            | "hr"
            | "img"
            | "input"
            | "keygen"
            | "link"
            | "meta"
            | "param"
            | "source"
            | "track"
            | "wbr"
    )
}

/// Registry resolving dotted type names from `class` attributes to element
/// kinds. `$`-prefixed names are fully qualified; `.`-prefixed names are
/// relative to the registry's UI namespace prefix.
#[derive(Debug, Clone)]
pub struct NodeTypeRegistry {
    ui_prefix: String,
    types: HashMap<String, ElementKind>,
}

impl NodeTypeRegistry {
    pub fn new(ui_prefix: &str) -> Self {
        Self {
            ui_prefix: ui_prefix.to_string(),
            types: HashMap::new(),
        }
    }

    pub fn ui_prefix(&self) -> &str {
        &self.ui_prefix
    }

    /// Register a constructible type under its fully qualified dotted name.
    pub fn register(&mut self, qualified_name: &str, kind: ElementKind) {
        self.types.insert(qualified_name.to_string(), kind);
    }

    /// Resolve a `$Fully.Qualified` or `.Relative` type reference.
    pub fn resolve(&self, reference: &str) -> Option<ElementKind> {
        let qualified = match reference.as_bytes().first() {
            Some(b'$') => reference[1..].to_string(),
            Some(b'.') => format!("{}{}", self.ui_prefix, reference),
            _ => return None,
        };
        self.types.get(&qualified).cloned()
    }
}

impl Default for NodeTypeRegistry {
    fn default() -> Self {
        Self::new("CoreXT.System.UI")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_table() {
        assert_eq!(ElementKind::for_tag("a"), ElementKind::Anchor);
        assert_eq!(ElementKind::for_tag("h3"), ElementKind::Header(3));
        assert_eq!(ElementKind::for_tag("em"), ElementKind::Phrase(PhraseTypes::EM));
        assert_eq!(ElementKind::for_tag("div"), ElementKind::Html);
    }

    #[test]
    fn test_void_set() {
        assert!(is_void_element("br"));
        assert!(is_void_element("img"));
        assert!(!is_void_element("div"));
        assert!(!is_void_element("span"));
    }

    #[test]
    fn test_registry_resolution() {
        let mut reg = NodeTypeRegistry::default();
        reg.register("My.App.Widget", ElementKind::Custom("My.App.Widget".into()));
        reg.register(
            "CoreXT.System.UI.Panel",
            ElementKind::Custom("CoreXT.System.UI.Panel".into()),
        );

        assert!(reg.resolve("$My.App.Widget").is_some());
        assert!(reg.resolve(".Panel").is_some());
        assert!(reg.resolve("$No.Such.Type").is_none());
        assert!(reg.resolve("plain-class").is_none());
    }
}
