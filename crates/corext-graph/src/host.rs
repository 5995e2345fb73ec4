//! DOM host abstraction
//!
//! The graph never talks to a concrete DOM. Layout materializes elements
//! through this trait; `is_client` gates all materialization so the same
//! graph can run headless on a server.

use std::fmt::Write as _;

/// Opaque handle to a host element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ElementHandle(pub u32);

/// Host capable of materializing graph nodes as elements.
pub trait DomHost {
    /// Whether this host can actually render UI. When false, layout skips
    /// all element creation.
    fn is_client(&self) -> bool;

    fn create_element(&mut self, tag: &str) -> ElementHandle;
    fn create_text_node(&mut self, text: &str) -> ElementHandle;
    fn set_attribute(&mut self, el: ElementHandle, name: &str, value: &str);
    fn remove_attribute(&mut self, el: ElementHandle, name: &str);
    /// Replace the element's text content (raw; the host does not escape).
    fn set_text(&mut self, el: ElementHandle, text: &str);
    fn append_child(&mut self, parent: ElementHandle, child: ElementHandle);
    fn remove_child(&mut self, parent: ElementHandle, child: ElementHandle);
}

/// Server-side host: reports no UI capability and ignores all calls.
#[derive(Debug, Default)]
pub struct HeadlessHost {
    next: u32,
}

impl HeadlessHost {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DomHost for HeadlessHost {
    fn is_client(&self) -> bool {
        false
    }

    fn create_element(&mut self, _tag: &str) -> ElementHandle {
        self.next += 1;
        ElementHandle(self.next)
    }

    fn create_text_node(&mut self, _text: &str) -> ElementHandle {
        self.next += 1;
        ElementHandle(self.next)
    }

    fn set_attribute(&mut self, _el: ElementHandle, _name: &str, _value: &str) {}
    fn remove_attribute(&mut self, _el: ElementHandle, _name: &str) {}
    fn set_text(&mut self, _el: ElementHandle, _text: &str) {}
    fn append_child(&mut self, _parent: ElementHandle, _child: ElementHandle) {}
    fn remove_child(&mut self, _parent: ElementHandle, _child: ElementHandle) {}
}

#[derive(Debug)]
struct MemoryElement {
    tag: String,
    text: String,
    is_text: bool,
    attrs: Vec<(String, String)>,
    children: Vec<ElementHandle>,
    parent: Option<ElementHandle>,
}

/// In-memory element tree. Stands in for a browser DOM in tests and
/// server-side rendering; can serialize any subtree back to HTML.
#[derive(Debug, Default)]
pub struct MemoryDom {
    elements: Vec<MemoryElement>,
}

impl MemoryDom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    fn alloc(&mut self, el: MemoryElement) -> ElementHandle {
        self.elements.push(el);
        ElementHandle(self.elements.len() as u32 - 1)
    }

    fn element(&self, h: ElementHandle) -> Option<&MemoryElement> {
        self.elements.get(h.0 as usize)
    }

    fn element_mut(&mut self, h: ElementHandle) -> Option<&mut MemoryElement> {
        self.elements.get_mut(h.0 as usize)
    }

    pub fn tag_of(&self, h: ElementHandle) -> Option<&str> {
        self.element(h).map(|e| e.tag.as_str())
    }

    pub fn attr_of(&self, h: ElementHandle, name: &str) -> Option<&str> {
        self.element(h)?
            .attrs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn children_of(&self, h: ElementHandle) -> &[ElementHandle] {
        self.element(h).map(|e| e.children.as_slice()).unwrap_or(&[])
    }

    pub fn text_of(&self, h: ElementHandle) -> Option<&str> {
        self.element(h).map(|e| e.text.as_str())
    }

    /// Serialize a subtree back to HTML. Attributes come out in insertion
    /// order; text content is emitted verbatim.
    pub fn render_html(&self, h: ElementHandle) -> String {
        let mut out = String::new();
        self.render_into(h, &mut out);
        out
    }

    fn render_into(&self, h: ElementHandle, out: &mut String) {
        let Some(el) = self.element(h) else { return };
        if el.is_text {
            out.push_str(&el.text);
            return;
        }
        let _ = write!(out, "<{}", el.tag);
        for (name, value) in &el.attrs {
            let _ = write!(out, " {}=\"{}\"", name, value);
        }
        out.push('>');
        out.push_str(&el.text);
        for &child in &el.children {
            self.render_into(child, out);
        }
        let _ = write!(out, "</{}>", el.tag);
    }

    fn detach(&mut self, child: ElementHandle) {
        let parent = match self.element(child) {
            Some(e) => e.parent,
            None => return,
        };
        if let Some(p) = parent {
            if let Some(pe) = self.element_mut(p) {
                pe.children.retain(|c| *c != child);
            }
        }
        if let Some(ce) = self.element_mut(child) {
            ce.parent = None;
        }
    }
}

impl DomHost for MemoryDom {
    fn is_client(&self) -> bool {
        true
    }

    fn create_element(&mut self, tag: &str) -> ElementHandle {
        self.alloc(MemoryElement {
            tag: tag.to_string(),
            text: String::new(),
            is_text: false,
            attrs: Vec::new(),
            children: Vec::new(),
            parent: None,
        })
    }

    fn create_text_node(&mut self, text: &str) -> ElementHandle {
        self.alloc(MemoryElement {
            tag: String::new(),
            text: text.to_string(),
            is_text: true,
            attrs: Vec::new(),
            children: Vec::new(),
            parent: None,
        })
    }

    fn set_attribute(&mut self, el: ElementHandle, name: &str, value: &str) {
        if let Some(e) = self.element_mut(el) {
            match e.attrs.iter_mut().find(|(n, _)| n == name) {
                Some((_, v)) => *v = value.to_string(),
                None => e.attrs.push((name.to_string(), value.to_string())),
            }
        }
    }

    fn remove_attribute(&mut self, el: ElementHandle, name: &str) {
        if let Some(e) = self.element_mut(el) {
            e.attrs.retain(|(n, _)| n != name);
        }
    }

    fn set_text(&mut self, el: ElementHandle, text: &str) {
        if let Some(e) = self.element_mut(el) {
            e.text = text.to_string();
        }
    }

    fn append_child(&mut self, parent: ElementHandle, child: ElementHandle) {
        if self.element(parent).is_none() || self.element(child).is_none() {
            return;
        }
        // Moving an element re-homes it; appending twice is a no-op.
        if self.element(child).and_then(|e| e.parent) == Some(parent) {
            return;
        }
        self.detach(child);
        if let Some(pe) = self.element_mut(parent) {
            pe.children.push(child);
        }
        if let Some(ce) = self.element_mut(child) {
            ce.parent = Some(parent);
        }
    }

    fn remove_child(&mut self, parent: ElementHandle, child: ElementHandle) {
        if self.element(child).and_then(|e| e.parent) == Some(parent) {
            self.detach(child);
        }
    }
}
