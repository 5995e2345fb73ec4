//! Layout and redraw
//!
//! `update_layout` mirrors the graph to host elements: depth-first from the
//! given node down, materializing an element where one is missing or its
//! tag no longer matches, reparenting where the parent's element changed.
//! The first-ever pass over a node snapshots its properties, fires the bulk
//! "changed" notifications and redraws if any property is visual.

use std::collections::HashMap;

use crate::elements::ElementKind;
use crate::host::{DomHost, ElementHandle};
use crate::property::PropertyValue;
use crate::{Graph, NodeId};

impl Graph {
    /// Run a layout pass from `id`. `recursive` descends into children
    /// (children laid out after their parent's element exists, so they can
    /// attach under it).
    pub fn update_layout(&mut self, host: &mut dyn DomHost, id: NodeId, recursive: bool) {
        self.ui_enabled = host.is_client();
        tracing::trace!(node = id.0, recursive, "layout pass");
        self.layout_node(host, id, recursive);
    }

    fn layout_node(&mut self, host: &mut dyn DomHost, id: NodeId, recursive: bool) {
        if self.get(id).is_none() {
            return;
        }

        if host.is_client() {
            self.materialize(host, id);
        }

        if recursive {
            let children = self.nodes[id.index()].children.clone();
            for child in children {
                self.layout_node(host, child, true);
            }
        }

        // First-ever layout: snapshot, bulk-notify every property, and
        // redraw once if anything visual surfaced. Children were already
        // redrawn by their own pass, hence non-recursive.
        if self.nodes[id.index()].initial_properties.is_none() {
            let snapshot: HashMap<String, PropertyValue> = self.property_snapshot(id);
            self.nodes[id.index()].initial_properties = Some(snapshot.clone());
            let mut do_redraw = false;
            for (name, value) in &snapshot {
                do_redraw |= self.notify_changed(id, name, value);
            }
            if do_redraw {
                self.on_redraw(host, id, false);
            }
        }
    }

    /// Re-apply a node's visual state to its element. Does nothing while
    /// the node has no materialized element.
    pub fn on_redraw(&mut self, host: &mut dyn DomHost, id: NodeId, recursive: bool) {
        let (element, kind, children) = match self.get(id) {
            Some(n) => (n.element, n.kind.clone(), n.children.clone()),
            None => return,
        };
        let Some(el) = element else {
            if recursive {
                for child in children {
                    self.on_redraw(host, child, true);
                }
            }
            return;
        };
        match &kind {
            ElementKind::PlainText => {
                let text = self.text_content(id, "text");
                host.set_text(el, &text);
            }
            ElementKind::HtmlText => {
                let html = self.text_content(id, "html");
                host.set_text(el, &html);
            }
            _ => {
                for (name, value) in self.property_snapshot(id) {
                    host.set_attribute(el, &name, &value.to_string());
                }
            }
        }
        if recursive {
            for child in children {
                self.on_redraw(host, child, true);
            }
        }
    }

    /// Create or rebuild the node's element as needed, then make sure it
    /// hangs under the parent's element.
    fn materialize(&mut self, host: &mut dyn DomHost, id: NodeId) {
        let idx = id.index();
        let kind = self.nodes[idx].kind.clone();
        let tag = self.effective_tag(id, &kind);

        let rebuild = match self.nodes[idx].element {
            None => true,
            Some(_) => self.nodes[idx].element_tag != tag,
        };

        if rebuild {
            if let (Some(old), Some(under)) =
                (self.nodes[idx].element, self.nodes[idx].attached_under)
            {
                host.remove_child(under, old);
            }
            let el = self.create_ui_element(host, id, &kind, &tag);
            let node = &mut self.nodes[idx];
            node.element = Some(el);
            node.element_tag = tag;
            node.attached_under = None;
        }

        // Reparent when the parent's element changed since last pass.
        let parent = self.nodes[idx].parent;
        let parent_el = self.get(parent).and_then(|p| p.element);
        let el = self.nodes[idx].element;
        if let (Some(el), Some(parent_el)) = (el, parent_el) {
            if self.nodes[idx].attached_under != Some(parent_el) {
                host.append_child(parent_el, el);
                self.nodes[idx].attached_under = Some(parent_el);
            }
        }
    }

    fn create_ui_element(
        &mut self,
        host: &mut dyn DomHost,
        id: NodeId,
        kind: &ElementKind,
        tag: &str,
    ) -> ElementHandle {
        match kind {
            ElementKind::PlainText => {
                let text = self.text_content(id, "text");
                host.create_text_node(&text)
            }
            ElementKind::HtmlText => {
                let html = self.text_content(id, "html");
                let el = host.create_element(tag);
                host.set_text(el, &html);
                el
            }
            _ => {
                let el = host.create_element(tag);
                for (name, value) in self.property_snapshot(id) {
                    host.set_attribute(el, &name, &value.to_string());
                }
                el
            }
        }
    }

    /// Tag the element should materialize with.
    fn effective_tag(&self, id: NodeId, kind: &ElementKind) -> String {
        let declared = &self.nodes[id.index()].html_tag;
        if !declared.is_empty() {
            return declared.clone();
        }
        match kind {
            ElementKind::Anchor => "a".to_string(),
            ElementKind::Header(level) => format!("h{}", (*level).clamp(1, 6)),
            ElementKind::Phrase(_) => "em".to_string(),
            ElementKind::HtmlText => "span".to_string(),
            _ => "div".to_string(),
        }
    }

    fn text_content(&self, id: NodeId, prop: &str) -> String {
        self.get_value(id, prop)
            .map(|v| v.to_string())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HeadlessHost, MemoryDom};

    #[test]
    fn test_headless_layout_skips_materialization() {
        let mut graph = Graph::new();
        let root = graph.create_node(ElementKind::Html, "div");
        let mut host = HeadlessHost::new();
        graph.update_layout(&mut host, root, true);
        assert!(graph.get(root).and_then(|n| n.element()).is_none());
        assert!(graph.get(root).map(|n| n.is_initialized()).unwrap_or(false));
        assert!(!graph.ui_enabled());
    }

    #[test]
    fn test_layout_materializes_tree() {
        let mut graph = Graph::new();
        let root = graph.create_node(ElementKind::Html, "div");
        graph.set_value(root, "id", "main");
        let child = graph.create_node(ElementKind::PlainText, "");
        graph.set_value(child, "text", "hello");
        graph.add_child(root, child);

        let mut dom = MemoryDom::new();
        graph.update_layout(&mut dom, root, true);

        let el = graph.get(root).and_then(|n| n.element());
        assert!(el.is_some());
        if let Some(el) = el {
            assert_eq!(dom.attr_of(el, "id"), Some("main"));
            assert_eq!(dom.render_html(el), r#"<div id="main">hello</div>"#);
        }
        assert!(graph.ui_enabled());
    }

    #[test]
    fn test_tag_change_rebuilds_element() {
        let mut graph = Graph::new();
        let root = graph.create_node(ElementKind::Html, "div");
        let mut dom = MemoryDom::new();
        graph.update_layout(&mut dom, root, true);
        let first = graph.get(root).and_then(|n| n.element());

        if let Some(n) = graph.get_mut(root) {
            n.html_tag = "section".to_string();
        }
        graph.update_layout(&mut dom, root, true);
        let second = graph.get(root).and_then(|n| n.element());

        assert_ne!(first, second);
        assert_eq!(second.and_then(|el| dom.tag_of(el)), Some("section"));
    }

    #[test]
    fn test_visual_change_signals_redraw() {
        let mut graph = Graph::new();
        let root = graph.create_node(ElementKind::Anchor, "a");
        let mut dom = MemoryDom::new();
        graph.update_layout(&mut dom, root, true);

        // "href" is visual on Anchor; the graph is UI-bound now.
        assert!(graph.set_value(root, "href", "https://example.com"));
        // "name" is not visual.
        assert!(!graph.set_value(root, "name", "x"));
    }
}
