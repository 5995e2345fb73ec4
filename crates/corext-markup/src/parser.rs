//! Markup to graph parser
//!
//! Recursive descent over the reader's token stream. `process_tags`
//! handles one nesting level per invocation and recurses for each child
//! subtree; the level's return value carries the data templates found
//! among its immediate children so an enclosing template can splice them
//! out. Root discovery runs through three modes: scanning for the app
//! root, root found, and actively building nodes.

use std::collections::HashMap;
use std::sync::OnceLock;

use regex::Regex;

use corext_graph::{is_void_element, ElementKind, Graph, NodeId, NodeTypeRegistry};

use crate::error::{MarkupError, MarkupResult};
use crate::reader::{HtmlReader, ReadMode};
use crate::templates::{splice_placeholders, DataTemplate};

/// Parser configuration.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// Hard-error on malformed attributes and bad nesting. Off, the parser
    /// recovers leniently instead.
    pub strict: bool,
    /// Registry for `class="$Dotted.Type"` resolution.
    pub registry: NodeTypeRegistry,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            strict: true,
            registry: NodeTypeRegistry::default(),
        }
    }
}

/// Result of a parse: the produced graph, the root nodes, and every data
/// template extracted along the way.
#[derive(Debug)]
pub struct Parsed {
    pub graph: Graph,
    pub root_elements: Vec<NodeId>,
    pub templates: HashMap<String, DataTemplate>,
}

/// Parse markup in strict mode with the default type registry.
pub fn parse(html: &str) -> MarkupResult<Parsed> {
    parse_with_options(html, ParseOptions::default())
}

pub fn parse_with_options(html: &str, options: ParseOptions) -> MarkupResult<Parsed> {
    tracing::debug!(strict = options.strict, bytes = html.len(), "parsing markup");
    let mut parser = Parser {
        reader: HtmlReader::with_strict_mode(html, options.strict),
        html,
        graph: Graph::new(),
        templates: HashMap::new(),
        root_elements: Vec::new(),
        mode: 0,
        strict: options.strict,
        registry: options.registry,
        containers: Vec::new(),
        open: Vec::new(),
        deferred_close: None,
        deferred_close_end: 0,
        last_span_end: 0,
        text_buf: String::new(),
    };
    parser.run()?;
    tracing::debug!(
        nodes = parser.graph.len(),
        roots = parser.root_elements.len(),
        templates = parser.templates.len(),
        "parse complete"
    );
    Ok(Parsed {
        graph: parser.graph,
        root_elements: parser.root_elements,
        templates: parser.templates,
    })
}

fn class_ref() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[$.][A-Za-z_][A-Za-z0-9_]*(\.[A-Za-z_][A-Za-z0-9_]*)*$")
            .expect("class reference pattern is valid")
    })
}

fn attr_value<'v>(attrs: &'v [(String, String)], name: &str) -> Option<&'v str> {
    attrs.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
}

fn has_attr(attrs: &[(String, String)], name: &str) -> bool {
    attrs.iter().any(|(n, _)| n == name)
}

struct Parser<'a> {
    reader: HtmlReader<'a>,
    html: &'a str,
    graph: Graph,
    templates: HashMap<String, DataTemplate>,
    root_elements: Vec<NodeId>,
    /// 0 = scanning for the app root, 1 = root found, 2 = building nodes.
    mode: u8,
    strict: bool,
    registry: NodeTypeRegistry,
    /// Transparent structural containers (`html`, `head`, `body`).
    containers: Vec<String>,
    /// Tags of the real elements currently open, outermost first.
    open: Vec<String>,
    /// A closing tag propagating upward through implicit closes.
    deferred_close: Option<String>,
    deferred_close_end: usize,
    /// End offset of the last finalized element span.
    last_span_end: usize,
    text_buf: String,
}

impl<'a> Parser<'a> {
    fn run(&mut self) -> MarkupResult<()> {
        loop {
            self.process_tags(None, None)?;
            if let Some(name) = self.deferred_close.take() {
                // Only structural containers unwind at the top; anything
                // else is a stray close and is dropped.
                if self.containers.iter().any(|c| *c == name) {
                    while let Some(c) = self.containers.pop() {
                        if c == name {
                            break;
                        }
                    }
                }
                continue;
            }
            if self.reader.mode() == ReadMode::End {
                return Ok(());
            }
        }
    }

    /// Process one nesting level. Returns the ids of data templates found
    /// among this level's immediate children (for splicing by an enclosing
    /// template element).
    fn process_tags(
        &mut self,
        parent: Option<NodeId>,
        cur_tag: Option<&str>,
    ) -> MarkupResult<Vec<String>> {
        let mut found = Vec::new();
        loop {
            if self.deferred_close.is_some() {
                // An implicit close is unwinding through this level.
                if let Some(ct) = cur_tag {
                    if self.deferred_close.as_deref() == Some(ct) {
                        self.deferred_close = None;
                        self.last_span_end = self.deferred_close_end;
                    }
                    self.flush_text(parent);
                }
                return Ok(found);
            }

            self.reader.read_next()?;
            match self.reader.mode() {
                ReadMode::End => {
                    self.append_text(self.reader.text());
                    self.flush_text(parent);
                    self.last_span_end = self.html.len();
                    return Ok(found);
                }
                ReadMode::TemplateToken => {
                    // Recognized but not processed: flows into running text.
                    self.append_text(self.reader.text());
                    self.append_text(self.reader.delimiter());
                }
                ReadMode::Tag => {
                    self.append_text(self.reader.text());
                    self.flush_text(parent);
                    if self.reader.is_opaque_block() {
                        // Comments, scripts, styles, declarations: verbatim,
                        // never traversed for children.
                        continue;
                    }
                    if self.reader.tag_bracket() == "</" {
                        if self.handle_closing_tag(cur_tag)? {
                            return Ok(found);
                        }
                        continue;
                    }
                    self.handle_open_tag(parent, &mut found)?;
                }
                _ => {}
            }
        }
    }

    /// Returns true when this level is done (its own closing tag arrived,
    /// or an implicit close is propagating past it).
    fn handle_closing_tag(&mut self, cur_tag: Option<&str>) -> MarkupResult<bool> {
        let name = self.reader.tag_name().to_ascii_lowercase();
        let close_start = self.reader.tag_start();
        let line = self.reader.current_line_number();
        self.reader.read_next()?; // consume through EndOfTag
        let close_end = self.reader.token_end();

        if let Some(ct) = cur_tag {
            if name == ct {
                self.last_span_end = close_end;
                return Ok(true);
            }
        }

        let known = self.open.iter().any(|t| *t == name)
            || self.containers.iter().any(|t| *t == name);
        if known {
            // Implicitly close the current element; the enclosing level
            // re-examines this tag.
            self.deferred_close = Some(name);
            self.deferred_close_end = close_end;
            self.last_span_end = close_start;
            return Ok(true);
        }

        if let Some(ct) = cur_tag {
            if self.strict && self.mode == 2 {
                return Err(MarkupError::MismatchedClosingTag {
                    line,
                    expected: ct.to_string(),
                    found: name,
                });
            }
        }
        // Stray closing tag: dropped.
        Ok(false)
    }

    fn handle_open_tag(
        &mut self,
        parent: Option<NodeId>,
        found: &mut Vec<String>,
    ) -> MarkupResult<()> {
        let tag = self.reader.tag_name().to_ascii_lowercase();
        let tag_start = self.reader.tag_start();
        let tag_line = self.reader.current_line_number();

        let mut attrs: Vec<(String, String)> = Vec::new();
        loop {
            self.reader.read_next()?;
            match self.reader.mode() {
                ReadMode::Attribute => attrs.push((
                    self.reader.attribute_name().to_ascii_lowercase(),
                    self.reader.attribute_value().to_string(),
                )),
                ReadMode::EndOfTag => break,
                ReadMode::End => return Ok(()), // unterminated tag, lenient
                _ => break,
            }
        }
        let self_closed = self.reader.delimiter() == "/>";
        let tag_end = self.reader.token_end();

        // Root discovery.
        if self.mode < 2 {
            match tag.as_str() {
                "html" => {
                    if has_attr(&attrs, "data-approot") || has_attr(&attrs, "data--approot") {
                        self.mode = 1;
                    }
                    self.containers.push(tag);
                    return Ok(());
                }
                "head" => {
                    self.containers.push(tag);
                    return Ok(());
                }
                "body" => {
                    self.mode = 1;
                    self.containers.push(tag);
                    return Ok(());
                }
                _ => {
                    if self.mode == 0 && !self.containers.is_empty() {
                        // Inside <html>/<head> before any root: scanned,
                        // never materialized.
                        return Ok(());
                    }
                    self.mode = 2;
                }
            }
        }

        // Resolve the node type: explicit dotted class reference first,
        // then the tag table.
        let kind = match attr_value(&attrs, "class") {
            Some(class_val) if class_ref().is_match(class_val) => {
                match self.registry.resolve(class_val) {
                    Some(k) => k,
                    None => {
                        return Err(MarkupError::TypeResolution {
                            line: tag_line,
                            tag: tag.clone(),
                            type_name: class_val.to_string(),
                        })
                    }
                }
            }
            _ => ElementKind::for_tag(&tag),
        };

        let node = self.graph.create_node(kind.clone(), &tag);
        for (name, value) in &attrs {
            self.graph.set_value(node, name, value.clone());
        }
        match &kind {
            ElementKind::Header(level) => {
                self.graph.set_value(node, "headerLevel", *level as i64);
            }
            ElementKind::Phrase(flags) => {
                self.graph.set_value(node, "phraseType", flags.bits() as i64);
            }
            _ => {}
        }
        if let Some(id) = attr_value(&attrs, "id") {
            if let Some(n) = self.graph.get_mut(node) {
                n.name = id.to_string();
            }
        }
        match parent {
            Some(p) => {
                self.graph.add_child(p, node);
            }
            None => self.root_elements.push(node),
        }

        let template_id = attr_value(&attrs, "data--template").map(|s| s.to_string());

        if self_closed || is_void_element(&tag) {
            if let Some(tid) = template_id {
                self.record_template(tid.clone(), node, (tag_start, tag_end), Vec::new());
                found.push(tid);
            }
            return Ok(());
        }

        self.open.push(tag.clone());
        self.last_span_end = tag_end;
        let child_templates = self.process_tags(Some(node), Some(&tag))?;
        self.open.pop();
        let span_end = self.last_span_end;

        if let Some(tid) = template_id {
            self.record_template(tid.clone(), node, (tag_start, span_end), child_templates);
            found.push(tid);
        } else {
            // Templates inside ordinary elements propagate to the nearest
            // template ancestor.
            found.extend(child_templates);
        }
        Ok(())
    }

    fn record_template(
        &mut self,
        id: String,
        node: NodeId,
        span: (usize, usize),
        children: Vec<String>,
    ) {
        let child_spans: Vec<(String, (usize, usize))> = children
            .iter()
            .filter_map(|cid| self.templates.get(cid).map(|t| (cid.clone(), t.span)))
            .collect();
        let original_html = self.html[span.0..span.1].to_string();
        let template_html = splice_placeholders(self.html, span, &child_spans);
        tracing::debug!(template = %id, "captured data template");
        self.templates.insert(
            id.clone(),
            DataTemplate {
                id,
                original_html,
                template_html,
                template_item: node,
                child_templates: children,
                span,
            },
        );
    }

    fn append_text(&mut self, s: &str) {
        self.text_buf.push_str(s);
    }

    /// Turn accumulated running text into a text node under the current
    /// parent. Whitespace-only runs are dropped; text outside the build
    /// phase is dropped too.
    fn flush_text(&mut self, parent: Option<NodeId>) {
        if self.text_buf.trim().is_empty() || self.mode != 2 {
            self.text_buf.clear();
            return;
        }
        let text = std::mem::take(&mut self.text_buf);
        let node = if text.contains('&') {
            let n = self.graph.create_node(ElementKind::HtmlText, "span");
            self.graph.set_value(n, "html", text);
            n
        } else {
            let n = self.graph.create_node(ElementKind::PlainText, "");
            self.graph.set_value(n, "text", text);
            n
        };
        match parent {
            Some(p) => {
                self.graph.add_child(p, node);
            }
            None => self.root_elements.push(node),
        }
    }
}
