//! Data templates
//!
//! Elements carrying a `data--template="id"` attribute are captured during
//! parsing: the verbatim source span is kept for re-instantiation, and any
//! nested child templates are cut out of the parent's template HTML and
//! replaced with `<!--{{id}}-->` placeholder comments for later
//! re-substitution.

use serde::Serialize;

use corext_graph::NodeId;

/// One extracted template definition.
#[derive(Debug, Clone, Serialize)]
pub struct DataTemplate {
    /// The `data--template` attribute value.
    pub id: String,
    /// Verbatim source of the whole element, open tag through close tag.
    pub original_html: String,
    /// `original_html` with nested child-template spans replaced by
    /// placeholder comment markers.
    pub template_html: String,
    /// The live graph node the template element materialized as.
    pub template_item: NodeId,
    /// Ids of templates defined directly inside this one.
    pub child_templates: Vec<String>,
    /// Byte span of the element in the parsed source.
    #[serde(skip)]
    pub(crate) span: (usize, usize),
}

/// Placeholder comment marker substituted for a nested template.
pub fn placeholder_for(id: &str) -> String {
    format!("<!--{{{{{}}}}}-->", id)
}

/// Build the template HTML for a span by splicing out each child span and
/// substituting its placeholder. Child spans must lie inside the outer span
/// and not overlap each other.
pub(crate) fn splice_placeholders(
    source: &str,
    span: (usize, usize),
    children: &[(String, (usize, usize))],
) -> String {
    let mut ordered: Vec<&(String, (usize, usize))> = children.iter().collect();
    ordered.sort_by_key(|(_, s)| s.0);

    let mut out = String::new();
    let mut pos = span.0;
    for (id, child_span) in ordered {
        if child_span.0 < pos || child_span.1 > span.1 {
            continue;
        }
        out.push_str(&source[pos..child_span.0]);
        out.push_str(&placeholder_for(id));
        pos = child_span.1;
    }
    out.push_str(&source[pos..span.1]);
    out
}
