//! HTML pull tokenizer
//!
//! One master regular expression splits the source into paired
//! (text run, delimiter) parts; the reader is a cursor over those pairs.
//! `read_next` advances one lexical token at a time through a small state
//! machine: content scanning yields tags and template tokens, tag interior
//! scanning yields attributes and the end-of-tag marker. Comment, script,
//! style and markup-declaration blocks are matched whole by the master
//! expression and surface as single opaque tag tokens.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{MarkupError, MarkupResult};

/// Tokenizer state, advanced by [`HtmlReader::read_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    /// Nothing read yet.
    NotStarted,
    /// A tag opener (`<name`, `</name`, or a whole opaque block).
    Tag,
    /// An attribute (name, possibly a value) inside the current tag.
    Attribute,
    /// The current tag's `>` or `/>`.
    EndOfTag,
    /// A `{{...}}` template token in running content.
    TemplateToken,
    /// Input exhausted.
    End,
}

/// One (text run, delimiter) pair. Byte offsets into the source:
/// text is `text_start..text_end`, the delimiter is `text_end..delim_end`.
#[derive(Debug, Clone, Copy)]
struct Part {
    text_start: usize,
    text_end: usize,
    delim_end: usize,
}

const MASTER_PATTERN: &str = r#"(?is)<!--.*?-->|<script\b.*?</script[^>]*>|<style\b.*?</style[^>]*>|<![^>]*>|</?[a-z][a-z0-9:._-]*|/>|>|=|"[^"]*"|'[^']*'|\{\{[^{}]*\}\}|&[a-z#][a-z0-9]*;|\s+"#;

fn master() -> &'static Regex {
    static MASTER: OnceLock<Regex> = OnceLock::new();
    MASTER.get_or_init(|| {
        Regex::new(MASTER_PATTERN).expect("master tokenizer pattern is valid")
    })
}

/// Cursor-based pull tokenizer over an HTML source string.
pub struct HtmlReader<'a> {
    html: &'a str,
    parts: Vec<Part>,
    part_index: usize,
    /// The last delimiter was pushed back; the next advance re-yields it
    /// with an empty text run.
    requeued: bool,
    strict: bool,
    mode: ReadMode,
    // Current token span (preceding text run included).
    text_start: usize,
    text_end: usize,
    // Current part.
    part_text: &'a str,
    delimiter: &'a str,
    delim_start: usize,
    // Token payload.
    text: &'a str,
    tag_bracket: &'a str,
    tag_name: &'a str,
    attr_name: &'a str,
    attr_value: &'a str,
    tag_start: usize,
}

impl<'a> HtmlReader<'a> {
    /// Strict-mode reader (malformed attributes are hard errors).
    pub fn new(html: &'a str) -> Self {
        Self::with_strict_mode(html, true)
    }

    pub fn with_strict_mode(html: &'a str, strict: bool) -> Self {
        let mut parts = Vec::new();
        let mut prev = 0;
        for m in master().find_iter(html) {
            parts.push(Part {
                text_start: prev,
                text_end: m.start(),
                delim_end: m.end(),
            });
            prev = m.end();
        }
        if prev < html.len() {
            // Trailing text with no delimiter after it.
            parts.push(Part {
                text_start: prev,
                text_end: html.len(),
                delim_end: html.len(),
            });
        }
        Self {
            html,
            parts,
            part_index: 0,
            requeued: false,
            strict,
            mode: ReadMode::NotStarted,
            text_start: 0,
            text_end: 0,
            part_text: "",
            delimiter: "",
            delim_start: 0,
            text: "",
            tag_bracket: "",
            tag_name: "",
            attr_name: "",
            attr_value: "",
            tag_start: 0,
        }
    }

    /// Advance to the next lexical token. A no-op once in `End` mode.
    pub fn read_next(&mut self) -> MarkupResult<()> {
        if self.mode == ReadMode::End {
            return Ok(());
        }
        self.text_start = self.text_end;
        match self.mode {
            ReadMode::Tag | ReadMode::Attribute => {
                if self.current_tag_is_block() {
                    self.scan_content()
                } else if self.tag_bracket == "</" {
                    self.read_closing_interior()
                } else {
                    self.read_tag_interior()
                }
            }
            _ => self.scan_content(),
        }
    }

    // --- accessors ---

    pub fn mode(&self) -> ReadMode {
        self.mode
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Full source string.
    pub fn html(&self) -> &'a str {
        self.html
    }

    /// `<` or `</` for the current tag token.
    pub fn tag_bracket(&self) -> &'a str {
        self.tag_bracket
    }

    /// Captured tag name. For opaque blocks this is the whole block after
    /// the `<`, ending with `>` - use the block predicates to classify.
    pub fn tag_name(&self) -> &'a str {
        self.tag_name
    }

    pub fn attribute_name(&self) -> &'a str {
        self.attr_name
    }

    pub fn attribute_value(&self) -> &'a str {
        self.attr_value
    }

    /// The text run preceding the current token.
    pub fn text(&self) -> &'a str {
        self.text
    }

    /// The current delimiter (the `{{...}}` token itself in TemplateToken
    /// mode, `>`/`/>` in EndOfTag mode, and so on).
    pub fn delimiter(&self) -> &'a str {
        self.delimiter
    }

    /// Verbatim source consumed by the current token (preceding text run
    /// plus delimiters). Concatenated across all tokens of a parse this
    /// reconstructs the source exactly.
    pub fn current_running_text(&self) -> &'a str {
        &self.html[self.text_start..self.text_end]
    }

    /// Byte offset of the current token's start.
    pub fn token_start(&self) -> usize {
        self.text_start
    }

    /// Byte offset one past the current token's end.
    pub fn token_end(&self) -> usize {
        self.text_end
    }

    /// Byte offset of the `<` that opened the current tag token.
    pub fn tag_start(&self) -> usize {
        self.tag_start
    }

    /// Whether the part cursor has consumed every delimiter.
    pub fn is_exhausted(&self) -> bool {
        self.part_index >= self.parts.len()
    }

    /// 1-based line number of the current position. Recomputed by a
    /// backward scan - O(n), error paths only.
    pub fn current_line_number(&self) -> usize {
        let upto = self.delim_start.min(self.html.len());
        self.html[..upto].matches('\n').count() + 1
    }

    // --- token classification ---

    fn current_tag_is_block(&self) -> bool {
        self.mode == ReadMode::Tag && self.tag_name.ends_with('>')
    }

    /// `<!-- ... -->`
    pub fn is_comment_block(&self) -> bool {
        self.current_tag_is_block() && self.tag_name.starts_with("!--")
    }

    /// `<!DOCTYPE ...>` and other `<!...>` declarations.
    pub fn is_markup_declaration(&self) -> bool {
        self.current_tag_is_block()
            && self.tag_name.starts_with('!')
            && !self.tag_name.starts_with("!--")
    }

    /// A whole `<script>...</script>` block.
    pub fn is_script_block(&self) -> bool {
        self.current_tag_is_block() && starts_ignore_case(self.tag_name, "script")
    }

    /// A whole `<style>...</style>` block.
    pub fn is_style_block(&self) -> bool {
        self.current_tag_is_block() && starts_ignore_case(self.tag_name, "style")
    }

    /// Any opaque block the parser should skip without descending into.
    pub fn is_opaque_block(&self) -> bool {
        self.is_comment_block()
            || self.is_markup_declaration()
            || self.is_script_block()
            || self.is_style_block()
    }

    /// Whether the current token closes an element: a `</name` bracket or
    /// a self-closing `/>` delimiter.
    pub fn is_closing_tag(&self) -> bool {
        self.tag_bracket == "</" || self.delimiter == "/>"
    }

    // --- cursor ---

    fn advance(&mut self) -> bool {
        if self.part_index >= self.parts.len() {
            return false;
        }
        let p = self.parts[self.part_index];
        let text_start = if self.requeued { p.text_end } else { p.text_start };
        self.requeued = false;
        self.part_text = &self.html[text_start..p.text_end];
        self.delimiter = &self.html[p.text_end..p.delim_end];
        self.delim_start = p.text_end;
        self.text_end = p.delim_end;
        self.part_index += 1;
        true
    }

    /// Whether the next part is a bare `=` with no text before it. Lets a
    /// name followed by whitespace stay pending instead of becoming a bare
    /// attribute (`name = "v"` is valid spacing).
    fn next_is_assignment(&self) -> bool {
        match self.parts.get(self.part_index) {
            Some(p) => {
                self.html[p.text_start..p.text_end].trim().is_empty()
                    && &self.html[p.text_end..p.delim_end] == "="
            }
            None => false,
        }
    }

    /// Push the current delimiter back so the next advance re-yields it.
    /// The re-queued delimiter is excluded from the current token's span.
    fn requeue(&mut self) {
        if self.part_index == 0 {
            return;
        }
        self.part_index -= 1;
        self.requeued = true;
        self.text_end = self.parts[self.part_index].text_end;
    }

    // --- states ---

    fn scan_content(&mut self) -> MarkupResult<()> {
        self.tag_bracket = "";
        self.tag_name = "";
        self.attr_name = "";
        self.attr_value = "";
        loop {
            if !self.advance() {
                self.text = &self.html[self.text_start..];
                self.text_end = self.html.len();
                self.mode = ReadMode::End;
                return Ok(());
            }
            let d = self.delimiter;
            if d.starts_with('<') {
                self.text = &self.html[self.text_start..self.delim_start];
                self.tag_start = self.delim_start;
                if d.len() > 1 && d.ends_with('>') {
                    // Whole comment/script/style/declaration block.
                    self.tag_bracket = "<";
                    self.tag_name = &d[1..];
                } else if let Some(rest) = d.strip_prefix("</") {
                    self.tag_bracket = "</";
                    self.tag_name = rest;
                } else {
                    self.tag_bracket = "<";
                    self.tag_name = &d[1..];
                }
                self.mode = ReadMode::Tag;
                return Ok(());
            }
            if d.starts_with("{{") {
                self.text = &self.html[self.text_start..self.delim_start];
                self.mode = ReadMode::TemplateToken;
                return Ok(());
            }
            // Entities, whitespace runs, stray '>'/'='/quotes: running text.
        }
    }

    fn read_closing_interior(&mut self) -> MarkupResult<()> {
        loop {
            if !self.advance() {
                self.mode = ReadMode::End;
                return Ok(());
            }
            let d = self.delimiter;
            if d == ">" || d == "/>" {
                self.mode = ReadMode::EndOfTag;
                return Ok(());
            }
            if is_whitespace(d) {
                continue;
            }
            if self.strict {
                return Err(self.syntax_error(format!(
                    "unexpected '{}' in closing tag '</{}'",
                    d, self.tag_name
                )));
            }
            // Lenient: the closing tag ends here; defer the delimiter.
            self.requeue();
            self.mode = ReadMode::EndOfTag;
            return Ok(());
        }
    }

    fn read_tag_interior(&mut self) -> MarkupResult<()> {
        self.attr_name = "";
        self.attr_value = "";
        // Attribute name seen but not yet classified (separated from its
        // `=` by whitespace).
        let mut pending = "";
        loop {
            if !self.advance() {
                if self.strict {
                    return Err(self.syntax_error(format!(
                        "tag '<{}' was never closed",
                        self.tag_name
                    )));
                }
                self.mode = ReadMode::End;
                return Ok(());
            }
            let d = self.delimiter;
            let t = self.part_text;
            if d == ">" || d == "/>" {
                let name = t.trim();
                if !name.is_empty() {
                    // Bare attribute right before the closer.
                    self.attr_name = name;
                    self.mode = ReadMode::Attribute;
                    self.requeue();
                    return Ok(());
                }
                self.mode = ReadMode::EndOfTag;
                return Ok(());
            }
            if d == "=" {
                let mut name = t.trim();
                if name.is_empty() {
                    name = pending;
                }
                if name.is_empty() {
                    if self.strict {
                        return Err(
                            self.syntax_error("attribute name expected before '='".to_string())
                        );
                    }
                    continue;
                }
                self.attr_name = name;
                return self.read_attribute_value();
            }
            if is_whitespace(d) {
                let name = t.trim();
                if !name.is_empty() {
                    if self.next_is_assignment() {
                        pending = name;
                        continue;
                    }
                    // Bare (valueless) attribute.
                    self.attr_name = name;
                    self.mode = ReadMode::Attribute;
                    return Ok(());
                }
                continue;
            }
            if d.starts_with('"') || d.starts_with('\'') {
                if self.strict {
                    return Err(self.syntax_error(format!(
                        "unexpected quoted value in tag '<{}'",
                        self.tag_name
                    )));
                }
                continue;
            }
            if d.starts_with('<') {
                if self.strict {
                    return Err(self.syntax_error(format!(
                        "tag '<{}' is missing its closing bracket",
                        self.tag_name
                    )));
                }
                self.requeue();
                self.mode = ReadMode::EndOfTag;
                return Ok(());
            }
            // Entities and template tokens inside a tag fold into the
            // surrounding text.
        }
    }

    fn read_attribute_value(&mut self) -> MarkupResult<()> {
        loop {
            if !self.advance() {
                if self.strict {
                    return Err(self.syntax_error(format!(
                        "attribute '{}' has no value",
                        self.attr_name
                    )));
                }
                self.mode = ReadMode::End;
                return Ok(());
            }
            // Whitespace between '=' and the value.
            if is_whitespace(self.delimiter) && self.part_text.trim().is_empty() {
                continue;
            }
            break;
        }
        let d = self.delimiter;
        let t = self.part_text;
        if (d.starts_with('"') || d.starts_with('\'')) && t.trim().is_empty() {
            // Quoted value: the quotes stay in the delimiter; strip them.
            self.attr_value = &d[1..d.len() - 1];
            self.mode = ReadMode::Attribute;
            return Ok(());
        }
        // Unquoted value: the next delimiter must end it.
        let value = t.trim();
        if d == ">" || d == "/>" {
            self.attr_value = value;
            self.mode = ReadMode::Attribute;
            self.requeue();
            return Ok(());
        }
        if is_whitespace(d) {
            self.attr_value = value;
            self.mode = ReadMode::Attribute;
            return Ok(());
        }
        if self.strict {
            return Err(self.syntax_error(format!(
                "invalid unquoted value for attribute '{}'",
                self.attr_name
            )));
        }
        // Tolerant: keep what was read, defer the delimiter.
        self.attr_value = value;
        self.mode = ReadMode::Attribute;
        self.requeue();
        Ok(())
    }

    fn syntax_error(&self, message: String) -> MarkupError {
        let context = if self.delimiter.is_empty() {
            self.part_text
        } else {
            self.delimiter
        };
        MarkupError::Syntax {
            line: self.current_line_number(),
            message,
            context: context.to_string(),
        }
    }
}

fn is_whitespace(s: &str) -> bool {
    !s.is_empty() && s.chars().all(char::is_whitespace)
}

fn starts_ignore_case(s: &str, prefix: &str) -> bool {
    s.len() >= prefix.len() && s[..prefix.len()].eq_ignore_ascii_case(prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect_modes(html: &str) -> Vec<ReadMode> {
        let mut reader = HtmlReader::new(html);
        let mut modes = Vec::new();
        loop {
            reader.read_next().expect("well-formed input");
            modes.push(reader.mode());
            if reader.mode() == ReadMode::End {
                return modes;
            }
        }
    }

    #[test]
    fn test_simple_tag_stream() {
        let mut reader = HtmlReader::new(r#"<div id="x">hi</div>"#);

        reader.read_next().expect("tag");
        assert_eq!(reader.mode(), ReadMode::Tag);
        assert_eq!(reader.tag_name(), "div");
        assert_eq!(reader.tag_bracket(), "<");

        reader.read_next().expect("attribute");
        assert_eq!(reader.mode(), ReadMode::Attribute);
        assert_eq!(reader.attribute_name(), "id");
        assert_eq!(reader.attribute_value(), "x");

        reader.read_next().expect("end of tag");
        assert_eq!(reader.mode(), ReadMode::EndOfTag);

        reader.read_next().expect("closing tag");
        assert_eq!(reader.mode(), ReadMode::Tag);
        assert_eq!(reader.tag_bracket(), "</");
        assert_eq!(reader.tag_name(), "div");
        assert_eq!(reader.text(), "hi");
        assert!(reader.is_closing_tag());

        reader.read_next().expect("closing end");
        assert_eq!(reader.mode(), ReadMode::EndOfTag);

        reader.read_next().expect("end");
        assert_eq!(reader.mode(), ReadMode::End);
        assert!(reader.is_exhausted());
    }

    #[test]
    fn test_tag_end_pairs_balance() {
        let html = "<ul><li>a</li><li>b</li></ul>";
        let modes = collect_modes(html);
        let tags = modes.iter().filter(|m| **m == ReadMode::Tag).count();
        let ends = modes.iter().filter(|m| **m == ReadMode::EndOfTag).count();
        // 3 open + 3 close tag tokens, each with its own EndOfTag.
        assert_eq!(tags, 6);
        assert_eq!(ends, 6);
        assert_eq!(modes.last(), Some(&ReadMode::End));
    }

    #[test]
    fn test_running_text_round_trip() {
        let html = "  <div class='a'>one &amp; two {{t}} </div> tail";
        let mut reader = HtmlReader::new(html);
        let mut rebuilt = String::new();
        loop {
            reader.read_next().expect("well-formed input");
            rebuilt.push_str(reader.current_running_text());
            if reader.mode() == ReadMode::End {
                break;
            }
        }
        assert_eq!(rebuilt, html);
    }

    #[test]
    fn test_bare_and_unquoted_attributes() {
        let mut reader = HtmlReader::new("<input type=text required>");
        reader.read_next().expect("tag");
        reader.read_next().expect("type attribute");
        assert_eq!(reader.attribute_name(), "type");
        assert_eq!(reader.attribute_value(), "text");
        reader.read_next().expect("bare attribute");
        assert_eq!(reader.attribute_name(), "required");
        assert_eq!(reader.attribute_value(), "");
        reader.read_next().expect("end of tag");
        assert_eq!(reader.mode(), ReadMode::EndOfTag);
    }

    #[test]
    fn test_whitespace_around_attribute_equals() {
        let mut reader = HtmlReader::new(r#"<a href = "x">"#);
        reader.read_next().expect("tag");
        reader.read_next().expect("attribute");
        assert_eq!(reader.mode(), ReadMode::Attribute);
        assert_eq!(reader.attribute_name(), "href");
        assert_eq!(reader.attribute_value(), "x");
        reader.read_next().expect("end of tag");
        assert_eq!(reader.mode(), ReadMode::EndOfTag);
    }

    #[test]
    fn test_whitespace_after_attribute_equals() {
        let mut reader = HtmlReader::new(r#"<input value= "v" required>"#);
        reader.read_next().expect("tag");
        reader.read_next().expect("value attribute");
        assert_eq!(reader.attribute_name(), "value");
        assert_eq!(reader.attribute_value(), "v");
        reader.read_next().expect("bare attribute");
        assert_eq!(reader.attribute_name(), "required");
        assert_eq!(reader.attribute_value(), "");
        reader.read_next().expect("end of tag");
        assert_eq!(reader.mode(), ReadMode::EndOfTag);
    }

    #[test]
    fn test_malformed_unquoted_value_strict() {
        let mut reader = HtmlReader::new(r#"<a href=foo"bar">"#);
        reader.read_next().expect("tag");
        let err = reader.read_next().expect_err("strict mode rejects this");
        match err {
            MarkupError::Syntax { line, .. } => assert_eq!(line, 1),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_malformed_unquoted_value_lenient() {
        let mut reader = HtmlReader::with_strict_mode(r#"<a href=foo"bar">"#, false);
        reader.read_next().expect("tag");
        reader.read_next().expect("tolerated attribute");
        assert_eq!(reader.attribute_name(), "href");
        assert_eq!(reader.attribute_value(), "foo");
        // The re-queued quoted delimiter is skipped, then the tag closes.
        reader.read_next().expect("end of tag");
        assert_eq!(reader.mode(), ReadMode::EndOfTag);
    }

    #[test]
    fn test_comment_and_script_blocks_are_opaque() {
        let html = "<!-- a <div> inside --><script>if (a < b) {}</script><p>x</p>";
        let mut reader = HtmlReader::new(html);

        reader.read_next().expect("comment");
        assert!(reader.is_comment_block());
        assert!(reader.is_opaque_block());

        reader.read_next().expect("script");
        assert!(reader.is_script_block());

        reader.read_next().expect("p tag");
        assert_eq!(reader.tag_name(), "p");
    }

    #[test]
    fn test_markup_declaration() {
        let mut reader = HtmlReader::new("<!DOCTYPE html><html></html>");
        reader.read_next().expect("doctype");
        assert!(reader.is_markup_declaration());
        assert!(!reader.is_comment_block());
        reader.read_next().expect("html tag");
        assert_eq!(reader.tag_name(), "html");
    }

    #[test]
    fn test_template_token_in_content() {
        let mut reader = HtmlReader::new("<p>A{{x}}B</p>");
        reader.read_next().expect("p");
        reader.read_next().expect("end of tag");
        reader.read_next().expect("template token");
        assert_eq!(reader.mode(), ReadMode::TemplateToken);
        assert_eq!(reader.text(), "A");
        assert_eq!(reader.delimiter(), "{{x}}");
        reader.read_next().expect("closing tag");
        assert_eq!(reader.text(), "B");
        assert!(reader.is_closing_tag());
    }

    #[test]
    fn test_self_closing_delimiter() {
        let mut reader = HtmlReader::new("<br/>");
        reader.read_next().expect("br");
        reader.read_next().expect("end of tag");
        assert_eq!(reader.mode(), ReadMode::EndOfTag);
        assert_eq!(reader.delimiter(), "/>");
        assert!(reader.is_closing_tag());
    }

    #[test]
    fn test_line_numbers() {
        let mut reader = HtmlReader::new("<div>\n<p>\n<a href=fo\"o\">");
        reader.read_next().expect("div");
        reader.read_next().expect("div end");
        reader.read_next().expect("p");
        reader.read_next().expect("p end");
        reader.read_next().expect("a");
        let err = reader.read_next().expect_err("bad attribute");
        assert_eq!(err.line(), 3);
    }

    #[test]
    fn test_empty_input() {
        let mut reader = HtmlReader::new("");
        reader.read_next().expect("empty");
        assert_eq!(reader.mode(), ReadMode::End);
        assert_eq!(reader.text(), "");
    }
}
