//! Reader tests over document-sized inputs.

use pretty_assertions::assert_eq;

use corext_markup::{HtmlReader, ReadMode};

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head>
  <title>Demo</title>
  <style>p > a { color: red; }</style>
  <script>if (a < b) { go(); }</script>
</head>
<body>
  <!-- navigation -->
  <div id="nav" class="bar">
    <a href="/home" target="_self">Home &amp; more</a>
    <img src="logo.png" alt="logo"/>
    {{greeting}}
  </div>
</body>
</html>"#;

#[test]
fn test_full_page_token_walk() {
    let mut reader = HtmlReader::new(PAGE);
    let mut opens = Vec::new();
    let mut closes = Vec::new();
    let mut attrs = Vec::new();
    let mut blocks = 0;
    let mut template_tokens = Vec::new();

    loop {
        reader.read_next().expect("well-formed page");
        match reader.mode() {
            ReadMode::Tag if reader.is_opaque_block() => blocks += 1,
            ReadMode::Tag if reader.tag_bracket() == "</" => {
                closes.push(reader.tag_name().to_string());
            }
            ReadMode::Tag => opens.push(reader.tag_name().to_string()),
            ReadMode::Attribute => attrs.push(reader.attribute_name().to_string()),
            ReadMode::TemplateToken => template_tokens.push(reader.delimiter().to_string()),
            ReadMode::End => break,
            _ => {}
        }
    }

    assert_eq!(opens, vec!["html", "head", "title", "body", "div", "a", "img"]);
    assert_eq!(closes, vec!["title", "head", "a", "div", "body", "html"]);
    assert_eq!(attrs, vec!["id", "class", "href", "target", "src", "alt"]);
    // doctype, style, script, comment
    assert_eq!(blocks, 4);
    assert_eq!(template_tokens, vec!["{{greeting}}"]);
}

#[test]
fn test_full_page_reconstruction() {
    let mut reader = HtmlReader::new(PAGE);
    let mut rebuilt = String::new();
    loop {
        reader.read_next().expect("well-formed page");
        rebuilt.push_str(reader.current_running_text());
        if reader.mode() == ReadMode::End {
            break;
        }
    }
    assert_eq!(rebuilt, PAGE);
}

#[test]
fn test_entities_stay_in_running_text() {
    let mut reader = HtmlReader::new("<p>fish &amp; chips &#169;</p>");
    reader.read_next().expect("p");
    reader.read_next().expect("end of tag");
    reader.read_next().expect("closing tag");
    assert_eq!(reader.text(), "fish &amp; chips &#169;");
}

#[test]
fn test_token_offsets_cover_source() {
    let html = "<div>a<span>b</span>c</div>";
    let mut reader = HtmlReader::new(html);
    let mut prev_end = 0;
    loop {
        reader.read_next().expect("well-formed input");
        assert_eq!(reader.token_start(), prev_end);
        assert!(reader.token_end() >= reader.token_start());
        prev_end = reader.token_end();
        if reader.mode() == ReadMode::End {
            break;
        }
    }
    assert_eq!(prev_end, html.len());
}
