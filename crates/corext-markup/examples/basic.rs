//! Example: parse markup, lay it out into an in-memory DOM, render it back.

use corext_graph::MemoryDom;
use corext_markup::parse;

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let html = r#"<div id="main" title="demo"><h2>CoreXT</h2><p>hello <em>world</em></p></div>"#;

    let mut parsed = parse(html)?;
    println!("parsed {} nodes, {} roots", parsed.graph.len(), parsed.root_elements.len());

    let mut dom = MemoryDom::new();
    for root in parsed.root_elements.clone() {
        parsed.graph.update_layout(&mut dom, root, true);
        if let Some(el) = parsed.graph.get(root).and_then(|n| n.element()) {
            println!("{}", dom.render_html(el));
        }
    }
    Ok(())
}
