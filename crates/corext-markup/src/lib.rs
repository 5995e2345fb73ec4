//! Markup front end: a pull tokenizer and a graph-building parser.
//!
//! [`HtmlReader`] walks markup token by token under caller control; a
//! single master pattern splits the source into (running text, delimiter)
//! pairs and a small state machine refines those into tags, attributes and
//! template tokens. [`parse`] drives the reader to build a
//! [`corext_graph::Graph`], discovering the application root, extracting
//! `data--template` elements, and wrapping loose text in text nodes.

pub mod error;
pub mod parser;
pub mod reader;
pub mod templates;

pub use error::{MarkupError, MarkupResult};
pub use parser::{parse, parse_with_options, ParseOptions, Parsed};
pub use reader::{HtmlReader, ReadMode};
pub use templates::{placeholder_for, DataTemplate};
