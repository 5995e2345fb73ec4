use std::env;
use std::fs;
use std::process;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use corext_markup::{parse_with_options, MarkupError, ParseOptions, Parsed};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();
    let mut lenient = false;
    let mut json = false;
    let mut files: Vec<String> = Vec::new();

    for arg in &args[1..] {
        match arg.as_str() {
            "--lenient" => lenient = true,
            "--json" => json = true,
            _ => files.push(arg.clone()),
        }
    }

    if files.is_empty() {
        eprintln!("Usage: corext-check [--lenient] [--json] <file.html>...");
        eprintln!();
        eprintln!("Examples:");
        eprintln!("  corext-check page.html");
        eprintln!("  corext-check --lenient --json templates/*.html");
        process::exit(1);
    }

    let mut exit_code = 0;
    for file_path in files {
        match check_file(&file_path, lenient, json) {
            Ok(()) => {
                if !json {
                    println!("✓ {} is valid", file_path);
                }
            }
            Err(e) => {
                eprintln!("✗ {} has errors:", file_path);
                print_error(&e);
                exit_code = 1;
            }
        }
    }

    process::exit(exit_code);
}

fn check_file(path: &str, lenient: bool, json: bool) -> anyhow::Result<()> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path))?;

    let options = ParseOptions {
        strict: !lenient,
        ..ParseOptions::default()
    };
    let parsed = parse_with_options(&content, options)?;

    if json {
        let report = outline(&parsed);
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(())
}

/// Shallow JSON summary: node count, root tags, template ids.
fn outline(parsed: &Parsed) -> serde_json::Value {
    let roots: Vec<serde_json::Value> = parsed
        .root_elements
        .iter()
        .filter_map(|id| parsed.graph.get(*id))
        .map(|node| {
            serde_json::json!({
                "tag": node.html_tag,
                "name": node.name,
                "children": node.children().len(),
            })
        })
        .collect();
    let mut templates: Vec<&str> = parsed.templates.keys().map(String::as_str).collect();
    templates.sort_unstable();
    serde_json::json!({
        "nodes": parsed.graph.len(),
        "roots": roots,
        "templates": templates,
    })
}

fn print_error(error: &anyhow::Error) {
    match error.downcast_ref::<MarkupError>() {
        Some(MarkupError::Syntax {
            line,
            message,
            context,
        }) => {
            eprintln!("  Syntax error at line {}:", line);
            eprintln!("    {} (near '{}')", message, context);
        }
        Some(MarkupError::TypeResolution {
            line,
            tag,
            type_name,
        }) => {
            eprintln!("  Unknown node type at line {}:", line);
            eprintln!("    '{}' on <{}> did not resolve", type_name, tag);
        }
        Some(MarkupError::MismatchedClosingTag {
            line,
            expected,
            found,
        }) => {
            eprintln!("  Mismatched closing tag at line {}:", line);
            eprintln!("    found '</{}>' while '<{}>' is open", found, expected);
        }
        None => {
            eprintln!("  {:#}", error);
        }
    }
}
