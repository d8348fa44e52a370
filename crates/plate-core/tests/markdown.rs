use plate_core::markdown::{parse_markdown, serialize_markdown};
use plate_core::{Document, Node, PluginRegistry};
use pretty_assertions::assert_eq;

#[test]
fn paragraphs_round_trip() {
    let registry = PluginRegistry::core();
    let doc = parse_markdown(&registry, "hello\n\nworld\n");

    assert_eq!(
        doc,
        Document::new(vec![Node::paragraph("hello"), Node::paragraph("world")])
    );
    assert_eq!(serialize_markdown(&registry, &doc), "hello\n\nworld");
}

#[test]
fn paragraph_text_is_escaped_on_export() {
    let registry = PluginRegistry::core();
    let doc = Document::new(vec![Node::paragraph("# not a heading *really*")]);

    assert_eq!(
        serialize_markdown(&registry, &doc),
        "\\# not a heading \\*really\\*"
    );
}

#[test]
fn unclaimed_fence_imports_as_paragraph() {
    let registry = PluginRegistry::core();
    let doc = parse_markdown(&registry, "```sh\nls -la\n```\n");

    assert_eq!(doc, Document::new(vec![Node::paragraph("ls -la")]));
}

#[test]
fn indented_paragraph_text_stays_a_paragraph() {
    let registry = PluginRegistry::core();
    let doc = Document::new(vec![
        Node::paragraph("    not code"),
        Node::paragraph("first\n\tsecond"),
    ]);

    let markdown = serialize_markdown(&registry, &doc);
    assert_eq!(
        markdown,
        "&#32;&#32;&#32;&#32;not code\n\nfirst\n&#9;second"
    );
    assert_eq!(parse_markdown(&registry, &markdown), doc);
}

#[test]
fn inline_code_survives_a_round_trip() {
    let registry = PluginRegistry::core();
    let doc = parse_markdown(&registry, "run `cargo` now\n");

    assert_eq!(doc, Document::new(vec![Node::paragraph("run `cargo` now")]));
    let markdown = serialize_markdown(&registry, &doc);
    assert_eq!(markdown, "run \\`cargo\\` now");
    assert_eq!(parse_markdown(&registry, &markdown), doc);
}
