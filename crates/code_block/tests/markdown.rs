mod common;

use plate_code_block::{DEFAULT_LANGUAGE, LANGUAGE_ATTR};
use plate_core::markdown::{parse_markdown, serialize_markdown};
use plate_core::{Document, Node};
use pretty_assertions::assert_eq;
use rstest::rstest;

use common::{Harness, code_block};

fn serialize(doc: &Document) -> String {
    serialize_markdown(&Harness::default().registry(), doc)
}

fn parse(markdown: &str) -> Document {
    parse_markdown(&Harness::default().registry(), markdown)
}

fn language_of(doc: &Document, ix: usize) -> Option<String> {
    let Node::Element(el) = &doc.children[ix] else {
        panic!("expected element block");
    };
    el.attr_str(LANGUAGE_ATTR).map(str::to_string)
}

#[rstest]
fn every_stock_language_round_trips(
    #[values(
        "bash",
        "css",
        "clike",
        "csharp",
        "go",
        "markup",
        "objectivec",
        "java",
        "javascript",
        "json",
        "php",
        "powershell",
        "python",
        "ruby",
        "typescript",
        "yaml"
    )]
    language: &str,
    #[values("", "one line", "first\n  indented\n\nafter blank", "trailing newline\n")]
    text: &str,
) {
    let doc = Document::new(vec![code_block(language, text)]);
    assert_eq!(parse(&serialize(&doc)), doc);
}

#[test]
fn unknown_language_is_kept_verbatim() {
    let doc = Document::new(vec![code_block("klingon", "Qapla'")]);
    assert_eq!(parse(&serialize(&doc)), doc);
}

#[test]
fn empty_language_writes_bare_fence() {
    let doc = Document::new(vec![code_block("", "x")]);
    assert_eq!(serialize(&doc), "```\nx\n```");
}

#[test]
fn bare_fence_parses_to_default_language() {
    let doc = parse("```\nx\n```\n");
    assert_eq!(language_of(&doc, 0).as_deref(), Some(DEFAULT_LANGUAGE));
    assert_eq!(doc, Document::new(vec![code_block("yaml", "x")]));
}

#[test]
fn info_string_is_trimmed() {
    let doc = parse("```   python  \nprint(1)\n```\n");
    assert_eq!(doc, Document::new(vec![code_block("python", "print(1)")]));
}

#[test]
fn indented_code_takes_default_language() {
    let doc = parse("    x = 1\n");
    assert_eq!(doc, Document::new(vec![code_block("yaml", "x = 1")]));
}

#[rstest]
#[case("```rust\nfn main() {}\n```")]
#[case("```yaml\n```")]
#[case("intro\n\n```json\n{\"a\": [1, 2]}\n```")]
#[case("```yaml\na: 1\n```\n\noutro")]
fn markdown_round_trips(#[case] markdown: &str) {
    assert_eq!(serialize(&parse(markdown)), markdown);
}

#[test]
fn paragraph_and_code_block_are_separated_by_one_blank_line() {
    let doc = Document::new(vec![Node::paragraph("See:"), code_block("bash", "ls")]);
    assert_eq!(serialize(&doc), "See:\n\n```bash\nls\n```");
}

#[test]
fn code_text_is_not_escaped() {
    let doc = Document::new(vec![code_block("markup", "# *not* [markdown]_\n> ok")]);
    assert_eq!(
        serialize(&doc),
        "```markup\n# *not* [markdown]_\n> ok\n```"
    );
}

#[test]
fn nested_fence_gets_longer_outer_fence() {
    let doc = Document::new(vec![code_block("markup", "```js\nlet x;\n```")]);

    let markdown = serialize(&doc);
    assert_eq!(markdown, "````markup\n```js\nlet x;\n```\n````");
    assert_eq!(parse(&markdown), doc);
}

#[test]
fn language_with_backtick_uses_tilde_fence() {
    let doc = Document::new(vec![code_block("a`b", "x")]);

    let markdown = serialize(&doc);
    assert_eq!(markdown, "~~~a`b\nx\n~~~");
    assert_eq!(parse(&markdown), doc);
}

#[test]
fn tilde_fence_outgrows_tilde_runs_in_content() {
    let doc = Document::new(vec![code_block("`", "~~~\n```\n~~~~")]);

    let markdown = serialize(&doc);
    assert_eq!(markdown, "~~~~~`\n~~~\n```\n~~~~\n~~~~~");
    assert_eq!(parse(&markdown), doc);
}
