use std::sync::Arc;

use pulldown_cmark::{CodeBlockKind, Event, Parser, Tag, TagEnd};

use crate::core::{Attrs, Document, ElementNode, Node};
use crate::plugin::PluginRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkdownToken {
    Paragraph { content: String },
    Fence { info: String, content: String },
    CodeBlock { content: String },
}

impl MarkdownToken {
    pub fn name(&self) -> &'static str {
        match self {
            MarkdownToken::Paragraph { .. } => "paragraph",
            MarkdownToken::Fence { .. } => "fence",
            MarkdownToken::CodeBlock { .. } => "code_block",
        }
    }

    pub fn content(&self) -> &str {
        match self {
            MarkdownToken::Paragraph { content }
            | MarkdownToken::Fence { content, .. }
            | MarkdownToken::CodeBlock { content } => content,
        }
    }

    pub fn info(&self) -> Option<&str> {
        match self {
            MarkdownToken::Fence { info, .. } => Some(info),
            _ => None,
        }
    }
}

pub type GetAttrsFn = Arc<dyn Fn(&MarkdownToken) -> Attrs + Send + Sync>;
pub type SerializeFn = Arc<dyn Fn(&mut MarkdownWriter, &ElementNode) + Send + Sync>;

#[derive(Clone)]
pub struct MarkdownSpec {
    pub kind: String,
    pub tokens: Vec<&'static str>,
    pub get_attrs: GetAttrsFn,
    pub serialize: SerializeFn,
}

impl MarkdownSpec {
    pub fn new(
        kind: impl Into<String>,
        token: &'static str,
        get_attrs: impl Fn(&MarkdownToken) -> Attrs + Send + Sync + 'static,
        serialize: impl Fn(&mut MarkdownWriter, &ElementNode) + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind: kind.into(),
            tokens: vec![token],
            get_attrs: Arc::new(get_attrs),
            serialize: Arc::new(serialize),
        }
    }

    pub fn token(mut self, token: &'static str) -> Self {
        self.tokens.push(token);
        self
    }
}

#[derive(Debug, Default)]
pub struct MarkdownWriter {
    out: String,
    closed: bool,
}

impl MarkdownWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write(&mut self, content: &str) {
        self.flush_close();
        self.out.push_str(content);
    }

    pub fn text(&mut self, text: &str, escape: bool) {
        self.flush_close();
        if !escape {
            self.out.push_str(text);
            return;
        }
        for (ix, line) in text.split('\n').enumerate() {
            if ix > 0 {
                self.out.push('\n');
            }
            self.out.push_str(&escape_line(line));
        }
    }

    pub fn ensure_new_line(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
    }

    pub fn close_block(&mut self) {
        self.closed = true;
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn flush_close(&mut self) {
        if !self.closed {
            return;
        }
        self.closed = false;
        if self.out.is_empty() {
            return;
        }
        self.ensure_new_line();
        self.out.push('\n');
    }
}

fn escape_line(line: &str) -> String {
    let body = line.trim_start_matches([' ', '\t']);
    let indent = &line[..line.len() - body.len()];

    // Leading whitespace is dropped or opens an indented code block unless encoded.
    let mut out = String::with_capacity(line.len());
    for ch in indent.chars() {
        out.push_str(if ch == '\t' { "&#9;" } else { "&#32;" });
    }
    for ch in body.chars() {
        if matches!(ch, '`' | '*' | '\\' | '~' | '[' | ']' | '_') {
            out.push('\\');
        }
        out.push(ch);
    }

    if out.starts_with(['#', '-', '+', '>']) {
        out.insert(0, '\\');
    }
    let digits = out.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 && out[digits..].starts_with('.') {
        out.insert(digits, '\\');
    }
    out
}

pub fn tokenize(markdown: &str) -> Vec<MarkdownToken> {
    enum Code {
        Fenced(String),
        Indented,
    }

    let mut tokens = Vec::new();
    let mut text = String::new();
    let mut code: Option<(Code, String)> = None;

    let flush_text = |text: &mut String, tokens: &mut Vec<MarkdownToken>| {
        if !text.is_empty() {
            tokens.push(MarkdownToken::Paragraph {
                content: std::mem::take(text),
            });
        }
    };

    for event in Parser::new(markdown) {
        match event {
            Event::Start(Tag::CodeBlock(kind)) => {
                flush_text(&mut text, &mut tokens);
                let kind = match kind {
                    CodeBlockKind::Fenced(info) => Code::Fenced(info.trim().to_string()),
                    CodeBlockKind::Indented => Code::Indented,
                };
                code = Some((kind, String::new()));
            }
            Event::End(TagEnd::CodeBlock) => {
                let Some((kind, mut content)) = code.take() else {
                    continue;
                };
                if content.ends_with('\n') {
                    content.pop();
                }
                tokens.push(match kind {
                    Code::Fenced(info) => MarkdownToken::Fence { info, content },
                    Code::Indented => MarkdownToken::CodeBlock { content },
                });
            }
            Event::Code(t) => push_code_span(&mut text, &t),
            Event::Text(t) | Event::Html(t) | Event::InlineHtml(t) => {
                match code.as_mut() {
                    Some((_, content)) => content.push_str(&t),
                    None => text.push_str(&t),
                }
            }
            Event::SoftBreak | Event::HardBreak => text.push('\n'),
            Event::End(
                TagEnd::Paragraph | TagEnd::Heading(_) | TagEnd::Item | TagEnd::HtmlBlock,
            ) => flush_text(&mut text, &mut tokens),
            _ => {}
        }
    }
    flush_text(&mut text, &mut tokens);

    tokens
}

fn push_code_span(out: &mut String, code: &str) {
    let longest = code
        .split(|ch| ch != '`')
        .map(str::len)
        .max()
        .unwrap_or_default();
    let fence = "`".repeat(longest + 1);
    let pad = if code.starts_with('`') || code.ends_with('`') {
        " "
    } else {
        ""
    };
    out.push_str(&fence);
    out.push_str(pad);
    out.push_str(code);
    out.push_str(pad);
    out.push_str(&fence);
}

pub fn parse_markdown(registry: &PluginRegistry, markdown: &str) -> Document {
    let children = tokenize(markdown)
        .into_iter()
        .map(|token| {
            let element = match registry.markdown_spec_for_token(&token) {
                Some(spec) => registry.create_element(
                    &spec.kind,
                    (spec.get_attrs)(&token),
                    vec![Node::text(token.content())],
                ),
                None => {
                    tracing::debug!(
                        token = token.name(),
                        "no markdown spec for token; importing as paragraph"
                    );
                    registry.create_element(
                        "paragraph",
                        Attrs::default(),
                        vec![Node::text(token.content())],
                    )
                }
            };
            Node::Element(element)
        })
        .collect();

    Document::new(children)
}

pub fn serialize_markdown(registry: &PluginRegistry, doc: &Document) -> String {
    let mut writer = MarkdownWriter::new();
    for node in &doc.children {
        let Node::Element(el) = node else {
            continue;
        };
        match registry.markdown_spec_for_kind(&el.kind) {
            Some(spec) => (spec.serialize)(&mut writer, el),
            None => {
                tracing::debug!(kind = %el.kind, "no markdown spec for node; exporting text");
                writer.text(&el.text_content(), true);
                writer.close_block();
            }
        }
    }
    writer.finish()
}
