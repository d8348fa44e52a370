use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::core::{Attrs, Document, ElementNode, Node};
use crate::plugin::PluginRegistry;
use crate::view::{EditorView, Rect};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DomEventKind {
    Click,
    Change,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct EventTarget {
    pub value: String,
    pub rect: Rect,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DomEvent {
    pub kind: DomEventKind,
    pub target: EventTarget,
}

impl DomEvent {
    pub fn click(rect: Rect) -> Self {
        Self {
            kind: DomEventKind::Click,
            target: EventTarget {
                value: String::new(),
                rect,
            },
        }
    }

    pub fn change(value: impl Into<String>, rect: Rect) -> Self {
        Self {
            kind: DomEventKind::Change,
            target: EventTarget {
                value: value.into(),
                rect,
            },
        }
    }
}

pub type Listener = Arc<dyn Fn(&mut EditorView, &DomEvent) + Send + Sync>;

#[derive(Debug, Clone)]
pub enum DomChild {
    Element(DomElement),
    Text(String),
    Hole,
}

#[derive(Clone)]
pub struct DomElement {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    pub children: Vec<DomChild>,
    listeners: Vec<(DomEventKind, Listener)>,
}

impl fmt::Debug for DomElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomElement")
            .field("tag", &self.tag)
            .field("attrs", &self.attrs)
            .field("children", &self.children)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl DomElement {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attrs: BTreeMap::new(),
            children: Vec::new(),
            listeners: Vec::new(),
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    pub fn class(self, class: impl Into<String>) -> Self {
        self.attr("class", class)
    }

    pub fn child(mut self, child: DomElement) -> Self {
        self.children.push(DomChild::Element(child));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(DomChild::Text(text.into()));
        self
    }

    pub fn hole(mut self) -> Self {
        self.children.push(DomChild::Hole);
        self
    }

    pub fn on(
        mut self,
        kind: DomEventKind,
        listener: impl Fn(&mut EditorView, &DomEvent) + Send + Sync + 'static,
    ) -> Self {
        self.listeners.push((kind, Arc::new(listener)));
        self
    }

    pub fn get_attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.get_attr("class")
            .is_some_and(|classes| classes.split_whitespace().any(|c| c == class))
    }

    pub fn listeners(&self, kind: DomEventKind) -> impl Iterator<Item = &Listener> {
        self.listeners
            .iter()
            .filter(move |(k, _)| *k == kind)
            .map(|(_, listener)| listener)
    }

    pub fn elements(&self) -> impl Iterator<Item = &DomElement> {
        self.children.iter().filter_map(|child| match child {
            DomChild::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn find(&self, pred: &dyn Fn(&DomElement) -> bool) -> Option<&DomElement> {
        if pred(self) {
            return Some(self);
        }
        self.elements().find_map(|el| el.find(pred))
    }

    pub fn find_by_tag(&self, tag: &str) -> Option<&DomElement> {
        self.find(&|el| el.tag == tag)
    }

    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for child in &self.children {
            match child {
                DomChild::Element(el) => el.collect_text(out),
                DomChild::Text(text) => out.push_str(text),
                DomChild::Hole => {}
            }
        }
    }

    pub fn fill_hole(mut self, text: &str) -> Self {
        for child in &mut self.children {
            match child {
                DomChild::Hole => *child = DomChild::Text(text.to_string()),
                DomChild::Element(el) => {
                    let filled = std::mem::replace(el, DomElement::new("")).fill_hole(text);
                    *el = filled;
                }
                DomChild::Text(_) => {}
            }
        }
        self
    }

    pub fn to_html(&self) -> String {
        let mut out = String::new();
        self.write_html(&mut out);
        out
    }

    fn write_html(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.tag);
        for (key, value) in &self.attrs {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&html_escape::encode_double_quoted_attribute(value));
            out.push('"');
        }
        out.push('>');
        for child in &self.children {
            match child {
                DomChild::Element(el) => el.write_html(out),
                DomChild::Text(text) => out.push_str(&html_escape::encode_text(text)),
                DomChild::Hole => {}
            }
        }
        out.push_str("</");
        out.push_str(&self.tag);
        out.push('>');
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Tag(String),
    Class(String),
}

impl Selector {
    pub fn matches(&self, el: &DomElement) -> bool {
        match self {
            Selector::Tag(tag) => el.tag == *tag,
            Selector::Class(class) => el.has_class(class),
        }
    }
}

pub type GetDomAttrsFn = Arc<dyn Fn(&DomElement) -> Attrs + Send + Sync>;

#[derive(Clone)]
pub struct ParseRule {
    pub selector: Selector,
    pub preserve_whitespace: bool,
    pub content_element: Option<String>,
    pub get_attrs: Option<GetDomAttrsFn>,
}

impl ParseRule {
    pub fn tag(tag: impl Into<String>) -> Self {
        Self::with_selector(Selector::Tag(tag.into()))
    }

    pub fn class(class: impl Into<String>) -> Self {
        Self::with_selector(Selector::Class(class.into()))
    }

    fn with_selector(selector: Selector) -> Self {
        Self {
            selector,
            preserve_whitespace: false,
            content_element: None,
            get_attrs: None,
        }
    }

    pub fn preserve_whitespace(mut self) -> Self {
        self.preserve_whitespace = true;
        self
    }

    pub fn content_element(mut self, tag: impl Into<String>) -> Self {
        self.content_element = Some(tag.into());
        self
    }

    pub fn get_attrs(mut self, f: impl Fn(&DomElement) -> Attrs + Send + Sync + 'static) -> Self {
        self.get_attrs = Some(Arc::new(f));
        self
    }
}

pub type ToDomFn = Arc<dyn Fn(&ElementNode) -> DomElement + Send + Sync>;

#[derive(Clone)]
pub struct DomSpec {
    pub kind: String,
    pub to_dom: ToDomFn,
    pub parse_rules: Vec<ParseRule>,
}

impl DomSpec {
    pub fn new(
        kind: impl Into<String>,
        to_dom: impl Fn(&ElementNode) -> DomElement + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind: kind.into(),
            to_dom: Arc::new(to_dom),
            parse_rules: Vec::new(),
        }
    }

    pub fn parse_rule(mut self, rule: ParseRule) -> Self {
        self.parse_rules.push(rule);
        self
    }
}

pub fn render_node(registry: &PluginRegistry, el: &ElementNode) -> DomElement {
    let dom = match registry.dom_spec_for_kind(&el.kind) {
        Some(spec) => (spec.to_dom)(el),
        None => DomElement::new("div").hole(),
    };
    dom.fill_hole(&el.text_content())
}

pub fn render_document(registry: &PluginRegistry, doc: &Document) -> DomElement {
    doc.children
        .iter()
        .filter_map(|node| match node {
            Node::Element(el) => Some(render_node(registry, el)),
            Node::Text(_) => None,
        })
        .fold(DomElement::new("div").class("plate-editor"), DomElement::child)
}

pub fn parse_block(registry: &PluginRegistry, el: &DomElement) -> ElementNode {
    for spec in registry.dom_specs() {
        for rule in &spec.parse_rules {
            if !rule.selector.matches(el) {
                continue;
            }
            let attrs = rule
                .get_attrs
                .as_ref()
                .map(|get_attrs| get_attrs(el))
                .unwrap_or_default();
            let content = rule
                .content_element
                .as_deref()
                .and_then(|tag| el.find_by_tag(tag))
                .unwrap_or(el);
            let text = if rule.preserve_whitespace {
                content.text_content()
            } else {
                collapse_whitespace(&content.text_content())
            };
            return registry.create_element(&spec.kind, attrs, vec![Node::text(text)]);
        }
    }

    tracing::debug!(tag = %el.tag, "no parse rule matched; importing as paragraph");
    registry.create_element(
        "paragraph",
        Attrs::default(),
        vec![Node::text(collapse_whitespace(&el.text_content()))],
    )
}

pub fn parse_dom(registry: &PluginRegistry, root: &DomElement) -> Document {
    Document::new(
        root.elements()
            .map(|el| Node::Element(parse_block(registry, el)))
            .collect(),
    )
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
