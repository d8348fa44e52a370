use std::collections::HashMap;
use std::ops::Range;

use crate::core::{Document, ElementNode, Node};
use crate::ops::Path;
use crate::plugin::PluginRegistry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightMode {
    Eager,
    Deferred,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightSpec {
    pub kind: String,
    pub language_attr: String,
    pub mode: HighlightMode,
}

impl HighlightSpec {
    pub fn new(kind: impl Into<String>, language_attr: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            language_attr: language_attr.into(),
            mode: HighlightMode::Eager,
        }
    }

    pub fn deferred(mut self, deferred: bool) -> Self {
        self.mode = if deferred {
            HighlightMode::Deferred
        } else {
            HighlightMode::Eager
        };
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HighlightToken {
    pub range: Range<usize>,
    pub class: String,
}

pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, language: &str, code: &str) -> Option<Vec<HighlightToken>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoration {
    pub path: Path,
    pub range: Range<usize>,
    pub class: String,
}

#[derive(Debug, Clone)]
struct CachedBlock {
    language: String,
    text: String,
    decorations: Vec<Decoration>,
}

pub struct Highlighter {
    specs: Vec<HighlightSpec>,
    loaded: bool,
    cache: HashMap<Path, CachedBlock>,
    decorations: Vec<Decoration>,
}

impl Highlighter {
    pub fn new(registry: &PluginRegistry) -> Self {
        Self {
            specs: registry.highlight_specs().to_vec(),
            loaded: false,
            cache: HashMap::new(),
            decorations: Vec::new(),
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn decorations(&self) -> &[Decoration] {
        &self.decorations
    }

    pub fn init(&mut self, doc: &Document, tokenizer: &dyn Tokenizer) -> &[Decoration] {
        self.refresh(doc, tokenizer);
        &self.decorations
    }

    pub fn loaded(&mut self, doc: &Document, tokenizer: &dyn Tokenizer) -> &[Decoration] {
        self.loaded = true;
        self.refresh(doc, tokenizer);
        &self.decorations
    }

    pub fn update(&mut self, doc: &Document, tokenizer: &dyn Tokenizer) -> &[Decoration] {
        self.refresh(doc, tokenizer);
        &self.decorations
    }

    fn active_spec(&self, kind: &str) -> Option<&HighlightSpec> {
        self.specs
            .iter()
            .find(|spec| spec.kind == kind)
            .filter(|spec| self.loaded || spec.mode == HighlightMode::Eager)
    }

    fn refresh(&mut self, doc: &Document, tokenizer: &dyn Tokenizer) {
        let mut targets: Vec<(Path, &ElementNode, String)> = Vec::new();
        collect_targets(&doc.children, &mut Vec::new(), &mut |path, el| {
            let Some(spec) = self.active_spec(&el.kind) else {
                return;
            };
            let language = el.attr_str(&spec.language_attr).unwrap_or_default();
            if !language.is_empty() {
                targets.push((path.to_vec(), el, language.to_string()));
            }
        });

        let mut cache = HashMap::with_capacity(targets.len());
        for (path, el, language) in targets {
            let text = el.text_content();
            let block = match self.cache.remove(&path) {
                Some(cached) if cached.language == language && cached.text == text => cached,
                _ => {
                    let decorations = tokenize_block(tokenizer, &path, &language, &text);
                    CachedBlock {
                        language,
                        text,
                        decorations,
                    }
                }
            };
            cache.insert(path, block);
        }

        let mut paths: Vec<&Path> = cache.keys().collect();
        paths.sort();
        self.decorations = paths
            .into_iter()
            .flat_map(|path| cache[path].decorations.iter().cloned())
            .collect();
        self.cache = cache;
    }
}

fn collect_targets<'a>(
    nodes: &'a [Node],
    path: &mut Vec<usize>,
    visit: &mut dyn FnMut(&[usize], &'a ElementNode),
) {
    for (ix, node) in nodes.iter().enumerate() {
        let Node::Element(el) = node else {
            continue;
        };
        path.push(ix);
        visit(path, el);
        collect_targets(&el.children, path, visit);
        path.pop();
    }
}

fn tokenize_block(
    tokenizer: &dyn Tokenizer,
    path: &[usize],
    language: &str,
    text: &str,
) -> Vec<Decoration> {
    let Some(tokens) = tokenizer.tokenize(language, text) else {
        tracing::debug!(?path, language, "tokenizer does not know language");
        return Vec::new();
    };
    tracing::trace!(?path, language, tokens = tokens.len(), "tokenized block");
    tokens
        .into_iter()
        .filter(|token| token.range.start < token.range.end && token.range.end <= text.len())
        .map(|token| Decoration {
            path: path.to_vec(),
            range: token.range,
            class: token.class,
        })
        .collect()
}
