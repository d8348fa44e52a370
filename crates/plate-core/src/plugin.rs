use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::core::{
    Attrs, Document, Editor, ElementNode, Marks, Node, Point, Selection, TextNode,
    clamp_to_char_boundary,
};
use crate::dom::{DomElement, DomSpec, ParseRule};
use crate::highlight::HighlightSpec;
use crate::keymap::{KeyBinding, Keymap};
use crate::markdown::{MarkdownSpec, MarkdownToken, MarkdownWriter};
use crate::ops::{Op, Path, Transaction};

#[derive(Debug, Clone)]
pub struct CommandError {
    message: String,
}

impl CommandError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, Clone)]
pub struct QueryError {
    message: String,
}

impl QueryError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("duplicate node spec kind: {0}")]
    DuplicateNodeKind(String),
    #[error("duplicate command id: {0}")]
    DuplicateCommand(String),
    #[error("duplicate query id: {0}")]
    DuplicateQuery(String),
}

pub type CommandHandler =
    Arc<dyn Fn(&mut Editor, Option<serde_json::Value>) -> Result<(), CommandError> + Send + Sync>;

pub type QueryHandler = Arc<
    dyn Fn(&Editor, Option<serde_json::Value>) -> Result<serde_json::Value, QueryError>
        + Send
        + Sync,
>;

#[derive(Clone)]
pub struct CommandSpec {
    pub id: String,
    pub label: String,
    pub description: Option<String>,
    pub keywords: Vec<String>,
    pub handler: CommandHandler,
}

impl CommandSpec {
    pub fn new(
        id: impl Into<String>,
        label: impl Into<String>,
        handler: impl Fn(&mut Editor, Option<serde_json::Value>) -> Result<(), CommandError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            description: None,
            keywords: Vec::new(),
            handler: Arc::new(handler),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords = keywords.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Clone)]
pub struct QuerySpec {
    pub id: String,
    pub handler: QueryHandler,
}

impl QuerySpec {
    pub fn new(
        id: impl Into<String>,
        handler: impl Fn(&Editor, Option<serde_json::Value>) -> Result<serde_json::Value, QueryError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            id: id.into(),
            handler: Arc::new(handler),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub kind: String,
    #[serde(default)]
    pub default_attrs: Attrs,
    #[serde(default = "default_true")]
    pub marks: bool,
    #[serde(default)]
    pub code: bool,
}

fn default_true() -> bool {
    true
}

impl NodeSpec {
    pub fn text_block(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            default_attrs: Attrs::default(),
            marks: true,
            code: false,
        }
    }

    pub fn default_attr(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.default_attrs.insert(key.into(), value.into());
        self
    }

    pub fn marks(mut self, marks: bool) -> Self {
        self.marks = marks;
        self
    }

    pub fn code(mut self, code: bool) -> Self {
        self.code = code;
        self
    }
}

pub trait NormalizePass: Send + Sync {
    fn id(&self) -> &'static str;
    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op>;
}

pub trait TransactionTransform: Send + Sync {
    fn id(&self) -> &'static str;
    fn transform(&self, editor: &Editor, tx: &Transaction) -> Option<Transaction>;
}

pub trait PlatePlugin: Send + Sync {
    fn id(&self) -> &'static str;
    fn node_specs(&self) -> Vec<NodeSpec> {
        Vec::new()
    }
    fn transaction_transforms(&self) -> Vec<Box<dyn TransactionTransform>> {
        Vec::new()
    }
    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        Vec::new()
    }
    fn commands(&self) -> Vec<CommandSpec> {
        Vec::new()
    }
    fn queries(&self) -> Vec<QuerySpec> {
        Vec::new()
    }
    fn key_bindings(&self) -> Vec<KeyBinding> {
        Vec::new()
    }
    fn markdown_specs(&self) -> Vec<MarkdownSpec> {
        Vec::new()
    }
    fn dom_specs(&self) -> Vec<DomSpec> {
        Vec::new()
    }
    fn highlight_specs(&self) -> Vec<HighlightSpec> {
        Vec::new()
    }
}

#[derive(Default)]
pub struct PluginRegistry {
    node_specs: HashMap<String, NodeSpec>,
    transaction_transforms: Vec<Box<dyn TransactionTransform>>,
    normalize_passes: Vec<Box<dyn NormalizePass>>,
    commands: HashMap<String, CommandSpec>,
    queries: HashMap<String, QuerySpec>,
    keymap: Keymap,
    markdown_specs: Vec<MarkdownSpec>,
    dom_specs: Vec<DomSpec>,
    highlight_specs: Vec<HighlightSpec>,
}

impl PluginRegistry {
    pub fn new(
        plugins: impl IntoIterator<Item = Box<dyn PlatePlugin>>,
    ) -> Result<Self, RegistryError> {
        let mut registry = Self::default();
        for plugin in plugins {
            registry.register_plugin(plugin)?;
        }
        Ok(registry)
    }

    pub fn core_plugins() -> Vec<Box<dyn PlatePlugin>> {
        vec![
            Box::new(CoreParagraphPlugin),
            Box::new(CoreNormalizePlugin),
            Box::new(CoreCommandsPlugin),
        ]
    }

    pub fn core() -> Self {
        Self::new(Self::core_plugins()).expect("core registry must be valid")
    }

    pub fn with_plugins(
        extra: impl IntoIterator<Item = Box<dyn PlatePlugin>>,
    ) -> Result<Self, RegistryError> {
        Self::new(Self::core_plugins().into_iter().chain(extra))
    }

    pub fn register_plugin(&mut self, plugin: Box<dyn PlatePlugin>) -> Result<(), RegistryError> {
        tracing::trace!(plugin = plugin.id(), "registering plugin");

        for spec in plugin.node_specs() {
            if self.node_specs.contains_key(&spec.kind) {
                return Err(RegistryError::DuplicateNodeKind(spec.kind));
            }
            self.node_specs.insert(spec.kind.clone(), spec);
        }

        self.transaction_transforms
            .extend(plugin.transaction_transforms());

        self.normalize_passes.extend(plugin.normalize_passes());

        for cmd in plugin.commands() {
            if self.commands.contains_key(&cmd.id) {
                return Err(RegistryError::DuplicateCommand(cmd.id));
            }
            self.commands.insert(cmd.id.clone(), cmd);
        }

        for query in plugin.queries() {
            if self.queries.contains_key(&query.id) {
                return Err(RegistryError::DuplicateQuery(query.id));
            }
            self.queries.insert(query.id.clone(), query);
        }

        self.keymap.extend(plugin.key_bindings());
        self.markdown_specs.extend(plugin.markdown_specs());
        self.dom_specs.extend(plugin.dom_specs());
        self.highlight_specs.extend(plugin.highlight_specs());

        Ok(())
    }

    pub fn node_specs(&self) -> &HashMap<String, NodeSpec> {
        &self.node_specs
    }

    pub fn node_spec(&self, kind: &str) -> Option<&NodeSpec> {
        self.node_specs.get(kind)
    }

    pub fn transaction_transforms(&self) -> &[Box<dyn TransactionTransform>] {
        &self.transaction_transforms
    }

    pub fn normalize_passes(&self) -> &[Box<dyn NormalizePass>] {
        &self.normalize_passes
    }

    pub fn commands(&self) -> &HashMap<String, CommandSpec> {
        &self.commands
    }

    pub fn command(&self, id: &str) -> Option<CommandSpec> {
        self.commands.get(id).cloned()
    }

    pub fn queries(&self) -> &HashMap<String, QuerySpec> {
        &self.queries
    }

    pub fn query(&self, id: &str) -> Option<QuerySpec> {
        self.queries.get(id).cloned()
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    pub fn markdown_specs(&self) -> &[MarkdownSpec] {
        &self.markdown_specs
    }

    pub fn markdown_spec_for_token(&self, token: &MarkdownToken) -> Option<&MarkdownSpec> {
        self.markdown_specs
            .iter()
            .find(|spec| spec.tokens.contains(&token.name()))
    }

    pub fn markdown_spec_for_kind(&self, kind: &str) -> Option<&MarkdownSpec> {
        self.markdown_specs.iter().find(|spec| spec.kind == kind)
    }

    pub fn dom_specs(&self) -> &[DomSpec] {
        &self.dom_specs
    }

    pub fn dom_spec_for_kind(&self, kind: &str) -> Option<&DomSpec> {
        self.dom_specs.iter().find(|spec| spec.kind == kind)
    }

    pub fn highlight_specs(&self) -> &[HighlightSpec] {
        &self.highlight_specs
    }

    pub fn create_element(&self, kind: &str, mut attrs: Attrs, children: Vec<Node>) -> ElementNode {
        if let Some(spec) = self.node_specs.get(kind) {
            for (key, value) in &spec.default_attrs {
                attrs.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
        ElementNode {
            kind: kind.to_string(),
            attrs,
            children,
        }
    }

    pub fn normalize(&self, doc: &Document) -> Vec<Op> {
        let mut ops: Vec<Op> = Vec::new();
        for pass in &self.normalize_passes {
            ops.extend(pass.run(doc, self));
            // Passes see the document as it was before this round; stop at the first pass
            // that had work so later passes never act on stale paths.
            if !ops.is_empty() {
                break;
            }
        }
        ops
    }

    pub fn normalize_selection(&self, doc: &Document, selection: &Selection) -> Selection {
        let fallback = first_text_point(doc).unwrap_or(Point {
            path: vec![0],
            offset: 0,
        });

        let anchor =
            normalize_point_to_existing_text(doc, &selection.anchor).unwrap_or_else(|| {
                normalize_point_to_existing_text(doc, &selection.focus)
                    .unwrap_or_else(|| fallback.clone())
            });
        let focus = normalize_point_to_existing_text(doc, &selection.focus)
            .unwrap_or_else(|| anchor.clone());

        Selection { anchor, focus }
    }
}

fn first_text_descendant(children: &[Node], path: &mut Vec<usize>) -> Option<Point> {
    for (ix, node) in children.iter().enumerate() {
        path.push(ix);
        let found = match node {
            Node::Text(_) => Some(Point::new(path.clone(), 0)),
            Node::Element(el) => first_text_descendant(&el.children, path),
        };
        path.pop();
        if found.is_some() {
            return found;
        }
    }
    None
}

fn first_text_point(doc: &Document) -> Option<Point> {
    first_text_descendant(&doc.children, &mut Vec::new())
}

fn normalize_point_to_existing_text(doc: &Document, point: &Point) -> Option<Point> {
    if point.path.is_empty() || doc.children.is_empty() {
        return None;
    }

    let mut resolved_path: Vec<usize> = Vec::new();
    let mut children: &[Node] = &doc.children;

    for &wanted in &point.path {
        if children.is_empty() {
            break;
        }
        let ix = wanted.min(children.len() - 1);
        resolved_path.push(ix);
        match &children[ix] {
            Node::Text(t) => {
                return Some(Point {
                    path: resolved_path,
                    offset: clamp_to_char_boundary(&t.text, point.offset),
                });
            }
            Node::Element(el) => {
                children = &el.children;
            }
        }
    }

    match doc.node(&resolved_path)? {
        Node::Text(t) => Some(Point {
            path: resolved_path,
            offset: clamp_to_char_boundary(&t.text, point.offset),
        }),
        Node::Element(el) => first_text_descendant(&el.children, &mut resolved_path),
    }
}

struct CoreParagraphPlugin;

impl PlatePlugin for CoreParagraphPlugin {
    fn id(&self) -> &'static str {
        "core.paragraph"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::text_block("paragraph")]
    }

    fn markdown_specs(&self) -> Vec<MarkdownSpec> {
        vec![MarkdownSpec::new(
            "paragraph",
            "paragraph",
            |_token| Attrs::default(),
            |w: &mut MarkdownWriter, node: &ElementNode| {
                w.text(&node.text_content(), true);
                w.close_block();
            },
        )]
    }

    fn dom_specs(&self) -> Vec<DomSpec> {
        vec![
            DomSpec::new("paragraph", |_node| DomElement::new("p").hole())
                .parse_rule(ParseRule::tag("p")),
        ]
    }
}

struct CoreNormalizePlugin;

impl PlatePlugin for CoreNormalizePlugin {
    fn id(&self) -> &'static str {
        "core.normalize"
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![
            Box::new(EnsureNonEmptyDocument),
            Box::new(EnsureTextBlockHasTextLeaf),
            Box::new(StripDisallowedMarks),
            Box::new(MergeAdjacentTextLeaves),
        ]
    }
}

struct EnsureNonEmptyDocument;

impl NormalizePass for EnsureNonEmptyDocument {
    fn id(&self) -> &'static str {
        "core.ensure_non_empty_document"
    }

    fn run(&self, doc: &Document, _registry: &PluginRegistry) -> Vec<Op> {
        if doc.children.is_empty() {
            return vec![Op::InsertNode {
                path: vec![0],
                node: Node::paragraph(""),
            }];
        }
        Vec::new()
    }
}

struct EnsureTextBlockHasTextLeaf;

impl NormalizePass for EnsureTextBlockHasTextLeaf {
    fn id(&self) -> &'static str {
        "core.ensure_text_block_has_text_leaf"
    }

    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op> {
        text_blocks_in_order(doc, registry)
            .into_iter()
            .filter(|block| !block.el.children.iter().any(|n| matches!(n, Node::Text(_))))
            .map(|block| {
                let mut path = block.path;
                path.push(0);
                Op::InsertNode {
                    path,
                    node: Node::text(""),
                }
            })
            .collect()
    }
}

struct StripDisallowedMarks;

impl NormalizePass for StripDisallowedMarks {
    fn id(&self) -> &'static str {
        "core.strip_disallowed_marks"
    }

    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op> {
        let mut ops = Vec::new();
        for block in text_blocks_in_order(doc, registry) {
            let marks_allowed = registry
                .node_spec(&block.el.kind)
                .is_none_or(|spec| spec.marks);
            if marks_allowed {
                continue;
            }
            for (ix, child) in block.el.children.iter().enumerate() {
                let Node::Text(t) = child else {
                    continue;
                };
                if !t.marks.is_empty() {
                    let mut path = block.path.clone();
                    path.push(ix);
                    ops.push(Op::SetTextMarks {
                        path,
                        marks: Marks::default(),
                    });
                }
            }
        }
        ops
    }
}

struct MergeAdjacentTextLeaves;

impl NormalizePass for MergeAdjacentTextLeaves {
    fn id(&self) -> &'static str {
        "core.merge_adjacent_text_leaves"
    }

    fn run(&self, doc: &Document, registry: &PluginRegistry) -> Vec<Op> {
        let mut ops = Vec::new();

        for block in text_blocks_in_order(doc, registry) {
            let children = &block.el.children;
            let mut ix = children.len();
            while ix > 0 {
                ix -= 1;
                let Node::Text(right) = &children[ix] else {
                    continue;
                };

                let mut start = ix;
                while let Some(Node::Text(left)) = start.checked_sub(1).and_then(|i| children.get(i))
                {
                    if left.marks != right.marks {
                        break;
                    }
                    start -= 1;
                }
                if start == ix {
                    continue;
                }

                let Node::Text(first) = &children[start] else {
                    continue;
                };
                let appended: String = children[start + 1..=ix]
                    .iter()
                    .filter_map(|n| match n {
                        Node::Text(t) => Some(t.text.as_str()),
                        Node::Element(_) => None,
                    })
                    .collect();

                if !appended.is_empty() {
                    let mut path = block.path.clone();
                    path.push(start);
                    ops.push(Op::InsertText {
                        path,
                        offset: first.text.len(),
                        text: appended,
                    });
                }
                for remove_ix in (start + 1..=ix).rev() {
                    let mut path = block.path.clone();
                    path.push(remove_ix);
                    ops.push(Op::RemoveNode { path });
                }

                ix = start;
            }
        }

        ops
    }
}

struct CoreCommandsPlugin;

impl PlatePlugin for CoreCommandsPlugin {
    fn id(&self) -> &'static str {
        "core.commands"
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("core.insert_text", "Insert text", |editor, args| {
                let text = args
                    .as_ref()
                    .and_then(|v| v.get("text"))
                    .and_then(|v| v.as_str())
                    .ok_or_else(|| CommandError::new("Missing args.text"))?
                    .to_string();
                let focus = editor.selection().focus.clone();
                let tx = Transaction::new(vec![Op::InsertText {
                    path: focus.path,
                    offset: focus.offset,
                    text,
                }])
                .source("command:core.insert_text");
                editor
                    .apply(tx)
                    .map_err(|e| CommandError::new(format!("Failed to insert text: {e}")))
            })
            .description("Insert text at the caret."),
            CommandSpec::new("core.insert_break", "Insert break", |editor, _args| {
                let tx = insert_break(editor).map_err(CommandError::new)?;
                editor
                    .apply(tx)
                    .map_err(|e| CommandError::new(format!("Failed to insert break: {e}")))
            })
            .description("Split the active block at the caret, or insert a newline in code.")
            .keywords(["enter", "newline", "split"]),
        ]
    }
}

pub const INSERT_BREAK_SOURCE: &str = "command:core.insert_break";

fn insert_break(editor: &Editor) -> Result<Transaction, String> {
    let focus = editor.selection().focus.clone();
    let (&child_ix, block_path) = focus
        .path
        .split_last()
        .ok_or_else(|| "No active block".to_string())?;
    let Some(el) = editor.doc().element(block_path) else {
        return Err("No active block".into());
    };

    let is_code = editor
        .registry()
        .node_spec(&el.kind)
        .is_some_and(|spec| spec.code);
    if is_code {
        return Ok(Transaction::new(vec![Op::InsertText {
            path: focus.path.clone(),
            offset: focus.offset,
            text: "\n".to_string(),
        }])
        .source(INSERT_BREAK_SOURCE));
    }

    let Some(Node::Text(split_text)) = el.children.get(child_ix) else {
        return Err("Caret is not in text".into());
    };
    let split_at = clamp_to_char_boundary(&split_text.text, focus.offset);

    let mut ops = Vec::new();
    let mut tail: Vec<Node> = vec![Node::Text(TextNode {
        text: split_text.text[split_at..].to_string(),
        marks: split_text.marks.clone(),
    })];
    tail.extend(el.children.iter().skip(child_ix + 1).cloned());

    for remove_ix in (child_ix + 1..el.children.len()).rev() {
        let mut path = block_path.to_vec();
        path.push(remove_ix);
        ops.push(Op::RemoveNode { path });
    }
    if split_at < split_text.text.len() {
        ops.push(Op::RemoveText {
            path: focus.path.clone(),
            range: split_at..split_text.text.len(),
        });
    }

    let (&block_ix, parent_path) = block_path
        .split_last()
        .ok_or_else(|| "No active block".to_string())?;
    let mut next_path = parent_path.to_vec();
    next_path.push(block_ix + 1);
    ops.push(Op::InsertNode {
        path: next_path.clone(),
        node: Node::Element(ElementNode {
            kind: el.kind.clone(),
            attrs: el.attrs.clone(),
            children: tail,
        }),
    });

    let mut caret_path = next_path;
    caret_path.push(0);
    Ok(Transaction::new(ops)
        .selection_after(Selection::collapsed(Point::new(caret_path, 0)))
        .source(INSERT_BREAK_SOURCE))
}

pub fn set_block_type(editor: &Editor, kind: &str, attrs: Attrs) -> Result<Transaction, String> {
    let registry = editor.registry();
    let Some(spec) = registry.node_spec(kind) else {
        return Err(format!("Unknown node kind: {kind}"));
    };

    let (start, end) = editor.selection().ordered();
    let (Some(start_block), Some(end_block)) = (start.block_path(), end.block_path()) else {
        return Ok(Transaction::default());
    };

    let blocks = text_blocks_in_order(editor.doc(), registry);
    let Some(first) = blocks.iter().position(|b| b.path == start_block) else {
        return Ok(Transaction::default());
    };
    let last = blocks
        .iter()
        .position(|b| b.path == end_block)
        .unwrap_or(first)
        .max(first);

    let target = registry.create_element(kind, attrs, Vec::new());
    let mut ops = Vec::new();
    for block in &blocks[first..=last] {
        if block.el.kind == target.kind && block.el.attrs == target.attrs {
            continue;
        }
        let children = block
            .el
            .children
            .iter()
            .cloned()
            .map(|child| match child {
                Node::Text(t) if !spec.marks => Node::Text(TextNode {
                    text: t.text,
                    marks: Marks::default(),
                }),
                other => other,
            })
            .collect();
        ops.extend(Op::replace_node(
            &block.path,
            Node::Element(ElementNode {
                children,
                ..target.clone()
            }),
        ));
    }

    if ops.is_empty() {
        return Ok(Transaction::default());
    }

    Ok(Transaction::new(ops)
        .selection_after(editor.selection().clone())
        .source(format!("command:set_block_type:{kind}")))
}

pub fn point_global_offset(children: &[Node], child_ix: usize, offset: usize) -> usize {
    children
        .iter()
        .take(child_ix + 1)
        .enumerate()
        .map(|(ix, node)| match node {
            Node::Text(t) if ix < child_ix => t.text.len(),
            Node::Text(t) => clamp_to_char_boundary(&t.text, offset),
            Node::Element(_) => 0,
        })
        .sum()
}

pub struct TextBlock<'a> {
    pub path: Path,
    pub el: &'a ElementNode,
}

pub fn element_is_text_block(el: &ElementNode, registry: &PluginRegistry) -> bool {
    registry.node_specs.contains_key(&el.kind)
        || el.children.iter().any(|n| matches!(n, Node::Text(_)))
}

pub fn text_blocks_in_order<'a>(doc: &'a Document, registry: &PluginRegistry) -> Vec<TextBlock<'a>> {
    fn walk<'a>(
        nodes: &'a [Node],
        path: &mut Vec<usize>,
        registry: &PluginRegistry,
        out: &mut Vec<TextBlock<'a>>,
    ) {
        for (ix, node) in nodes.iter().enumerate() {
            let Node::Element(el) = node else {
                continue;
            };

            path.push(ix);

            if element_is_text_block(el, registry) {
                out.push(TextBlock {
                    path: path.clone(),
                    el,
                });
            } else {
                walk(&el.children, path, registry, out);
            }

            path.pop();
        }
    }

    let mut out = Vec::new();
    walk(&doc.children, &mut Vec::new(), registry, &mut out);
    out
}
