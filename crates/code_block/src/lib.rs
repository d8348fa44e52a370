//! Fenced code blocks: a text block holding raw code in a single language, rendered with a
//! language selector and a copy button.

mod attrs;
mod bindings;
mod dom;
mod handlers;
mod highlight;
mod language;
mod markdown;
mod options;

use std::sync::Arc;

use plate_core::dom::DomSpec;
use plate_core::highlight::HighlightSpec;
use plate_core::markdown::MarkdownSpec;
use plate_core::{
    CommandSpec, KeyBinding, NodeSpec, PlatePlugin, QuerySpec, TransactionTransform,
};

pub use crate::attrs::{CodeBlockAttrs, DEFAULT_LANGUAGE, LANGUAGE_ATTR};
pub use crate::bindings::{
    FENCE_MARKER, IS_ACTIVE_QUERY, LANGUAGE_QUERY, SET_COMMAND, SET_LANGUAGE_COMMAND, SHORTCUT,
};
pub use crate::dom::{CONTAINER_CLASS, LANGUAGE_DATA_ATTR, attrs_from_dom, to_dom};
pub use crate::handlers::{
    Clipboard, LANGUAGE_CHANGE_SOURCE, Notifier, handle_copy, handle_language_change,
    language_at, language_change_transaction, resolve_code_block,
};
pub use crate::highlight::highlight_spec;
pub use crate::language::{LanguageRegistry, NONE_KEY};
pub use crate::markdown::{attrs_from_token, serialize as serialize_markdown};
pub use crate::options::{CodeBlockOptions, Dictionary};

pub const KIND: &str = "code_block";

#[derive(Clone)]
pub struct CodeBlockPlugin {
    options: Arc<CodeBlockOptions>,
    languages: Arc<LanguageRegistry>,
    clipboard: Arc<dyn Clipboard>,
    notifier: Option<Arc<dyn Notifier>>,
}

impl CodeBlockPlugin {
    pub fn new(options: CodeBlockOptions, clipboard: Arc<dyn Clipboard>) -> Self {
        Self {
            options: Arc::new(options),
            languages: Arc::new(LanguageRegistry::default()),
            clipboard,
            notifier: None,
        }
    }

    pub fn with_languages(mut self, languages: LanguageRegistry) -> Self {
        self.languages = Arc::new(languages);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn options(&self) -> &CodeBlockOptions {
        &self.options
    }

    pub fn languages(&self) -> &LanguageRegistry {
        &self.languages
    }

    pub fn clipboard(&self) -> &dyn Clipboard {
        self.clipboard.as_ref()
    }

    /// Without a notifier a copy succeeds silently.
    pub fn notifier(&self) -> Option<&dyn Notifier> {
        self.notifier.as_deref()
    }
}

impl PlatePlugin for CodeBlockPlugin {
    fn id(&self) -> &'static str {
        "code_block"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![
            NodeSpec::text_block(KIND)
                .default_attr(LANGUAGE_ATTR, DEFAULT_LANGUAGE)
                .marks(false)
                .code(true),
        ]
    }

    fn transaction_transforms(&self) -> Vec<Box<dyn TransactionTransform>> {
        bindings::input_rules()
    }

    fn commands(&self) -> Vec<CommandSpec> {
        bindings::commands()
    }

    fn queries(&self) -> Vec<QuerySpec> {
        bindings::queries()
    }

    fn key_bindings(&self) -> Vec<KeyBinding> {
        bindings::key_bindings()
    }

    fn markdown_specs(&self) -> Vec<MarkdownSpec> {
        vec![markdown::markdown_spec()]
    }

    fn dom_specs(&self) -> Vec<DomSpec> {
        vec![dom::dom_spec(self)]
    }

    fn highlight_specs(&self) -> Vec<HighlightSpec> {
        vec![highlight::highlight_spec(&self.options)]
    }
}
