//! Event handlers behind the code block's embedded controls.
//!
//! Neither handler keeps a reference to the node it was rendered for. Both hit-test the
//! control's current bounding rect and resolve the enclosing code block from the document
//! as it is when the event fires.

use plate_core::dom::DomEvent;
use plate_core::{AttrPatch, Document, EditorView, ElementNode, Path, Rect, Transaction};

use crate::attrs::LANGUAGE_ATTR;
use crate::{CodeBlockPlugin, KIND};

pub const LANGUAGE_CHANGE_SOURCE: &str = "dom:code_block.language_change";

/// System clipboard.
pub trait Clipboard: Send + Sync {
    fn write_text(&self, text: &str);
}

/// Transient user notifications.
pub trait Notifier: Send + Sync {
    fn show_toast(&self, message: &str);
}

/// The code block under `rect`, as of now.
pub fn resolve_code_block(view: &EditorView, rect: Rect) -> Option<(Path, &ElementNode)> {
    let pos = view.pos_at_coords(rect.origin())?;
    let path = pos.inside.unwrap_or(pos.point.path);
    view.doc().ancestor_of_kind(&path, KIND)
}

/// Copies the whole text of the block the button belongs to, ignoring any text selection.
pub fn handle_copy(view: &mut EditorView, event: &DomEvent, plugin: &CodeBlockPlugin) {
    let Some((path, node)) = resolve_code_block(view, event.target.rect) else {
        tracing::debug!(rect = ?event.target.rect, "copy: no code block at control position");
        return;
    };

    let text = node.text_content();
    tracing::debug!(?path, bytes = text.len(), "copying code block");
    plugin.clipboard().write_text(&text);

    if let Some(notifier) = plugin.notifier() {
        notifier.show_toast(&plugin.options().dictionary.code_copied);
    }
}

/// Rewrites the `language` of the block the selector belongs to with the selector's value.
pub fn handle_language_change(view: &mut EditorView, event: &DomEvent) {
    let Some((path, _)) = resolve_code_block(view, event.target.rect) else {
        tracing::debug!(
            rect = ?event.target.rect,
            "language change: no code block at control position"
        );
        return;
    };

    let tx = language_change_transaction(path, &event.target.value);
    if let Err(err) = view.dispatch(tx) {
        tracing::warn!(error = %err, "language change could not be applied");
    }
}

/// A transaction touching nothing but `language` on the node at `path`.
pub fn language_change_transaction(path: Path, language: &str) -> Transaction {
    Transaction::set_node_attrs(path, AttrPatch::set(LANGUAGE_ATTR, language))
        .source(LANGUAGE_CHANGE_SOURCE)
}

/// Language of the code block at `path`, if there is one.
pub fn language_at(doc: &Document, path: &[usize]) -> Option<String> {
    doc.element(path)
        .filter(|el| el.kind == KIND)
        .map(|el| el.attr_str(LANGUAGE_ATTR).unwrap_or_default().to_string())
}
