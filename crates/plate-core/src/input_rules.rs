use crate::core::{Attrs, Editor, Node, Point, Selection};
use crate::ops::{Op, Transaction};
use crate::plugin::{INSERT_BREAK_SOURCE, TransactionTransform, point_global_offset};

pub struct TextblockTypeOnBreak {
    id: &'static str,
    marker: String,
    kind: String,
    attrs: Attrs,
}

impl TextblockTypeOnBreak {
    pub fn new(id: &'static str, marker: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            id,
            marker: marker.into(),
            kind: kind.into(),
            attrs: Attrs::default(),
        }
    }

    pub fn attrs(mut self, attrs: Attrs) -> Self {
        self.attrs = attrs;
        self
    }
}

impl TransactionTransform for TextblockTypeOnBreak {
    fn id(&self) -> &'static str {
        self.id
    }

    fn transform(&self, editor: &Editor, tx: &Transaction) -> Option<Transaction> {
        if tx.meta.source.as_deref() != Some(INSERT_BREAK_SOURCE) {
            return None;
        }

        let selection = editor.selection();
        if !selection.is_collapsed() {
            return None;
        }
        let focus = &selection.focus;
        let (&child_ix, block_path) = focus.path.split_last()?;
        let block = editor.doc().element(block_path)?;
        if block.kind != "paragraph" || block.text_content() != self.marker {
            return None;
        }
        if point_global_offset(&block.children, child_ix, focus.offset) != self.marker.len() {
            return None;
        }

        let node = editor
            .registry()
            .create_element(&self.kind, self.attrs.clone(), vec![Node::text("")]);
        let mut caret = block_path.to_vec();
        caret.push(0);

        tracing::debug!(rule = self.id, kind = %self.kind, "input rule matched");
        let mut out = Transaction::new(Op::replace_node(block_path, Node::Element(node)).to_vec())
            .selection_after(Selection::collapsed(Point::new(caret, 0)));
        out.meta.source = Some(format!("input_rule:{}", self.id));
        Some(out)
    }
}
