use plate_core::markdown::{MarkdownSpec, MarkdownToken, MarkdownWriter};
use plate_core::{Attrs, ElementNode};

use crate::KIND;
use crate::attrs::{CodeBlockAttrs, LANGUAGE_ATTR};

const MIN_FENCE: usize = 3;

/// Fenced blocks build code blocks from their info string; indented blocks take the default
/// language.
pub fn markdown_spec() -> MarkdownSpec {
    MarkdownSpec::new(KIND, "fence", attrs_from_token, serialize).token("code_block")
}

/// An empty or missing info string leaves `language` unset so the node default applies.
pub fn attrs_from_token(token: &MarkdownToken) -> Attrs {
    match token.info() {
        Some(info) if !info.is_empty() => CodeBlockAttrs::new(info).to_attrs(),
        _ => Attrs::new(),
    }
}

pub fn serialize(w: &mut MarkdownWriter, node: &ElementNode) {
    let language = node.attr_str(LANGUAGE_ATTR).unwrap_or_default();
    let text = node.text_content();
    // A backtick fence's info string may not itself contain a backtick.
    let marker = if language.contains('`') { '~' } else { '`' };
    let fence = fence_for(&text, marker);

    w.write(&format!("{fence}{language}\n"));
    w.text(&text, false);
    if !text.is_empty() {
        w.write("\n");
    }
    w.write(&fence);
    w.close_block();
}

/// Three `marker`s, or one more than the longest run of `marker` opening a line of `text`.
fn fence_for(text: &str, marker: char) -> String {
    let longest = text
        .lines()
        .map(|line| {
            let indent = line.len() - line.trim_start_matches(' ').len();
            if indent > 3 {
                return 0;
            }
            line[indent..].chars().take_while(|ch| *ch == marker).count()
        })
        .filter(|run| *run >= MIN_FENCE)
        .max()
        .map_or(MIN_FENCE, |run| run + 1);
    marker.to_string().repeat(longest)
}
