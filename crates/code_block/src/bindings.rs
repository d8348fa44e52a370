use plate_core::{
    Attrs, CommandError, CommandSpec, Editor, KeyBinding, Path, QuerySpec, TextblockTypeOnBreak,
    TransactionTransform, set_block_type,
};
use serde_json::Value;

use crate::KIND;
use crate::handlers::{language_at, language_change_transaction};

pub const SET_COMMAND: &str = "code_block.set";
pub const SET_LANGUAGE_COMMAND: &str = "code_block.set_language";
pub const IS_ACTIVE_QUERY: &str = "code_block.is_active";
pub const LANGUAGE_QUERY: &str = "code_block.language";
pub const SHORTCUT: &str = "ctrl-shift-\\";
pub const FENCE_MARKER: &str = "```";

pub fn commands() -> Vec<CommandSpec> {
    vec![
        CommandSpec::new(SET_COMMAND, "Code block", |editor, _args| {
            let tx = set_block_type(editor, KIND, Attrs::new()).map_err(CommandError::new)?;
            if tx.is_empty() {
                return Ok(());
            }
            editor
                .apply(tx)
                .map_err(|e| CommandError::new(format!("Failed to set code block: {e}")))
        })
        .description("Turn the selected blocks into code blocks.")
        .keywords(["code block", "code", "fence", "pre"]),
        CommandSpec::new(SET_LANGUAGE_COMMAND, "Set code language", |editor, args| {
            let language = args
                .as_ref()
                .and_then(|v| v.get("language"))
                .and_then(Value::as_str)
                .ok_or_else(|| CommandError::new("Missing args.language"))?
                .to_string();
            let path: Path = match args.as_ref().and_then(|v| v.get("path")) {
                Some(path) => serde_json::from_value(path.clone())
                    .map_err(|e| CommandError::new(format!("Invalid args.path: {e}")))?,
                None => active_code_block(editor)
                    .ok_or_else(|| CommandError::new("No active code block"))?,
            };
            if language_at(editor.doc(), &path).is_none() {
                return Err(CommandError::new("Target is not a code block"));
            }
            editor
                .apply(language_change_transaction(path, &language))
                .map_err(|e| CommandError::new(format!("Failed to set language: {e}")))
        })
        .description("Change the language of the active code block.")
        .keywords(["language", "syntax", "highlight"]),
    ]
}

pub fn queries() -> Vec<QuerySpec> {
    vec![
        QuerySpec::new(IS_ACTIVE_QUERY, |editor, _args| {
            Ok(Value::Bool(active_code_block(editor).is_some()))
        }),
        QuerySpec::new(LANGUAGE_QUERY, |editor, _args| {
            Ok(active_code_block(editor)
                .and_then(|path| language_at(editor.doc(), &path))
                .map_or(Value::Null, Value::String))
        }),
    ]
}

pub fn key_bindings() -> Vec<KeyBinding> {
    vec![KeyBinding::new(SHORTCUT, SET_COMMAND)]
}

/// Typing the fence marker on an empty line and pressing enter starts a code block.
pub fn input_rules() -> Vec<Box<dyn TransactionTransform>> {
    vec![Box::new(TextblockTypeOnBreak::new(
        "code_block.fence_on_break",
        FENCE_MARKER,
        KIND,
    ))]
}

fn active_code_block(editor: &Editor) -> Option<Path> {
    let focus = &editor.selection().focus;
    editor
        .doc()
        .ancestor_of_kind(&focus.path, KIND)
        .map(|(path, _)| path)
}
