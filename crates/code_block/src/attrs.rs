use plate_core::{Attrs, ElementNode};
use serde_json::Value;

pub const LANGUAGE_ATTR: &str = "language";
pub const DEFAULT_LANGUAGE: &str = "yaml";

/// Persistent state of a code block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeBlockAttrs {
    /// Registry identifier, or `""` for no highlighting. Stored verbatim even when unknown.
    pub language: String,
}

impl Default for CodeBlockAttrs {
    fn default() -> Self {
        Self {
            language: DEFAULT_LANGUAGE.to_string(),
        }
    }
}

impl CodeBlockAttrs {
    pub fn new(language: impl Into<String>) -> Self {
        Self {
            language: language.into(),
        }
    }

    pub fn from_attrs(attrs: &Attrs) -> Self {
        match attrs.get(LANGUAGE_ATTR).and_then(Value::as_str) {
            Some(language) => Self::new(language),
            None => Self::default(),
        }
    }

    pub fn from_element(el: &ElementNode) -> Self {
        Self::from_attrs(&el.attrs)
    }

    pub fn to_attrs(&self) -> Attrs {
        let mut attrs = Attrs::new();
        attrs.insert(LANGUAGE_ATTR.to_string(), Value::String(self.language.clone()));
        attrs
    }
}
