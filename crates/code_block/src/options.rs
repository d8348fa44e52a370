use serde::{Deserialize, Serialize};

/// User-facing strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dictionary {
    pub copy: String,
    pub code_copied: String,
}

impl Default for Dictionary {
    fn default() -> Self {
        Self {
            copy: "Copy".to_string(),
            code_copied: "Copied to clipboard".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CodeBlockOptions {
    /// The editor was created read-only. Highlighting is eager in that case and deferred
    /// past the first paint otherwise.
    pub initial_read_only: bool,
    pub dictionary: Dictionary,
}

impl CodeBlockOptions {
    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}
