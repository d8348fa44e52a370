use plate_core::highlight::HighlightSpec;

use crate::KIND;
use crate::attrs::LANGUAGE_ATTR;
use crate::options::CodeBlockOptions;

/// Read-only editors highlight on first render; editable ones wait for the first paint.
pub fn highlight_spec(options: &CodeBlockOptions) -> HighlightSpec {
    HighlightSpec::new(KIND, LANGUAGE_ATTR).deferred(!options.initial_read_only)
}
