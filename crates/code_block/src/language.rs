/// Key that stands for "no highlighting"; its option value is the empty string.
pub const NONE_KEY: &str = "none";

/// Ordered mapping from language identifier to display label.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageRegistry {
    entries: Vec<(String, String)>,
}

impl Default for LanguageRegistry {
    fn default() -> Self {
        Self::new([
            (NONE_KEY, "None"),
            ("bash", "Bash"),
            ("css", "CSS"),
            ("clike", "C"),
            ("csharp", "C#"),
            ("go", "Go"),
            ("markup", "HTML"),
            ("objectivec", "Objective-C"),
            ("java", "Java"),
            ("javascript", "JavaScript"),
            ("json", "JSON"),
            ("php", "PHP"),
            ("powershell", "Powershell"),
            ("python", "Python"),
            ("ruby", "Ruby"),
            ("typescript", "TypeScript"),
            ("yaml", "YAML"),
        ])
    }
}

impl LanguageRegistry {
    pub fn new<I, K, L>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, L)>,
        K: Into<String>,
        L: Into<String>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|(key, label)| (key.into(), label.into()))
                .collect(),
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(key, label)| (key.as_str(), label.as_str()))
    }

    /// `(attribute value, label)` pairs for a selector, with [`NONE_KEY`] mapped to `""`.
    pub fn options(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries()
            .map(|(key, label)| (if key == NONE_KEY { "" } else { key }, label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_maps_to_empty_value() {
        let registry = LanguageRegistry::default();
        assert_eq!(registry.options().next(), Some(("", "None")));
        assert!(registry.options().all(|(value, _)| value != NONE_KEY));
        assert_eq!(registry.entries().last(), Some(("yaml", "YAML")));
    }
}
