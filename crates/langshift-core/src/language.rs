//! Language tags and their file-extension / fence-tag tables.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Extension used when a target language has no entry in the table.
pub const FALLBACK_EXTENSION: &str = "txt";

/// (canonical name, file extension, extra fence tags)
const KNOWN_LANGUAGES: &[(&str, &str, &[&str])] = &[
    ("kotlin", "kt", &["kt", "kts"]),
    ("python", "py", &["py", "python3"]),
    ("swift", "swift", &[]),
    ("typescript", "ts", &["ts", "tsx"]),
    ("javascript", "js", &["js", "jsx"]),
    ("java", "java", &[]),
    ("rust", "rs", &["rs"]),
    ("go", "go", &["golang"]),
    ("csharp", "cs", &["cs", "c#"]),
    ("cpp", "cpp", &["c++", "cxx"]),
    ("c", "c", &[]),
    ("scala", "scala", &[]),
    ("dart", "dart", &[]),
    ("ruby", "rb", &["rb"]),
];

/// A programming language identified by a case-insensitive tag.
///
/// The tag doubles as the code-fence label the extractor looks for, so it is
/// normalized to lowercase on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Language(String);

impl Language {
    pub fn new(tag: impl AsRef<str>) -> Self {
        Self(tag.as_ref().trim().to_lowercase())
    }

    /// The normalized tag, e.g. `kotlin`.
    pub fn tag(&self) -> &str {
        &self.0
    }

    /// File extension for migrated artifacts, `txt` when unknown.
    pub fn extension(&self) -> &str {
        KNOWN_LANGUAGES
            .iter()
            .find(|(name, _, _)| *name == self.0)
            .map(|(_, ext, _)| *ext)
            .unwrap_or(FALLBACK_EXTENSION)
    }

    /// Every fence label that counts as this language (tag first).
    pub fn fence_tags(&self) -> Vec<&str> {
        let mut tags = vec![self.0.as_str()];
        if let Some((_, _, aliases)) = KNOWN_LANGUAGES.iter().find(|(name, _, _)| *name == self.0) {
            tags.extend(aliases.iter().copied());
        }
        tags
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Language {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<&str> for Language {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<Language> for String {
    fn from(value: Language) -> Self {
        value.0
    }
}
