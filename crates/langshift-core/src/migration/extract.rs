//! Pulls migrated code out of free-form model output.
//!
//! Strategies run in a fixed order and the first one that yields non-empty
//! code wins:
//!
//! 1. a closed fence labelled with the target language (```` ```kotlin ````),
//! 2. a labelled fence that is never closed (code runs to end of text),
//! 3. a line scan toggling "inside code" on every ```` ``` ```` line.
//!
//! Without a target language the label requirement is dropped. A fence
//! sequence inside a string literal of the migrated code is indistinguishable
//! from a real fence boundary; nested fences are not supported.

use crate::language::Language;
use crate::migration::model::{ExtractionResult, ExtractionStrategy};
use regex::Regex;

const BACKTICKS: &str = "```";
const QUOTES: &str = "'''";

/// Extracts code from `raw` for `target` (or any language when `None`).
///
/// Pure and deterministic: the same input always yields the same result.
pub fn extract(raw: &str, target: Option<&Language>) -> ExtractionResult {
    let matchers = FenceMatchers::new(target);

    if let Some(result) = matchers.labeled_block(raw) {
        return result;
    }
    if let Some(result) = matchers.unterminated_block(raw) {
        return result;
    }
    if let Some(result) = fence_scan(raw) {
        return result;
    }

    ExtractionResult::empty(raw.trim())
}

struct FenceMatchers {
    closed: Option<Regex>,
    open: Option<Regex>,
}

impl FenceMatchers {
    fn new(target: Option<&Language>) -> Self {
        let (closed, open) = match target {
            Some(language) => {
                let tags = language
                    .fence_tags()
                    .iter()
                    .map(|tag| regex::escape(tag))
                    .collect::<Vec<_>>()
                    .join("|");
                let label = format!(r"(?:{tags})(?:[ \t][^\n]*)?");
                (
                    format!(
                        r"(?is)```[ \t]*{label}\r?\n(?P<bt>.*?)\r?\n[ \t]*```|'''[ \t]*{label}\r?\n(?P<sq>.*?)\r?\n[ \t]*'''"
                    ),
                    format!(r"(?i)(?P<bt>```)[ \t]*{label}\r?\n|(?P<sq>''')[ \t]*{label}\r?\n"),
                )
            }
            // The ''' form is only recognised when labelled; unlabelled it
            // collides with Python docstrings.
            None => (
                r"(?s)```[^\n]*\r?\n(?P<bt>.*?)\r?\n[ \t]*```".to_string(),
                r"(?P<bt>```)[^\n]*\r?\n".to_string(),
            ),
        };

        Self {
            closed: compile_fence_pattern(&closed),
            open: compile_fence_pattern(&open),
        }
    }

    /// First labelled block with a non-empty interior; empty stubs are skipped.
    fn labeled_block(&self, raw: &str) -> Option<ExtractionResult> {
        self.closed.as_ref()?.captures_iter(raw).find_map(|captures| {
            let whole = captures.get(0)?;
            let code = captures
                .name("bt")
                .or_else(|| captures.name("sq"))?
                .as_str()
                .trim();
            if code.is_empty() {
                return None;
            }

            Some(ExtractionResult {
                code: code.to_string(),
                extra: join_prose(&raw[..whole.start()], &raw[whole.end()..]),
                strategy: Some(ExtractionStrategy::LabeledFence),
            })
        })
    }

    /// A labelled opening fence with no closing delimiter after it.
    fn unterminated_block(&self, raw: &str) -> Option<ExtractionResult> {
        self.open.as_ref()?.captures_iter(raw).find_map(|captures| {
            let whole = captures.get(0)?;
            let delimiter = if captures.name("sq").is_some() {
                QUOTES
            } else {
                BACKTICKS
            };

            let rest = &raw[whole.end()..];
            if rest.contains(delimiter) {
                return None;
            }
            let code = rest.trim();
            if code.is_empty() {
                return None;
            }

            Some(ExtractionResult {
                code: code.to_string(),
                extra: raw[..whole.start()].trim().to_string(),
                strategy: Some(ExtractionStrategy::UnterminatedLabeledFence),
            })
        })
    }
}

/// A pattern that fails to build disables its strategy instead of failing extraction.
fn compile_fence_pattern(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(regex) => Some(regex),
        Err(e) => {
            tracing::warn!(error = %e, "Fence pattern failed to compile, strategy disabled");
            None
        }
    }
}

fn fence_scan(raw: &str) -> Option<ExtractionResult> {
    let mut inside = false;
    let mut code = Vec::new();
    let mut extra = Vec::new();

    for line in raw.lines() {
        if line.trim_start().starts_with(BACKTICKS) {
            inside = !inside;
            continue;
        }
        if inside {
            code.push(line);
        } else {
            extra.push(line);
        }
    }

    let code = code.join("\n");
    let code = code.trim();
    if code.is_empty() {
        return None;
    }

    Some(ExtractionResult {
        code: code.to_string(),
        extra: extra.join("\n").trim().to_string(),
        strategy: Some(ExtractionStrategy::FenceScan),
    })
}

fn join_prose(before: &str, after: &str) -> String {
    let before = before.trim();
    let after = after.trim();
    match (before.is_empty(), after.is_empty()) {
        (true, true) => String::new(),
        (false, true) => before.to_string(),
        (true, false) => after.to_string(),
        (false, false) => format!("{before}\n\n{after}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kotlin() -> Language {
        Language::new("kotlin")
    }

    #[test]
    fn test_labeled_fence_without_prose() {
        let raw = "```kotlin\nclass Foo\n```";
        let result = extract(raw, Some(&kotlin()));

        assert_eq!(result.code, "class Foo");
        assert_eq!(result.extra, "");
        assert_eq!(result.strategy, Some(ExtractionStrategy::LabeledFence));
    }

    #[test]
    fn test_labeled_fence_interior_is_trimmed() {
        let raw = "```kotlin\n\n  fun main() {\n    println(1)\n  }\n\n```\n";
        let result = extract(raw, Some(&kotlin()));
        assert_eq!(result.code, "fun main() {\n    println(1)\n  }");
        assert_eq!(result.extra, "");
    }

    #[test]
    fn test_labeled_fence_with_surrounding_prose() {
        let raw = "Here is the Kotlin version:\n```kotlin\nclass Foo\n```\nLet me know if you need more.";
        let result = extract(raw, Some(&kotlin()));

        assert_eq!(result.code, "class Foo");
        assert_eq!(
            result.extra,
            "Here is the Kotlin version:\n\nLet me know if you need more."
        );
    }

    #[test]
    fn test_tag_is_case_insensitive_and_aliases_match() {
        let upper = extract("```KOTLIN\nclass Foo\n```", Some(&kotlin()));
        assert_eq!(upper.code, "class Foo");

        let alias = extract("```kt\nclass Bar\n```", Some(&kotlin()));
        assert_eq!(alias.code, "class Bar");
        assert_eq!(alias.strategy, Some(ExtractionStrategy::LabeledFence));
    }

    #[test]
    fn test_tag_prefix_does_not_match() {
        let raw = "```kotlinx\nnot it\n```";
        let result = extract(raw, Some(&kotlin()));
        // Falls through to the fence scan rather than the labelled match.
        assert_eq!(result.strategy, Some(ExtractionStrategy::FenceScan));
    }

    #[test]
    fn test_prefers_target_block_over_earlier_block() {
        let raw = "Original:\n```java\npublic class Foo {}\n```\nMigrated:\n```kotlin\nclass Foo\n```";
        let result = extract(raw, Some(&kotlin()));

        assert_eq!(result.code, "class Foo");
        assert!(result.extra.contains("public class Foo {}"));
    }

    #[test]
    fn test_unterminated_labeled_block() {
        let raw = "Sure.\n```kotlin\nclass Foo {\n    val x = 1\n}\n";
        let result = extract(raw, Some(&kotlin()));

        assert_eq!(result.code, "class Foo {\n    val x = 1\n}");
        assert_eq!(result.extra, "Sure.");
        assert_eq!(
            result.strategy,
            Some(ExtractionStrategy::UnterminatedLabeledFence)
        );
    }

    #[test]
    fn test_unterminated_single_quote_variant() {
        let raw = "'''kotlin\nclass Foo";
        let result = extract(raw, Some(&kotlin()));
        assert_eq!(result.code, "class Foo");
    }

    #[test]
    fn test_python_docstrings_survive_backtick_fence() {
        let python = Language::new("python");
        let raw = "```python\ndef f():\n    '''\n    Doc.\n    '''\n    return 1\n```";
        let result = extract(raw, Some(&python));
        assert_eq!(result.code, "def f():\n    '''\n    Doc.\n    '''\n    return 1");
    }

    #[test]
    fn test_fence_scan_for_unlabeled_fences() {
        let raw = "Intro\n```\nclass Foo\n```\nMiddle\n```\nclass Bar\n```\nOutro";
        let result = extract(raw, Some(&kotlin()));

        assert_eq!(result.code, "class Foo\nclass Bar");
        assert_eq!(result.extra, "Intro\nMiddle\nOutro");
        assert_eq!(result.strategy, Some(ExtractionStrategy::FenceScan));
    }

    #[test]
    fn test_empty_labeled_block_is_not_unterminated() {
        let result = extract("```kotlin\n```", Some(&kotlin()));
        assert!(result.is_empty());
    }

    #[test]
    fn test_any_fence_without_target() {
        let raw = "Result:\n```swift\nstruct Foo {}\n```";
        let result = extract(raw, None);
        assert_eq!(result.code, "struct Foo {}");
        assert_eq!(result.extra, "Result:");
        assert_eq!(result.strategy, Some(ExtractionStrategy::LabeledFence));

        let open = extract("```\nstruct Foo {}", None);
        assert_eq!(open.code, "struct Foo {}");
    }

    #[test]
    fn test_no_fence_yields_empty_code() {
        let raw = "I cannot migrate this code.";
        let result = extract(raw, Some(&kotlin()));
        assert!(result.is_empty());
        assert_eq!(result.extra, raw);
        assert_eq!(result.strategy, None);
    }

    #[test]
    fn test_crlf_line_endings() {
        let raw = "```kotlin\r\nclass Foo\r\n```\r\n";
        assert_eq!(extract(raw, Some(&kotlin())).code, "class Foo");
    }

    #[test]
    fn test_extraction_is_idempotent() {
        let raw = "text\n```kotlin\nclass Foo\n```\nmore";
        let first = extract(raw, Some(&kotlin()));
        let second = extract(raw, Some(&kotlin()));
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_labeled_stub_is_skipped_for_later_block() {
        let raw = "Stub:\n```kotlin\n\n```\nOriginal:\n```java\npublic class Foo {}\n```\nMigrated:\n```kotlin\nclass Foo\n```";
        let result = extract(raw, Some(&kotlin()));

        assert_eq!(result.code, "class Foo");
        assert_eq!(result.strategy, Some(ExtractionStrategy::LabeledFence));
        assert!(result.extra.contains("public class Foo {}"));
    }

    #[test]
    fn test_unterminated_block_after_closed_empty_stub() {
        let raw = "Stub:\n```kotlin\n\n```\nMigrated:\n```kotlin\nclass Foo";
        let result = extract(raw, Some(&kotlin()));

        assert_eq!(result.code, "class Foo");
        assert_eq!(
            result.strategy,
            Some(ExtractionStrategy::UnterminatedLabeledFence)
        );
    }

    #[test]
    fn test_invalid_fence_pattern_disables_strategy() {
        assert!(compile_fence_pattern("(?P<bt>```").is_none());
    }
}
