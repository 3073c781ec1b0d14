//! Instruction text for the model.
//!
//! The instruction is rendered from a single Jinja template; each toggle in
//! [`PromptConfig`] switches one fragment on or off. On a correction pass the
//! previous diagnostic is quoted verbatim at the end.

use crate::error::Result;
use crate::language::Language;
use minijinja::Environment;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

const TEMPLATE_NAME: &str = "migration_prompt";

const MIGRATION_TEMPLATE: &str = r#"Migrate the provided {{ source }} code to {{ target }} code.
Ensure the functionality and compatibility are preserved.
{%- if preserve_imports %}
Keep the imports in the file path when migrating the code.
{%- endif %}
{%- if strip_comments %}
Do not include comments in the migrated code.
{%- endif %}
{%- if apply_target_idioms %}
Write idiomatic {{ target }}: prefer the language's own constructs, naming conventions and standard library over a line-by-line transliteration.
{%- endif %}
{%- if include_framework_equivalence %}
Where the code depends on {{ source }} frameworks or libraries, replace them with their closest {{ target }} equivalents and keep the public behavior the same.
{%- endif %}
Return the complete migrated file in a single fenced code block labelled `{{ fence_tag }}`.
{%- if diagnostic %}

This is a correction pass. The previous migration of this code failed validation with the following diagnostic:
<diagnostic>
{{ diagnostic }}
</diagnostic>
Address every problem reported above and return the corrected, complete {{ target }} file.
{%- endif %}"#;

static ENVIRONMENT: Lazy<Environment<'static>> = Lazy::new(|| {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(false);
    env.add_template(TEMPLATE_NAME, MIGRATION_TEMPLATE)
        .expect("migration prompt template must parse");
    env
});

/// Named fragments that can be switched on in the instruction text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptConfig {
    #[serde(default = "default_true")]
    pub preserve_imports: bool,
    #[serde(default)]
    pub strip_comments: bool,
    #[serde(default)]
    pub apply_target_idioms: bool,
    #[serde(default)]
    pub include_framework_equivalence: bool,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            preserve_imports: true,
            strip_comments: false,
            apply_target_idioms: false,
            include_framework_equivalence: false,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Serialize)]
struct PromptContext<'a> {
    source: &'a str,
    target: &'a str,
    fence_tag: &'a str,
    preserve_imports: bool,
    strip_comments: bool,
    apply_target_idioms: bool,
    include_framework_equivalence: bool,
    diagnostic: Option<&'a str>,
}

/// Builds the instruction text for one attempt.
///
/// `prior_diagnostic` is the failure text of the previous attempt only; the
/// caller never passes an accumulation of older diagnostics.
pub fn build_instruction(
    source_language: &Language,
    target_language: &Language,
    config: &PromptConfig,
    prior_diagnostic: Option<&str>,
) -> Result<String> {
    let context = PromptContext {
        source: source_language.tag(),
        target: target_language.tag(),
        fence_tag: target_language.tag(),
        preserve_imports: config.preserve_imports,
        strip_comments: config.strip_comments,
        apply_target_idioms: config.apply_target_idioms,
        include_framework_equivalence: config.include_framework_equivalence,
        diagnostic: prior_diagnostic.filter(|d| !d.trim().is_empty()),
    };

    let template = ENVIRONMENT.get_template(TEMPLATE_NAME)?;
    Ok(template.render(context)?)
}
