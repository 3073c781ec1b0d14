//! Migration domain: records, prompt composition and code extraction.

pub mod extract;
pub mod model;
pub mod prompt;

pub use extract::extract;
pub use model::{
    Attempt, AttemptFailure, ExtractionResult, ExtractionStrategy, MigrationRequest,
    MigrationSession, TerminalState, ValidationResult,
};
pub use prompt::{PromptConfig, build_instruction};
