//! Domain layer for langshift.
//!
//! Types, traits and pure logic shared by every other crate: the migration
//! records, the prompt builder, the response extractor, the artifact layout,
//! and the gateway / validation / artifact-store seams.

pub mod api;
pub mod artifact;
pub mod config;
pub mod error;
pub mod gateway;
pub mod language;
pub mod migration;
pub mod report;
pub mod source;
pub mod validation;

pub use error::{Result, ShiftError};
pub use language::Language;
pub use source::SourceArtifact;
