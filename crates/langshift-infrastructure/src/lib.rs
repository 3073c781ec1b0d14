//! Infrastructure adapters: configuration and secret loading, atomic
//! artifact storage, external command validation, and source loading.

pub mod artifact_store;
pub mod command;
pub mod config_loader;
pub mod paths;
pub mod source_loader;
pub mod storage;
pub mod validation_runner;

pub use artifact_store::FsArtifactStore;
pub use config_loader::ConfigLoader;
pub use paths::LangshiftPaths;
pub use source_loader::{LoadedSources, SourceLoader};
pub use storage::SecretStorage;
pub use validation_runner::CommandValidationRunner;
