//! Storage layer: atomic writes and secret loading.

mod atomic_file;
mod secret_storage;

pub use atomic_file::{AtomicFile, AtomicFileError};
pub use secret_storage::{
    SecretStorage, SecretStorageError, api_key_env_var, apply_env_fallback,
};
