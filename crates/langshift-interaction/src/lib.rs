//! Model backends and the registry gateway.
//!
//! One REST backend per provider plus [`RegistryGateway`], which maps the
//! configured model identifiers onto them.

pub mod claude_backend;
pub mod gemini_backend;
mod http_error;
pub mod ollama_backend;
pub mod openai_backend;
pub mod registry;

pub use claude_backend::ClaudeBackend;
pub use gemini_backend::GeminiBackend;
pub use ollama_backend::OllamaBackend;
pub use openai_backend::OpenAiBackend;
pub use registry::RegistryGateway;
