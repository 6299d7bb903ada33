// Public modules
pub mod chat;
pub mod client;
pub mod client_logger;
pub mod error;
pub mod observability;
pub mod render;
pub mod types;
pub mod utils;

// Re-exports
pub use client::{ChatBackend, ChunkStream, DEFAULT_ENDPOINT_URL, ENDPOINT_ENV_VAR, Ollama};
pub use client_logger::{ClientLogger, TracingClientLogger};
pub use error::{Error, FailureKind, Result};
pub use observability::register_biometrics;
pub use types::*;
