// Public modules
pub mod chat_request;
pub mod chat_response;
pub mod model;
pub mod turn;

// Re-exports
pub use chat_request::ChatRequest;
pub use chat_response::{ChatChunk, ChatResponse, ResponseMessage};
pub use model::Model;
pub use turn::{Role, Turn};
