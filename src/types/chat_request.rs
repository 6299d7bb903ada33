use serde::{Deserialize, Serialize};

use crate::types::{Model, Turn};

/// The body POSTed to the chat endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The model to generate with.
    pub model: Model,

    /// The conversation sent for this call.
    pub messages: Vec<Turn>,

    /// Whether the server should stream newline-delimited chunks.
    pub stream: bool,
}

impl ChatRequest {
    /// Builds the request for one submission: the system prompt followed by
    /// the user's text, non-streaming.
    pub fn new(model: Model, system_prompt: &str, user_text: &str) -> Self {
        Self {
            model,
            messages: vec![Turn::system(system_prompt), Turn::user(user_text)],
            stream: false,
        }
    }

    /// Sets whether to stream the response.
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }
}
