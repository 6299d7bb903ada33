//! Logging trait for chat client operations.
//!
//! This module provides the [`ClientLogger`] trait that allows users to capture
//! and log every interaction passing through the [`Ollama`](crate::Ollama)
//! client, and [`TracingClientLogger`], which forwards them to `tracing`.

use tracing::debug;

use crate::{ChatChunk, ChatRequest, ChatResponse};

/// A trait for logging chat client operations.
///
/// Implement this trait to capture and record all endpoint interactions,
/// including both complete responses and individual streamed chunks.
///
/// # Example
///
/// ```rust,ignore
/// use ollama_chat::{ChatChunk, ChatRequest, ChatResponse, ClientLogger};
/// use std::sync::Mutex;
///
/// struct FileLogger {
///     file: Mutex<std::fs::File>,
/// }
///
/// impl ClientLogger for FileLogger {
///     fn log_request(&self, endpoint_url: &str, request: &ChatRequest) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "POST {endpoint_url}: {}", serde_json::to_string(request).unwrap()).unwrap();
///     }
///
///     fn log_response(&self, response: &ChatResponse) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Response: {}", serde_json::to_string(response).unwrap()).unwrap();
///     }
///
///     fn log_stream_chunk(&self, chunk: &ChatChunk) {
///         let mut file = self.file.lock().unwrap();
///         writeln!(file, "Chunk: {}", serde_json::to_string(chunk).unwrap()).unwrap();
///     }
/// }
/// ```
pub trait ClientLogger: Send + Sync {
    /// Log a request just before it is sent.
    fn log_request(&self, endpoint_url: &str, request: &ChatRequest);

    /// Log a complete response from a non-streaming call.
    ///
    /// Called once per response whose body decoded, whether or not it has the
    /// expected structure.
    fn log_response(&self, response: &ChatResponse);

    /// Log an individual streamed chunk.
    fn log_stream_chunk(&self, chunk: &ChatChunk);
}

/// A [`ClientLogger`] that emits `tracing` debug events.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingClientLogger;

impl ClientLogger for TracingClientLogger {
    fn log_request(&self, endpoint_url: &str, request: &ChatRequest) {
        debug!(
            endpoint = endpoint_url,
            model = %request.model,
            messages = request.messages.len(),
            stream = request.stream,
            "chat request"
        );
    }

    fn log_response(&self, response: &ChatResponse) {
        debug!(
            model = response.model.as_deref().unwrap_or(""),
            done_reason = response.done_reason.as_deref().unwrap_or(""),
            prompt_eval_count = response.prompt_eval_count.unwrap_or(0),
            eval_count = response.eval_count.unwrap_or(0),
            has_content = response.content().is_some(),
            "chat response"
        );
    }

    fn log_stream_chunk(&self, chunk: &ChatChunk) {
        debug!(
            bytes = chunk.content().map(str::len).unwrap_or(0),
            done = chunk.is_done(),
            "chat stream chunk"
        );
    }
}
