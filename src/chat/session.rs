//! Core chat session management.
//!
//! This module provides [`Session`], the append-only turn log of one
//! interactive session, and [`ChatSession`], which owns a session and
//! handles submissions against a [`ChatBackend`].

use futures::StreamExt;
use tracing::{debug, info};

use crate::chat::config::{ChatConfig, DEFAULT_SYSTEM_PROMPT};
use crate::client::{ChatBackend, Ollama};
use crate::error::{Error, Result};
use crate::observability::{SESSION_DIAGNOSTICS, SESSION_SUBMISSIONS};
use crate::render::Renderer;
use crate::types::{ChatRequest, ChatResponse, Model, Turn};

/// The ordered, append-only log of turns for one interactive session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    turns: Vec<Turn>,
}

impl Session {
    /// Starts an empty session.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    /// The turns so far, oldest first.
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// The number of turns.
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Returns true if no turn has been appended.
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// A chat session that owns the turn log and talks to the endpoint.
///
/// Every submission appends exactly two turns, the user's text and then the
/// reply.  A failed call still produces a reply: the failure's diagnostic
/// text, displayed like any other answer.
pub struct ChatSession<B: ChatBackend = Ollama> {
    backend: B,
    config: ChatConfig,
    session: Session,
    request_count: u64,
    failed_request_count: u64,
    total_prompt_tokens: u64,
    total_eval_tokens: u64,
    last_turn_counts: Option<(u64, u64)>,
}

/// Aggregated stats for a chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    /// The selected model.
    pub model: Model,
    /// The system prompt.
    pub system_prompt: String,
    /// The endpoint URL.
    pub endpoint_url: String,
    /// Whether replies are streamed.
    pub stream: bool,
    /// The number of turns in the current session.
    pub turn_count: usize,
    /// Total requests sent since start-up.
    pub total_requests: u64,
    /// Requests whose reply was a diagnostic.
    pub failed_requests: u64,
    /// Total prompt tokens reported by the server.
    pub total_prompt_tokens: u64,
    /// Total generated tokens reported by the server.
    pub total_eval_tokens: u64,
    /// Prompt tokens for the last successful turn, if reported.
    pub last_turn_prompt_tokens: Option<u64>,
    /// Generated tokens for the last successful turn, if reported.
    pub last_turn_eval_tokens: Option<u64>,
}

impl ChatSession<Ollama> {
    /// Creates a new chat session with the given client and configuration.
    pub fn new(client: Ollama, config: ChatConfig) -> Self {
        Self::with_backend(client, config)
    }
}

impl<B: ChatBackend> ChatSession<B> {
    /// Creates a new chat session over a custom backend.
    pub fn with_backend(backend: B, config: ChatConfig) -> Self {
        Self {
            backend,
            config,
            session: Session::new(),
            request_count: 0,
            failed_request_count: 0,
            total_prompt_tokens: 0,
            total_eval_tokens: 0,
            last_turn_counts: None,
        }
    }

    /// Submits the user's text and waits for the reply.
    ///
    /// This method:
    /// 1. Appends the user turn and renders the log
    /// 2. Sends one non-streaming request
    /// 3. Appends the reply, or the failure's diagnostic, as the assistant turn
    /// 4. Renders the full log again
    pub async fn submit(&mut self, user_text: &str, renderer: &mut dyn Renderer) {
        SESSION_SUBMISSIONS.click();
        self.session.push(Turn::user(user_text));
        renderer.render_turns(self.session.turns());

        let reply = match self.counted_fetch(user_text).await {
            Ok(response) => {
                self.record_counts(&response);
                response.into_content()
            }
            Err(err) => Err(err),
        };
        let reply = self.reply_text(reply);

        self.session.push(Turn::assistant(reply));
        renderer.render_turns(self.session.turns());
        debug!(turns = self.session.len(), "submission complete");
    }

    /// Submits the user's text and renders the reply as it streams in.
    ///
    /// The assistant turn holds the concatenated fragments.  A failure before
    /// the first fragment makes the diagnostic the whole reply; a failure
    /// after it appends the diagnostic on its own line.  An in-band `error`
    /// line and a stream that ends without `done` are both failures.
    pub async fn submit_streaming(&mut self, user_text: &str, renderer: &mut dyn Renderer) {
        SESSION_SUBMISSIONS.click();
        self.session.push(Turn::user(user_text));
        renderer.render_turns(self.session.turns());

        let request = ChatRequest::new(self.config.model, &self.config.system_prompt, user_text)
            .with_stream(true);
        self.request_count = self.request_count.saturating_add(1);
        let opened = self
            .backend
            .chat_stream(&self.config.endpoint_url, request)
            .await;
        let reply = match opened {
            Ok(mut stream) => {
                renderer.start_response();
                let mut text = String::new();
                let mut done = false;
                let mut failure = None;
                while let Some(chunk) = stream.next().await {
                    let chunk = match chunk {
                        Ok(chunk) => chunk,
                        Err(err) => {
                            failure = Some(err);
                            break;
                        }
                    };
                    if let Some(err) = chunk.server_error() {
                        failure = Some(err);
                        break;
                    }
                    if let Some(piece) = chunk.content().filter(|piece| !piece.is_empty()) {
                        renderer.print_text(piece);
                        text.push_str(piece);
                    }
                    if chunk.is_done() {
                        self.record_counts(&chunk);
                        done = true;
                        break;
                    }
                }
                if failure.is_none() && !done {
                    failure = Some(Error::streaming("stream ended before done", None));
                }
                if failure.is_none() && text.is_empty() {
                    failure = Some(Error::unexpected_structure(
                        "stream carried no message content",
                    ));
                }
                if let Some(err) = failure {
                    let diagnostic = self.reply_text(Err(err));
                    if !text.is_empty() {
                        text.push('\n');
                        renderer.print_text("\n");
                    }
                    renderer.print_text(&diagnostic);
                    text.push_str(&diagnostic);
                }
                renderer.finish_response();
                text
            }
            Err(err) => self.reply_text(Err(err)),
        };

        self.session.push(Turn::assistant(reply));
        renderer.render_turns(self.session.turns());
        debug!(turns = self.session.len(), "streamed submission complete");
    }

    /// Sends one completion request and always returns displayable text.
    ///
    /// The request carries a system turn with `system_prompt` followed by a
    /// user turn with `user_text`.  The reply content is returned on success;
    /// every failure is returned as its diagnostic (see
    /// [`Error::diagnostic`]).  Nothing is appended to the turn log.
    pub async fn request_completion(
        &self,
        user_text: &str,
        model: Model,
        system_prompt: &str,
        endpoint_url: &str,
    ) -> String {
        let result = self
            .fetch(user_text, model, system_prompt, endpoint_url)
            .await
            .and_then(ChatResponse::into_content);
        match result {
            Ok(content) => content,
            Err(err) => err.diagnostic(),
        }
    }

    /// Sends a request built from the active configuration, counting it.
    async fn counted_fetch(&mut self, user_text: &str) -> Result<ChatResponse> {
        self.request_count = self.request_count.saturating_add(1);
        self.fetch(
            user_text,
            self.config.model,
            &self.config.system_prompt,
            &self.config.endpoint_url,
        )
        .await
    }

    async fn fetch(
        &self,
        user_text: &str,
        model: Model,
        system_prompt: &str,
        endpoint_url: &str,
    ) -> Result<ChatResponse> {
        let request = ChatRequest::new(model, system_prompt, user_text);
        self.backend.chat(endpoint_url, request).await
    }

    fn reply_text(&mut self, reply: Result<String>) -> String {
        match reply {
            Ok(content) => content,
            Err(err) => {
                SESSION_DIAGNOSTICS.click();
                self.failed_request_count = self.failed_request_count.saturating_add(1);
                info!(kind = ?err.kind(), error = %err, "completion failed; replying with diagnostic");
                err.diagnostic()
            }
        }
    }

    fn record_counts(&mut self, response: &ChatResponse) {
        let prompt = response.prompt_eval_count.unwrap_or(0);
        let eval = response.eval_count.unwrap_or(0);
        self.total_prompt_tokens = self.total_prompt_tokens.saturating_add(prompt);
        self.total_eval_tokens = self.total_eval_tokens.saturating_add(eval);
        self.last_turn_counts = if response.prompt_eval_count.is_some()
            || response.eval_count.is_some()
        {
            Some((prompt, eval))
        } else {
            None
        };
    }

    /// Ends the current session and starts an empty one.
    pub fn reset(&mut self) {
        self.session = Session::new();
    }

    /// The current session's turn log.
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// The current session's turns, oldest first.
    pub fn turns(&self) -> &[Turn] {
        self.session.turns()
    }

    /// Returns the number of turns in the current session.
    pub fn turn_count(&self) -> usize {
        self.session.len()
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// Changes the model used for responses.
    pub fn set_model(&mut self, model: Model) {
        self.config.model = model;
    }

    /// Returns the current model.
    pub fn model(&self) -> Model {
        self.config.model
    }

    /// Sets the system prompt; `None` restores the default.
    pub fn set_system_prompt(&mut self, prompt: Option<String>) {
        self.config.system_prompt = prompt.unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
    }

    /// Returns the current system prompt.
    pub fn system_prompt(&self) -> &str {
        &self.config.system_prompt
    }

    /// Returns whether replies are streamed.
    pub fn is_streaming(&self) -> bool {
        self.config.stream
    }

    /// Returns the current session statistics snapshot.
    pub fn stats(&self) -> SessionStats {
        SessionStats {
            model: self.config.model,
            system_prompt: self.config.system_prompt.clone(),
            endpoint_url: self.config.endpoint_url.clone(),
            stream: self.config.stream,
            turn_count: self.session.len(),
            total_requests: self.request_count,
            failed_requests: self.failed_request_count,
            total_prompt_tokens: self.total_prompt_tokens,
            total_eval_tokens: self.total_eval_tokens,
            last_turn_prompt_tokens: self.last_turn_counts.map(|(prompt, _)| prompt),
            last_turn_eval_tokens: self.last_turn_counts.map(|(_, eval)| eval),
        }
    }
}
