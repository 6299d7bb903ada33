//! Configuration types for the chat application.
//!
//! This module provides CLI argument parsing via `arrrg` and the request
//! configuration a chat session sends with every submission.

use std::env;

use arrrg_derive::CommandLine;
use url::Url;

use crate::client::{DEFAULT_ENDPOINT_URL, ENDPOINT_ENV_VAR};
use crate::error::{Error, Result};
use crate::types::Model;

/// System prompt used when none is given.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// Command-line arguments for the ollama-chat tool.
#[derive(CommandLine, Debug, Default, PartialEq, Eq)]
pub struct ChatArgs {
    /// Model to use for chat.
    #[arrrg(optional, "Model to use: mistral, llama2, codellama (default: mistral)", "MODEL")]
    pub model: Option<String>,

    /// System prompt to set context for the conversation.
    #[arrrg(optional, "System prompt (default: You are a helpful assistant.)", "PROMPT")]
    pub system: Option<String>,

    /// Chat endpoint URL.
    #[arrrg(optional, "Chat endpoint URL (default: http://localhost:11434/api/chat)", "URL")]
    pub endpoint: Option<String>,

    /// Stream replies as they are generated.
    #[arrrg(flag, "Stream replies as they are generated")]
    pub stream: bool,

    /// Disable ANSI colors and styles.
    #[arrrg(flag, "Disable ANSI colors/styles")]
    pub no_color: bool,
}

/// Configuration for a chat session.
///
/// `model`, `system_prompt` and `endpoint_url` are the request configuration
/// sent with every submission; the rest only affects presentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatConfig {
    /// The model to use for generating responses.
    pub model: Model,

    /// The system prompt prepended to every request.
    pub system_prompt: String,

    /// The chat endpoint URL.
    pub endpoint_url: String,

    /// Whether replies are streamed.
    pub stream: bool,

    /// Whether to use ANSI colors and styles in output.
    pub use_color: bool,
}

impl ChatConfig {
    /// Creates a new ChatConfig with default values.
    ///
    /// Defaults:
    /// - Model: mistral
    /// - System prompt: "You are a helpful assistant."
    /// - Endpoint: http://localhost:11434/api/chat
    /// - Streaming: disabled
    /// - Color: enabled
    pub fn new() -> Self {
        Self {
            model: Model::default(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            endpoint_url: DEFAULT_ENDPOINT_URL.to_string(),
            stream: false,
            use_color: true,
        }
    }

    /// Sets the model to use.
    pub fn with_model(mut self, model: Model) -> Self {
        self.model = model;
        self
    }

    /// Sets the system prompt.
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Sets the endpoint URL.
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = endpoint_url.into();
        self
    }

    /// Enables or disables streaming.
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    /// Disables ANSI color output.
    pub fn without_color(mut self) -> Self {
        self.use_color = false;
        self
    }

    /// Resolves command-line arguments, the environment and defaults.
    ///
    /// The endpoint comes from `--endpoint`, then [`ENDPOINT_ENV_VAR`], then
    /// [`DEFAULT_ENDPOINT_URL`].
    pub fn from_args(args: ChatArgs) -> Result<Self> {
        Self::resolve(args, env::var(ENDPOINT_ENV_VAR).ok())
    }

    fn resolve(args: ChatArgs, env_endpoint: Option<String>) -> Result<Self> {
        let model = match args.model {
            Some(name) => name.parse::<Model>()?,
            None => Model::default(),
        };
        let endpoint_url = args
            .endpoint
            .or(env_endpoint.filter(|s| !s.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_ENDPOINT_URL.to_string());
        validate_endpoint(&endpoint_url)?;

        Ok(ChatConfig {
            model,
            system_prompt: args
                .system
                .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string()),
            endpoint_url,
            stream: args.stream,
            use_color: !args.no_color,
        })
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Checks that an endpoint is an absolute http(s) URL.
pub fn validate_endpoint(endpoint_url: &str) -> Result<()> {
    let url = Url::parse(endpoint_url)?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(Error::validation(
            format!("endpoint must use http or https, not '{other}'"),
            Some("endpoint".to_string()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = ChatConfig::new();
        assert_eq!(config.model, Model::Mistral);
        assert_eq!(config.system_prompt, "You are a helpful assistant.");
        assert_eq!(config.endpoint_url, "http://localhost:11434/api/chat");
        assert!(!config.stream);
        assert!(config.use_color);
    }

    #[test]
    fn config_from_args_defaults() {
        let config = ChatConfig::resolve(ChatArgs::default(), None).unwrap();
        assert_eq!(config, ChatConfig::new());
    }

    #[test]
    fn config_from_args_custom() {
        let args = ChatArgs {
            model: Some("codellama".to_string()),
            system: Some("You write Rust.".to_string()),
            endpoint: Some("http://gpu-box:11434/api/chat".to_string()),
            stream: true,
            no_color: true,
        };
        let config = ChatConfig::resolve(args, None).unwrap();
        assert_eq!(config.model, Model::Codellama);
        assert_eq!(config.system_prompt, "You write Rust.");
        assert_eq!(config.endpoint_url, "http://gpu-box:11434/api/chat");
        assert!(config.stream);
        assert!(!config.use_color);
    }

    #[test]
    fn config_endpoint_precedence() {
        let from_env = ChatConfig::resolve(
            ChatArgs::default(),
            Some("http://env-host:1/api/chat".to_string()),
        )
        .unwrap();
        assert_eq!(from_env.endpoint_url, "http://env-host:1/api/chat");

        let args = ChatArgs {
            endpoint: Some("http://flag-host:2/api/chat".to_string()),
            ..ChatArgs::default()
        };
        let from_flag =
            ChatConfig::resolve(args, Some("http://env-host:1/api/chat".to_string())).unwrap();
        assert_eq!(from_flag.endpoint_url, "http://flag-host:2/api/chat");

        let blank_env = ChatConfig::resolve(ChatArgs::default(), Some("  ".to_string())).unwrap();
        assert_eq!(blank_env.endpoint_url, DEFAULT_ENDPOINT_URL);
    }

    #[test]
    fn config_rejects_unknown_model() {
        let args = ChatArgs {
            model: Some("gpt-4".to_string()),
            ..ChatArgs::default()
        };
        let err = ChatConfig::resolve(args, None).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn config_rejects_bad_endpoint() {
        assert!(validate_endpoint("localhost:11434").is_err());
        assert!(validate_endpoint("ftp://host/api/chat").is_err());
        assert!(validate_endpoint("https://host/api/chat").is_ok());
    }

    #[test]
    fn config_builder_pattern() {
        let config = ChatConfig::new()
            .with_model(Model::Llama2)
            .with_system_prompt("Test prompt")
            .with_endpoint_url("http://127.0.0.1:9/api/chat")
            .with_stream(true)
            .without_color();

        assert_eq!(config.model, Model::Llama2);
        assert_eq!(config.system_prompt, "Test prompt");
        assert_eq!(config.endpoint_url, "http://127.0.0.1:9/api/chat");
        assert!(config.stream);
        assert!(!config.use_color);
    }
}
