//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to adjust the request configuration without sending a
//! message to the endpoint.

use crate::types::Model;

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the endpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// End the current session and start a fresh one.
    Clear,

    /// Select a model.
    Model(Model),

    /// List the selectable models.
    ListModels,

    /// Set the system prompt.
    /// `None` restores the default prompt.
    System(Option<String>),

    /// Redraw the whole conversation.
    History,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Display session statistics.
    Stats,

    /// Show the current configuration.
    ShowConfig,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command,
/// or `None` if it should be submitted as a chat message.
///
/// # Examples
///
/// ```
/// # use ollama_chat::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/model llama2").is_some());
/// assert!(parse_command("Why is the sky blue?").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].splitn(2, char::is_whitespace);
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "clear" | "new" => ChatCommand::Clear,
        "model" => match argument {
            Some(name) => match name.parse::<Model>() {
                Ok(model) => ChatCommand::Model(model),
                Err(err) => ChatCommand::Invalid(format!("/model: {err}")),
            },
            None => ChatCommand::Invalid("/model requires a model name".to_string()),
        },
        "models" => ChatCommand::ListModels,
        "system" => ChatCommand::System(argument.map(|s| s.to_string())),
        "history" => ChatCommand::History,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "stats" | "status" => ChatCommand::Stats,
        "config" => ChatCommand::ShowConfig,
        _ => ChatCommand::Invalid(format!("Unknown command: /{}", command)),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /model <name>          Select the model (mistral, llama2, codellama)
  /models                List selectable models
  /system [prompt]       Set the system prompt (no argument restores the default)
  /history               Show the whole conversation
  /clear                 End this session and start a new one
  /stats                 Show session statistics
  /config                Show current configuration
  /help                  Show this help message
  /quit                  Exit the chat"#
}
