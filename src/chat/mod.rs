//! Chat application module for interactive conversations with a local model.
//!
//! This module provides a REPL chat interface built on top of the client
//! library. It supports:
//!
//! - One request per submission, with every failure shown as a reply
//! - Optional streaming of replies as they are generated
//! - Slash commands for selecting the model and system prompt
//!
//! # Architecture
//!
//! The module is organized into several components:
//!
//! - [`config`]: CLI argument parsing and request configuration
//! - [`session`]: The turn log and submission handling
//! - [`commands`]: Slash command parsing

mod commands;
mod config;
mod session;

pub use crate::render::{PlainTextRenderer, Renderer};
pub use commands::{ChatCommand, help_text, parse_command};
pub use config::{ChatArgs, ChatConfig, DEFAULT_SYSTEM_PROMPT, validate_endpoint};
pub use session::{ChatSession, Session, SessionStats};
