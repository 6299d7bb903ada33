//! Interactive chat application for conversing with a local Ollama server.
//!
//! This binary provides a REPL interface that sends each line to the chat
//! endpoint and prints the reply.  Failures are printed in place of a reply
//! and never end the session.
//!
//! # Usage
//!
//! ```bash
//! # Basic usage with default settings
//! ollama-chat
//!
//! # Pick a model
//! ollama-chat --model codellama
//!
//! # Set a system prompt
//! ollama-chat --system "You are a terse assistant"
//!
//! # Talk to another host and stream replies
//! ollama-chat --endpoint http://gpu-box:11434/api/chat --stream
//! ```
//!
//! Set `RUST_LOG=ollama_chat=debug` to see request logging on stderr.
//!
//! # Commands
//!
//! While chatting, you can use slash commands:
//! - `/help` - Show available commands
//! - `/model <name>` - Select the model
//! - `/system [prompt]` - Set or reset the system prompt
//! - `/history` - Show the whole conversation
//! - `/clear` - Start a new session
//! - `/quit` - Exit the application

use std::sync::Arc;

use arrrg::CommandLine;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use ollama_chat::chat::{
    ChatArgs, ChatCommand, ChatConfig, ChatSession, PlainTextRenderer, Renderer, help_text,
    parse_command,
};
use ollama_chat::{Model, Ollama, TracingClientLogger};

/// Main entry point for the ollama-chat application.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging()?;
    ollama_chat::register_biometrics(biometrics::Collector::new());

    let (args, _) = ChatArgs::from_command_line_relaxed("ollama-chat [OPTIONS]");
    let config = ChatConfig::from_args(args)?;
    let use_color = config.use_color;
    info!(model = %config.model, endpoint = %config.endpoint_url, stream = config.stream, "starting chat");

    let client = Ollama::new()?.with_logger(Arc::new(TracingClientLogger));
    let mut session = ChatSession::new(client, config);
    let mut renderer = PlainTextRenderer::with_color(use_color).without_user_echo();
    let mut rl = DefaultEditor::new()?;

    println!("Ollama Chat (model: {})", session.model());
    println!("Type /help for commands, /quit to exit\n");

    loop {
        let readline = rl.readline("You: ");

        match readline {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                // Check for slash commands
                if let Some(cmd) = parse_command(line) {
                    match cmd {
                        ChatCommand::Quit => {
                            println!("Goodbye!");
                            break;
                        }
                        ChatCommand::Clear => {
                            session.reset();
                            renderer.render_turns(session.turns());
                            renderer.print_info("Started a new session.");
                        }
                        ChatCommand::Help => {
                            for line in help_text().lines() {
                                println!("    {}", line);
                            }
                        }
                        ChatCommand::Model(model) => {
                            session.set_model(model);
                            renderer.print_info(&format!("Model changed to: {}", model));
                        }
                        ChatCommand::ListModels => {
                            print_models(session.model());
                        }
                        ChatCommand::System(prompt) => {
                            let restored = prompt.is_none();
                            session.set_system_prompt(prompt);
                            if restored {
                                renderer.print_info(&format!(
                                    "System prompt restored to: {}",
                                    session.system_prompt()
                                ));
                            } else {
                                renderer.print_info(&format!(
                                    "System prompt set to: {}",
                                    session.system_prompt()
                                ));
                            }
                        }
                        ChatCommand::History => {
                            renderer.replay(session.turns());
                        }
                        ChatCommand::Stats => {
                            print_stats(&session);
                        }
                        ChatCommand::ShowConfig => {
                            print_config(&session);
                        }
                        ChatCommand::Invalid(message) => {
                            renderer.print_error(&message);
                        }
                    }
                    continue;
                }

                // Regular message - send to the endpoint
                if session.is_streaming() {
                    session.submit_streaming(line, &mut renderer).await;
                } else {
                    session.submit(line, &mut renderer).await;
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Ctrl+C at prompt - soft interrupt
                println!();
                continue;
            }
            Err(ReadlineError::Eof) => {
                // Ctrl+D - exit
                println!("\nGoodbye!");
                break;
            }
            Err(err) => {
                renderer.print_error(&format!("Input error: {}", err));
                break;
            }
        }
    }

    Ok(())
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("ollama_chat=warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    Ok(())
}

fn print_models(current: Model) {
    println!("    Models:");
    for model in Model::ALL {
        let marker = if model == current { "*" } else { " " };
        println!("      {marker} {model}");
    }
}

fn print_stats(session: &ChatSession) {
    let stats = session.stats();
    println!("    Session Statistics:");
    println!("      Model: {}", stats.model);
    println!("      Turns: {}", stats.turn_count);
    println!(
        "      Requests: {} ({} failed)",
        stats.total_requests, stats.failed_requests
    );
    println!(
        "      Total tokens: {} prompt / {} generated",
        stats.total_prompt_tokens, stats.total_eval_tokens
    );
    if let Some(prompt) = stats.last_turn_prompt_tokens {
        let eval = stats.last_turn_eval_tokens.unwrap_or(0);
        println!("      Last turn tokens: {prompt} prompt / {eval} generated");
    }
}

fn print_config(session: &ChatSession) {
    let stats = session.stats();
    println!("    Current Configuration:");
    println!("      Model: {}", stats.model);
    println!("      Endpoint: {}", stats.endpoint_url);
    println!(
        "      Streaming: {}",
        if stats.stream { "on" } else { "off" }
    );
    println!("      System prompt: {}", stats.system_prompt);
}
