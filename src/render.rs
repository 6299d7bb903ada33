//! Output rendering for chat turns.
//!
//! This module provides the renderer trait the chat session signals after
//! every turn, and a plain-text implementation for terminals.

use std::io::{self, Stdout, Write};

use crate::types::{Role, Turn};

/// ANSI escape code for bold text (used for role labels).
const ANSI_BOLD: &str = "\x1b[1m";

/// ANSI escape code for dim text (used for system turns).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for cyan text (used for the user label).
const ANSI_CYAN: &str = "\x1b[36m";

/// ANSI escape code for green text (used for the assistant label).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for errors).
const ANSI_RED: &str = "\x1b[31m";

/// Trait for rendering a conversation.
///
/// The session calls [`Renderer::render_turns`] with the complete turn log
/// after every append.  Implementations decide how much of it to redraw.
pub trait Renderer: Send {
    /// Render the full, ordered turn sequence.
    fn render_turns(&mut self, turns: &[Turn]);

    /// Called before the first fragment of a streamed reply.
    fn start_response(&mut self) {}

    /// Print a fragment of a streamed reply.
    fn print_text(&mut self, text: &str);

    /// Called after the last fragment of a streamed reply.
    fn finish_response(&mut self);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);
}

/// Plain text renderer with optional ANSI styling.
///
/// Turns are drawn incrementally: each call to `render_turns` prints only
/// the turns not drawn before.  A turn log shorter than what was drawn means
/// a new session started, and drawing restarts from its beginning.
pub struct PlainTextRenderer<W: Write + Send = Stdout> {
    out: W,
    use_color: bool,
    echo_user: bool,
    rendered: usize,
    streamed_pending: bool,
    line_start: bool,
}

impl PlainTextRenderer<Stdout> {
    /// Creates a new PlainTextRenderer on stdout with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer on stdout with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self::with_writer(io::stdout(), use_color)
    }
}

impl Default for PlainTextRenderer<Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<W: Write + Send> PlainTextRenderer<W> {
    /// Creates a renderer over an arbitrary writer.
    pub fn with_writer(out: W, use_color: bool) -> Self {
        Self {
            out,
            use_color,
            echo_user: true,
            rendered: 0,
            streamed_pending: false,
            line_start: true,
        }
    }

    /// Do not print user turns during incremental rendering.
    ///
    /// Useful when the line editor has already shown what the user typed.
    pub fn without_user_echo(mut self) -> Self {
        self.echo_user = false;
        self
    }

    /// Redraw every turn, including user turns, from the beginning.
    pub fn replay(&mut self, turns: &[Turn]) {
        if turns.is_empty() {
            self.print_info("(no messages yet)");
        }
        for turn in turns {
            self.write_turn(turn);
        }
        self.rendered = turns.len();
        self.streamed_pending = false;
    }

    /// Consumes the renderer and returns its writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn write(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let _ = self.out.write_all(text.as_bytes());
        self.line_start = text.ends_with('\n');
        self.flush();
    }

    /// Flushes output to ensure immediate display of streamed content.
    fn flush(&mut self) {
        let _ = self.out.flush();
    }

    fn label(&self, role: Role) -> String {
        let name = match role {
            Role::User => "You",
            Role::Assistant => "Assistant",
            Role::System => "System",
        };
        if !self.use_color {
            return format!("{name}:");
        }
        let color = match role {
            Role::User => ANSI_CYAN,
            Role::Assistant => ANSI_GREEN,
            Role::System => ANSI_DIM,
        };
        format!("{ANSI_BOLD}{color}{name}:{ANSI_RESET}")
    }

    fn write_turn(&mut self, turn: &Turn) {
        let label = self.label(turn.role());
        let content = turn.content().trim_end_matches('\n');
        self.write(&format!("{label}\n{content}\n\n"));
    }
}

impl<W: Write + Send> Renderer for PlainTextRenderer<W> {
    fn render_turns(&mut self, turns: &[Turn]) {
        if turns.len() < self.rendered {
            self.rendered = 0;
        }
        for turn in &turns[self.rendered..] {
            match turn.role() {
                Role::User if !self.echo_user => {}
                Role::Assistant if self.streamed_pending => {
                    self.streamed_pending = false;
                }
                _ => self.write_turn(turn),
            }
        }
        self.rendered = turns.len();
    }

    fn start_response(&mut self) {
        let label = self.label(Role::Assistant);
        self.write(&format!("{label}\n"));
        self.streamed_pending = true;
    }

    fn print_text(&mut self, text: &str) {
        self.write(text);
    }

    fn finish_response(&mut self) {
        if self.line_start {
            self.write("\n");
        } else {
            self.write("\n\n");
        }
    }

    fn print_error(&mut self, error: &str) {
        if !self.line_start {
            self.write("\n");
        }
        if self.use_color {
            self.write(&format!("{ANSI_RED}Error: {error}{ANSI_RESET}\n"));
        } else {
            self.write(&format!("Error: {error}\n"));
        }
    }

    fn print_info(&mut self, info: &str) {
        if !self.line_start {
            self.write("\n");
        }
        self.write(&format!("{info}\n"));
    }
}
