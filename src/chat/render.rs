//! Output rendering for the chat application.
//!
//! This module provides a trait-based rendering abstraction that allows
//! for different output styles. The default implementation uses ANSI
//! escape codes to set the speakers and the reply metadata apart.

use std::io::{self, Stdout, Write};

use crate::types::{Message, MessageMeta, Role};

/// ANSI escape code for dim text (used for metadata).
const ANSI_DIM: &str = "\x1b[2m";

/// ANSI escape code to reset all styling.
const ANSI_RESET: &str = "\x1b[0m";

/// ANSI escape code for blue text (used for the user's lines).
const ANSI_BLUE: &str = "\x1b[34m";

/// ANSI escape code for green text (used for assistant replies).
const ANSI_GREEN: &str = "\x1b[32m";

/// ANSI escape code for red text (used for crisis flags and errors).
const ANSI_RED: &str = "\x1b[31m";

/// ANSI escape code for yellow text (used for guardrail labels and notices).
const ANSI_YELLOW: &str = "\x1b[33m";

/// Trait for rendering chat output.
pub trait Renderer: Send {
    /// Print one chat log entry.
    fn print_message(&mut self, message: &Message);

    /// Show that a reply is on its way.
    fn print_pending(&mut self);

    /// Print an error message.
    fn print_error(&mut self, error: &str);

    /// Print an informational message.
    fn print_info(&mut self, info: &str);
}

/// Plain text renderer with optional ANSI styling.
pub struct PlainTextRenderer {
    stdout: Stdout,
    use_color: bool,
}

impl PlainTextRenderer {
    /// Creates a new PlainTextRenderer with ANSI colors enabled.
    pub fn new() -> Self {
        Self::with_color(true)
    }

    /// Creates a new PlainTextRenderer with specified color setting.
    pub fn with_color(use_color: bool) -> Self {
        Self {
            stdout: io::stdout(),
            use_color,
        }
    }

    fn flush(&mut self) {
        let _ = self.stdout.flush();
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_color {
            format!("{color}{text}{ANSI_RESET}")
        } else {
            text.to_string()
        }
    }

    /// The line shown under an assistant reply, or `None` when there is nothing to show.
    fn meta_line(&self, meta: &MessageMeta) -> Option<String> {
        let mut parts = Vec::new();
        if let Some(emotion) = meta.emotion.as_deref() {
            parts.push(self.paint(ANSI_DIM, &format!("Emotion: {emotion}")));
        }
        if let Some(mode) = meta.mode.as_deref() {
            parts.push(self.paint(ANSI_DIM, &format!("Mode: {mode}")));
        }
        if meta.crisis() {
            parts.push(self.paint(ANSI_RED, "Crisis detected"));
        }
        if let Some(attack) = meta.flagged_attack() {
            parts.push(self.paint(ANSI_YELLOW, &format!("({attack})")));
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }

    /// Format one log entry.
    pub fn format_message(&self, message: &Message) -> String {
        let mut out = match message.role {
            Role::User => format!("{} {}", self.paint(ANSI_BLUE, "You:"), message.content),
            Role::Assistant => format!("{} {}", self.paint(ANSI_GREEN, "AI:"), message.content),
            Role::System => self.paint(ANSI_YELLOW, &format!("[{}]", message.content)),
        };
        if let Some(line) = message.meta.as_ref().and_then(|meta| self.meta_line(meta)) {
            out.push_str("\n    ");
            out.push_str(&line);
        }
        if let Some(journal) = message
            .meta
            .as_ref()
            .and_then(|meta| meta.journal_entry.as_deref())
            .filter(|entry| !entry.is_empty())
        {
            out.push_str("\n    ");
            out.push_str(&self.paint(ANSI_DIM, &format!("Journal: {journal}")));
        }
        out
    }
}

impl Default for PlainTextRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer for PlainTextRenderer {
    fn print_message(&mut self, message: &Message) {
        println!("{}", self.format_message(message));
        self.flush();
    }

    fn print_pending(&mut self) {
        println!("{}", self.paint(ANSI_DIM, "AI is typing..."));
        self.flush();
    }

    fn print_error(&mut self, error: &str) {
        eprintln!("{}", self.paint(ANSI_RED, &format!("Error: {error}")));
    }

    fn print_info(&mut self, info: &str) {
        println!("{info}");
        self.flush();
    }
}
