//! Slash command parsing for the chat application.
//!
//! This module handles parsing of special commands that start with `/`,
//! allowing users to control the chat session without sending messages
//! to the backend.

/// A parsed chat command.
///
/// These commands control the chat session and are not sent to the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    /// Close the connection and reopen it scoped to another thread.
    Thread(String),

    /// Open a fresh connection on the current thread.
    Reconnect,

    /// Sign out, forgetting the stored token.
    SignOut,

    /// Reprint the chat log.
    History,

    /// Display help information.
    Help,

    /// Exit the chat application.
    Quit,

    /// Display connection and identity status.
    Status,

    /// Report a parsing error back to the caller.
    Invalid(String),
}

/// Parses user input for slash commands.
///
/// Returns `Some(ChatCommand)` if the input is a command,
/// or `None` if it should be treated as a regular message.
///
/// # Examples
///
/// ```
/// # use confidant::chat::parse_command;
/// assert!(parse_command("/quit").is_some());
/// assert!(parse_command("/thread journal").is_some());
/// assert!(parse_command("I had a rough day").is_none());
/// ```
pub fn parse_command(input: &str) -> Option<ChatCommand> {
    let input = input.trim();

    if !input.starts_with('/') {
        return None;
    }

    let mut parts = input[1..].splitn(2, ' ');
    let command = parts.next()?.to_lowercase();
    let argument = parts.next().map(|s| s.trim()).filter(|s| !s.is_empty());

    let result = match command.as_str() {
        "thread" => match argument {
            Some(thread) if thread.contains(char::is_whitespace) => {
                ChatCommand::Invalid("/thread expects a single identifier".to_string())
            }
            Some(thread) => ChatCommand::Thread(thread.to_string()),
            None => ChatCommand::Invalid("/thread requires a thread identifier".to_string()),
        },
        "reconnect" => ChatCommand::Reconnect,
        "signout" | "logout" => ChatCommand::SignOut,
        "history" => ChatCommand::History,
        "help" | "?" => ChatCommand::Help,
        "quit" | "exit" | "q" => ChatCommand::Quit,
        "status" => ChatCommand::Status,
        _ => ChatCommand::Invalid(format!("Unknown command: /{command} (try /help)")),
    };

    Some(result)
}

/// Returns help text describing available commands.
pub fn help_text() -> &'static str {
    r#"Available commands:
  /thread <id>           Reconnect scoped to another conversation thread
  /reconnect             Open a fresh connection on the current thread
  /history               Reprint the conversation so far
  /status                Show connection and sign-in status
  /signout               Forget the stored token and exit
  /help                  Show this help message
  /quit                  Exit the chat"#
}
