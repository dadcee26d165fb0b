//! Special commands parser for interactive chat mode
//!
//! This module parses and handles special commands that can be entered during
//! interactive chat sessions. Special commands allow users to:
//! - Start, list, open and delete chats
//! - Switch the source mode for following questions
//! - Read or switch the backend model mode
//! - Display help information
//! - Exit the session
//!
//! Commands are prefixed with `/`. Command names are case-insensitive; chat
//! ids are passed through as typed.

use crate::session::SourceMode;
use thiserror::Error;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// Special commands that can be executed during interactive chat
///
/// These commands act on the session rather than being sent to the backend
/// as a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Start a new chat
    NewChat,

    /// Refresh and print the chat list
    ListChats,

    /// Open a chat and print its messages
    OpenChat(String),

    /// Delete a chat
    DeleteChat(String),

    /// Switch the source mode used for following questions
    SwitchSource(SourceMode),

    /// Print the backend model mode
    ShowModelMode,

    /// Switch the backend model mode
    SetModelMode(String),

    /// Display the open chat and selected source mode
    ShowStatus,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command
    ///
    /// The input should be sent as a question.
    None,
}

fn required_arg(command: &str, usage: &str, arg: &str) -> Result<String, CommandError> {
    if arg.is_empty() {
        Err(CommandError::MissingArgument {
            command: command.to_string(),
            usage: usage.to_string(),
        })
    } else {
        Ok(arg.to_string())
    }
}

/// Parse a user input string into a special command
///
/// # Errors
///
/// Returns `CommandError::UnknownCommand` if input starts with "/" but is not
/// a valid command, `UnsupportedArgument` for an invalid argument and
/// `MissingArgument` when a required argument is absent.
///
/// # Examples
///
/// ```
/// use ragchat::commands::special_commands::{parse_special_command, SpecialCommand};
/// use ragchat::session::SourceMode;
///
/// let cmd = parse_special_command("/source internet").unwrap();
/// assert_eq!(cmd, SpecialCommand::SwitchSource(SourceMode::Internet));
///
/// let cmd = parse_special_command("/open 9f1c").unwrap();
/// assert_eq!(cmd, SpecialCommand::OpenChat("9f1c".to_string()));
///
/// let cmd = parse_special_command("What breaks the fast?").unwrap();
/// assert_eq!(cmd, SpecialCommand::None);
///
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') {
        return Ok(match lower.as_str() {
            "exit" | "quit" => SpecialCommand::Exit,
            _ => SpecialCommand::None,
        });
    }

    let (name, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((name, rest)) => (name.to_lowercase(), rest.trim()),
        None => (lower.clone(), ""),
    };

    match name.as_str() {
        "/new" => Ok(SpecialCommand::NewChat),
        "/list" | "/chats" => Ok(SpecialCommand::ListChats),
        "/open" => required_arg("/open", "/open <chat_id>", arg).map(SpecialCommand::OpenChat),
        "/delete" => {
            required_arg("/delete", "/delete <chat_id>", arg).map(SpecialCommand::DeleteChat)
        }
        "/source" => {
            let arg = required_arg("/source", "/source <rag|rag+internet|internet>", arg)?;
            arg.parse::<SourceMode>()
                .map(SpecialCommand::SwitchSource)
                .map_err(|_| CommandError::UnsupportedArgument {
                    command: "/source".to_string(),
                    arg,
                })
        }
        "/mode" if arg.is_empty() => Ok(SpecialCommand::ShowModelMode),
        "/mode" => Ok(SpecialCommand::SetModelMode(arg.to_lowercase())),
        "/status" => Ok(SpecialCommand::ShowStatus),
        "/help" | "/?" => Ok(SpecialCommand::Help),
        "/exit" | "/quit" => Ok(SpecialCommand::Exit),
        other => Err(CommandError::UnknownCommand(other.to_string())),
    }
}

/// Display help text for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat Mode
===========================================

CHATS:
  /new              - Start a new chat
  /list             - List stored chats, most recent first
  /chats            - Same as /list
  /open <id>        - Open a chat and show its messages
  /delete <id>      - Delete a chat

SOURCES:
  /source rag           - Answer from the curated corpus only
  /source rag+internet  - Corpus plus web results
  /source internet      - Web results only

MODEL:
  /mode             - Show the backend model mode
  /mode <name>      - Switch the backend model mode (e.g. ollama, openai)

SESSION:
  /status           - Show the open chat and source mode
  /help             - Show this help message
  /?                - Same as /help
  exit              - Exit interactive mode
  quit              - Same as exit

NOTES:
  - Regular text (not starting with /) is sent as a question
  - Press Ctrl-C while waiting to cancel the pending question
  - A new question cancels one that is still pending
"#
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(
            parse_special_command("What is tawhid?").unwrap(),
            SpecialCommand::None
        );
        assert_eq!(parse_special_command("  ").unwrap(), SpecialCommand::None);
    }

    #[test]
    fn test_exit_aliases() {
        for input in ["exit", "QUIT", "/exit", "/quit"] {
            assert_eq!(parse_special_command(input).unwrap(), SpecialCommand::Exit);
        }
    }

    #[test]
    fn test_chat_commands() {
        assert_eq!(parse_special_command("/new").unwrap(), SpecialCommand::NewChat);
        assert_eq!(parse_special_command("/LIST").unwrap(), SpecialCommand::ListChats);
        assert_eq!(parse_special_command("/chats").unwrap(), SpecialCommand::ListChats);
    }

    #[test]
    fn test_open_keeps_id_case() {
        assert_eq!(
            parse_special_command("/Open AbC-123").unwrap(),
            SpecialCommand::OpenChat("AbC-123".to_string())
        );
    }

    #[test]
    fn test_delete_requires_id() {
        let err = parse_special_command("/delete").unwrap_err();
        assert!(matches!(err, CommandError::MissingArgument { .. }));
        assert_eq!(
            parse_special_command("/delete x1").unwrap(),
            SpecialCommand::DeleteChat("x1".to_string())
        );
    }

    #[test]
    fn test_source_switching() {
        assert_eq!(
            parse_special_command("/source rag+internet").unwrap(),
            SpecialCommand::SwitchSource(SourceMode::RagInternet)
        );
        assert_eq!(
            parse_special_command("/source RAG").unwrap(),
            SpecialCommand::SwitchSource(SourceMode::Rag)
        );
    }

    #[test]
    fn test_source_invalid_argument() {
        let err = parse_special_command("/source library").unwrap_err();
        assert_eq!(
            err,
            CommandError::UnsupportedArgument {
                command: "/source".to_string(),
                arg: "library".to_string()
            }
        );
        assert!(matches!(
            parse_special_command("/source").unwrap_err(),
            CommandError::MissingArgument { .. }
        ));
    }

    #[test]
    fn test_model_mode_commands() {
        assert_eq!(parse_special_command("/mode").unwrap(), SpecialCommand::ShowModelMode);
        assert_eq!(
            parse_special_command("/mode OpenAI").unwrap(),
            SpecialCommand::SetModelMode("openai".to_string())
        );
    }

    #[test]
    fn test_help_and_status() {
        assert_eq!(parse_special_command("/help").unwrap(), SpecialCommand::Help);
        assert_eq!(parse_special_command("/?").unwrap(), SpecialCommand::Help);
        assert_eq!(parse_special_command("/status").unwrap(), SpecialCommand::ShowStatus);
    }

    #[test]
    fn test_unknown_command() {
        let err = parse_special_command("/frobnicate now").unwrap_err();
        assert_eq!(err, CommandError::UnknownCommand("/frobnicate".to_string()));
        assert!(err.to_string().contains("/help"));
    }
}
