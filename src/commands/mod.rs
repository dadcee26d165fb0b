/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint:

- `chat`   : Interactive chat session
- `ask`    : One-shot question
- `history`: List, show and delete stored chats
- `mode`   : Read or switch the backend model mode

The handlers are thin: they build an HTTP backend from configuration and
drive the session controller.
*/

use crate::backend::{ChatBackend, HttpBackend};
use crate::config::Config;
use crate::error::Result;
use std::sync::Arc;

// Chat history commands
pub mod history;

// Backend model mode commands
pub mod mode;

// Special commands parser for the interactive session
pub mod special_commands;

/// Builds the HTTP backend described by `config`
pub fn build_backend(config: &Config) -> Result<Arc<dyn ChatBackend>> {
    Ok(Arc::new(HttpBackend::new(&config.backend)?))
}

// Chat command handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Runs a readline loop that sends each line as a question through the
    //! request coordinator and prints the formatted answer. Lines starting
    //! with `/` are session commands.

    use super::*;
    use crate::commands::special_commands::{
        parse_special_command, print_help, CommandError, SpecialCommand,
    };
    use crate::render::render_message;
    use crate::session::{Coordinator, ExchangeOutcome, SourceMode};
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    /// * `source` - Optional override for the configured source mode
    ///
    /// # Examples
    ///
    /// ```
    /// use ragchat::commands::chat;
    /// use ragchat::config::Config;
    ///
    /// // In application code:
    /// // chat::run_chat(Config::default(), None).await?;
    /// ```
    pub async fn run_chat(config: Config, source: Option<SourceMode>) -> Result<()> {
        tracing::info!("Starting interactive chat mode");

        let backend = build_backend(&config)?;
        let mut coordinator = Coordinator::new(backend, &config.session);
        let mut source_mode = source.unwrap_or(config.session.default_source_mode);

        let mut rl = DefaultEditor::new()?;

        let known = coordinator.store_mut().list_chats().await.len();
        print_welcome_banner(source_mode, known);

        loop {
            let prompt = format!("[{}] >>> ", source_mode);
            match rl.readline(&prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    match parse_special_command(trimmed) {
                        Ok(SpecialCommand::None) => {}
                        Ok(SpecialCommand::Exit) => break,
                        Ok(command) => {
                            handle_special_command(&mut coordinator, &mut source_mode, command)
                                .await;
                            continue;
                        }
                        Err(e) => {
                            print_command_error(&e);
                            continue;
                        }
                    }

                    rl.add_history_entry(trimmed)?;
                    ask(&mut coordinator, trimmed, source_mode).await?;
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        coordinator.shutdown();
        println!("Goodbye!");
        Ok(())
    }

    /// Sends one question and prints the outcome
    ///
    /// Ctrl-C while waiting cancels the exchange and returns to the prompt.
    async fn ask(coordinator: &mut Coordinator, question: &str, source: SourceMode) -> Result<()> {
        let pending = coordinator.begin(question, source)?;
        println!("{}", "Thinking... (Ctrl-C to cancel)".dimmed());

        let outcome = tokio::select! {
            result = pending.send() => coordinator.finish(result),
            _ = tokio::signal::ctrl_c() => {
                coordinator.cancel_pending();
                ExchangeOutcome::Cancelled
            }
        };

        match outcome {
            ExchangeOutcome::Resolved(message) | ExchangeOutcome::Failed(message) => {
                println!("\n{}\n", render_message(&message));
            }
            ExchangeOutcome::Cancelled => println!("{}\n", "Cancelled.".yellow()),
        }
        Ok(())
    }

    async fn handle_special_command(
        coordinator: &mut Coordinator,
        source_mode: &mut SourceMode,
        command: SpecialCommand,
    ) {
        let result = match command {
            SpecialCommand::NewChat => {
                coordinator.cancel_pending();
                coordinator.store_mut().create_chat();
                println!("{}\n", "Started a new chat".green());
                Ok(())
            }
            SpecialCommand::ListChats => {
                let store = coordinator.store_mut();
                store.list_chats().await;
                history::print_chat_table(store.chats(), store.active_chat_id());
                Ok(())
            }
            SpecialCommand::OpenChat(id) => open_chat(coordinator, &id).await,
            SpecialCommand::DeleteChat(id) => delete_chat(coordinator, &id).await,
            SpecialCommand::SwitchSource(mode) => {
                let old = std::mem::replace(source_mode, mode);
                println!("Switched source from {} to {}\n", old, mode);
                Ok(())
            }
            SpecialCommand::ShowModelMode => coordinator
                .model_mode()
                .await
                .map(|mode| println!("Model mode: {}\n", mode.cyan())),
            SpecialCommand::SetModelMode(mode) => coordinator
                .set_model_mode(&mode)
                .await
                .map(|mode| println!("{}\n", format!("Model mode set to {}", mode).green())),
            SpecialCommand::ShowStatus => {
                print_status(coordinator, *source_mode);
                Ok(())
            }
            SpecialCommand::Help => {
                print_help();
                Ok(())
            }
            SpecialCommand::Exit | SpecialCommand::None => Ok(()),
        };

        if let Err(e) = result {
            eprintln!("{}\n", format!("Error: {}", e).red());
        }
    }

    /// Makes sure `id` is known locally, refreshing the list once if not
    async fn ensure_known(coordinator: &mut Coordinator, id: &str) {
        if coordinator.store().chat(id).is_none() {
            coordinator.store_mut().list_chats().await;
        }
    }

    async fn open_chat(coordinator: &mut Coordinator, id: &str) -> Result<()> {
        coordinator.cancel_pending();
        ensure_known(coordinator, id).await;
        coordinator.store_mut().load_messages(id).await?;

        let store = coordinator.store();
        if let Some(chat) = store.active_chat() {
            println!("{}\n", format!("Opened \"{}\"", chat.title).green());
        }
        for message in store.render_active() {
            println!("{}\n", render_message(&message));
        }
        Ok(())
    }

    async fn delete_chat(coordinator: &mut Coordinator, id: &str) -> Result<()> {
        ensure_known(coordinator, id).await;
        coordinator.store_mut().delete_chat(id).await?;
        println!("{}\n", format!("Deleted chat {}", id).green());
        Ok(())
    }

    fn print_command_error(error: &CommandError) {
        eprintln!("{}\n", error.to_string().red());
    }

    /// Display welcome banner at the start of interactive chat mode
    fn print_welcome_banner(source: SourceMode, known_chats: usize) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║              ragchat Interactive Chat - Welcome!             ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Source: {}", source.to_string().cyan());
        println!("Stored chats: {}\n", known_chats);
        println!("Type '/help' for available commands, 'exit' to quit\n");
    }

    /// Display the open chat and selected source mode
    fn print_status(coordinator: &Coordinator, source: SourceMode) {
        let store = coordinator.store();
        println!("\n{}", "Session Status".bold());
        println!("  Source mode:  {}", source.to_string().cyan());
        match store.active_chat() {
            Some(chat) => {
                println!("  Open chat:    {} ({})", chat.title, chat.id);
                println!("  Messages:     {}", chat.messages.len());
                println!(
                    "  Stored:       {}",
                    if chat.persisted { "yes" } else { "not yet" }
                );
            }
            None => println!("  Open chat:    none"),
        }
        println!("  Known chats:  {}\n", store.chats().len());
    }
}

// One-shot question handler
pub mod ask {
    //! Asks a single question in a fresh chat and prints the answer.

    use super::*;
    use crate::error::RagChatError;
    use crate::render::render_message;
    use crate::session::{Coordinator, ExchangeOutcome, SourceMode};

    /// Ask one question and print the formatted answer
    ///
    /// # Errors
    ///
    /// Returns an error if the backend could not answer; the synthetic
    /// error message is printed first.
    pub async fn run_ask(config: Config, question: &str, source: Option<SourceMode>) -> Result<()> {
        let backend = build_backend(&config)?;
        let mut coordinator = Coordinator::new(backend, &config.session);
        let source = source.unwrap_or(config.session.default_source_mode);

        match coordinator.submit(question, source).await? {
            ExchangeOutcome::Resolved(message) => {
                println!("{}", render_message(&message));
                if let Some(chat) = coordinator.store().active_chat() {
                    tracing::info!(chat_id = %chat.id, "Answer stored");
                }
                Ok(())
            }
            ExchangeOutcome::Failed(message) => {
                println!("{}", render_message(&message));
                Err(RagChatError::Transport("The backend could not answer".to_string()).into())
            }
            ExchangeOutcome::Cancelled => Err(RagChatError::Cancelled.into()),
        }
    }
}
