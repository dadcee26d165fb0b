use crate::cli::HistoryCommand;
use crate::commands::build_backend;
use crate::config::Config;
use crate::error::Result;
use crate::render::render_message;
use crate::session::{Chat, SessionStore};
use colored::Colorize;
use prettytable::{format, Table};

/// Handle history commands
pub async fn handle_history(config: &Config, command: HistoryCommand) -> Result<()> {
    let backend = build_backend(config)?;
    let mut store =
        SessionStore::new(backend).with_title_max_chars(config.session.title_max_chars);
    store.list_chats().await;

    match command {
        HistoryCommand::List => {
            print_chat_table(store.chats(), None);
            if !store.chats().is_empty() {
                println!(
                    "Use {} to read a chat.",
                    "ragchat history show <ID>".cyan()
                );
                println!();
            }
        }
        HistoryCommand::Show { id } => {
            store.load_messages(&id).await?;
            if let Some(chat) = store.active_chat() {
                println!("\n{}\n", chat.title.bold());
            }
            for message in store.render_active() {
                println!("{}\n", render_message(&message));
            }
        }
        HistoryCommand::Delete { id } => {
            store.delete_chat(&id).await?;
            println!("{}", format!("Deleted chat {}", id).green());
        }
    }

    Ok(())
}

/// Prints chats as a table, marking the open one
pub fn print_chat_table(chats: &[Chat], active: Option<&str>) {
    if chats.is_empty() {
        println!("{}", "No chat history found.".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "".bold(),
        "ID".bold(),
        "Title".bold(),
        "Last Updated".bold()
    ]);

    for chat in chats {
        let marker = if active == Some(chat.id.as_str()) {
            "*"
        } else {
            ""
        };
        let title = if chat.persisted {
            chat.title.clone()
        } else {
            format!("{} (unsaved)", chat.title)
        };
        let updated = chat.updated_at.format("%Y-%m-%d %H:%M").to_string();

        table.add_row(prettytable::row![marker, chat.id.cyan(), title, updated]);
    }

    println!("\nChat History:");
    table.printstd();
    println!();
}
