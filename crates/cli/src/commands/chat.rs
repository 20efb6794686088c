//! Chat command handler.
//!
//! Interactive loop over stdin. The loop owns the conversation history and
//! threads it through every request.

use super::{load_history, save_history};
use clap::Args;
use ragoon_core::{config::AppConfig, AppResult};
use ragoon_rag::Rag;
use std::io::Write;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};

const EXIT_COMMANDS: [&str; 2] = ["/exit", "/quit"];

/// Start an interactive travel chat
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Resume from a history file (JSON array of {role, content})
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Write the conversation to this file on exit
    #[arg(long)]
    pub save: Option<PathBuf>,
}

impl ChatCommand {
    /// Execute the chat command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing chat command");

        config.validate()?;
        let rag = Rag::from_config(config)?;

        let mut history = match self.history {
            Some(ref path) => load_history(path)?,
            None => Vec::new(),
        };

        eprintln!("Ragoon travel chat ({}). Type /exit to leave.", rag.model());

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            eprint!("> ");
            std::io::stderr().flush().ok();

            let Some(line) = lines.next_line().await? else {
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if EXIT_COMMANDS.contains(&line) {
                break;
            }

            let reply = rag.chat(line, history).await;
            println!("{}\n", reply.response);
            history = reply.updated_history;
        }

        tracing::debug!("Chat ended after {} turns", history.len());

        if let Some(ref path) = self.save {
            save_history(path, &history)?;
            eprintln!("Conversation saved to {}", path.display());
        }

        Ok(())
    }
}
