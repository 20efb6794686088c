//! Command handlers for the Ragoon CLI.

pub mod ask;
pub mod chat;
pub mod complete;
pub mod prompts;

pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use complete::CompleteCommand;
pub use prompts::PromptsCommand;

use ragoon_core::{AppError, AppResult};
use ragoon_llm::ChatMessage;
use std::io::Write;
use std::path::Path;

/// Read a conversation history file (JSON array of `{role, content}`).
pub(crate) fn load_history(path: &Path) -> AppResult<Vec<ChatMessage>> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        AppError::Config(format!("Failed to read history file {:?}: {}", path, e))
    })?;
    let history = serde_json::from_str(&contents)?;
    Ok(history)
}

/// Write a conversation history file.
pub(crate) fn save_history(path: &Path, history: &[ChatMessage]) -> AppResult<()> {
    let json = serde_json::to_string_pretty(history)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Print a fragment to stdout without a newline and flush.
pub(crate) fn print_fragment(fragment: &str) {
    print!("{}", fragment);
    std::io::stdout().flush().ok();
}
