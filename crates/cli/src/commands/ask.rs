//! Ask command handler.
//!
//! Runs one question through the RAG pipeline.

use super::{load_history, print_fragment};
use clap::Args;
use futures::StreamExt;
use ragoon_core::{config::AppConfig, AppResult};
use ragoon_rag::{QueryInput, Rag};
use std::path::PathBuf;

/// Ask a travel question, answered from retrieved context
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question; several values form one multi-part query
    #[arg(required = true, num_args = 1..)]
    pub prompt: Vec<String>,

    /// Treat the prompt as a JSON query (string, list or list of lists)
    #[arg(long)]
    pub raw_json: bool,

    /// Conversation history file (JSON array of {role, content})
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Print the answer as it is produced
    #[arg(long)]
    pub stream: bool,

    /// Output as JSON
    #[arg(long, conflicts_with = "stream")]
    pub json: bool,
}

impl AskCommand {
    /// Execute the ask command.
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        config.validate()?;
        let rag = Rag::from_config(config)?;
        tracing::debug!("Stages: {:?}", rag.stage_keys());

        let query = self.query()?;
        let history = match self.history {
            Some(ref path) => load_history(path)?,
            None => Vec::new(),
        };

        if self.stream {
            let mut stream = rag.stream_complete(query, Some(&history)).await;
            while let Some(chunk) = stream.next().await {
                print_fragment(&chunk.delta);
            }
            println!();
            return Ok(());
        }

        let answer = rag.answer(query, Some(&history)).await;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&answer)?);
        } else {
            println!("{}", answer.text);
        }

        Ok(())
    }

    fn query(&self) -> AppResult<QueryInput> {
        if self.raw_json {
            let value = serde_json::from_str(&self.prompt.join(" "))?;
            return QueryInput::from_value(&value);
        }

        Ok(match self.prompt.as_slice() {
            [single] => QueryInput::Text(single.clone()),
            many => QueryInput::List(many.to_vec()),
        })
    }
}
