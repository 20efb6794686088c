//! Prompts command handler.

use clap::Args;
use ragoon_core::{config::AppConfig, AppResult};
use ragoon_prompt::{list_prompts, PromptSource};

/// List built-in and workspace prompts
#[derive(Args, Debug)]
pub struct PromptsCommand {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl PromptsCommand {
    pub async fn execute(&self, config: &AppConfig) -> AppResult<()> {
        let prompts = list_prompts(&config.workspace)?;

        if self.json {
            println!("{}", serde_json::to_string_pretty(&prompts)?);
            return Ok(());
        }

        let width = prompts.iter().map(|p| p.id.len()).max().unwrap_or(0);
        for prompt in &prompts {
            let source = match prompt.source {
                PromptSource::Builtin => "builtin",
                PromptSource::Workspace => "workspace",
            };
            println!("{:width$}  {:9}  {}", prompt.id, source, prompt.title, width = width);
        }

        Ok(())
    }
}
