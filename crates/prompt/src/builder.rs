//! Prompt rendering.
//!
//! [`PromptLibrary`] compiles every prompt the pipeline needs once, at
//! construction, so a broken override fails at startup rather than in the
//! middle of a request.

use crate::builtin;
use crate::loader::{load_builtin, load_prompt};
use crate::types::{PromptDefinition, RenderedPrompt};
use handlebars::Handlebars;
use ragoon_core::{AppError, AppResult};
use std::collections::HashMap;
use std::path::Path;

/// Compiled prompt templates, keyed by prompt ID.
pub struct PromptLibrary {
    registry: Handlebars<'static>,
    definitions: HashMap<String, PromptDefinition>,
}

impl PromptLibrary {
    /// Library of the built-in prompts only.
    pub fn builtin() -> AppResult<Self> {
        let definitions = builtin::ids()
            .map(load_builtin)
            .collect::<AppResult<Vec<_>>>()?;
        Self::from_definitions(definitions)
    }

    /// Library of the built-in prompt IDs, honoring workspace overrides.
    pub fn load(workspace_path: &Path) -> AppResult<Self> {
        let definitions = builtin::ids()
            .map(|id| load_prompt(workspace_path, id))
            .collect::<AppResult<Vec<_>>>()?;
        Self::from_definitions(definitions)
    }

    /// Compile an explicit set of definitions.
    pub fn from_definitions(definitions: Vec<PromptDefinition>) -> AppResult<Self> {
        let mut registry = Handlebars::new();

        // Plain text, not HTML
        registry.register_escape_fn(handlebars::no_escape);
        registry.set_strict_mode(true);

        let mut by_id = HashMap::new();
        for definition in definitions {
            registry
                .register_template_string(&definition.id, &definition.template)
                .map_err(|e| {
                    AppError::Prompt(format!(
                        "Failed to register template '{}': {}",
                        definition.id, e
                    ))
                })?;
            by_id.insert(definition.id.clone(), definition);
        }

        Ok(Self {
            registry,
            definitions: by_id,
        })
    }

    pub fn definition(&self, prompt_id: &str) -> Option<&PromptDefinition> {
        self.definitions.get(prompt_id)
    }

    /// Render a prompt with the given variables.
    ///
    /// Every variable the definition declares must be present.
    pub fn render(
        &self,
        prompt_id: &str,
        variables: &HashMap<String, String>,
    ) -> AppResult<RenderedPrompt> {
        let definition = self
            .definition(prompt_id)
            .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", prompt_id)))?;

        if let Some(missing) = definition
            .variables
            .iter()
            .find(|name| !variables.contains_key(name.as_str()))
        {
            return Err(AppError::Prompt(format!(
                "Prompt '{}' requires variable '{}'",
                prompt_id, missing
            )));
        }

        let text = self
            .registry
            .render(prompt_id, variables)
            .map_err(|e| AppError::Prompt(format!("Failed to render '{}': {}", prompt_id, e)))?;

        tracing::trace!("Rendered prompt '{}' ({} chars)", prompt_id, text.len());

        Ok(RenderedPrompt {
            prompt_id: prompt_id.to_string(),
            text,
            temperature: definition.temperature,
        })
    }
}

/// Build a variable map from `(name, value)` pairs.
pub fn vars<const N: usize>(pairs: [(&str, String); N]) -> HashMap<String, String> {
    pairs
        .into_iter()
        .map(|(name, value)| (name.to_string(), value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::PROMPTS_DIR;
    use tempfile::TempDir;

    fn definition(id: &str, template: &str, variables: &[&str]) -> PromptDefinition {
        PromptDefinition {
            id: id.to_string(),
            title: "Test".to_string(),
            api_version: "1.0".to_string(),
            created_by: "test".to_string(),
            variables: variables.iter().map(|v| v.to_string()).collect(),
            temperature: Some(0.5),
            template: template.to_string(),
        }
    }

    #[test]
    fn test_render_simple_template() {
        let library =
            PromptLibrary::from_definitions(vec![definition("t", "Q: {{query}}", &["query"])])
                .unwrap();

        let rendered = library
            .render("t", &vars([("query", "Is Hue worth a day trip?".to_string())]))
            .unwrap();
        assert_eq!(rendered.text, "Q: Is Hue worth a day trip?");
        assert_eq!(rendered.temperature, Some(0.5));
    }

    #[test]
    fn test_no_html_escaping() {
        let library =
            PromptLibrary::from_definitions(vec![definition("t", "{{query}}", &["query"])])
                .unwrap();

        let rendered = library
            .render("t", &vars([("query", "Fish & chips <London>".to_string())]))
            .unwrap();
        assert_eq!(rendered.text, "Fish & chips <London>");
    }

    #[test]
    fn test_missing_variable_is_error() {
        let library =
            PromptLibrary::from_definitions(vec![definition("t", "{{query}}", &["query"])])
                .unwrap();
        assert!(library.render("t", &HashMap::new()).is_err());
    }

    #[test]
    fn test_invalid_template_fails_at_construction() {
        let result = PromptLibrary::from_definitions(vec![definition("t", "{{#if x}}", &[])]);
        assert!(result.is_err());
    }

    #[test]
    fn test_builtin_answer_includes_history_only_when_present() {
        let library = PromptLibrary::builtin().unwrap();

        let without = library
            .render(
                builtin::ANSWER,
                &vars([
                    ("history", String::new()),
                    ("context", "Pho Thin is on Lo Duc street.".to_string()),
                    ("question", "Where should I eat in Hanoi?".to_string()),
                ]),
            )
            .unwrap();
        assert!(without.text.contains("tourism and travel"));
        assert!(without.text.contains("Pho Thin is on Lo Duc street."));
        assert!(without.text.contains("Where should I eat in Hanoi?"));
        assert!(!without.text.contains("Conversation so far"));

        let with = library
            .render(
                builtin::ANSWER,
                &vars([
                    ("history", "user: hi".to_string()),
                    ("context", "None".to_string()),
                    ("question", "And in Hue?".to_string()),
                ]),
            )
            .unwrap();
        assert!(with.text.contains("Conversation so far"));
        assert!(with.text.contains("user: hi"));
    }

    #[test]
    fn test_load_uses_workspace_override() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join(PROMPTS_DIR);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(
            dir.join("rag.hyde.yml"),
            "id: rag.hyde\ntitle: Short\napiVersion: \"1.0\"\nvariables: [query]\ntemplate: \"Guide entry for {{query}}\"\n",
        )
        .unwrap();

        let library = PromptLibrary::load(temp.path()).unwrap();
        let rendered = library
            .render(builtin::HYDE, &vars([("query", "Da Lat".to_string())]))
            .unwrap();
        assert_eq!(rendered.text, "Guide entry for Da Lat");
    }
}
