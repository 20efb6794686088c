//! Prompt loader for YAML prompt definitions.
//!
//! A workspace can override any built-in prompt by placing
//! `.ragoon/prompts/<id>.yml` next to its config.

use crate::builtin;
use crate::types::{PromptDefinition, PromptListing, PromptSource};
use ragoon_core::{AppError, AppResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Prompt override directory, relative to the workspace root.
pub const PROMPTS_DIR: &str = ".ragoon/prompts";

/// Load a prompt definition by ID.
///
/// The workspace override wins over the built-in definition.
///
/// # Example
/// ```no_run
/// use ragoon_prompt::load_prompt;
/// use std::path::Path;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let prompt = load_prompt(Path::new("."), "rag.answer")?;
/// println!("Loaded prompt: {}", prompt.title);
/// # Ok(())
/// # }
/// ```
pub fn load_prompt(workspace_path: &Path, prompt_id: &str) -> AppResult<PromptDefinition> {
    let prompt_file = override_path(workspace_path, prompt_id);

    if prompt_file.exists() {
        tracing::debug!("Loading prompt override from: {:?}", prompt_file);

        let contents = std::fs::read_to_string(&prompt_file).map_err(|e| {
            AppError::Prompt(format!(
                "Failed to read prompt file {:?}: {}",
                prompt_file, e
            ))
        })?;

        let definition = parse_prompt(&contents, &format!("{:?}", prompt_file))?;
        if definition.id != prompt_id {
            return Err(AppError::Prompt(format!(
                "Prompt file {:?} declares id '{}', expected '{}'",
                prompt_file, definition.id, prompt_id
            )));
        }

        tracing::info!("Using workspace prompt: {} ({})", definition.id, definition.title);
        return Ok(definition);
    }

    load_builtin(prompt_id)
}

/// Load a built-in prompt definition.
pub fn load_builtin(prompt_id: &str) -> AppResult<PromptDefinition> {
    let yaml = builtin::source(prompt_id)
        .ok_or_else(|| AppError::Prompt(format!("Unknown prompt: {}", prompt_id)))?;
    parse_prompt(yaml, prompt_id)
}

/// List built-in prompts and workspace prompts, sorted by ID.
pub fn list_prompts(workspace_path: &Path) -> AppResult<Vec<PromptListing>> {
    let mut listings = BTreeMap::new();

    for id in builtin::ids() {
        let definition = load_builtin(id)?;
        listings.insert(
            id.to_string(),
            PromptListing {
                id: id.to_string(),
                title: definition.title,
                source: PromptSource::Builtin,
            },
        );
    }

    let prompts_dir = workspace_path.join(PROMPTS_DIR);
    if prompts_dir.exists() {
        for entry in walkdir::WalkDir::new(&prompts_dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() || path.extension().and_then(|s| s.to_str()) != Some("yml") {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let definition = load_prompt(workspace_path, stem)?;
            listings.insert(
                stem.to_string(),
                PromptListing {
                    id: stem.to_string(),
                    title: definition.title,
                    source: PromptSource::Workspace,
                },
            );
        }
    }

    Ok(listings.into_values().collect())
}

fn override_path(workspace_path: &Path, prompt_id: &str) -> PathBuf {
    workspace_path
        .join(PROMPTS_DIR)
        .join(format!("{}.yml", prompt_id))
}

fn parse_prompt(contents: &str, origin: &str) -> AppResult<PromptDefinition> {
    let definition: PromptDefinition = serde_yaml::from_str(contents).map_err(|e| {
        AppError::Prompt(format!("Failed to parse prompt YAML {}: {}", origin, e))
    })?;

    validate_prompt(&definition)?;
    Ok(definition)
}

/// Validate a prompt definition.
fn validate_prompt(def: &PromptDefinition) -> AppResult<()> {
    if def.id.is_empty() {
        return Err(AppError::Prompt("Prompt ID cannot be empty".to_string()));
    }

    if def.title.is_empty() {
        return Err(AppError::Prompt("Prompt title cannot be empty".to_string()));
    }

    if def.template.is_empty() {
        return Err(AppError::Prompt(
            "Prompt template cannot be empty".to_string(),
        ));
    }

    if !def.api_version.contains('.') {
        return Err(AppError::Prompt(format!(
            "Invalid apiVersion format: {}. Expected format: 'x.y'",
            def.api_version
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write_override(dir: &Path, id: &str, content: &str) -> PathBuf {
        let prompts_dir = dir.join(PROMPTS_DIR);
        fs::create_dir_all(&prompts_dir).unwrap();
        let file_path = prompts_dir.join(format!("{}.yml", id));
        fs::write(&file_path, content).unwrap();
        file_path
    }

    fn valid_yaml(id: &str) -> String {
        format!(
            r#"
id: {}
title: "Custom Prompt"
apiVersion: "1.0"
variables: [query]
template: "Custom: {{{{query}}}}"
"#,
            id
        )
    }

    #[test]
    fn test_all_builtins_parse() {
        for id in builtin::ids() {
            let def = load_builtin(id).unwrap();
            assert_eq!(def.id, id);
            assert!(!def.variables.is_empty());
        }
    }

    #[test]
    fn test_builtin_used_without_override() {
        let temp_dir = TempDir::new().unwrap();
        let def = load_prompt(temp_dir.path(), builtin::CONTROLLER).unwrap();
        assert!(def.template.contains("exactly one word"));
    }

    #[test]
    fn test_workspace_override_wins() {
        let temp_dir = TempDir::new().unwrap();
        write_override(temp_dir.path(), builtin::HYDE, &valid_yaml(builtin::HYDE));

        let def = load_prompt(temp_dir.path(), builtin::HYDE).unwrap();
        assert_eq!(def.title, "Custom Prompt");
    }

    #[test]
    fn test_override_with_mismatched_id() {
        let temp_dir = TempDir::new().unwrap();
        write_override(temp_dir.path(), builtin::HYDE, &valid_yaml("rag.other"));
        assert!(load_prompt(temp_dir.path(), builtin::HYDE).is_err());
    }

    #[test]
    fn test_load_invalid_yaml() {
        let temp_dir = TempDir::new().unwrap();
        write_override(temp_dir.path(), "invalid", "invalid: yaml: content:");
        assert!(load_prompt(temp_dir.path(), "invalid").is_err());
    }

    #[test]
    fn test_load_unknown_prompt() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_prompt(temp_dir.path(), "nonexistent").is_err());
    }

    #[test]
    fn test_list_prompts_merges_sources() {
        let temp_dir = TempDir::new().unwrap();
        write_override(temp_dir.path(), builtin::ANSWER, &valid_yaml(builtin::ANSWER));
        write_override(temp_dir.path(), "rag.extra", &valid_yaml("rag.extra"));

        let prompts = list_prompts(temp_dir.path()).unwrap();
        assert_eq!(prompts.len(), 5);

        let answer = prompts.iter().find(|p| p.id == builtin::ANSWER).unwrap();
        assert_eq!(answer.source, PromptSource::Workspace);
        let hyde = prompts.iter().find(|p| p.id == builtin::HYDE).unwrap();
        assert_eq!(hyde.source, PromptSource::Builtin);
    }
}
