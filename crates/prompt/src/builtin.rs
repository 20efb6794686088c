//! Prompt definitions compiled into the binary.

/// Final grounded answer.
pub const ANSWER: &str = "rag.answer";
/// Basic-query classification gate.
pub const CONTROLLER: &str = "rag.controller";
/// Hypothetical passage generation.
pub const HYDE: &str = "rag.hyde";
/// Multi-step decomposition.
pub const DECOMPOSE: &str = "rag.decompose";

const BUILTIN: [(&str, &str); 4] = [
    (ANSWER, include_str!("../prompts/rag.answer.yml")),
    (CONTROLLER, include_str!("../prompts/rag.controller.yml")),
    (HYDE, include_str!("../prompts/rag.hyde.yml")),
    (DECOMPOSE, include_str!("../prompts/rag.decompose.yml")),
];

/// YAML source of a built-in prompt.
pub fn source(id: &str) -> Option<&'static str> {
    BUILTIN
        .iter()
        .find(|(builtin_id, _)| *builtin_id == id)
        .map(|(_, yaml)| *yaml)
}

/// IDs of all built-in prompts.
pub fn ids() -> impl Iterator<Item = &'static str> {
    BUILTIN.iter().map(|(id, _)| *id)
}
