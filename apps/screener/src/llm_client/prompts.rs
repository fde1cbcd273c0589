// Shared prompt fragments.
// Each extraction step that talks to a model defines its own prompts.rs alongside it.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Instruction that forbids inventing entities that are not in the input.
pub const VERBATIM_INSTRUCTION: &str = "\
    CRITICAL: Copy every entity exactly as it appears in the input text. \
    Do NOT normalize, translate, expand or invent entities. \
    If nothing matches a category, return an empty array for it.";
