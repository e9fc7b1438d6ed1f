// Shared prompt fragments. Each service that needs LLM calls defines its own
// prompts.rs alongside it and pulls these in.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Keeps the model from inventing experience the candidate never had.
pub const NO_FABRICATION_INSTRUCTION: &str = "\
    CRITICAL: Only use facts present in the resume text. \
    Do NOT invent employers, titles, dates, degrees, certifications or metrics. \
    Rephrasing and reordering existing facts is allowed; adding new ones is not.";
