// Shared prompt fragments.
// Request-specific prompts live in interview/prompts.rs.

/// System prompt fragment that asks for JSON-only output.
/// Models do not always comply, which is why every reply still goes through
/// the tolerant parser.
pub const JSON_ONLY_SYSTEM: &str = "You respond with valid JSON only. \
    Do NOT include any text outside the JSON value. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";
