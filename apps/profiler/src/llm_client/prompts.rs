// Cross-cutting prompt fragments used by every completion call.
// Domain prompts live next to the code that builds them (see profile::prompts).

/// System message that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with a single valid JSON object only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Appended as an extra system message when a reply could not be parsed.
pub const JSON_REMINDER: &str = "Reminder: respond with strictly valid JSON that matches \
    the required structure. Do not include commentary or code fences.";
