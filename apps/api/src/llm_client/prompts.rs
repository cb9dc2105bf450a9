// Shared prompt constants and prompt-building utilities.
// Each service that needs LLM calls defines its own prompts.rs alongside it.
// This file contains cross-cutting prompt fragments.

/// System prompt fragment that enforces JSON-only output.
pub const JSON_ONLY_SYSTEM: &str = "You are a precise, structured assistant. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Common instruction appended to every prompt that rewrites resume content.
pub const PROOF_INSTRUCTION: &str = "\
    CRITICAL: Every rewrite must be traceable to evidence quoted from the resume text. \
    If the resume does not support a claim, set needs_confirmation to true so the \
    candidate can confirm or reject the claim before using it. \
    Do NOT silently invent experience.";
