// All LLM prompt constants for the Requirement Extractor.

/// System prompt for requirement extraction — enforces JSON-only output.
pub const EXTRACT_SYSTEM: &str =
    "You are an expert job description analyst. \
    Extract every concrete demand the posting makes of a candidate. \
    You MUST respond with a valid JSON array only. \
    Do NOT include any text outside the JSON array. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Extraction prompt template. Replace `{jd_text}` before sending.
pub const EXTRACT_PROMPT_TEMPLATE: &str = r#"Extract the requirements from the following job description.

Return a JSON ARRAY with this EXACT item schema (no extra fields):
[
  {"requirement_type": "skill", "requirement_text": "Python"},
  {"requirement_type": "eligibility", "requirement_text": "2+ years of professional experience"}
]

requirement_type MUST be exactly one of:
- "skill": a competency or technology the candidate must know (languages, frameworks, methods)
- "tool": a specific product or platform used on the job (Jira, Figma, Docker, Salesforce)
- "responsibility": something the candidate will do in the role
- "softskill": interpersonal or working-style expectations
- "eligibility": hard gates — years of experience, degree, location, work authorization

Rules:
- One array item per distinct demand. Split compound sentences ("Python and SQL") into separate items.
- Keep requirement_text short and concrete, in the posting's own words where possible.
- Include both required and nice-to-have demands.
- Do NOT invent demands the posting does not make.

JOB DESCRIPTION:
{jd_text}"#;
