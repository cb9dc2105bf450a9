// All LLM prompt constants for the Evidence Scorer.

use anyhow::anyhow;

use crate::errors::AppError;
use crate::evidence::ScoringContext;
use crate::llm_client::prompts::PROOF_INSTRUCTION;

/// System prompt for evidence scoring — enforces JSON-only output.
pub const SCORING_SYSTEM: &str =
    "You are an expert ATS analyst and resume coach. \
    Judge how well a resume evidences each requirement of a job posting. \
    You MUST respond with valid JSON only. \
    Do NOT include any text outside the JSON object. \
    Do NOT use markdown code fences. \
    Do NOT include explanations or apologies.";

/// Scoring prompt template. Replace: {proof_instruction},
/// {requirements_json}, {resume_text}, {weights_json},
/// {authorization_json}, {eligibility_rules_json}
const SCORING_PROMPT_TEMPLATE: &str = r#"{proof_instruction}

Score the resume below against every requirement. Return a JSON object with this EXACT schema:
{
  "items": [
    {
      "requirement_id": "the-exact-requirement-id-uuid-from-the-list",
      "status": "matched",
      "resume_proof": "verbatim or closely paraphrased resume text that evidences the requirement, empty if none",
      "fix": "one-line change that would close the gap, empty if matched",
      "rewrite_a": "a resume bullet rewrite addressing this requirement",
      "rewrite_b": "an independently phrased alternative rewrite",
      "why_it_matters": "one line on why this requirement matters for the role",
      "needs_confirmation": false,
      "group_type": "skill"
    }
  ],
  "breakdown": {
    "evidence_strength": {"score": 0, "explanation": "", "matched": 0, "partial": 0, "missing": 0},
    "keyword_coverage": {"score": 0, "explanation": ""},
    "formatting_ats": {"score": 0, "explanation": ""},
    "role_fit": {"score": 0, "explanation": ""}
  },
  "flags": [
    {"rule_id": "rule-id-from-the-eligibility-rules", "title": "", "guidance": "", "penalty": 0}
  ]
}

HARD RULES:
1. Produce EXACTLY one item per requirement, keyed by its requirement_id — no extras, no omissions
2. status MUST be "matched", "partial", or "missing"
3. group_type MUST be one of "skill", "tool", "responsibility", "softskill", "eligibility"
4. Every category score MUST be between 0 and 100
5. matched/partial/missing counts in evidence_strength MUST agree with the item statuses
6. rewrite_a and rewrite_b must be independently phrased, not variations of one sentence
7. Set needs_confirmation to true whenever a rewrite claims something resume_proof does not support
8. Only emit a flag when an eligibility rule below genuinely applies to this candidate and posting; copy its rule_id and penalty

REQUIREMENTS (score each):
{requirements_json}

SCORING WEIGHTS for this candidate's region and track (context for role_fit):
{weights_json}

CANDIDATE WORK-AUTHORIZATION PROFILE:
{authorization_json}

ELIGIBILITY RULES to evaluate:
{eligibility_rules_json}

RESUME:
{resume_text}"#;

/// Builds the scoring prompt from the resolved context.
pub fn build_scoring_prompt(ctx: &ScoringContext) -> Result<String, AppError> {
    let requirements_json = serde_json::to_string_pretty(
        &ctx.requirements
            .iter()
            .map(|r| {
                serde_json::json!({
                    "requirement_id": r.id,
                    "requirement_type": r.requirement_type,
                    "requirement_text": r.requirement_text,
                })
            })
            .collect::<Vec<_>>(),
    )
    .map_err(|e| AppError::Internal(anyhow!("Failed to serialize requirements: {e}")))?;

    let weights_json = serde_json::to_string(&ctx.pack.weights)
        .map_err(|e| AppError::Internal(anyhow!("Failed to serialize weights: {e}")))?;

    let authorization_json = match &ctx.profile {
        Some(p) => serde_json::to_string(&serde_json::json!({
            "work_authorization": p.work_authorization,
            "needs_sponsorship": p.needs_sponsorship,
            "region": p.region,
        }))
        .map_err(|e| AppError::Internal(anyhow!("Failed to serialize profile: {e}")))?,
        None => "{}".to_string(),
    };

    let eligibility_rules_json = serde_json::to_string_pretty(&ctx.pack.eligibility_rules)
        .map_err(|e| AppError::Internal(anyhow!("Failed to serialize eligibility rules: {e}")))?;

    Ok(SCORING_PROMPT_TEMPLATE
        .replace("{proof_instruction}", PROOF_INSTRUCTION)
        .replace("{requirements_json}", &requirements_json)
        .replace("{weights_json}", &weights_json)
        .replace("{authorization_json}", &authorization_json)
        .replace("{eligibility_rules_json}", &eligibility_rules_json)
        .replace("{resume_text}", &ctx.resume.body_text))
}
