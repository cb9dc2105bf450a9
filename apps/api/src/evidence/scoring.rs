//! Overall-score formula.
//!
//! Two weighting schemes feed a run: the model reports four category
//! scores (evidence strength, keyword coverage, formatting/ATS, role fit)
//! and the region pack carries a weight vector over requirement groups
//! (eligibility/tools/responsibilities/skills/softskills). They are
//! combined deterministically:
//!
//! ```text
//! base       = 0.45·evidence + 0.25·keyword + 0.15·formatting + 0.15·role_fit
//! coverage_g = (matched_g + 0.5·partial_g) / total_g      (1.0 when total_g = 0)
//! pack       = 100 · Σ_g weight_g · coverage_g
//! overall    = clamp(0.6·pack + 0.4·base − Σ flag.penalty, 0, 100), rounded
//! ```
//!
//! The pack side dominates because its weights are the product's regional
//! tuning knob; the model's category scores temper it with signals the
//! requirement list alone cannot see (formatting, keyword placement).
//! Eligibility flags subtract their penalties after blending.

use crate::evidence::{EligibilityFlag, ScoreBreakdown, Verdict};
use crate::models::evidence::ItemStatus;
use crate::models::jobs::RequirementType;
use crate::packs::ScoringWeights;

const BASE_EVIDENCE_WEIGHT: f64 = 0.45;
const BASE_KEYWORD_WEIGHT: f64 = 0.25;
const BASE_FORMATTING_WEIGHT: f64 = 0.15;
const BASE_ROLE_FIT_WEIGHT: f64 = 0.15;

const PACK_BLEND: f64 = 0.6;
const BASE_BLEND: f64 = 0.4;

/// Combines the breakdown, per-group coverage, pack weights, and flag
/// penalties into the single persisted score. Pure and deterministic.
pub fn compute_overall_score(
    breakdown: &ScoreBreakdown,
    verdicts: &[Verdict],
    weights: &ScoringWeights,
    flags: &[EligibilityFlag],
) -> i32 {
    let base = BASE_EVIDENCE_WEIGHT * breakdown.evidence_strength.score
        + BASE_KEYWORD_WEIGHT * breakdown.keyword_coverage.score
        + BASE_FORMATTING_WEIGHT * breakdown.formatting_ats.score
        + BASE_ROLE_FIT_WEIGHT * breakdown.role_fit.score;

    let pack: f64 = RequirementType::ALL
        .iter()
        .map(|group| weights.for_group(*group) * group_coverage(verdicts, *group))
        .sum::<f64>()
        * 100.0;

    let penalty: f64 = flags.iter().map(|f| f.penalty).sum();

    let raw = PACK_BLEND * pack + BASE_BLEND * base - penalty;
    raw.round().clamp(0.0, 100.0) as i32
}

/// Fraction of a group's requirements the resume covers, counting partial
/// matches at half weight. A group with no requirements does not drag the
/// score down.
fn group_coverage(verdicts: &[Verdict], group: RequirementType) -> f64 {
    let in_group: Vec<&Verdict> = verdicts.iter().filter(|v| v.group_type == group).collect();
    if in_group.is_empty() {
        return 1.0;
    }

    let covered: f64 = in_group
        .iter()
        .map(|v| match v.status {
            ItemStatus::Matched => 1.0,
            ItemStatus::Partial => 0.5,
            ItemStatus::Missing => 0.0,
        })
        .sum();

    covered / in_group.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evidence::{CategoryScore, EvidenceStrength};
    use uuid::Uuid;

    fn verdict(status: ItemStatus, group: RequirementType) -> Verdict {
        Verdict {
            requirement_id: Uuid::new_v4(),
            status,
            resume_proof: String::new(),
            fix: String::new(),
            rewrite_a: String::new(),
            rewrite_b: String::new(),
            why_it_matters: String::new(),
            needs_confirmation: false,
            group_type: group,
        }
    }

    fn breakdown(score: f64) -> ScoreBreakdown {
        ScoreBreakdown {
            evidence_strength: EvidenceStrength {
                score,
                explanation: String::new(),
                matched: 0,
                partial: 0,
                missing: 0,
            },
            keyword_coverage: CategoryScore {
                score,
                explanation: String::new(),
            },
            formatting_ats: CategoryScore {
                score,
                explanation: String::new(),
            },
            role_fit: CategoryScore {
                score,
                explanation: String::new(),
            },
        }
    }

    fn even_weights() -> ScoringWeights {
        ScoringWeights {
            eligibility: 0.2,
            tools: 0.2,
            responsibilities: 0.2,
            skills: 0.2,
            softskills: 0.2,
        }
    }

    #[test]
    fn test_perfect_run_scores_100() {
        let verdicts = vec![
            verdict(ItemStatus::Matched, RequirementType::Skill),
            verdict(ItemStatus::Matched, RequirementType::Eligibility),
        ];
        let score = compute_overall_score(&breakdown(100.0), &verdicts, &even_weights(), &[]);
        assert_eq!(score, 100);
    }

    #[test]
    fn test_everything_missing_scores_low() {
        let verdicts = vec![
            verdict(ItemStatus::Missing, RequirementType::Skill),
            verdict(ItemStatus::Missing, RequirementType::Tool),
            verdict(ItemStatus::Missing, RequirementType::Responsibility),
            verdict(ItemStatus::Missing, RequirementType::Softskill),
            verdict(ItemStatus::Missing, RequirementType::Eligibility),
        ];
        let score = compute_overall_score(&breakdown(0.0), &verdicts, &even_weights(), &[]);
        assert_eq!(score, 0);
    }

    #[test]
    fn test_empty_groups_count_as_covered() {
        // Only skill requirements exist and they all match; the other four
        // groups must not drag the pack side down.
        let verdicts = vec![verdict(ItemStatus::Matched, RequirementType::Skill)];
        let score = compute_overall_score(&breakdown(100.0), &verdicts, &even_weights(), &[]);
        assert_eq!(score, 100);
    }

    #[test]
    fn test_partial_counts_as_half() {
        let all_partial = vec![verdict(ItemStatus::Partial, RequirementType::Skill)];
        let all_matched = vec![verdict(ItemStatus::Matched, RequirementType::Skill)];
        let weights = ScoringWeights {
            eligibility: 0.0,
            tools: 0.0,
            responsibilities: 0.0,
            skills: 1.0,
            softskills: 0.0,
        };
        let partial_score = compute_overall_score(&breakdown(0.0), &all_partial, &weights, &[]);
        let matched_score = compute_overall_score(&breakdown(0.0), &all_matched, &weights, &[]);
        // pack side: 0.6·100·0.5 = 30 vs 0.6·100·1.0 = 60
        assert_eq!(partial_score, 30);
        assert_eq!(matched_score, 60);
    }

    #[test]
    fn test_flag_penalties_subtract() {
        let verdicts = vec![verdict(ItemStatus::Matched, RequirementType::Skill)];
        let flag = EligibilityFlag {
            rule_id: "sponsorship-mismatch".to_string(),
            title: String::new(),
            guidance: String::new(),
            penalty: 15.0,
        };
        let without = compute_overall_score(&breakdown(100.0), &verdicts, &even_weights(), &[]);
        let with =
            compute_overall_score(&breakdown(100.0), &verdicts, &even_weights(), &[flag]);
        assert_eq!(without - with, 15);
    }

    #[test]
    fn test_score_clamped_to_zero_under_heavy_penalties() {
        let verdicts = vec![verdict(ItemStatus::Missing, RequirementType::Skill)];
        let flags: Vec<EligibilityFlag> = (0..10)
            .map(|i| EligibilityFlag {
                rule_id: format!("rule-{i}"),
                title: String::new(),
                guidance: String::new(),
                penalty: 50.0,
            })
            .collect();
        let score = compute_overall_score(&breakdown(10.0), &verdicts, &even_weights(), &flags);
        assert_eq!(score, 0);
    }

    #[test]
    fn test_formula_is_deterministic() {
        let verdicts = vec![
            verdict(ItemStatus::Matched, RequirementType::Skill),
            verdict(ItemStatus::Partial, RequirementType::Tool),
            verdict(ItemStatus::Missing, RequirementType::Eligibility),
        ];
        let first = compute_overall_score(&breakdown(63.0), &verdicts, &even_weights(), &[]);
        let second = compute_overall_score(&breakdown(63.0), &verdicts, &even_weights(), &[]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_score_always_in_range() {
        for category in [0.0, 37.0, 100.0] {
            let verdicts = vec![verdict(ItemStatus::Partial, RequirementType::Softskill)];
            let score = compute_overall_score(&breakdown(category), &verdicts, &even_weights(), &[]);
            assert!((0..=100).contains(&score), "score {score} out of range");
        }
    }
}
