//! Region/Track Packs — named bundles of scoring weights, tone defaults,
//! and eligibility rules keyed by country and career stage.
//!
//! Packs are resolved once per operation and injected explicitly into the
//! pipeline; no module reads pack state globally at generation time.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;

use crate::models::jobs::RequirementType;

/// Closed tone vocabulary shared by kits and outreach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Professional,
    Friendly,
    Direct,
}

impl Tone {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tone::Professional => "professional",
            Tone::Friendly => "friendly",
            Tone::Direct => "direct",
        }
    }

    /// Phrasing guidance handed to the completion prompt for this tone.
    pub fn style_hint(&self) -> &'static str {
        match self {
            Tone::Professional => {
                "Measured, polished business prose. Complete sentences, no slang."
            }
            Tone::Friendly => {
                "Warm and conversational while staying workplace-appropriate. \
                 Contractions are fine."
            }
            Tone::Direct => {
                "Short sentences, concrete claims, no preamble. Lead with the strongest fact."
            }
        }
    }
}

impl FromStr for Tone {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "professional" => Ok(Tone::Professional),
            "friendly" => Ok(Tone::Friendly),
            "direct" => Ok(Tone::Direct),
            other => Err(format!("unknown tone '{other}'")),
        }
    }
}

/// The pack's weight vector over requirement groups. Must sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub eligibility: f64,
    pub tools: f64,
    pub responsibilities: f64,
    pub skills: f64,
    pub softskills: f64,
}

impl ScoringWeights {
    /// Weight for one requirement group. Exhaustive over the closed
    /// vocabulary so a new group cannot silently score as zero.
    pub fn for_group(&self, group: RequirementType) -> f64 {
        match group {
            RequirementType::Eligibility => self.eligibility,
            RequirementType::Tool => self.tools,
            RequirementType::Responsibility => self.responsibilities,
            RequirementType::Skill => self.skills,
            RequirementType::Softskill => self.softskills,
        }
    }

    pub fn sum(&self) -> f64 {
        self.eligibility + self.tools + self.responsibilities + self.skills + self.softskills
    }

    fn validate(&self, pack_name: &str) -> Result<()> {
        let sum = self.sum();
        if (sum - 1.0).abs() > 1e-9 {
            bail!("Pack '{pack_name}' weights sum to {sum}, expected 1.0");
        }
        Ok(())
    }
}

/// One work-authorization rule evaluated by the scorer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EligibilityRule {
    pub rule_id: String,
    pub title: String,
    pub guidance: String,
    /// Points subtracted from the overall score when the rule fires.
    pub penalty: f64,
}

/// A named bundle of scoring weights, tone defaults, and eligibility rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionPack {
    pub region: String,
    pub track: String,
    pub weights: ScoringWeights,
    pub default_tone: Tone,
    pub eligibility_rules: Vec<EligibilityRule>,
}

/// Registry of built-in packs, resolved by (region, track) with a fallback.
pub struct PackRegistry {
    packs: HashMap<(String, String), RegionPack>,
    fallback: RegionPack,
}

impl PackRegistry {
    /// Builds the built-in registry. Fails fast if any pack's weight
    /// vector does not sum to 1.0.
    pub fn builtin() -> Result<Self> {
        let packs = builtin_packs();
        for pack in &packs {
            pack.weights
                .validate(&format!("{}/{}", pack.region, pack.track))?;
        }

        let fallback = packs
            .iter()
            .find(|p| p.region == "us" && p.track == "experienced")
            .cloned()
            .expect("builtin pack list must contain us/experienced");

        let mut map = HashMap::new();
        for pack in packs {
            map.insert((pack.region.clone(), pack.track.clone()), pack);
        }

        Ok(PackRegistry {
            packs: map,
            fallback,
        })
    }

    /// Resolves the pack for a profile's region and track, falling back to
    /// the default pack when no exact match exists.
    pub fn resolve(&self, region: &str, track: &str) -> &RegionPack {
        self.packs
            .get(&(region.to_string(), track.to_string()))
            .unwrap_or(&self.fallback)
    }
}

fn sponsorship_rule(penalty: f64) -> EligibilityRule {
    EligibilityRule {
        rule_id: "sponsorship-mismatch".to_string(),
        title: "Sponsorship may be required".to_string(),
        guidance: "The posting suggests no sponsorship is offered but the profile \
                   indicates sponsorship is needed. Confirm before applying."
            .to_string(),
        penalty,
    }
}

fn builtin_packs() -> Vec<RegionPack> {
    vec![
        RegionPack {
            region: "us".to_string(),
            track: "early".to_string(),
            weights: ScoringWeights {
                eligibility: 0.25,
                tools: 0.20,
                responsibilities: 0.15,
                skills: 0.30,
                softskills: 0.10,
            },
            default_tone: Tone::Friendly,
            eligibility_rules: vec![
                sponsorship_rule(15.0),
                EligibilityRule {
                    rule_id: "us-cpt-opt-window".to_string(),
                    title: "CPT/OPT timing".to_string(),
                    guidance: "Check that the role's start date fits the work-authorization \
                               window on file."
                        .to_string(),
                    penalty: 10.0,
                },
            ],
        },
        RegionPack {
            region: "us".to_string(),
            track: "experienced".to_string(),
            weights: ScoringWeights {
                eligibility: 0.15,
                tools: 0.20,
                responsibilities: 0.30,
                skills: 0.25,
                softskills: 0.10,
            },
            default_tone: Tone::Professional,
            eligibility_rules: vec![sponsorship_rule(15.0)],
        },
        RegionPack {
            region: "uk".to_string(),
            track: "experienced".to_string(),
            weights: ScoringWeights {
                eligibility: 0.20,
                tools: 0.20,
                responsibilities: 0.25,
                skills: 0.25,
                softskills: 0.10,
            },
            default_tone: Tone::Professional,
            eligibility_rules: vec![
                sponsorship_rule(15.0),
                EligibilityRule {
                    rule_id: "uk-skilled-worker-threshold".to_string(),
                    title: "Skilled Worker salary threshold".to_string(),
                    guidance: "Sponsored roles must meet the Skilled Worker visa salary \
                               threshold; flag postings below it."
                        .to_string(),
                    penalty: 10.0,
                },
            ],
        },
        RegionPack {
            region: "in".to_string(),
            track: "early".to_string(),
            weights: ScoringWeights {
                eligibility: 0.10,
                tools: 0.25,
                responsibilities: 0.15,
                skills: 0.35,
                softskills: 0.15,
            },
            default_tone: Tone::Friendly,
            eligibility_rules: vec![],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_packs_all_sum_to_one() {
        for pack in builtin_packs() {
            let sum = pack.weights.sum();
            assert!(
                (sum - 1.0).abs() < 1e-9,
                "pack {}/{} weights sum to {sum}",
                pack.region,
                pack.track
            );
        }
    }

    #[test]
    fn test_registry_builds() {
        assert!(PackRegistry::builtin().is_ok());
    }

    #[test]
    fn test_resolve_exact_match() {
        let registry = PackRegistry::builtin().unwrap();
        let pack = registry.resolve("uk", "experienced");
        assert_eq!(pack.region, "uk");
        assert_eq!(pack.track, "experienced");
    }

    #[test]
    fn test_resolve_unknown_falls_back() {
        let registry = PackRegistry::builtin().unwrap();
        let pack = registry.resolve("atlantis", "mythical");
        assert_eq!(pack.region, "us");
        assert_eq!(pack.track, "experienced");
    }

    #[test]
    fn test_weights_exhaustive_over_groups() {
        let registry = PackRegistry::builtin().unwrap();
        let weights = registry.resolve("us", "early").weights;
        let total: f64 = RequirementType::ALL
            .iter()
            .map(|g| weights.for_group(*g))
            .sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_weights_rejected() {
        let weights = ScoringWeights {
            eligibility: 0.5,
            tools: 0.5,
            responsibilities: 0.5,
            skills: 0.0,
            softskills: 0.0,
        };
        assert!(weights.validate("test").is_err());
    }

    #[test]
    fn test_tone_parses_lowercase() {
        assert_eq!("professional".parse::<Tone>().unwrap(), Tone::Professional);
        assert_eq!("friendly".parse::<Tone>().unwrap(), Tone::Friendly);
        assert_eq!("direct".parse::<Tone>().unwrap(), Tone::Direct);
        assert!("sarcastic".parse::<Tone>().is_err());
    }
}
