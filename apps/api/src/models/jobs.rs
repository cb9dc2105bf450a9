use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Closed vocabulary for parsed JD requirements. The same set labels
/// evidence item groups and keys the region-pack scoring weights, so the
/// three stay in sync by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequirementType {
    Skill,
    Tool,
    Responsibility,
    Softskill,
    Eligibility,
}

impl RequirementType {
    pub const ALL: [RequirementType; 5] = [
        RequirementType::Skill,
        RequirementType::Tool,
        RequirementType::Responsibility,
        RequirementType::Softskill,
        RequirementType::Eligibility,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequirementType::Skill => "skill",
            RequirementType::Tool => "tool",
            RequirementType::Responsibility => "responsibility",
            RequirementType::Softskill => "softskill",
            RequirementType::Eligibility => "eligibility",
        }
    }
}

impl FromStr for RequirementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "skill" => Ok(RequirementType::Skill),
            "tool" => Ok(RequirementType::Tool),
            "responsibility" => Ok(RequirementType::Responsibility),
            "softskill" => Ok(RequirementType::Softskill),
            "eligibility" => Ok(RequirementType::Eligibility),
            other => Err(format!("unknown requirement type '{other}'")),
        }
    }
}

impl fmt::Display for RequirementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobCardRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub company: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
}

/// Immutable text capture of a posting. A job card accumulates versions;
/// extraction always reads the newest one.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JdSnapshotRow {
    pub id: Uuid,
    pub job_card_id: Uuid,
    pub version: i32,
    pub jd_text: String,
    pub source_url: Option<String>,
    pub captured_at: DateTime<Utc>,
}

/// One parsed demand from a JD. The full set for a job card is replaced,
/// never appended to, on re-extraction.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RequirementRow {
    pub id: Uuid,
    pub job_card_id: Uuid,
    pub requirement_type: String,
    pub requirement_text: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requirement_type_round_trips_all_variants() {
        for ty in RequirementType::ALL {
            assert_eq!(ty.as_str().parse::<RequirementType>().unwrap(), ty);
        }
    }

    #[test]
    fn test_requirement_type_rejects_unknown() {
        assert!("wizardry".parse::<RequirementType>().is_err());
    }

    #[test]
    fn test_requirement_type_serde_is_lowercase() {
        let json = serde_json::to_string(&RequirementType::Softskill).unwrap();
        assert_eq!(json, "\"softskill\"");
        let back: RequirementType = serde_json::from_str("\"eligibility\"").unwrap();
        assert_eq!(back, RequirementType::Eligibility);
    }
}
