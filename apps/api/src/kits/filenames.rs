//! Deterministic artifact filenames.
//!
//! Filenames derive purely from (user name, company, date, artifact kind);
//! the kind slug differs per category, so no two artifact kinds can ever
//! collide for the same user/company/date.

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    TailoredResume,
    CoverLetter,
    RecruiterEmail,
    LinkedinDm,
    FollowUp1,
    FollowUp2,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 6] = [
        ArtifactKind::TailoredResume,
        ArtifactKind::CoverLetter,
        ArtifactKind::RecruiterEmail,
        ArtifactKind::LinkedinDm,
        ArtifactKind::FollowUp1,
        ArtifactKind::FollowUp2,
    ];

    fn slug(&self) -> &'static str {
        match self {
            ArtifactKind::TailoredResume => "resume",
            ArtifactKind::CoverLetter => "cover-letter",
            ArtifactKind::RecruiterEmail => "recruiter-email",
            ArtifactKind::LinkedinDm => "linkedin-dm",
            ArtifactKind::FollowUp1 => "follow-up-1",
            ArtifactKind::FollowUp2 => "follow-up-2",
        }
    }
}

/// `jane-smith_acme_2026-08-07_cover-letter.txt`
pub fn artifact_filename(
    user_name: &str,
    company: &str,
    date: NaiveDate,
    kind: ArtifactKind,
) -> String {
    format!(
        "{}_{}_{}_{}.txt",
        slugify(user_name),
        slugify(company),
        date.format("%Y-%m-%d"),
        kind.slug()
    )
}

/// Lowercased alphanumeric runs joined by single dashes. Never empty.
fn slugify(input: &str) -> String {
    let mut slug = String::with_capacity(input.len());
    let mut pending_dash = false;

    for c in input.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }

    if slug.is_empty() {
        "unnamed".to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 8, 7).unwrap()
    }

    #[test]
    fn test_filename_shape() {
        let name = artifact_filename("Jane Smith", "Acme Corp", date(), ArtifactKind::CoverLetter);
        assert_eq!(name, "jane-smith_acme-corp_2026-08-07_cover-letter.txt");
    }

    #[test]
    fn test_no_collisions_across_kinds() {
        let names: HashSet<String> = ArtifactKind::ALL
            .iter()
            .map(|kind| artifact_filename("Jane Smith", "Acme", date(), *kind))
            .collect();
        assert_eq!(names.len(), ArtifactKind::ALL.len());
    }

    #[test]
    fn test_same_inputs_same_filename() {
        let a = artifact_filename("Jane", "Acme", date(), ArtifactKind::TailoredResume);
        let b = artifact_filename("Jane", "Acme", date(), ArtifactKind::TailoredResume);
        assert_eq!(a, b);
    }

    #[test]
    fn test_slugify_strips_punctuation() {
        assert_eq!(slugify("O'Brien & Co.!"), "o-brien-co");
    }

    #[test]
    fn test_slugify_collapses_whitespace_runs() {
        assert_eq!(slugify("  Jane   Q.  Smith "), "jane-q-smith");
    }

    #[test]
    fn test_slugify_never_empty() {
        assert_eq!(slugify("!!!"), "unnamed");
        assert_eq!(slugify(""), "unnamed");
    }
}
