//! Personalization context for outreach prompts.
//!
//! The block built here is injected ONLY into the completion prompt; it is
//! never persisted into the generated messages. Excerpts are hard-capped
//! so one pasted article cannot flood the prompt.

use crate::models::outreach::PersonalizationSourceRow;

/// At most this many sources contribute to one prompt, newest first.
pub const MAX_SOURCES_IN_PROMPT: usize = 3;

/// Builds the prompt context block from at most three sources. Each
/// excerpt (pasted text, or the URL when nothing was pasted) is truncated
/// to `excerpt_cap` characters, never one more.
pub fn build_personalization_block(
    sources: &[PersonalizationSourceRow],
    excerpt_cap: usize,
) -> String {
    let entries: Vec<String> = sources
        .iter()
        .take(MAX_SOURCES_IN_PROMPT)
        .filter_map(|source| {
            let excerpt = source
                .pasted_text
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .or(source.url.as_deref())?;
            let truncated: String = excerpt.chars().take(excerpt_cap).collect();
            Some(format!("- ({}) {}", source.source_type, truncated))
        })
        .collect();

    entries.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    fn source(source_type: &str, url: Option<&str>, pasted_text: Option<&str>) -> PersonalizationSourceRow {
        PersonalizationSourceRow {
            id: Uuid::new_v4(),
            job_card_id: Uuid::new_v4(),
            source_type: source_type.to_string(),
            url: url.map(str::to_string),
            pasted_text: pasted_text.map(str::to_string),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_excerpt_truncated_to_exactly_cap() {
        let long = "A".repeat(1200);
        let block = build_personalization_block(&[source("other", None, Some(&long))], 800);

        let longest_run = block
            .split(|c| c != 'A')
            .map(str::len)
            .max()
            .unwrap_or(0);
        assert_eq!(longest_run, 800);
        assert!(!block.contains(&"A".repeat(801)));
    }

    #[test]
    fn test_short_text_passes_through() {
        let block = build_personalization_block(
            &[source("company_news", None, Some("Series B announced"))],
            800,
        );
        assert!(block.contains("Series B announced"));
        assert!(block.contains("company_news"));
    }

    #[test]
    fn test_at_most_three_sources_used() {
        let sources: Vec<PersonalizationSourceRow> = (0..5)
            .map(|i| source("blog_post", None, Some(&format!("post number {i}"))))
            .collect();
        let block = build_personalization_block(&sources, 800);
        assert_eq!(block.lines().count(), 3);
        assert!(block.contains("post number 0"));
        assert!(!block.contains("post number 3"));
    }

    #[test]
    fn test_url_used_when_no_pasted_text() {
        let block = build_personalization_block(
            &[source("podcast", Some("https://pods.example/ep42"), None)],
            800,
        );
        assert!(block.contains("https://pods.example/ep42"));
    }

    #[test]
    fn test_source_without_text_or_url_skipped() {
        let block = build_personalization_block(&[source("other", None, Some("   "))], 800);
        assert!(block.is_empty());
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let text = "éclair ".repeat(300); // multi-byte chars
        let block = build_personalization_block(&[source("other", None, Some(&text))], 100);
        // Must not panic and must hold at most 100 chars of excerpt.
        let excerpt = block.strip_prefix("- (other) ").unwrap();
        assert_eq!(excerpt.chars().count(), 100);
    }
}
