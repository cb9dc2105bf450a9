//! Deterministic outreach guards.
//!
//! Every rule here runs AFTER the completion call, on whatever text the
//! model produced. The model's prose is never trusted to carry contact
//! details, salutations, or tone on its own: these guards enforce the
//! guarantees regardless.

// ────────────────────────────────────────────────────────────────────────────
// Salutations
// ────────────────────────────────────────────────────────────────────────────

/// Which greeting register a message uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Email,
    Linkedin,
}

/// First whitespace-separated token of a full name, if any.
pub fn first_name(full_name: &str) -> Option<&str> {
    full_name.split_whitespace().next()
}

/// The salutation a message should open with.
pub fn compute_salutation(full_name: Option<&str>, channel: Channel) -> String {
    let first = full_name.and_then(first_name);
    match (channel, first) {
        (Channel::Email, Some(name)) => format!("Dear {name},"),
        (Channel::Email, None) => "Dear Hiring Manager,".to_string(),
        (Channel::Linkedin, Some(name)) => format!("Hi {name},"),
        (Channel::Linkedin, None) => "Hi there,".to_string(),
    }
}

/// Broken salutation fragments the model sometimes leaves when it has no
/// name to fill in. Ordered longest-first so "Dear ," wins over "Dear,".
const BROKEN_SALUTATIONS: &[&str] = &["Dear ,", "Dear,", "Hi ,", "Hi,"];

/// Replaces any broken salutation at the start of a line with the correct
/// one. Text without a broken pattern passes through untouched.
pub fn fix_salutation(text: &str, full_name: Option<&str>, channel: Channel) -> String {
    let salutation = compute_salutation(full_name, channel);

    let lines: Vec<String> = text
        .lines()
        .map(|line| {
            let trimmed = line.trim_start();
            for broken in BROKEN_SALUTATIONS {
                if let Some(rest) = trimmed.strip_prefix(broken) {
                    return format!("{salutation}{rest}");
                }
            }
            line.to_string()
        })
        .collect();

    lines.join("\n")
}

// ────────────────────────────────────────────────────────────────────────────
// Contact-detail injection
// ────────────────────────────────────────────────────────────────────────────

const EMAIL_PLACEHOLDERS: &[&str] = &["[Recruiter Email]", "[Recruiter's Email]"];

const LINKEDIN_PLACEHOLDERS: &[&str] = &[
    "[Your LinkedIn Profile URL]",
    "[LinkedIn Profile URL]",
    "[LinkedIn URL]",
];

/// Ensures the recruiter email opens with exactly one `To: {email}` line
/// when a contact email exists, and carries no `To:` line or placeholder
/// when it does not.
pub fn fix_contact_email(text: &str, email: Option<&str>) -> String {
    let body = strip_header_lines(&strip_placeholders(text, EMAIL_PLACEHOLDERS), "To:");
    match email {
        Some(email) => format!("To: {email}\n\n{}", body.trim_start()),
        None => body,
    }
}

/// Symmetric rule for the LinkedIn DM: one `LinkedIn: {url}` line when the
/// contact has a profile URL, none otherwise.
pub fn fix_linkedin_url(text: &str, url: Option<&str>) -> String {
    let body = strip_header_lines(&strip_placeholders(text, LINKEDIN_PLACEHOLDERS), "LinkedIn:");
    match url {
        Some(url) => format!("LinkedIn: {url}\n\n{}", body.trim_start()),
        None => body,
    }
}

fn strip_placeholders(text: &str, placeholders: &[&str]) -> String {
    let mut cleaned = text.to_string();
    for placeholder in placeholders {
        cleaned = cleaned.replace(placeholder, "");
    }
    tidy(&cleaned)
}

/// Drops every line that opens with the given header prefix, so the caller
/// can prepend a canonical one without ever duplicating it.
fn strip_header_lines(text: &str, prefix: &str) -> String {
    let kept: Vec<&str> = text
        .lines()
        .filter(|line| !line.trim_start().starts_with(prefix))
        .collect();
    kept.join("\n").trim_start().to_string()
}

// ────────────────────────────────────────────────────────────────────────────
// Tone sanitization
// ────────────────────────────────────────────────────────────────────────────

/// Stock phrases that read as template output. Removed phrase-level from
/// every generated field; the surrounding sentence survives.
const TONE_DENY_LIST: &[&str] = &[
    "I hope this message finds you well. ",
    "I hope this message finds you well",
    "I hope this email finds you well. ",
    "I hope this email finds you well",
    "To whom it may concern, ",
    "To whom it may concern",
    "I am writing to express my interest in ",
    "I am writing to express my interest",
    "Please do not hesitate to reach out",
    "please do not hesitate to contact me",
    "I would be thrilled at the opportunity",
    "leverage synergies",
    "think outside the box",
    "touch base",
];

/// Removes deny-listed phrases in place, case-insensitively.
pub fn sanitize_tone(text: &str) -> String {
    let mut result = text.to_string();
    for phrase in TONE_DENY_LIST {
        result = remove_phrase_ci(&result, phrase);
    }
    tidy(&result)
}

/// Case-insensitive phrase removal. Deny-list phrases are ASCII, so the
/// lowercase shadow string keeps byte offsets aligned with the original.
fn remove_phrase_ci(text: &str, phrase: &str) -> String {
    let lower_text = text.to_ascii_lowercase();
    let lower_phrase = phrase.to_ascii_lowercase();

    let mut result = String::with_capacity(text.len());
    let mut cursor = 0;
    while let Some(found) = lower_text[cursor..].find(&lower_phrase) {
        let start = cursor + found;
        result.push_str(&text[cursor..start]);
        cursor = start + lower_phrase.len();
    }
    result.push_str(&text[cursor..]);
    result
}

// ────────────────────────────────────────────────────────────────────────────
// Personalization leak scrubbing
// ────────────────────────────────────────────────────────────────────────────

/// Phrases that reveal the message was primed with personalization
/// context. Follow-ups must not leak them; offending sentences are removed
/// whole, the rest of the message survives.
const LEAK_SIGNALS: &[&str] = &[
    "i noticed",
    "your recent post",
    "your recent article",
    "i came across",
    "i saw your",
    "i read your",
];

/// Removes any sentence containing a leak signal, at sentence granularity,
/// line by line so salutation lines are never collateral damage.
pub fn scrub_personalization_leaks(text: &str) -> String {
    let lines: Vec<String> = text
        .lines()
        .map(|line| {
            let kept: Vec<String> = split_sentences(line)
                .into_iter()
                .filter(|sentence| {
                    let lower = sentence.to_ascii_lowercase();
                    !LEAK_SIGNALS.iter().any(|signal| lower.contains(signal))
                })
                .collect();
            kept.join(" ")
        })
        .collect();

    let joined: Vec<&str> = lines
        .iter()
        .map(String::as_str)
        .collect();
    tidy(&joined.join("\n"))
}

/// Splits a line into sentences on `.`, `!`, `?` boundaries, keeping the
/// terminator with its sentence.
fn split_sentences(line: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();

    for c in line.chars() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            let sentence = current.trim().to_string();
            if !sentence.is_empty() {
                sentences.push(sentence);
            }
            current = String::new();
        }
    }

    let tail = current.trim().to_string();
    if !tail.is_empty() {
        sentences.push(tail);
    }
    sentences
}

// ────────────────────────────────────────────────────────────────────────────
// Cleanup
// ────────────────────────────────────────────────────────────────────────────

/// Collapses artifacts left by in-place removals: space runs, spaces
/// before punctuation, and blank-line runs.
fn tidy(text: &str) -> String {
    let mut lines: Vec<String> = Vec::new();
    let mut blank_run = 0;

    for line in text.lines() {
        let mut cleaned = String::with_capacity(line.len());
        let mut last_space = false;
        for c in line.trim_end().chars() {
            if c == ' ' {
                if !last_space {
                    cleaned.push(c);
                }
                last_space = true;
            } else {
                if last_space && matches!(c, ',' | '.' | '!' | '?' | ';' | ':') {
                    cleaned.pop();
                }
                cleaned.push(c);
                last_space = false;
            }
        }

        if cleaned.trim().is_empty() {
            blank_run += 1;
            if blank_run <= 1 {
                lines.push(String::new());
            }
        } else {
            blank_run = 0;
            lines.push(cleaned);
        }
    }

    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    while lines.first().is_some_and(|l| l.is_empty()) {
        lines.remove(0);
    }

    lines.join("\n")
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salutation_email_without_name() {
        assert_eq!(
            compute_salutation(None, Channel::Email),
            "Dear Hiring Manager,"
        );
    }

    #[test]
    fn test_salutation_linkedin_with_full_name_uses_first() {
        assert_eq!(
            compute_salutation(Some("Jane Smith"), Channel::Linkedin),
            "Hi Jane,"
        );
    }

    #[test]
    fn test_salutation_email_with_name() {
        assert_eq!(
            compute_salutation(Some("Priya Sharma"), Channel::Email),
            "Dear Priya,"
        );
    }

    #[test]
    fn test_salutation_linkedin_without_name() {
        assert_eq!(compute_salutation(None, Channel::Linkedin), "Hi there,");
    }

    #[test]
    fn test_salutation_blank_name_falls_back() {
        assert_eq!(
            compute_salutation(Some("   "), Channel::Email),
            "Dear Hiring Manager,"
        );
    }

    #[test]
    fn test_fix_salutation_corrects_dear_space_comma() {
        let fixed = fix_salutation("Dear ,\n\nThanks for your time.", None, Channel::Email);
        assert!(fixed.starts_with("Dear Hiring Manager,"));
        assert!(!fixed.contains("Dear ,"));
    }

    #[test]
    fn test_fix_salutation_corrects_dear_comma_with_name() {
        let fixed = fix_salutation("Dear,\nbody", Some("Jane Smith"), Channel::Email);
        assert!(fixed.starts_with("Dear Jane,"));
    }

    #[test]
    fn test_fix_salutation_corrects_hi_comma_on_linkedin() {
        let fixed = fix_salutation("Hi ,\nquick note", None, Channel::Linkedin);
        assert!(fixed.starts_with("Hi there,"));
    }

    #[test]
    fn test_fix_salutation_leaves_good_text_alone() {
        let text = "Dear Sam,\n\nGreat to connect.";
        assert_eq!(fix_salutation(text, Some("Sam Lee"), Channel::Email), text);
    }

    #[test]
    fn test_fix_contact_email_prepends_to_line() {
        let fixed = fix_contact_email("Dear Jane,\n\nbody", Some("a@b.com"));
        assert!(fixed.starts_with("To: a@b.com"));
    }

    #[test]
    fn test_fix_contact_email_never_duplicates_to_line() {
        let fixed = fix_contact_email("To: old@x.com\nDear Jane,\nbody", Some("a@b.com"));
        assert!(fixed.starts_with("To: a@b.com"));
        assert_eq!(fixed.matches("To:").count(), 1);
    }

    #[test]
    fn test_fix_contact_email_without_email_has_no_to_line() {
        let fixed = fix_contact_email("To: ghost@x.com\nDear Hiring Manager,\nbody", None);
        assert!(!fixed.contains("To:"));
    }

    #[test]
    fn test_fix_contact_email_strips_placeholders_either_way() {
        let with = fix_contact_email("Reach me at [Recruiter Email] today", Some("a@b.com"));
        assert!(!with.contains("[Recruiter Email]"));
        let without = fix_contact_email("Reach me at [Recruiter's Email] today", None);
        assert!(!without.contains("[Recruiter's Email]"));
    }

    #[test]
    fn test_fix_linkedin_url_prepends_and_strips() {
        let fixed = fix_linkedin_url(
            "Hi there,\nSee [LinkedIn Profile URL] for details",
            Some("https://linkedin.com/in/jane"),
        );
        assert!(fixed.starts_with("LinkedIn: https://linkedin.com/in/jane"));
        assert!(!fixed.contains("[LinkedIn Profile URL]"));
    }

    #[test]
    fn test_fix_linkedin_url_without_url_strips_all_placeholders() {
        let fixed = fix_linkedin_url("See [Your LinkedIn Profile URL] or [LinkedIn URL]", None);
        assert!(!fixed.contains('['));
        assert!(!fixed.contains("LinkedIn:"));
    }

    #[test]
    fn test_fix_linkedin_url_never_duplicates_header() {
        let fixed = fix_linkedin_url(
            "LinkedIn: https://old.example\nHi there,",
            Some("https://linkedin.com/in/jane"),
        );
        assert_eq!(fixed.matches("LinkedIn:").count(), 1);
    }

    #[test]
    fn test_sanitize_tone_removes_phrase_not_sentence() {
        let cleaned = sanitize_tone("I hope this message finds you well. Your team ships fast.");
        assert!(!cleaned.contains("finds you well"));
        assert!(cleaned.contains("Your team ships fast."));
    }

    #[test]
    fn test_sanitize_tone_is_case_insensitive() {
        let cleaned = sanitize_tone("TO WHOM IT MAY CONCERN, here is my note.");
        assert!(!cleaned.to_ascii_lowercase().contains("to whom it may concern"));
        assert!(cleaned.contains("here is my note."));
    }

    #[test]
    fn test_sanitize_tone_keeps_clean_text() {
        let text = "Your platform work on the billing system caught my attention.";
        assert_eq!(sanitize_tone(text), text);
    }

    #[test]
    fn test_scrub_removes_leaking_sentence_only() {
        let scrubbed = scrub_personalization_leaks(
            "Just following up on my earlier note. I noticed your recent post about scaling. \
             Happy to chat this week.",
        );
        assert!(!scrubbed.contains("I noticed"));
        assert!(scrubbed.contains("Just following up on my earlier note."));
        assert!(scrubbed.contains("Happy to chat this week."));
    }

    #[test]
    fn test_scrub_preserves_salutation_line() {
        let scrubbed = scrub_personalization_leaks(
            "Dear Jane,\nI came across your talk and loved it. Checking in on my application.",
        );
        assert!(scrubbed.contains("Dear Jane,"));
        assert!(!scrubbed.contains("came across"));
        assert!(scrubbed.contains("Checking in on my application."));
    }

    #[test]
    fn test_scrub_handles_multiple_signals() {
        let scrubbed = scrub_personalization_leaks(
            "I saw your keynote. I read your blog post. Still interested in the role.",
        );
        assert_eq!(scrubbed, "Still interested in the role.");
    }

    #[test]
    fn test_split_sentences_keeps_terminators() {
        let sentences = split_sentences("One. Two! Three? Four");
        assert_eq!(sentences, vec!["One.", "Two!", "Three?", "Four"]);
    }

    #[test]
    fn test_tidy_collapses_removal_artifacts() {
        assert_eq!(tidy("Hello  ,  world  ."), "Hello, world.");
    }
}
