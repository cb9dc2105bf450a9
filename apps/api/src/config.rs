use anyhow::{bail, Context, Result};

/// Refund behavior for a partially failed batch sprint.
/// The product has not settled this, so it stays configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchRefundPolicy {
    /// Refund the flat fee only when every job card in the sprint failed.
    FullOnTotalFailure,
    /// Never refund the flat fee once the sprint has started.
    NoRefund,
}

impl BatchRefundPolicy {
    fn parse(s: &str) -> Result<Self> {
        match s {
            "full_on_total_failure" => Ok(BatchRefundPolicy::FullOnTotalFailure),
            "no_refund" => Ok(BatchRefundPolicy::NoRefund),
            other => bail!("Unknown BATCH_REFUND_POLICY '{other}'"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    /// Hard cap on each personalization excerpt injected into outreach prompts.
    pub personalization_excerpt_cap: usize,
    /// Sliding-window length for per-user rate limits.
    pub rate_limit_window_secs: u64,
    /// Max metered calls per user, per operation family, per window.
    pub rate_limit_max_per_window: u32,
    pub batch_refund_policy: BatchRefundPolicy,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: require_env("DATABASE_URL")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            personalization_excerpt_cap: std::env::var("PERSONALIZATION_EXCERPT_CAP")
                .unwrap_or_else(|_| "800".to_string())
                .parse::<usize>()
                .context("PERSONALIZATION_EXCERPT_CAP must be a number")?,
            rate_limit_window_secs: std::env::var("RATE_LIMIT_WINDOW_SECS")
                .unwrap_or_else(|_| "60".to_string())
                .parse::<u64>()
                .context("RATE_LIMIT_WINDOW_SECS must be a number")?,
            rate_limit_max_per_window: std::env::var("RATE_LIMIT_MAX_PER_WINDOW")
                .unwrap_or_else(|_| "5".to_string())
                .parse::<u32>()
                .context("RATE_LIMIT_MAX_PER_WINDOW must be a number")?,
            batch_refund_policy: BatchRefundPolicy::parse(
                &std::env::var("BATCH_REFUND_POLICY")
                    .unwrap_or_else(|_| "full_on_total_failure".to_string()),
            )?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_refund_policy_parses_known_values() {
        assert_eq!(
            BatchRefundPolicy::parse("full_on_total_failure").unwrap(),
            BatchRefundPolicy::FullOnTotalFailure
        );
        assert_eq!(
            BatchRefundPolicy::parse("no_refund").unwrap(),
            BatchRefundPolicy::NoRefund
        );
    }

    #[test]
    fn test_batch_refund_policy_rejects_unknown() {
        assert!(BatchRefundPolicy::parse("refund_everything").is_err());
    }
}
