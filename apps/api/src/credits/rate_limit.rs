//! Per-user, per-operation-family sliding-window rate limiter.
//!
//! Counters are in-process and approximate under concurrency, which is
//! acceptable; what is not acceptable is unbounded bypass, so the window
//! is pruned and checked under one lock.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use uuid::Uuid;

use crate::errors::AppError;

/// Operation families metered independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpFamily {
    Scan,
    Kit,
    Outreach,
    Batch,
}

pub struct RateLimiter {
    window: Duration,
    max_per_window: u32,
    hits: Mutex<HashMap<(Uuid, OpFamily), VecDeque<Instant>>>,
}

impl RateLimiter {
    pub fn new(window_secs: u64, max_per_window: u32) -> Self {
        RateLimiter {
            window: Duration::from_secs(window_secs),
            max_per_window,
            hits: Mutex::new(HashMap::new()),
        }
    }

    /// Admits the call or fails with `TOO_MANY_REQUESTS` carrying the
    /// seconds until the oldest in-window hit expires.
    pub async fn check(&self, user_id: Uuid, family: OpFamily) -> Result<(), AppError> {
        let now = Instant::now();
        let mut hits = self.hits.lock().await;
        let window = hits.entry((user_id, family)).or_default();

        while let Some(front) = window.front() {
            if now.duration_since(*front) >= self.window {
                window.pop_front();
            } else {
                break;
            }
        }

        if window.len() < self.max_per_window as usize {
            window.push_back(now);
            return Ok(());
        }

        let oldest = *window.front().expect("window is non-empty here");
        let elapsed = now.duration_since(oldest);
        let remaining = self.window.saturating_sub(elapsed);
        let retry_after_seconds = remaining.as_secs().max(1);

        Err(AppError::RateLimited {
            retry_after_seconds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_allows_up_to_max_per_window() {
        let limiter = RateLimiter::new(60, 3);
        let user = Uuid::new_v4();
        for _ in 0..3 {
            assert!(limiter.check(user, OpFamily::Scan).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_rejects_over_limit_with_retry_after() {
        let limiter = RateLimiter::new(60, 2);
        let user = Uuid::new_v4();
        limiter.check(user, OpFamily::Scan).await.unwrap();
        limiter.check(user, OpFamily::Scan).await.unwrap();

        match limiter.check(user, OpFamily::Scan).await {
            Err(AppError::RateLimited {
                retry_after_seconds,
            }) => {
                assert!(retry_after_seconds >= 1);
                assert!(retry_after_seconds <= 60);
            }
            other => panic!("expected RateLimited, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_families_are_independent() {
        let limiter = RateLimiter::new(60, 1);
        let user = Uuid::new_v4();
        limiter.check(user, OpFamily::Scan).await.unwrap();
        assert!(limiter.check(user, OpFamily::Outreach).await.is_ok());
        assert!(limiter.check(user, OpFamily::Kit).await.is_ok());
        assert!(limiter.check(user, OpFamily::Batch).await.is_ok());
    }

    #[tokio::test]
    async fn test_users_are_independent() {
        let limiter = RateLimiter::new(60, 1);
        limiter.check(Uuid::new_v4(), OpFamily::Scan).await.unwrap();
        assert!(limiter
            .check(Uuid::new_v4(), OpFamily::Scan)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_zero_window_expires_immediately() {
        let limiter = RateLimiter::new(0, 1);
        let user = Uuid::new_v4();
        limiter.check(user, OpFamily::Scan).await.unwrap();
        // Window of zero means every hit is already expired.
        assert!(limiter.check(user, OpFamily::Scan).await.is_ok());
    }
}
