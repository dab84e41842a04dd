use std::{future::Future, time::Duration};

use rand::Rng;
use tokio::time::sleep;

use crate::{
    config::DownloadConfig,
    error::{Result, VidbriefError},
};

/// Substrings of tool output or API errors that indicate a retryable failure.
const TRANSIENT_PATTERNS: [&str; 13] = [
    "network",
    "timeout",
    "timed out",
    "connection",
    "temporary",
    "temporarily",
    "rate limit",
    "throttl",
    "unavailable",
    "429",
    "502",
    "503",
    "504",
];

const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Exponential backoff with jitter for flaky external tools and APIs.
///
/// Attempt `n` (0-based) waits `initial * 2^n`, capped at one minute, plus up
/// to `initial` of random jitter. Only errors classified by [`is_transient`]
/// are retried.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            initial_backoff,
        }
    }

    pub fn from_config(config: &DownloadConfig) -> Self {
        Self::new(
            config.max_retries,
            Duration::from_millis(config.initial_backoff_ms),
        )
    }

    /// Backoff before the retry that follows attempt `attempt`, without jitter.
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.initial_backoff
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(MAX_BACKOFF)
    }

    fn jittered(&self, attempt: u32) -> Duration {
        let jitter_ms = self.initial_backoff.as_millis() as u64;
        let jitter = rand::thread_rng().gen_range(0..=jitter_ms);
        self.backoff(attempt) + Duration::from_millis(jitter)
    }

    pub async fn execute<F, Fut, T>(&self, operation: &str, mut f: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(err) if attempt + 1 < self.max_attempts && is_transient(&err) => {
                    let delay = self.jittered(attempt);
                    tracing::warn!(
                        operation,
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

pub fn looks_transient(message: &str) -> bool {
    let message = message.to_lowercase();
    TRANSIENT_PATTERNS.iter().any(|p| message.contains(p))
}

pub fn is_transient(err: &VidbriefError) -> bool {
    match err {
        VidbriefError::DownloadFailed { reason, .. }
        | VidbriefError::TranscriptFailed { reason, .. }
        | VidbriefError::SummaryFailed { reason } => looks_transient(reason),
        VidbriefError::ApiError(e) => {
            e.is_timeout()
                || e.is_connect()
                || e
                    .status()
                    .is_some_and(|s| s.as_u16() == 429 || s.is_server_error())
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transient() -> VidbriefError {
        VidbriefError::DownloadFailed {
            url: "u".to_string(),
            reason: "HTTP Error 503: Service Unavailable".to_string(),
        }
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1_000));
        assert_eq!(policy.backoff(0), Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(2));
        assert_eq!(policy.backoff(2), Duration::from_secs(4));
        assert_eq!(policy.backoff(10), MAX_BACKOFF);
    }

    #[test]
    fn classifies_messages() {
        assert!(looks_transient("ERROR: Unable to download: Connection reset"));
        assert!(looks_transient("HTTP Error 429: Too Many Requests"));
        assert!(looks_transient("yt-dlp timed out after 300s"));
        assert!(!looks_transient("ERROR: [youtube] abc: Private video"));
        assert!(!looks_transient("ERROR: Sign in to confirm your age"));
        assert!(!is_transient(&VidbriefError::MissingApiKey {
            env_var: "X".to_string()
        }));
    }

    #[tokio::test]
    async fn retries_transient_errors_until_success() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1));
        let mut calls = 0;
        let result = policy
            .execute("test", || {
                calls += 1;
                let n = calls;
                async move { if n < 3 { Err(transient()) } else { Ok(n) } }
            })
            .await
            .unwrap();
        assert_eq!(result, 3);
    }

    #[tokio::test]
    async fn gives_up_after_max_attempts() {
        let policy = RetryPolicy::new(2, Duration::from_millis(1));
        let mut calls = 0;
        let result: Result<()> = policy
            .execute("test", || {
                calls += 1;
                async { Err(transient()) }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls, 2);
    }

    #[tokio::test]
    async fn permanent_errors_are_not_retried() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1));
        let mut calls = 0;
        let result: Result<()> = policy
            .execute("test", || {
                calls += 1;
                async {
                    Err(VidbriefError::DownloadFailed {
                        url: "u".to_string(),
                        reason: "ERROR: Private video".to_string(),
                    })
                }
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }
}
