use std::time::Duration;

use url::Url;

/// Fixed-interval polling with an attempt ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollDecision {
    RetryAfter(Duration),
    GiveUp,
}

impl PollPolicy {
    /// Decides what happens after `attempts` unsuccessful status fetches.
    pub fn after_attempt(&self, attempts: u32) -> PollDecision {
        if attempts < self.max_attempts {
            PollDecision::RetryAfter(self.interval)
        } else {
            PollDecision::GiveUp
        }
    }

    /// Upper bound on the time spent polling one job.
    pub fn worst_case(&self) -> Duration {
        self.interval.saturating_mul(self.max_attempts)
    }
}

/// Retry policy for loading the enhanced asset: linear backoff, bounded retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageRetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for ImageRetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageRetryDecision {
    Retry { attempt: u32, delay: Duration },
    GiveUp,
}

impl ImageRetryPolicy {
    /// `retries` is the number of retries already spent on the current asset.
    pub fn on_failure(&self, retries: u32) -> ImageRetryDecision {
        if retries < self.max_retries {
            let attempt = retries + 1;
            ImageRetryDecision::Retry {
                attempt,
                delay: self.base_delay.saturating_mul(attempt),
            }
        } else {
            ImageRetryDecision::GiveUp
        }
    }
}

/// Appends `_retry=<retry>&t=<now_ms>` to `url` for every retry (`retry > 0`).
///
/// The initial load (`retry == 0`) uses the URL unchanged. Existing query
/// parameters and fragments are preserved. Unparseable URLs get the marker
/// appended textually so a retry never reuses the cached response.
pub fn cache_busted_url(url: &str, retry: u32, now_ms: i64) -> String {
    if retry == 0 {
        return url.to_string();
    }

    match Url::parse(url) {
        Ok(mut parsed) => {
            parsed
                .query_pairs_mut()
                .append_pair("_retry", &retry.to_string())
                .append_pair("t", &now_ms.to_string());
            parsed.to_string()
        }
        Err(_) => {
            let separator = if url.contains('?') { '&' } else { '?' };
            format!("{url}{separator}_retry={retry}&t={now_ms}")
        }
    }
}

/// Limits applied when a file is offered for upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntakePolicy {
    pub max_bytes: u64,
}

impl Default for IntakePolicy {
    fn default() -> Self {
        Self {
            max_bytes: 10 * 1024 * 1024,
        }
    }
}
