//! Bounded retries with exponential backoff.
//!
//! [`with_retry`] runs an async operation until it succeeds, the error is
//! not retryable, or the retry budget is spent. [`Outcome`] classifies the
//! final result so callers branch on a tag instead of inspecting errors.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use ridgeline_core::download::DownloadError;
use ridgeline_core::settings::RetrySettings;
use tracing::debug;

/// Transport error codes treated as transient.
pub const TRANSIENT_CODES: [&str; 4] = ["ETIMEDOUT", "ECONNRESET", "EAI_AGAIN", "TRANSIENT"];

/// Predicate deciding whether an error is worth another attempt.
pub type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Retry policy for [`with_retry`].
pub struct RetryOptions<E> {
    /// Retries after the first attempt; `retries + 1` calls at most.
    pub retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Scale each delay by a uniform factor in `[0.5, 1.0]`.
    pub jitter: bool,
    pub retry_on: RetryPredicate<E>,
}

impl<E> Clone for RetryOptions<E> {
    fn clone(&self) -> Self {
        Self {
            retries: self.retries,
            base_delay: self.base_delay,
            max_delay: self.max_delay,
            jitter: self.jitter,
            retry_on: Arc::clone(&self.retry_on),
        }
    }
}

impl<E> fmt::Debug for RetryOptions<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryOptions")
            .field("retries", &self.retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .field("jitter", &self.jitter)
            .finish_non_exhaustive()
    }
}

impl<E> RetryOptions<E> {
    /// Replace the retry predicate.
    #[must_use]
    pub fn with_retry_on(mut self, retry_on: impl Fn(&E) -> bool + Send + Sync + 'static) -> Self {
        self.retry_on = Arc::new(retry_on);
        self
    }

    /// Delay before retry number `attempt + 1`, without jitter:
    /// `min(base * 2^attempt, max)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    fn delay_for(&self, attempt: u32) -> Duration {
        let delay = self.backoff_delay(attempt);
        if self.jitter {
            delay.mul_f64(rand::thread_rng().gen_range(0.5..=1.0))
        } else {
            delay
        }
    }
}

impl RetryOptions<DownloadError> {
    /// Policy from settings, retrying transient download errors.
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            retries: settings.retries,
            base_delay: Duration::from_millis(settings.base_delay_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            jitter: settings.jitter,
            retry_on: Arc::new(default_retry_on),
        }
    }
}

impl Default for RetryOptions<DownloadError> {
    fn default() -> Self {
        Self::from_settings(&RetrySettings::default())
    }
}

/// Retry errors carrying a transient code or mentioning a timeout.
pub fn default_retry_on(err: &DownloadError) -> bool {
    if err.is_control_signal() {
        return false;
    }
    if err.code().is_some_and(|code| TRANSIENT_CODES.contains(&code)) {
        return true;
    }
    err.to_string().to_ascii_lowercase().contains("timeout")
}

/// Run `operation` under `options`.
///
/// The error of the last attempt is returned unchanged. No delay follows
/// the final failure.
pub async fn with_retry<T, E, F, Fut>(options: &RetryOptions<E>, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: fmt::Display,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if attempt >= options.retries || !(options.retry_on)(&err) {
                    return Err(err);
                }
                let delay = options.delay_for(attempt);
                debug!(
                    target: "ridgeline.download",
                    attempt = attempt + 1,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "Retrying after failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Classified result of a unit of pipeline work.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    Success(T),
    /// Failed, but another attempt may succeed.
    Retryable(DownloadError),
    Cancelled,
    Paused,
    /// Failed in a way retrying cannot fix.
    Fatal(DownloadError),
}

impl<T> Outcome<T> {
    /// Classify a result with a retry predicate.
    pub fn classify(
        result: Result<T, DownloadError>,
        retry_on: impl Fn(&DownloadError) -> bool,
    ) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(DownloadError::Cancelled) => Self::Cancelled,
            Err(DownloadError::Paused) => Self::Paused,
            Err(err) if retry_on(&err) => Self::Retryable(err),
            Err(err) => Self::Fatal(err),
        }
    }
}
