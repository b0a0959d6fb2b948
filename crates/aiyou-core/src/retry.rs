use crate::config::RetryConfig;
use crate::error::AiYouError;
use crate::utils::debug::debug_log;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Share of the delay added or removed at random
const JITTER_FACTOR: f64 = 0.3;

/// Delay before retry number `attempt` (1-based): `retry_delay * 2^(attempt-1)`,
/// capped at `max_delay`, then shifted by up to ±30%.
pub fn retry_delay<R: Rng>(attempt: u32, config: &RetryConfig, rng: &mut R) -> Duration {
    let exponent = attempt.saturating_sub(1).min(31);
    let delay = config
        .retry_delay
        .saturating_mul(1u32 << exponent)
        .min(config.max_delay);

    let base = delay.as_secs_f64();
    let jitter_range = base * JITTER_FACTOR;
    let jitter = rng.gen_range(-jitter_range..=jitter_range);

    Duration::from_secs_f64((base + jitter).max(0.0))
}

/// Whether a failed attempt should be sent again.
///
/// Besides retryable transport/API failures this covers bodies that could
/// not be decoded.
pub fn should_retry(error: &AiYouError) -> bool {
    error.is_retryable() || matches!(error, AiYouError::Serialization { .. })
}

/// Runs `operation` until it succeeds, fails with a non-retryable error, or
/// the attempts allowed by `config` are used up.
pub async fn run_with_retry<T, F, Fut>(
    config: Option<&RetryConfig>,
    debug: bool,
    mut operation: F,
) -> Result<T, AiYouError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AiYouError>>,
{
    let max_retries = config.map_or(0, |c| c.max_retries);
    let mut rng = config.map(RetryConfig::jitter_rng);
    debug_log!(debug, "Starting request with max retries: {max_retries}");

    let mut last_error = None;
    for attempt in 0..=max_retries {
        if attempt > 0 {
            if let (Some(config), Some(rng)) = (config, rng.as_mut()) {
                let delay = retry_delay(attempt, config, rng);
                debug_log!(
                    debug,
                    "Retry attempt {attempt}/{max_retries}, waiting {delay:?}"
                );
                tokio::time::sleep(delay).await;
            }
        }

        match operation().await {
            Ok(value) => return Ok(value),
            Err(e) if should_retry(&e) => {
                debug_log!(debug, "Attempt {} failed: {e}", attempt + 1);
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    match last_error {
        Some(e) => Err(AiYouError::retries_exhausted(max_retries + 1, e)),
        None => Err(AiYouError::network("Request was never attempted")),
    }
}
