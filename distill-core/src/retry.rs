use std::time::Duration;

use rand::Rng;

use crate::{DistillError, Runnable};

const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);
const MAX_DELAY: Duration = Duration::from_secs(30);

/// Re-invokes the wrapped runnable on transient provider failures.
///
/// `max_retries` counts retries after the first attempt. Once they are used up
/// the last error is returned as is.
pub struct Retrying<R> {
    runnable: R,
    max_retries: usize,
    base_delay: Duration,
}

impl<R> Retrying<R> {
    pub fn new(runnable: R, max_retries: usize) -> Self {
        Self {
            runnable,
            max_retries,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }

    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    fn delay_for(&self, retry: usize) -> Duration {
        let exponent = u32::try_from(retry.saturating_sub(1)).unwrap_or(u32::MAX).min(16);
        let backoff = self.base_delay.saturating_mul(2u32.saturating_pow(exponent));
        let jitter_cap = u64::try_from(self.base_delay.as_millis() / 2).unwrap_or(0);
        let jitter = if jitter_cap == 0 {
            0
        } else {
            rand::thread_rng().gen_range(0..=jitter_cap)
        };
        backoff
            .saturating_add(Duration::from_millis(jitter))
            .min(MAX_DELAY)
    }
}

/// Rate limits, server errors, transport failures and timeouts are worth another try.
/// Authentication and malformed-request rejections never are, and neither is a
/// completion the provider delivered but that could not be decoded.
pub fn is_retryable(error: &DistillError) -> bool {
    match error {
        DistillError::ProviderStatus { status, .. } => *status == 429 || *status >= 500,
        DistillError::LlmProvider(_) | DistillError::Timeout(_) => true,
        _ => false,
    }
}

#[async_trait::async_trait]
impl<Input, Output, R> Runnable<Input, Output> for Retrying<R>
where
    Input: Send + Sync + Clone + 'static,
    Output: Send + 'static,
    R: Runnable<Input, Output> + Send + Sync,
{
    async fn invoke(&self, input: Input) -> Result<Output, DistillError> {
        let mut retry = 0usize;
        loop {
            match self.runnable.invoke(input.clone()).await {
                Ok(output) => return Ok(output),
                Err(error) => {
                    if !is_retryable(&error) || retry >= self.max_retries {
                        return Err(error);
                    }
                    retry += 1;
                    let delay = self.delay_for(retry);
                    tracing::debug!(
                        retry,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying transient provider failure"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}
