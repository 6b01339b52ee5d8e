//! Opt-in retry decorator.
//!
//! The core pipeline never retries. When a caller asks for retries
//! (`max_retries > 0`) the resolved backend is wrapped here, outside the
//! extraction client, so the single-attempt contract of
//! [`crate::pipeline::extract::extract`] stays intact.
//!
//! Only transient failures are retried (see
//! [`DocNotesError::is_transient`]). Backoff doubles after each attempt:
//! with a 500 ms base and 3 retries the waits are 500 ms → 1 s → 2 s.

use crate::error::DocNotesError;
use crate::service::{ExtractionRequest, ExtractionService};
use async_trait::async_trait;
use std::sync::Arc;
use tokio::time::{sleep, Duration};
use tracing::warn;

pub struct RetryingService {
    inner: Arc<dyn ExtractionService>,
    label: String,
    max_retries: u32,
    backoff_ms: u64,
}

impl RetryingService {
    pub fn new(inner: Arc<dyn ExtractionService>, max_retries: u32, backoff_ms: u64) -> Self {
        let label = format!("{}+retry", inner.name());
        Self {
            inner,
            label,
            max_retries,
            backoff_ms,
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        Duration::from_millis(
            self.backoff_ms
                .saturating_mul(2u64.saturating_pow(attempt.saturating_sub(1))),
        )
    }
}

#[async_trait]
impl ExtractionService for RetryingService {
    fn name(&self) -> &str {
        &self.label
    }

    async fn generate(
        &self,
        request: &ExtractionRequest<'_>,
    ) -> Result<Option<String>, DocNotesError> {
        let mut attempt = 0;
        loop {
            match self.inner.generate(request).await {
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let wait = self.backoff(attempt);
                    warn!(
                        "{}: request failed ({}), retry {}/{} after {:?}",
                        self.inner.name(),
                        e,
                        attempt,
                        self.max_retries,
                        wait
                    );
                    sleep(wait).await;
                }
                other => return other,
            }
        }
    }
}
