//! Bounded retry around a [`PdfRenderer`].
//!
//! Headless browsers fail transiently (GPU process crashes, a first launch
//! that times out while the profile is created). A failed attempt is retried
//! after an exponentially growing delay; local errors are never retried.

use std::path::Path;
use std::time::Duration;

use tracing::{info, warn};

use mdpress_shared::{RenderConfig, Result};

use crate::{PdfRenderer, RenderOutcome};

#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Never below 1.
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_factor: f64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}

impl RetryPolicy {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay_ms: config.retry_initial_delay_ms,
            backoff_factor: config.retry_backoff_factor,
            max_delay_ms: config.retry_max_delay_ms,
        }
    }

    /// A single attempt.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Delay after failed attempt number `attempt` (1-based).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.saturating_sub(1) as i32;
        let base = (self.initial_delay_ms as f64) * self.backoff_factor.powi(exp);
        let delay = base.min(self.max_delay_ms as f64);
        Duration::from_millis(delay.round().max(0.0) as u64)
    }
}

/// The last outcome together with how many attempts produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetriedRender {
    pub outcome: RenderOutcome,
    pub attempts: u32,
}

/// Render, retrying failed outcomes up to the policy's attempt limit.
pub async fn render_with_retry(
    renderer: &dyn PdfRenderer,
    html: &str,
    output: &Path,
    policy: &RetryPolicy,
) -> Result<RetriedRender> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let outcome = renderer.render(html, output).await?;

        if outcome.is_success() || attempt >= max_attempts {
            if outcome.is_success() && attempt > 1 {
                info!(attempt, output = %output.display(), "render succeeded on retry");
            }
            return Ok(RetriedRender {
                outcome,
                attempts: attempt,
            });
        }

        let delay = policy.delay_for_attempt(attempt);
        warn!(
            attempt,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            outcome = ?outcome,
            "render attempt failed, retrying"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}
