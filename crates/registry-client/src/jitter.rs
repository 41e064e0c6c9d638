use rand::Rng;
use std::time::Duration;

/// Randomized pre-request delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jitter {
    min_ms: u64,
    max_ms: u64,
}

impl Jitter {
    /// Delay drawn uniformly from `min_ms..=max_ms`; bounds are swapped if inverted.
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms: min_ms.min(max_ms),
            max_ms: max_ms.max(min_ms),
        }
    }

    /// Draw one delay.
    pub fn sample(&self) -> Duration {
        let ms = if self.min_ms == self.max_ms {
            self.min_ms
        } else {
            rand::thread_rng().gen_range(self.min_ms..=self.max_ms)
        };
        Duration::from_millis(ms)
    }

    /// Sleep for one drawn delay.
    pub async fn wait(&self) {
        let delay = self.sample();
        if !delay.is_zero() {
            tracing::trace!(?delay, "Jitter before request");
            tokio::time::sleep(delay).await;
        }
    }
}
