use std::future::Future;
use std::time::Duration;

/// Suspends a session loop between ticks.
pub trait Pacer: Send {
    fn tick(&mut self) -> impl Future<Output = ()> + Send;
}

/// Fixed sleep between ticks. Best effort: processing time is not subtracted.
pub struct IntervalPacer {
    period: Duration,
}

impl IntervalPacer {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Pacer for IntervalPacer {
    async fn tick(&mut self) {
        tokio::time::sleep(self.period).await;
    }
}

/// Yields to the scheduler without waiting.
pub struct ImmediatePacer;

impl Pacer for ImmediatePacer {
    async fn tick(&mut self) {
        tokio::task::yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_interval_pacer_sleeps_for_period() {
        let mut pacer = IntervalPacer::new(Duration::from_millis(33));
        let start = tokio::time::Instant::now();
        pacer.tick().await;
        assert!(start.elapsed() >= Duration::from_millis(33));
    }
}
