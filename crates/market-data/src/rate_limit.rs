use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Sliding-window rate limiter: at most `max_requests` per `window` duration.
#[derive(Clone)]
pub struct RateLimiter {
    name: &'static str,
    timestamps: Arc<Mutex<VecDeque<Instant>>>,
    max_requests: usize,
    window: Duration,
}

impl RateLimiter {
    pub fn new(name: &'static str, max_requests: usize, window: Duration) -> Self {
        Self {
            name,
            timestamps: Arc::new(Mutex::new(VecDeque::new())),
            max_requests: max_requests.max(1),
            window,
        }
    }

    pub fn per_minute(name: &'static str, max_requests: usize) -> Self {
        Self::new(name, max_requests, Duration::from_secs(60))
    }

    pub async fn acquire(&self) {
        loop {
            let mut ts = self.timestamps.lock().await;
            let now = Instant::now();

            // Remove timestamps outside the window
            while let Some(&front) = ts.front() {
                if now.duration_since(front) >= self.window {
                    ts.pop_front();
                } else {
                    break;
                }
            }

            if ts.len() < self.max_requests {
                ts.push_back(now);
                return;
            }

            // Wait until the oldest request falls out of the window
            let oldest = match ts.front() {
                Some(&front) => front,
                None => continue,
            };
            let sleep_dur = (oldest + self.window).duration_since(now) + Duration::from_millis(50);
            drop(ts);
            tracing::debug!(
                "Rate limiter: waiting {:.1}s for {} slot",
                sleep_dur.as_secs_f64(),
                self.name
            );
            tokio::time::sleep(sleep_dur).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_requests_within_limit_pass_immediately() {
        let limiter = RateLimiter::new("test", 3, Duration::from_secs(60));
        let all = async {
            limiter.acquire().await;
            limiter.acquire().await;
            limiter.acquire().await;
        };
        assert!(tokio::time::timeout(Duration::from_millis(200), all).await.is_ok());
    }

    #[tokio::test]
    async fn test_request_over_limit_waits() {
        let limiter = RateLimiter::new("test", 1, Duration::from_secs(60));
        limiter.acquire().await;
        let blocked = tokio::time::timeout(Duration::from_millis(100), limiter.acquire()).await;
        assert!(blocked.is_err());
    }

    #[tokio::test]
    async fn test_zero_limit_is_clamped() {
        let limiter = RateLimiter::per_minute("test", 0);
        let first = tokio::time::timeout(Duration::from_millis(100), limiter.acquire()).await;
        assert!(first.is_ok());
    }
}
