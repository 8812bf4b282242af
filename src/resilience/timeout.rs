use crate::{Error, Result};
use std::future::Future;
use std::time::Duration;
use tokio::time::{timeout, timeout_at, Instant};

/// Extension trait to bound futures in time
pub trait TimeoutExt<T>: Sized {
    /// Resolve within `duration` or fail with [`Error::Timeout`]
    fn with_timeout_duration(self, duration: Duration) -> impl Future<Output = Result<T>> + Send;

    /// Resolve before `deadline` or fail with [`Error::Timeout`]
    fn with_deadline(self, deadline: Instant) -> impl Future<Output = Result<T>> + Send;
}

impl<F, T> TimeoutExt<T> for F
where
    F: Future<Output = T> + Send,
    T: Send,
{
    fn with_timeout_duration(self, duration: Duration) -> impl Future<Output = Result<T>> + Send {
        async move {
            timeout(duration, self)
                .await
                .map_err(|_| Error::Timeout { timeout: duration })
        }
    }

    fn with_deadline(self, deadline: Instant) -> impl Future<Output = Result<T>> + Send {
        let budget = deadline.saturating_duration_since(Instant::now());
        async move {
            timeout_at(deadline, self)
                .await
                .map_err(|_| Error::Timeout { timeout: budget })
        }
    }
}
