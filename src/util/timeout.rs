//! Timeout helper.

use std::future::Future;
use std::time::Duration;

use crate::error::ScouterError;

/// Wrap a future with a timeout.
pub async fn with_timeout<T>(
    duration: Duration,
    future: impl Future<Output = Result<T, ScouterError>>,
) -> Result<T, ScouterError> {
    match tokio::time::timeout(duration, future).await {
        Ok(result) => result,
        Err(_) => Err(ScouterError::Timeout(duration.as_millis() as u64)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn expired_future_maps_to_timeout_error() {
        let result = with_timeout(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<_, ScouterError>(())
        })
        .await;

        assert!(matches!(result, Err(ScouterError::Timeout(50))));
    }
}
