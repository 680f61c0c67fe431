//! Deadline and cancellation guard for store-backed resolutions.

use std::time::Duration;

use reservo_core::error::{ReservoError, ReservoResult};
use tokio_util::sync::CancellationToken;

/// Run `fut` under `timeout`, giving up early if `cancel` fires.
///
/// Either way the caller gets `Unavailable` and never a partial result.
pub(crate) async fn within<T, F>(
    what: &'static str,
    timeout: Duration,
    cancel: Option<&CancellationToken>,
    fut: F,
) -> ReservoResult<T>
where
    F: Future<Output = ReservoResult<T>>,
{
    let guarded = tokio::time::timeout(timeout, fut);
    let outcome = match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => {
                return Err(ReservoError::unavailable(format!("{what} cancelled")));
            }
            res = guarded => res,
        },
        None => guarded.await,
    };

    outcome.map_err(|_| ReservoError::unavailable(format!("{what} timed out after {timeout:?}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn slow_work_times_out_as_unavailable() {
        let result: ReservoResult<()> = within("slow", Duration::from_millis(10), None, async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        })
        .await;
        assert!(matches!(result, Err(ReservoError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn cancellation_wins() {
        let token = CancellationToken::new();
        token.cancel();
        let result: ReservoResult<u8> =
            within("cancelled", Duration::from_secs(5), Some(&token), async { Ok(1) }).await;
        assert!(matches!(result, Err(ReservoError::Unavailable { .. })));
    }

    #[tokio::test]
    async fn inner_errors_pass_through() {
        let result: ReservoResult<()> = within("fails", Duration::from_secs(1), None, async {
            Err(ReservoError::not_found("business", 7))
        })
        .await;
        assert!(matches!(result, Err(ReservoError::NotFound { .. })));
    }
}
