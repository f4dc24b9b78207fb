//! Shared helpers for the control loops.

use super::error::LoopError;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Check if cancellation has been requested.
pub(crate) fn check_cancelled(token: &Option<CancellationToken>) -> Result<(), LoopError> {
    if let Some(token) = token
        && token.is_cancelled()
    {
        return Err(LoopError::Cancelled);
    }
    Ok(())
}

/// Sleep for `delay` unless cancelled first. Returns `false` on cancellation.
pub(crate) async fn sleep_or_cancel(delay: Duration, token: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(delay) => !token.is_cancelled(),
    }
}
