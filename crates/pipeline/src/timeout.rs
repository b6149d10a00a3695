//! Per-call time limit for upstream requests.

use std::future::Future;
use std::time::Duration;

use domain::{ClientError, ClientResult};

/// Run `call`, turning an elapsed `limit` into a transport error.
///
/// The underlying request is dropped, not awaited further.
pub async fn bounded<T, F>(limit: Duration, call: F) -> ClientResult<T>
where
    F: Future<Output = ClientResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(ClientError::Transport(format!("timed out after {:?}", limit))),
    }
}
