//! Bounded calls into the storage manager.

use std::future::Future;
use std::time::Duration;

use crate::error::{ScaleError, ScaleResult};

/// Await a collaborator call, failing it after `limit`.
pub(crate) async fn call<T, F>(op: &'static str, limit: Duration, fut: F) -> ScaleResult<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(ScaleError::Collaborator {
            op,
            message: format!("{e:#}"),
        }),
        Err(_) => Err(ScaleError::Timeout { op, timeout: limit }),
    }
}
