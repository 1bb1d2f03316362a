//! Read-only remote stores the certificate updater depends on.
//!
//! The parameter store holds the certificate configuration document and the
//! object store holds the certificate bundles, keyed by content hash.

pub mod memory;

#[cfg(feature = "aws")]
pub mod aws;

use async_trait::async_trait;
use rust_common::PlatformError;
use std::future::Future;
use tokio_util::sync::CancellationToken;

pub use memory::{MemoryObjectStore, MemoryParameterStore};

/// Remote parameter store.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Fetch the current value of a parameter.
    async fn get_parameter(&self, name: &str) -> Result<String, PlatformError>;
}

/// Remote object store.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the bytes stored under `key` in `bucket`.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>, PlatformError>;
}

/// Run a store call unless `cancel` fires first.
///
/// The token is checked before the call starts, so an already cancelled
/// caller never reaches the network.
///
/// # Errors
///
/// Returns [`PlatformError::Cancelled`] on cancellation, otherwise the
/// call's own result.
pub async fn cancellable<T, F>(cancel: &CancellationToken, call: F) -> Result<T, PlatformError>
where
    F: Future<Output = Result<T, PlatformError>>,
{
    if cancel.is_cancelled() {
        return Err(PlatformError::Cancelled);
    }

    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(PlatformError::Cancelled),
        result = call => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_cancelled_before_start_never_polls() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let started = AtomicBool::new(false);

        let result = cancellable(&cancel, async {
            started.store(true, Ordering::SeqCst);
            Ok::<_, PlatformError>(1)
        })
        .await;

        assert!(matches!(result, Err(PlatformError::Cancelled)));
        assert!(!started.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_cancel_during_call() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            trigger.cancel();
        });

        let result = cancellable(&cancel, async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok::<_, PlatformError>(())
        })
        .await;

        assert!(matches!(result, Err(PlatformError::Cancelled)));
    }

    #[tokio::test]
    async fn test_passes_through_result() {
        let cancel = CancellationToken::new();
        let ok = cancellable(&cancel, async { Ok::<_, PlatformError>("value") }).await;
        assert_eq!(ok.unwrap(), "value");

        let err = cancellable(&cancel, async {
            Err::<(), _>(PlatformError::not_found("x"))
        })
        .await;
        assert!(matches!(err, Err(PlatformError::NotFound(_))));
    }
}
