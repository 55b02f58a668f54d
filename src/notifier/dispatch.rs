//! Detached background tasks.
//!
//! A detached task is spawned onto the runtime and never joined on the
//! request path. Its error or panic is logged and counted here; nothing
//! propagates back to the spawner.

use futures_util::FutureExt;
use std::fmt::Display;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::notifier::Notifier;
use crate::observability::metrics;
use crate::storage::Fields;

/// Spawn `task` and absorb its outcome. Returns `true` through the handle when it succeeded.
///
/// The handle may be dropped; callers on the request path never await it.
pub fn spawn_detached<F, E>(name: &'static str, task: F) -> JoinHandle<bool>
where
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: Display + Send + 'static,
{
    tokio::spawn(async move {
        match AssertUnwindSafe(task).catch_unwind().await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                tracing::error!(task = name, error = %e, "Background task failed");
                false
            }
            Err(_) => {
                tracing::error!(task = name, "Background task panicked");
                false
            }
        }
    })
}

/// Send a new-submission notice without blocking the caller.
pub fn spawn_notification(
    notifier: Arc<dyn Notifier>,
    destination: String,
    form_name: String,
    fields: Fields,
) -> JoinHandle<bool> {
    spawn_detached("notification", async move {
        let result = notifier.notify(&destination, &form_name, &fields).await;
        metrics::record_notification(if result.is_ok() { "sent" } else { "failed" });
        if result.is_ok() {
            tracing::info!(to = %destination, form = %form_name, "Notification sent");
        }
        result
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notifier::NotifyError;
    use async_trait::async_trait;

    struct FailingNotifier;

    #[async_trait]
    impl Notifier for FailingNotifier {
        async fn notify(&self, _: &str, _: &str, _: &Fields) -> Result<(), NotifyError> {
            Err(NotifyError::Delivery("smtp unreachable".into()))
        }
    }

    #[tokio::test]
    async fn test_error_is_absorbed() {
        let handle = spawn_notification(
            Arc::new(FailingNotifier),
            "owner@example.com".into(),
            "Contact".into(),
            Fields::new(),
        );
        assert!(!handle.await.unwrap());
    }

    #[tokio::test]
    async fn test_panic_is_absorbed() {
        let handle = spawn_detached("boom", async {
            if true {
                panic!("exploded");
            }
            Ok::<(), NotifyError>(())
        });
        assert!(!handle.await.unwrap());
    }

    #[tokio::test]
    async fn test_success() {
        let handle = spawn_detached("ok", async { Ok::<(), NotifyError>(()) });
        assert!(handle.await.unwrap());
    }
}
