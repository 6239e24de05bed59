use async_trait::async_trait;

/// Best-effort notification channel. Delivery failures are logged by the
/// adapter, never surfaced to the caller.
#[async_trait]
pub trait NotificationPort: Send + Sync {
    async fn notify(&self, message: &str);
}
