pub mod format;
pub mod telegram;

use async_trait::async_trait;

use crate::error::DeliveryResult;
use crate::types::Notification;

pub use telegram::{TelegramConfig, TelegramNotifier};

/// Delivers one notification. Failures come back as values; the watcher logs
/// them and moves on.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, notification: &Notification) -> DeliveryResult;
}
