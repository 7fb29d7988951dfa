use anyhow::Result;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    /// Notifications sharing a tag replace each other.
    pub tag: String,
}

/// Surface for user facing notifications.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier {
    fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Writes notifications into the application log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<()> {
        info!(
            tag = %notification.tag,
            "{}: {}", notification.title, notification.body
        );
        Ok(())
    }
}

/// Notifications are best effort. A refused or failing notifier is never an error.
pub fn notify_quietly(notifier: &dyn Notifier, notification: &Notification) {
    if let Err(e) = notifier.notify(notification) {
        debug!("Notification {:?} dropped: {e:?}", notification.tag);
    }
}
