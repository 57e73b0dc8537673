//! Fire-and-forget user notifications.

use std::time::{Duration, Instant};
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
  Success,
  Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
  pub level: Level,
  pub message: String,
}

impl Notification {
  pub fn error(message: impl Into<String>) -> Self {
    Self {
      level: Level::Error,
      message: message.into(),
    }
  }
}

/// Sending side of the notification channel.
///
/// Sending never blocks and never fails the caller; notifications sent after
/// the receiver is gone are dropped.
#[derive(Debug, Clone)]
pub struct Notifier {
  tx: mpsc::UnboundedSender<Notification>,
}

impl Notifier {
  pub fn channel() -> (Self, mpsc::UnboundedReceiver<Notification>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Self { tx }, rx)
  }

  pub fn success(&self, message: impl Into<String>) {
    self.send(Level::Success, message.into());
  }

  pub fn error(&self, message: impl Into<String>) {
    self.send(Level::Error, message.into());
  }

  fn send(&self, level: Level, message: String) {
    // Receiver gone means the UI is shutting down
    let _ = self.tx.send(Notification { level, message });
  }
}

/// The most recent notification, shown until it expires.
#[derive(Debug, Default)]
pub struct Toast {
  current: Option<(Notification, Instant)>,
}

impl Toast {
  const TTL: Duration = Duration::from_secs(4);

  pub fn show(&mut self, notification: Notification) {
    self.current = Some((notification, Instant::now()));
  }

  /// Current notification if it has not expired yet
  pub fn current(&self) -> Option<&Notification> {
    self
      .current
      .as_ref()
      .filter(|(_, shown)| shown.elapsed() < Self::TTL)
      .map(|(n, _)| n)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_notifications_arrive_in_order() {
    let (notifier, mut rx) = Notifier::channel();
    notifier.success("Lead created");
    notifier.error("Lead rejected");

    assert_eq!(rx.try_recv().unwrap().level, Level::Success);
    let second = rx.try_recv().unwrap();
    assert_eq!(second.level, Level::Error);
    assert_eq!(second.message, "Lead rejected");
  }

  #[test]
  fn test_send_without_receiver_is_silent() {
    let (notifier, rx) = Notifier::channel();
    drop(rx);
    notifier.success("nobody listens");
  }

  #[test]
  fn test_toast_shows_latest() {
    let mut toast = Toast::default();
    assert!(toast.current().is_none());
    toast.show(Notification {
      level: Level::Success,
      message: "saved".to_string(),
    });
    assert_eq!(toast.current().unwrap().message, "saved");
  }
}
