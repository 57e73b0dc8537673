//! Tracks a single write issued by a view.
//!
//! The write itself runs as a spawned task; the view polls on each tick and
//! reacts when it settles (e.g. closes a dialog on success, keeps it open and
//! shows the message on failure).

use std::future::Future;
use tokio::sync::mpsc;

use crate::api::ApiError;

/// The state of a mutation
#[derive(Debug, Clone, PartialEq)]
pub enum MutationState<T> {
  Idle,
  Pending,
  Success(T),
  Error(String),
}

pub struct Mutation<T> {
  state: MutationState<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
}

impl<T> Default for Mutation<T> {
  fn default() -> Self {
    Self {
      state: MutationState::Idle,
      receiver: None,
    }
  }
}

impl<T: Send + 'static> Mutation<T> {
  pub fn new() -> Self {
    Self::default()
  }

  #[cfg(test)]
  pub fn state(&self) -> &MutationState<T> {
    &self.state
  }

  pub fn is_pending(&self) -> bool {
    matches!(self.state, MutationState::Pending)
  }

  pub fn error(&self) -> Option<&str> {
    match &self.state {
      MutationState::Error(e) => Some(e),
      _ => None,
    }
  }

  /// Run `write` in the background. Ignored while another write is pending,
  /// so writes from one view are issued strictly one after another.
  pub fn mutate<Fut>(&mut self, write: Fut) -> bool
  where
    Fut: Future<Output = Result<T, ApiError>> + Send + 'static,
  {
    if self.is_pending() {
      return false;
    }

    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = MutationState::Pending;

    tokio::spawn(async move {
      let result = write.await.map_err(|e| e.to_string());
      // Ignore send errors - the view may be gone
      let _ = tx.send(result);
    });
    true
  }

  /// Poll for the outcome of a pending write.
  ///
  /// Returns `true` if the state changed.
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(Ok(value)) => {
        self.state = MutationState::Success(value);
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        self.state = MutationState::Error(error);
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        self.state = MutationState::Error("Write was cancelled".to_string());
        self.receiver = None;
        true
      }
    }
  }

  /// Take a settled success, returning the mutation to idle.
  pub fn take_success(&mut self) -> Option<T> {
    match std::mem::replace(&mut self.state, MutationState::Idle) {
      MutationState::Success(value) => Some(value),
      other => {
        self.state = other;
        None
      }
    }
  }

  pub fn reset(&mut self) {
    self.state = MutationState::Idle;
    self.receiver = None;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use reqwest::StatusCode;
  use std::time::Duration;

  #[tokio::test]
  async fn test_mutation_success() {
    let mut mutation = Mutation::new();
    assert!(mutation.mutate(async { Ok(5) }));
    assert!(mutation.is_pending());

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(mutation.poll());
    assert_eq!(mutation.take_success(), Some(5));
    assert_eq!(mutation.state(), &MutationState::Idle);
  }

  #[tokio::test]
  async fn test_mutation_error_keeps_message() {
    let mut mutation: Mutation<()> = Mutation::new();
    mutation.mutate(async {
      Err(ApiError::Http {
        status: StatusCode::CONFLICT,
      })
    });

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(mutation.poll());
    assert!(mutation.error().unwrap().contains("409"));
    assert_eq!(mutation.take_success(), None);
    assert!(mutation.error().is_some());
  }

  #[tokio::test]
  async fn test_mutate_while_pending_is_ignored() {
    let mut mutation = Mutation::new();
    mutation.mutate(async {
      tokio::time::sleep(Duration::from_millis(50)).await;
      Ok(1)
    });
    assert!(!mutation.mutate(async { Ok(2) }));

    tokio::time::sleep(Duration::from_millis(80)).await;
    mutation.poll();
    assert_eq!(mutation.take_success(), Some(1));
  }
}
