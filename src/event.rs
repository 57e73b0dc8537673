use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch};

/// Application events
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Terminal was resized
  Resize,
  /// A cache entry settled or was invalidated
  CacheChanged,
  /// Periodic tick for UI refresh and mutation polling
  Tick,
}

/// Event handler that merges terminal input, cache changes and a tick timer
/// into one stream consumed by the main loop.
pub struct EventHandler {
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration, mut changes: watch::Receiver<u64>) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    // Terminal polling blocks, so it gets its own thread
    let input_tx = tx.clone();
    tokio::task::spawn_blocking(move || {
      let mut last_tick = Instant::now();
      loop {
        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout).unwrap_or(false) {
          let sent = match event::read() {
            Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
              input_tx.send(Event::Key(key))
            }
            Ok(CrosstermEvent::Resize(_, _)) => input_tx.send(Event::Resize),
            _ => Ok(()),
          };
          if sent.is_err() {
            break;
          }
        }
        // Keep ticking during continuous input; the loop ends once the
        // receiver is gone
        if last_tick.elapsed() >= tick_rate {
          if input_tx.send(Event::Tick).is_err() {
            break;
          }
          last_tick = Instant::now();
        }
      }
    });

    // Forward cache change notifications
    tokio::spawn(async move {
      while changes.changed().await.is_ok() {
        if tx.send(Event::CacheChanged).is_err() {
          break;
        }
      }
    });

    Self { rx }
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
