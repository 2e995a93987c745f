use std::time::{Duration, Instant};

/// Holds back input until it has been stable for a quiet interval.
///
/// The UI loop feeds every edit through [`Debouncer::push`] and calls
/// [`Debouncer::poll`] on each tick; a value is emitted once, after the full
/// interval has passed without a newer value.
#[derive(Debug)]
pub struct Debouncer {
  interval: Duration,
  pending: Option<(String, Instant)>,
  committed: String,
}

impl Debouncer {
  pub fn new(interval: Duration) -> Self {
    Self { interval, pending: None, committed: String::new() }
  }

  /// Record a new input value. A value different from the latest one restarts the timer.
  pub fn push(&mut self, value: &str, now: Instant) {
    let latest = self.pending.as_ref().map_or(self.committed.as_str(), |(v, _)| v.as_str());
    if latest == value {
      return;
    }
    self.pending = Some((value.to_string(), now + self.interval));
  }

  /// Emit the pending value if its quiet interval has elapsed.
  pub fn poll(&mut self, now: Instant) -> Option<String> {
    match self.pending.take() {
      Some((value, deadline)) if now >= deadline => {
        self.committed.clone_from(&value);
        Some(value)
      }
      other => {
        self.pending = other;
        None
      }
    }
  }

  /// Drop any pending value without emitting it.
  pub fn cancel(&mut self) {
    self.pending = None;
  }

  /// Set the value immediately, skipping the interval.
  pub fn commit_now(&mut self, value: &str) {
    self.pending = None;
    self.committed = value.to_string();
  }

  pub fn committed(&self) -> &str {
    &self.committed
  }

  /// When the pending value will be due, if any.
  pub fn next_deadline(&self) -> Option<Instant> {
    self.pending.as_ref().map(|(_, deadline)| *deadline)
  }
}
