//! Progress indicators for long-running operations
//!
//! Uses `linya` for allocation-free, concurrency-optimized progress bars

use linya::{Bar, Progress};
use std::sync::{Arc, Mutex};

/// Shared progress bar for container parsing.
///
/// Cloned into every worker; each finished container advances the bar by one.
#[derive(Clone)]
pub struct ParseProgress {
  progress: Arc<Mutex<Progress>>,
  bar: Arc<Bar>,
}

impl ParseProgress {
  /// Create a new progress bar over `total` containers
  pub fn new(total: usize, label: impl Into<String>) -> Self {
    let mut progress = Progress::new();
    let bar = progress.bar(total, label.into());
    Self {
      progress: Arc::new(Mutex::new(progress)),
      bar: Arc::new(bar),
    }
  }

  /// Increment by 1 (thread-safe)
  pub fn inc(&self) {
    // A poisoned lock only means another worker panicked mid-draw
    if let Ok(mut progress) = self.progress.lock() {
      progress.inc_and_draw(&self.bar, 1);
    }
  }
}
