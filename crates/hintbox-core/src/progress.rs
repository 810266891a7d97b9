//! Progress reporting callback used by long operations (hinting, writing,
//! fragmenting).
//!
//! The callback is fire-and-forget: its return value is never consulted and
//! it cannot alter control flow.

/// Sender for reporting progress from within long operations.
///
/// Wraps a callback that receives a human-readable label and a completion
/// fraction in `0.0..=1.0`.
pub struct ProgressSender {
    callback: Box<dyn Fn(&str, f32) + Send + Sync>,
}

impl ProgressSender {
    /// Create a new sender from the given callback.
    pub fn new(callback: impl Fn(&str, f32) + Send + Sync + 'static) -> Self {
        Self {
            callback: Box::new(callback),
        }
    }

    /// Create a no-op sender that discards all progress reports.
    pub fn noop() -> Self {
        Self {
            callback: Box::new(|_, _| {}),
        }
    }

    /// Report progress.
    pub fn send(&self, label: &str, fraction: f32) {
        (self.callback)(label, fraction);
    }
}

impl std::fmt::Debug for ProgressSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressSender").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn callback_receives_reports() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = count.clone();
        let sender = ProgressSender::new(move |label, fraction| {
            assert_eq!(label, "Writing");
            assert!((0.0..=1.0).contains(&fraction));
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        sender.send("Writing", 0.0);
        sender.send("Writing", 1.0);
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn noop_discards() {
        let sender = ProgressSender::noop();
        sender.send("anything", 0.5);
    }
}
