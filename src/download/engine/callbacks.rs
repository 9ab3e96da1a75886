//! Callback hooks and the progress payload for a transfer.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::download::TransferError;

/// Progress callback.
pub type ProgressFn = Arc<dyn Fn(ProgressSample) + Send + Sync>;
/// Success callback, receives the final path.
pub type FinishFn = Arc<dyn Fn(&Path) + Send + Sync>;
/// Failure callback, receives the terminal error.
pub type ErrorFn = Arc<dyn Fn(&TransferError) + Send + Sync>;
/// Cancellation acknowledgement callback.
pub type CancelFn = Arc<dyn Fn() + Send + Sync>;

/// Bytes written so far and the expected total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressSample {
    /// Bytes written to the destination so far.
    pub transferred: u64,
    /// Declared body length, `None` when the server did not send one.
    pub total: Option<u64>,
}

impl ProgressSample {
    /// Completed fraction in `0.0..=1.0`, or `None` when the total is unknown.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn fraction(&self) -> Option<f64> {
        match self.total {
            Some(0) => Some(1.0),
            Some(total) => Some(self.transferred as f64 / total as f64),
            None => None,
        }
    }
}

/// Optional hooks for a transfer, one named slot per event.
///
/// Any subset may be set. When merged into a transfer, set slots replace the
/// transfer's current binding and unset slots leave it alone.
///
/// ```
/// use fetcher_core::download::TransferCallbacks;
///
/// let callbacks = TransferCallbacks::new()
///     .on_progress(|sample| println!("{} bytes", sample.transferred))
///     .on_finish(|path| println!("saved to {}", path.display()));
/// # let _ = callbacks;
/// ```
#[derive(Clone, Default)]
pub struct TransferCallbacks {
    pub(crate) progress: Option<ProgressFn>,
    pub(crate) finish: Option<FinishFn>,
    pub(crate) error: Option<ErrorFn>,
    pub(crate) cancel: Option<CancelFn>,
}

impl TransferCallbacks {
    /// Creates an empty set of hooks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the progress hook.
    #[must_use]
    pub fn on_progress(mut self, f: impl Fn(ProgressSample) + Send + Sync + 'static) -> Self {
        self.progress = Some(Arc::new(f));
        self
    }

    /// Sets the success hook.
    #[must_use]
    pub fn on_finish(mut self, f: impl Fn(&Path) + Send + Sync + 'static) -> Self {
        self.finish = Some(Arc::new(f));
        self
    }

    /// Sets the failure hook.
    #[must_use]
    pub fn on_error(mut self, f: impl Fn(&TransferError) + Send + Sync + 'static) -> Self {
        self.error = Some(Arc::new(f));
        self
    }

    /// Sets the cancellation acknowledgement hook.
    #[must_use]
    pub fn on_cancel(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.cancel = Some(Arc::new(f));
        self
    }

    /// Overwrites the slots that `other` sets.
    pub(crate) fn merge(&mut self, other: Self) {
        if other.progress.is_some() {
            self.progress = other.progress;
        }
        if other.finish.is_some() {
            self.finish = other.finish;
        }
        if other.error.is_some() {
            self.error = other.error;
        }
        if other.cancel.is_some() {
            self.cancel = other.cancel;
        }
    }
}

impl fmt::Debug for TransferCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransferCallbacks")
            .field("progress", &self.progress.is_some())
            .field("finish", &self.finish.is_some())
            .field("error", &self.error.is_some())
            .field("cancel", &self.cancel.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_is_last_write_wins_per_slot() {
        let mut bound = TransferCallbacks::new()
            .on_progress(|_| {})
            .on_cancel(|| {});
        let first_progress = bound.progress.clone();

        bound.merge(TransferCallbacks::new().on_progress(|_| {}).on_finish(|_| {}));

        assert!(bound.finish.is_some());
        assert!(bound.cancel.is_some(), "unset slot must keep its binding");
        assert!(bound.error.is_none());
        let replaced = match (&first_progress, &bound.progress) {
            (Some(old), Some(new)) => !Arc::ptr_eq(old, new),
            _ => false,
        };
        assert!(replaced, "set slot must replace the previous binding");
    }

    #[test]
    fn test_progress_fraction() {
        let half = ProgressSample {
            transferred: 50,
            total: Some(100),
        };
        assert_eq!(half.fraction(), Some(0.5));

        let unknown = ProgressSample {
            transferred: 50,
            total: None,
        };
        assert_eq!(unknown.fraction(), None);

        let empty = ProgressSample {
            transferred: 0,
            total: Some(0),
        };
        assert_eq!(empty.fraction(), Some(1.0));
    }

    #[test]
    fn test_debug_shows_bound_slots_only() {
        let callbacks = TransferCallbacks::new().on_error(|_| {});
        let rendered = format!("{callbacks:?}");
        assert!(rendered.contains("error: true"), "got {rendered}");
        assert!(rendered.contains("finish: false"), "got {rendered}");
    }
}
