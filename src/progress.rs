//! Progress-callback trait for per-page extraction events.
//!
//! Inject an [`Arc<dyn SheetProgressCallback>`] via
//! [`crate::config::SheetConfigBuilder::progress_callback`] to receive
//! events as the run fetches each distribution page.
//!
//! # Example
//!
//! ```rust
//! use distsheet::{SheetConfig, SheetProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     completed: AtomicUsize,
//! }
//!
//! impl SheetProgressCallback for CountingCallback {
//!     fn on_page_complete(&self, identifier: &str, position: usize, total: usize) {
//!         self.completed.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("{} ({}/{}) done", identifier, position + 1, total);
//!     }
//! }
//!
//! let config = SheetConfig::builder()
//!     .progress_callback(Arc::new(CountingCallback { completed: AtomicUsize::new(0) }))
//!     .build()
//!     .unwrap();
//! ```

use std::sync::Arc;

/// Called by the run as it processes each page.
///
/// Pages are fetched concurrently unless the run is sequential, so the
/// per-page methods may be called from several tasks at once.
/// Implementations must protect shared mutable state.
pub trait SheetProgressCallback: Send + Sync {
    /// Called once after the outline is known, before any page is fetched.
    fn on_run_start(&self, total_pages: usize) {
        let _ = total_pages;
    }

    /// Called just before a page is requested.
    ///
    /// `position` is the page's 0-based index in outline order.
    fn on_page_start(&self, identifier: &str, position: usize, total_pages: usize) {
        let _ = (identifier, position, total_pages);
    }

    /// Called when a page produced a record.
    fn on_page_complete(&self, identifier: &str, position: usize, total_pages: usize) {
        let _ = (identifier, position, total_pages);
    }

    /// Called when a page produced no record.
    fn on_page_error(&self, identifier: &str, position: usize, total_pages: usize, error: &str) {
        let _ = (identifier, position, total_pages, error);
    }

    /// Called once after every page has been attempted.
    fn on_run_complete(&self, total_pages: usize, success_count: usize) {
        let _ = (total_pages, success_count);
    }
}

/// A no-op implementation, used when no callback is configured.
pub struct NoopProgressCallback;

impl SheetProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::SheetConfig`].
pub type ProgressCallback = Arc<dyn SheetProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: Mutex<Vec<String>>,
        started_total: AtomicUsize,
        completed_total: AtomicUsize,
    }

    impl SheetProgressCallback for TrackingCallback {
        fn on_run_start(&self, total_pages: usize) {
            self.started_total.store(total_pages, Ordering::SeqCst);
        }

        fn on_page_start(&self, _identifier: &str, _position: usize, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_complete(&self, _identifier: &str, _position: usize, _total: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_error(&self, identifier: &str, _position: usize, _total: usize, _error: &str) {
            self.errors.lock().unwrap().push(identifier.to_string());
        }

        fn on_run_complete(&self, _total_pages: usize, success_count: usize) {
            self.completed_total.store(success_count, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(5);
        cb.on_page_start("Beta_distribution", 0, 5);
        cb.on_page_complete("Beta_distribution", 0, 5);
        cb.on_page_error("Nope", 1, 5, "not found");
        cb.on_run_complete(5, 4);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();

        tracker.on_run_start(3);
        assert_eq!(tracker.started_total.load(Ordering::SeqCst), 3);

        tracker.on_page_start("A", 0, 3);
        tracker.on_page_complete("A", 0, 3);
        tracker.on_page_start("B", 1, 3);
        tracker.on_page_complete("B", 1, 3);
        tracker.on_page_start("C", 2, 3);
        tracker.on_page_error("C", 2, 3, "no infobox");

        assert_eq!(tracker.starts.load(Ordering::SeqCst), 3);
        assert_eq!(tracker.completes.load(Ordering::SeqCst), 2);
        assert_eq!(*tracker.errors.lock().unwrap(), vec!["C".to_string()]);

        tracker.on_run_complete(3, 2);
        assert_eq!(tracker.completed_total.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn arc_dyn_callback_works() {
        let cb: ProgressCallback = Arc::new(NoopProgressCallback);
        cb.on_run_start(10);
        cb.on_page_start("X", 0, 10);
    }
}
