//! Progress-callback trait for batch processing events.
//!
//! Inject an [`Arc<dyn BatchProgressCallback>`] via
//! [`crate::config::PipelineConfigBuilder::progress_callback`] to receive
//! real-time events as the batch works through a directory of scans.
//!
//! # Why callbacks instead of channels?
//!
//! The callback approach is the least-invasive integration point: callers
//! can forward events to a channel, a log, a database record, or a
//! terminal progress bar — without the library knowing anything about how
//! the host application communicates. The trait is `Send + Sync` because
//! images are processed concurrently.

use std::path::Path;
use std::sync::Arc;

/// Called by the batch pipeline as it processes each image.
///
/// All methods have default no-op implementations so callers only
/// override what they care about.
///
/// # Thread safety
///
/// `on_image_start`, `on_image_complete`, and `on_image_error` may be
/// called concurrently from different tasks. Implementations must protect
/// shared mutable state with appropriate synchronisation primitives
/// (e.g. `Mutex`, `AtomicUsize`).
pub trait BatchProgressCallback: Send + Sync {
    /// Called once before any image is processed.
    fn on_batch_start(&self, total_images: usize) {
        let _ = total_images;
    }

    /// Called just before an image enters the OCR stage.
    fn on_image_start(&self, path: &Path, total_images: usize) {
        let _ = (path, total_images);
    }

    /// Called when an image was summarised successfully.
    ///
    /// `summary_len` is the byte length of the tidied summary — useful for
    /// progress displays that track output size.
    fn on_image_complete(&self, path: &Path, total_images: usize, summary_len: usize) {
        let _ = (path, total_images, summary_len);
    }

    /// Called when an image failed (OCR or summary, after retries).
    fn on_image_error(&self, path: &Path, total_images: usize, error: String) {
        let _ = (path, total_images, error);
    }

    /// Called once after all images have been attempted.
    fn on_batch_complete(&self, total_images: usize, success_count: usize) {
        let _ = (total_images, success_count);
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl BatchProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type ProgressCallback = Arc<dyn BatchProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct TrackingCallback {
        starts: AtomicUsize,
        completes: AtomicUsize,
        errors: AtomicUsize,
    }

    impl BatchProgressCallback for TrackingCallback {
        fn on_image_start(&self, _path: &Path, _total: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_image_complete(&self, _path: &Path, _total: usize, _len: usize) {
            self.completes.fetch_add(1, Ordering::SeqCst);
        }

        fn on_image_error(&self, _path: &Path, _total: usize, _error: String) {
            self.errors.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_batch_start(3);
        cb.on_image_start(Path::new("a.png"), 3);
        cb.on_image_complete(Path::new("a.png"), 3, 42);
        cb.on_image_error(Path::new("b.png"), 3, "ocr failed".to_string());
        cb.on_batch_complete(3, 2);
    }

    #[test]
    fn tracking_callback_receives_events() {
        let cb = TrackingCallback {
            starts: AtomicUsize::new(0),
            completes: AtomicUsize::new(0),
            errors: AtomicUsize::new(0),
        };

        cb.on_image_start(Path::new("a.png"), 2);
        cb.on_image_complete(Path::new("a.png"), 2, 100);
        cb.on_image_start(Path::new("b.png"), 2);
        cb.on_image_error(Path::new("b.png"), 2, "timeout".to_string());

        assert_eq!(cb.starts.load(Ordering::SeqCst), 2);
        assert_eq!(cb.completes.load(Ordering::SeqCst), 1);
        assert_eq!(cb.errors.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn arc_dyn_callback_moves_into_spawned_task() {
        let cb: Arc<dyn BatchProgressCallback> = Arc::new(NoopProgressCallback);
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            tokio::spawn(async move {
                cb.on_image_error(Path::new("a.png"), 1, "late failure".to_string());
            })
            .await
            .unwrap();
        });
    }
}
