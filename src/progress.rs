//! Observer trait for pipeline progress events.
//!
//! An observer is passed into each pipeline call and receives events as the
//! document moves through extraction and analysis. Observers are purely
//! informational: nothing they do can change control flow or the returned
//! outcome, and every method has a no-op default.
//!
//! # Example
//!
//! ```rust
//! use cv_analyzer::{ProgressObserver, SourceFormat};
//! use std::sync::atomic::{AtomicUsize, Ordering};
//!
//! struct CountingObserver {
//!     events: AtomicUsize,
//! }
//!
//! impl ProgressObserver for CountingObserver {
//!     fn on_ocr_progress(&self, _filename: &str, _status: &str, _progress: f32) {
//!         self.events.fetch_add(1, Ordering::SeqCst);
//!     }
//! }
//!
//! let observer = CountingObserver { events: AtomicUsize::new(0) };
//! observer.on_ocr_progress("cv.png", "recognizing text", 0.5);
//! assert_eq!(observer.events.load(Ordering::SeqCst), 1);
//! ```

use crate::output::SourceFormat;
use tracing::debug;

/// Receives progress events for one pipeline invocation.
///
/// Implementations must be `Send + Sync`: the batch CLI drives several
/// invocations concurrently against a single observer.
pub trait ProgressObserver: Send + Sync {
    /// Called once the document has been classified and an extractor chosen.
    fn on_extraction_start(&self, filename: &str, format: SourceFormat) {
        let _ = (filename, format);
    }

    /// Called zero or more times by the OCR engine.
    ///
    /// # Arguments
    /// * `filename`: document being recognised
    /// * `status`  : engine phase, e.g. `"recognizing text"`
    /// * `progress`: 0.0 to 1.0
    fn on_ocr_progress(&self, filename: &str, status: &str, progress: f32) {
        let _ = (filename, status, progress);
    }

    /// Called when text passed validation.
    fn on_extraction_complete(&self, filename: &str, char_count: usize) {
        let _ = (filename, char_count);
    }

    /// Called just before the analysis request is sent.
    fn on_analysis_start(&self, filename: &str) {
        let _ = filename;
    }

    /// Called once with the terminal outcome of the invocation.
    fn on_finished(&self, filename: &str, error: Option<&str>) {
        let _ = (filename, error);
    }
}

/// Discards every event.
pub struct NoopObserver;

impl ProgressObserver for NoopObserver {}

impl ExtractionProgress for NoopObserver {
    fn report(&self, _status: &str, _progress: f32) {}
}

/// Forwards OCR progress to `tracing` at debug level.
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn on_ocr_progress(&self, filename: &str, status: &str, progress: f32) {
        debug!("{}: OCR progress: {} {:.2}", filename, status, progress);
    }
}

/// Progress sink handed to a [`crate::pipeline::TextExtractor`].
///
/// Extractors see bytes, not documents, so they report engine phases only;
/// the coordinator attaches the filename.
pub trait ExtractionProgress: Send + Sync {
    fn report(&self, status: &str, progress: f32);
}

/// Binds engine progress to one document and forwards it to an observer.
pub struct DocumentProgress<'a> {
    filename: &'a str,
    observer: &'a dyn ProgressObserver,
}

impl<'a> DocumentProgress<'a> {
    pub fn new(filename: &'a str, observer: &'a dyn ProgressObserver) -> Self {
        Self { filename, observer }
    }
}

impl ExtractionProgress for DocumentProgress<'_> {
    fn report(&self, status: &str, progress: f32) {
        self.observer
            .on_ocr_progress(self.filename, status, progress);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        ocr: AtomicUsize,
        files: Mutex<Vec<String>>,
        finished: Mutex<Vec<Option<String>>>,
    }

    impl ProgressObserver for Recorder {
        fn on_ocr_progress(&self, filename: &str, _status: &str, _progress: f32) {
            self.ocr.fetch_add(1, Ordering::SeqCst);
            self.files.lock().unwrap().push(filename.to_string());
        }

        fn on_finished(&self, _filename: &str, error: Option<&str>) {
            self.finished
                .lock()
                .unwrap()
                .push(error.map(str::to_string));
        }
    }

    #[test]
    fn noop_observer_does_not_panic() {
        let o = NoopObserver;
        o.on_extraction_start("cv.png", SourceFormat::Image);
        o.on_ocr_progress("cv.png", "recognizing text", 0.3);
        o.on_extraction_complete("cv.png", 120);
        o.on_analysis_start("cv.png");
        o.on_finished("cv.png", None);
    }

    #[test]
    fn recorder_receives_events() {
        let r = Recorder::default();
        r.on_ocr_progress("cv.png", "loading", 0.0);
        r.on_ocr_progress("cv.png", "recognizing text", 0.5);
        r.on_finished("cv.png", Some("boom"));
        assert_eq!(r.ocr.load(Ordering::SeqCst), 2);
        assert_eq!(
            r.finished.lock().unwrap().as_slice(),
            &[Some("boom".to_string())]
        );
    }

    #[test]
    fn arc_dyn_observer_works() {
        let o: Arc<dyn ProgressObserver> = Arc::new(TracingObserver);
        o.on_ocr_progress("cv.png", "done", 1.0);
    }

    #[test]
    fn document_progress_attaches_filename() {
        let r = Recorder::default();
        let a = DocumentProgress::new("a.png", &r);
        let b = DocumentProgress::new("b.jpg", &r);
        a.report("recognizing text", 0.1);
        b.report("recognizing text", 0.1);
        a.report("recognizing text", 1.0);
        assert_eq!(r.files.lock().unwrap().as_slice(), ["a.png", "b.jpg", "a.png"]);
    }
}
