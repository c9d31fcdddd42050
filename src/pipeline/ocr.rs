//! OCR extraction: run Tesseract over an image buffer.
//!
//! Two engines implement the same contract:
//!
//! * [`TesseractCli`] (default) pipes the image into the `tesseract`
//!   executable (`tesseract stdin stdout -l <langs>`). The child is spawned
//!   with `kill_on_drop`, so abandoning the future (client disconnect,
//!   deadline) kills the engine instead of leaving it running.
//! * `LinkedTesseract` (feature `tesseract`) calls libtesseract in-process on
//!   a blocking thread.
//!
//! Both hold a semaphore of engine permits. Invocations beyond the permit
//! count queue inside the extractor; the coordinator never sees it.
//!
//! Before any engine work the image header is decoded with the `image`
//! crate. A buffer that is not a readable PNG or JPEG fails fast with
//! [`ExtractionError::Ocr`] instead of reaching the engine.

use crate::config::PipelineConfig;
use crate::error::ExtractionError;
use crate::pipeline::normalize::normalize_text;
use crate::pipeline::TextExtractor;
use crate::progress::ExtractionProgress;
use async_trait::async_trait;
use bytes::Bytes;
use std::future::Future;
use std::io::Cursor;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Build the OCR engine selected at compile time.
#[cfg(not(feature = "tesseract"))]
pub fn engine_from_config(config: &PipelineConfig) -> Arc<dyn TextExtractor> {
    Arc::new(TesseractCli::from_config(config))
}

/// Build the OCR engine selected at compile time.
#[cfg(feature = "tesseract")]
pub fn engine_from_config(config: &PipelineConfig) -> Arc<dyn TextExtractor> {
    Arc::new(LinkedTesseract::from_config(config))
}

/// Decode just the image header and return its dimensions.
pub fn preflight(bytes: &[u8]) -> Result<(u32, u32), ExtractionError> {
    image::ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| ExtractionError::ocr(format!("cannot read image: {}", e)))?
        .into_dimensions()
        .map_err(|e| ExtractionError::ocr(format!("cannot decode image: {}", e)))
}

/// Shared by both engines: header check, permit, deadline, progress.
async fn run_bounded<F>(
    bytes: &[u8],
    permits: &Semaphore,
    timeout: Option<Duration>,
    progress: &dyn ExtractionProgress,
    engine: F,
) -> Result<String, ExtractionError>
where
    F: Future<Output = Result<String, ExtractionError>>,
{
    let (width, height) = preflight(bytes)?;
    debug!("OCR input: {}x{} px, {} bytes", width, height, bytes.len());

    progress.report("waiting for engine", 0.0);
    let _permit = permits
        .acquire()
        .await
        .map_err(|_| ExtractionError::ocr("engine is shut down"))?;

    progress.report("recognizing text", 0.1);
    let raw = match timeout {
        Some(limit) => tokio::time::timeout(limit, engine).await.map_err(|_| {
            warn!("OCR exceeded {:?}, abandoning", limit);
            ExtractionError::ocr(format!("timed out after {:?}", limit))
        })??,
        None => engine.await?,
    };
    progress.report("recognizing text", 1.0);

    Ok(normalize_text(&raw))
}

// ── Executable engine ────────────────────────────────────────────────────────

/// Drives the `tesseract` executable over stdin/stdout.
#[derive(Debug, Clone)]
pub struct TesseractCli {
    program: String,
    languages: String,
    permits: Arc<Semaphore>,
    timeout: Option<Duration>,
}

impl TesseractCli {
    pub fn new(
        program: impl Into<String>,
        languages: impl Into<String>,
        concurrency: usize,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            program: program.into(),
            languages: languages.into(),
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            timeout,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.tesseract_path.clone(),
            config.ocr_languages.clone(),
            config.ocr_concurrency,
            config.ocr_timeout(),
        )
    }

    async fn run(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let mut child = Command::new(&self.program)
            .args(["stdin", "stdout", "-l", self.languages.as_str()])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ExtractionError::ocr(format!("failed to start '{}': {}", self.program, e))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| ExtractionError::ocr("engine stdin unavailable"))?;

        // Feed stdin while collecting output so a large image cannot fill
        // the pipe and deadlock against an unread stdout.
        let write = async move {
            let res = stdin.write_all(bytes).await;
            drop(stdin);
            res
        };
        let (written, output) = tokio::join!(write, child.wait_with_output());

        let output =
            output.map_err(|e| ExtractionError::ocr(format!("engine did not finish: {}", e)))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::ocr(format!(
                "tesseract exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        written.map_err(|e| ExtractionError::ocr(format!("failed to send image: {}", e)))?;

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl TextExtractor for TesseractCli {
    async fn extract(
        &self,
        bytes: Bytes,
        progress: &dyn ExtractionProgress,
    ) -> Result<String, ExtractionError> {
        run_bounded(
            &bytes,
            &self.permits,
            self.timeout,
            progress,
            self.run(&bytes),
        )
        .await
    }
}

// ── Linked engine ────────────────────────────────────────────────────────────

/// Calls libtesseract in-process.
#[cfg(feature = "tesseract")]
#[derive(Debug, Clone)]
pub struct LinkedTesseract {
    languages: String,
    permits: Arc<Semaphore>,
    timeout: Option<Duration>,
}

#[cfg(feature = "tesseract")]
impl LinkedTesseract {
    pub fn new(languages: impl Into<String>, concurrency: usize, timeout: Option<Duration>) -> Self {
        Self {
            languages: languages.into(),
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
            timeout,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(
            config.ocr_languages.clone(),
            config.ocr_concurrency,
            config.ocr_timeout(),
        )
    }

    async fn run(&self, bytes: Bytes) -> Result<String, ExtractionError> {
        let languages = self.languages.clone();
        tokio::task::spawn_blocking(move || {
            let mut tess = tesseract::Tesseract::new(None, Some(languages.as_str()))
                .map_err(|e| ExtractionError::ocr(format!("{e:?}")))?
                .set_image_from_mem(&bytes)
                .map_err(|e| ExtractionError::ocr(format!("{e:?}")))?;
            tess.get_text()
                .map_err(|e| ExtractionError::ocr(format!("{e:?}")))
        })
        .await
        .map_err(|e| ExtractionError::ocr(format!("engine task failed: {}", e)))?
    }
}

#[cfg(feature = "tesseract")]
#[async_trait]
impl TextExtractor for LinkedTesseract {
    async fn extract(
        &self,
        bytes: Bytes,
        progress: &dyn ExtractionProgress,
    ) -> Result<String, ExtractionError> {
        run_bounded(
            &bytes,
            &self.permits,
            self.timeout,
            progress,
            self.run(bytes.clone()),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoopObserver;
    use std::sync::Mutex;

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = image::RgbImage::from_pixel(w, h, image::Rgb([255, 255, 255]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[derive(Default)]
    struct Steps(Mutex<Vec<(String, f32)>>);

    impl ExtractionProgress for Steps {
        fn report(&self, status: &str, progress: f32) {
            self.0.lock().unwrap().push((status.to_string(), progress));
        }
    }

    #[test]
    fn preflight_reads_dimensions() {
        assert_eq!(preflight(&png_bytes(12, 7)).unwrap(), (12, 7));
    }

    #[test]
    fn preflight_rejects_garbage() {
        let err = preflight(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ExtractionError::Ocr { .. }));
    }

    #[tokio::test]
    async fn corrupt_image_never_reaches_engine() {
        // Program does not exist: reaching it would give a spawn error instead.
        let engine = TesseractCli::new("/nonexistent/tesseract", "eng", 1, None);
        let err = engine
            .extract(Bytes::from_static(b"\xff\xd8garbage"), &NoopObserver)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("image"), "got: {err}");
    }

    #[tokio::test]
    async fn missing_executable_is_ocr_failure() {
        let engine = TesseractCli::new("/nonexistent/tesseract", "eng", 1, None);
        let err = engine
            .extract(Bytes::from(png_bytes(4, 4)), &NoopObserver)
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Ocr { .. }));
        assert!(err.to_string().contains("failed to start"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn fake_engine_behaviour() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = |name: &str, body: &str| {
            let path = dir.path().join(name);
            std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path.to_string_lossy().into_owned()
        };
        // $4 is the -l argument
        let echo = script("echo", "cat > /dev/null\nprintf '  langs=%s  \\r\\n\\n\\n\\nok\\n' \"$4\"");
        let fail = script("fail", "cat > /dev/null\necho 'read_params_file: bad' >&2\nexit 1");
        let slow = script("slow", "sleep 5");
        let png = Bytes::from(png_bytes(8, 8));

        let steps = Steps::default();
        let text = TesseractCli::new(echo, "eng+ara+fra", 1, None)
            .extract(png.clone(), &steps)
            .await
            .unwrap();
        assert_eq!(text, "langs=eng+ara+fra\n\nok");
        let seen = steps.0.lock().unwrap().clone();
        assert_eq!(seen.first().map(|s| s.1), Some(0.0));
        assert_eq!(seen.last().map(|s| s.1), Some(1.0));

        let err = TesseractCli::new(fail, "eng", 1, None)
            .extract(png.clone(), &NoopObserver)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("read_params_file"), "got: {err}");

        let err = TesseractCli::new(slow, "eng", 1, Some(Duration::from_millis(200)))
            .extract(png, &NoopObserver)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("timed out"), "got: {err}");
    }

    #[cfg(unix)]
    fn write_script(dir: &std::path::Path, name: &str, body: &str) -> String {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn single_permit_runs_engines_one_at_a_time() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("runs.log");
        let body = format!(
            "cat > /dev/null\necho start >> '{log}'\nsleep 0.3\necho end >> '{log}'\necho done",
            log = log.display()
        );
        let engine = TesseractCli::new(write_script(dir.path(), "queued", &body), "eng", 1, None);
        let png = Bytes::from(png_bytes(4, 4));

        let (a, b) = tokio::join!(
            engine.extract(png.clone(), &NoopObserver),
            engine.extract(png, &NoopObserver)
        );
        assert_eq!(a.unwrap(), "done");
        assert_eq!(b.unwrap(), "done");

        let runs = std::fs::read_to_string(&log).unwrap();
        let runs: Vec<&str> = runs.lines().collect();
        assert_eq!(runs, ["start", "end", "start", "end"]);
    }

    /// True once `pid` no longer exists or is a zombie awaiting reaping.
    #[cfg(target_os = "linux")]
    fn process_gone(pid: u32) -> bool {
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Err(_) => true,
            Ok(stat) => stat
                .rsplit_once(')')
                .and_then(|(_, rest)| rest.split_whitespace().next())
                .is_some_and(|state| state == "Z" || state == "X"),
        }
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn dropping_extraction_kills_engine() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("engine.pid");
        let body = format!("echo $$ > '{}'\nexec sleep 30", pid_file.display());
        let engine = TesseractCli::new(write_script(dir.path(), "hang", &body), "eng", 1, None);

        let mut fut = Box::pin(engine.extract(Bytes::from(png_bytes(4, 4)), &NoopObserver));
        let mut pid = None;
        for _ in 0..250 {
            tokio::select! {
                r = &mut fut => panic!("engine returned early: {r:?}"),
                _ = tokio::time::sleep(Duration::from_millis(20)) => {}
            }
            pid = std::fs::read_to_string(&pid_file)
                .ok()
                .and_then(|s| s.trim().parse::<u32>().ok());
            if pid.is_some() {
                break;
            }
        }
        let pid = pid.expect("engine never started");
        assert!(!process_gone(pid));

        drop(fut);

        let mut gone = false;
        for _ in 0..100 {
            if process_gone(pid) {
                gone = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(gone, "engine process {pid} survived its caller");
    }
}
