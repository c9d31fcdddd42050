//! Shared fakes and fixtures for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bytes::Bytes;
use cv_analyzer::{
    AnalysisError, AnalysisGateway, ExtractionError, ExtractionProgress, TextExtractor,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ── Extractors ───────────────────────────────────────────────────────────────

/// What a [`ScriptedExtractor`] does when called.
#[derive(Clone)]
pub enum Script {
    /// Return this text regardless of input.
    Text(String),
    /// Return the input bytes decoded as UTF-8.
    Echo,
    /// Fail with this error.
    Fail(ExtractionError),
}

/// Extractor with a fixed behaviour and a call counter.
pub struct ScriptedExtractor {
    script: Script,
    calls: AtomicUsize,
}

impl ScriptedExtractor {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn text(s: impl Into<String>) -> Self {
        Self::new(Script::Text(s.into()))
    }

    pub fn echo() -> Self {
        Self::new(Script::Echo)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextExtractor for ScriptedExtractor {
    async fn extract(
        &self,
        bytes: Bytes,
        progress: &dyn ExtractionProgress,
    ) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        progress.report("recognizing text", 0.5);
        match &self.script {
            Script::Text(s) => Ok(s.clone()),
            Script::Echo => {
                // Stagger completions so concurrent runs interleave.
                tokio::time::sleep(Duration::from_millis((bytes.len() % 7) as u64)).await;
                Ok(String::from_utf8_lossy(&bytes).into_owned())
            }
            Script::Fail(e) => Err(e.clone()),
        }
    }
}

// ── Gateways ─────────────────────────────────────────────────────────────────

/// Gateway that records every text it receives and answers with
/// `"analysis of <first 20 chars>"`.
#[derive(Default)]
pub struct RecordingGateway {
    pub received: Mutex<Vec<String>>,
}

impl RecordingGateway {
    pub fn calls(&self) -> usize {
        self.received.lock().unwrap().len()
    }
}

#[async_trait]
impl AnalysisGateway for RecordingGateway {
    async fn analyze(&self, text: &str) -> Result<String, AnalysisError> {
        self.received.lock().unwrap().push(text.to_string());
        let head: String = text.chars().take(20).collect();
        Ok(format!("analysis of {head}"))
    }
}

/// Gateway that always fails with the given error.
pub struct FailingGateway(pub AnalysisError);

#[async_trait]
impl AnalysisGateway for FailingGateway {
    async fn analyze(&self, _text: &str) -> Result<String, AnalysisError> {
        Err(self.0.clone())
    }
}

// ── Fixtures ─────────────────────────────────────────────────────────────────

/// Build a PDF with one line of text per page.
pub fn make_pdf(pages: &[&str]) -> Vec<u8> {
    use lopdf::dictionary;
    use lopdf::{Document, Object, Stream};

    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });

    let mut kids: Vec<Object> = Vec::new();
    for text in pages {
        let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Contents" => content_id,
            "Resources" => dictionary! { "Font" => dictionary! { "F1" => font_id } },
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

/// A blank white PNG.
pub fn make_png(w: u32, h: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(w, h, image::Rgb([255, 255, 255]));
    let mut buf = std::io::Cursor::new(Vec::new());
    img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
    buf.into_inner()
}
