//! OCR stage: image bytes in, recognised text out.
//!
//! The engine itself is an external collaborator behind the [`OcrEngine`]
//! trait — this crate neither implements recognition nor post-corrects its
//! output. Two implementations ship here:
//!
//! * [`TesseractEngine`] (feature `tesseract`, default on) — backed by
//!   `leptess` (tesseract + leptonica). System libraries are required at
//!   link time, which is why the feature can be turned off.
//! * [`FixedTextEngine`] — returns a preset string. Useful in tests and
//!   for callers that already have the text and only want extraction and
//!   summarisation.
//!
//! Input images are decoded with the `image` crate first (so garbage
//! bytes fail with [`Ocr2InvoiceError::DecodeFailed`] instead of an
//! engine-specific crash) and re-encoded as PNG in memory — lossless, and
//! the one container every backend accepts. Recognition runs under
//! `spawn_blocking`: tesseract is CPU-bound and must not stall the async
//! workers.

use crate::error::Ocr2InvoiceError;
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Abstraction over an OCR backend.
///
/// Implementations receive PNG-encoded image bytes and return the
/// recognised text. Must be `Send + Sync`: batch mode calls engines from
/// multiple blocking tasks at once.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, png: &[u8]) -> Result<String, Ocr2InvoiceError>;
}

/// Returns a pre-set string regardless of the image content.
///
/// Lets the extraction pipeline be exercised end to end without tesseract
/// installed — inject it via `PipelineConfig::builder().ocr_engine(...)`.
pub struct FixedTextEngine {
    text: String,
}

impl FixedTextEngine {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl OcrEngine for FixedTextEngine {
    fn recognize(&self, _png: &[u8]) -> Result<String, Ocr2InvoiceError> {
        Ok(self.text.clone())
    }
}

/// Tesseract-backed engine via `leptess`.
///
/// A fresh `LepTess` is created per call: the handle is not `Sync`, and
/// recognition dominates the cost of initialisation for invoice-sized
/// images.
#[cfg(feature = "tesseract")]
pub struct TesseractEngine {
    tessdata_dir: Option<String>,
    lang: String,
}

#[cfg(feature = "tesseract")]
impl TesseractEngine {
    pub fn new(tessdata_dir: Option<&Path>, lang: &str) -> Self {
        Self {
            tessdata_dir: tessdata_dir.map(|p| p.to_string_lossy().into_owned()),
            lang: lang.to_string(),
        }
    }
}

#[cfg(feature = "tesseract")]
impl OcrEngine for TesseractEngine {
    fn recognize(&self, png: &[u8]) -> Result<String, Ocr2InvoiceError> {
        let mut lt = leptess::LepTess::new(self.tessdata_dir.as_deref(), &self.lang)
            .map_err(|e| Ocr2InvoiceError::OcrFailed {
                detail: format!("tesseract init ({}): {}", self.lang, e),
            })?;
        lt.set_image_from_mem(png)
            .map_err(|e| Ocr2InvoiceError::OcrFailed {
                detail: format!("set image: {}", e),
            })?;
        lt.get_utf8_text().map_err(|e| Ocr2InvoiceError::OcrFailed {
            detail: format!("recognition: {}", e),
        })
    }
}

/// Read, decode, and recognise one image file.
///
/// Decoding happens inline (cheap, and the error points at the offending
/// path); recognition is offloaded to the blocking pool.
pub async fn recognize_file(
    engine: Arc<dyn OcrEngine>,
    path: &Path,
) -> Result<String, Ocr2InvoiceError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Ocr2InvoiceError::FileNotFound {
                path: path.to_path_buf(),
            },
            std::io::ErrorKind::PermissionDenied => Ocr2InvoiceError::PermissionDenied {
                path: path.to_path_buf(),
            },
            _ => Ocr2InvoiceError::Internal(format!("read {}: {}", path.display(), e)),
        })?;

    let png = reencode_png(&bytes, path)?;

    let start = Instant::now();
    let text = tokio::task::spawn_blocking(move || engine.recognize(&png))
        .await
        .map_err(|e| Ocr2InvoiceError::Internal(format!("OCR task panicked: {}", e)))??;

    info!(
        "Recognised {} chars from {} in {}ms",
        text.len(),
        path.display(),
        start.elapsed().as_millis()
    );
    Ok(text)
}

/// Decode any supported container and re-encode losslessly as PNG.
fn reencode_png(bytes: &[u8], path: &Path) -> Result<Vec<u8>, Ocr2InvoiceError> {
    let img = image::load_from_memory(bytes).map_err(|e| Ocr2InvoiceError::DecodeFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })?;

    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .map_err(|e| Ocr2InvoiceError::DecodeFailed {
            path: path.to_path_buf(),
            detail: format!("PNG re-encode: {}", e),
        })?;
    debug!("Re-encoded image → {} PNG bytes", buf.len());
    Ok(buf)
}
