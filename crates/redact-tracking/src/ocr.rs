//! The OCR seam (§5 shared resource iii): a small trait so the tracker doesn't depend on a
//! concrete OCR library, plus a `leptess`-backed implementation wrapped in a mutex since
//! Tesseract's `TessApi` handle is not thread-safe to share across worker threads.

use crate::error::{Result, TrackingError};
use image::DynamicImage;
use leptess::capi::TessPageIteratorLevel_RIL_WORD as RIL_WORD;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct OcrWord {
    pub text: String,
    pub confidence: f32,
    /// Bounding box in the coordinate space of the image passed to `recognize`.
    pub bbox: redact_core::Rectangle,
}

pub trait OcrEngine: Send + Sync {
    /// Runs OCR over `image`, returning one `OcrWord` per recognized word/token.
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<OcrWord>>;
}

/// Lazily-initialized, mutex-guarded Tesseract handle (§5). Constructing a `leptess::LepTess`
/// per call would reload the trained-data model every frame; this crate creates one per process
/// and serializes access instead, matching the resource model's "wrap it with a mutex" guidance.
pub struct LeptessOcrEngine {
    inner: Mutex<leptess::LepTess>,
}

impl LeptessOcrEngine {
    pub fn new() -> Result<Self> {
        let tess = leptess::LepTess::new(None, "eng")
            .map_err(|e| TrackingError::Ocr(format!("failed to initialize tesseract: {e}")))?;
        Ok(Self { inner: Mutex::new(tess) })
    }
}

impl OcrEngine for LeptessOcrEngine {
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<OcrWord>> {
        let mut tess = self.inner.lock().expect("ocr engine mutex poisoned");
        let rgb = image.to_rgb8();
        let (width, height) = (rgb.width(), rgb.height());
        tess.set_image_from_mem(rgb.as_raw())
            .map_err(|e| TrackingError::Ocr(format!("set_image failed: {e}")))?;

        let text = tess
            .get_utf8_text()
            .map_err(|e| TrackingError::Ocr(format!("get_utf8_text failed: {e}")))?;
        let mean_confidence = tess.mean_text_conf();
        let confidence = (mean_confidence as f32 / 100.0).clamp(0.0, 1.0);
        let words: Vec<&str> = text.split_whitespace().filter(|w| !w.is_empty()).collect();

        // Per-word boxes at `RIL_WORD` level, in the same reading order `get_utf8_text` tokenizes
        // into. §4.E step 5 computes a minimum bounding rectangle over *matched* word boxes, so a
        // box that degenerates to the whole scanned region (rather than the word itself) would
        // make that computation a no-op — this is the one place that geometry has to be real.
        let (_pixa, boxes) = tess.get_component_images(RIL_WORD, true, false, 0);
        let whole_image = redact_core::Rectangle::new(0, 0, width as i64, height as i64);

        Ok(words
            .into_iter()
            .enumerate()
            .map(|(i, w)| {
                let bbox = boxes
                    .get_box(i as i32)
                    .map(|b| redact_core::Rectangle::new(b.x as i64, b.y as i64, b.w as i64, b.h as i64))
                    .unwrap_or(whole_image);
                OcrWord { text: w.to_string(), confidence, bbox }
            })
            .collect())
    }
}

#[cfg(test)]
pub mod fake {
    use super::*;

    /// A deterministic stand-in OCR engine for tests: returns whatever words were configured,
    /// regardless of the image passed in. Lets tracker tests exercise fuzzy matching and
    /// stabilization logic without a real Tesseract install.
    pub struct FakeOcrEngine {
        pub words: Vec<OcrWord>,
    }

    impl OcrEngine for FakeOcrEngine {
        fn recognize(&self, _image: &DynamicImage) -> Result<Vec<OcrWord>> {
            Ok(self.words.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    // The real engine owns process-wide Tesseract state (§5 shared resource iii); `#[serial]`
    // keeps this test from racing another real-engine test over the same trained-data handle.
    #[test]
    #[serial]
    fn recognizes_blank_image_as_no_words() {
        let engine = LeptessOcrEngine::new().expect("tesseract 'eng' traineddata available");
        let blank = DynamicImage::ImageRgb8(image::ImageBuffer::from_pixel(50, 50, image::Rgb([255, 255, 255])));
        let words = engine.recognize(&blank).unwrap();
        assert!(words.is_empty());
    }
}
