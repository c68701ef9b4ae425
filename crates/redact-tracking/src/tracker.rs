//! The tracking pipeline (§4.E): a two-stage OCR scan with fuzzy text matching, stabilization,
//! and a template-matching fallback. `track` emits a finite, forward-only, non-restartable
//! sequence of `TrackingResult`s; the caller folds each one into a `Moved` event.

use crate::config::TrackingConfig;
use crate::error::{Result, TrackingError};
use crate::fuzzy;
use crate::ocr::{OcrEngine, OcrWord};
use crate::template;
use redact_core::{Rectangle, TrackingMethod, TrackingResult};
use redact_engine::FrameStore;

/// `frame_limit` ≥ 1, or `None` for "all remaining", capped internally at
/// `TrackingConfig::frame_limit_cap` frames (§4.E preconditions). `rectangle_id` is the id the
/// caller folds each emitted `TrackingResult` back into as a `Moved` event (§2, §4.E) — `track`
/// itself never touches the event store, but carries the id through so the caller doesn't have
/// to zip results back up with the request that produced them.
pub struct TrackRequest {
    pub rectangle_id: redact_core::RectangleId,
    pub initial_rect: Rectangle,
    pub start_frame: u64,
    pub frame_limit: Option<u64>,
}

struct TargetText {
    text: String,
    #[allow(dead_code)]
    confidence: f32,
}

/// Checked once per frame; lets the caller cancel a long tracking run (§4.E, §5).
pub trait CancelCheck {
    fn is_cancelled(&self) -> bool;
}

impl<F: Fn() -> bool> CancelCheck for F {
    fn is_cancelled(&self) -> bool {
        self()
    }
}

pub fn track(
    store: &FrameStore,
    ocr: &dyn OcrEngine,
    config: &TrackingConfig,
    req: &TrackRequest,
    cancel: &dyn CancelCheck,
) -> Result<Vec<TrackingResult>> {
    let frame_limit = req
        .frame_limit
        .map(|n| n.min(config.frame_limit_cap))
        .unwrap_or(config.frame_limit_cap);

    let start_bytes = store.read(req.start_frame).map_err(|e| TrackingError::FrameNotFound(e.to_string()))?;
    let start_image = image::load_from_memory(&start_bytes)?;
    let mut template_rect = req.initial_rect;
    let mut template_gray = template::crop_gray(&start_image, template_rect)
        .ok_or_else(|| TrackingError::FrameNotFound("initial rectangle out of bounds".into()))?;

    let target_words = ocr.recognize(&start_image.crop_imm(
        template_rect.x.max(0) as u32,
        template_rect.y.max(0) as u32,
        template_rect.w as u32,
        template_rect.h as u32,
    ))?;
    let mut target_texts: Vec<TargetText> = target_words
        .into_iter()
        .filter(|w| w.confidence >= config.ocr_confidence_floor)
        .map(|w| TargetText { text: w.text, confidence: w.confidence })
        .collect();

    // §4.E init step 2: only texts longer than 2 characters qualify the target for OCR-assisted
    // tracking ("OCR+Template" mode). If none survive, this is "Template only" mode — clearing
    // `target_texts` means stage 1/2 matching always comes up empty and every frame falls straight
    // through to template matching, rather than fuzzy-matching noisy single/double-character tokens.
    if !target_texts.iter().any(|t| t.text.chars().count() > 2) {
        target_texts.clear();
    }

    let mut results = Vec::new();
    let mut current_rect = template_rect;
    let all_indices = store.list().map_err(|e| TrackingError::FrameNotFound(e.to_string()))?;
    let remaining_frames: Vec<u64> =
        all_indices.into_iter().filter(|&i| i > req.start_frame).take(frame_limit as usize).collect();

    for frame_index in remaining_frames {
        if cancel.is_cancelled() {
            break;
        }

        let bytes = store.read(frame_index).map_err(|e| TrackingError::FrameNotFound(e.to_string()))?;
        let image = image::load_from_memory(&bytes)?;

        if let Some(result) = track_one_frame(
            &image,
            frame_index,
            &target_texts,
            &mut current_rect,
            &mut template_gray,
            &mut template_rect,
            ocr,
            config,
        )? {
            results.push(result);
        } else {
            // Template score below the floor: tracking lost, sequence terminates (§4.E step 6,
            // §7 `TrackingLost` — not an error, a normal end-of-sequence condition).
            break;
        }
    }

    Ok(results)
}

#[allow(clippy::too_many_arguments)]
fn track_one_frame(
    image: &image::DynamicImage,
    frame_index: u64,
    target_texts: &[TargetText],
    current_rect: &mut Rectangle,
    template_gray: &mut image::GrayImage,
    template_rect: &mut Rectangle,
    ocr: &dyn OcrEngine,
    config: &TrackingConfig,
) -> Result<Option<TrackingResult>> {
    let local_region = current_rect.padded(config.local_region_padding_px);
    let local_crop = image.crop_imm(
        local_region.x.max(0) as u32,
        local_region.y.max(0) as u32,
        local_region.w.max(1) as u32,
        local_region.h.max(1) as u32,
    );
    let local_words = ocr.recognize(&local_crop)?;
    let local_offset = (local_region.x.max(0), local_region.y.max(0));

    let (stage1_matches, stage1_coverage) = match_against(target_texts, &local_words, config);

    if stage1_coverage >= config.stage1_coverage_threshold && !stage1_matches.is_empty() {
        return Ok(Some(emit_ocr_result(
            frame_index,
            &stage1_matches,
            stage1_coverage,
            TrackingMethod::OcrStage1,
            local_offset,
            current_rect,
            config,
        )));
    }

    // Stage 2: whole-frame OCR fallback. Word boxes here are already frame-absolute (offset 0,0).
    let global_words = ocr.recognize(image)?;
    let (stage2_matches, stage2_coverage) = match_against(target_texts, &global_words, config);

    if !stage2_matches.is_empty() {
        return Ok(Some(emit_ocr_result(
            frame_index,
            &stage2_matches,
            stage2_coverage,
            TrackingMethod::OcrStage2,
            (0, 0),
            current_rect,
            config,
        )));
    }

    // No OCR matches anywhere: fall back to template matching.
    let frame_gray = image.to_luma8();
    let Some(found) = template::find_best_match(&frame_gray, template_gray) else {
        return Ok(None);
    };

    if found.score < config.template_match_floor {
        return Ok(None);
    }

    let new_position = stabilize(*current_rect, found.rect, config);
    *current_rect = Rectangle::new(new_position.x, new_position.y, template_rect.w, template_rect.h);

    if found.score > config.template_drift_update_floor {
        // Drift adaptation: the template itself moves with the tracked object.
        *template_rect = *current_rect;
        if let Some(updated) = template::crop_gray(image, *current_rect) {
            *template_gray = updated;
        }
    }

    Ok(Some(TrackingResult {
        frame: frame_index,
        rect: *current_rect,
        confidence: found.score.clamp(0.0, 1.0),
        method: TrackingMethod::Template,
        matched_texts: Vec::new(),
    }))
}

struct MatchedWord {
    text: String,
    score: f32,
    bbox: Rectangle,
}

/// Matches every target text against the OCR words found in this frame/region, returning the
/// matched words (with their boxes, in the region's own coordinate space) and the coverage
/// ratio (§4.E step 2-3).
fn match_against(targets: &[TargetText], words: &[OcrWord], config: &TrackingConfig) -> (Vec<MatchedWord>, f32) {
    if targets.is_empty() {
        return (Vec::new(), 0.0);
    }
    let mut matched = Vec::new();
    for target in targets {
        let best = words
            .iter()
            .map(|w| (w, fuzzy::combined_score(&target.text, &w.text)))
            .filter(|(_, score)| *score >= config.fuzzy_match_threshold)
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
        if let Some((word, score)) = best {
            matched.push(MatchedWord { text: target.text.clone(), score, bbox: word.bbox });
        }
    }
    let coverage = matched.len() as f32 / targets.len() as f32;
    (matched, coverage)
}

/// Computes the minimum bounding rectangle over the matched words' boxes (translated from the
/// region's coordinate space into frame-absolute coordinates by `offset`), pads it, preserves the
/// original `w,h`, and stabilizes against the current position (§4.E step 5).
fn emit_ocr_result(
    frame_index: u64,
    matches: &[MatchedWord],
    coverage: f32,
    method: TrackingMethod,
    offset: (i64, i64),
    current_rect: &mut Rectangle,
    config: &TrackingConfig,
) -> TrackingResult {
    let mean_similarity = matches.iter().map(|m| m.score).sum::<f32>() / matches.len() as f32 / 100.0;
    let confidence = (0.7 * mean_similarity + 0.3 * coverage).clamp(0.0, 1.0);

    let mut min_x = i64::MAX;
    let mut min_y = i64::MAX;
    let mut max_x = i64::MIN;
    let mut max_y = i64::MIN;
    for m in matches {
        let x = m.bbox.x + offset.0;
        let y = m.bbox.y + offset.1;
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x + m.bbox.w);
        max_y = max_y.max(y + m.bbox.h);
    }
    let bbox = Rectangle::new(min_x, min_y, (max_x - min_x).max(1), (max_y - min_y).max(1));
    let padded = bbox.padded(config.match_bbox_padding_px);

    // Preserve the original w,h of the initial rectangle; tracking moves but does not resize.
    let candidate = Rectangle::new(padded.center().0 - current_rect.w / 2, padded.center().1 - current_rect.h / 2, current_rect.w, current_rect.h);
    let stabilized = stabilize(*current_rect, candidate, config);
    *current_rect = stabilized;

    TrackingResult {
        frame: frame_index,
        rect: *current_rect,
        confidence,
        method,
        matched_texts: matches.iter().map(|m| m.text.clone()).collect(),
    }
}

/// If the candidate position is within `stabilization_threshold_px` of the current position in
/// both axes, keep the current position (§4.E step 5). Otherwise adopt the candidate.
fn stabilize(current: Rectangle, candidate: Rectangle, config: &TrackingConfig) -> Rectangle {
    let dx = (candidate.x - current.x).abs();
    let dy = (candidate.y - current.y).abs();
    if dx <= config.stabilization_threshold_px && dy <= config.stabilization_threshold_px {
        current
    } else {
        candidate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ocr::fake::FakeOcrEngine;
    use image::{DynamicImage, Rgba};

    fn write_frame(dir: &std::path::Path, index: u64) {
        let img = DynamicImage::ImageRgba8(image::ImageBuffer::from_pixel(100, 100, Rgba([50, 50, 50, 255])));
        let mut buf = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut buf), image::ImageFormat::Jpeg).unwrap();
        std::fs::write(dir.join(redact_engine::frame_store::frame_file_name(index)), buf).unwrap();
    }

    fn never_cancel() -> bool {
        false
    }

    #[test]
    fn no_target_text_means_no_matches_and_falls_through_to_template() {
        let dir = tempfile::tempdir().unwrap();
        for i in 0..3 {
            write_frame(dir.path(), i);
        }
        let store = FrameStore::new(dir.path());
        let ocr = FakeOcrEngine { words: Vec::new() };
        let config = TrackingConfig::default();
        let req = TrackRequest {
            rectangle_id: "a".into(),
            initial_rect: Rectangle::new(10, 10, 20, 20),
            start_frame: 0,
            frame_limit: Some(2),
        };
        // Uniform gray frames: template matching will find a perfect (or near-perfect) match
        // anywhere, so tracking should not immediately report "lost".
        let results = track(&store, &ocr, &config, &req, &never_cancel).unwrap();
        assert!(results.iter().all(|r| r.method == TrackingMethod::Template));
    }

    #[test]
    fn stabilize_keeps_small_deltas() {
        let config = TrackingConfig::default();
        let current = Rectangle::new(50, 50, 10, 10);
        let nearby = Rectangle::new(52, 51, 10, 10);
        let far = Rectangle::new(80, 80, 10, 10);
        assert_eq!(stabilize(current, nearby, &config), current);
        assert_eq!(stabilize(current, far, &config), far);
    }
}
