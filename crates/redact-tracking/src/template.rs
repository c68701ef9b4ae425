//! Template-matching fallback (§4.E step 6): normalized cross-correlation over the whole frame,
//! used when OCR finds no match. A peak score `>= template_match_floor` is accepted; a peak
//! `> template_drift_update_floor` also triggers the drift-adapting template update.

use image::{GenericImageView, GrayImage};
use imageproc::template_matching::{match_template, MatchTemplateMethod};
use redact_core::Rectangle;

#[derive(Debug, Clone, Copy)]
pub struct TemplateMatch {
    pub rect: Rectangle,
    pub score: f32,
}

/// Searches `frame` for `template`, returning the best-scoring location and its normalized
/// cross-correlation score in `[-1, 1]` (practically `[0, 1]` for same-source imagery).
pub fn find_best_match(frame: &GrayImage, template: &GrayImage) -> Option<TemplateMatch> {
    if template.width() == 0
        || template.height() == 0
        || template.width() > frame.width()
        || template.height() > frame.height()
    {
        return None;
    }

    let result = match_template(frame, template, MatchTemplateMethod::CrossCorrelationNormalized);
    let (mut best_x, mut best_y, mut best_score) = (0u32, 0u32, f32::MIN);
    for y in 0..result.height() {
        for x in 0..result.width() {
            let score = result.get_pixel(x, y).0[0];
            if score > best_score {
                best_score = score;
                best_x = x;
                best_y = y;
            }
        }
    }

    Some(TemplateMatch {
        rect: Rectangle::new(best_x as i64, best_y as i64, template.width() as i64, template.height() as i64),
        score: best_score,
    })
}

/// Crops `(x, y, w, h)` out of `image`, clamped to bounds, as a grayscale template/search buffer.
pub fn crop_gray(image: &image::DynamicImage, rect: Rectangle) -> Option<GrayImage> {
    let (width, height) = image.dimensions();
    let clamped = rect.clamp_to(width as i64, height as i64)?;
    Some(
        image
            .crop_imm(clamped.x as u32, clamped.y as u32, clamped.w as u32, clamped.h as u32)
            .to_luma8(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Luma};

    fn noisy_gray(width: u32, height: u32, seed: u32) -> GrayImage {
        image::ImageBuffer::from_fn(width, height, |x, y| {
            let v = ((x * 7 + y * 13 + seed) % 256) as u8;
            Luma([v])
        })
    }

    #[test]
    fn finds_exact_template_location() {
        let frame = noisy_gray(64, 64, 0);
        let template_img = DynamicImage::ImageLuma8(frame.clone())
            .crop_imm(20, 20, 10, 10)
            .to_luma8();
        let found = find_best_match(&frame, &template_img).unwrap();
        assert_eq!(found.rect.x, 20);
        assert_eq!(found.rect.y, 20);
        assert!(found.score > 0.99);
    }

    #[test]
    fn oversized_template_returns_none() {
        let frame = noisy_gray(10, 10, 1);
        let template_img = noisy_gray(20, 20, 2);
        assert!(find_best_match(&frame, &template_img).is_none());
    }
}
