//! Per-rectangle Gaussian blur application (§4.D step 4). Decodes a JPEG, blurs each active
//! rectangle's clamped region in place, re-encodes. A frame with no active rectangles never
//! reaches this module — the engine copies the source bytes directly.

use image::{DynamicImage, GenericImage, GenericImageView};
use redact_core::{ActiveSet, Rectangle};

/// Blurs every rectangle in `active` within `image`, clamped to the image bounds. Rectangles
/// that clamp to zero area are silently skipped (§3).
pub fn apply_blur(image: &mut DynamicImage, active: &ActiveSet, blur_radius: f32) {
    let (width, height) = image.dimensions();
    for rect in active.values() {
        blur_region(image, rect, width, height, blur_radius);
    }
}

fn blur_region(image: &mut DynamicImage, rect: &Rectangle, width: u32, height: u32, blur_radius: f32) {
    let Some(clamped) = rect.clamp_to(width as i64, height as i64) else {
        return;
    };
    let (x, y, w, h) = (clamped.x as u32, clamped.y as u32, clamped.w as u32, clamped.h as u32);

    let region = image.crop_imm(x, y, w, h);
    let blurred = region.blur(blur_radius);
    // `paste_back` is a plain pixel copy; `blur` already produced an image of the same size.
    for (dx, dy, pixel) in blurred.pixels() {
        image.put_pixel(x + dx, y + dy, pixel);
    }
}

pub fn decode(bytes: &[u8]) -> crate::error::Result<DynamicImage> {
    Ok(image::load_from_memory(bytes)?)
}

pub fn encode_jpeg(image: &DynamicImage) -> crate::error::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut cursor = std::io::Cursor::new(&mut buf);
    image.write_to(&mut cursor, image::ImageFormat::Jpeg)?;
    Ok(buf)
}
