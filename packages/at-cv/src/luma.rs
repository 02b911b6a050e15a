//! Grayscale conversion.
//!
//! Frames and templates go through the same BT.601 weights
//! (`0.299 R + 0.587 G + 0.114 B`), so a template cropped from a capture
//! converts to exactly the same intensities as the region it was cut from.
//! Alpha is ignored.

use image::{GrayImage, Luma, RgbaImage};

/// BT.601 luma of one pixel, rounded to the nearest integer.
pub fn luma(r: u8, g: u8, b: u8) -> u8 {
    let weighted = 299 * r as u32 + 587 * g as u32 + 114 * b as u32;
    ((weighted + 500) / 1000) as u8
}

/// Convert tightly packed BGRA rows to grayscale.
///
/// # Panics
/// Panics if `data` is not `width * height * 4` bytes long.
pub fn bgra_to_luma(width: u32, height: u32, data: &[u8]) -> GrayImage {
    assert_eq!(
        data.len(),
        width as usize * height as usize * 4,
        "BGRA buffer does not match {width}x{height}"
    );
    let gray = data.chunks_exact(4).map(|p| luma(p[2], p[1], p[0])).collect();
    GrayImage::from_raw(width, height, gray).expect("buffer length checked above")
}

pub fn rgba_to_luma(image: &RgbaImage) -> GrayImage {
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, _] = image.get_pixel(x, y).0;
        Luma([luma(r, g, b)])
    })
}
