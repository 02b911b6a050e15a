//! Grayscale template matching for window captures.
//!
//! [`luma`]: BGRA / RGBA to grayscale conversion.
//! [`template`]: loading and caching template images.
//! [`core::template_matching`]: score surfaces and their extremes.
//! [`matcher`]: thresholded single-template matching.

use std::path::PathBuf;

use thiserror::Error;

pub mod core;
pub mod luma;
pub mod matcher;
pub mod template;

pub use crate::core::template_matching::{Match, MatchSummary, MatchTemplateMethod};
pub use matcher::{MatcherOptions, SingleMatcher, SingleMatcherResult};
pub use template::{Template, TemplateStore};

#[derive(Error, Debug)]
pub enum MatchError {
    /// The template file is missing or cannot be decoded
    #[error("failed to load template {}: {source}", path.display())]
    TemplateLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The template does not fit inside the searched image
    #[error("template {template:?} is larger than image {image:?}")]
    TemplateTooLarge {
        template: (u32, u32),
        image: (u32, u32),
    },

    #[error("template has no pixels")]
    EmptyTemplate,
}

pub type MatchResult<T> = Result<T, MatchError>;

#[cfg(test)]
pub(crate) mod test_utils {
    use image::{GrayImage, Luma};

    /// A deterministic high-contrast texture; different seeds are uncorrelated.
    pub fn noise(width: u32, height: u32, seed: u32) -> GrayImage {
        GrayImage::from_fn(width, height, |x, y| {
            let mut h = x.wrapping_mul(0x9E37_79B1)
                ^ y.wrapping_mul(0x85EB_CA77)
                ^ seed.wrapping_mul(0xC2B2_AE3D);
            h ^= h >> 15;
            h = h.wrapping_mul(0x2C1B_3C6D);
            h ^= h >> 12;
            Luma([if (h >> 16) & 1 == 0 { 16 } else { 240 }])
        })
    }

    pub fn paste(canvas: &mut GrayImage, patch: &GrayImage, x: u32, y: u32) {
        image::imageops::replace(canvas, patch, x as i64, y as i64);
    }
}
