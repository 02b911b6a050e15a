//! Template matching on grayscale images, computed on the CPU through `imageproc`.
use std::{fmt::Display, str::FromStr};

use image::{GrayImage, ImageBuffer, Luma, math::Rect};
use imageproc::template_matching as ip;
use thiserror::Error;

use crate::{MatchError, MatchResult};

pub use imageproc::template_matching::find_extremes;

/// A score surface: one value per placement of the template's top-left corner.
pub type ScoreSurface = ImageBuffer<Luma<f32>, Vec<f32>>;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Match {
    pub rect: Rect,
    pub value: f32,
}


#[derive(Copy, Clone, Debug, PartialEq, Eq, Default)]
pub enum MatchTemplateMethod {
    SumOfSquaredDifference,
    SumOfSquaredDifferenceNormed,
    CrossCorrelation,
    /// Normalized cross-correlation, scores in `[0, 1]` with 1 a perfect match
    #[default]
    CrossCorrelationNormed,
}

impl MatchTemplateMethod {
    pub const ALL: [MatchTemplateMethod; 4] = [
        MatchTemplateMethod::SumOfSquaredDifference,
        MatchTemplateMethod::SumOfSquaredDifferenceNormed,
        MatchTemplateMethod::CrossCorrelation,
        MatchTemplateMethod::CrossCorrelationNormed,
    ];

    /// Lower scores are better for the squared-difference methods.
    pub fn lower_is_better(self) -> bool {
        matches!(
            self,
            MatchTemplateMethod::SumOfSquaredDifference
                | MatchTemplateMethod::SumOfSquaredDifferenceNormed
        )
    }

    /// Whether `value` clears `threshold`; a value equal to the threshold passes.
    pub fn passes(self, value: f32, threshold: f32) -> bool {
        if self.lower_is_better() {
            value <= threshold
        } else {
            value >= threshold
        }
    }

    /// The score given to placements with no defined value.
    fn worst(self) -> f32 {
        match self {
            MatchTemplateMethod::SumOfSquaredDifference => f32::INFINITY,
            MatchTemplateMethod::SumOfSquaredDifferenceNormed => 1.0,
            MatchTemplateMethod::CrossCorrelation
            | MatchTemplateMethod::CrossCorrelationNormed => 0.0,
        }
    }
}

impl From<MatchTemplateMethod> for ip::MatchTemplateMethod {
    fn from(method: MatchTemplateMethod) -> Self {
        match method {
            MatchTemplateMethod::SumOfSquaredDifference => {
                ip::MatchTemplateMethod::SumOfSquaredErrors
            }
            MatchTemplateMethod::SumOfSquaredDifferenceNormed => {
                ip::MatchTemplateMethod::SumOfSquaredErrorsNormalized
            }
            MatchTemplateMethod::CrossCorrelation => ip::MatchTemplateMethod::CrossCorrelation,
            MatchTemplateMethod::CrossCorrelationNormed => {
                ip::MatchTemplateMethod::CrossCorrelationNormalized
            }
        }
    }
}

impl Display for MatchTemplateMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            MatchTemplateMethod::SumOfSquaredDifference => "sqdiff",
            MatchTemplateMethod::SumOfSquaredDifferenceNormed => "sqdiff_normed",
            MatchTemplateMethod::CrossCorrelation => "ccorr",
            MatchTemplateMethod::CrossCorrelationNormed => "ccorr_normed",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug, PartialEq, Eq)]
#[error("unknown match method '{0}', expected one of sqdiff, sqdiff_normed, ccorr, ccorr_normed")]
pub struct ParseMethodError(String);

impl FromStr for MatchTemplateMethod {
    type Err = ParseMethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MatchTemplateMethod::ALL
            .into_iter()
            .find(|m| m.to_string() == s)
            .ok_or_else(|| ParseMethodError(s.to_string()))
    }
}

/// Extremes of a score surface together with the template size that produced it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatchSummary {
    pub min_value: f32,
    pub max_value: f32,
    pub min_location: (u32, u32),
    pub max_location: (u32, u32),
    pub template_size: (u32, u32),
}

impl MatchSummary {
    pub fn from_surface(surface: &ScoreSurface, template_size: (u32, u32)) -> Self {
        let extremes = find_extremes(surface);
        Self {
            min_value: extremes.min_value,
            max_value: extremes.max_value,
            min_location: extremes.min_value_location,
            max_location: extremes.max_value_location,
            template_size,
        }
    }

    /// The best placement under `method`'s ordering.
    pub fn best(&self, method: MatchTemplateMethod) -> Match {
        let (location, value) = if method.lower_is_better() {
            (self.min_location, self.min_value)
        } else {
            (self.max_location, self.max_value)
        };
        Match {
            rect: Rect {
                x: location.0,
                y: location.1,
                width: self.template_size.0,
                height: self.template_size.1,
            },
            value,
        }
    }
}

/// Slide `template` over every position of `image` and score each placement.
///
/// The result is `(W - w + 1) x (H - h + 1)`. Placements whose score is
/// undefined (a zero-energy window under a normalized method) get the
/// method's worst score instead of NaN.
pub fn match_template(
    image: &GrayImage,
    template: &GrayImage,
    method: MatchTemplateMethod,
) -> MatchResult<ScoreSurface> {
    if template.width() == 0 || template.height() == 0 {
        return Err(MatchError::EmptyTemplate);
    }
    if template.width() > image.width() || template.height() > image.height() {
        return Err(MatchError::TemplateTooLarge {
            template: template.dimensions(),
            image: image.dimensions(),
        });
    }

    let mut surface = ip::match_template(image, template, method.into());
    let worst = method.worst();
    for p in surface.pixels_mut() {
        if p.0[0].is_nan() {
            p.0[0] = worst;
        }
    }
    Ok(surface)
}
