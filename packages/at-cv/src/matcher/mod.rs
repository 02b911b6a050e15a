//! Thresholded template matching.
//!
//! [`SingleMatcher`]: Match one template on an image to get its best placement,
//! kept only if it clears the threshold.

use image::GrayImage;
use tracing::trace;

use crate::{
    MatchResult,
    core::template_matching::{Match, MatchSummary, MatchTemplateMethod, match_template},
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MatcherOptions {
    pub method: MatchTemplateMethod,
    pub threshold: f32,
}

impl Default for MatcherOptions {
    fn default() -> Self {
        Self {
            method: MatchTemplateMethod::CrossCorrelationNormed,
            threshold: 0.99,
        }
    }
}

impl MatcherOptions {
    pub fn with_method(mut self, method: MatchTemplateMethod) -> Self {
        self.method = method;
        self
    }
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }
}

/// Match one template on an image to get one result.
pub struct SingleMatcher;

#[derive(Clone, Copy, Debug)]
pub struct SingleMatcherResult {
    /// The best placement if it passed the threshold
    pub result: Option<Match>,
    /// Extremes of the whole score surface
    pub summary: MatchSummary,
}

impl SingleMatcherResult {
    /// The best placement regardless of the threshold.
    pub fn best(&self, method: MatchTemplateMethod) -> Match {
        self.summary.best(method)
    }
}

impl SingleMatcher {
    pub fn match_template(
        image: &GrayImage,
        template: &GrayImage,
        options: &MatcherOptions,
    ) -> MatchResult<SingleMatcherResult> {
        let surface = match_template(image, template, options.method)?;
        let summary = MatchSummary::from_surface(&surface, template.dimensions());
        let best = summary.best(options.method);
        trace!(
            "[SingleMatcher] {}: best {:.4} at ({}, {})",
            options.method, best.value, best.rect.x, best.rect.y
        );
        let result = options
            .method
            .passes(best.value, options.threshold)
            .then_some(best);
        Ok(SingleMatcherResult { result, summary })
    }
}

#[cfg(test)]
mod tests {
    use image::Luma;

    use super::*;
    use crate::test_utils::{noise, paste};

    #[test]
    fn test_single_matcher_finds_pasted_template() {
        let mut image = GrayImage::from_pixel(120, 90, Luma([90]));
        let template = noise(16, 10, 11);
        paste(&mut image, &template, 70, 44);

        let res =
            SingleMatcher::match_template(&image, &template, &MatcherOptions::default()).unwrap();
        let found = res.result.expect("template should match");
        assert_eq!((found.rect.x, found.rect.y), (70, 44));
        assert_eq!((found.rect.width, found.rect.height), (16, 10));
        assert!(found.value >= 0.99);
    }

    #[test]
    fn test_single_matcher_rejects_below_threshold() {
        let image = noise(60, 60, 21);
        let template = noise(12, 12, 22);

        let res =
            SingleMatcher::match_template(&image, &template, &MatcherOptions::default()).unwrap();
        assert!(res.result.is_none());
        // the summary is still reported for diagnostics
        let best = res.best(MatchTemplateMethod::CrossCorrelationNormed);
        assert!(best.value < 0.99);
        assert_eq!(best.value, res.summary.max_value);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let image = noise(20, 20, 5);
        let template = image.clone();
        let res = SingleMatcher::match_template(
            &image,
            &template,
            &MatcherOptions::default().with_threshold(0.0),
        )
        .unwrap();
        assert!(res.result.is_some());

        let res = SingleMatcher::match_template(
            &image,
            &template,
            &MatcherOptions::default()
                .with_method(MatchTemplateMethod::SumOfSquaredDifference)
                .with_threshold(0.0),
        )
        .unwrap();
        // an exact match has a squared difference of exactly zero
        assert_eq!(res.result.map(|m| m.value), Some(0.0));
    }
}
