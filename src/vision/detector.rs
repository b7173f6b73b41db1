//! Template matching

use image::{GrayImage, ImageBuffer, Luma};
use imageproc::template_matching::{find_extremes, match_template, Extremes, MatchTemplateMethod};
use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Per-position match scores
pub type ScoreMap = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Correlation measure used to score alignments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    /// Zero-mean normalized cross-correlation, scores in `[-1, 1]`
    #[default]
    CorrelationCoefficient,
    /// Normalized cross-correlation without mean removal, scores in `[0, 1]`
    CrossCorrelation,
}

/// Best alignment of a template inside a search image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecognitionResult {
    /// Top-left corner of the aligned template
    pub point: Point,
    /// Correlation score of that alignment
    pub confidence: f32,
}

impl RecognitionResult {
    pub fn new(point: Point, confidence: f32) -> Self {
        Self { point, confidence }
    }

    /// Whether the score meets an acceptance threshold
    pub fn is_accepted(&self, threshold: f32) -> bool {
        self.confidence >= threshold
    }
}

/// Scores every alignment of a template and picks the best one
#[derive(Debug, Clone, Copy)]
pub struct TemplateMatcher {
    method: MatchMethod,
}

impl TemplateMatcher {
    pub fn new(method: MatchMethod) -> Self {
        Self { method }
    }

    pub fn method(&self) -> MatchMethod {
        self.method
    }

    /// Score map of size `(W - w + 1) x (H - h + 1)`
    ///
    /// Returns `None` when the template is empty or does not fit in the image.
    pub fn score_map(&self, image: &GrayImage, template: &GrayImage) -> Option<ScoreMap> {
        let (iw, ih) = image.dimensions();
        let (tw, th) = template.dimensions();
        if tw == 0 || th == 0 || tw > iw || th > ih {
            return None;
        }

        Some(match self.method {
            MatchMethod::CorrelationCoefficient => correlation_coefficient(image, template),
            MatchMethod::CrossCorrelation => match_template(
                image,
                template,
                MatchTemplateMethod::CrossCorrelationNormalized,
            ),
        })
    }

    /// Best alignment in image coordinates, first maximum in row-major order
    pub fn best_match(&self, image: &GrayImage, template: &GrayImage) -> Option<RecognitionResult> {
        let scores = self.score_map(image, template)?;
        let Extremes {
            max_value,
            max_value_location,
            ..
        } = find_extremes(&scores);

        Some(RecognitionResult::new(
            Point::new(max_value_location.0 as i32, max_value_location.1 as i32),
            max_value,
        ))
    }
}

impl Default for TemplateMatcher {
    fn default() -> Self {
        Self::new(MatchMethod::default())
    }
}

/// Zero-mean normalized cross-correlation
///
/// Windows where either side has no variance score 0.
fn correlation_coefficient(image: &GrayImage, template: &GrayImage) -> ScoreMap {
    let (iw, ih) = image.dimensions();
    let (tw, th) = template.dimensions();
    let n = f64::from(tw * th);

    let t_mean = template.pixels().map(|p| f64::from(p[0])).sum::<f64>() / n;
    let centered: Vec<f64> = template.pixels().map(|p| f64::from(p[0]) - t_mean).collect();
    let t_norm = centered.iter().map(|v| v * v).sum::<f64>().sqrt();

    let out_w = iw - tw + 1;
    let out_h = ih - th + 1;

    ImageBuffer::from_fn(out_w, out_h, |ox, oy| {
        if t_norm == 0.0 {
            return Luma([0.0]);
        }

        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        let mut cross = 0.0;
        for ty in 0..th {
            for tx in 0..tw {
                let v = f64::from(image.get_pixel(ox + tx, oy + ty)[0]);
                sum += v;
                sum_sq += v * v;
                // Template is centered, so the window mean cancels out here
                cross += v * centered[(ty * tw + tx) as usize];
            }
        }

        let variance = sum_sq - sum * sum / n;
        if variance <= f64::EPSILON {
            return Luma([0.0]);
        }

        let score = cross / (t_norm * variance.sqrt());
        Luma([score.clamp(-1.0, 1.0) as f32])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic noise so every alignment is distinct
    fn noise_image(width: u32, height: u32, seed: u32) -> GrayImage {
        let mut state = seed.wrapping_mul(2_654_435_761).wrapping_add(1);
        GrayImage::from_fn(width, height, |_, _| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            Luma([(state >> 16) as u8])
        })
    }

    fn crop(image: &GrayImage, x: u32, y: u32, w: u32, h: u32) -> GrayImage {
        image::imageops::crop_imm(image, x, y, w, h).to_image()
    }

    #[test]
    fn test_exact_match_found() {
        let image = noise_image(40, 40, 7);
        let template = crop(&image, 17, 9, 8, 6);

        let result = TemplateMatcher::default().best_match(&image, &template).unwrap();
        assert_eq!(result.point, Point::new(17, 9));
        assert!(result.confidence > 0.999);
        assert!(result.is_accepted(0.8));
    }

    #[test]
    fn test_cross_correlation_method() {
        let image = noise_image(40, 40, 3);
        let template = crop(&image, 5, 20, 10, 10);

        let matcher = TemplateMatcher::new(MatchMethod::CrossCorrelation);
        let result = matcher.best_match(&image, &template).unwrap();
        assert_eq!(result.point, Point::new(5, 20));
        assert!(result.confidence > 0.99);
    }

    #[test]
    fn test_inverted_template_scores_negative() {
        let image = noise_image(12, 12, 11);
        let inverted = GrayImage::from_fn(12, 12, |x, y| Luma([255 - image.get_pixel(x, y)[0]]));

        let scores = TemplateMatcher::default().score_map(&image, &inverted).unwrap();
        assert_eq!(scores.dimensions(), (1, 1));
        assert!(scores.get_pixel(0, 0)[0] < -0.999);
    }

    #[test]
    fn test_all_negative_scores_report_negative_best() {
        let image = noise_image(12, 12, 11);
        let inverted = GrayImage::from_fn(12, 12, |x, y| Luma([255 - image.get_pixel(x, y)[0]]));

        let result = TemplateMatcher::default().best_match(&image, &inverted).unwrap();
        assert_eq!(result.point, Point::new(0, 0));
        assert!(result.confidence < -0.999);
        assert!(!result.is_accepted(0.0));
    }

    #[test]
    fn test_flat_template_scores_zero() {
        let image = noise_image(20, 20, 5);
        let flat = GrayImage::from_pixel(4, 4, Luma([128]));

        let result = TemplateMatcher::default().best_match(&image, &flat).unwrap();
        assert_eq!(result.confidence, 0.0);
        assert!(!result.is_accepted(0.8));
    }

    #[test]
    fn test_template_larger_than_image() {
        let image = noise_image(10, 10, 1);
        let template = noise_image(11, 4, 2);
        assert!(TemplateMatcher::default().best_match(&image, &template).is_none());
        assert!(TemplateMatcher::default()
            .best_match(&image, &GrayImage::new(0, 0))
            .is_none());
    }

    #[test]
    fn test_score_map_dimensions() {
        let image = noise_image(41, 30, 9);
        let template = noise_image(10, 5, 4);
        let scores = TemplateMatcher::default().score_map(&image, &template).unwrap();
        assert_eq!(scores.dimensions(), (32, 26));
    }
}
