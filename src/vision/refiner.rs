//! Snaps corrected coordinates onto the matching template in the screenshot

use std::path::Path;

use image::GrayImage;

use super::capture::CapturedRegion;
use super::config::RefinerConfig;
use super::detector::{RecognitionResult, TemplateMatcher};
use crate::error::Disposition;
use crate::geometry::Point;
use crate::{LocatorError, Result};

/// Why a coordinate was left as it was
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnchangedReason {
    /// Refinement is turned off
    Disabled,
    /// No `<name>.png` in the templates directory
    NoTemplate,
    /// Best score did not reach the threshold
    BelowThreshold(f32),
}

/// Outcome of one refinement attempt
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Refinement {
    Unchanged(UnchangedReason),
    /// Accepted match, in screen coordinates
    Snapped(RecognitionResult),
}

impl Refinement {
    /// The refined point, or `fallback` when nothing was accepted
    pub fn point_or(&self, fallback: Point) -> Point {
        match self {
            Refinement::Snapped(result) => result.point,
            Refinement::Unchanged(_) => fallback,
        }
    }
}

/// A refined coordinate together with any degradation it went through
#[derive(Debug, Clone, PartialEq)]
pub struct RefinedPoint {
    pub point: Point,
    /// A template match moved the point
    pub refined: bool,
    /// Set when refinement failed and the input point was kept
    pub warning: Option<String>,
}

/// Template-matching refiner
#[derive(Debug, Clone)]
pub struct TemplateRefiner {
    config: RefinerConfig,
    matcher: TemplateMatcher,
}

impl TemplateRefiner {
    pub fn new(config: RefinerConfig) -> Self {
        let matcher = TemplateMatcher::new(config.method);
        Self { config, matcher }
    }

    pub fn config(&self) -> &RefinerConfig {
        &self.config
    }

    /// Search around `point` for the control's template
    ///
    /// A missing template or a weak match leaves the point unchanged. A
    /// template that cannot be read, or a search area that cannot hold it, is
    /// an error the caller is expected to degrade from.
    pub fn try_refine(
        &self,
        region: &CapturedRegion,
        point: Point,
        control: &str,
    ) -> Result<Refinement> {
        if !self.config.enabled {
            return Ok(Refinement::Unchanged(UnchangedReason::Disabled));
        }

        let path = self.config.template_path(control);
        if !path.is_file() {
            log::debug!("No template for '{}' at {}", control, path.display());
            return Ok(Refinement::Unchanged(UnchangedReason::NoTemplate));
        }
        let template = load_template(&path, control)?;

        let area = region
            .search_area(point, self.config.search_area_size)
            .ok_or_else(|| {
                LocatorError::refinement(
                    control,
                    format!("search area around ({}, {}) lies outside the capture", point.x, point.y),
                )
            })?;
        let search = region.crop_luma(&area);

        let found = self.matcher.best_match(&search, &template).ok_or_else(|| {
            LocatorError::refinement(
                control,
                format!(
                    "template {}x{} does not fit search area {}x{}",
                    template.width(),
                    template.height(),
                    area.width,
                    area.height
                ),
            )
        })?;

        if !found.is_accepted(self.config.threshold) {
            log::debug!(
                "'{}' best score {:.3} below threshold {:.3}",
                control,
                found.confidence,
                self.config.threshold
            );
            return Ok(Refinement::Unchanged(UnchangedReason::BelowThreshold(
                found.confidence,
            )));
        }

        let snapped = region.to_screen(
            area.x + found.point.x as u32,
            area.y + found.point.y as u32,
        );
        log::debug!(
            "'{}' snapped ({}, {}) -> ({}, {}) score {:.3}",
            control,
            point.x,
            point.y,
            snapped.x,
            snapped.y,
            found.confidence
        );

        Ok(Refinement::Snapped(RecognitionResult::new(
            snapped,
            found.confidence,
        )))
    }

    /// Like [`try_refine`](Self::try_refine), but a degradable failure keeps
    /// `point` and comes back as a warning instead of an error
    pub fn refine_with_warning(
        &self,
        region: &CapturedRegion,
        point: Point,
        control: &str,
    ) -> Result<RefinedPoint> {
        match self.try_refine(region, point, control) {
            Ok(refinement) => Ok(RefinedPoint {
                point: refinement.point_or(point),
                refined: matches!(refinement, Refinement::Snapped(_)),
                warning: None,
            }),
            Err(e) => match e.disposition() {
                Disposition::Degrade => {
                    log::warn!("{}, keeping ({}, {})", e, point.x, point.y);
                    Ok(RefinedPoint {
                        point,
                        refined: false,
                        warning: Some(e.to_string()),
                    })
                }
                Disposition::Abort => Err(e),
            },
        }
    }

    /// Refined coordinate, or the input when refinement is skipped or fails
    pub fn refine(&self, region: &CapturedRegion, point: Point, control: &str) -> Point {
        match self.refine_with_warning(region, point, control) {
            Ok(refined) => refined.point,
            Err(e) => {
                log::warn!("{}, keeping ({}, {})", e, point.x, point.y);
                point
            }
        }
    }
}

fn load_template(path: &Path, control: &str) -> Result<GrayImage> {
    image::open(path)
        .map(|img| img.to_luma8())
        .map_err(|e| LocatorError::refinement(control, format!("cannot read {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgba, RgbaImage};

    fn noise_region(origin: Point, width: u32, height: u32) -> CapturedRegion {
        let mut state: u32 = 0x9e37_79b9;
        let image = RgbaImage::from_fn(width, height, |_, _| {
            state = state.wrapping_mul(1_103_515_245).wrapping_add(12_345);
            let v = (state >> 16) as u8;
            Rgba([v, v, v, 255])
        });
        CapturedRegion::new(origin, image)
    }

    fn save_template(region: &CapturedRegion, dir: &Path, name: &str, x: u32, y: u32, size: u32) {
        let template = image::imageops::crop_imm(region.luma(), x, y, size, size).to_image();
        template.save(dir.join(format!("{}.png", name))).unwrap();
    }

    #[test]
    fn test_disabled_leaves_point() {
        let region = noise_region(Point::new(0, 0), 50, 50);
        let refiner = TemplateRefiner::new(RefinerConfig::disabled());
        let out = refiner.try_refine(&region, Point::new(10, 10), "A").unwrap();
        assert_eq!(out, Refinement::Unchanged(UnchangedReason::Disabled));
    }

    #[test]
    fn test_missing_template_leaves_point() {
        let dir = tempfile::tempdir().unwrap();
        let region = noise_region(Point::new(0, 0), 50, 50);
        let refiner = TemplateRefiner::new(RefinerConfig::new(dir.path()));

        let out = refiner.try_refine(&region, Point::new(10, 10), "A").unwrap();
        assert_eq!(out, Refinement::Unchanged(UnchangedReason::NoTemplate));
        assert_eq!(refiner.refine(&region, Point::new(10, 10), "A"), Point::new(10, 10));
    }

    #[test]
    fn test_snaps_to_template_top_left() {
        let dir = tempfile::tempdir().unwrap();
        let region = noise_region(Point::new(100, 100), 120, 90);
        // Template sits at image (45, 33), i.e. screen (145, 133)
        save_template(&region, dir.path(), "A", 45, 33, 8);

        let refiner = TemplateRefiner::new(RefinerConfig::new(dir.path()));
        let out = refiner.try_refine(&region, Point::new(140, 130), "A").unwrap();

        match out {
            Refinement::Snapped(result) => {
                assert_eq!(result.point, Point::new(145, 133));
                assert!(result.confidence > 0.99);
            }
            other => panic!("expected a snap, got {:?}", other),
        }
    }

    #[test]
    fn test_snap_near_edge_uses_clamped_area() {
        let dir = tempfile::tempdir().unwrap();
        let region = noise_region(Point::new(0, 0), 60, 60);
        save_template(&region, dir.path(), "B", 2, 3, 6);

        let refiner = TemplateRefiner::new(RefinerConfig::new(dir.path()));
        assert_eq!(refiner.refine(&region, Point::new(4, 4), "B"), Point::new(2, 3));
    }

    #[test]
    fn test_weak_match_below_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let region = noise_region(Point::new(0, 0), 60, 60);
        let flat = GrayImage::from_pixel(6, 6, Luma([90]));
        flat.save(dir.path().join("C.png")).unwrap();

        let refiner = TemplateRefiner::new(RefinerConfig::new(dir.path()));
        let out = refiner.try_refine(&region, Point::new(30, 30), "C").unwrap();
        assert_eq!(out, Refinement::Unchanged(UnchangedReason::BelowThreshold(0.0)));
    }

    #[test]
    fn test_unreadable_template_is_refinement_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("D.png"), b"not a png").unwrap();
        let region = noise_region(Point::new(0, 0), 60, 60);

        let refiner = TemplateRefiner::new(RefinerConfig::new(dir.path()));
        let err = refiner.try_refine(&region, Point::new(30, 30), "D").unwrap_err();
        assert!(matches!(err, LocatorError::RefinementFailure { ref control, .. } if control == "D"));
        assert_eq!(refiner.refine(&region, Point::new(30, 30), "D"), Point::new(30, 30));
    }

    #[test]
    fn test_refine_with_warning_reports_failure() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("D.png"), b"not a png").unwrap();
        let region = noise_region(Point::new(0, 0), 60, 60);

        let refiner = TemplateRefiner::new(RefinerConfig::new(dir.path()));
        let out = refiner.refine_with_warning(&region, Point::new(30, 30), "D").unwrap();
        assert_eq!(out.point, Point::new(30, 30));
        assert!(!out.refined);
        assert!(out.warning.unwrap().contains("D"));
    }

    #[test]
    fn test_refine_with_warning_on_snap() {
        let dir = tempfile::tempdir().unwrap();
        let region = noise_region(Point::new(0, 0), 60, 60);
        save_template(&region, dir.path(), "G", 20, 24, 8);

        let refiner = TemplateRefiner::new(RefinerConfig::new(dir.path()));
        let out = refiner.refine_with_warning(&region, Point::new(22, 22), "G").unwrap();
        assert_eq!(out.point, Point::new(20, 24));
        assert!(out.refined);
        assert_eq!(out.warning, None);
    }

    #[test]
    fn test_template_larger_than_search_area() {
        let dir = tempfile::tempdir().unwrap();
        let region = noise_region(Point::new(0, 0), 100, 100);
        save_template(&region, dir.path(), "E", 10, 10, 30);

        let refiner = TemplateRefiner::new(RefinerConfig::new(dir.path()).with_search_area_size(5));
        let err = refiner.try_refine(&region, Point::new(50, 50), "E").unwrap_err();
        assert!(matches!(err, LocatorError::RefinementFailure { .. }));
    }

    #[test]
    fn test_point_outside_capture() {
        let dir = tempfile::tempdir().unwrap();
        let region = noise_region(Point::new(0, 0), 40, 40);
        save_template(&region, dir.path(), "F", 0, 0, 4);

        let refiner = TemplateRefiner::new(RefinerConfig::new(dir.path()));
        assert!(refiner.try_refine(&region, Point::new(500, 500), "F").is_err());
        assert_eq!(refiner.refine(&region, Point::new(500, 500), "F"), Point::new(500, 500));
    }
}
