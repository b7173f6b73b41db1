//! Template-matching refinement
//!
//! This module snaps a geometrically derived control coordinate onto the
//! control's reference image in a screenshot of the target window. The
//! screenshot is captured once per pass and shared read-only by every
//! control.
//!
//! # Example
//!
//! ```ignore
//! use control_locator::vision::{CapturedRegion, RefinerConfig, TemplateRefiner};
//!
//! let region = CapturedRegion::of_rect(&rect, screenshot);
//! let refiner = TemplateRefiner::new(RefinerConfig::new("templates"));
//! let point = refiner.refine(&region, corrected, "A");
//! ```

pub mod capture;
pub mod config;
pub mod detector;
pub mod refiner;

pub use capture::{CapturedRegion, SearchArea};
pub use config::RefinerConfig;
pub use detector::{MatchMethod, RecognitionResult, ScoreMap, TemplateMatcher};
pub use refiner::{RefinedPoint, Refinement, TemplateRefiner, UnchangedReason};
