//! Refinement configuration

use std::path::PathBuf;

use super::MatchMethod;
use crate::config::LocatorConfig;

/// Settings for template-matching refinement
#[derive(Debug, Clone, PartialEq)]
pub struct RefinerConfig {
    /// When false every control keeps its corrected coordinate
    pub enabled: bool,
    /// Minimum score for a match to be accepted
    pub threshold: f32,
    /// Half-size of the search square, in pixels
    pub search_area_size: u32,
    pub method: MatchMethod,
    /// Directory holding `<name>.png` reference images
    pub templates_dir: PathBuf,
}

impl Default for RefinerConfig {
    fn default() -> Self {
        Self::from(&LocatorConfig::default())
    }
}

impl From<&LocatorConfig> for RefinerConfig {
    fn from(config: &LocatorConfig) -> Self {
        Self {
            enabled: config.use_image_recognition,
            threshold: config.recognition_threshold,
            search_area_size: config.search_area_size,
            method: config.match_method,
            templates_dir: config.templates_dir.clone(),
        }
    }
}

impl RefinerConfig {
    /// Create an enabled configuration reading templates from `templates_dir`
    pub fn new(templates_dir: impl Into<PathBuf>) -> Self {
        Self {
            templates_dir: templates_dir.into(),
            enabled: true,
            ..Self::default()
        }
    }

    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_search_area_size(mut self, size: u32) -> Self {
        self.search_area_size = size;
        self
    }

    pub fn with_method(mut self, method: MatchMethod) -> Self {
        self.method = method;
        self
    }

    /// A configuration that never refines
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Reference image for a control: `<templates_dir>/<name>.png`
    pub fn template_path(&self, control: &str) -> PathBuf {
        self.templates_dir.join(format!("{}.png", control))
    }
}
