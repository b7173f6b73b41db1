//! Configuration for control location
//!
//! These types define the structure of `control-locator.toml`. Every field has a
//! default, so an absent file or an empty one yields the stock setup for the
//! target application.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::geometry::BorderOffset;
use crate::layout::{ControlEntry, ControlLayout};
use crate::vision::MatchMethod;
use crate::{LocatorError, Result};

/// File name looked up by [`resolve_config_path`]
pub const CONFIG_FILENAME: &str = "control-locator.toml";

/// Syntax of the written coordinate file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionFormat {
    /// `CONTROL_POSITIONS = { 'name': (x, y), ... }`
    #[default]
    Literal,
    /// `{"name": [x, y], ...}`
    Json,
}

/// Static tunables for one resolution pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    /// Directory holding templates, the screenshot and the coordinate file
    pub templates_dir: PathBuf,
    /// Exact title of the top-level target window
    pub window_title: String,
    /// Substring the child window title must contain
    pub child_window_pattern: String,
    pub screenshot_filename: String,
    pub positions_filename: String,
    pub positions_format: PositionFormat,

    /// Query the OS DPI scale; when false the scale is 1.0
    pub dpi_aware: bool,
    pub border_offset_x: i32,
    pub border_offset_y: i32,

    /// Enable template-matching refinement
    pub use_image_recognition: bool,
    /// Minimum correlation score for a match to be accepted
    pub recognition_threshold: f32,
    /// Half-size of the square search window around each control, in pixels
    pub search_area_size: u32,
    pub match_method: MatchMethod,

    /// Worker threads for per-control resolution (1 = sequential)
    pub workers: usize,

    /// Control layout override; the built-in catalogue is used when empty
    pub controls: Vec<ControlEntry>,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            templates_dir: PathBuf::from("templates"),
            window_title: "FORM Designer".to_string(),
            child_window_pattern: "모의실행".to_string(),
            screenshot_filename: "captured_map.png".to_string(),
            positions_filename: "control_positions.py".to_string(),
            positions_format: PositionFormat::Literal,
            dpi_aware: true,
            border_offset_x: 8,
            border_offset_y: 31,
            use_image_recognition: true,
            recognition_threshold: 0.8,
            search_area_size: 20,
            match_method: MatchMethod::CorrelationCoefficient,
            workers: 1,
            controls: Vec::new(),
        }
    }
}

impl LocatorConfig {
    /// Load and validate a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: LocatorConfig = toml::from_str(&content)?;
        config.validate()?;
        log::info!(
            "Loaded config from {} (window '{}', child pattern '{}')",
            path.display(),
            config.window_title,
            config.child_window_pattern
        );
        Ok(config)
    }

    /// Load a configuration file, falling back to defaults when it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            log::info!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    /// Write the configuration as TOML
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        log::info!("Config saved to {}", path.display());
        Ok(())
    }

    /// Reject values the pipeline cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.window_title.is_empty() {
            return Err(LocatorError::Config("window_title must not be empty".into()));
        }
        if self.child_window_pattern.is_empty() {
            return Err(LocatorError::Config(
                "child_window_pattern must not be empty".into(),
            ));
        }
        if !(-1.0..=1.0).contains(&self.recognition_threshold) {
            return Err(LocatorError::Config(format!(
                "recognition_threshold {} outside [-1, 1]",
                self.recognition_threshold
            )));
        }
        if self.search_area_size == 0 {
            return Err(LocatorError::Config("search_area_size must be positive".into()));
        }
        if self.workers == 0 {
            return Err(LocatorError::Config("workers must be at least 1".into()));
        }
        if self.screenshot_filename.is_empty() || self.positions_filename.is_empty() {
            return Err(LocatorError::Config("output file names must not be empty".into()));
        }
        Ok(())
    }

    pub fn border_offset(&self) -> BorderOffset {
        BorderOffset::new(self.border_offset_x, self.border_offset_y)
    }

    /// The configured layout, or the built-in catalogue
    pub fn layout(&self) -> Result<ControlLayout> {
        if self.controls.is_empty() {
            Ok(ControlLayout::default_catalogue())
        } else {
            ControlLayout::from_entries(&self.controls)
        }
    }

    pub fn screenshot_path(&self) -> PathBuf {
        self.templates_dir.join(&self.screenshot_filename)
    }

    pub fn positions_path(&self) -> PathBuf {
        self.templates_dir.join(&self.positions_filename)
    }
}

/// Find the config file next to the executable, then in the working directory
pub fn resolve_config_path() -> Option<PathBuf> {
    if let Ok(exe) = std::env::current_exe() {
        if let Some(parent) = exe.parent() {
            let candidate = parent.join(CONFIG_FILENAME);
            if candidate.exists() {
                log::debug!("Config found next to executable: {}", candidate.display());
                return Some(candidate);
            }
        }
    }

    let candidate = std::env::current_dir().ok()?.join(CONFIG_FILENAME);
    if candidate.exists() {
        log::debug!("Config found in working directory: {}", candidate.display());
        return Some(candidate);
    }

    None
}

/// Layout file written by measurement mode
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutFile {
    #[serde(default)]
    pub controls: Vec<ControlEntry>,
}

impl LayoutFile {
    pub fn from_layout(layout: &ControlLayout) -> Self {
        Self {
            controls: layout.to_entries(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        log::info!("Layout with {} controls saved to {}", self.controls.len(), path.display());
        Ok(())
    }
}
