//! Fallback for platforms without a native implementation
//!
//! Window discovery and capture abort the pass; the DPI probe fails too, which
//! the DPI context turns into the 1.0 fallback.

use image::RgbaImage;

use super::{DpiProbe, InputKey, InputProbe, ScreenCapture, WindowHandle, WindowInfo, WindowSystem};
use crate::geometry::{Point, WindowRect};
use crate::{LocatorError, Result};

/// Desktop that supports nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedDesktop;

impl UnsupportedDesktop {
    pub fn new() -> Self {
        Self
    }
}

impl WindowSystem for UnsupportedDesktop {
    fn top_level_windows(&self) -> Result<Vec<WindowInfo>> {
        Err(LocatorError::Unsupported("window enumeration"))
    }

    fn descendant_windows(&self, _parent: WindowHandle) -> Result<Vec<WindowInfo>> {
        Err(LocatorError::Unsupported("window enumeration"))
    }

    fn window_rect(&self, _handle: WindowHandle) -> Result<WindowRect> {
        Err(LocatorError::Unsupported("window rectangle query"))
    }
}

impl ScreenCapture for UnsupportedDesktop {
    fn capture(&self, _rect: &WindowRect) -> Result<RgbaImage> {
        Err(LocatorError::Unsupported("screen capture"))
    }
}

impl DpiProbe for UnsupportedDesktop {
    fn system_scale(&self) -> Result<f64> {
        Err(LocatorError::DpiQueryFailure(
            "no DPI API on this platform".to_string(),
        ))
    }
}

impl InputProbe for UnsupportedDesktop {
    fn cursor_position(&self) -> Result<Point> {
        Err(LocatorError::Unsupported("pointer sampling"))
    }

    fn is_pressed(&self, _key: InputKey) -> Result<bool> {
        Err(LocatorError::Unsupported("key sampling"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_everything_is_unsupported() {
        let desktop = UnsupportedDesktop::new();
        assert!(matches!(
            desktop.top_level_windows(),
            Err(LocatorError::Unsupported(_))
        ));
        assert!(desktop.window_rect(WindowHandle(1)).is_err());
        assert!(desktop.cursor_position().is_err());
    }

    #[test]
    fn test_dpi_failure_is_recoverable() {
        let err = UnsupportedDesktop::new().system_scale().unwrap_err();
        assert_eq!(err.disposition(), crate::Disposition::Degrade);
    }
}
