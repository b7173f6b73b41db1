//! Operating system seams
//!
//! This module provides platform-agnostic abstractions for the windowing
//! system, screen capture, DPI queries and operator input, with a Windows
//! implementation and a fallback that reports every operation as unsupported.
//! The resolver only talks to these traits, so tests drive it with in-memory
//! fakes.

#[cfg(target_os = "windows")]
mod windows;

#[cfg(not(target_os = "windows"))]
mod unsupported;

#[cfg(target_os = "windows")]
pub use self::windows::Win32Desktop as Desktop;

#[cfg(not(target_os = "windows"))]
pub use unsupported::UnsupportedDesktop as Desktop;

use image::RgbaImage;

use crate::geometry::{Point, WindowRect};
use crate::Result;

/// Opaque native window handle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub isize);

/// A window and its title at enumeration time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowInfo {
    pub handle: WindowHandle,
    pub title: String,
}

impl WindowInfo {
    pub fn new(handle: WindowHandle, title: impl Into<String>) -> Self {
        Self {
            handle,
            title: title.into(),
        }
    }
}

/// Window enumeration and geometry
pub trait WindowSystem: Send + Sync {
    /// All top-level windows in enumeration order
    fn top_level_windows(&self) -> Result<Vec<WindowInfo>>;

    /// All descendants of `parent` in enumeration order
    fn descendant_windows(&self, parent: WindowHandle) -> Result<Vec<WindowInfo>>;

    /// Screen rectangle of a window
    fn window_rect(&self, handle: WindowHandle) -> Result<WindowRect>;
}

/// Screen capture of a rectangle
pub trait ScreenCapture: Send + Sync {
    /// Capture `rect`; the image is `rect.width() x rect.height()` pixels
    fn capture(&self, rect: &WindowRect) -> Result<RgbaImage>;
}

/// Display scale query
pub trait DpiProbe: Send + Sync {
    /// Ratio of the system DPI to the 96 DPI baseline
    fn system_scale(&self) -> Result<f64>;
}

/// Operator input keys sampled by measurement mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKey {
    /// Record the pointer position (left mouse button)
    Confirm,
    /// Abandon the measurement (Escape)
    Cancel,
}

/// Pointer and key sampling
pub trait InputProbe {
    fn cursor_position(&self) -> Result<Point>;

    /// Whether `key` is currently held down
    fn is_pressed(&self, key: InputKey) -> Result<bool>;
}
