//! Screen geometry value types

use serde::{Deserialize, Serialize};

use crate::{LocatorError, Result};

/// Absolute screen coordinate in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Translate by a relative offset, saturating at the `i32` range
    pub fn offset_by(self, offset: Offset) -> Self {
        Self {
            x: self.x.saturating_add(offset.dx),
            y: self.y.saturating_add(offset.dy),
        }
    }
}

impl From<(i32, i32)> for Point {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Offset of a control relative to the window origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Offset {
    pub dx: i32,
    pub dy: i32,
}

impl Offset {
    pub fn new(dx: i32, dy: i32) -> Self {
        Self { dx, dy }
    }
}

/// Fixed compensation for window chrome (frame, title bar) not part of the
/// client area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BorderOffset {
    pub x: i32,
    pub y: i32,
}

impl BorderOffset {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// On-screen rectangle of a window
///
/// `right` and `bottom` are exclusive edges as reported by the windowing
/// system, but containment checks treat them inclusively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowRect {
    x: i32,
    y: i32,
    right: i32,
    bottom: i32,
}

impl WindowRect {
    /// Create a rectangle, rejecting inverted edges
    pub fn new(x: i32, y: i32, right: i32, bottom: i32) -> Result<Self> {
        if right < x || bottom < y {
            return Err(LocatorError::CaptureFailure(format!(
                "invalid window rectangle ({}, {}, {}, {})",
                x, y, right, bottom
            )));
        }
        Ok(Self { x, y, right, bottom })
    }

    pub fn x(&self) -> i32 {
        self.x
    }

    pub fn y(&self) -> i32 {
        self.y
    }

    pub fn right(&self) -> i32 {
        self.right
    }

    pub fn bottom(&self) -> i32 {
        self.bottom
    }

    pub fn width(&self) -> i32 {
        self.right - self.x
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.y
    }

    /// Top-left corner
    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    /// Inclusive containment: points on any edge are inside
    pub fn contains(&self, point: Point) -> bool {
        (self.x..=self.right).contains(&point.x) && (self.y..=self.bottom).contains(&point.y)
    }
}
