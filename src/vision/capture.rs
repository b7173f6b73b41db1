//! Captured screenshot of the located window

use image::{GrayImage, RgbaImage};

use crate::geometry::{Point, WindowRect};

/// Square search area clamped to the screenshot, in image coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchArea {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// A screenshot together with the screen position it was taken at
///
/// The luma plane is computed once so that every control of a pass can search
/// the same immutable surface.
#[derive(Debug, Clone)]
pub struct CapturedRegion {
    origin: Point,
    image: RgbaImage,
    luma: GrayImage,
}

impl CapturedRegion {
    /// Wrap a capture whose top-left pixel sits at `origin` on screen
    pub fn new(origin: Point, image: RgbaImage) -> Self {
        let luma = image::imageops::grayscale(&image);
        Self { origin, image, luma }
    }

    /// Wrap a capture of `rect`
    pub fn of_rect(rect: &WindowRect, image: RgbaImage) -> Self {
        Self::new(rect.origin(), image)
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Colour pixels, as written to the screenshot file
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Grayscale pixels, as used for matching
    pub fn luma(&self) -> &GrayImage {
        &self.luma
    }

    /// Screen coordinate to image coordinate
    pub fn to_local(&self, point: Point) -> (i64, i64) {
        (
            i64::from(point.x) - i64::from(self.origin.x),
            i64::from(point.y) - i64::from(self.origin.y),
        )
    }

    /// Image coordinate to screen coordinate
    pub fn to_screen(&self, x: u32, y: u32) -> Point {
        Point::new(self.origin.x + x as i32, self.origin.y + y as i32)
    }

    /// The area `[p - half, p + half)` on both axes, clamped to the image
    ///
    /// Returns `None` when nothing of the area lies inside the screenshot.
    pub fn search_area(&self, point: Point, half_size: u32) -> Option<SearchArea> {
        let (lx, ly) = self.to_local(point);
        let half = i64::from(half_size);

        let x0 = (lx - half).max(0);
        let y0 = (ly - half).max(0);
        let x1 = (lx + half).min(i64::from(self.width()));
        let y1 = (ly + half).min(i64::from(self.height()));

        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        Some(SearchArea {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
        })
    }

    /// Grayscale crop of a search area
    pub fn crop_luma(&self, area: &SearchArea) -> GrayImage {
        image::imageops::crop_imm(&self.luma, area.x, area.y, area.width, area.height).to_image()
    }
}
