//! DPI scale resolution and coordinate correction
//!
//! The scale factor is resolved once into a [`DpiContext`] and handed to the
//! components that need it. A failed query never fails the pass: the scale
//! falls back to 1.0, which only costs accuracy on scaled displays.

use once_cell::sync::OnceCell;

use crate::geometry::{BorderOffset, Point};
use crate::platform::DpiProbe;

/// Where the scale value came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DpiSource {
    /// Read from the operating system
    Queried,
    /// The query failed; 1.0 is assumed
    Fallback,
    /// DPI awareness is disabled in configuration
    Disabled,
}

/// Resolved display scale, fixed for the lifetime of the value
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DpiContext {
    scale: f64,
    source: DpiSource,
}

static PROCESS_DPI: OnceCell<DpiContext> = OnceCell::new();

impl DpiContext {
    /// Query the probe once; any failure degrades to a scale of 1.0
    pub fn resolve(probe: &dyn DpiProbe, dpi_aware: bool) -> Self {
        if !dpi_aware {
            return Self::disabled();
        }

        match probe.system_scale() {
            Ok(scale) if scale.is_finite() && scale > 0.0 => {
                log::info!("DPI scale {:.2}", scale);
                Self {
                    scale,
                    source: DpiSource::Queried,
                }
            }
            Ok(scale) => {
                log::warn!("Ignoring invalid DPI scale {}, using 1.0", scale);
                Self::fallback()
            }
            Err(e) => {
                log::warn!("{}, using DPI scale 1.0", e);
                Self::fallback()
            }
        }
    }

    /// Process-wide context, resolved on first call only
    ///
    /// Later calls return the first result regardless of their arguments.
    pub fn process(probe: &dyn DpiProbe, dpi_aware: bool) -> Self {
        *PROCESS_DPI.get_or_init(|| Self::resolve(probe, dpi_aware))
    }

    /// A fixed scale, for callers that already know it
    pub fn fixed(scale: f64) -> Self {
        Self {
            scale,
            source: DpiSource::Queried,
        }
    }

    pub fn fallback() -> Self {
        Self {
            scale: 1.0,
            source: DpiSource::Fallback,
        }
    }

    pub fn disabled() -> Self {
        Self {
            scale: 1.0,
            source: DpiSource::Disabled,
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn source(&self) -> DpiSource {
        self.source
    }
}

impl Default for DpiContext {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Applies border compensation and DPI scaling to absolute coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateCorrector {
    dpi: DpiContext,
    border: BorderOffset,
}

impl CoordinateCorrector {
    pub fn new(dpi: DpiContext, border: BorderOffset) -> Self {
        Self { dpi, border }
    }

    pub fn dpi(&self) -> DpiContext {
        self.dpi
    }

    pub fn border(&self) -> BorderOffset {
        self.border
    }

    /// `((x - border.x) * scale, (y - border.y) * scale)`, truncated toward zero
    ///
    /// Results outside the `i32` range saturate at its bounds.
    pub fn adjust(&self, x: i32, y: i32) -> (i32, i32) {
        let scale = self.dpi.scale;
        // Float-to-int `as` casts saturate
        let ax = ((f64::from(x) - f64::from(self.border.x)) * scale) as i32;
        let ay = ((f64::from(y) - f64::from(self.border.y)) * scale) as i32;
        (ax, ay)
    }

    pub fn adjust_point(&self, point: Point) -> Point {
        let (x, y) = self.adjust(point.x, point.y);
        Point::new(x, y)
    }

    /// Map a corrected coordinate back to the raw window frame
    ///
    /// `(x / scale + border.x, y / scale + border.y)`, rounded to nearest, so
    /// that `adjust_point(unadjust(p))` lands on `p` for integral scales.
    pub fn unadjust(&self, point: Point) -> Point {
        let scale = self.dpi.scale;
        let x = (f64::from(point.x) / scale + f64::from(self.border.x)).round() as i32;
        let y = (f64::from(point.y) / scale + f64::from(self.border.y)).round() as i32;
        Point::new(x, y)
    }
}
