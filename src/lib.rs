//! Control Locator
//!
//! Finds the controls of a desktop application window and records their
//! absolute screen coordinates for an external clicking tool.
//!
//! A resolution pass:
//! 1. locates the target window and its child search surface
//! 2. captures that surface once
//! 3. offsets every control of the layout from the window origin, corrects the
//!    result for window chrome and display scale, and optionally snaps it onto
//!    the control's reference image
//! 4. drops controls that land outside the window
//! 5. writes the screenshot and the coordinate file atomically
//!
//! Platform access goes through the traits in [`platform`], so the whole
//! pipeline runs against in-memory fakes in tests.

pub mod config;
pub mod dpi;
pub mod error;
pub mod geometry;
pub mod layout;
pub mod locator;
pub mod measure;
pub mod persistence;
pub mod platform;
pub mod resolver;
pub mod vision;

// Re-export commonly used types
pub use config::{LocatorConfig, PositionFormat};
pub use dpi::{CoordinateCorrector, DpiContext, DpiSource};
pub use error::{Disposition, LocatorError, Result};
pub use geometry::{BorderOffset, Offset, Point, WindowRect};
pub use layout::{ControlLayout, ControlPositionTable};
pub use locator::{locate_windows, LocatedWindow, WindowLocator};
pub use measure::ManualMeasurement;
pub use persistence::{load_positions, parse_positions, write_outputs};
pub use resolver::{CancelHandle, ResolutionReport, Resolver, ResolverState};
