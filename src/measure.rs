//! Manual measurement of control offsets
//!
//! The operator points at each control in turn and clicks. Each click is
//! mapped back through the coordinate correction a resolution pass applies
//! (border, then scale) and recorded relative to the target window origin, so
//! resolving the recorded layout lands on the clicked pixel. Escape or a
//! cancelled [`CancelHandle`] abandons the whole measurement.

use std::time::Duration;

use crate::dpi::{CoordinateCorrector, DpiContext};
use crate::geometry::{BorderOffset, Offset, Point};
use crate::layout::ControlLayout;
use crate::platform::{InputKey, InputProbe};
use crate::resolver::CancelHandle;
use crate::{LocatorError, Result};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Interactive offset recorder
pub struct ManualMeasurement<'a> {
    probe: &'a dyn InputProbe,
    poll_interval: Duration,
    corrector: CoordinateCorrector,
    cancel: CancelHandle,
}

impl<'a> ManualMeasurement<'a> {
    /// Records raw pointer offsets until a corrector is supplied
    pub fn new(probe: &'a dyn InputProbe) -> Self {
        Self {
            probe,
            poll_interval: DEFAULT_POLL_INTERVAL,
            corrector: CoordinateCorrector::new(DpiContext::disabled(), BorderOffset::default()),
            cancel: CancelHandle::default(),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// The correction later resolution passes will apply to the layout
    pub fn with_corrector(mut self, corrector: CoordinateCorrector) -> Self {
        self.corrector = corrector;
        self
    }

    /// Share a cancellation flag, checked on every poll
    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    /// Record one offset per name, relative to `origin`
    ///
    /// Returns [`LocatorError::Cancelled`] if Escape is pressed or the cancel
    /// handle fires; nothing is recorded in that case.
    pub fn measure<'n, I>(&self, origin: Point, names: I) -> Result<ControlLayout>
    where
        I: IntoIterator<Item = &'n str>,
    {
        let mut recorded = Vec::new();
        // A button already held when measurement starts must be released first
        let mut was_down = true;

        for name in names {
            log::info!("Point at '{}' and click (Esc cancels)", name);
            let point = self.wait_for_click(&mut was_down)?;
            let raw = self.corrector.unadjust(point);
            let offset = Offset::new(raw.x.saturating_sub(origin.x), raw.y.saturating_sub(origin.y));
            log::info!("'{}' at ({}, {}), offset ({}, {})", name, point.x, point.y, offset.dx, offset.dy);
            recorded.push((name.to_string(), offset));
        }

        ControlLayout::new(recorded)
    }

    /// Block until the confirm button goes down, returning the pointer position
    fn wait_for_click(&self, was_down: &mut bool) -> Result<Point> {
        loop {
            if self.cancel.is_cancelled() {
                log::warn!("Measurement interrupted");
                return Err(LocatorError::Cancelled);
            }
            if self.probe.is_pressed(InputKey::Cancel)? {
                log::warn!("Measurement cancelled");
                return Err(LocatorError::Cancelled);
            }

            let down = self.probe.is_pressed(InputKey::Confirm)?;
            let pressed = down && !*was_down;
            *was_down = down;
            if pressed {
                return self.probe.cursor_position();
            }

            std::thread::sleep(self.poll_interval);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// One sampled input frame: pointer, confirm held, cancel held
    type Frame = (Point, bool, bool);

    /// Replays frames; each cancel query advances to the next frame
    struct Script {
        frames: Vec<Frame>,
        next: Cell<usize>,
    }

    impl Script {
        fn new(frames: Vec<Frame>) -> Self {
            Self {
                frames,
                next: Cell::new(0),
            }
        }

        fn current(&self) -> Frame {
            let index = self.next.get().saturating_sub(1);
            self.frames[index.min(self.frames.len() - 1)]
        }
    }

    impl InputProbe for Script {
        fn cursor_position(&self) -> Result<Point> {
            Ok(self.current().0)
        }

        fn is_pressed(&self, key: InputKey) -> Result<bool> {
            match key {
                InputKey::Cancel => {
                    let index = self.next.get();
                    self.next.set(index + 1);
                    // Running out of script counts as cancel
                    Ok(index >= self.frames.len() || self.frames[index].2)
                }
                InputKey::Confirm => Ok(self.current().1),
            }
        }
    }

    fn up(x: i32, y: i32) -> Frame {
        (Point::new(x, y), false, false)
    }

    fn down(x: i32, y: i32) -> Frame {
        (Point::new(x, y), true, false)
    }

    #[test]
    fn test_records_offsets_on_press() {
        let script = Script::new(vec![
            up(0, 0),
            up(140, 170),
            down(140, 170),
            down(141, 171),
            up(190, 170),
            down(190, 170),
        ]);
        let measurement = ManualMeasurement::new(&script).with_poll_interval(Duration::ZERO);

        let layout = measurement
            .measure(Point::new(100, 100), ["A", "B"])
            .unwrap();
        assert_eq!(layout.get("A"), Some(Offset::new(40, 70)));
        assert_eq!(layout.get("B"), Some(Offset::new(90, 70)));
    }

    #[test]
    fn test_held_button_needs_release() {
        let script = Script::new(vec![down(5, 5), down(6, 6), up(7, 7), down(8, 8)]);
        let measurement = ManualMeasurement::new(&script).with_poll_interval(Duration::ZERO);

        let layout = measurement.measure(Point::new(0, 0), ["A"]).unwrap();
        assert_eq!(layout.get("A"), Some(Offset::new(8, 8)));
    }

    #[test]
    fn test_escape_cancels_everything() {
        let script = Script::new(vec![
            up(0, 0),
            down(10, 10),
            up(10, 10),
            (Point::new(20, 20), false, true),
        ]);
        let measurement = ManualMeasurement::new(&script).with_poll_interval(Duration::ZERO);

        let err = measurement.measure(Point::new(0, 0), ["A", "B"]).unwrap_err();
        assert!(matches!(err, LocatorError::Cancelled));
    }

    #[test]
    fn test_cancel_handle_stops_waiting() {
        // Never clicks and never presses Escape before the script runs out
        let script = Script::new(vec![up(0, 0); 1000]);
        let cancel = CancelHandle::default();
        cancel.cancel();
        let measurement = ManualMeasurement::new(&script)
            .with_poll_interval(Duration::ZERO)
            .with_cancel_handle(cancel);

        let err = measurement.measure(Point::new(0, 0), ["A"]).unwrap_err();
        assert!(matches!(err, LocatorError::Cancelled));
        // Stopped before sampling any input
        assert_eq!(script.next.get(), 0);
    }

    #[test]
    fn test_offsets_undo_border_and_scale() {
        let script = Script::new(vec![up(0, 0), down(364, 378)]);
        let corrector = CoordinateCorrector::new(DpiContext::fixed(2.0), BorderOffset::new(8, 31));
        let measurement = ManualMeasurement::new(&script)
            .with_poll_interval(Duration::ZERO)
            .with_corrector(corrector);

        let origin = Point::new(100, 100);
        let layout = measurement.measure(origin, ["A"]).unwrap();
        // 364 / 2 + 8 - 100 = 90, 378 / 2 + 31 - 100 = 120
        let offset = layout.get("A").unwrap();
        assert_eq!(offset, Offset::new(90, 120));
        assert_eq!(corrector.adjust_point(origin.offset_by(offset)), Point::new(364, 378));
    }
}
