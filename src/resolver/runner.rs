//! Resolution pass runner

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::state::{ControlOutcome, OutcomeStatus, ResolutionReport, ResolverState};
use crate::config::{LocatorConfig, PositionFormat};
use crate::dpi::{CoordinateCorrector, DpiContext, DpiSource};
use crate::error::Disposition;
use crate::geometry::{Offset, Point, WindowRect};
use crate::layout::{ControlLayout, ControlPositionTable};
use crate::locator::WindowLocator;
use crate::persistence;
use crate::platform::{ScreenCapture, WindowSystem};
use crate::vision::{CapturedRegion, RefinerConfig, TemplateRefiner};
use crate::{LocatorError, Result};

/// Requests cancellation of a running pass from another thread
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(Arc<AtomicBool>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Candidate produced for one control before validation
struct Candidate {
    name: String,
    point: Point,
    refined: bool,
    warning: Option<String>,
}

/// Runs the locate, capture, resolve, validate and persist pipeline
pub struct Resolver {
    locator: WindowLocator,
    layout: ControlLayout,
    corrector: CoordinateCorrector,
    refiner: TemplateRefiner,
    workers: usize,
    persist: bool,
    screenshot_path: PathBuf,
    positions_path: PathBuf,
    positions_format: PositionFormat,
    /// Current step, readable from other threads
    state: Arc<Mutex<ResolverState>>,
    /// Checked at every step boundary; a cancelled resolver stays cancelled
    cancel: CancelHandle,
}

impl Resolver {
    /// Build a resolver from validated configuration and an already-resolved DPI context
    pub fn new(config: &LocatorConfig, dpi: DpiContext) -> Result<Self> {
        config.validate()?;
        let layout = config.layout()?;

        Ok(Self {
            locator: WindowLocator::new(&config.window_title, &config.child_window_pattern),
            layout,
            corrector: CoordinateCorrector::new(dpi, config.border_offset()),
            refiner: TemplateRefiner::new(RefinerConfig::from(config)),
            workers: config.workers,
            persist: true,
            screenshot_path: config.screenshot_path(),
            positions_path: config.positions_path(),
            positions_format: config.positions_format,
            state: Arc::new(Mutex::new(ResolverState::Idle)),
            cancel: CancelHandle::default(),
        })
    }

    /// Replace the layout taken from configuration
    pub fn with_layout(mut self, layout: ControlLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Stop after validation without writing any file
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.persist = !dry_run;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn layout(&self) -> &ControlLayout {
        &self.layout
    }

    pub fn state(&self) -> ResolverState {
        self.state.lock().clone()
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Share an existing cancellation flag, e.g. one set from a signal handler
    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run one pass; on error the state is left at `Aborted`
    pub fn run(
        &self,
        windows: &dyn WindowSystem,
        capture: &dyn ScreenCapture,
    ) -> Result<ResolutionReport> {
        self.set_state(ResolverState::Idle);

        match self.run_pass(windows, capture) {
            Ok(report) => Ok(report),
            Err(e) => {
                log::error!("Resolution aborted: {}", e);
                self.set_state(ResolverState::Aborted(e.to_string()));
                Err(e)
            }
        }
    }

    fn run_pass(
        &self,
        windows: &dyn WindowSystem,
        capture: &dyn ScreenCapture,
    ) -> Result<ResolutionReport> {
        let mut warnings = Vec::new();
        let dpi = self.corrector.dpi();
        if dpi.source() == DpiSource::Fallback {
            warnings.push("DPI query failed, scale 1.0 used".to_string());
        }

        self.check_cancelled()?;
        let window = self.locator.locate(windows)?;
        let rect = window.rect;
        log::info!(
            "Window info: left={} top={} width={} height={}",
            rect.x(),
            rect.y(),
            rect.width(),
            rect.height()
        );
        self.set_state(ResolverState::WindowLocated);

        self.check_cancelled()?;
        let image = capture.capture(&rect)?;
        if i64::from(image.width()) != i64::from(rect.width())
            || i64::from(image.height()) != i64::from(rect.height())
        {
            log::warn!(
                "Capture is {}x{} but the window is {}x{}",
                image.width(),
                image.height(),
                rect.width(),
                rect.height()
            );
        }
        let region = CapturedRegion::of_rect(&rect, image);
        self.set_state(ResolverState::Captured);

        self.check_cancelled()?;
        self.set_state(ResolverState::Resolving);
        let candidates = self.resolve_candidates(&rect, &region)?;

        self.check_cancelled()?;
        let mut table = ControlPositionTable::new();
        let mut outcomes = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            warnings.extend(candidate.warning);

            let status = if rect.contains(candidate.point) {
                log::info!(
                    "{}: ({}, {})",
                    candidate.name,
                    candidate.point.x,
                    candidate.point.y
                );
                table.insert(candidate.name.as_str(), candidate.point);
                OutcomeStatus::Accepted {
                    refined: candidate.refined,
                }
            } else {
                let rejection = LocatorError::ValidationRejected {
                    control: candidate.name.clone(),
                    point: candidate.point,
                };
                self.recover(rejection, &mut warnings)?;
                OutcomeStatus::Rejected
            };

            outcomes.push(ControlOutcome {
                name: candidate.name,
                point: candidate.point,
                status,
            });
        }
        self.set_state(ResolverState::Validated);
        log::info!(
            "{} of {} controls accepted",
            table.len(),
            self.layout.len()
        );

        let written = if self.persist {
            self.check_cancelled()?;
            let files = persistence::write_outputs(
                &table,
                region.image(),
                &self.screenshot_path,
                &self.positions_path,
                self.positions_format,
            )?;
            self.set_state(ResolverState::Persisted);
            Some(files)
        } else {
            log::info!("Dry run, no files written");
            None
        };

        Ok(ResolutionReport {
            window,
            dpi,
            table,
            outcomes,
            warnings,
            written,
        })
    }

    /// Resolve every layout entry, in layout order
    ///
    /// With more than one worker the layout is split into contiguous chunks,
    /// each resolved on a scoped thread; chunks are joined in order.
    fn resolve_candidates(
        &self,
        rect: &WindowRect,
        region: &CapturedRegion,
    ) -> Result<Vec<Candidate>> {
        let entries: Vec<(&str, Offset)> = self.layout.iter().collect();
        let origin = rect.origin();

        if self.workers <= 1 || entries.len() <= 1 {
            return entries
                .iter()
                .map(|(name, offset)| self.resolve_control(name, *offset, origin, region))
                .collect();
        }

        let chunk_size = entries.len().div_ceil(self.workers);
        log::debug!(
            "Resolving {} controls on {} workers",
            entries.len(),
            entries.len().div_ceil(chunk_size)
        );

        std::thread::scope(|scope| {
            let handles: Vec<_> = entries
                .chunks(chunk_size)
                .map(|chunk| {
                    scope.spawn(move || {
                        chunk
                            .iter()
                            .map(|(name, offset)| self.resolve_control(name, *offset, origin, region))
                            .collect::<Result<Vec<_>>>()
                    })
                })
                .collect();

            let mut candidates = Vec::with_capacity(entries.len());
            for handle in handles {
                let chunk = handle
                    .join()
                    .unwrap_or_else(|panic| std::panic::resume_unwind(panic))?;
                candidates.extend(chunk);
            }
            Ok(candidates)
        })
    }

    /// Offset, correct and refine one control
    fn resolve_control(
        &self,
        name: &str,
        offset: Offset,
        origin: Point,
        region: &CapturedRegion,
    ) -> Result<Candidate> {
        let absolute = origin.offset_by(offset);
        let corrected = self.corrector.adjust_point(absolute);

        let refined = self.refiner.refine_with_warning(region, corrected, name)?;

        Ok(Candidate {
            name: name.to_string(),
            point: refined.point,
            refined: refined.refined,
            warning: refined.warning,
        })
    }

    /// Log and record a degradable error, or hand back an aborting one
    fn recover(&self, error: LocatorError, warnings: &mut Vec<String>) -> Result<()> {
        match error.disposition() {
            Disposition::Degrade => {
                log::warn!("{}", error);
                warnings.push(error.to_string());
                Ok(())
            }
            Disposition::Abort => Err(error),
        }
    }

    fn check_cancelled(&self) -> Result<()> {
        if self.cancel.is_cancelled() {
            Err(LocatorError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn set_state(&self, state: ResolverState) {
        log::debug!("Resolver state: {}", state);
        *self.state.lock() = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::{WindowHandle, WindowInfo};
    use image::{Rgba, RgbaImage};

    struct OneWindow;

    impl WindowSystem for OneWindow {
        fn top_level_windows(&self) -> Result<Vec<WindowInfo>> {
            Ok(vec![WindowInfo::new(WindowHandle(1), "FORM Designer")])
        }

        fn descendant_windows(&self, _parent: WindowHandle) -> Result<Vec<WindowInfo>> {
            Ok(vec![WindowInfo::new(WindowHandle(2), "모의실행")])
        }

        fn window_rect(&self, _handle: WindowHandle) -> Result<WindowRect> {
            WindowRect::new(100, 100, 900, 700)
        }
    }

    struct Blank;

    impl ScreenCapture for Blank {
        fn capture(&self, rect: &WindowRect) -> Result<RgbaImage> {
            Ok(RgbaImage::from_pixel(
                rect.width() as u32,
                rect.height() as u32,
                Rgba([0, 0, 0, 255]),
            ))
        }
    }

    fn config() -> LocatorConfig {
        LocatorConfig {
            border_offset_x: 0,
            border_offset_y: 0,
            use_image_recognition: false,
            ..LocatorConfig::default()
        }
    }

    #[test]
    fn test_dry_run_stops_at_validated() {
        let resolver = Resolver::new(&config(), DpiContext::fixed(1.0))
            .unwrap()
            .dry_run(true);

        let report = resolver.run(&OneWindow, &Blank).unwrap();
        assert_eq!(resolver.state(), ResolverState::Validated);
        assert!(report.written.is_none());
        assert_eq!(report.outcomes.len(), 17);
        assert_eq!(report.table.get("5단계1"), Some(Point::new(140, 170)));
        // CFD sits at 810 + 100 = 910, past the right edge at 900
        assert!(!report.table.contains("CFD"));
        assert_eq!(report.accepted(), 16);
        assert_eq!(report.rejected(), 1);
    }

    #[test]
    fn test_cancel_before_run_aborts() {
        let resolver = Resolver::new(&config(), DpiContext::fixed(1.0))
            .unwrap()
            .dry_run(true);
        resolver.cancel_handle().cancel();

        let err = resolver.run(&OneWindow, &Blank).unwrap_err();
        assert!(matches!(err, LocatorError::Cancelled));
        assert!(matches!(resolver.state(), ResolverState::Aborted(_)));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let bad = LocatorConfig {
            workers: 0,
            ..config()
        };
        assert!(matches!(
            Resolver::new(&bad, DpiContext::default()),
            Err(LocatorError::Config(_))
        ));
    }

    #[test]
    fn test_fallback_dpi_recorded_as_warning() {
        let resolver = Resolver::new(&config(), DpiContext::fallback())
            .unwrap()
            .dry_run(true);
        let report = resolver.run(&OneWindow, &Blank).unwrap();
        assert_eq!(report.dpi.scale(), 1.0);
        assert!(report.warnings[0].contains("DPI"));
    }
}
