//! Target window discovery
//!
//! The main window is the first top-level window whose title equals the
//! configured title exactly. The search surface is the first descendant of that
//! window whose title contains the configured pattern. "First" always means OS
//! enumeration order; there is no secondary tie-break.

use crate::geometry::WindowRect;
use crate::platform::{WindowHandle, WindowInfo, WindowSystem};
use crate::{LocatorError, Result};

/// Filter a window snapshot, keeping enumeration order
pub fn locate_windows<P>(windows: &[WindowInfo], predicate: P) -> Vec<WindowHandle>
where
    P: Fn(&WindowInfo) -> bool,
{
    windows
        .iter()
        .filter(|w| predicate(w))
        .map(|w| w.handle)
        .collect()
}

/// Result of a successful window search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocatedWindow {
    /// Top-level window matched by title
    pub main: WindowHandle,
    /// Descendant matched by title pattern
    pub child: WindowHandle,
    /// Screen rectangle of the descendant
    pub rect: WindowRect,
}

/// Finds the target window and its child search surface
#[derive(Debug, Clone)]
pub struct WindowLocator {
    title: String,
    child_pattern: String,
}

impl WindowLocator {
    /// Create a locator for an exact main title and a child title substring
    pub fn new(title: impl Into<String>, child_pattern: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            child_pattern: child_pattern.into(),
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn child_pattern(&self) -> &str {
        &self.child_pattern
    }

    /// Find the main window handle
    pub fn find_main(&self, system: &dyn WindowSystem) -> Result<WindowHandle> {
        let windows = system.top_level_windows()?;
        let matches = locate_windows(&windows, |w| w.title == self.title);

        if matches.len() > 1 {
            log::debug!(
                "{} top-level windows titled '{}', using the first",
                matches.len(),
                self.title
            );
        }

        matches
            .first()
            .copied()
            .ok_or_else(|| LocatorError::WindowNotFound {
                title: self.title.clone(),
            })
    }

    /// Find the first descendant of `main` whose title contains the pattern
    pub fn find_child(&self, system: &dyn WindowSystem, main: WindowHandle) -> Result<WindowHandle> {
        let descendants = system.descendant_windows(main)?;
        let matches = locate_windows(&descendants, |w| w.title.contains(&self.child_pattern));

        if matches.len() > 1 {
            log::warn!(
                "{} child windows contain '{}', using the first in enumeration order",
                matches.len(),
                self.child_pattern
            );
        }

        matches
            .first()
            .copied()
            .ok_or_else(|| LocatorError::ChildWindowNotFound {
                parent: self.title.clone(),
                pattern: self.child_pattern.clone(),
            })
    }

    /// Find both windows and query the child's screen rectangle
    pub fn locate(&self, system: &dyn WindowSystem) -> Result<LocatedWindow> {
        let main = self.find_main(system)?;
        let child = self.find_child(system, main)?;
        let rect = system.window_rect(child)?;

        log::info!(
            "Located '{}' child window at ({}, {}) size {}x{}",
            self.child_pattern,
            rect.x(),
            rect.y(),
            rect.width(),
            rect.height()
        );

        Ok(LocatedWindow { main, child, rect })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct StaticWindows {
        top: Vec<WindowInfo>,
        children: HashMap<WindowHandle, Vec<WindowInfo>>,
        rects: HashMap<WindowHandle, WindowRect>,
    }

    impl WindowSystem for StaticWindows {
        fn top_level_windows(&self) -> Result<Vec<WindowInfo>> {
            Ok(self.top.clone())
        }

        fn descendant_windows(&self, parent: WindowHandle) -> Result<Vec<WindowInfo>> {
            Ok(self.children.get(&parent).cloned().unwrap_or_default())
        }

        fn window_rect(&self, handle: WindowHandle) -> Result<WindowRect> {
            self.rects
                .get(&handle)
                .copied()
                .ok_or_else(|| LocatorError::CaptureFailure("no rect".to_string()))
        }
    }

    fn desktop() -> StaticWindows {
        let mut children = HashMap::new();
        children.insert(
            WindowHandle(1),
            vec![
                WindowInfo::new(WindowHandle(10), "toolbar"),
                WindowInfo::new(WindowHandle(11), "map 모의실행 A"),
                WindowInfo::new(WindowHandle(12), "map 모의실행 B"),
            ],
        );
        children.insert(
            WindowHandle(2),
            vec![WindowInfo::new(WindowHandle(20), "모의실행")],
        );

        let mut rects = HashMap::new();
        rects.insert(WindowHandle(11), WindowRect::new(100, 100, 900, 700).unwrap());
        rects.insert(WindowHandle(12), WindowRect::new(0, 0, 10, 10).unwrap());
        rects.insert(WindowHandle(20), WindowRect::new(5, 5, 50, 50).unwrap());

        StaticWindows {
            top: vec![
                WindowInfo::new(WindowHandle(3), "FORM Designer - old"),
                WindowInfo::new(WindowHandle(1), "FORM Designer"),
                WindowInfo::new(WindowHandle(2), "FORM Designer"),
            ],
            children,
            rects,
        }
    }

    #[test]
    fn test_locate_windows_keeps_order() {
        let windows = vec![
            WindowInfo::new(WindowHandle(5), "a"),
            WindowInfo::new(WindowHandle(3), "b"),
            WindowInfo::new(WindowHandle(4), "a"),
        ];
        let found = locate_windows(&windows, |w| w.title == "a");
        assert_eq!(found, vec![WindowHandle(5), WindowHandle(4)]);
        assert!(locate_windows(&windows, |w| w.title == "z").is_empty());
    }

    #[test]
    fn test_main_title_is_exact_match() {
        let locator = WindowLocator::new("FORM Designer", "모의실행");
        // "FORM Designer - old" comes first but is not an exact match
        assert_eq!(locator.find_main(&desktop()).unwrap(), WindowHandle(1));
    }

    #[test]
    fn test_first_matching_child_wins() {
        let locator = WindowLocator::new("FORM Designer", "모의실행");
        let located = locator.locate(&desktop()).unwrap();

        assert_eq!(located.main, WindowHandle(1));
        assert_eq!(located.child, WindowHandle(11));
        assert_eq!(located.rect, WindowRect::new(100, 100, 900, 700).unwrap());
    }

    #[test]
    fn test_missing_main_window() {
        let locator = WindowLocator::new("Notepad", "모의실행");
        let err = locator.locate(&desktop()).unwrap_err();
        assert!(matches!(err, LocatorError::WindowNotFound { ref title } if title == "Notepad"));
    }

    #[test]
    fn test_missing_child_window() {
        let locator = WindowLocator::new("FORM Designer", "chart");
        let err = locator.locate(&desktop()).unwrap_err();
        assert!(matches!(err, LocatorError::ChildWindowNotFound { ref pattern, .. } if pattern == "chart"));
    }
}
