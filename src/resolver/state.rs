//! Resolver state and pass report types

use std::fmt;

use crate::dpi::DpiContext;
use crate::geometry::Point;
use crate::layout::ControlPositionTable;
use crate::locator::LocatedWindow;
use crate::persistence::PersistedFiles;

/// Step a resolution pass has reached
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ResolverState {
    #[default]
    Idle,
    WindowLocated,
    Captured,
    Resolving,
    Validated,
    Persisted,
    /// The pass ended early; the message names the cause
    Aborted(String),
}

impl ResolverState {
    /// Whether the pass can advance no further
    pub fn is_terminal(&self) -> bool {
        matches!(self, ResolverState::Persisted | ResolverState::Aborted(_))
    }
}

impl fmt::Display for ResolverState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolverState::Idle => f.write_str("idle"),
            ResolverState::WindowLocated => f.write_str("window located"),
            ResolverState::Captured => f.write_str("captured"),
            ResolverState::Resolving => f.write_str("resolving"),
            ResolverState::Validated => f.write_str("validated"),
            ResolverState::Persisted => f.write_str("persisted"),
            ResolverState::Aborted(reason) => write!(f, "aborted: {}", reason),
        }
    }
}

/// What happened to one control
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeStatus {
    /// Kept in the table; `refined` when template matching moved it
    Accepted { refined: bool },
    /// Dropped for lying outside the window
    Rejected,
}

/// Per-control record of a pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlOutcome {
    pub name: String,
    /// Final candidate coordinate, whether accepted or not
    pub point: Point,
    pub status: OutcomeStatus,
}

impl ControlOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self.status, OutcomeStatus::Accepted { .. })
    }
}

/// Everything a finished pass produced
#[derive(Debug, Clone)]
pub struct ResolutionReport {
    pub window: LocatedWindow,
    pub dpi: DpiContext,
    /// Accepted controls in layout order
    pub table: ControlPositionTable,
    /// One record per layout entry, in layout order
    pub outcomes: Vec<ControlOutcome>,
    /// Recovered errors, in the order they occurred
    pub warnings: Vec<String>,
    /// Output files, `None` for a dry run
    pub written: Option<PersistedFiles>,
}

impl ResolutionReport {
    pub fn accepted(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_accepted()).count()
    }

    pub fn rejected(&self) -> usize {
        self.outcomes.len() - self.accepted()
    }

    pub fn refined(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| o.status == OutcomeStatus::Accepted { refined: true })
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_states() {
        assert!(!ResolverState::Idle.is_terminal());
        assert!(!ResolverState::Validated.is_terminal());
        assert!(ResolverState::Persisted.is_terminal());
        assert!(ResolverState::Aborted("x".into()).is_terminal());
        assert_eq!(ResolverState::default(), ResolverState::Idle);
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ResolverState::WindowLocated.to_string(), "window located");
        assert_eq!(
            ResolverState::Aborted("no window".into()).to_string(),
            "aborted: no window"
        );
    }
}
