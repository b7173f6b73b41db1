//! Error types for control location
//!
//! Every boundary of the pipeline returns [`LocatorError`]. Whether a given
//! error ends the resolution pass or only degrades a single control is decided
//! by [`LocatorError::disposition`].

use std::path::PathBuf;

use thiserror::Error;

use crate::geometry::Point;

/// Result type for control location operations
pub type Result<T> = std::result::Result<T, LocatorError>;

/// What the resolver does when it meets an error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// End the pass, write nothing
    Abort,
    /// Keep going with reduced accuracy for the affected control
    Degrade,
}

/// Error type for window discovery, refinement and persistence
#[derive(Debug, Error)]
pub enum LocatorError {
    #[error("window titled '{title}' not found")]
    WindowNotFound { title: String },

    #[error("no child window of '{parent}' has a title containing '{pattern}'")]
    ChildWindowNotFound { parent: String, pattern: String },

    #[error("capture failed: {0}")]
    CaptureFailure(String),

    #[error("refinement of '{control}' failed: {reason}")]
    RefinementFailure { control: String, reason: String },

    #[error("control '{control}' resolved to ({}, {}) outside the window", .point.x, .point.y)]
    ValidationRejected { control: String, point: Point },

    #[error("DPI query failed: {0}")]
    DpiQueryFailure(String),

    #[error("cannot write {}: {source}", .path.display())]
    PersistenceFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("layout error: {0}")]
    Layout(String),

    #[error("coordinate file parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("{0} is not supported on this platform")]
    Unsupported(&'static str),

    #[error("resolution cancelled")]
    Cancelled,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML deserialize error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
}

impl LocatorError {
    /// Policy table: which errors end a pass and which only cost accuracy
    pub fn disposition(&self) -> Disposition {
        match self {
            LocatorError::RefinementFailure { .. }
            | LocatorError::ValidationRejected { .. }
            | LocatorError::DpiQueryFailure(_) => Disposition::Degrade,
            LocatorError::WindowNotFound { .. }
            | LocatorError::ChildWindowNotFound { .. }
            | LocatorError::CaptureFailure(_)
            | LocatorError::PersistenceFailure { .. }
            | LocatorError::Config(_)
            | LocatorError::Layout(_)
            | LocatorError::Parse { .. }
            | LocatorError::Unsupported(_)
            | LocatorError::Cancelled
            | LocatorError::Io(_)
            | LocatorError::TomlDe(_)
            | LocatorError::TomlSer(_)
            | LocatorError::Json(_)
            | LocatorError::Image(_) => Disposition::Abort,
        }
    }

    /// Shorthand for a refinement failure
    pub fn refinement(control: impl Into<String>, reason: impl Into<String>) -> Self {
        LocatorError::RefinementFailure {
            control: control.into(),
            reason: reason.into(),
        }
    }

    /// Wrap an IO error with the path that could not be written
    pub fn persistence(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        LocatorError::PersistenceFailure {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_errors_abort() {
        let missing = LocatorError::WindowNotFound {
            title: "FORM Designer".to_string(),
        };
        assert_eq!(missing.disposition(), Disposition::Abort);

        let child = LocatorError::ChildWindowNotFound {
            parent: "FORM Designer".to_string(),
            pattern: "map".to_string(),
        };
        assert_eq!(child.disposition(), Disposition::Abort);

        let capture = LocatorError::CaptureFailure("BitBlt failed".to_string());
        assert_eq!(capture.disposition(), Disposition::Abort);

        let write = LocatorError::persistence(
            "templates/control_positions.py",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(write.disposition(), Disposition::Abort);
        assert_eq!(LocatorError::Cancelled.disposition(), Disposition::Abort);
    }

    #[test]
    fn test_recoverable_errors_degrade() {
        let refine = LocatorError::refinement("Tick", "template larger than search area");
        assert_eq!(refine.disposition(), Disposition::Degrade);

        let rejected = LocatorError::ValidationRejected {
            control: "CFD".to_string(),
            point: Point::new(2000, 2000),
        };
        assert_eq!(rejected.disposition(), Disposition::Degrade);

        let dpi = LocatorError::DpiQueryFailure("shcore missing".to_string());
        assert_eq!(dpi.disposition(), Disposition::Degrade);
    }

    #[test]
    fn test_messages_name_the_missing_resource() {
        let err = LocatorError::WindowNotFound {
            title: "FORM Designer".to_string(),
        };
        assert!(err.to_string().contains("FORM Designer"));

        let err = LocatorError::ChildWindowNotFound {
            parent: "FORM Designer".to_string(),
            pattern: "모의실행".to_string(),
        };
        let s = err.to_string();
        assert!(s.contains("모의실행"));
        assert!(s.contains("FORM Designer"));

        let err = LocatorError::ValidationRejected {
            control: "CFD".to_string(),
            point: Point::new(2000, 1999),
        };
        assert!(err.to_string().contains("(2000, 1999)"));
    }
}
