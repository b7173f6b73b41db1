//! Control layout and resolved position table
//!
//! A [`ControlLayout`] is the static input of a resolution pass: named offsets
//! relative to the target window origin. A [`ControlPositionTable`] is its
//! output: the absolute coordinates of every control that passed validation.
//! Both keep definition order.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::geometry::{Offset, Point};
use crate::{LocatorError, Result};

/// One named control as written in configuration files
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlEntry {
    /// Unique control name, also the template file stem
    pub name: String,
    /// Horizontal offset from the window origin
    pub dx: i32,
    /// Vertical offset from the window origin
    pub dy: i32,
}

impl ControlEntry {
    pub fn new(name: impl Into<String>, dx: i32, dy: i32) -> Self {
        Self {
            name: name.into(),
            dx,
            dy,
        }
    }
}

/// Built-in catalogue of the target application's controls
const DEFAULT_CATALOGUE: &[(&str, i32, i32)] = &[
    ("5단계1", 40, 70),
    ("5단계2", 90, 70),
    ("10단계", 140, 70),
    ("기업", 190, 70),
    ("뉴스", 230, 70),
    ("Tick", 270, 70),
    ("회원사", 320, 70),
    ("PR", 370, 70),
    ("가격대", 410, 70),
    ("투자자", 460, 70),
    ("외인", 510, 70),
    ("News", 560, 70),
    ("공식", 610, 70),
    ("경쟁사", 660, 70),
    ("ELW", 710, 70),
    ("선물", 760, 70),
    ("CFD", 810, 70),
];

/// Ordered mapping from control name to relative offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlLayout {
    controls: Vec<(String, Offset)>,
}

impl ControlLayout {
    /// Build a layout, rejecting empty, duplicate or path-like names
    pub fn new<I, S>(controls: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Offset)>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for (name, offset) in controls {
            let name = name.into();
            if name.is_empty() {
                return Err(LocatorError::Layout("control name must not be empty".into()));
            }
            // Names double as template file stems
            if name.contains(['/', '\\']) || name == "." || name == ".." {
                return Err(LocatorError::Layout(format!(
                    "control name '{}' must not contain path separators",
                    name
                )));
            }
            if !seen.insert(name.clone()) {
                return Err(LocatorError::Layout(format!("duplicate control name '{}'", name)));
            }
            entries.push((name, offset));
        }

        Ok(Self { controls: entries })
    }

    /// Build a layout from configuration entries
    pub fn from_entries(entries: &[ControlEntry]) -> Result<Self> {
        Self::new(
            entries
                .iter()
                .map(|e| (e.name.clone(), Offset::new(e.dx, e.dy))),
        )
    }

    /// The fixed catalogue of named controls of the target application
    pub fn default_catalogue() -> Self {
        Self {
            controls: DEFAULT_CATALOGUE
                .iter()
                .map(|&(name, dx, dy)| (name.to_string(), Offset::new(dx, dy)))
                .collect(),
        }
    }

    /// Convert back into configuration entries
    pub fn to_entries(&self) -> Vec<ControlEntry> {
        self.controls
            .iter()
            .map(|(name, offset)| ControlEntry::new(name.clone(), offset.dx, offset.dy))
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<Offset> {
        self.controls
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, offset)| *offset)
    }

    /// Iterate in definition order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Offset)> {
        self.controls.iter().map(|(name, offset)| (name.as_str(), *offset))
    }

    /// Control names in definition order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.controls.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.controls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controls.is_empty()
    }
}

impl Default for ControlLayout {
    fn default() -> Self {
        Self::default_catalogue()
    }
}

/// Ordered mapping from control name to resolved absolute coordinate
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ControlPositionTable {
    positions: Vec<(String, Point)>,
}

impl ControlPositionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a position, replacing an existing entry of the same name in place
    pub fn insert(&mut self, name: impl Into<String>, point: Point) {
        let name = name.into();
        match self.positions.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = point,
            None => self.positions.push((name, point)),
        }
    }

    pub fn get(&self, name: &str) -> Option<Point> {
        self.positions
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, point)| *point)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Iterate in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, Point)> {
        self.positions.iter().map(|(name, point)| (name.as_str(), *point))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, Point)> for ControlPositionTable {
    fn from_iter<T: IntoIterator<Item = (S, Point)>>(iter: T) -> Self {
        let mut table = Self::new();
        for (name, point) in iter {
            table.insert(name, point);
        }
        table
    }
}
