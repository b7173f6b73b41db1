//! Coordinate file and screenshot output
//!
//! The coordinate file is written either as a literal mapping
//!
//! ```text
//! # Control positions
//!
//! CONTROL_POSITIONS = {
//!     'A': (140, 170),
//! }
//! ```
//!
//! or as JSON (`{"A": [140, 170]}`). [`parse_positions`] reads both back.
//! Both output files are staged as temporary files next to their targets and
//! only moved into place once both have been written.

use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use image::{ImageFormat, RgbaImage};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tempfile::NamedTempFile;

use crate::config::PositionFormat;
use crate::geometry::Point;
use crate::layout::ControlPositionTable;
use crate::{LocatorError, Result};

const HEADER: &str = "# Control positions";
const TABLE_NAME: &str = "CONTROL_POSITIONS";

/// Paths written by [`write_outputs`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedFiles {
    pub screenshot: PathBuf,
    pub positions: PathBuf,
}

// JSON keeps table order: entries are serialized and read back in sequence.
impl Serialize for ControlPositionTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (name, point) in self.iter() {
            map.serialize_entry(name, &[point.x, point.y])?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ControlPositionTable {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct TableVisitor;

        impl<'de> Visitor<'de> for TableVisitor {
            type Value = ControlPositionTable;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of control names to [x, y] pairs")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<Self::Value, A::Error> {
                let mut table = ControlPositionTable::new();
                while let Some((name, [x, y])) = access.next_entry::<String, [i32; 2]>()? {
                    table.insert(name, Point::new(x, y));
                }
                Ok(table)
            }
        }

        deserializer.deserialize_map(TableVisitor)
    }
}

/// Render the literal-mapping form
pub fn format_literal(table: &ControlPositionTable) -> String {
    let mut out = String::new();
    out.push_str(HEADER);
    out.push_str("\n\n");
    out.push_str(TABLE_NAME);
    out.push_str(" = {\n");
    for (name, point) in table.iter() {
        out.push_str(&format!(
            "    '{}': ({}, {}),\n",
            escape_name(name),
            point.x,
            point.y
        ));
    }
    out.push_str("}\n");
    out
}

/// Render the JSON form
pub fn format_json(table: &ControlPositionTable) -> Result<String> {
    let mut out = serde_json::to_string_pretty(table)?;
    out.push('\n');
    Ok(out)
}

pub fn format_positions(table: &ControlPositionTable, format: PositionFormat) -> Result<String> {
    match format {
        PositionFormat::Literal => Ok(format_literal(table)),
        PositionFormat::Json => format_json(table),
    }
}

/// Parse a coordinate file in either format
pub fn parse_positions(content: &str) -> Result<ControlPositionTable> {
    if content.trim_start().starts_with('{') {
        Ok(serde_json::from_str(content)?)
    } else {
        parse_literal(content)
    }
}

/// Read a coordinate file from disk
pub fn load_positions(path: &Path) -> Result<ControlPositionTable> {
    let content = std::fs::read_to_string(path)?;
    let table = parse_positions(&content)?;
    log::debug!("Read {} positions from {}", table.len(), path.display());
    Ok(table)
}

/// Write the screenshot and the coordinate file
///
/// Nothing is moved into place until both temporary files are complete, so a
/// failure while writing leaves neither target touched.
pub fn write_outputs(
    table: &ControlPositionTable,
    screenshot: &RgbaImage,
    screenshot_path: &Path,
    positions_path: &Path,
    format: PositionFormat,
) -> Result<PersistedFiles> {
    let content = format_positions(table, format)?;

    let mut shot_tmp = stage(screenshot_path)?;
    screenshot
        .write_to(shot_tmp.as_file_mut(), ImageFormat::Png)
        .map_err(|e| LocatorError::persistence(screenshot_path, io::Error::other(e)))?;

    let mut positions_tmp = stage(positions_path)?;
    positions_tmp
        .write_all(content.as_bytes())
        .and_then(|_| positions_tmp.flush())
        .map_err(|e| LocatorError::persistence(positions_path, e))?;

    shot_tmp
        .persist(screenshot_path)
        .map_err(|e| LocatorError::persistence(screenshot_path, e.error))?;
    positions_tmp
        .persist(positions_path)
        .map_err(|e| LocatorError::persistence(positions_path, e.error))?;

    log::info!("Screenshot saved to {}", screenshot_path.display());
    log::info!(
        "{} control positions saved to {}",
        table.len(),
        positions_path.display()
    );

    Ok(PersistedFiles {
        screenshot: screenshot_path.to_path_buf(),
        positions: positions_path.to_path_buf(),
    })
}

/// Temporary file in the target's directory, creating the directory if needed
fn stage(target: &Path) -> Result<NamedTempFile> {
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| LocatorError::persistence(target, e))?;
    NamedTempFile::new_in(dir).map_err(|e| LocatorError::persistence(target, e))
}

fn escape_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out
}

fn parse_literal(content: &str) -> Result<ControlPositionTable> {
    let mut table = ControlPositionTable::new();
    let mut opened = false;

    for (index, raw) in content.lines().enumerate() {
        let line_no = index + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if !opened {
            let rest = line
                .strip_prefix(TABLE_NAME)
                .map(str::trim_start)
                .and_then(|r| r.strip_prefix('='))
                .map(str::trim);
            if rest != Some("{") {
                return Err(parse_error(line_no, format!("expected '{} = {{'", TABLE_NAME)));
            }
            opened = true;
            continue;
        }

        if line == "}" {
            return Ok(table);
        }

        let (name, point) = parse_entry(line).map_err(|message| parse_error(line_no, message))?;
        table.insert(name, point);
    }

    Err(parse_error(
        content.lines().count(),
        if opened {
            "unterminated mapping".to_string()
        } else {
            format!("missing '{}' mapping", TABLE_NAME)
        },
    ))
}

/// `'name': (x, y),` with the trailing comma optional
fn parse_entry(line: &str) -> std::result::Result<(String, Point), String> {
    let mut chars = line.chars();
    if chars.next() != Some('\'') {
        return Err("expected a quoted control name".to_string());
    }

    let mut name = String::new();
    loop {
        match chars.next() {
            Some('\\') => match chars.next() {
                Some('\\') => name.push('\\'),
                Some('\'') => name.push('\''),
                Some('n') => name.push('\n'),
                Some(other) => return Err(format!("unknown escape '\\{}'", other)),
                None => return Err("unterminated control name".to_string()),
            },
            Some('\'') => break,
            Some(c) => name.push(c),
            None => return Err("unterminated control name".to_string()),
        }
    }

    let rest = chars.as_str().trim_start();
    let rest = rest
        .strip_prefix(':')
        .ok_or_else(|| format!("expected ':' after '{}'", name))?
        .trim();
    let rest = rest.strip_suffix(',').unwrap_or(rest).trim_end();
    let inner = rest
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
        .ok_or_else(|| format!("expected (x, y) for '{}'", name))?;

    let (x, y) = inner
        .split_once(',')
        .ok_or_else(|| format!("expected (x, y) for '{}'", name))?;
    let x = x
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("bad x for '{}': {}", name, e))?;
    let y = y
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("bad y for '{}': {}", name, e))?;

    Ok((name, Point::new(x, y)))
}

fn parse_error(line: usize, message: impl Into<String>) -> LocatorError {
    LocatorError::Parse {
        line,
        message: message.into(),
    }
}
