// src/map/linedef.rs

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::bsp::Point2D;
use crate::error::BspError;

/// Opaque identity of a source map line. The builder never interprets it, it
/// only copies it onto every segment cut from that line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineId(pub usize);

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One input line: a directed edge with the sector interior on its right.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapLine {
    pub id: LineId,
    pub start: Point2D,
    pub end: Point2D,
    /// Two-sided lines also bound the space on their left, so the builder
    /// emits a reversed back segment for them.
    #[serde(default)]
    pub two_sided: bool,
}

impl MapLine {
    pub fn new(id: usize, start: Point2D, end: Point2D) -> Self {
        MapLine {
            id: LineId(id),
            start,
            end,
            two_sided: false,
        }
    }

    pub fn two_sided(id: usize, start: Point2D, end: Point2D) -> Self {
        MapLine {
            two_sided: true,
            ..MapLine::new(id, start, end)
        }
    }

    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end)
    }

    /// Rejects coordinates the geometry code cannot work with.
    pub fn validate(&self) -> Result<(), BspError> {
        let coords = [
            ("start x", self.start.x),
            ("start y", self.start.y),
            ("end x", self.end.x),
            ("end y", self.end.y),
        ];
        for (name, value) in coords {
            if !value.is_finite() {
                return Err(BspError::MalformedLine {
                    line: self.id,
                    reason: format!("{} is not finite", name),
                });
            }
        }
        Ok(())
    }
}
