// src/bsp/junction.rs
//! Per-vertex wall junctions.
//!
//! For every vertex we keep the directions of the real walls that leave it,
//! sorted by angle, and which side of each wall is open sector space. Looking
//! along any direction from the vertex, the first wall counter-clockwise from
//! that direction tells whether we are looking into open space or into the
//! void: the direction sits on that wall's clockwise side.
//!
//! A segment `v -> w` has its interior on the right, so its tip at `v` is open
//! clockwise. The same segment seen from `w` points back to `v` and is open
//! counter-clockwise. Two-sided lines contribute both.

use std::collections::HashMap;
use std::f64::consts::TAU;

use crate::bsp::bsp_util::normalize_angle;
use crate::bsp::segment_alloc::Segment;
use crate::bsp::vertex_alloc::{VertexAllocator, VertexId};
use crate::bsp::Line2D;

const MERGE_ANGLE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WallTip {
    pub angle: f64,
    pub cw_open: bool,
    pub ccw_open: bool,
}

#[derive(Debug, Default)]
pub struct JunctionClassifier {
    tips: HashMap<VertexId, Vec<WallTip>>,
}

impl JunctionClassifier {
    pub fn new() -> Self {
        JunctionClassifier::default()
    }

    /// Builds the junction table from an initial segment set.
    pub fn classify<'a, I>(segments: I, vertices: &VertexAllocator) -> Self
    where
        I: IntoIterator<Item = &'a Segment>,
    {
        let mut junctions = JunctionClassifier::new();
        for seg in segments {
            junctions.add_segment(seg, vertices);
        }
        junctions
    }

    /// Records both tips of a wall segment. Minisegs are not walls and are ignored.
    pub fn add_segment(&mut self, seg: &Segment, vertices: &VertexAllocator) {
        if seg.is_miniseg() || seg.start == seg.end {
            return;
        }
        let a = vertices.point(seg.start);
        let b = vertices.point(seg.end);
        self.insert(
            seg.start,
            WallTip {
                angle: Line2D::new(a, b).angle(),
                cw_open: true,
                ccw_open: false,
            },
        );
        self.insert(
            seg.end,
            WallTip {
                angle: Line2D::new(b, a).angle(),
                cw_open: false,
                ccw_open: true,
            },
        );
    }

    /// Records the two new tips at `at`, where the wall `seg` was cut in two.
    pub fn add_cut(&mut self, at: VertexId, seg: &Segment, vertices: &VertexAllocator) {
        if seg.is_miniseg() || at == seg.start || at == seg.end {
            return;
        }
        let p = vertices.point(at);
        self.insert(
            at,
            WallTip {
                angle: Line2D::new(p, vertices.point(seg.end)).angle(),
                cw_open: true,
                ccw_open: false,
            },
        );
        self.insert(
            at,
            WallTip {
                angle: Line2D::new(p, vertices.point(seg.start)).angle(),
                cw_open: false,
                ccw_open: true,
            },
        );
    }

    fn insert(&mut self, vertex: VertexId, tip: WallTip) {
        let tips = self.tips.entry(vertex).or_default();
        if let Some(existing) = tips
            .iter_mut()
            .find(|t| angle_between(t.angle, tip.angle) <= MERGE_ANGLE)
        {
            existing.cw_open |= tip.cw_open;
            existing.ccw_open |= tip.ccw_open;
            return;
        }
        let at = tips.partition_point(|t| t.angle < tip.angle);
        tips.insert(at, tip);
    }

    pub fn tips(&self, vertex: VertexId) -> &[WallTip] {
        self.tips.get(&vertex).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Whether the space leaving `vertex` along `angle` is open sector space.
    /// A wall lying along the direction (within `tolerance` radians) counts as
    /// closed, since a real edge already covers it. A vertex without walls is
    /// open all round.
    pub fn is_open(&self, vertex: VertexId, angle: f64, tolerance: f64) -> bool {
        let tips = self.tips(vertex);
        if tips.is_empty() {
            return true;
        }
        let angle = normalize_angle(angle);
        if tips
            .iter()
            .any(|t| angle_between(t.angle, angle) <= tolerance)
        {
            return false;
        }
        let next_ccw = tips
            .iter()
            .min_by(|x, y| {
                normalize_angle(x.angle - angle).total_cmp(&normalize_angle(y.angle - angle))
            })
            .copied();
        next_ccw.map_or(true, |t| t.cw_open)
    }
}

/// Smallest absolute difference between two angles.
fn angle_between(a: f64, b: f64) -> f64 {
    let d = normalize_angle(a - b);
    d.min(TAU - d)
}
