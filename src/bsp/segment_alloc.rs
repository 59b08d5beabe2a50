// src/bsp/segment_alloc.rs

use std::collections::HashMap;

use log::trace;
use serde::{Deserialize, Serialize};

use crate::bsp::collinear::{CollinearTracker, LineGroupId};
use crate::bsp::vertex_alloc::{VertexAllocator, VertexId};
use crate::bsp::Line2D;
use crate::map::LineId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SegmentId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SegmentSide {
    Front, // Runs along its map line
    Back,  // Runs against it (two-sided lines)
}

/// A directed edge between two canonical vertices. The sector interior lies on
/// its right. `line` is `None` for minisegs.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub start: VertexId,
    pub end: VertexId,
    pub line: Option<LineId>,
    pub side: SegmentSide,
    pub group: LineGroupId,
}

impl Segment {
    pub fn is_miniseg(&self) -> bool {
        self.line.is_none()
    }
}

/// Interns directed segments so `(start, end, line)` repeats share one id.
/// A→B and B→A stay distinct.
#[derive(Debug)]
pub struct SegmentAllocator {
    segments: Vec<Segment>,
    lookup: HashMap<(VertexId, VertexId, Option<LineId>), SegmentId>,
    tracker: CollinearTracker,
}

impl SegmentAllocator {
    pub fn new(epsilon: f64) -> Self {
        SegmentAllocator {
            segments: Vec::new(),
            lookup: HashMap::new(),
            tracker: CollinearTracker::new(epsilon),
        }
    }

    pub fn get_or_create(
        &mut self,
        start: VertexId,
        end: VertexId,
        line: Option<LineId>,
        side: SegmentSide,
        vertices: &VertexAllocator,
    ) -> SegmentId {
        if let Some(&id) = self.lookup.get(&(start, end, line)) {
            return id;
        }
        let group = self
            .tracker
            .register(vertices.point(start), vertices.point(end));
        let id = SegmentId(self.segments.len());
        self.segments.push(Segment {
            start,
            end,
            line,
            side,
            group,
        });
        self.lookup.insert((start, end, line), id);
        trace!("new segment {:?}: {:?} -> {:?} line {:?}", id, start, end, line);
        id
    }

    pub fn get(&self, id: SegmentId) -> &Segment {
        &self.segments[id.0]
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn line_of(&self, id: SegmentId, vertices: &VertexAllocator) -> Line2D {
        let seg = self.get(id);
        Line2D::new(vertices.point(seg.start), vertices.point(seg.end))
    }

    pub fn tracker_mut(&mut self) -> &mut CollinearTracker {
        &mut self.tracker
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsp::Point2D;

    #[test]
    fn test_dedupes_exact_repeats() {
        let mut vertices = VertexAllocator::new(0.001);
        let a = vertices.get_or_create(Point2D::new(0.0, 0.0));
        let b = vertices.get_or_create(Point2D::new(8.0, 0.0));
        let mut segs = SegmentAllocator::new(0.001);

        let s1 = segs.get_or_create(a, b, Some(LineId(0)), SegmentSide::Front, &vertices);
        let s2 = segs.get_or_create(a, b, Some(LineId(0)), SegmentSide::Front, &vertices);
        let back = segs.get_or_create(b, a, Some(LineId(0)), SegmentSide::Back, &vertices);
        let other = segs.get_or_create(a, b, Some(LineId(1)), SegmentSide::Front, &vertices);
        let mini = segs.get_or_create(a, b, None, SegmentSide::Front, &vertices);

        assert_eq!(s1, s2);
        assert_ne!(s1, back);
        assert_ne!(s1, other);
        assert_ne!(s1, mini);
        assert_eq!(segs.len(), 4);
        assert!(segs.get(mini).is_miniseg());
        assert_eq!(segs.get(back).side, SegmentSide::Back);
    }

    #[test]
    fn test_collinear_segments_share_group() {
        let mut vertices = VertexAllocator::new(0.001);
        let a = vertices.get_or_create(Point2D::new(0.0, 0.0));
        let b = vertices.get_or_create(Point2D::new(8.0, 0.0));
        let c = vertices.get_or_create(Point2D::new(16.0, 0.0));
        let d = vertices.get_or_create(Point2D::new(16.0, 8.0));
        let mut segs = SegmentAllocator::new(0.001);

        let ab = segs.get_or_create(a, b, Some(LineId(0)), SegmentSide::Front, &vertices);
        let cb = segs.get_or_create(c, b, Some(LineId(1)), SegmentSide::Front, &vertices);
        let cd = segs.get_or_create(c, d, Some(LineId(2)), SegmentSide::Front, &vertices);

        assert_eq!(segs.get(ab).group, segs.get(cb).group);
        assert_ne!(segs.get(ab).group, segs.get(cd).group);
    }
}
