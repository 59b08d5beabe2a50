// src/bsp/collinear.rs

use std::collections::HashMap;
use std::f64::consts::PI;

use crate::bsp::vertex_alloc::{VertexAllocator, VertexId};
use crate::bsp::{Line2D, Point2D};

const ANGLE_BUCKETS: i64 = 4096;

/// Segments sharing one infinite line (within epsilon) share a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineGroupId(pub usize);

/// Bookkeeping for "which segments lie on the same line" and "are these three
/// vertices collinear". Lines are bucketed by direction (modulo π) and by
/// their signed offset from the origin; the bucket is only a pre-filter, the
/// actual test is a distance check against the group's reference line.
#[derive(Debug)]
pub struct CollinearTracker {
    epsilon: f64,
    offset_step: f64,
    groups: Vec<Line2D>,
    buckets: HashMap<(i64, i64), Vec<LineGroupId>>,
    memo: HashMap<[VertexId; 3], bool>,
}

impl CollinearTracker {
    pub fn new(epsilon: f64) -> Self {
        CollinearTracker {
            epsilon,
            offset_step: (4.0 * epsilon).max(1.0),
            groups: Vec::new(),
            buckets: HashMap::new(),
            memo: HashMap::new(),
        }
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Returns the group of the line through `start -> end`, creating one if no
    /// existing line holds both endpoints.
    pub fn register(&mut self, start: Point2D, end: Point2D) -> LineGroupId {
        let (angle_bucket, offset) = line_key(start, end);

        for da in -1..=1 {
            let (ab, flipped) = wrap_bucket(angle_bucket + da);
            let off = if flipped { -offset } else { offset };
            let ob = (off / self.offset_step).floor() as i64;
            for dob in -1..=1 {
                let Some(bucket) = self.buckets.get(&(ab, ob + dob)) else {
                    continue;
                };
                for &group in bucket {
                    let line = &self.groups[group.0];
                    if line.signed_distance(&start).abs() <= self.epsilon
                        && line.signed_distance(&end).abs() <= self.epsilon
                    {
                        return group;
                    }
                }
            }
        }

        let group = LineGroupId(self.groups.len());
        self.groups.push(Line2D::new(start, end));
        // A point has no line; keep it out of the buckets so nothing joins it.
        if start.distance_to(&end) <= self.epsilon {
            return group;
        }
        let ob = (offset / self.offset_step).floor() as i64;
        self.buckets.entry((angle_bucket, ob)).or_default().push(group);
        group
    }

    /// `true` when the three vertices lie on one line within epsilon.
    pub fn are_collinear(
        &mut self,
        a: VertexId,
        b: VertexId,
        c: VertexId,
        vertices: &VertexAllocator,
    ) -> bool {
        let mut key = [a, b, c];
        key.sort();
        if let Some(&hit) = self.memo.get(&key) {
            return hit;
        }

        let pts = key.map(|v| vertices.point(v));
        // Measure against the longest of the three sides.
        let pairs = [(0, 1, 2), (0, 2, 1), (1, 2, 0)];
        let (i, j, k) = pairs
            .into_iter()
            .max_by(|x, y| {
                let lx = pts[x.0].distance_to(&pts[x.1]);
                let ly = pts[y.0].distance_to(&pts[y.1]);
                lx.total_cmp(&ly)
            })
            .unwrap_or((0, 1, 2));
        let base = Line2D::new(pts[i], pts[j]);
        let hit = base.length() <= self.epsilon
            || base.signed_distance(&pts[k]).abs() <= self.epsilon;

        self.memo.insert(key, hit);
        hit
    }
}

/// Angle bucket of the undirected line plus its signed offset from the origin,
/// both taken with the direction normalised into `[0, π)`.
fn line_key(start: Point2D, end: Point2D) -> (i64, f64) {
    let mut angle = (end.y - start.y).atan2(end.x - start.x);
    if angle < 0.0 {
        angle += PI;
    }
    if angle >= PI {
        angle -= PI;
    }
    let (ux, uy) = (angle.cos(), angle.sin());
    let offset = ux * start.y - uy * start.x;
    let bucket = ((angle / PI) * ANGLE_BUCKETS as f64).floor() as i64;
    (bucket.clamp(0, ANGLE_BUCKETS - 1), offset)
}

/// Wraps an angle bucket into range. Crossing the 0/π seam flips the
/// direction, and with it the sign of the offset.
fn wrap_bucket(bucket: i64) -> (i64, bool) {
    if bucket < 0 {
        (bucket + ANGLE_BUCKETS, true)
    } else if bucket >= ANGLE_BUCKETS {
        (bucket - ANGLE_BUCKETS, true)
    } else {
        (bucket, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(x: f64, y: f64) -> Point2D {
        Point2D::new(x, y)
    }

    #[test]
    fn test_same_line_shares_group() {
        let mut tracker = CollinearTracker::new(0.001);
        let a = tracker.register(p(0.0, 0.0), p(4.0, 0.0));
        let b = tracker.register(p(10.0, 0.0), p(6.0, 0.0)); // reversed, further along
        let c = tracker.register(p(0.0, 1.0), p(4.0, 1.0)); // parallel, offset
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(tracker.group_count(), 2);
    }

    #[test]
    fn test_groups_across_angle_seam() {
        let mut tracker = CollinearTracker::new(0.001);
        // Nearly horizontal lines either side of the 0/π seam.
        let a = tracker.register(p(0.0, 5.0), p(1000.0, 5.0000001));
        let b = tracker.register(p(1000.0, 5.0), p(0.0, 5.0000001));
        assert_eq!(a, b);
    }

    #[test]
    fn test_diagonal_lines() {
        let mut tracker = CollinearTracker::new(0.001);
        let a = tracker.register(p(0.0, 0.0), p(1.0, 1.0));
        let b = tracker.register(p(5.0, 5.0), p(3.0, 3.0));
        let c = tracker.register(p(0.0, 0.0), p(1.0, -1.0));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_are_collinear_memoised() {
        let mut vertices = VertexAllocator::new(0.001);
        let a = vertices.get_or_create(p(0.0, 0.0));
        let b = vertices.get_or_create(p(2.0, 0.0));
        let c = vertices.get_or_create(p(5.0, 0.0005));
        let d = vertices.get_or_create(p(5.0, 1.0));

        let mut tracker = CollinearTracker::new(0.001);
        assert!(tracker.are_collinear(a, b, c, &vertices));
        assert!(tracker.are_collinear(c, a, b, &vertices));
        assert!(!tracker.are_collinear(a, b, d, &vertices));
    }
}
