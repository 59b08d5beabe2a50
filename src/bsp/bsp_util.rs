// src/bsp/bsp_util.rs
// Geometry helpers shared by the BSP sub-engines.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point2D {
    pub x: f64,
    pub y: f64,
}

impl Point2D {
    pub fn new(x: f64, y: f64) -> Self {
        Point2D { x, y }
    }

    pub fn distance_to(&self, other: &Point2D) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// Point at parameter `t` along `self -> other`.
    pub fn lerp(&self, other: &Point2D, t: f64) -> Point2D {
        Point2D::new(
            self.x + t * (other.x - self.x),
            self.y + t * (other.y - self.y),
        )
    }
}

/// Z component of the cross product of `(ax, ay)` and `(bx, by)`. Positive when
/// `b` turns counter-clockwise from `a`.
pub fn cross(ax: f64, ay: f64, bx: f64, by: f64) -> f64 {
    ax * by - ay * bx
}

/// Which side of a directed line a point falls on. `Right` is the front side:
/// the side a segment's sector interior lies on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointSide {
    Right,
    Left,
    On,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line2D {
    pub start: Point2D,
    pub end: Point2D,
}

impl Line2D {
    pub fn new(start: Point2D, end: Point2D) -> Self {
        Line2D { start, end }
    }

    pub fn dx(&self) -> f64 {
        self.end.x - self.start.x
    }

    pub fn dy(&self) -> f64 {
        self.end.y - self.start.y
    }

    pub fn length(&self) -> f64 {
        self.dx().hypot(self.dy())
    }

    /// Direction angle in radians, in `[0, 2π)`.
    pub fn angle(&self) -> f64 {
        normalize_angle(self.dy().atan2(self.dx()))
    }

    pub fn classify_point(&self, point: &Point2D) -> f64 {
        // Returns positive if point is on front side
        // Returns negative if point is on back side
        // Returns near zero if point is on the line
        let dx = self.dx();
        let dy = self.dy();
        (dy * (point.x - self.start.x)) - (dx * (point.y - self.start.y))
    }

    /// Perpendicular distance to the infinite line, positive on the right.
    pub fn signed_distance(&self, point: &Point2D) -> f64 {
        let len = self.length();
        if len == 0.0 {
            return 0.0;
        }
        self.classify_point(point) / len
    }

    pub fn side_of(&self, point: &Point2D, epsilon: f64) -> PointSide {
        side_from_distance(self.signed_distance(point), epsilon)
    }

    /// Projection of `point` onto the line direction, in map units from `start`.
    pub fn project(&self, point: &Point2D) -> f64 {
        let len = self.length();
        if len == 0.0 {
            return 0.0;
        }
        ((point.x - self.start.x) * self.dx() + (point.y - self.start.y) * self.dy()) / len
    }

    /// Where the segment `a -> b` crosses this infinite line, given the signed
    /// distances of its endpoints. `None` unless they lie on opposite sides.
    pub fn crossing(&self, a: &Point2D, b: &Point2D, dist_a: f64, dist_b: f64) -> Option<Point2D> {
        if dist_a * dist_b >= 0.0 {
            return None;
        }
        let t = dist_a / (dist_a - dist_b);
        Some(a.lerp(b, t))
    }

    /// `true` when `other` points the same way along a shared line.
    pub fn same_direction(&self, other: &Line2D) -> bool {
        self.dx() * other.dx() + self.dy() * other.dy() > 0.0
    }
}

pub fn side_from_distance(distance: f64, epsilon: f64) -> PointSide {
    if distance > epsilon {
        PointSide::Right
    } else if distance < -epsilon {
        PointSide::Left
    } else {
        PointSide::On
    }
}

/// Where a whole segment falls relative to a partition line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SegPosition {
    Right,
    Left,
    Spanning,
    Coincident { same_direction: bool },
}

/// Per-endpoint detail behind a [`SegPosition`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SegClassification {
    pub position: SegPosition,
    pub start_side: PointSide,
    pub end_side: PointSide,
    pub start_dist: f64,
    pub end_dist: f64,
}

/// Classifies `seg` against the infinite line through `partition`. A segment
/// touching the line with one endpoint belongs to the side of its other end.
pub fn classify_seg(partition: &Line2D, seg: &Line2D, epsilon: f64) -> SegClassification {
    let start_dist = partition.signed_distance(&seg.start);
    let end_dist = partition.signed_distance(&seg.end);
    let start_side = side_from_distance(start_dist, epsilon);
    let end_side = side_from_distance(end_dist, epsilon);

    let position = match (start_side, end_side) {
        (PointSide::On, PointSide::On) => SegPosition::Coincident {
            same_direction: partition.same_direction(seg),
        },
        (PointSide::Right, PointSide::Left) | (PointSide::Left, PointSide::Right) => {
            SegPosition::Spanning
        }
        (PointSide::Right, _) | (_, PointSide::Right) => SegPosition::Right,
        (PointSide::Left, _) | (_, PointSide::Left) => SegPosition::Left,
    };

    SegClassification {
        position,
        start_side,
        end_side,
        start_dist,
        end_dist,
    }
}

pub fn normalize_angle(angle: f64) -> f64 {
    let tau = std::f64::consts::TAU;
    let a = angle % tau;
    if a < 0.0 {
        a + tau
    } else {
        a
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Default for BoundingBox {
    fn default() -> Self {
        BoundingBox::new_empty()
    }
}

impl BoundingBox {
    pub fn new_empty() -> Self {
        BoundingBox {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        }
    }

    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        BoundingBox {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn expand_point(&mut self, x: f64, y: f64) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// Grows this box to cover `other`. An empty `other` changes nothing.
    pub fn combine(&mut self, other: &BoundingBox) {
        self.min_x = self.min_x.min(other.min_x);
        self.min_y = self.min_y.min(other.min_y);
        self.max_x = self.max_x.max(other.max_x);
        self.max_y = self.max_y.max(other.max_y);
    }

    pub fn from_points<'a, I: IntoIterator<Item = &'a Point2D>>(points: I) -> Self {
        let mut bbox = BoundingBox::new_empty();
        for p in points {
            bbox.expand_point(p.x, p.y);
        }
        bbox
    }
}
