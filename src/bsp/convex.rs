// src/bsp/convex.rs
//! Convexity sub-engine.
//!
//! A segment set is convex when no endpoint of the set lies strictly on the
//! left (outside) of any of its segments. The checker visits one segment per
//! step: it runs that half-plane test, then follows the chain to the segment
//! starting where this one ends and records the turn between them. The visit
//! order and the turn sense are kept on [`ConvexStates`] so the leaf step can
//! emit the edges clockwise without walking them again.

use std::collections::HashMap;

use log::trace;

use crate::bsp::bsp_util::cross;
use crate::bsp::context::BuildContext;
use crate::bsp::segment_alloc::{Segment, SegmentId};
use crate::bsp::vertex_alloc::VertexId;
use crate::bsp::{Point2D, PointSide};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvexState {
    Loaded,
    Traversing,
    FinishedIsConvex,
    FinishedIsDegenerate,
    FinishedIsSplittable,
}

impl ConvexState {
    pub fn is_finished(self) -> bool {
        matches!(
            self,
            ConvexState::FinishedIsConvex
                | ConvexState::FinishedIsDegenerate
                | ConvexState::FinishedIsSplittable
        )
    }
}

/// Turn sense accumulated over the traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rotation {
    Unknown,
    Clockwise,
    CounterClockwise,
}

#[derive(Debug, Clone)]
pub struct ConvexStates {
    pub state: ConvexState,
    /// Segments in visit order. Chains follow each other.
    pub convex_traversal: Vec<SegmentId>,
    pub rotation: Rotation,
    /// The whole set formed exactly one closed loop.
    pub closed: bool,
    pub right_turns: usize,
    pub left_turns: usize,
    /// The segment whose half-plane test failed, for splittable sets.
    pub offending: Option<SegmentId>,
}

impl Default for ConvexStates {
    fn default() -> Self {
        ConvexStates {
            state: ConvexState::Loaded,
            convex_traversal: Vec::new(),
            rotation: Rotation::Unknown,
            closed: false,
            right_turns: 0,
            left_turns: 0,
            offending: None,
        }
    }
}

#[derive(Debug, Default)]
pub struct ConvexChecker {
    states: ConvexStates,
    segments: Vec<SegmentId>,
    endpoints: Vec<VertexId>,
    outgoing: HashMap<VertexId, Vec<usize>>,
    visited: Vec<bool>,
    current: usize,
    chain_start: usize,
    chains: usize,
    closed_chains: usize,
}

impl ConvexChecker {
    pub fn new() -> Self {
        ConvexChecker::default()
    }

    pub fn states(&self) -> &ConvexStates {
        &self.states
    }

    pub fn load(&mut self, segments: &[SegmentId], ctx: &BuildContext) {
        self.states = ConvexStates::default();
        self.segments = segments.to_vec();
        self.visited = vec![false; segments.len()];
        self.outgoing.clear();
        self.endpoints.clear();
        self.current = 0;
        self.chain_start = 0;
        self.chains = 0;
        self.closed_chains = 0;

        for (i, &id) in segments.iter().enumerate() {
            let seg = ctx.segments.get(id);
            self.outgoing.entry(seg.start).or_default().push(i);
            self.endpoints.push(seg.start);
            self.endpoints.push(seg.end);
        }
        self.endpoints.sort();
        self.endpoints.dedup();
    }

    pub fn execute(&mut self, ctx: &mut BuildContext) {
        match self.states.state {
            ConvexState::Loaded => {
                if self.segments.is_empty() {
                    self.states.state = ConvexState::FinishedIsDegenerate;
                    return;
                }
                self.start_chain(0);
                self.states.state = ConvexState::Traversing;
            }
            ConvexState::Traversing => self.step(ctx),
            _ => {}
        }
    }

    fn start_chain(&mut self, index: usize) {
        self.chain_start = index;
        self.current = index;
        self.visited[index] = true;
        self.chains += 1;
        self.states.convex_traversal.push(self.segments[index]);
    }

    fn step(&mut self, ctx: &mut BuildContext) {
        let seg_id = self.segments[self.current];
        let line = ctx.line(seg_id);

        for &v in &self.endpoints {
            if line.side_of(&ctx.vertices.point(v), ctx.epsilon) == PointSide::Left {
                trace!("{:?} sees {:?} on its outside", seg_id, v);
                self.states.offending = Some(seg_id);
                self.states.state = ConvexState::FinishedIsSplittable;
                return;
            }
        }

        let seg = ctx.segments.get(seg_id).clone();
        let candidates = self.outgoing.get(&seg.end);
        let next_unvisited = candidates.and_then(|c| c.iter().copied().find(|&i| !self.visited[i]));
        let closes = next_unvisited.is_none()
            && candidates.is_some_and(|c| c.contains(&self.chain_start));

        if let Some(next) = next_unvisited.or(if closes { Some(self.chain_start) } else { None }) {
            let next_seg = ctx.segments.get(self.segments[next]).clone();
            self.record_turn(&seg, &next_seg, ctx);
        }

        if let Some(next) = next_unvisited {
            self.visited[next] = true;
            self.current = next;
            self.states.convex_traversal.push(self.segments[next]);
            return;
        }

        if closes {
            self.closed_chains += 1;
        }
        match self.visited.iter().position(|v| !v) {
            Some(i) => self.start_chain(i),
            None => self.finish(ctx),
        }
    }

    fn record_turn(&mut self, seg: &Segment, next: &Segment, ctx: &mut BuildContext) {
        if ctx
            .segments
            .tracker_mut()
            .are_collinear(seg.start, seg.end, next.end, &ctx.vertices)
        {
            return;
        }
        let a = ctx.vertices.point(seg.start);
        let b = ctx.vertices.point(seg.end);
        let c = ctx.vertices.point(next.end);
        let turn = cross(b.x - a.x, b.y - a.y, c.x - b.x, c.y - b.y);
        if turn < 0.0 {
            self.states.right_turns += 1;
        } else {
            self.states.left_turns += 1;
        }
    }

    fn finish(&mut self, ctx: &mut BuildContext) {
        self.states.closed = self.chains == 1 && self.closed_chains == 1;
        self.states.rotation = match (self.states.right_turns, self.states.left_turns) {
            (r, 0) if r > 0 => Rotation::Clockwise,
            (0, l) if l > 0 => Rotation::CounterClockwise,
            _ => Rotation::Unknown,
        };

        self.states.state = if self.all_endpoints_collinear(ctx) {
            ConvexState::FinishedIsDegenerate
        } else {
            ConvexState::FinishedIsConvex
        };
        trace!(
            "convexity finished: {:?}, {} chain(s), closed {}",
            self.states.state,
            self.chains,
            self.states.closed
        );
    }

    fn all_endpoints_collinear(&self, ctx: &mut BuildContext) -> bool {
        let Some(&first) = self.endpoints.first() else {
            return true;
        };
        let origin = ctx.vertices.point(first);
        let far = self.endpoints.iter().copied().max_by(|a, b| {
            let da = ctx.vertices.point(*a).distance_to(&origin);
            let db = ctx.vertices.point(*b).distance_to(&origin);
            da.total_cmp(&db)
        });
        let Some(far) = far else {
            return true;
        };
        if ctx.vertices.point(far).distance_to(&origin) <= ctx.epsilon {
            return true;
        }
        let tracker = ctx.segments.tracker_mut();
        let vertices = &ctx.vertices;
        self.endpoints
            .iter()
            .all(|&v| tracker.are_collinear(first, far, v, vertices))
    }
}

/// Orders a convex set's edges clockwise. A single closed loop is already in
/// clockwise order from the traversal; anything else is sorted by the angle of
/// each edge's midpoint around the centroid of the set.
pub fn clockwise_edges(states: &ConvexStates, ctx: &BuildContext) -> Vec<SegmentId> {
    if states.closed && states.rotation != Rotation::CounterClockwise {
        return states.convex_traversal.clone();
    }

    let mids: Vec<(SegmentId, Point2D)> = states
        .convex_traversal
        .iter()
        .map(|&id| {
            let line = ctx.line(id);
            (id, line.start.lerp(&line.end, 0.5))
        })
        .collect();
    if mids.is_empty() {
        return Vec::new();
    }
    let n = mids.len() as f64;
    let centre = Point2D::new(
        mids.iter().map(|(_, p)| p.x).sum::<f64>() / n,
        mids.iter().map(|(_, p)| p.y).sum::<f64>() / n,
    );

    let mut keyed: Vec<(f64, SegmentId)> = mids
        .into_iter()
        .map(|(id, p)| ((p.y - centre.y).atan2(p.x - centre.x), id))
        .collect();
    // Descending angle is clockwise.
    keyed.sort_by(|a, b| b.0.total_cmp(&a.0).then(a.1.cmp(&b.1)));
    keyed.into_iter().map(|(_, id)| id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsp::segment_alloc::SegmentSide;
    use crate::config::BspConfig;
    use crate::map::LineId;

    fn polygon(ctx: &mut BuildContext, pts: &[(f64, f64)]) -> Vec<SegmentId> {
        let ids: Vec<VertexId> = pts
            .iter()
            .map(|&(x, y)| ctx.vertices.get_or_create(Point2D::new(x, y)))
            .collect();
        (0..ids.len())
            .map(|i| {
                ctx.segments.get_or_create(
                    ids[i],
                    ids[(i + 1) % ids.len()],
                    Some(LineId(i)),
                    SegmentSide::Front,
                    &ctx.vertices,
                )
            })
            .collect()
    }

    fn run(checker: &mut ConvexChecker, ctx: &mut BuildContext) -> usize {
        let mut steps = 0;
        while !checker.states().state.is_finished() {
            checker.execute(ctx);
            steps += 1;
        }
        steps
    }

    #[test]
    fn test_clockwise_square_is_convex() {
        let mut ctx = BuildContext::new(&BspConfig::default());
        let segs = polygon(&mut ctx, &[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)]);
        let mut checker = ConvexChecker::new();
        checker.load(&segs, &ctx);
        assert_eq!(checker.states().state, ConvexState::Loaded);

        let steps = run(&mut checker, &mut ctx);
        let states = checker.states();
        assert_eq!(states.state, ConvexState::FinishedIsConvex);
        assert_eq!(steps, 5); // load + one per edge
        assert!(states.closed);
        assert_eq!(states.rotation, Rotation::Clockwise);
        assert_eq!(states.right_turns, 4);
        assert_eq!(clockwise_edges(states, &ctx), segs);
    }

    #[test]
    fn test_l_shape_is_splittable() {
        let mut ctx = BuildContext::new(&BspConfig::default());
        let segs = polygon(
            &mut ctx,
            &[(0.0, 0.0), (0.0, 2.0), (1.0, 2.0), (1.0, 1.0), (2.0, 1.0), (2.0, 0.0)],
        );
        let mut checker = ConvexChecker::new();
        checker.load(&segs, &ctx);
        run(&mut checker, &mut ctx);
        assert_eq!(checker.states().state, ConvexState::FinishedIsSplittable);
        assert!(checker.states().offending.is_some());
    }

    #[test]
    fn test_sliver_is_degenerate() {
        let mut ctx = BuildContext::new(&BspConfig::default());
        let a = ctx.vertices.get_or_create(Point2D::new(0.0, 0.0));
        let b = ctx.vertices.get_or_create(Point2D::new(4.0, 0.0));
        let ab = ctx.segments.get_or_create(
            a,
            b,
            Some(LineId(0)),
            SegmentSide::Front,
            &ctx.vertices,
        );
        let ba = ctx.segments.get_or_create(
            b,
            a,
            Some(LineId(0)),
            SegmentSide::Back,
            &ctx.vertices,
        );

        let mut checker = ConvexChecker::new();
        checker.load(&[ab, ba], &ctx);
        run(&mut checker, &mut ctx);
        let states = checker.states();
        assert_eq!(states.state, ConvexState::FinishedIsDegenerate);
        assert_eq!(states.rotation, Rotation::Unknown);
        assert!(states.closed);
    }

    #[test]
    fn test_empty_set_is_degenerate() {
        let mut ctx = BuildContext::new(&BspConfig::default());
        let mut checker = ConvexChecker::new();
        checker.load(&[], &ctx);
        run(&mut checker, &mut ctx);
        assert_eq!(checker.states().state, ConvexState::FinishedIsDegenerate);
    }

    #[test]
    fn test_open_convex_set_sorted_clockwise() {
        // Three sides of a square, given out of order, no closing edge.
        let mut ctx = BuildContext::new(&BspConfig::default());
        let v: Vec<VertexId> = [(0.0, 0.0), (0.0, 4.0), (4.0, 4.0), (4.0, 0.0)]
            .iter()
            .map(|&(x, y)| ctx.vertices.get_or_create(Point2D::new(x, y)))
            .collect();
        let top = ctx.segments.get_or_create(
            v[1],
            v[2],
            Some(LineId(1)),
            SegmentSide::Front,
            &ctx.vertices,
        );
        let left = ctx.segments.get_or_create(
            v[0],
            v[1],
            Some(LineId(0)),
            SegmentSide::Front,
            &ctx.vertices,
        );
        let right = ctx.segments.get_or_create(
            v[2],
            v[3],
            Some(LineId(2)),
            SegmentSide::Front,
            &ctx.vertices,
        );

        let mut checker = ConvexChecker::new();
        checker.load(&[top, left, right], &ctx);
        run(&mut checker, &mut ctx);
        let states = checker.states();
        assert_eq!(states.state, ConvexState::FinishedIsConvex);
        assert!(!states.closed);
        // Clockwise around the centre, starting from the largest angle.
        assert_eq!(clockwise_edges(states, &ctx), vec![top, right, left]);
    }

    #[test]
    fn test_reload_resets() {
        let mut ctx = BuildContext::new(&BspConfig::default());
        let segs = polygon(&mut ctx, &[(0.0, 0.0), (0.0, 1.0), (1.0, 1.0), (1.0, 0.0)]);
        let mut checker = ConvexChecker::new();
        checker.load(&segs, &ctx);
        run(&mut checker, &mut ctx);
        checker.load(&segs[..2], &ctx);
        assert_eq!(checker.states().state, ConvexState::Loaded);
        assert!(checker.states().convex_traversal.is_empty());
    }
}
