// src/bsp/partitioner.rs
//! Splits a segment set by the chosen splitter, one segment per step.
//!
//! Segments wholly on one side go to that side's bucket. A segment lying on
//! the splitter line goes right when it runs the same way as the splitter and
//! left otherwise. A segment crossing the line is cut at the crossing point,
//! and its two pieces keep the source line and side. Every vertex found on the
//! splitter line is collected for the miniseg pass.

use std::collections::HashSet;

use log::{debug, trace};

use crate::bsp::bsp_util::{classify_seg, SegClassification, SegPosition};
use crate::bsp::context::BuildContext;
use crate::bsp::segment_alloc::SegmentId;
use crate::bsp::vertex_alloc::VertexId;
use crate::bsp::PointSide;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionState {
    Loaded,
    Working,
    Finished,
}

#[derive(Debug, Clone)]
pub struct PartitionStates {
    pub state: PartitionState,
    pub splitter: Option<SegmentId>,
    pub right: Vec<SegmentId>,
    pub left: Vec<SegmentId>,
    /// Vertices on the splitter line, in the order they were first seen.
    pub collinear_vertices: Vec<VertexId>,
    pub cuts: usize,
    pub processed: usize,
}

impl Default for PartitionStates {
    fn default() -> Self {
        PartitionStates {
            state: PartitionState::Loaded,
            splitter: None,
            right: Vec::new(),
            left: Vec::new(),
            collinear_vertices: Vec::new(),
            cuts: 0,
            processed: 0,
        }
    }
}

#[derive(Debug, Default)]
pub struct Partitioner {
    states: PartitionStates,
    segments: Vec<SegmentId>,
    seen_collinear: HashSet<VertexId>,
    cursor: usize,
}

impl Partitioner {
    pub fn new() -> Self {
        Partitioner::default()
    }

    pub fn states(&self) -> &PartitionStates {
        &self.states
    }

    pub fn load(&mut self, splitter: SegmentId, segments: &[SegmentId]) {
        self.states = PartitionStates {
            splitter: Some(splitter),
            ..PartitionStates::default()
        };
        self.segments = segments.to_vec();
        self.seen_collinear.clear();
        self.cursor = 0;
    }

    pub fn execute(&mut self, ctx: &mut BuildContext) {
        match self.states.state {
            PartitionState::Loaded => {
                self.states.state = if self.segments.is_empty() || self.states.splitter.is_none() {
                    PartitionState::Finished
                } else {
                    PartitionState::Working
                };
            }
            PartitionState::Working => {
                let seg_id = self.segments[self.cursor];
                self.place(seg_id, ctx);
                self.states.processed += 1;
                self.cursor += 1;
                if self.cursor == self.segments.len() {
                    self.states.state = PartitionState::Finished;
                    debug!(
                        "partition by {:?}: {} right, {} left, {} cut(s), {} vertices on the line",
                        self.states.splitter,
                        self.states.right.len(),
                        self.states.left.len(),
                        self.states.cuts,
                        self.states.collinear_vertices.len()
                    );
                }
            }
            PartitionState::Finished => {}
        }
    }

    fn place(&mut self, seg_id: SegmentId, ctx: &mut BuildContext) {
        let Some(splitter) = self.states.splitter else {
            return;
        };
        let partition = ctx.line(splitter);
        let seg = ctx.segments.get(seg_id).clone();
        let c = classify_seg(&partition, &ctx.line(seg_id), ctx.epsilon);

        if c.start_side == PointSide::On {
            self.note_collinear(seg.start);
        }
        if c.end_side == PointSide::On {
            self.note_collinear(seg.end);
        }

        match c.position {
            SegPosition::Right | SegPosition::Coincident { same_direction: true } => {
                self.states.right.push(seg_id)
            }
            SegPosition::Left | SegPosition::Coincident { same_direction: false } => {
                self.states.left.push(seg_id)
            }
            SegPosition::Spanning => self.cut(seg_id, &c, ctx),
        }
    }

    fn cut(&mut self, seg_id: SegmentId, c: &SegClassification, ctx: &mut BuildContext) {
        let Some(splitter) = self.states.splitter else {
            return;
        };
        let partition = ctx.line(splitter);
        let seg = ctx.segments.get(seg_id).clone();
        let a = ctx.vertices.point(seg.start);
        let b = ctx.vertices.point(seg.end);
        let Some(point) = partition.crossing(&a, &b, c.start_dist, c.end_dist) else {
            return;
        };
        let at = ctx.vertices.get_or_create(point);

        // The crossing welded onto an endpoint: the segment only touches the
        // line and belongs wholly to the side of its other end.
        if at == seg.start || at == seg.end {
            trace!("{:?} touches the splitter at {:?}", seg_id, at);
            self.note_collinear(at);
            let far_side = if at == seg.start { c.end_side } else { c.start_side };
            match far_side {
                PointSide::Left => self.states.left.push(seg_id),
                _ => self.states.right.push(seg_id),
            }
            return;
        }

        let first = ctx
            .segments
            .get_or_create(seg.start, at, seg.line, seg.side, &ctx.vertices);
        let second = ctx
            .segments
            .get_or_create(at, seg.end, seg.line, seg.side, &ctx.vertices);
        ctx.junctions.add_cut(at, &seg, &ctx.vertices);
        trace!("cut {:?} at {:?} into {:?} and {:?}", seg_id, at, first, second);

        if c.start_side == PointSide::Right {
            self.states.right.push(first);
            self.states.left.push(second);
        } else {
            self.states.left.push(first);
            self.states.right.push(second);
        }
        self.note_collinear(at);
        self.states.cuts += 1;
    }

    fn note_collinear(&mut self, v: VertexId) {
        if self.seen_collinear.insert(v) {
            self.states.collinear_vertices.push(v);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsp::segment_alloc::SegmentSide;
    use crate::bsp::Point2D;
    use crate::config::BspConfig;
    use crate::map::LineId;

    fn l_shape(ctx: &mut BuildContext) -> Vec<SegmentId> {
        let pts = [(0.0, 0.0), (0.0, 2.0), (1.0, 2.0), (1.0, 1.0), (2.0, 1.0), (2.0, 0.0)];
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

    fn run(partitioner: &mut Partitioner, ctx: &mut BuildContext) -> usize {
        let mut steps = 0;
        while partitioner.states().state != PartitionState::Finished {
            partitioner.execute(ctx);
            steps += 1;
        }
        steps
    }

    #[test]
    fn test_splits_l_shape() {
        let mut ctx = BuildContext::new(&BspConfig::default());
        let segs = l_shape(&mut ctx);
        let mut partitioner = Partitioner::new();
        partitioner.load(segs[2], &segs);

        assert_eq!(run(&mut partitioner, &mut ctx), 7);
        let states = partitioner.states();
        assert_eq!(states.cuts, 1);
        assert_eq!(states.right.len(), 4);
        assert_eq!(states.left.len(), 3);
        assert_eq!(&states.right[..3], &segs[..3]);
        assert_eq!(&states.left[..2], &segs[3..5]);

        // The bottom wall was cut at (1,0); its pieces keep the source line.
        let cut_vertex = ctx.vertices.find(Point2D::new(1.0, 0.0)).unwrap();
        let right_piece = ctx.segments.get(states.right[3]);
        let left_piece = ctx.segments.get(states.left[2]);
        assert_eq!(right_piece.start, cut_vertex);
        assert_eq!(left_piece.end, cut_vertex);
        assert_eq!(right_piece.line, Some(LineId(5)));
        assert_eq!(left_piece.line, Some(LineId(5)));

        let on_line: Vec<Point2D> = states
            .collinear_vertices
            .iter()
            .map(|&v| ctx.vertices.point(v))
            .collect();
        assert_eq!(
            on_line,
            vec![Point2D::new(1.0, 2.0), Point2D::new(1.0, 1.0), Point2D::new(1.0, 0.0)]
        );
        // The cut registered wall tips at the new vertex.
        assert_eq!(ctx.junctions.tips(cut_vertex).len(), 2);
    }

    #[test]
    fn test_coincident_opposite_goes_left() {
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

        let mut partitioner = Partitioner::new();
        partitioner.load(ab, &[ab, ba]);
        run(&mut partitioner, &mut ctx);
        assert_eq!(partitioner.states().right, vec![ab]);
        assert_eq!(partitioner.states().left, vec![ba]);
        assert_eq!(partitioner.states().cuts, 0);
    }

    #[test]
    fn test_touching_segment_takes_far_side() {
        let mut ctx = BuildContext::new(&BspConfig::default());
        let a = ctx.vertices.get_or_create(Point2D::new(0.0, 0.0));
        let b = ctx.vertices.get_or_create(Point2D::new(0.0, 4.0));
        let c = ctx.vertices.get_or_create(Point2D::new(-3.0, 2.0));
        let d = ctx.vertices.get_or_create(Point2D::new(0.0, 2.0));
        let splitter = ctx.segments.get_or_create(
            a,
            b,
            Some(LineId(0)),
            SegmentSide::Front,
            &ctx.vertices,
        );
        let touching = ctx.segments.get_or_create(
            d,
            c,
            Some(LineId(1)),
            SegmentSide::Front,
            &ctx.vertices,
        );

        let mut partitioner = Partitioner::new();
        partitioner.load(splitter, &[splitter, touching]);
        run(&mut partitioner, &mut ctx);
        let states = partitioner.states();
        assert_eq!(states.left, vec![touching]);
        assert_eq!(states.collinear_vertices, vec![a, b, d]);
    }

    #[test]
    fn test_empty_set_finishes_at_once() {
        let mut ctx = BuildContext::new(&BspConfig::default());
        let segs = l_shape(&mut ctx);
        let mut partitioner = Partitioner::new();
        partitioner.load(segs[0], &[]);
        assert_eq!(run(&mut partitioner, &mut ctx), 1);
        assert!(partitioner.states().right.is_empty());
    }
}
