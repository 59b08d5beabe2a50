// src/bsp/miniseg.rs
//! Minisegs close the gaps a splitter opens through sector space.
//!
//! The vertices found on the splitter line are sorted along it. Each step then
//! looks at one consecutive gap: when open space leaves both of its ends
//! towards each other, the gap runs through the sector and gets a pair of
//! minisegs, one per side of the splitter.

use log::{trace, warn};

use crate::bsp::context::BuildContext;
use crate::bsp::segment_alloc::{SegmentId, SegmentSide};
use crate::bsp::vertex_alloc::VertexId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinisegState {
    Loaded,
    Working,
    Finished,
}

/// Both directions of one miniseg. `right` runs along the splitter and joins
/// its right child; `left` runs against it and joins the left child.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MinisegPair {
    pub right: SegmentId,
    pub left: SegmentId,
}

#[derive(Debug, Clone)]
pub struct MinisegStates {
    pub state: MinisegState,
    /// Vertices on the splitter line, ordered along it.
    pub sorted: Vec<VertexId>,
    pub pairs: Vec<MinisegPair>,
    pub gaps_checked: usize,
    /// Gaps where the two ends disagreed about open space.
    pub mismatched: usize,
}

impl Default for MinisegStates {
    fn default() -> Self {
        MinisegStates {
            state: MinisegState::Loaded,
            sorted: Vec::new(),
            pairs: Vec::new(),
            gaps_checked: 0,
            mismatched: 0,
        }
    }
}

#[derive(Debug, Default)]
pub struct MinisegCreator {
    states: MinisegStates,
    splitter: Option<SegmentId>,
    cursor: usize,
}

impl MinisegCreator {
    pub fn new() -> Self {
        MinisegCreator::default()
    }

    pub fn states(&self) -> &MinisegStates {
        &self.states
    }

    pub fn load(&mut self, splitter: SegmentId, collinear: &[VertexId]) {
        self.states = MinisegStates {
            sorted: collinear.to_vec(),
            ..MinisegStates::default()
        };
        self.splitter = Some(splitter);
        self.cursor = 0;
    }

    pub fn execute(&mut self, ctx: &mut BuildContext) {
        match self.states.state {
            MinisegState::Loaded => {
                self.sort(ctx);
                self.states.state = if self.states.sorted.len() < 2 {
                    MinisegState::Finished
                } else {
                    MinisegState::Working
                };
            }
            MinisegState::Working => {
                self.check_gap(ctx);
                self.cursor += 1;
                self.states.gaps_checked += 1;
                if self.cursor + 1 >= self.states.sorted.len() {
                    self.states.state = MinisegState::Finished;
                }
            }
            MinisegState::Finished => {}
        }
    }

    fn sort(&mut self, ctx: &BuildContext) {
        let Some(splitter) = self.splitter else {
            self.states.sorted.clear();
            return;
        };
        let line = ctx.line(splitter);
        let mut keyed: Vec<(f64, VertexId)> = self
            .states
            .sorted
            .iter()
            .map(|&v| (line.project(&ctx.vertices.point(v)), v))
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        self.states.sorted = keyed.into_iter().map(|(_, v)| v).collect();
    }

    fn check_gap(&mut self, ctx: &mut BuildContext) {
        let a = self.states.sorted[self.cursor];
        let b = self.states.sorted[self.cursor + 1];
        let pa = ctx.vertices.point(a);
        let pb = ctx.vertices.point(b);
        let gap = pa.distance_to(&pb);
        if gap <= ctx.epsilon {
            return;
        }

        let angle = (pb.y - pa.y).atan2(pb.x - pa.x);
        let tolerance = (ctx.epsilon / gap).atan().max(1e-9);
        let open_a = ctx.junctions.is_open(a, angle, tolerance);
        let open_b = ctx.junctions.is_open(b, angle + std::f64::consts::PI, tolerance);

        match (open_a, open_b) {
            (true, true) => {
                let right = ctx
                    .segments
                    .get_or_create(a, b, None, SegmentSide::Front, &ctx.vertices);
                let left = ctx
                    .segments
                    .get_or_create(b, a, None, SegmentSide::Front, &ctx.vertices);
                trace!("miniseg {:?} <-> {:?}", a, b);
                self.states.pairs.push(MinisegPair { right, left });
            }
            (false, false) => {}
            _ => {
                warn!(
                    "open space disagrees across ({:.3}, {:.3}) -> ({:.3}, {:.3}), no miniseg",
                    pa.x, pa.y, pb.x, pb.y
                );
                self.states.mismatched += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsp::partitioner::{PartitionState, Partitioner};
    use crate::bsp::Point2D;
    use crate::config::BspConfig;
    use crate::map::LineId;

    fn l_shape(ctx: &mut BuildContext) -> Vec<SegmentId> {
        let pts = [(0.0, 0.0), (0.0, 2.0), (1.0, 2.0), (1.0, 1.0), (2.0, 1.0), (2.0, 0.0)];
        let ids: Vec<VertexId> = pts
            .iter()
            .map(|&(x, y)| ctx.vertices.get_or_create(Point2D::new(x, y)))
            .collect();
        let segs: Vec<SegmentId> = (0..ids.len())
            .map(|i| {
                ctx.segments.get_or_create(
                    ids[i],
                    ids[(i + 1) % ids.len()],
                    Some(LineId(i)),
                    SegmentSide::Front,
                    &ctx.vertices,
                )
            })
            .collect();
        for &s in &segs {
            let seg = ctx.segments.get(s).clone();
            ctx.junctions.add_segment(&seg, &ctx.vertices);
        }
        segs
    }

    fn run(creator: &mut MinisegCreator, ctx: &mut BuildContext) -> usize {
        let mut steps = 0;
        while creator.states().state != MinisegState::Finished {
            creator.execute(ctx);
            steps += 1;
        }
        steps
    }

    #[test]
    fn test_l_shape_gets_one_pair() {
        let mut ctx = BuildContext::new(&BspConfig::default());
        let segs = l_shape(&mut ctx);
        let mut partitioner = Partitioner::new();
        partitioner.load(segs[2], &segs);
        while partitioner.states().state != PartitionState::Finished {
            partitioner.execute(&mut ctx);
        }
        // Hand them over out of order; the first step sorts along the splitter.
        let mut collinear = partitioner.states().collinear_vertices.clone();
        collinear.reverse();

        let mut creator = MinisegCreator::new();
        creator.load(segs[2], &collinear);
        // Sort, then two gaps.
        assert_eq!(run(&mut creator, &mut ctx), 3);

        let states = creator.states();
        assert_eq!(states.gaps_checked, 2);
        assert_eq!(states.mismatched, 0);
        assert_eq!(states.pairs.len(), 1);

        let corner = ctx.vertices.find(Point2D::new(1.0, 1.0)).unwrap();
        let cut = ctx.vertices.find(Point2D::new(1.0, 0.0)).unwrap();
        let right = ctx.segments.get(states.pairs[0].right);
        let left = ctx.segments.get(states.pairs[0].left);
        assert!(right.is_miniseg() && left.is_miniseg());
        assert_eq!((right.start, right.end), (corner, cut));
        assert_eq!((left.start, left.end), (cut, corner));
    }

    #[test]
    fn test_gap_along_wall_is_closed() {
        let mut ctx = BuildContext::new(&BspConfig::default());
        let segs = l_shape(&mut ctx);
        let top = ctx.vertices.find(Point2D::new(1.0, 2.0)).unwrap();
        let corner = ctx.vertices.find(Point2D::new(1.0, 1.0)).unwrap();

        let mut creator = MinisegCreator::new();
        creator.load(segs[2], &[top, corner]);
        run(&mut creator, &mut ctx);
        assert!(creator.states().pairs.is_empty());
        assert_eq!(creator.states().mismatched, 0);
    }

    #[test]
    fn test_single_vertex_has_no_gaps() {
        let mut ctx = BuildContext::new(&BspConfig::default());
        let segs = l_shape(&mut ctx);
        let corner = ctx.vertices.find(Point2D::new(1.0, 1.0)).unwrap();

        let mut creator = MinisegCreator::new();
        creator.load(segs[2], &[corner]);
        assert_eq!(run(&mut creator, &mut ctx), 1);
        assert_eq!(creator.states().gaps_checked, 0);
    }

    #[test]
    fn test_gap_between_free_vertices_is_open() {
        let mut ctx = BuildContext::new(&BspConfig::default());
        let segs = l_shape(&mut ctx);
        let a = ctx.vertices.get_or_create(Point2D::new(5.0, 5.0));
        let b = ctx.vertices.get_or_create(Point2D::new(5.0, 8.0));

        let mut creator = MinisegCreator::new();
        creator.load(segs[0], &[b, a]);
        run(&mut creator, &mut ctx);
        assert_eq!(creator.states().sorted, vec![a, b]);
        assert_eq!(creator.states().pairs.len(), 1);
    }
}
