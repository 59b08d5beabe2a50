// src/bsp/bsp_builder.rs
//! The steppable BSP scheduler.
//!
//! Instead of recursing, the builder keeps an explicit stack of [`WorkItem`]s,
//! each owning the segments left to resolve for one pre-allocated node. Every
//! call to [`BspBuilder::execute`] performs one atomic step: either one step of
//! the active sub-engine or one transition of the top-level [`BspState`]. The
//! coarser stepping methods are loops over `execute`.

use log::{debug, info, trace};

use crate::bsp::bsp_node::{BspNode, BspTree, NodeId, NodeKind, Seg};
use crate::bsp::chain_pruner::{PruneReport, SegmentChainPruner};
use crate::bsp::context::BuildContext;
use crate::bsp::convex::{clockwise_edges, ConvexChecker, ConvexState, ConvexStates};
use crate::bsp::junction::JunctionClassifier;
use crate::bsp::miniseg::{MinisegCreator, MinisegState, MinisegStates};
use crate::bsp::partitioner::{PartitionState, PartitionStates, Partitioner};
use crate::bsp::segment_alloc::{SegmentId, SegmentSide};
use crate::bsp::split_calc::{SplitCalculator, SplitState, SplitStates};
use crate::config::BspConfig;
use crate::error::BspError;
use crate::map::MapData;

/// Ceiling on pending work items. Crossing it means a splitter failed to
/// shrink its segment set.
pub const MAX_WORK_ITEMS: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BspState {
    NotStarted,
    CheckingConvexity,
    CreatingLeafNode,
    FindingSplitter,
    PartitioningSegments,
    GeneratingMinisegs,
    FinishingSplit,
    Complete,
}

/// A node waiting to be resolved, with the segments that bound its region.
#[derive(Debug, Clone)]
pub struct WorkItem {
    pub node: NodeId,
    pub segments: Vec<SegmentId>,
    pub branch: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub steps: usize,
    pub leaves: usize,
    pub degenerate_leaves: usize,
    pub splits: usize,
    pub minisegs: usize,
    pub cuts: usize,
    pub max_pending: usize,
    pub pruned: PruneReport,
}

/// Builds a BSP tree one observable step at a time.
///
/// A builder is driven by a single caller. After any stepping method returns
/// an error the build is unusable and the builder should be dropped.
#[derive(Debug)]
pub struct BspBuilder {
    config: BspConfig,
    ctx: BuildContext,
    state: BspState,
    work: Vec<WorkItem>,
    nodes: Vec<BspNode>,
    root: NodeId,
    convex: ConvexChecker,
    split: SplitCalculator,
    partitioner: Partitioner,
    minisegs: MinisegCreator,
    found_degenerate: bool,
    stats: BuildStats,
}

impl BspBuilder {
    /// Reads and interns the map, then queues the whole segment set as the
    /// root work item. Fails only on bad configuration or bad map data.
    pub fn new<M: MapData + ?Sized>(config: BspConfig, map: &M) -> Result<Self, BspError> {
        config.validate()?;
        let lines = map.lines()?;
        for line in &lines {
            line.validate()?;
        }
        info!(
            "building BSP for {} lines (epsilon {})",
            lines.len(),
            config.vertex_welding_epsilon
        );

        let mut ctx = BuildContext::new(&config);
        let raw: Vec<_> = lines.iter().flat_map(|l| [l.start, l.end]).collect();
        let welded = ctx.vertices.weld_all(&raw);
        debug!("welded {} endpoints into {} vertices", raw.len(), ctx.vertices.len());

        let mut initial = Vec::with_capacity(lines.len() * 2);
        for (i, line) in lines.iter().enumerate() {
            let (a, b) = (welded[2 * i], welded[2 * i + 1]);
            initial.push(ctx.segments.get_or_create(
                a,
                b,
                Some(line.id),
                SegmentSide::Front,
                &ctx.vertices,
            ));
            if line.two_sided {
                initial.push(ctx.segments.get_or_create(
                    b,
                    a,
                    Some(line.id),
                    SegmentSide::Back,
                    &ctx.vertices,
                ));
            }
        }

        let (kept, pruned) = SegmentChainPruner::prune(&initial, &ctx.segments);
        ctx.junctions = JunctionClassifier::classify(
            kept.iter().map(|&id| ctx.segments.get(id)),
            &ctx.vertices,
        );

        let root = NodeId(0);
        let nodes = vec![BspNode::pending(String::new())];
        let work = vec![WorkItem {
            node: root,
            segments: kept,
            branch: String::new(),
        }];

        Ok(BspBuilder {
            config,
            ctx,
            state: BspState::NotStarted,
            work,
            nodes,
            root,
            convex: ConvexChecker::new(),
            split: SplitCalculator::new(),
            partitioner: Partitioner::new(),
            minisegs: MinisegCreator::new(),
            found_degenerate: false,
            stats: BuildStats {
                pruned,
                max_pending: 1,
                ..BuildStats::default()
            },
        })
    }

    pub fn is_done(&self) -> bool {
        self.state == BspState::Complete
    }

    pub fn state(&self) -> BspState {
        self.state
    }

    /// Branch path of the work item currently being resolved.
    pub fn current_branch(&self) -> Option<&str> {
        self.work.last().map(|item| item.branch.as_str())
    }

    pub fn pending_work_items(&self) -> &[WorkItem] {
        &self.work
    }

    pub fn node(&self, id: NodeId) -> Option<&BspNode> {
        self.nodes.get(id.0)
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn context(&self) -> &BuildContext {
        &self.ctx
    }

    pub fn convex_states(&self) -> &ConvexStates {
        self.convex.states()
    }

    pub fn split_states(&self) -> &SplitStates {
        self.split.states()
    }

    pub fn partition_states(&self) -> &PartitionStates {
        self.partitioner.states()
    }

    pub fn miniseg_states(&self) -> &MinisegStates {
        self.minisegs.states()
    }

    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    /// Performs one atomic step. A no-op once the build is complete.
    pub fn execute(&mut self) -> Result<(), BspError> {
        if self.is_done() {
            return Ok(());
        }
        self.stats.steps += 1;

        match self.state {
            BspState::NotStarted => {
                let item = top(&self.work)?;
                self.convex.load(&item.segments, &self.ctx);
                self.set_state(BspState::CheckingConvexity);
            }
            BspState::CheckingConvexity => {
                let result = self.convex.states().state;
                match result {
                    ConvexState::FinishedIsConvex => self.set_state(BspState::CreatingLeafNode),
                    ConvexState::FinishedIsDegenerate => {
                        self.found_degenerate = true;
                        self.set_state(BspState::CreatingLeafNode);
                    }
                    ConvexState::FinishedIsSplittable => {
                        let item = top(&self.work)?;
                        self.split.load(&item.segments, &self.ctx);
                        self.set_state(BspState::FindingSplitter);
                    }
                    ConvexState::Loaded | ConvexState::Traversing => {
                        self.convex.execute(&mut self.ctx)
                    }
                }
            }
            BspState::CreatingLeafNode => self.create_leaf()?,
            BspState::FindingSplitter => {
                if self.split.states().state != SplitState::Finished {
                    self.split.execute(&self.ctx);
                    return Ok(());
                }
                let item = top(&self.work)?;
                let splitter = self.split.states().best_splitter.ok_or_else(|| {
                    BspError::MissingSplitter {
                        branch: item.branch.clone(),
                        segments: item.segments.len(),
                    }
                })?;
                debug!(
                    "branch {:?}: splitter {:?} ({:?})",
                    item.branch,
                    splitter,
                    self.split.states().best_score
                );
                self.partitioner.load(splitter, &item.segments);
                self.set_state(BspState::PartitioningSegments);
            }
            BspState::PartitioningSegments => {
                if self.partitioner.states().state != PartitionState::Finished {
                    self.partitioner.execute(&mut self.ctx);
                    return Ok(());
                }
                let states = self.partitioner.states();
                let splitter = match states.splitter {
                    Some(splitter) => splitter,
                    None => {
                        let item = top(&self.work)?;
                        return Err(BspError::MissingSplitter {
                            branch: item.branch.clone(),
                            segments: item.segments.len(),
                        });
                    }
                };
                self.minisegs.load(splitter, &states.collinear_vertices);
                self.set_state(BspState::GeneratingMinisegs);
            }
            BspState::GeneratingMinisegs => {
                if self.minisegs.states().state != MinisegState::Finished {
                    self.minisegs.execute(&mut self.ctx);
                    return Ok(());
                }
                self.set_state(BspState::FinishingSplit);
            }
            BspState::FinishingSplit => self.finish_split()?,
            BspState::Complete => {}
        }
        Ok(())
    }

    /// Steps until the top-level state changes.
    pub fn execute_major_step(&mut self) -> Result<(), BspError> {
        let start = self.state;
        while !self.is_done() && self.state == start {
            self.execute()?;
        }
        Ok(())
    }

    /// Steps until the next work item has been loaded for a convexity check.
    pub fn execute_full_cycle_step(&mut self) -> Result<(), BspError> {
        while !self.is_done() {
            self.execute_major_step()?;
            if self.state == BspState::CheckingConvexity {
                break;
            }
        }
        Ok(())
    }

    /// Runs full cycles until the current work item's branch is `path`
    /// (ignoring ASCII case) or the build completes.
    pub fn execute_until_branch(&mut self, path: &str) -> Result<(), BspError> {
        while !self.is_done() {
            if self
                .current_branch()
                .is_some_and(|b| b.eq_ignore_ascii_case(path))
            {
                break;
            }
            self.execute_full_cycle_step()?;
        }
        Ok(())
    }

    /// Runs the build to completion and strips degenerate leaves. `Ok(None)`
    /// means no usable tree could be built from this map.
    pub fn build(mut self) -> Result<Option<BspTree>, BspError> {
        while !self.is_done() {
            self.execute()?;
        }
        let segs = self
            .ctx
            .segments
            .segments()
            .iter()
            .map(|s| Seg {
                start: self.ctx.vertices.point(s.start),
                end: self.ctx.vertices.point(s.end),
                line: s.line,
                side: s.side,
            })
            .collect();
        let tree = BspTree::from_arena(&self.nodes, self.root, segs, self.found_degenerate);

        match &tree {
            Some(tree) => info!(
                "BSP complete: {} leaves, depth {}, {} splits, {} minisegs, {} steps",
                tree.leaf_count(),
                tree.depth(),
                self.stats.splits,
                self.stats.minisegs,
                self.stats.steps
            ),
            None => info!("BSP failed: root is degenerate after {} steps", self.stats.steps),
        }
        Ok(tree)
    }

    fn set_state(&mut self, state: BspState) {
        trace!("{:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn create_leaf(&mut self) -> Result<(), BspError> {
        let item = self.work.pop().ok_or(BspError::EmptyWorkStack)?;
        let states = self.convex.states();
        let degenerate = states.state == ConvexState::FinishedIsDegenerate;
        let edges = if degenerate {
            item.segments
        } else {
            clockwise_edges(states, &self.ctx)
        };
        debug!(
            "branch {:?}: leaf with {} edges{}",
            item.branch,
            edges.len(),
            if degenerate { " (degenerate)" } else { "" }
        );

        let node = &mut self.nodes[item.node.0];
        node.kind = NodeKind::Leaf { edges };
        node.is_degenerate = degenerate;

        self.stats.leaves += 1;
        if degenerate {
            self.stats.degenerate_leaves += 1;
        }
        self.advance();
        Ok(())
    }

    fn finish_split(&mut self) -> Result<(), BspError> {
        let item = self.work.pop().ok_or(BspError::EmptyWorkStack)?;
        let partition = self.partitioner.states();
        let splitter = partition.splitter.ok_or_else(|| BspError::MissingSplitter {
            branch: item.branch.clone(),
            segments: item.segments.len(),
        })?;

        let mut right = partition.right.clone();
        let mut left = partition.left.clone();
        let pairs = &self.minisegs.states().pairs;
        for pair in pairs {
            right.push(pair.right);
            left.push(pair.left);
        }
        self.stats.splits += 1;
        self.stats.cuts += partition.cuts;
        self.stats.minisegs += pairs.len();

        let left_item = self.child(&item.branch, 'L', left);
        let right_item = self.child(&item.branch, 'R', right);
        self.nodes[item.node.0].kind = NodeKind::Split {
            splitter,
            left: left_item.node,
            right: right_item.node,
        };

        // LIFO: the child pushed last is resolved first.
        if self.config.branch_right {
            self.work.push(left_item);
            self.work.push(right_item);
        } else {
            self.work.push(right_item);
            self.work.push(left_item);
        }
        if self.work.len() > MAX_WORK_ITEMS {
            return Err(BspError::WorkStackOverflow {
                limit: MAX_WORK_ITEMS,
            });
        }
        self.stats.max_pending = self.stats.max_pending.max(self.work.len());
        self.advance();
        Ok(())
    }

    fn child(&mut self, parent: &str, side: char, segments: Vec<SegmentId>) -> WorkItem {
        let mut branch = String::with_capacity(parent.len() + 1);
        branch.push_str(parent);
        branch.push(side);
        let node = NodeId(self.nodes.len());
        self.nodes.push(BspNode::pending(branch.clone()));
        WorkItem {
            node,
            segments,
            branch,
        }
    }

    /// Loads the next work item, or completes the build.
    fn advance(&mut self) {
        match self.work.last() {
            Some(item) => {
                self.convex.load(&item.segments, &self.ctx);
                self.set_state(BspState::CheckingConvexity);
            }
            None => self.set_state(BspState::Complete),
        }
    }
}

fn top(work: &[WorkItem]) -> Result<&WorkItem, BspError> {
    work.last().ok_or(BspError::EmptyWorkStack)
}
