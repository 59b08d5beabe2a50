// src/bsp/split_calc.rs

use std::collections::HashSet;

use log::trace;

use crate::bsp::bsp_util::{classify_seg, SegPosition};
use crate::bsp::context::BuildContext;
use crate::bsp::segment_alloc::SegmentId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitState {
    Loaded,
    Working,
    Finished,
}

/// Score of one candidate splitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitScore {
    pub left: usize,
    pub right: usize,
    pub cuts: usize,
    pub cost: usize,
}

#[derive(Debug, Clone)]
pub struct SplitStates {
    pub state: SplitState,
    pub best_splitter: Option<SegmentId>,
    pub best_score: Option<SplitScore>,
    /// Candidate scored by the latest step, with its score (`None` if it
    /// left one side empty).
    pub last_candidate: Option<(SegmentId, Option<SplitScore>)>,
    pub evaluated: usize,
    pub candidates: usize,
}

impl Default for SplitStates {
    fn default() -> Self {
        SplitStates {
            state: SplitState::Loaded,
            best_splitter: None,
            best_score: None,
            last_candidate: None,
            evaluated: 0,
            candidates: 0,
        }
    }
}

/// Picks the cheapest splitter for a non-convex segment set, one candidate per
/// step. Only segments with a source line are candidates, and only the first
/// segment of each line group: every segment on one line yields the same
/// partition. Cost is `split_penalty * cuts + |left - right|`; ties keep the
/// earlier candidate.
#[derive(Debug, Default)]
pub struct SplitCalculator {
    states: SplitStates,
    segments: Vec<SegmentId>,
    candidates: Vec<SegmentId>,
    cursor: usize,
}

impl SplitCalculator {
    pub fn new() -> Self {
        SplitCalculator::default()
    }

    pub fn states(&self) -> &SplitStates {
        &self.states
    }

    pub fn load(&mut self, segments: &[SegmentId], ctx: &BuildContext) {
        self.states = SplitStates::default();
        self.segments = segments.to_vec();
        self.cursor = 0;

        let mut groups = HashSet::new();
        self.candidates = segments
            .iter()
            .copied()
            .filter(|&id| {
                let seg = ctx.segments.get(id);
                !seg.is_miniseg() && groups.insert(seg.group)
            })
            .collect();
        self.states.candidates = self.candidates.len();
    }

    pub fn execute(&mut self, ctx: &BuildContext) {
        match self.states.state {
            SplitState::Loaded => {
                self.states.state = if self.candidates.is_empty() {
                    SplitState::Finished
                } else {
                    SplitState::Working
                };
            }
            SplitState::Working => {
                let candidate = self.candidates[self.cursor];
                let score = self.score(candidate, ctx);
                trace!("splitter candidate {:?}: {:?}", candidate, score);

                if let Some(score) = score {
                    let better = self
                        .states
                        .best_score
                        .map_or(true, |best| score.cost < best.cost);
                    if better {
                        self.states.best_splitter = Some(candidate);
                        self.states.best_score = Some(score);
                    }
                }
                self.states.last_candidate = Some((candidate, score));
                self.states.evaluated += 1;
                self.cursor += 1;
                if self.cursor == self.candidates.len() {
                    self.states.state = SplitState::Finished;
                }
            }
            SplitState::Finished => {}
        }
    }

    /// Scores `candidate` against the loaded set. `None` if it would leave
    /// one side empty.
    pub fn score(&self, candidate: SegmentId, ctx: &BuildContext) -> Option<SplitScore> {
        let partition = ctx.line(candidate);
        let (mut left, mut right, mut cuts) = (0usize, 0usize, 0usize);

        for &id in &self.segments {
            let c = classify_seg(&partition, &ctx.line(id), ctx.epsilon);
            match c.position {
                SegPosition::Right | SegPosition::Coincident { same_direction: true } => right += 1,
                SegPosition::Left | SegPosition::Coincident { same_direction: false } => left += 1,
                SegPosition::Spanning => {
                    cuts += 1;
                    left += 1;
                    right += 1;
                }
            }
        }

        if left == 0 || right == 0 {
            return None;
        }
        let cost = ctx.split_penalty * cuts + left.abs_diff(right);
        Some(SplitScore {
            left,
            right,
            cuts,
            cost,
        })
    }
}
