// src/bsp/context.rs

use crate::bsp::junction::JunctionClassifier;
use crate::bsp::segment_alloc::{SegmentAllocator, SegmentId};
use crate::bsp::vertex_alloc::VertexAllocator;
use crate::bsp::Line2D;
use crate::config::BspConfig;

/// The interning tables and tolerances every sub-engine works against. Owned
/// by one builder; sub-engines borrow it for the duration of a single step.
#[derive(Debug)]
pub struct BuildContext {
    pub vertices: VertexAllocator,
    pub segments: SegmentAllocator,
    pub junctions: JunctionClassifier,
    pub epsilon: f64,
    pub split_penalty: usize,
}

impl BuildContext {
    pub fn new(config: &BspConfig) -> Self {
        let epsilon = config.vertex_welding_epsilon;
        BuildContext {
            vertices: VertexAllocator::new(epsilon),
            segments: SegmentAllocator::new(epsilon),
            junctions: JunctionClassifier::new(),
            epsilon,
            split_penalty: config.split_penalty,
        }
    }

    pub fn line(&self, seg: SegmentId) -> Line2D {
        self.segments.line_of(seg, &self.vertices)
    }
}
