// src/bsp/mod.rs
pub mod bsp_builder;
pub mod bsp_node;
mod bsp_util; // Re-exported below
pub mod chain_pruner;
pub mod collinear;
pub mod context;
pub mod convex;
pub mod junction;
pub mod miniseg;
pub mod partitioner;
pub mod segment_alloc;
pub mod split_calc;
pub mod vertex_alloc;

pub use bsp_builder::{BspBuilder, BspState, BuildStats, WorkItem, MAX_WORK_ITEMS};
pub use bsp_node::{BspNode, BspTree, NodeId, NodeKind, Seg};
pub use bsp_util::{
    classify_seg, BoundingBox, Line2D, Point2D, PointSide, SegClassification, SegPosition,
};
pub use context::BuildContext;
pub use segment_alloc::{Segment, SegmentId, SegmentSide};
pub use vertex_alloc::VertexId;
