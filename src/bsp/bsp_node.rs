//! src/bsp/bsp_node.rs

use serde::{Deserialize, Serialize};

use crate::bsp::segment_alloc::{SegmentId, SegmentSide};
use crate::bsp::{BoundingBox, Line2D, Point2D};
use crate::error::BspError;
use crate::map::LineId;

/// Index of a node in a node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Allocated for a work item that has not been resolved yet.
    Pending,
    /// A convex subsector. Edges run clockwise.
    Leaf { edges: Vec<SegmentId> },
    Split {
        splitter: SegmentId,
        left: NodeId,
        right: NodeId,
    },
}

/// A node in the BSP tree. Nodes are created empty when their work item is
/// pushed and filled in exactly once when it is resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BspNode {
    pub kind: NodeKind,
    /// Set on leaves built from a zero-area segment set.
    pub is_degenerate: bool,
    /// Path of `L`/`R` choices from the root. Empty for the root.
    pub branch: String,
}

impl BspNode {
    pub fn pending(branch: String) -> Self {
        BspNode {
            kind: NodeKind::Pending,
            is_degenerate: false,
            branch,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    pub fn edges(&self) -> Option<&[SegmentId]> {
        match &self.kind {
            NodeKind::Leaf { edges } => Some(edges),
            _ => None,
        }
    }
}

/// A segment resolved to coordinates, as it appears in a finished tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Seg {
    pub start: Point2D,
    pub end: Point2D,
    /// `None` for minisegs.
    pub line: Option<LineId>,
    pub side: SegmentSide,
}

impl Seg {
    pub fn is_miniseg(&self) -> bool {
        self.line.is_none()
    }

    pub fn line2d(&self) -> Line2D {
        Line2D::new(self.start, self.end)
    }

    pub fn length(&self) -> f64 {
        self.start.distance_to(&self.end)
    }
}

/// A finished BSP tree. It owns everything it needs; node edges and splitters
/// index into `segs`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BspTree {
    nodes: Vec<BspNode>,
    root: NodeId,
    segs: Vec<Seg>,
}

impl BspTree {
    /// Compacts a builder's node arena into a tree. With `strip_degenerate`,
    /// degenerate leaves are removed and a split left with one child collapses
    /// into that child. Returns `None` when nothing usable remains.
    pub fn from_arena(
        arena: &[BspNode],
        root: NodeId,
        segs: Vec<Seg>,
        strip_degenerate: bool,
    ) -> Option<BspTree> {
        // Pre-order from the root, then resolve children before parents.
        let mut order = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            order.push(id);
            if let NodeKind::Split { left, right, .. } = arena[id.0].kind {
                stack.push(left);
                stack.push(right);
            }
        }

        let mut nodes: Vec<BspNode> = Vec::new();
        let mut survivor: Vec<Option<NodeId>> = vec![None; arena.len()];
        for &id in order.iter().rev() {
            let node = &arena[id.0];
            survivor[id.0] = match &node.kind {
                NodeKind::Pending => None,
                NodeKind::Leaf { .. } if strip_degenerate && node.is_degenerate => None,
                NodeKind::Leaf { .. } => {
                    nodes.push(node.clone());
                    Some(NodeId(nodes.len() - 1))
                }
                NodeKind::Split {
                    splitter,
                    left,
                    right,
                } => match (survivor[left.0], survivor[right.0]) {
                    (Some(left), Some(right)) => {
                        nodes.push(BspNode {
                            kind: NodeKind::Split {
                                splitter: *splitter,
                                left,
                                right,
                            },
                            is_degenerate: false,
                            branch: node.branch.clone(),
                        });
                        Some(NodeId(nodes.len() - 1))
                    }
                    (Some(only), None) | (None, Some(only)) => Some(only),
                    (None, None) => None,
                },
            };
        }

        survivor[root.0].map(|root| BspTree { nodes, root, segs })
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn node(&self, id: NodeId) -> &BspNode {
        &self.nodes[id.0]
    }

    pub fn nodes(&self) -> &[BspNode] {
        &self.nodes
    }

    pub fn seg(&self, id: SegmentId) -> &Seg {
        &self.segs[id.0]
    }

    pub fn segs(&self) -> &[Seg] {
        &self.segs
    }

    /// The leaf whose region contains `point`. Points on a splitter line go
    /// to its right child.
    pub fn locate(&self, point: Point2D) -> NodeId {
        let mut id = self.root;
        while let NodeKind::Split {
            splitter,
            left,
            right,
        } = self.nodes[id.0].kind
        {
            id = if self.seg(splitter).line2d().classify_point(&point) < 0.0 {
                left
            } else {
                right
            };
        }
        id
    }

    /// Leaves in left-to-right order.
    pub fn leaves(&self) -> Vec<NodeId> {
        let mut leaves = Vec::new();
        let mut stack = vec![self.root];
        while let Some(id) = stack.pop() {
            match self.nodes[id.0].kind {
                NodeKind::Split { left, right, .. } => {
                    stack.push(right);
                    stack.push(left);
                }
                NodeKind::Leaf { .. } => leaves.push(id),
                NodeKind::Pending => {}
            }
        }
        leaves
    }

    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|n| n.is_leaf()).count()
    }

    /// The boundary of a leaf as the start point of each edge, clockwise.
    pub fn leaf_polygon(&self, id: NodeId) -> Option<Vec<Point2D>> {
        self.nodes[id.0]
            .edges()
            .map(|edges| edges.iter().map(|&e| self.seg(e).start).collect())
    }

    /// Number of splits on the longest root-to-leaf path. A lone leaf has
    /// depth 0.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self.root, 0)];
        while let Some((id, depth)) = stack.pop() {
            deepest = deepest.max(depth);
            if let NodeKind::Split { left, right, .. } = self.nodes[id.0].kind {
                stack.push((left, depth + 1));
                stack.push((right, depth + 1));
            }
        }
        deepest
    }

    /// Bounds of one leaf's edges. `None` for a split node.
    pub fn leaf_bounds(&self, id: NodeId) -> Option<BoundingBox> {
        self.nodes[id.0].edges().map(|edges| {
            let mut bbox = BoundingBox::new_empty();
            for &e in edges {
                let seg = self.seg(e);
                bbox.expand_point(seg.start.x, seg.start.y);
                bbox.expand_point(seg.end.x, seg.end.y);
            }
            bbox
        })
    }

    /// Bounds of the whole tree: the union of every leaf's bounds.
    pub fn bounds(&self) -> BoundingBox {
        let mut bbox = BoundingBox::new_empty();
        for id in self.leaves() {
            if let Some(leaf) = self.leaf_bounds(id) {
                bbox.combine(&leaf);
            }
        }
        bbox
    }

    pub fn to_json(&self) -> Result<String, BspError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
