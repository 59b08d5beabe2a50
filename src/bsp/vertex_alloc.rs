// src/bsp/vertex_alloc.rs
//! Canonical vertex interning.
//!
//! Every point the builder touches goes through [`VertexAllocator`], so two
//! coordinates closer than the welding epsilon always come back as the same
//! [`VertexId`]. Lookups hash the point into a grid whose cells are one epsilon
//! wide, which means a match can only live in the 3×3 block of cells around it.
//!
//! Input points are welded as a batch with [`VertexAllocator::weld_all`], which
//! clusters them with a union-find so welding is transitive: if A welds to B and
//! B welds to C, all three share one vertex even when A and C are further than
//! epsilon apart. Consequently canonical vertices end up pairwise more than
//! epsilon apart.

use std::collections::HashMap;

use log::trace;
use union_find::{QuickUnionUf, UnionBySize, UnionFind};

use crate::bsp::Point2D;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(pub usize);

type Cell = (i64, i64);

#[derive(Debug)]
pub struct VertexAllocator {
    epsilon: f64,
    points: Vec<Point2D>,
    grid: HashMap<Cell, Vec<VertexId>>,
}

impl VertexAllocator {
    pub fn new(epsilon: f64) -> Self {
        VertexAllocator {
            epsilon,
            points: Vec::new(),
            grid: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn point(&self, id: VertexId) -> Point2D {
        self.points[id.0]
    }

    pub fn points(&self) -> &[Point2D] {
        &self.points
    }

    /// Nearest existing vertex within epsilon of `point`. Ties go to the lower id.
    pub fn find(&self, point: Point2D) -> Option<VertexId> {
        let (cx, cy) = cell_of(point, self.epsilon);
        let mut best: Option<(f64, VertexId)> = None;
        for gx in cx - 1..=cx + 1 {
            for gy in cy - 1..=cy + 1 {
                let Some(bucket) = self.grid.get(&(gx, gy)) else {
                    continue;
                };
                for &id in bucket {
                    let d = self.points[id.0].distance_to(&point);
                    if d > self.epsilon {
                        continue;
                    }
                    let better = match best {
                        None => true,
                        Some((best_d, best_id)) => d < best_d || (d == best_d && id < best_id),
                    };
                    if better {
                        best = Some((d, id));
                    }
                }
            }
        }
        best.map(|(_, id)| id)
    }

    pub fn get_or_create(&mut self, point: Point2D) -> VertexId {
        if let Some(id) = self.find(point) {
            return id;
        }
        let id = VertexId(self.points.len());
        self.points.push(point);
        self.grid
            .entry(cell_of(point, self.epsilon))
            .or_default()
            .push(id);
        trace!("new vertex {:?} at ({}, {})", id, point.x, point.y);
        id
    }

    /// Welds a batch of raw points transitively and returns the vertex of each,
    /// index for index. Each cluster is placed at its lowest-index member.
    pub fn weld_all(&mut self, raw: &[Point2D]) -> Vec<VertexId> {
        let mut clusters = QuickUnionUf::<UnionBySize>::new(raw.len());
        let mut raw_grid: HashMap<Cell, Vec<usize>> = HashMap::new();

        for (i, p) in raw.iter().enumerate() {
            let (cx, cy) = cell_of(*p, self.epsilon);
            for gx in cx - 1..=cx + 1 {
                for gy in cy - 1..=cy + 1 {
                    if let Some(bucket) = raw_grid.get(&(gx, gy)) {
                        for &j in bucket {
                            if raw[j].distance_to(p) <= self.epsilon {
                                clusters.union(i, j);
                            }
                        }
                    }
                }
            }
            raw_grid.entry((cx, cy)).or_default().push(i);
        }

        let mut canonical: HashMap<usize, VertexId> = HashMap::new();
        let mut ids = Vec::with_capacity(raw.len());
        for (i, p) in raw.iter().enumerate() {
            let root = clusters.find(i);
            let id = match canonical.get(&root) {
                Some(&id) => id,
                None => {
                    let id = self.get_or_create(*p);
                    canonical.insert(root, id);
                    id
                }
            };
            ids.push(id);
        }
        ids
    }
}

fn cell_of(point: Point2D, epsilon: f64) -> Cell {
    ((point.x / epsilon).floor() as i64, (point.y / epsilon).floor() as i64)
}
