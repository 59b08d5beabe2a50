// src/bsp/chain_pruner.rs

use std::collections::HashSet;

use log::debug;

use crate::bsp::segment_alloc::{SegmentAllocator, SegmentId};

/// What a pruning pass threw away.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub zero_length: usize,
    pub duplicates: usize,
    pub kept: usize,
}

/// One-time cleanup of the initial segment set, run before the first work item
/// is pushed. Drops segments whose endpoints welded together and directed
/// duplicates (same start and end, from different lines). The first
/// occurrence of a duplicate survives, so input order decides.
pub struct SegmentChainPruner;

impl SegmentChainPruner {
    pub fn prune(
        segments: &[SegmentId],
        allocator: &SegmentAllocator,
    ) -> (Vec<SegmentId>, PruneReport) {
        let mut report = PruneReport::default();
        let mut seen = HashSet::new();
        let mut kept = Vec::with_capacity(segments.len());

        for &id in segments {
            let seg = allocator.get(id);
            if seg.start == seg.end {
                report.zero_length += 1;
                continue;
            }
            if !seen.insert((seg.start, seg.end)) {
                report.duplicates += 1;
                continue;
            }
            kept.push(id);
        }

        report.kept = kept.len();
        debug!(
            "pruned {} zero-length and {} duplicate segments, {} remain",
            report.zero_length, report.duplicates, report.kept
        );
        (kept, report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bsp::segment_alloc::SegmentSide;
    use crate::bsp::vertex_alloc::VertexAllocator;
    use crate::bsp::Point2D;
    use crate::map::LineId;

    #[test]
    fn test_prunes_degenerate_and_duplicate() {
        let mut vertices = VertexAllocator::new(0.01);
        let a = vertices.get_or_create(Point2D::new(0.0, 0.0));
        let b = vertices.get_or_create(Point2D::new(5.0, 0.0));
        let mut segs = SegmentAllocator::new(0.01);

        let ab = segs.get_or_create(a, b, Some(LineId(0)), SegmentSide::Front, &vertices);
        let aa = segs.get_or_create(a, a, Some(LineId(1)), SegmentSide::Front, &vertices);
        let ab_again = segs.get_or_create(a, b, Some(LineId(2)), SegmentSide::Front, &vertices);
        let ba = segs.get_or_create(b, a, Some(LineId(3)), SegmentSide::Front, &vertices);

        let (kept, report) = SegmentChainPruner::prune(&[ab, aa, ab_again, ba], &segs);
        assert_eq!(kept, vec![ab, ba]);
        assert_eq!(
            report,
            PruneReport {
                zero_length: 1,
                duplicates: 1,
                kept: 2
            }
        );
    }
}
