use log::debug;

use crate::detection::ColorPairParams;
use crate::models::{CandidatePair, Region};

/// Area difference, centroid offset ratio (dy / dx) and centroid distance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairMetrics {
    pub area_diff: f64,
    pub ratio: f64,
    pub distance: f64,
}

impl PairMetrics {
    pub fn between(a: &Region, b: &Region) -> Self {
        let dx = (a.centroid.x - b.centroid.x).abs();
        let dy = (a.centroid.y - b.centroid.y).abs();
        Self {
            area_diff: (a.area() - b.area()).abs(),
            // offset keeps axis-aligned pairs finite
            ratio: dy / (dx + 1e-6),
            distance: a.centroid.distance(&b.centroid),
        }
    }

    pub fn accepted(&self, params: &ColorPairParams) -> bool {
        self.area_diff <= params.max_area_diff
            && params.min_ratio < self.ratio
            && self.ratio < params.max_ratio
            && self.distance < params.max_distance
    }
}

/// Whether two regions look like the two halves of one marker.
/// Symmetric in its arguments.
pub fn pair_accepted(a: &Region, b: &Region, params: &ColorPairParams) -> bool {
    PairMetrics::between(a, b).accepted(params)
}

/// Examine every pair `(i, j)` with `i < j` exactly once, in order.
///
/// A region may take part in several accepted pairs.
pub fn match_pairs(regions: &[Region], params: &ColorPairParams) -> Vec<CandidatePair> {
    let mut pairs = Vec::new();

    'outer: for i in 0..regions.len() {
        for j in (i + 1)..regions.len() {
            let metrics = PairMetrics::between(&regions[i], &regions[j]);
            if !metrics.accepted(params) {
                continue;
            }
            if params.max_pairs.is_some_and(|cap| pairs.len() >= cap) {
                debug!("pair cap of {} reached, stopping pair search", pairs.len());
                break 'outer;
            }

            pairs.push(CandidatePair {
                first: i,
                second: j,
                area_diff: metrics.area_diff,
                ratio: metrics.ratio,
                distance: metrics.distance,
            });
        }
    }

    pairs
}
