use crate::models::{CandidatePair, Point};

/// Final marker points for the color-pair strategy.
///
/// With no verified pairs every centroid is a candidate on its own;
/// otherwise each verified pair contributes the rounded midpoint of its two
/// centroids, in verification order.
pub fn aggregate(verified: &[CandidatePair], centroids: &[Point]) -> Vec<Point> {
    if verified.is_empty() {
        return centroids.to_vec();
    }

    verified
        .iter()
        .map(|pair| centroids[pair.first].rounded_midpoint(&centroids[pair.second]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(first: usize, second: usize) -> CandidatePair {
        CandidatePair {
            first,
            second,
            area_diff: 0.0,
            ratio: 1.0,
            distance: 1.0,
        }
    }

    #[test]
    fn falls_back_to_every_centroid() {
        let centroids = vec![Point::new(1.0, 2.0), Point::new(30.0, 40.0), Point::new(5.0, 5.0)];
        assert_eq!(aggregate(&[], &centroids), centroids);
    }

    #[test]
    fn midpoints_round_half_up() {
        let centroids = vec![Point::new(10.0, 20.0), Point::new(13.0, 27.0), Point::new(40.0, 40.0)];
        let out = aggregate(&[pair(0, 1), pair(1, 2)], &centroids);
        assert_eq!(out, vec![Point::new(12.0, 24.0), Point::new(27.0, 34.0)]);
    }

    #[test]
    fn empty_input_is_empty() {
        assert!(aggregate(&[], &[]).is_empty());
    }
}
