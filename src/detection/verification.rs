use image::{GrayImage, Luma};
use imageproc::drawing::{draw_filled_circle_mut, BresenhamLineIter};

use crate::models::{CandidatePair, Contour, Region};

/// Stroke a closed contour outline onto `mask` with the given line thickness
pub fn draw_contour_outline(mask: &mut GrayImage, contour: &Contour, thickness: u32) {
    let radius = (thickness / 2) as i32;
    let points = &contour.points;

    if points.len() == 1 {
        draw_filled_circle_mut(mask, (points[0].x, points[0].y), radius, Luma([255]));
        return;
    }

    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        let line = BresenhamLineIter::new((p.x as f32, p.y as f32), (q.x as f32, q.y as f32));
        for (x, y) in line {
            draw_filled_circle_mut(mask, (x, y), radius, Luma([255]));
        }
    }
}

/// Fresh mask of the source size with both outlines of `pair` drawn in
pub fn draw_pair_outline(
    regions: &[Region],
    pair: &CandidatePair,
    (width, height): (u32, u32),
    thickness: u32,
) -> GrayImage {
    let mut mask = GrayImage::new(width, height);
    draw_contour_outline(&mut mask, &regions[pair.first].contour, thickness);
    draw_contour_outline(&mut mask, &regions[pair.second].contour, thickness);
    mask
}

/// Pixel-wise AND of two masks of equal size
pub fn black_overlap(drawn: &GrayImage, black: &GrayImage) -> GrayImage {
    let (width, height) = drawn.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        let set = drawn.get_pixel(x, y)[0] > 0 && black.get_pixel(x, y)[0] > 0;
        Luma([if set { 255 } else { 0 }])
    })
}

pub fn count_nonzero(mask: &GrayImage) -> usize {
    mask.pixels().filter(|p| p[0] > 0).count()
}

/// Keep the pairs whose outlines cover more than `min_black_pixels` dark
/// pixels. Surviving pairs keep their input order.
pub fn verify_pairs(
    regions: &[Region],
    pairs: &[CandidatePair],
    black_mask: &GrayImage,
    thickness: u32,
    min_black_pixels: usize,
) -> Vec<CandidatePair> {
    pairs
        .iter()
        .filter(|pair| {
            let drawn = draw_pair_outline(regions, pair, black_mask.dimensions(), thickness);
            count_nonzero(&black_overlap(&drawn, black_mask)) > min_black_pixels
        })
        .copied()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Moments, Point};
    use imageproc::point::Point as PixelPoint;

    fn square_region(x: i32, y: i32, side: i32) -> Region {
        let points = vec![
            PixelPoint::new(x, y),
            PixelPoint::new(x + side, y),
            PixelPoint::new(x + side, y + side),
            PixelPoint::new(x, y + side),
        ];
        Region {
            contour: Contour {
                points,
                area: (side * side) as f64,
                moments: Moments::default(),
            },
            centroid: Point::new((x + side / 2) as f64, (y + side / 2) as f64),
        }
    }

    fn pair() -> CandidatePair {
        CandidatePair {
            first: 0,
            second: 1,
            area_diff: 0.0,
            ratio: 1.0,
            distance: 28.3,
        }
    }

    #[test]
    fn outline_is_thick_and_closed() {
        let region = square_region(10, 10, 10);
        let mut mask = GrayImage::new(40, 40);
        draw_contour_outline(&mut mask, &region.contour, 5);

        // closing edge and its thickness
        assert_eq!(mask.get_pixel(10, 15)[0], 255);
        assert_eq!(mask.get_pixel(8, 15)[0], 255);
        // interior stays empty
        assert_eq!(mask.get_pixel(15, 15)[0], 0);
    }

    #[test]
    fn black_pixel_threshold_is_strict() {
        let regions = vec![square_region(10, 10, 10), square_region(30, 30, 10)];
        let mut black = GrayImage::new(60, 60);
        for x in 11..16 {
            black.put_pixel(x, 10, Luma([255]));
        }

        assert!(verify_pairs(&regions, &[pair()], &black, 5, 5).is_empty());
        assert_eq!(verify_pairs(&regions, &[pair()], &black, 5, 4), vec![pair()]);
    }

    #[test]
    fn no_dark_pixels_means_no_verified_pairs() {
        let regions = vec![square_region(10, 10, 10), square_region(30, 30, 10)];
        let black = GrayImage::new(60, 60);
        assert!(verify_pairs(&regions, &[pair()], &black, 5, 0).is_empty());
    }
}
