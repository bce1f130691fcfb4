use image::{imageops, GrayImage};
use imageproc::contours::{find_contours, BorderType};
use imageproc::point::Point as PixelPoint;
use log::trace;

use crate::models::{Contour, Moments, Region};

/// Polygon moments of a closed boundary via Green's theorem.
///
/// The sign is normalized so `m00` is the non-negative enclosed area
/// regardless of traversal direction.
pub fn moments(points: &[PixelPoint<i32>]) -> Moments {
    if points.len() < 3 {
        return Moments::default();
    }

    let mut m00 = 0.0;
    let mut m10 = 0.0;
    let mut m01 = 0.0;
    for (i, p) in points.iter().enumerate() {
        let q = &points[(i + 1) % points.len()];
        let (x0, y0) = (p.x as f64, p.y as f64);
        let (x1, y1) = (q.x as f64, q.y as f64);
        let cross = x0 * y1 - x1 * y0;
        m00 += cross;
        m10 += (x0 + x1) * cross;
        m01 += (y0 + y1) * cross;
    }

    let sign = if m00 < 0.0 { -1.0 } else { 1.0 };
    Moments {
        m00: sign * m00 / 2.0,
        m10: sign * m10 / 6.0,
        m01: sign * m01 / 6.0,
    }
}

/// Area enclosed by the boundary polygon through the pixel centers
pub fn contour_area(points: &[PixelPoint<i32>]) -> f64 {
    moments(points).m00
}

/// Trace the outermost boundaries of the mask's foreground regions, in discovery order.
///
/// The mask is traced inside a one-pixel background frame so regions
/// touching the image border are still reported as outer borders.
pub fn trace_contours(mask: &GrayImage) -> Vec<Contour> {
    let (width, height) = mask.dimensions();
    let mut framed = GrayImage::new(width + 2, height + 2);
    imageops::replace(&mut framed, mask, 1, 1);

    find_contours::<i32>(&framed)
        .into_iter()
        .filter(|c| matches!(c.border_type, BorderType::Outer) && c.parent.is_none())
        .map(|c| {
            let points: Vec<_> = c
                .points
                .into_iter()
                .map(|p| PixelPoint::new(p.x - 1, p.y - 1))
                .collect();
            let moments = moments(&points);
            Contour {
                points,
                area: moments.m00,
                moments,
            }
        })
        .collect()
}

/// Keep regions whose area is strictly greater than `min_area` and whose
/// centroid is defined. Discovery order is preserved.
pub fn extract_regions(mask: &GrayImage, min_area: f64) -> Vec<Region> {
    trace_contours(mask)
        .into_iter()
        .filter(|c| c.area > min_area)
        .filter_map(|contour| match contour.moments.centroid() {
            Some(centroid) => Some(Region { contour, centroid }),
            None => {
                trace!("skipping degenerate region with {} boundary points", contour.len());
                None
            }
        })
        .collect()
}
