use imageproc::point::Point as PixelPoint;
use serde::{Deserialize, Serialize};

/// A marker location in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Midpoint of two points, rounded to the nearest pixel
    pub fn rounded_midpoint(&self, other: &Point) -> Point {
        Point {
            x: ((self.x + other.x) / 2.0).round(),
            y: ((self.y + other.y) / 2.0).round(),
        }
    }
}

/// Zeroth and first order polygon moments
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
}

impl Moments {
    /// Centroid rounded to the nearest integer pixel, `None` when `m00` is zero
    pub fn centroid(&self) -> Option<Point> {
        if self.m00 == 0.0 {
            return None;
        }
        Some(Point {
            x: (self.m10 / self.m00).round(),
            y: (self.m01 / self.m00).round(),
        })
    }
}

/// Traced outer boundary of a connected foreground region
#[derive(Debug, Clone)]
pub struct Contour {
    pub points: Vec<PixelPoint<i32>>,
    pub area: f64,
    pub moments: Moments,
}

impl Contour {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// A contour that survived the area filter, with its centroid
#[derive(Debug, Clone)]
pub struct Region {
    pub contour: Contour,
    pub centroid: Point,
}

impl Region {
    pub fn area(&self) -> f64 {
        self.contour.area
    }
}

/// Two regions considered jointly as the halves of one marker.
///
/// `first` and `second` index into the region list they were matched from,
/// with `first < second`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidatePair {
    pub first: usize,
    pub second: usize,
    pub area_diff: f64,
    pub ratio: f64,
    pub distance: f64,
}

/// Axis-aligned box produced by the classifier scan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Self {
        Self { x, y, width, height }
    }

    pub fn center(&self) -> Point {
        Point {
            x: self.x as f64 + self.width as f64 / 2.0,
            y: self.y as f64 + self.height as f64 / 2.0,
        }
    }

    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }
}
