pub mod segmentation;
pub mod contours;
pub mod pairing;
pub mod verification;
pub mod aggregate;

use image::{DynamicImage, GrayImage};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{CandidatePair, Point, Region};
use crate::pipeline::DebugConfig;
use segmentation::HsvRange;

/// Thresholds for the color segmentation + pairing strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorPairParams {
    pub white: HsvRange,
    pub black: HsvRange,
    /// Regions must enclose strictly more than this many pixels
    pub min_area: f64,
    pub max_area_diff: f64,
    pub min_ratio: f64,
    pub max_ratio: f64,
    pub max_distance: f64,
    pub outline_thickness: u32,
    /// Verified pairs need strictly more dark pixels than this under their outlines
    pub min_black_pixels: usize,
    /// Stop the pair search after this many accepted pairs. Unbounded when `None`.
    pub max_pairs: Option<usize>,
}

impl ColorPairParams {
    pub fn new() -> Self {
        Self {
            white: HsvRange::WHITE,
            black: HsvRange::BLACK,
            min_area: 100.0,
            max_area_diff: 500.0,
            min_ratio: 0.3,
            max_ratio: 3.0,
            max_distance: 60.0,
            outline_thickness: 5,
            min_black_pixels: 5,
            max_pairs: None,
        }
    }

    pub fn with_max_pairs(mut self, max_pairs: usize) -> Self {
        self.max_pairs = Some(max_pairs);
        self
    }
}

impl Default for ColorPairParams {
    fn default() -> Self {
        Self::new()
    }
}

/// Every intermediate product of one color-pair run
#[derive(Debug, Clone)]
pub struct ColorPairAnalysis {
    pub white_mask: GrayImage,
    pub black_mask: GrayImage,
    pub regions: Vec<Region>,
    pub candidates: Vec<CandidatePair>,
    pub verified: Vec<CandidatePair>,
    pub points: Vec<Point>,
    outline_thickness: u32,
}

impl ColorPairAnalysis {
    pub fn centroids(&self) -> Vec<Point> {
        self.regions.iter().map(|r| r.centroid).collect()
    }

    /// True when the points came from verified pairs rather than the per-region fallback
    pub fn used_pairs(&self) -> bool {
        !self.verified.is_empty()
    }

    /// `None` when nothing qualified
    pub fn into_points(self) -> Option<Vec<Point>> {
        if self.points.is_empty() { None } else { Some(self.points) }
    }

    /// Write the masks and per-candidate overlap masks into the debug directory
    pub fn save_debug(&self, debug: &DebugConfig) -> Result<()> {
        debug.save_mask("white_mask.png", &self.white_mask)?;
        debug.save_mask("black_mask.png", &self.black_mask)?;

        for (idx, pair) in self.candidates.iter().enumerate() {
            let drawn = verification::draw_pair_outline(
                &self.regions,
                pair,
                self.black_mask.dimensions(),
                self.outline_thickness,
            );
            let overlap = verification::black_overlap(&drawn, &self.black_mask);
            debug.save_mask(&format!("pair_{:02}_overlap.png", idx + 1), &overlap)?;
        }

        Ok(())
    }
}

/// Locates markers by pairing similar white blobs that are framed by dark pixels
#[derive(Debug, Clone, Default)]
pub struct ColorPairDetector {
    pub params: ColorPairParams,
}

impl ColorPairDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(params: ColorPairParams) -> Self {
        Self { params }
    }

    /// Run the full strategy, returning `None` when no marker candidate exists
    pub fn detect(&self, img: &DynamicImage) -> Option<Vec<Point>> {
        self.analyze(img).into_points()
    }

    /// Run the strategy and keep every intermediate result
    pub fn analyze(&self, img: &DynamicImage) -> ColorPairAnalysis {
        let params = &self.params;

        let (white_mask, black_mask) =
            segmentation::segment_markers(img, &params.white, &params.black);

        let regions = contours::extract_regions(&white_mask, params.min_area);
        debug!("found {} white regions above {} px", regions.len(), params.min_area);

        let candidates = pairing::match_pairs(&regions, params);
        debug!("{} candidate pairs", candidates.len());

        let verified = verification::verify_pairs(
            &regions,
            &candidates,
            &black_mask,
            params.outline_thickness,
            params.min_black_pixels,
        );
        debug!("{} pairs verified against the black mask", verified.len());

        let centroids: Vec<Point> = regions.iter().map(|r| r.centroid).collect();
        let points = aggregate::aggregate(&verified, &centroids);

        if verified.is_empty() && !points.is_empty() {
            info!("no verified pairs, using {} individual regions", points.len());
        }
        info!("color-pair detection found {} points", points.len());

        ColorPairAnalysis {
            white_mask,
            black_mask,
            regions,
            candidates,
            verified,
            points,
            outline_thickness: params.outline_thickness,
        }
    }

    /// Regions that pass the area filter (for debugging)
    pub fn get_regions(&self, img: &DynamicImage) -> Vec<Region> {
        let (white_mask, _) =
            segmentation::segment_markers(img, &self.params.white, &self.params.black);
        contours::extract_regions(&white_mask, self.params.min_area)
    }
}
