use image::imageops::{self, FilterType};
use image::{GrayImage, ImageBuffer, Luma};
use imageproc::integral_image::{integral_image, integral_squared_image};
use log::{trace, warn};
use serde::{Deserialize, Serialize};

use crate::cascade::model::{HaarCascade, HaarFeature};
use crate::models::Rect;

/// Multi-scale sliding window parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanParams {
    pub scale_factor: f64,
    /// Clusters need strictly more raw hits than this to be reported
    pub min_neighbors: usize,
    pub min_size: (u32, u32),
    pub max_size: Option<(u32, u32)>,
    /// Relative tolerance used when clustering raw hits
    pub group_eps: f64,
}

impl ScanParams {
    pub fn new() -> Self {
        Self {
            scale_factor: 1.1,
            min_neighbors: 5,
            min_size: (30, 30),
            max_size: None,
            group_eps: 0.2,
        }
    }

    pub fn with_min_neighbors(mut self, min_neighbors: usize) -> Self {
        self.min_neighbors = min_neighbors;
        self
    }

    pub fn with_max_size(mut self, width: u32, height: u32) -> Self {
        self.max_size = Some((width, height));
        self
    }
}

impl Default for ScanParams {
    fn default() -> Self {
        Self::new()
    }
}

type Integral = ImageBuffer<Luma<u64>, Vec<u64>>;

/// Summed-area tables of one scaled image
struct IntegralImages {
    sum: Integral,
    sqsum: Integral,
}

impl IntegralImages {
    fn new(gray: &GrayImage) -> Self {
        Self {
            sum: integral_image::<_, u64>(gray),
            sqsum: integral_squared_image::<_, u64>(gray),
        }
    }

    fn area_sum(table: &Integral, x: u32, y: u32, w: u32, h: u32) -> f64 {
        let a = table.get_pixel(x, y)[0];
        let b = table.get_pixel(x + w, y)[0];
        let c = table.get_pixel(x, y + h)[0];
        let d = table.get_pixel(x + w, y + h)[0];
        (d + a) as f64 - (b + c) as f64
    }

    fn sum(&self, x: u32, y: u32, w: u32, h: u32) -> f64 {
        Self::area_sum(&self.sum, x, y, w, h)
    }

    fn sqsum(&self, x: u32, y: u32, w: u32, h: u32) -> f64 {
        Self::area_sum(&self.sqsum, x, y, w, h)
    }
}

impl HaarCascade {
    fn feature_value(&self, feature: &HaarFeature, ii: &IntegralImages, x: u32, y: u32) -> f64 {
        feature
            .rects
            .iter()
            .map(|r| {
                r.weight
                    * ii.sum(
                        x + r.x as u32,
                        y + r.y as u32,
                        r.width as u32,
                        r.height as u32,
                    )
            })
            .sum()
    }

    /// Run every stage on the window whose top-left corner is `(x, y)`
    fn accepts_window(&self, ii: &IntegralImages, x: u32, y: u32) -> bool {
        // variance normalization over the window inset by one pixel
        let (nw, nh) = (self.width - 2, self.height - 2);
        let area = (nw * nh) as f64;
        let sum = ii.sum(x + 1, y + 1, nw, nh);
        let sqsum = ii.sqsum(x + 1, y + 1, nw, nh);
        let nf = area * sqsum - sum * sum;
        let nf = if nf > 0.0 { nf.sqrt() } else { 1.0 };

        for stage in &self.stages {
            let mut total = 0.0;
            for weak in &stage.classifiers {
                let mut idx = 0i32;
                loop {
                    let node = &weak.nodes[idx as usize];
                    let value = self.feature_value(&self.features[node.feature], ii, x, y) / nf;
                    idx = if value < node.threshold { node.left } else { node.right };
                    if idx <= 0 {
                        break;
                    }
                }
                total += weak.leaves[(-idx) as usize];
            }
            if total < stage.threshold {
                return false;
            }
        }

        true
    }

    /// Raw, ungrouped hits over all scales in scan order
    pub fn scan(&self, gray: &GrayImage, params: &ScanParams) -> Vec<Rect> {
        let mut hits = Vec::new();
        if params.scale_factor <= 1.0 {
            warn!("scale factor {} does not grow the window, skipping scan", params.scale_factor);
            return hits;
        }

        let (img_w, img_h) = gray.dimensions();
        let mut factor = 1.0f64;

        loop {
            let win_w = (self.width as f64 * factor).round() as u32;
            let win_h = (self.height as f64 * factor).round() as u32;
            let scaled_w = (img_w as f64 / factor).round() as u32;
            let scaled_h = (img_h as f64 / factor).round() as u32;

            if scaled_w < self.width || scaled_h < self.height {
                break;
            }
            if params.max_size.is_some_and(|(mw, mh)| win_w > mw || win_h > mh) {
                break;
            }

            if win_w >= params.min_size.0 && win_h >= params.min_size.1 {
                let scaled = if (scaled_w, scaled_h) == (img_w, img_h) {
                    gray.clone()
                } else {
                    imageops::resize(gray, scaled_w, scaled_h, FilterType::Triangle)
                };
                let ii = IntegralImages::new(&scaled);
                let step = if factor > 2.0 { 1 } else { 2 };
                let before = hits.len();

                for y in (0..=scaled_h - self.height).step_by(step) {
                    for x in (0..=scaled_w - self.width).step_by(step) {
                        if self.accepts_window(&ii, x, y) {
                            hits.push(Rect::new(
                                (x as f64 * factor).round() as i32,
                                (y as f64 * factor).round() as i32,
                                win_w as i32,
                                win_h as i32,
                            ));
                        }
                    }
                }
                trace!("scale {:.3}: window {}x{}, {} hits", factor, win_w, win_h, hits.len() - before);
            }

            factor *= params.scale_factor;
        }

        hits
    }

    /// Scan at every scale and merge the raw hits into grouped detections
    pub fn detect_multi_scale(&self, gray: &GrayImage, params: &ScanParams) -> Vec<Rect> {
        let hits = self.scan(gray, params);
        group_rectangles(&hits, params.min_neighbors, params.group_eps)
    }
}

fn similar(a: &Rect, b: &Rect, eps: f64) -> bool {
    let delta = eps * (a.width.min(b.width) + a.height.min(b.height)) as f64 * 0.5;
    (a.x - b.x).abs() as f64 <= delta
        && (a.y - b.y).abs() as f64 <= delta
        && (a.right() - b.right()).abs() as f64 <= delta
        && (a.bottom() - b.bottom()).abs() as f64 <= delta
}

fn find_root(parent: &mut [usize], mut i: usize) -> usize {
    while parent[i] != i {
        parent[i] = parent[parent[i]];
        i = parent[i];
    }
    i
}

/// Cluster similar rectangles and average each cluster.
///
/// Clusters with `group_threshold` or fewer members are dropped, as are
/// clusters sitting inside a stronger one. With a zero threshold the input
/// is returned as is. Output follows the order in which clusters are first
/// met in `rects`.
pub fn group_rectangles(rects: &[Rect], group_threshold: usize, eps: f64) -> Vec<Rect> {
    if group_threshold == 0 || rects.is_empty() {
        return rects.to_vec();
    }

    let n = rects.len();
    let mut parent: Vec<usize> = (0..n).collect();
    for i in 0..n {
        for j in (i + 1)..n {
            if similar(&rects[i], &rects[j], eps) {
                let (ri, rj) = (find_root(&mut parent, i), find_root(&mut parent, j));
                if ri != rj {
                    parent[rj.max(ri)] = ri.min(rj);
                }
            }
        }
    }

    let mut label_of_root = vec![usize::MAX; n];
    let mut sums: Vec<[i64; 4]> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    for (i, r) in rects.iter().enumerate() {
        let root = find_root(&mut parent, i);
        if label_of_root[root] == usize::MAX {
            label_of_root[root] = sums.len();
            sums.push([0; 4]);
            counts.push(0);
        }
        let label = label_of_root[root];
        sums[label][0] += r.x as i64;
        sums[label][1] += r.y as i64;
        sums[label][2] += r.width as i64;
        sums[label][3] += r.height as i64;
        counts[label] += 1;
    }

    let averaged: Vec<Rect> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &c)| {
            let avg = |v: i64| (v as f64 / c as f64).round() as i32;
            Rect::new(avg(s[0]), avg(s[1]), avg(s[2]), avg(s[3]))
        })
        .collect();

    let mut grouped = Vec::new();
    for (i, r1) in averaged.iter().enumerate() {
        let n1 = counts[i];
        if n1 <= group_threshold {
            continue;
        }

        let swallowed = averaged.iter().enumerate().any(|(j, r2)| {
            let n2 = counts[j];
            if j == i || n2 <= group_threshold {
                return false;
            }
            let dx = (r2.width as f64 * eps).round() as i32;
            let dy = (r2.height as f64 * eps).round() as i32;
            r1.x >= r2.x - dx
                && r1.y >= r2.y - dy
                && r1.right() <= r2.right() + dx
                && r1.bottom() <= r2.bottom() + dy
                && (n2 > n1.max(3) || n1 < 3)
        });

        if !swallowed {
            grouped.push(*r1);
        }
    }

    grouped
}
