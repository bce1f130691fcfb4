use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use serde::{Deserialize, Serialize};

/// Three-channel image holding 8-bit hue (0..=180), saturation and value
pub type HsvImage = ImageBuffer<Rgb<u8>, Vec<u8>>;

/// Inclusive per-channel HSV bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    /// Bright, unsaturated pixels
    pub const WHITE: HsvRange = HsvRange::new([0, 0, 170], [180, 100, 255]);

    /// Dark pixels of any hue or saturation
    pub const BLACK: HsvRange = HsvRange::new([0, 0, 0], [180, 255, 130]);

    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|c| self.lower[c] <= hsv[c] && hsv[c] <= self.upper[c])
    }
}

/// Convert one 8-bit RGB pixel to OpenCV-style 8-bit HSV (hue halved into 0..=180)
pub fn rgb_to_hsv(rgb: [u8; 3]) -> [u8; 3] {
    let [r, g, b] = rgb.map(f32::from);
    let v = r.max(g).max(b);
    let min = r.min(g).min(b);
    let diff = v - min;

    let s = if v == 0.0 { 0.0 } else { 255.0 * diff / v };

    let degrees = if diff == 0.0 {
        0.0
    } else if v == r {
        60.0 * (g - b) / diff
    } else if v == g {
        120.0 + 60.0 * (b - r) / diff
    } else {
        240.0 + 60.0 * (r - g) / diff
    };
    // round in half-degree units first; only hues still negative wrap
    let mut h = (degrees / 2.0 + 0.5).floor();
    if h < 0.0 {
        h += 180.0;
    }

    [h as u8, s.round() as u8, v as u8]
}

pub fn to_hsv(img: &RgbImage) -> HsvImage {
    let (width, height) = img.dimensions();
    ImageBuffer::from_fn(width, height, |x, y| Rgb(rgb_to_hsv(img.get_pixel(x, y).0)))
}

/// Binary mask (255 = set) of pixels whose HSV triple lies inside `range`
pub fn segment(hsv: &HsvImage, range: &HsvRange) -> GrayImage {
    let (width, height) = hsv.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        if range.contains(hsv.get_pixel(x, y).0) {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Produce the white and black masks for a color image
pub fn segment_markers(
    img: &DynamicImage,
    white: &HsvRange,
    black: &HsvRange,
) -> (GrayImage, GrayImage) {
    let hsv = to_hsv(&img.to_rgb8());
    (segment(&hsv, white), segment(&hsv, black))
}
