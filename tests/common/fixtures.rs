use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use gcp_locator::{
    CascadeClassifier, ClassifierFactory, HaarFactory, MemorySource, ResourceSource,
};
use image::{DynamicImage, Rgb, RgbImage};

/// Neither white nor black under the default HSV ranges
pub const BACKGROUND: Rgb<u8> = Rgb([150, 150, 150]);
pub const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
pub const BLACK: Rgb<u8> = Rgb([0, 0, 0]);

pub fn canvas(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, BACKGROUND)
}

pub fn fill_rect(img: &mut RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) {
    for yy in y..y + h {
        for xx in x..x + w {
            img.put_pixel(xx, yy, color);
        }
    }
}

/// White `size`x`size` square at `(x, y)`, optionally framed by a black border
pub fn white_square(img: &mut RgbImage, x: u32, y: u32, size: u32, border: u32) {
    if border > 0 {
        fill_rect(img, x - border, y - border, size + 2 * border, size + 2 * border, BLACK);
    }
    fill_rect(img, x, y, size, size, WHITE);
}

/// Two framed 12x12 squares, 40 px apart center to center (dx 24, dy 32).
/// Centroids round to (46, 46) and (70, 78).
pub fn framed_marker_image() -> DynamicImage {
    let mut img = canvas(120, 120);
    white_square(&mut img, 40, 40, 12, 2);
    white_square(&mut img, 64, 72, 12, 2);
    DynamicImage::ImageRgb8(img)
}

/// The same two squares without any dark pixels around them
pub fn unframed_pair_image() -> DynamicImage {
    let mut img = canvas(120, 120);
    white_square(&mut img, 40, 40, 12, 0);
    white_square(&mut img, 64, 72, 12, 0);
    DynamicImage::ImageRgb8(img)
}

/// One 21x21 white blob (area 400, centroid (110, 110)) and nothing dark
pub fn isolated_blob_image() -> DynamicImage {
    let mut img = canvas(160, 160);
    fill_rect(&mut img, 100, 100, 21, 21, WHITE);
    DynamicImage::ImageRgb8(img)
}

pub fn blank_image() -> DynamicImage {
    DynamicImage::ImageRgb8(canvas(120, 120))
}

/// Dark upper half over a bright lower half
pub fn edge_image() -> DynamicImage {
    let img = RgbImage::from_fn(120, 120, |_, y| if y < 60 { BLACK } else { WHITE });
    DynamicImage::ImageRgb8(img)
}

fn stump_cascade(node_threshold: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<opencv_storage>
<cascade>
  <stageType>BOOST</stageType>
  <featureType>HAAR</featureType>
  <height>24</height>
  <width>24</width>
  <stageParams>
    <boostType>GAB</boostType>
    <minHitRate>9.9500000476837158e-01</minHitRate>
    <maxFalseAlarm>5.0000000000000000e-01</maxFalseAlarm>
    <weightTrimRate>9.4999999999999996e-01</weightTrimRate>
    <maxDepth>1</maxDepth>
    <maxWeakCount>100</maxWeakCount></stageParams>
  <featureParams>
    <maxCatCount>0</maxCatCount>
    <featureSize>1</featureSize>
    <mode>BASIC</mode></featureParams>
  <stageNum>1</stageNum>
  <stages>
    <!-- stage 0 -->
    <_>
      <maxWeakCount>1</maxWeakCount>
      <stageThreshold>0.</stageThreshold>
      <weakClassifiers>
        <_>
          <internalNodes>
            0 -1 0 {node_threshold}</internalNodes>
          <leafValues>
            1. -1.</leafValues></_></weakClassifiers></_></stages>
  <features>
    <_>
      <rects>
        <_>
          0 0 24 24 -1.</_>
        <_>
          0 0 24 12 2.</_></rects></_></features></cascade>
</opencv_storage>
"#
    )
}

/// Fires on windows whose upper half is darker than the lower half
pub fn edge_cascade_xml() -> String {
    stump_cascade("-5.0000000000000003e-02")
}

/// Never accepts a window
pub fn silent_cascade_xml() -> String {
    stump_cascade("-1.0e+09")
}

/// Memory source holding the given `(name, xml)` models
pub fn memory_source(models: &[(&str, String)]) -> MemorySource {
    models
        .iter()
        .fold(MemorySource::new(), |src, (name, xml)| src.with_model(*name, xml.as_bytes()))
}

/// Wraps a memory source, counting fetches and optionally failing the first one
pub struct CountingSource {
    inner: MemorySource,
    pub fetches: Arc<AtomicUsize>,
    fail_next: AtomicBool,
}

impl CountingSource {
    pub fn new(inner: MemorySource) -> Self {
        Self {
            inner,
            fetches: Arc::new(AtomicUsize::new(0)),
            fail_next: AtomicBool::new(false),
        }
    }

    pub fn failing_once(inner: MemorySource) -> Self {
        let source = Self::new(inner);
        source.fail_next.store(true, Ordering::SeqCst);
        source
    }
}

impl ResourceSource for CountingSource {
    async fn fetch(&self, name: &str) -> anyhow::Result<Vec<u8>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        if self.fail_next.swap(false, Ordering::SeqCst) {
            anyhow::bail!("transient failure fetching {}", name);
        }
        self.inner.fetch(name).await
    }
}

/// Haar factory that records which models were instantiated
#[derive(Default)]
pub struct CountingFactory {
    pub instantiated: Arc<std::sync::Mutex<Vec<String>>>,
}

impl ClassifierFactory for CountingFactory {
    fn instantiate(
        &self,
        name: &str,
        bytes: &[u8],
    ) -> gcp_locator::error::Result<Box<dyn CascadeClassifier>> {
        self.instantiated.lock().unwrap().push(name.to_string());
        HaarFactory.instantiate(name, bytes)
    }
}
