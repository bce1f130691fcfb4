use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{DynamicImage, GrayImage};
use log::debug;
use serde::{Deserialize, Serialize};

use crate::cascade::store::{ClassifierStore, ResourceSource};
use crate::cascade::{CascadeDetector, ClassifierFactory, HaarFactory};
use crate::detection::ColorPairDetector;
use crate::error::{GcpError, Result};
use crate::models::Point;

/// Which detection strategy a locator runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// White-blob segmentation, geometric pairing and dark-border verification
    #[default]
    ColorPair,
    /// Multi-scale Haar cascade scan over an ordered list of models
    Cascade,
}

/// Outcome of a successful detection run
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    Found(Vec<Point>),
    NotFound,
}

impl Detection {
    pub fn points(&self) -> &[Point] {
        match self {
            Detection::Found(points) => points,
            Detection::NotFound => &[],
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Detection::Found(_))
    }
}

impl From<Option<Vec<Point>>> for Detection {
    fn from(points: Option<Vec<Point>>) -> Self {
        match points {
            Some(points) if !points.is_empty() => Detection::Found(points),
            _ => Detection::NotFound,
        }
    }
}

/// Debug configuration for detection runs
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
}

impl DebugConfig {
    /// The directory must be empty or non-existent
    pub fn new(output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(GcpError::Io(std::io::Error::other(format!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ))));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        Ok(Self { output_dir })
    }

    pub fn path(&self, filename: &str) -> PathBuf {
        self.output_dir.join(filename)
    }

    pub fn save_mask(&self, filename: &str, mask: &GrayImage) -> Result<()> {
        let path = self.path(filename);
        mask.save(&path)?;
        debug!("saved {}", path.display());
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.output_dir
    }
}

/// Front over both strategies
pub struct GcpLocator<S, F = HaarFactory> {
    pub strategy: Strategy,
    pub color: ColorPairDetector,
    cascade: Option<CascadeDetector<S, F>>,
    debug: Option<DebugConfig>,
}

impl<S: ResourceSource> GcpLocator<S, HaarFactory> {
    /// Locator with both strategies available
    pub fn new(strategy: Strategy, color: ColorPairDetector, store: Arc<ClassifierStore<S>>) -> Self {
        Self::with_cascade(strategy, color, CascadeDetector::new(store))
    }
}

impl<S: ResourceSource, F: ClassifierFactory> GcpLocator<S, F> {
    pub fn with_cascade(
        strategy: Strategy,
        color: ColorPairDetector,
        cascade: CascadeDetector<S, F>,
    ) -> Self {
        Self {
            strategy,
            color,
            cascade: Some(cascade),
            debug: None,
        }
    }

    /// Locator limited to the color-pair strategy
    pub fn color_only(color: ColorPairDetector) -> Self {
        Self {
            strategy: Strategy::ColorPair,
            color,
            cascade: None,
            debug: None,
        }
    }

    pub fn with_debug(mut self, debug: DebugConfig) -> Self {
        self.debug = Some(debug);
        self
    }

    pub fn cascade(&self) -> Option<&CascadeDetector<S, F>> {
        self.cascade.as_ref()
    }

    pub fn cascade_mut(&mut self) -> Option<&mut CascadeDetector<S, F>> {
        self.cascade.as_mut()
    }

    /// Run the configured strategy on a decoded image
    pub async fn locate(&self, img: &DynamicImage) -> Result<Detection> {
        match self.strategy {
            Strategy::ColorPair => {
                let analysis = self.color.analyze(img);
                if let Some(debug) = &self.debug {
                    analysis.save_debug(debug)?;
                }
                Ok(analysis.into_points().into())
            }
            Strategy::Cascade => {
                let cascade = self.cascade.as_ref().ok_or(GcpError::CascadeUnavailable)?;
                let point = cascade.detect(img).await?;
                Ok(point.map(|p| vec![p]).into())
            }
        }
    }
}
