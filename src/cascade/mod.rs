pub mod model;
pub mod scan;
pub mod store;

use std::sync::Arc;

use image::{DynamicImage, GrayImage};
use log::{debug, info};

use crate::error::{GcpError, Result};
use crate::models::{Point, Rect};
use model::HaarCascade;
use scan::ScanParams;
use store::{ClassifierStore, ResourceSource};

/// A loaded detector that can scan a grayscale image at multiple scales
pub trait CascadeClassifier: Send + Sync {
    fn detect_multi_scale(&self, image: &GrayImage, params: &ScanParams) -> Vec<Rect>;
}

impl CascadeClassifier for HaarCascade {
    fn detect_multi_scale(&self, image: &GrayImage, params: &ScanParams) -> Vec<Rect> {
        HaarCascade::detect_multi_scale(self, image, params)
    }
}

/// Turns model bytes into a classifier
pub trait ClassifierFactory: Send + Sync {
    fn instantiate(&self, name: &str, bytes: &[u8]) -> Result<Box<dyn CascadeClassifier>>;
}

/// Parses OpenCV Haar cascade XML
#[derive(Debug, Clone, Copy, Default)]
pub struct HaarFactory;

impl ClassifierFactory for HaarFactory {
    fn instantiate(&self, name: &str, bytes: &[u8]) -> Result<Box<dyn CascadeClassifier>> {
        let cascade = HaarCascade::from_xml(bytes).map_err(|reason| GcpError::ModelParse {
            model: name.to_string(),
            reason,
        })?;
        Ok(Box::new(cascade))
    }
}

/// Tries each configured model in order and reports the center of the
/// first detection of the first model that finds anything
pub struct CascadeDetector<S, F = HaarFactory> {
    store: Arc<ClassifierStore<S>>,
    factory: F,
    pub params: ScanParams,
}

impl<S: ResourceSource> CascadeDetector<S, HaarFactory> {
    pub fn new(store: Arc<ClassifierStore<S>>) -> Self {
        Self {
            store,
            factory: HaarFactory,
            params: ScanParams::default(),
        }
    }
}

impl<S: ResourceSource, F: ClassifierFactory> CascadeDetector<S, F> {
    pub fn with_factory(store: Arc<ClassifierStore<S>>, factory: F) -> Self {
        Self {
            store,
            factory,
            params: ScanParams::default(),
        }
    }

    pub fn with_params(mut self, params: ScanParams) -> Self {
        self.params = params;
        self
    }

    pub fn store(&self) -> &Arc<ClassifierStore<S>> {
        &self.store
    }

    /// Detect a marker, loading the models on first use.
    ///
    /// `Ok(None)` means no model found anything; errors mean a model could
    /// not be fetched or parsed.
    pub async fn detect(&self, img: &DynamicImage) -> Result<Option<Point>> {
        self.store.ensure_loaded().await?;
        let gray = img.to_luma8();

        for name in self.store.model_names() {
            let bytes = self.store.model_bytes(name).await?;
            let classifier = self.factory.instantiate(name, &bytes)?;

            let rects = classifier.detect_multi_scale(&gray, &self.params);
            debug!("model '{}' produced {} detections", name, rects.len());

            if let Some(first) = rects.first() {
                let center = first.center();
                info!("model '{}' found a marker at ({:.1}, {:.1})", name, center.x, center.y);
                return Ok(Some(center));
            }
        }

        info!("no cascade model found a marker");
        Ok(None)
    }
}
