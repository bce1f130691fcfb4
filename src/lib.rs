pub mod cascade;
pub mod config;
pub mod detection;
pub mod error;
pub mod models;
pub mod pipeline;

pub use cascade::scan::ScanParams;
pub use cascade::store::{ClassifierStore, DirectorySource, LoadState, MemorySource, ResourceSource};
pub use cascade::{CascadeClassifier, CascadeDetector, ClassifierFactory, HaarFactory};
pub use config::GcpConfig;
pub use detection::{ColorPairAnalysis, ColorPairDetector, ColorPairParams};
pub use error::GcpError;
pub use models::{CandidatePair, Contour, Moments, Point, Rect, Region};
pub use pipeline::{DebugConfig, Detection, GcpLocator, Strategy};
