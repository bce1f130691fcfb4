#![allow(dead_code)]

mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from gcp_locator for tests
pub use gcp_locator::{
    CascadeDetector, ClassifierStore, ColorPairDetector, ColorPairParams, Detection, GcpError,
    GcpLocator, LoadState, MemorySource, Point, ScanParams, Strategy,
};
