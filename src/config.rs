use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::cascade::scan::ScanParams;
use crate::detection::ColorPairParams;
use crate::pipeline::Strategy;

pub const DEFAULT_MODELS: [&str; 2] = ["gcp_cascade.xml", "gcp_cascade_alt.xml"];
pub const DEFAULT_MODELS_DIR: &str = "models";

/// Complete locator configuration, loadable from JSON.
/// Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GcpConfig {
    pub strategy: Strategy,
    pub color: ColorPairParams,
    pub scan: ScanParams,
    /// Cascade models, tried in this order
    pub models: Vec<String>,
    pub models_dir: PathBuf,
}

impl Default for GcpConfig {
    fn default() -> Self {
        Self {
            strategy: Strategy::default(),
            color: ColorPairParams::default(),
            scan: ScanParams::default(),
            models: DEFAULT_MODELS.iter().map(|s| s.to_string()).collect(),
            models_dir: PathBuf::from(DEFAULT_MODELS_DIR),
        }
    }
}

impl GcpConfig {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("Failed to parse locator configuration")
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        Self::from_json_str(&json)
    }
}
