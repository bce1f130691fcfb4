use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use log::{debug, info, warn};
use tokio::sync::RwLock;

use crate::error::{GcpError, Result};

/// Byte source for classifier models, keyed by model name
pub trait ResourceSource: Send + Sync {
    fn fetch(&self, name: &str) -> impl Future<Output = anyhow::Result<Vec<u8>>> + Send;
}

/// Reads models from `<root>/<name>`
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }
}

impl ResourceSource for DirectorySource {
    async fn fetch(&self, name: &str) -> anyhow::Result<Vec<u8>> {
        let path = self.path_for(name);
        tokio::fs::read(&path)
            .await
            .with_context(|| format!("Failed to read classifier model {:?}", path))
    }
}

/// Models held in memory, e.g. bundled with the binary
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    models: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.models.insert(name.into(), bytes.into());
        self
    }
}

impl ResourceSource for MemorySource {
    async fn fetch(&self, name: &str) -> anyhow::Result<Vec<u8>> {
        self.models
            .get(name)
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("no model named '{}' in memory source", name))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    NotLoaded,
    Loading,
    Loaded,
    /// The last attempt failed; the next `ensure_loaded` starts over
    Failed,
}

#[derive(Debug)]
struct StoreState {
    phase: LoadState,
    models: HashMap<String, Arc<[u8]>>,
}

/// Process-lifetime cache of the configured classifier models.
///
/// Loading happens once, in list order, under a write lock so concurrent
/// first callers wait for a single fetch. Once `Loaded` the models are
/// read-only and never evicted.
pub struct ClassifierStore<S> {
    source: S,
    names: Vec<String>,
    state: RwLock<StoreState>,
}

impl<S> std::fmt::Debug for ClassifierStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassifierStore")
            .field("names", &self.names)
            .finish()
    }
}

impl<S: ResourceSource> ClassifierStore<S> {
    pub fn new(source: S, names: Vec<String>) -> Self {
        Self {
            source,
            names,
            state: RwLock::new(StoreState {
                phase: LoadState::NotLoaded,
                models: HashMap::new(),
            }),
        }
    }

    /// Configured model names, in detection order
    pub fn model_names(&self) -> &[String] {
        &self.names
    }

    pub async fn load_state(&self) -> LoadState {
        self.state.read().await.phase
    }

    /// Fetch and install every configured model unless already loaded.
    ///
    /// The first failing fetch aborts the whole load; nothing fetched in
    /// that attempt is kept.
    pub async fn ensure_loaded(&self) -> Result<()> {
        if self.state.read().await.phase == LoadState::Loaded {
            return Ok(());
        }

        let mut state = self.state.write().await;
        if state.phase == LoadState::Loaded {
            return Ok(());
        }
        state.phase = LoadState::Loading;
        info!("loading {} classifier models", self.names.len());

        let mut fetched = HashMap::with_capacity(self.names.len());
        for name in &self.names {
            match self.source.fetch(name).await {
                Ok(bytes) => {
                    debug!("fetched model '{}' ({} bytes)", name, bytes.len());
                    fetched.insert(name.clone(), Arc::from(bytes));
                }
                Err(source) => {
                    warn!("fetching model '{}' failed: {:#}", name, source);
                    state.phase = LoadState::Failed;
                    return Err(GcpError::ResourceFetch {
                        model: name.clone(),
                        source,
                    });
                }
            }
        }

        state.models = fetched;
        state.phase = LoadState::Loaded;
        info!("classifier models loaded");
        Ok(())
    }

    /// Bytes of a loaded model
    pub async fn model_bytes(&self, name: &str) -> Result<Arc<[u8]>> {
        self.state
            .read()
            .await
            .models
            .get(name)
            .cloned()
            .ok_or_else(|| GcpError::ModelMissing {
                model: name.to_string(),
            })
    }
}
