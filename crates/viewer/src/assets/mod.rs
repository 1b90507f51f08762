//! Model asset cache.
//!
//! [`AssetCache`] resolves an ordered candidate list to the first URL that loads and keeps
//! the result for the lifetime of the cache. Each URL has its own once-cell, so concurrent
//! resolutions of one URL share a single loader call. Failures are not cached.

pub mod fetcher;
pub mod gltf_import;
pub mod loader;
pub mod model;
pub mod resolve;

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;

use crate::error::AssetError;

pub use fetcher::{LoadCompletion, LoadRequest, ModelFetcher};
pub use loader::HttpModelLoader;
pub use model::{LoadedModel, MaterialDesc, ModelMesh};

/// Source of parsed models
pub trait ModelLoader: Send + Sync + 'static {
    fn load(&self, url: &str) -> impl Future<Output = Result<LoadedModel, AssetError>> + Send;
}

type Slot = Arc<OnceCell<Arc<LoadedModel>>>;

pub struct AssetCache<L> {
    loader: L,
    slots: Mutex<HashMap<String, Slot>>,
}

impl<L: ModelLoader> AssetCache<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            slots: Mutex::new(HashMap::new()),
        }
    }

    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Try each candidate in order and return the first model that loads
    pub async fn resolve(&self, candidates: &[String]) -> Result<Arc<LoadedModel>, AssetError> {
        let mut last = None;
        for url in candidates {
            match self.load_url(url).await {
                Ok(model) => return Ok(model),
                Err(e) => {
                    tracing::debug!("Candidate {} failed: {}", url, e);
                    last = Some(e);
                }
            }
        }
        match last {
            Some(last) => Err(AssetError::Unavailable {
                tried: candidates.len(),
                last: Box::new(last),
            }),
            None => Err(AssetError::NoCandidates),
        }
    }

    /// Load a single URL through its cache slot
    pub async fn load_url(&self, url: &str) -> Result<Arc<LoadedModel>, AssetError> {
        let slot = self.slot(url);
        slot.get_or_try_init(|| async {
            tracing::debug!("Loading model {}", url);
            self.loader.load(url).await.map(Arc::new)
        })
        .await
        .cloned()
    }

    pub fn cached(&self, url: &str) -> Option<Arc<LoadedModel>> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.get(url).and_then(|s| s.get().cloned())
    }

    /// URLs that have loaded successfully
    pub fn cached_urls(&self) -> Vec<String> {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let mut urls: Vec<String> = slots
            .iter()
            .filter(|(_, s)| s.initialized())
            .map(|(url, _)| url.clone())
            .collect();
        urls.sort();
        urls
    }

    fn slot(&self, url: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(url.to_string()).or_default().clone()
    }
}
