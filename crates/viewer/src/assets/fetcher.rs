//! Runs cache resolutions on the tokio runtime and hands results back to the UI thread.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use shared::PatientId;
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use super::{AssetCache, LoadedModel, ModelLoader};
use crate::error::AssetError;

/// A model load for one selection
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    /// Selection generation this load belongs to
    pub generation: u64,
    pub patient_id: Option<PatientId>,
    pub candidates: Vec<String>,
}

#[derive(Debug)]
pub struct LoadCompletion {
    pub generation: u64,
    pub patient_id: Option<PatientId>,
    pub result: Result<Arc<LoadedModel>, AssetError>,
}

pub struct ModelFetcher<L> {
    cache: Arc<AssetCache<L>>,
    runtime: Handle,
    tx: mpsc::UnboundedSender<LoadCompletion>,
    rx: mpsc::UnboundedReceiver<LoadCompletion>,
    in_flight: Arc<AtomicUsize>,
}

impl<L: ModelLoader> ModelFetcher<L> {
    pub fn new(cache: Arc<AssetCache<L>>, runtime: Handle) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            cache,
            runtime,
            tx,
            rx,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn cache(&self) -> &Arc<AssetCache<L>> {
        &self.cache
    }

    /// Selection loads started and not yet received
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Start a selection load; its completion arrives through [`Self::try_recv`]
    pub fn request(&self, request: LoadRequest) {
        let cache = self.cache.clone();
        let tx = self.tx.clone();
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        self.runtime.spawn(async move {
            let result = cache.resolve(&request.candidates).await;
            let completion = LoadCompletion {
                generation: request.generation,
                patient_id: request.patient_id,
                result,
            };
            if tx.send(completion).is_err() {
                tracing::debug!("Load finished after the viewer closed");
            }
        });
    }

    /// Warm the cache in the background; the result is not reported
    pub fn preload(&self, candidates: Vec<String>) {
        let cache = self.cache.clone();
        self.runtime.spawn(async move {
            match cache.resolve(&candidates).await {
                Ok(model) => tracing::debug!("Preloaded {}", model.source()),
                Err(e) => tracing::debug!("Preload failed: {}", e),
            }
        });
    }

    pub fn try_recv(&mut self) -> Option<LoadCompletion> {
        let completion = self.rx.try_recv().ok()?;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Some(completion)
    }

    /// Everything that has completed so far
    pub fn drain(&mut self) -> Vec<LoadCompletion> {
        std::iter::from_fn(|| self.try_recv()).collect()
    }

    /// Wait for the next completion
    pub async fn next(&mut self) -> Option<LoadCompletion> {
        let completion = self.rx.recv().await?;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Some(completion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::MemoryLoader;

    #[tokio::test]
    async fn test_request_reports_completion() {
        let cache = Arc::new(AssetCache::new(MemoryLoader::new().with_cube("mem://h")));
        let mut fetcher = ModelFetcher::new(cache, Handle::current());
        fetcher.request(LoadRequest {
            generation: 3,
            patient_id: Some("p1".into()),
            candidates: vec!["mem://h".into()],
        });
        assert_eq!(fetcher.in_flight(), 1);

        let done = fetcher.next().await.unwrap();
        assert_eq!(done.generation, 3);
        assert_eq!(done.patient_id.as_deref(), Some("p1"));
        assert!(done.result.is_ok());
        assert_eq!(fetcher.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_preload_warms_cache() {
        let cache = Arc::new(AssetCache::new(MemoryLoader::new().with_cube("mem://warm")));
        let fetcher = ModelFetcher::new(cache.clone(), Handle::current());
        fetcher.preload(vec!["mem://missing".into(), "mem://warm".into()]);
        for _ in 0..100 {
            if cache.cached("mem://warm").is_some() {
                break;
            }
            tokio::task::yield_now().await;
        }
        assert!(cache.cached("mem://warm").is_some());
        assert_eq!(fetcher.in_flight(), 0);
    }
}
