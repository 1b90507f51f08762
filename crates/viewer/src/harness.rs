//! Headless test harness: view state, scene synchronizer and model fetcher wired together
//! without a window or GL context.
//!
//! Models come from [`MemoryLoader`], which can hold individual URLs back until released so
//! tests can decide the order in which loads finish.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use shared::{Patient, PatientId};
use tokio::runtime::Handle;
use tokio::sync::Notify;

use crate::assets::{AssetCache, LoadedModel, MaterialDesc, ModelFetcher, ModelLoader, ModelMesh};
use crate::data::PatientStore;
use crate::error::AssetError;
use crate::render_loop::{FrameSnapshot, RenderLoop};
use crate::scene::mesh;
use crate::scene::sync::{AttachOutcome, SceneSynchronizer};
use crate::state::{ViewState, ViewerSettings};

/// Edge length of the test cube in model units (1.0 after the default 0.01 scale)
pub const TEST_CUBE_SIZE: f32 = 100.0;

/// In-memory [`ModelLoader`] with a call log and per-URL gates
#[derive(Default)]
pub struct MemoryLoader {
    models: Mutex<HashMap<String, Vec<ModelMesh>>>,
    calls: Mutex<Vec<String>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cube(self, url: &str) -> Self {
        self.insert_cube(url);
        self
    }

    pub fn with_model(self, url: &str, meshes: Vec<ModelMesh>) -> Self {
        self.insert_model(url, meshes);
        self
    }

    pub fn insert_cube(&self, url: &str) {
        self.insert_model(url, vec![test_cube()]);
    }

    pub fn insert_model(&self, url: &str, meshes: Vec<ModelMesh>) {
        lock(&self.models).insert(url.to_string(), meshes);
    }

    /// Every URL the cache asked for, in order
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }

    /// Hold loads of `url` until [`Self::release`] is called
    pub fn gate(&self, url: &str) {
        lock(&self.gates).insert(url.to_string(), Arc::new(Notify::new()));
    }

    pub fn release(&self, url: &str) {
        if let Some(gate) = lock(&self.gates).remove(url) {
            gate.notify_one();
        }
    }
}

impl ModelLoader for MemoryLoader {
    fn load(&self, url: &str) -> impl Future<Output = Result<LoadedModel, AssetError>> + Send {
        lock(&self.calls).push(url.to_string());
        let gate = lock(&self.gates).get(url).cloned();
        let url = url.to_string();
        async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            let meshes = lock(&self.models).get(&url).cloned();
            match meshes {
                Some(meshes) => Ok(LoadedModel::new(url, meshes)),
                None => Err(AssetError::fetch(&url, "not found")),
            }
        }
    }
}

fn lock<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Red cube of [`TEST_CUBE_SIZE`] centered at the model origin
pub fn test_cube() -> ModelMesh {
    ModelMesh {
        name: Some("cube".into()),
        mesh: Arc::new(mesh::cube(
            TEST_CUBE_SIZE,
            TEST_CUBE_SIZE,
            TEST_CUBE_SIZE,
            [1.0; 3],
        )),
        material: MaterialDesc {
            color: [0.8, 0.2, 0.2],
            metalness: 0.3,
            roughness: 0.7,
            ..MaterialDesc::default()
        },
    }
}

/// Patient record pointing at `model_url`
pub fn patient(id: &str, model_url: &str) -> Patient {
    Patient {
        id: id.into(),
        name: format!("Patient {id}"),
        study_date: "2024-01-01".into(),
        model_url: model_url.into(),
        notes: None,
    }
}

/// Headless viewer: drives selection, loads and frames the way the app does
pub struct TestHarness {
    pub view: ViewState,
    pub sync: SceneSynchronizer,
    pub store: PatientStore,
    fetcher: ModelFetcher<MemoryLoader>,
    render: RenderLoop,
    outcomes: Vec<AttachOutcome>,
}

impl TestHarness {
    /// Harness on `runtime` with default settings
    pub fn new(loader: MemoryLoader, patients: Vec<Patient>, runtime: Handle) -> Self {
        Self::with_settings(loader, patients, ViewerSettings::default(), runtime)
    }

    pub fn with_settings(
        loader: MemoryLoader,
        patients: Vec<Patient>,
        settings: ViewerSettings,
        runtime: Handle,
    ) -> Self {
        let mut view = ViewState::new();
        let sync = SceneSynchronizer::new(&mut view, settings);
        let mut store = PatientStore::new();
        store.set_patients(patients);
        Self {
            view,
            sync,
            store,
            fetcher: ModelFetcher::new(Arc::new(AssetCache::new(loader)), runtime),
            render: RenderLoop::new(),
            outcomes: Vec::new(),
        }
    }

    pub fn loader(&self) -> &MemoryLoader {
        self.fetcher.cache().loader()
    }

    pub fn cache(&self) -> &AssetCache<MemoryLoader> {
        self.fetcher.cache()
    }

    pub fn in_flight(&self) -> usize {
        self.fetcher.in_flight()
    }

    /// Outcomes of every completed load, oldest first
    pub fn outcomes(&self) -> &[AttachOutcome] {
        &self.outcomes
    }

    // ── Driving ──────────────────────────────────────────────

    /// Select a patient and apply the change. Returns the generation of the started load.
    pub fn select(&mut self, id: Option<&str>) -> Option<u64> {
        self.view.select(id.map(str::to_string));
        self.pump()
    }

    /// Apply pending view events and start any requested load
    pub fn pump(&mut self) -> Option<u64> {
        let request = self.sync.process(&mut self.view, self.store.patients())?;
        let generation = request.generation;
        self.fetcher.request(request);
        Some(generation)
    }

    /// Apply completions that have already arrived
    pub fn poll(&mut self) -> Vec<AttachOutcome> {
        let mut outcomes = Vec::new();
        for completion in self.fetcher.drain() {
            outcomes.push(self.sync.complete_load(completion, &self.view));
        }
        self.outcomes.extend(&outcomes);
        outcomes
    }

    /// Wait for the next load to finish and apply it
    pub async fn next_completion(&mut self) -> Option<AttachOutcome> {
        let completion = self.fetcher.next().await?;
        let outcome = self.sync.complete_load(completion, &self.view);
        self.outcomes.push(outcome);
        Some(outcome)
    }

    /// Wait until no load is in flight, applying each completion
    pub async fn settle(&mut self) -> Vec<AttachOutcome> {
        self.pump();
        let mut outcomes = Vec::new();
        while self.in_flight() > 0 {
            match self.next_completion().await {
                Some(outcome) => outcomes.push(outcome),
                None => break,
            }
        }
        outcomes
    }

    /// Select and wait for the model to attach
    pub async fn select_and_settle(&mut self, id: &str) -> Vec<AttachOutcome> {
        self.select(Some(id));
        self.settle().await
    }

    pub fn frame(&mut self, aspect: f32) -> Option<FrameSnapshot> {
        self.render.tick(&mut self.sync, aspect)
    }

    pub fn teardown(&mut self) {
        self.render.stop();
        self.sync.teardown(&mut self.view);
    }

    // ── Queries ──────────────────────────────────────────────

    pub fn selected(&self) -> Option<PatientId> {
        self.view.selected().map(str::to_string)
    }

    /// URL of the attached model, `None` for the placeholder or no model
    pub fn model_source(&self) -> Option<String> {
        match self.sync.scene().model()?.source() {
            crate::scene::instance::ModelSource::Loaded(url) => Some(url.clone()),
            crate::scene::instance::ModelSource::Placeholder => None,
        }
    }

    pub fn has_placeholder(&self) -> bool {
        self.sync
            .scene()
            .model()
            .map(|m| m.is_placeholder())
            .unwrap_or(false)
    }

    pub fn live_resources(&self) -> usize {
        self.sync.resources().live_count()
    }

    pub fn resources_consistent(&self) -> bool {
        self.sync.resources_consistent()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_loader_missing_url() {
        let loader = MemoryLoader::new();
        let err = loader.load("mem://nope").await.unwrap_err();
        assert!(err.to_string().contains("mem://nope"));
        assert_eq!(loader.calls(), vec!["mem://nope"]);
    }

    #[tokio::test]
    async fn test_gate_holds_until_released() {
        let loader = Arc::new(MemoryLoader::new().with_cube("mem://slow"));
        loader.gate("mem://slow");
        let task = {
            let loader = loader.clone();
            tokio::spawn(async move { loader.load("mem://slow").await.map(|m| m.triangle_count()) })
        };
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert!(!task.is_finished());
        loader.release("mem://slow");
        assert_eq!(task.await.unwrap().unwrap(), 12);
    }

    #[tokio::test]
    async fn test_harness_attaches_selected_model() {
        let mut h = TestHarness::new(
            MemoryLoader::new().with_cube("http://localhost:4000/api/models/heart.glb"),
            vec![patient("p1", "heart.glb")],
            Handle::current(),
        );
        let outcomes = h.select_and_settle("p1").await;
        assert_eq!(outcomes, vec![AttachOutcome::Attached]);
        assert_eq!(
            h.model_source().as_deref(),
            Some("http://localhost:4000/api/models/heart.glb")
        );
        assert_eq!(h.loader().calls().len(), 2);
        assert!(h.resources_consistent());
    }
}
