//! Keeps the scene graph in step with [`ViewState`].
//!
//! The synchronizer subscribes once per handler group and only reacts to the topics of that
//! group. Model loads run elsewhere: a selection change produces a [`LoadRequest`] and the
//! result comes back through [`SceneSynchronizer::complete_load`], which discards anything
//! belonging to an older selection. Every resource the scene holds is disposed on the path
//! that removes it, so the registry's live set always equals what is attached.

use std::collections::BTreeSet;

use glam::Vec3;
use shared::{Patient, PatientId};

use super::bounds::Aabb;
use super::camera::CameraRig;
use super::graph::{Light, Scene, DARK_BACKGROUND, LIGHT_BACKGROUND};
use super::helpers::{self, GuideSet, Ruler};
use super::instance::{ModelInstance, ModelSource};
use super::mesh::rgb_hex;
use super::resources::{GpuResources, ResourceId};
use crate::assets::{resolve, LoadCompletion, LoadRequest};
use crate::guides;
use crate::state::{SubscriberId, Topic, ViewEvent, ViewState, ViewerSettings};

pub const EXTRA_LIGHT_INTENSITY: f32 = 1.0;
pub const EXTRA_LIGHT_POSITION: Vec3 = Vec3::new(-1.0, 1.5, 0.5);

/// What happened to a finished load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachOutcome {
    /// The loaded model is now in the scene
    Attached,
    /// Loading failed and the placeholder took its place
    Placeholder,
    /// A newer selection superseded this load; nothing changed
    StaleResultDiscarded,
}

/// Model status for display
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Idle,
    Loading(Option<PatientId>),
    Ready(String),
    Placeholder,
}

#[derive(Debug, Clone, Copy)]
struct Subscriptions {
    selection: SubscriberId,
    visibility: SubscriberId,
    wireframe: SubscriberId,
    xray: SubscriberId,
    extra_light: SubscriberId,
    two_d: SubscriberId,
    overlay: SubscriberId,
    tint: SubscriberId,
}

impl Subscriptions {
    fn all(&self) -> [SubscriberId; 8] {
        [
            self.selection,
            self.visibility,
            self.wireframe,
            self.xray,
            self.extra_light,
            self.two_d,
            self.overlay,
            self.tint,
        ]
    }
}

pub struct SceneSynchronizer {
    scene: Scene,
    resources: GpuResources,
    camera: CameraRig,
    settings: ViewerSettings,
    subs: Subscriptions,
    /// Bumped on every selection change and on teardown
    generation: u64,
    /// Generation of the load still expected, if any
    pending: Option<u64>,
    current_patient: Option<PatientId>,
    /// Selection made before this synchronizer subscribed
    initial_selection: Option<PatientId>,
    torn_down: bool,
}

impl SceneSynchronizer {
    pub fn new(view: &mut ViewState, settings: ViewerSettings) -> Self {
        let subs = Subscriptions {
            selection: view.subscribe(Topic::Selection),
            visibility: view.subscribe(Topic::Clusters | Topic::Overlay),
            wireframe: view.subscribe(Topic::Wireframe),
            xray: view.subscribe(Topic::Xray),
            extra_light: view.subscribe(Topic::ExtraLight),
            two_d: view.subscribe(Topic::TwoD),
            overlay: view.subscribe(Topic::Overlay),
            tint: view.subscribe(Topic::Tint),
        };

        let mut resources = GpuResources::new();
        let scene = Scene::new(&mut resources);

        let mut sync = Self {
            scene,
            resources,
            camera: CameraRig::new(),
            settings,
            subs,
            generation: 0,
            pending: None,
            current_patient: None,
            initial_selection: view.selected().map(str::to_string),
            torn_down: false,
        };

        // Bring the scene to the state the view already has
        sync.on_wireframe(view.wireframe());
        sync.on_extra_light(view.extra_light());
        if view.two_d() {
            sync.on_two_d(true);
        }
        sync.on_overlay(view.show_overlay());
        sync
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn camera_mut(&mut self) -> &mut CameraRig {
        &mut self.camera
    }

    pub fn resources(&self) -> &GpuResources {
        &self.resources
    }

    pub(crate) fn resources_mut(&mut self) -> &mut GpuResources {
        &mut self.resources
    }

    pub fn settings(&self) -> &ViewerSettings {
        &self.settings
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Recentering offset of the current model (zero without one)
    pub fn model_offset(&self) -> Vec3 {
        self.scene.model().map(ModelInstance::offset).unwrap_or(Vec3::ZERO)
    }

    pub fn model_bounds(&self) -> Option<Aabb> {
        self.scene.model().map(ModelInstance::bounds)
    }

    pub fn load_state(&self) -> LoadState {
        if self.pending.is_some() {
            return LoadState::Loading(self.current_patient.clone());
        }
        match self.scene.model().map(ModelInstance::source) {
            None => LoadState::Idle,
            Some(ModelSource::Placeholder) => LoadState::Placeholder,
            Some(ModelSource::Loaded(url)) => LoadState::Ready(url.clone()),
        }
    }

    /// Whether the resources reachable from the scene are exactly the live ones
    pub fn resources_consistent(&self) -> bool {
        let live: BTreeSet<ResourceId> = self.resources.live_ids().into_iter().collect();
        live == self.scene.attached_resources()
    }

    // ── Event processing ─────────────────────────────────────

    /// Drain every subscription and apply the changes. Returns the model load to start,
    /// if the selection changed.
    pub fn process(&mut self, view: &mut ViewState, patients: &[Patient]) -> Option<LoadRequest> {
        if self.torn_down {
            return None;
        }

        let mut request = self
            .initial_selection
            .take()
            .and_then(|id| self.on_selection(Some(id), patients));

        for event in view.take_events(self.subs.selection) {
            if let ViewEvent::Selection(id) = event {
                request = self.on_selection(id, patients);
            }
        }

        if !view.take_events(self.subs.visibility).is_empty() {
            self.apply_guide_visibility(view);
        }

        for event in view.take_events(self.subs.wireframe) {
            if let ViewEvent::Wireframe(on) = event {
                self.on_wireframe(on);
            }
        }

        for event in view.take_events(self.subs.xray) {
            if let ViewEvent::Xray(on) = event {
                self.on_xray(on);
            }
        }

        for event in view.take_events(self.subs.extra_light) {
            if let ViewEvent::ExtraLight(on) = event {
                self.on_extra_light(on);
            }
        }

        for event in view.take_events(self.subs.two_d) {
            if let ViewEvent::TwoD(on) = event {
                self.on_two_d(on);
            }
        }

        for event in view.take_events(self.subs.overlay) {
            if let ViewEvent::Overlay(on) = event {
                self.on_overlay(on);
            }
        }

        for event in view.take_events(self.subs.tint) {
            if let ViewEvent::Tint(tint) = event {
                if let Some(model) = self.scene.model.as_mut() {
                    match tint {
                        Some(color) => model.apply_tint(color),
                        None => model.clear_tint(),
                    }
                }
            }
        }

        request
    }

    /// Attach the result of a load if it still belongs to the current selection
    pub fn complete_load(&mut self, completion: LoadCompletion, view: &ViewState) -> AttachOutcome {
        if self.torn_down || self.pending != Some(completion.generation) {
            tracing::debug!(
                "Discarding load for {:?} (generation {}, current {})",
                completion.patient_id,
                completion.generation,
                self.generation
            );
            return AttachOutcome::StaleResultDiscarded;
        }
        self.pending = None;

        let (instance, outcome) = match completion.result {
            Ok(model) => {
                tracing::info!("Attached model {}", model.source());
                let instance =
                    ModelInstance::from_loaded(&mut self.resources, &model, self.settings.model_scale);
                (instance, AttachOutcome::Attached)
            }
            Err(e) => {
                tracing::warn!("Model for {:?} unavailable, using placeholder: {}", completion.patient_id, e);
                (ModelInstance::placeholder(&mut self.resources), AttachOutcome::Placeholder)
            }
        };

        self.attach_model(instance, view);
        outcome
    }

    /// Dispose everything and stop reacting to events
    pub fn teardown(&mut self, view: &mut ViewState) {
        if self.torn_down {
            return;
        }
        for sub in self.subs.all() {
            view.unsubscribe(sub);
        }
        self.scene.dispose_all(&mut self.resources);
        self.generation += 1;
        self.pending = None;
        self.torn_down = true;
        tracing::info!("Scene torn down");
    }

    // ── Handlers ─────────────────────────────────────────────

    fn on_selection(&mut self, id: Option<PatientId>, patients: &[Patient]) -> Option<LoadRequest> {
        self.generation += 1;
        self.current_patient = id.clone();
        // The old patient's model and guides never outlive its selection
        self.detach_model();

        let Some(id) = id else {
            self.pending = None;
            return None;
        };

        let patient = patients.iter().find(|p| p.id == id);
        if patient.is_none() {
            tracing::warn!("Patient {} not in the list, loading the default model", id);
        }
        let candidates = resolve::candidates_for(patient, &self.settings);
        self.pending = Some(self.generation);
        Some(LoadRequest {
            generation: self.generation,
            patient_id: Some(id),
            candidates,
        })
    }

    fn attach_model(&mut self, mut instance: ModelInstance, view: &ViewState) {
        instance.set_wireframe(view.wireframe());
        if view.xray() {
            instance.set_xray(true);
        }
        if let Some(color) = view.tint() {
            instance.apply_tint(color);
        }

        let bounds = instance.bounds();
        if let Some(old) = self.scene.model.replace(instance) {
            old.dispose(&mut self.resources);
        }

        self.camera.fit(Some(&bounds));
        self.rebuild_guides(view);
        self.rebuild_grid(view.wireframe());
        self.on_overlay(view.show_overlay());
    }

    fn detach_model(&mut self) {
        if let Some(model) = self.scene.model.take() {
            model.dispose(&mut self.resources);
        }
        if let Some(guides) = self.scene.guides.take() {
            guides.dispose(&mut self.resources);
        }
        self.camera.fit(None);
        // Grid and ruler exist exactly while their toggles are on
        let wireframe = self.scene.grid.is_some();
        self.rebuild_grid(wireframe);
        let overlay = self.scene.ruler.is_some();
        self.on_overlay(overlay);
    }

    fn rebuild_guides(&mut self, view: &ViewState) {
        if let Some(old) = self.scene.guides.take() {
            old.dispose(&mut self.resources);
        }
        let Some(bounds) = self.model_bounds() else {
            return;
        };
        let id = self.current_patient.as_deref().unwrap_or("");
        let descriptors = guides::generate(id, &bounds);
        let mut set = GuideSet::build(&mut self.resources, descriptors, view.two_d(), view.xray());
        set.apply_visibility(view.show_overlay(), view.clusters_visible());
        self.scene.guides = Some(set);
    }

    fn apply_guide_visibility(&mut self, view: &ViewState) {
        if let Some(guides) = self.scene.guides.as_mut() {
            guides.apply_visibility(view.show_overlay(), view.clusters_visible());
        }
    }

    fn on_wireframe(&mut self, on: bool) {
        if let Some(model) = self.scene.model.as_mut() {
            model.set_wireframe(on);
        }
        self.scene.background = rgb_hex(if on { LIGHT_BACKGROUND } else { DARK_BACKGROUND });
        self.rebuild_grid(on);
    }

    fn rebuild_grid(&mut self, on: bool) {
        if let Some(grid) = self.scene.grid.take() {
            grid.dispose(&mut self.resources);
        }
        if on {
            let bounds = self.model_bounds();
            self.scene.grid = Some(helpers::build_grid(&mut self.resources, bounds.as_ref()));
        }
    }

    fn on_xray(&mut self, on: bool) {
        if let Some(model) = self.scene.model.as_mut() {
            model.set_xray(on);
        }
        if let Some(guides) = self.scene.guides.as_mut() {
            guides.set_xray(on);
        }
    }

    fn on_extra_light(&mut self, on: bool) {
        match (on, self.scene.extra_light.is_some()) {
            (true, false) => {
                self.scene.extra_light = Some(Light::directional(
                    &mut self.resources,
                    [1.0; 3],
                    EXTRA_LIGHT_INTENSITY,
                    EXTRA_LIGHT_POSITION,
                ));
            }
            (false, true) => {
                if let Some(light) = self.scene.extra_light.take() {
                    light.dispose(&mut self.resources);
                }
            }
            _ => {}
        }
    }

    fn on_two_d(&mut self, on: bool) {
        let bounds = self.model_bounds();
        self.camera.set_two_d(on, bounds.as_ref());
        if let Some(guides) = self.scene.guides.as_mut() {
            guides.set_two_d(on);
        }
    }

    /// Rebuild the ruler for the current model, or remove it
    fn on_overlay(&mut self, on: bool) {
        if let Some(ruler) = self.scene.ruler.take() {
            ruler.dispose(&mut self.resources);
        }
        if on {
            let size = helpers::ruler_size(self.model_bounds().as_ref());
            self.scene.ruler = Some(Ruler::build(
                &mut self.resources,
                size,
                self.settings.ruler_divisions,
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{LoadedModel, MaterialDesc, ModelMesh};
    use crate::error::AssetError;
    use crate::scene::camera::Projection;
    use crate::scene::mesh;
    use std::sync::Arc;

    fn patient(id: &str, model: &str) -> Patient {
        Patient {
            id: id.into(),
            name: id.to_uppercase(),
            study_date: "2024-01-01".into(),
            model_url: model.into(),
            notes: None,
        }
    }

    fn cube_model(url: &str, edge: f32) -> Arc<LoadedModel> {
        Arc::new(LoadedModel::new(
            url,
            vec![ModelMesh {
                name: None,
                mesh: Arc::new(mesh::cube(edge, edge, edge, [1.0; 3])),
                material: MaterialDesc::default(),
            }],
        ))
    }

    fn done(req: &LoadRequest, result: Result<Arc<LoadedModel>, AssetError>) -> LoadCompletion {
        LoadCompletion {
            generation: req.generation,
            patient_id: req.patient_id.clone(),
            result,
        }
    }

    fn setup() -> (ViewState, SceneSynchronizer, Vec<Patient>) {
        let mut view = ViewState::new();
        let sync = SceneSynchronizer::new(&mut view, ViewerSettings::default());
        (view, sync, vec![patient("p1", "heart.glb"), patient("p2", "/x/other.glb")])
    }

    #[test]
    fn test_initial_scene() {
        let (_view, sync, _) = setup();
        assert!(sync.scene().ruler().is_some());
        assert!(sync.scene().grid().is_none());
        assert!(sync.scene().model().is_none());
        assert_eq!(sync.load_state(), LoadState::Idle);
        assert!(sync.resources_consistent());
    }

    #[test]
    fn test_selection_produces_request() {
        let (mut view, mut sync, patients) = setup();
        view.select(Some("p1".into()));
        let req = sync.process(&mut view, &patients).unwrap();
        assert_eq!(req.patient_id.as_deref(), Some("p1"));
        assert_eq!(req.candidates[0], "http://localhost:4000/models/heart.glb");
        assert_eq!(sync.load_state(), LoadState::Loading(Some("p1".into())));
    }

    #[test]
    fn test_attach_scales_and_builds_guides() {
        let (mut view, mut sync, patients) = setup();
        view.select(Some("p1".into()));
        let req = sync.process(&mut view, &patients).unwrap();
        let outcome = sync.complete_load(done(&req, Ok(cube_model("mem://h", 200.0))), &view);
        assert_eq!(outcome, AttachOutcome::Attached);

        let bounds = sync.model_bounds().unwrap();
        assert!((bounds.max_dimension() - 2.0).abs() < 1e-5);
        assert_eq!(sync.scene().guides().unwrap().descriptors().len(), 4);
        assert!((sync.scene().ruler().unwrap().size() - 2.4).abs() < 1e-5);
        assert!(sync.resources_consistent());
    }

    #[test]
    fn test_failure_becomes_placeholder() {
        let (mut view, mut sync, patients) = setup();
        view.select(Some("p2".into()));
        let req = sync.process(&mut view, &patients).unwrap();
        let outcome = sync.complete_load(done(&req, Err(AssetError::NoCandidates)), &view);
        assert_eq!(outcome, AttachOutcome::Placeholder);
        assert!(sync.scene().model().unwrap().is_placeholder());
        assert_eq!(sync.model_offset(), Vec3::ZERO);
        assert!(sync.scene().guides().is_some());
        assert_eq!(sync.load_state(), LoadState::Placeholder);
    }

    #[test]
    fn test_stale_completion_discarded() {
        let (mut view, mut sync, patients) = setup();
        view.select(Some("p1".into()));
        let a = sync.process(&mut view, &patients).unwrap();
        view.select(Some("p2".into()));
        let b = sync.process(&mut view, &patients).unwrap();

        let stale = sync.complete_load(done(&a, Ok(cube_model("mem://a", 100.0))), &view);
        assert_eq!(stale, AttachOutcome::StaleResultDiscarded);
        assert!(sync.scene().model().is_none());

        sync.complete_load(done(&b, Ok(cube_model("mem://b", 100.0))), &view);
        assert_eq!(
            sync.scene().model().unwrap().source(),
            &ModelSource::Loaded("mem://b".into())
        );
        assert!(sync.resources_consistent());
    }

    #[test]
    fn test_new_selection_detaches_previous_model() {
        let (mut view, mut sync, patients) = setup();
        view.set_wireframe(true);
        view.select(Some("p1".into()));
        let a = sync.process(&mut view, &patients).unwrap();
        sync.complete_load(done(&a, Ok(cube_model("mem://a", 300.0))), &view);
        let attached = sync.resources().live_count();
        assert!((sync.scene().ruler().unwrap().size() - 3.6).abs() < 1e-5);

        view.select(Some("p2".into()));
        let b = sync.process(&mut view, &patients).unwrap();
        assert!(sync.scene().model().is_none());
        assert!(sync.scene().guides().is_none());
        assert_eq!(sync.load_state(), LoadState::Loading(Some("p2".into())));
        // Grid and ruler fall back to their default size while nothing is attached
        assert!(sync.scene().grid().is_some());
        assert!((sync.scene().ruler().unwrap().size() - 2.0).abs() < 1e-5);
        assert!(sync.resources_consistent());

        sync.complete_load(done(&b, Ok(cube_model("mem://b", 300.0))), &view);
        assert_eq!(sync.resources().live_count(), attached);
        assert!(sync.resources_consistent());
    }

    #[test]
    fn test_cluster_toggle_keeps_guide_geometry() {
        let (mut view, mut sync, patients) = setup();
        view.select(Some("p1".into()));
        let a = sync.process(&mut view, &patients).unwrap();
        sync.complete_load(done(&a, Ok(cube_model("mem://a", 100.0))), &view);

        let guide_ids = |sync: &SceneSynchronizer| -> Vec<ResourceId> {
            sync.scene()
                .guides()
                .unwrap()
                .drawables()
                .map(|d| d.geometry.id)
                .collect()
        };
        let ids = guide_ids(&sync);
        let allocated = sync.resources().total_allocated();

        view.toggle_cluster(1);
        sync.process(&mut view, &patients);
        assert_eq!(guide_ids(&sync), ids);
        assert_eq!(sync.resources().total_allocated(), allocated);
        assert!(!sync.scene().guides().unwrap().drawables().nth(1).unwrap().visible);

        // The ruler is rebuilt by the overlay toggle; the guides are not
        view.toggle_overlay();
        sync.process(&mut view, &patients);
        assert_eq!(guide_ids(&sync), ids);
        view.toggle_overlay();
        sync.process(&mut view, &patients);
        assert_eq!(guide_ids(&sync), ids);

        let allocated = sync.resources().total_allocated();
        view.toggle_xray();
        sync.process(&mut view, &patients);
        assert_eq!(guide_ids(&sync), ids);
        assert_eq!(sync.resources().total_allocated(), allocated);
        assert!(sync.resources_consistent());
    }

    #[test]
    fn test_clear_selection_detaches() {
        let (mut view, mut sync, patients) = setup();
        view.select(Some("p1".into()));
        let a = sync.process(&mut view, &patients).unwrap();
        sync.complete_load(done(&a, Ok(cube_model("mem://a", 100.0))), &view);
        view.select(None);
        assert!(sync.process(&mut view, &patients).is_none());
        assert!(sync.scene().model().is_none());
        assert!(sync.scene().guides().is_none());
        assert!(sync.resources_consistent());
    }

    #[test]
    fn test_wireframe_background_and_grid() {
        let (mut view, mut sync, patients) = setup();
        let original = sync.scene().background();
        view.toggle_wireframe();
        sync.process(&mut view, &patients);
        assert_eq!(sync.scene().background(), rgb_hex(LIGHT_BACKGROUND));
        assert!(sync.scene().grid().is_some());

        view.toggle_wireframe();
        sync.process(&mut view, &patients);
        assert_eq!(sync.scene().background(), original);
        assert!(sync.scene().grid().is_none());
        assert!(sync.resources_consistent());
    }

    #[test]
    fn test_extra_light_at_most_one() {
        let (mut view, mut sync, patients) = setup();
        for _ in 0..3 {
            view.set_extra_light(true);
            sync.process(&mut view, &patients);
        }
        assert_eq!(sync.scene().directional_light_count(), 2);
        view.set_extra_light(false);
        sync.process(&mut view, &patients);
        assert!(sync.scene().extra_light().is_none());
        assert_eq!(sync.scene().directional_light_count(), 1);
        assert!(sync.resources_consistent());
    }

    #[test]
    fn test_overlay_toggles_ruler_and_guides() {
        let (mut view, mut sync, patients) = setup();
        view.select(Some("p1".into()));
        let a = sync.process(&mut view, &patients).unwrap();
        sync.complete_load(done(&a, Ok(cube_model("mem://a", 100.0))), &view);

        view.toggle_overlay();
        sync.process(&mut view, &patients);
        assert!(sync.scene().ruler().is_none());
        assert!(sync.scene().guides().unwrap().drawables().all(|d| !d.visible));

        view.toggle_overlay();
        view.toggle_cluster(3);
        sync.process(&mut view, &patients);
        assert!(sync.scene().ruler().is_some());
        let visible: Vec<bool> = sync.scene().guides().unwrap().drawables().map(|d| d.visible).collect();
        assert_eq!(visible, vec![true, true, true, false]);
    }

    #[test]
    fn test_tint_applied_on_attach() {
        let (mut view, mut sync, patients) = setup();
        view.set_tint(Some([0.0, 1.0, 0.0]));
        view.select(Some("p1".into()));
        let a = sync.process(&mut view, &patients).unwrap();
        sync.complete_load(done(&a, Ok(cube_model("mem://a", 100.0))), &view);
        let model = sync.scene().model().unwrap();
        assert!(model.is_tinted());
        assert!(model.materials().all(|m| m.color == [0.0, 1.0, 0.0]));
    }

    #[test]
    fn test_two_d_switch() {
        let (mut view, mut sync, patients) = setup();
        view.toggle_two_d();
        sync.process(&mut view, &patients);
        assert_eq!(sync.camera().active(), Projection::Orthographic);
        assert_eq!(sync.camera().controls_builds(), 2);
    }

    #[test]
    fn test_teardown_releases_everything() {
        let (mut view, mut sync, patients) = setup();
        view.set_extra_light(true);
        view.set_wireframe(true);
        view.select(Some("p1".into()));
        let a = sync.process(&mut view, &patients).unwrap();
        sync.complete_load(done(&a, Ok(cube_model("mem://a", 100.0))), &view);

        sync.teardown(&mut view);
        assert_eq!(sync.resources().live_count(), 0);
        assert!(sync.scene().attached_resources().is_empty());

        view.toggle_xray();
        assert!(sync.process(&mut view, &patients).is_none());
        let late = sync.complete_load(done(&a, Ok(cube_model("mem://a", 100.0))), &view);
        assert_eq!(late, AttachOutcome::StaleResultDiscarded);
        assert_eq!(sync.resources().live_count(), 0);
    }

    #[test]
    fn test_selection_before_construction() {
        let mut view = ViewState::new();
        view.select(Some("p1".into()));
        let mut sync = SceneSynchronizer::new(&mut view, ViewerSettings::default());
        let req = sync.process(&mut view, &[patient("p1", "heart.glb")]);
        assert!(req.is_some());
    }
}
