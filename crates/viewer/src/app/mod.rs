//! Main application module

mod keyboard;
mod styles;

use std::collections::BTreeSet;
use std::sync::Arc;

use eframe::egui;
use shared::PatientId;
use tokio::runtime::Handle;

use heartview_lib::assets::{resolve, AssetCache, HttpModelLoader, ModelFetcher};
use heartview_lib::data::{DataEvent, DataService, HttpRepository, PatientStore};
use heartview_lib::render_loop::RenderLoop;
use heartview_lib::scene::SceneSynchronizer;
use heartview_lib::state::{ViewState, ViewerSettings};

use crate::ui::{side_panel, status_bar};
use crate::viewport::ViewportPanel;

/// Main application
pub struct HeartViewApp {
    view: ViewState,
    sync: SceneSynchronizer,
    store: PatientStore,
    fetcher: ModelFetcher<HttpModelLoader>,
    data: DataService<HttpRepository>,
    render: RenderLoop,
    viewport: ViewportPanel,
    /// Settings as read from disk, before command-line and environment overrides
    stored_settings: ViewerSettings,
    /// Patient to select once the list arrives
    initial_patient: Option<PatientId>,
    /// Selection the points were last requested for
    points_selection: Option<PatientId>,
}

impl HeartViewApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        stored_settings: ViewerSettings,
        settings: ViewerSettings,
        runtime: Handle,
        initial_patient: Option<PatientId>,
    ) -> Self {
        styles::configure_styles(&cc.egui_ctx);

        let mut viewport = ViewportPanel::new();
        if let Some(gl) = cc.gl.as_ref() {
            viewport.init_gl(gl);
        }

        let mut view = ViewState::new();
        let data = DataService::new(HttpRepository::new(settings.data_base()), runtime.clone());
        data.request_patients();
        tracing::info!("Loading patients from {}", settings.data_base());

        let sync = SceneSynchronizer::new(&mut view, settings);
        let cache = Arc::new(AssetCache::new(HttpModelLoader::new()));

        Self {
            view,
            sync,
            store: PatientStore::new(),
            fetcher: ModelFetcher::new(cache, runtime),
            data,
            render: RenderLoop::new(),
            viewport,
            stored_settings,
            initial_patient,
            points_selection: None,
        }
    }

    fn poll_data(&mut self) {
        while let Some(event) = self.data.try_recv() {
            match event {
                DataEvent::Patients(Ok(patients)) => {
                    tracing::info!("Loaded {} patients", patients.len());
                    self.store.set_patients(patients);
                    self.preload_models();
                    if let Some(id) = self.initial_patient.take() {
                        if self.store.patient(&id).is_none() {
                            tracing::warn!("Patient {} not in list, using default model", id);
                        }
                        self.view.select(Some(id));
                    }
                }
                DataEvent::Patients(Err(e)) => {
                    tracing::error!("Failed to load patients: {e}");
                    self.store.set_error(format!("Patients unavailable: {e}"));
                }
                DataEvent::Points { patient_id, result } => match result {
                    Ok(points) => {
                        let count = points.len();
                        if self.store.apply_points(&patient_id, points, self.view.selected()) {
                            tracing::debug!("Loaded {} points for {}", count, patient_id);
                        }
                    }
                    Err(e) => tracing::warn!("Points for {} unavailable: {e}", patient_id),
                },
            }
        }
    }

    /// Warm the model cache with every distinct patient model and the default one
    fn preload_models(&self) {
        let settings = self.sync.settings();
        let mut seen = BTreeSet::new();
        let lists = std::iter::once(resolve::candidates_for(None, settings)).chain(
            self.store
                .patients()
                .iter()
                .map(|p| resolve::candidates_for(Some(p), settings)),
        );
        for candidates in lists {
            if seen.insert(candidates.clone()) {
                self.fetcher.preload(candidates);
            }
        }
    }

    /// Start a points request when the selection has changed
    fn sync_points(&mut self) {
        let selected = self.view.selected().map(str::to_string);
        if selected == self.points_selection {
            return;
        }
        self.store.begin_points(selected.as_deref());
        if let Some(id) = &selected {
            self.data.request_points(id.clone());
        }
        self.points_selection = selected;
    }

    fn pump_scene(&mut self) {
        if let Some(request) = self.sync.process(&mut self.view, self.store.patients()) {
            tracing::debug!(
                "Loading model for {:?} (generation {})",
                request.patient_id,
                request.generation
            );
            self.fetcher.request(request);
        }
        for completion in self.fetcher.drain() {
            self.sync.complete_load(completion, &self.view);
        }
    }
}

impl eframe::App for HeartViewApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_data();
        keyboard::handle_keyboard(ctx, &mut self.view, &mut self.sync);

        // ── Side panel: patients and toggles ─────────────────
        egui::SidePanel::left("side_panel")
            .default_width(250.0)
            .width_range(180.0..=400.0)
            .resizable(true)
            .frame(egui::Frame::side_top_panel(&ctx.style()).inner_margin(egui::Margin::same(6)))
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .id_salt("side_scroll")
                    .show(ui, |ui| {
                        side_panel::show(ui, &mut self.view, &mut self.store, self.sync.camera_mut());
                    });
            });

        self.sync_points();
        self.pump_scene();

        // ── Status bar ───────────────────────────────────────
        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(22.0)
            .frame(
                egui::Frame::side_top_panel(&ctx.style()).inner_margin(egui::Margin::symmetric(8, 2)),
            )
            .show(ctx, |ui| {
                status_bar::show(ui, &self.view, &self.sync, &self.store, self.fetcher.in_flight());
            });

        // ── Central panel: 3D viewport ───────────────────────
        egui::CentralPanel::default()
            .frame(egui::Frame::NONE)
            .show(ctx, |ui| {
                self.viewport.show(ui, &mut self.sync, &mut self.render);
            });
    }

    fn on_exit(&mut self, gl: Option<&glow::Context>) {
        self.stored_settings.save();
        self.render.stop();
        self.sync.teardown(&mut self.view);
        if let Some(gl) = gl {
            self.viewport.destroy_gl(gl);
        }
    }
}
