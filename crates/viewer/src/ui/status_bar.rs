use egui::Ui;

use heartview_lib::data::PatientStore;
use heartview_lib::scene::{LoadState, Projection, SceneSynchronizer};
use heartview_lib::state::ViewState;

pub fn show(
    ui: &mut Ui,
    view: &ViewState,
    sync: &SceneSynchronizer,
    store: &PatientStore,
    loads_in_flight: usize,
) {
    ui.horizontal(|ui| {
        match view.selected() {
            Some(id) => {
                let name = store.patient(id).map(|p| p.name.as_str()).unwrap_or(id);
                ui.strong(name);
            }
            None => {
                ui.weak("No patient");
            }
        }
        ui.separator();

        match sync.load_state() {
            LoadState::Idle => {
                ui.weak("Ready");
            }
            LoadState::Loading(id) => {
                ui.colored_label(
                    egui::Color32::from_rgb(255, 200, 100),
                    format!("Loading model for {}…", id.as_deref().unwrap_or("default")),
                );
            }
            LoadState::Ready(url) => {
                ui.label(format!("Model: {url}"));
            }
            LoadState::Placeholder => {
                ui.colored_label(egui::Color32::from_rgb(230, 120, 120), "Model unavailable");
            }
        }

        if loads_in_flight > 1 {
            ui.separator();
            ui.weak(format!("{loads_in_flight} loads pending"));
        }

        if store.points_for().is_some() {
            ui.separator();
            ui.label(format!("{} points", store.points().len()));
        }

        if let Some(err) = store.last_error() {
            ui.separator();
            ui.colored_label(egui::Color32::from_rgb(230, 120, 120), err);
        }

        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.weak(format!("heartview v{}", env!("CARGO_PKG_VERSION")));
            ui.separator();
            ui.weak(format!("{} GPU resources", sync.resources().live_count()));
            ui.separator();
            let mode = match sync.camera().active() {
                Projection::Perspective => "3D",
                Projection::Orthographic => "2D",
            };
            ui.weak(mode);
        });
    });
}
