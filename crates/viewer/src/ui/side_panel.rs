//! Patient list and view toggles

use egui::Ui;
use shared::{ClusterId, CLUSTER_COUNT, CLUSTER_PALETTE};

use heartview_lib::data::PatientStore;
use heartview_lib::scene::CameraRig;
use heartview_lib::state::ViewState;

/// Tint applied when the swatch is first enabled
const DEFAULT_TINT: [f32; 3] = [0.85, 0.3, 0.3];

fn palette_color(cluster: usize) -> egui::Color32 {
    let hex = CLUSTER_PALETTE[cluster % CLUSTER_COUNT];
    egui::Color32::from_rgb((hex >> 16) as u8, (hex >> 8) as u8, hex as u8)
}

pub fn show(ui: &mut Ui, view: &mut ViewState, store: &mut PatientStore, camera: &mut CameraRig) {
    show_patients(ui, view, store);
    ui.add_space(6.0);
    ui.separator();
    show_display(ui, view, camera);
    ui.add_space(6.0);
    ui.separator();
    show_clusters(ui, view, store);
    ui.add_space(6.0);
    ui.separator();
    show_notes(ui, view, store);
}

fn show_patients(ui: &mut Ui, view: &mut ViewState, store: &PatientStore) {
    ui.horizontal(|ui| {
        ui.heading("Patients");
        ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
            ui.weak(format!("({})", store.patients().len()));
        });
    });
    ui.separator();

    if !store.is_loaded() {
        ui.weak(store.last_error().unwrap_or("Loading…"));
        return;
    }
    if store.patients().is_empty() {
        ui.weak("No patients");
        return;
    }

    let selected = view.selected().map(str::to_string);
    let mut clicked = None;
    egui::ScrollArea::vertical()
        .id_salt("patient_list")
        .max_height(220.0)
        .show(ui, |ui| {
            for patient in store.patients() {
                let is_selected = selected.as_deref() == Some(patient.id.as_str());
                let label = format!("{}  {}", patient.name, patient.study_date);
                if ui.selectable_label(is_selected, label).clicked() && !is_selected {
                    clicked = Some(patient.id.clone());
                }
            }
        });
    if let Some(id) = clicked {
        view.select(Some(id));
    }
}

fn show_display(ui: &mut Ui, view: &mut ViewState, camera: &mut CameraRig) {
    ui.strong("Display");

    let mut overlay = view.show_overlay();
    if ui.checkbox(&mut overlay, "Guides  [O]").changed() {
        view.set_overlay(overlay);
    }
    let mut wireframe = view.wireframe();
    if ui.checkbox(&mut wireframe, "Wireframe  [W]").changed() {
        view.set_wireframe(wireframe);
    }
    let mut xray = view.xray();
    if ui.checkbox(&mut xray, "X-ray  [X]").changed() {
        view.set_xray(xray);
    }
    let mut extra = view.extra_light();
    if ui.checkbox(&mut extra, "Extra light  [L]").changed() {
        view.set_extra_light(extra);
    }
    let mut two_d = view.two_d();
    if ui.checkbox(&mut two_d, "2D view  [T]").changed() {
        view.set_two_d(two_d);
    }

    ui.horizontal(|ui| {
        let mut tinted = view.tint().is_some();
        if ui.checkbox(&mut tinted, "Tint").changed() {
            view.set_tint(tinted.then_some(DEFAULT_TINT));
        }
        if let Some(mut color) = view.tint() {
            if ui.color_edit_button_rgb(&mut color).changed() {
                view.set_tint(Some(color));
            }
            if ui.small_button("Clear").on_hover_text("Esc").clicked() {
                view.set_tint(None);
            }
        }
    });

    if ui.button("Reset view  [R]").clicked() {
        camera.reset_view();
    }
}

fn show_clusters(ui: &mut Ui, view: &mut ViewState, store: &mut PatientStore) {
    ui.strong("Clusters");
    let counts = store.cluster_counts();
    for (cluster, count) in counts.iter().enumerate() {
        ui.horizontal(|ui| {
            let (rect, _) = ui.allocate_exact_size(egui::vec2(10.0, 10.0), egui::Sense::hover());
            ui.painter().rect_filled(rect, 2.0, palette_color(cluster));
            let id = cluster as ClusterId;
            let mut visible = view.cluster_visible(id);
            let label = format!("Cluster {}  [{}]  {count} pts", cluster + 1, cluster + 1);
            if ui.checkbox(&mut visible, label).changed() {
                view.set_cluster_visible(id, visible);
            }
        });
    }

    let shown = store.filtered_points(view.clusters_visible()).len();
    ui.weak(format!("{shown} of {} points visible", store.points().len()));

    let metrics: Vec<String> = store.metrics().into_iter().map(str::to_string).collect();
    if !metrics.is_empty() {
        let mut metric = store.metric().to_string();
        egui::ComboBox::from_label("Metric")
            .selected_text(metric.as_str())
            .show_ui(ui, |ui| {
                for m in &metrics {
                    ui.selectable_value(&mut metric, m.clone(), m.as_str());
                }
            });
        if metric != store.metric() {
            store.set_metric(metric);
        }
    }
}

fn show_notes(ui: &mut Ui, view: &ViewState, store: &PatientStore) {
    let Some(patient) = view.selected().and_then(|id| store.patient(id)) else {
        return;
    };
    egui::CollapsingHeader::new("Notes")
        .id_salt("patient_notes")
        .default_open(true)
        .show(ui, |ui| match patient.notes.as_deref() {
            Some(notes) if !notes.is_empty() => {
                for note in notes {
                    ui.strong(&note.title);
                    ui.label(&note.body);
                    ui.add_space(4.0);
                }
            }
            _ => {
                ui.weak("No notes");
            }
        });
}
