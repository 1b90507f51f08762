//! Keyboard shortcut handling

use eframe::egui;

use heartview_lib::scene::SceneSynchronizer;
use heartview_lib::state::ViewState;

const CLUSTER_KEYS: [egui::Key; 4] = [egui::Key::Num1, egui::Key::Num2, egui::Key::Num3, egui::Key::Num4];

/// Handle keyboard shortcuts for the viewer
pub fn handle_keyboard(ctx: &egui::Context, view: &mut ViewState, sync: &mut SceneSynchronizer) {
    // Don't handle shortcuts when a text field is focused
    if ctx.memory(|m| m.focused().is_some()) {
        return;
    }

    ctx.input(|i| {
        if i.modifiers.command {
            return;
        }
        if i.key_pressed(egui::Key::W) {
            view.toggle_wireframe();
        }
        if i.key_pressed(egui::Key::X) {
            view.toggle_xray();
        }
        if i.key_pressed(egui::Key::L) {
            view.toggle_extra_light();
        }
        if i.key_pressed(egui::Key::T) {
            view.toggle_two_d();
        }
        if i.key_pressed(egui::Key::O) {
            view.toggle_overlay();
        }
        for (cluster, key) in CLUSTER_KEYS.iter().enumerate() {
            if i.key_pressed(*key) {
                view.toggle_cluster(cluster as u8);
            }
        }
        // R: back to the home camera position
        if i.key_pressed(egui::Key::R) {
            sync.camera_mut().reset_view();
        }
        if i.key_pressed(egui::Key::Escape) {
            view.set_tint(None);
        }
    });
}
