//! Viewport overlay drawing (scene labels, camera info, load status)

use egui::Painter;

use heartview_lib::scene::{CameraRig, Label, LoadState, Projection};

fn color32(rgb: [f32; 3]) -> egui::Color32 {
    egui::Color32::from_rgb(
        (rgb[0] * 255.0).round() as u8,
        (rgb[1] * 255.0).round() as u8,
        (rgb[2] * 255.0).round() as u8,
    )
}

/// Draw world-anchored labels (ruler axes and step)
pub fn draw_labels(painter: &Painter, rect: egui::Rect, camera: &CameraRig, labels: &[Label]) {
    for label in labels {
        if let Some(screen) = camera.project(label.position, rect) {
            if rect.contains(screen) {
                painter.text(
                    screen,
                    egui::Align2::CENTER_BOTTOM,
                    &label.text,
                    egui::FontId::monospace(12.0),
                    color32(label.color),
                );
            }
        }
    }
}

pub fn draw_camera_info(painter: &Painter, rect: egui::Rect, camera: &CameraRig) {
    let overlay_rect = egui::Rect::from_min_size(
        egui::pos2(rect.right() - 150.0, rect.top() + 4.0),
        egui::vec2(146.0, 44.0),
    );
    painter.rect_filled(
        overlay_rect,
        4.0,
        egui::Color32::from_rgba_premultiplied(0, 0, 0, 140),
    );
    let pose = camera.pose();
    let mode = match camera.active() {
        Projection::Perspective => "3D",
        Projection::Orthographic => "2D",
    };
    painter.text(
        overlay_rect.min + egui::vec2(6.0, 4.0),
        egui::Align2::LEFT_TOP,
        format!(
            "{mode}  Dist: {:.2}\nYaw: {:.0}  Pitch: {:.0}",
            pose.distance,
            pose.yaw.to_degrees(),
            pose.pitch.to_degrees(),
        ),
        egui::FontId::monospace(10.0),
        egui::Color32::from_rgb(160, 160, 170),
    );
}

/// Centered hint while a model is loading or missing
pub fn draw_load_state(painter: &Painter, rect: egui::Rect, state: &LoadState) {
    let text = match state {
        LoadState::Idle => "Select a patient",
        LoadState::Loading(_) => "Loading model…",
        LoadState::Placeholder => "Model unavailable",
        LoadState::Ready(_) => return,
    };
    painter.text(
        egui::pos2(rect.center().x, rect.bottom() - 20.0),
        egui::Align2::CENTER_BOTTOM,
        text,
        egui::FontId::proportional(11.0),
        egui::Color32::from_rgb(100, 100, 110),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color32() {
        assert_eq!(color32([1.0, 0.0, 0.5]), egui::Color32::from_rgb(255, 0, 128));
    }
}
