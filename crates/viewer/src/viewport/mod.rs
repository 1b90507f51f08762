//! 3D viewport panel with OpenGL rendering

mod gl_renderer;
mod overlays;

use std::sync::{Arc, Mutex};

use egui::Ui;

use heartview_lib::render_loop::{FrameSnapshot, RenderLoop};
use heartview_lib::scene::{Projection, ResourceId, SceneSynchronizer};
use gl_renderer::GlRenderer;

/// Drag in pixels for a full turn, relative to the viewport height
const ROTATE_SPEED: f32 = std::f32::consts::TAU;
const ZOOM_SPEED: f32 = 0.0015;

/// 3D viewport panel with OpenGL rendering
pub struct ViewportPanel {
    gl_renderer: Option<Arc<Mutex<GlRenderer>>>,
    last_frame: Option<Arc<FrameSnapshot>>,
    /// Released ids from frames that were never painted
    unpainted_released: Vec<ResourceId>,
}

impl ViewportPanel {
    pub fn new() -> Self {
        Self {
            gl_renderer: None,
            last_frame: None,
            unpainted_released: Vec::new(),
        }
    }

    /// Initialize GL renderer (must be called with a GL context)
    pub fn init_gl(&mut self, gl: &glow::Context) {
        match GlRenderer::new(gl) {
            Ok(renderer) => self.gl_renderer = Some(Arc::new(Mutex::new(renderer))),
            Err(e) => tracing::error!("GL renderer unavailable: {e}"),
        }
    }

    pub fn destroy_gl(&mut self, gl: &glow::Context) {
        if let Some(renderer) = self.gl_renderer.take() {
            if let Ok(mut r) = renderer.lock() {
                r.destroy(gl);
            }
        }
    }

    pub fn show(&mut self, ui: &mut Ui, sync: &mut SceneSynchronizer, render: &mut RenderLoop) {
        let (rect, response) =
            ui.allocate_exact_size(ui.available_size(), egui::Sense::click_and_drag());

        self.handle_camera_input(ui, &response, rect, sync);

        let aspect = if rect.height() > 0.0 {
            rect.width() / rect.height()
        } else {
            1.0
        };
        if let Some(mut frame) = render.tick(sync, aspect) {
            frame.released.append(&mut self.unpainted_released);
            self.last_frame = Some(Arc::new(frame));
        }

        if render.is_running() {
            ui.ctx().request_repaint();
        }

        if !ui.is_rect_visible(rect) {
            if let Some(frame) = &self.last_frame {
                self.unpainted_released = frame.released.clone();
            }
            return;
        }

        self.render_gl(ui, rect);
        self.draw_overlays(ui, rect, sync);
    }

    fn handle_camera_input(
        &mut self,
        ui: &Ui,
        response: &egui::Response,
        rect: egui::Rect,
        sync: &mut SceneSynchronizer,
    ) {
        let height = rect.height().max(1.0);
        let two_d = sync.camera().active() == Projection::Orthographic;
        let shift = ui.input(|i| i.modifiers.shift);
        // Primary drag pans instead of orbiting in 2D or with shift held
        let primary_pans = two_d || shift;
        let controls = sync.camera_mut().controls_mut();

        if response.dragged_by(egui::PointerButton::Primary) && !primary_pans {
            let delta = response.drag_delta();
            controls.rotate(
                delta.x / height * ROTATE_SPEED,
                delta.y / height * ROTATE_SPEED,
            );
        }

        if response.dragged_by(egui::PointerButton::Secondary)
            || response.dragged_by(egui::PointerButton::Middle)
            || (response.dragged_by(egui::PointerButton::Primary) && primary_pans)
        {
            let delta = response.drag_delta();
            controls.pan(delta.x / height, delta.y / height);
        }

        if response.hovered() {
            let scroll = ui.input(|i| i.smooth_scroll_delta.y);
            if scroll.abs() > 0.1 {
                controls.zoom(scroll * ZOOM_SPEED);
            }
        }
    }

    fn render_gl(&self, ui: &mut Ui, rect: egui::Rect) {
        let (Some(gl_renderer), Some(frame)) = (&self.gl_renderer, &self.last_frame) else {
            ui.painter().rect_filled(rect, 0.0, egui::Color32::from_rgb(11, 15, 20));
            return;
        };

        let renderer = gl_renderer.clone();
        let frame = frame.clone();
        let callback = egui::PaintCallback {
            rect,
            callback: Arc::new(eframe::egui_glow::CallbackFn::new(move |info, painter| {
                let clip = info.clip_rect_in_pixels();
                let viewport = [
                    clip.left_px as f32,
                    clip.from_bottom_px as f32,
                    clip.width_px as f32,
                    clip.height_px as f32,
                ];
                if let Ok(mut r) = renderer.lock() {
                    r.paint(painter.gl(), &frame, viewport);
                }
            })),
        };
        ui.painter().add(callback);
    }

    fn draw_overlays(&self, ui: &mut Ui, rect: egui::Rect, sync: &SceneSynchronizer) {
        let painter = ui.painter_at(rect);
        if let Some(frame) = &self.last_frame {
            overlays::draw_labels(&painter, rect, sync.camera(), &frame.labels);
        }
        overlays::draw_camera_info(&painter, rect, sync.camera());
        overlays::draw_load_state(&painter, rect, &sync.load_state());
    }
}
