//! Per-frame driver: advance the camera controls, then capture what to draw.
//!
//! The snapshot is plain data so the GL renderer never touches the scene graph.

use glam::{Mat4, Vec3};

use crate::scene::graph::{Geometry, Label, LightKind, Material};
use crate::scene::mesh::Rgb;
use crate::scene::resources::ResourceId;
use crate::scene::sync::SceneSynchronizer;

#[derive(Debug, Clone)]
pub struct DrawItem {
    pub geometry: Geometry,
    pub material: Material,
    pub transform: Mat4,
    pub render_order: i32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightSnapshot {
    pub kind: LightKind,
    pub color: Rgb,
    pub intensity: f32,
    pub position: Vec3,
}

/// Everything the renderer needs for one frame
#[derive(Debug, Clone)]
pub struct FrameSnapshot {
    pub frame: u64,
    pub view_projection: Mat4,
    pub eye: Vec3,
    pub background: Rgb,
    pub lights: Vec<LightSnapshot>,
    /// Opaque items first, then transparent, each group by ascending render order
    pub items: Vec<DrawItem>,
    pub labels: Vec<Label>,
    /// Resources released since the previous frame; their GL objects can be deleted
    pub released: Vec<ResourceId>,
}

#[derive(Debug)]
pub struct RenderLoop {
    frame: u64,
    running: bool,
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderLoop {
    pub fn new() -> Self {
        Self {
            frame: 0,
            running: true,
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn frames(&self) -> u64 {
        self.frame
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    /// Update controls and build the next frame. `None` once stopped.
    pub fn tick(&mut self, sync: &mut SceneSynchronizer, aspect: f32) -> Option<FrameSnapshot> {
        if !self.running {
            return None;
        }
        self.frame += 1;

        let camera = sync.camera_mut();
        camera.set_aspect(aspect);
        camera.update();
        let view_projection = camera.view_projection();
        let eye = camera.eye_position();

        let released = sync.resources_mut().drain_released();
        let scene = sync.scene();

        let lights = scene
            .lights()
            .map(|l| LightSnapshot {
                kind: l.kind,
                color: l.color,
                intensity: l.intensity,
                position: l.position,
            })
            .collect();

        let mut items: Vec<DrawItem> = scene
            .drawables()
            .filter(|d| d.visible)
            .map(|d| DrawItem {
                geometry: d.geometry.clone(),
                material: d.material.clone(),
                transform: d.transform,
                render_order: d.render_order,
            })
            .collect();
        items.sort_by_key(|i| (i.material.transparent, i.render_order));

        Some(FrameSnapshot {
            frame: self.frame,
            view_projection,
            eye,
            background: scene.background(),
            lights,
            items,
            labels: scene.labels(),
            released,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ViewState, ViewerSettings};

    #[test]
    fn test_tick_orders_items() {
        let mut view = ViewState::new();
        let mut sync = SceneSynchronizer::new(&mut view, ViewerSettings::default());
        view.set_wireframe(true);
        sync.process(&mut view, &[]);

        let mut rl = RenderLoop::new();
        let frame = rl.tick(&mut sync, 1.5).unwrap();
        assert_eq!(frame.frame, 1);
        assert_eq!(frame.lights.len(), 2);
        let keys: Vec<(bool, i32)> = frame
            .items
            .iter()
            .map(|i| (i.material.transparent, i.render_order))
            .collect();
        let mut sorted = keys.clone();
        sorted.sort();
        assert_eq!(keys, sorted);
        assert_eq!(frame.labels.len(), 4);
    }

    #[test]
    fn test_released_ids_reported_once() {
        let mut view = ViewState::new();
        let mut sync = SceneSynchronizer::new(&mut view, ViewerSettings::default());
        let mut rl = RenderLoop::new();
        rl.tick(&mut sync, 1.0);

        view.set_overlay(false);
        sync.process(&mut view, &[]);
        let frame = rl.tick(&mut sync, 1.0).unwrap();
        assert_eq!(frame.released.len(), 14);
        assert!(rl.tick(&mut sync, 1.0).unwrap().released.is_empty());
    }

    #[test]
    fn test_stopped_loop_yields_nothing() {
        let mut view = ViewState::new();
        let mut sync = SceneSynchronizer::new(&mut view, ViewerSettings::default());
        let mut rl = RenderLoop::new();
        rl.stop();
        assert!(rl.tick(&mut sync, 1.0).is_none());
        assert_eq!(rl.frames(), 0);
    }
}
