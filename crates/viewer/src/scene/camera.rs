//! Camera rig: a perspective camera, a lazily created orthographic camera and the orbit
//! controls bound to whichever is active.

use glam::{Mat4, Vec2, Vec3, Vec4};

use super::bounds::Aabb;

pub const PERSPECTIVE_FOV_DEG: f32 = 60.0;
pub const NEAR: f32 = 0.01;
pub const FAR: f32 = 100.0;
pub const DEFAULT_ORTHO_SIZE: f32 = 1.5;
pub const HOME_POSITION: Vec3 = Vec3::new(0.6, 0.4, 0.8);
pub const DAMPING_FACTOR: f32 = 0.08;
/// Extra room around the fitted bounds
pub const FIT_MARGIN: f32 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    Perspective,
    Orthographic,
}

/// Orbit pose around a target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrbitPose {
    /// Horizontal rotation angle (radians)
    pub yaw: f32,
    /// Vertical rotation angle (radians)
    pub pitch: f32,
    /// Distance from target
    pub distance: f32,
    pub target: Vec3,
}

impl OrbitPose {
    /// Pose with the eye at `eye`, looking at `target`
    pub fn looking_from(eye: Vec3, target: Vec3) -> Self {
        let offset = eye - target;
        let distance = offset.length().max(1e-6);
        Self {
            yaw: offset.x.atan2(offset.z),
            pitch: (offset.y / distance).clamp(-1.0, 1.0).asin(),
            distance,
            target,
        }
    }

    pub fn home() -> Self {
        Self::looking_from(HOME_POSITION, Vec3::ZERO)
    }

    /// Camera position in world space
    pub fn eye_position(&self) -> Vec3 {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        self.target + Vec3::new(self.distance * cp * sy, self.distance * sp, self.distance * cp * cy)
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye_position(), self.target, Vec3::Y)
    }

    fn right_vector(&self) -> Vec3 {
        let fwd = (self.target - self.eye_position()).normalize_or_zero();
        fwd.cross(Vec3::Y).normalize_or_zero()
    }

    fn up_vector(&self) -> Vec3 {
        let fwd = (self.target - self.eye_position()).normalize_or_zero();
        self.right_vector().cross(fwd).normalize_or_zero()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PerspectiveCamera {
    pub pose: OrbitPose,
    /// Vertical field of view (radians)
    pub fov: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrthographicCamera {
    pub pose: OrbitPose,
    /// Half of the visible height
    pub size: f32,
}

/// Input handler bound to the active camera. Input accumulates until [`CameraRig::update`].
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitControls {
    pub enable_rotate: bool,
    pub enable_pan: bool,
    pub enable_zoom: bool,
    pub enable_damping: bool,
    pub damping_factor: f32,
    rotate_delta: Vec2,
    pan_delta: Vec2,
    zoom_delta: f32,
}

impl OrbitControls {
    /// 3D: rotation on, damped
    pub fn orbit() -> Self {
        Self {
            enable_rotate: true,
            enable_pan: true,
            enable_zoom: true,
            enable_damping: true,
            damping_factor: DAMPING_FACTOR,
            rotate_delta: Vec2::ZERO,
            pan_delta: Vec2::ZERO,
            zoom_delta: 0.0,
        }
    }

    /// 2D: pan and zoom only
    pub fn planar() -> Self {
        Self {
            enable_rotate: false,
            enable_damping: false,
            ..Self::orbit()
        }
    }

    /// Rotate by `dx`/`dy` radians
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        if self.enable_rotate {
            self.rotate_delta += Vec2::new(dx, dy);
        }
    }

    /// Pan by fractions of the viewport height
    pub fn pan(&mut self, dx: f32, dy: f32) {
        if self.enable_pan {
            self.pan_delta += Vec2::new(dx, dy);
        }
    }

    /// Positive zooms in
    pub fn zoom(&mut self, delta: f32) {
        if self.enable_zoom {
            self.zoom_delta += delta;
        }
    }

    pub fn is_moving(&self) -> bool {
        self.rotate_delta.length_squared() > 1e-12
            || self.pan_delta.length_squared() > 1e-12
            || self.zoom_delta.abs() > 1e-6
    }

    /// Portion of the accumulated input to apply this frame; the remainder decays
    fn take(&mut self) -> (Vec2, Vec2, f32) {
        if self.enable_damping {
            let f = self.damping_factor;
            let step = (self.rotate_delta * f, self.pan_delta * f, self.zoom_delta * f);
            self.rotate_delta *= 1.0 - f;
            self.pan_delta *= 1.0 - f;
            self.zoom_delta *= 1.0 - f;
            if !self.is_moving() {
                self.rotate_delta = Vec2::ZERO;
                self.pan_delta = Vec2::ZERO;
                self.zoom_delta = 0.0;
            }
            step
        } else {
            let step = (self.rotate_delta, self.pan_delta, self.zoom_delta);
            self.rotate_delta = Vec2::ZERO;
            self.pan_delta = Vec2::ZERO;
            self.zoom_delta = 0.0;
            step
        }
    }
}

#[derive(Debug)]
pub struct CameraRig {
    perspective: PerspectiveCamera,
    orthographic: Option<OrthographicCamera>,
    active: Projection,
    controls: OrbitControls,
    controls_builds: u32,
    aspect: f32,
}

impl Default for CameraRig {
    fn default() -> Self {
        Self::new()
    }
}

impl CameraRig {
    pub fn new() -> Self {
        Self {
            perspective: PerspectiveCamera {
                pose: OrbitPose::home(),
                fov: PERSPECTIVE_FOV_DEG.to_radians(),
            },
            orthographic: None,
            active: Projection::Perspective,
            controls: OrbitControls::orbit(),
            controls_builds: 1,
            aspect: 1.0,
        }
    }

    pub fn active(&self) -> Projection {
        self.active
    }

    pub fn perspective(&self) -> &PerspectiveCamera {
        &self.perspective
    }

    pub fn orthographic(&self) -> Option<&OrthographicCamera> {
        self.orthographic.as_ref()
    }

    pub fn controls(&self) -> &OrbitControls {
        &self.controls
    }

    pub fn controls_mut(&mut self) -> &mut OrbitControls {
        &mut self.controls
    }

    /// How many controls handlers have been built, the initial one included
    pub fn controls_builds(&self) -> u32 {
        self.controls_builds
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    /// Make the orthographic (2D) or perspective camera active, rebuild the controls for it
    /// and refit to `bounds`
    pub fn set_two_d(&mut self, two_d: bool, bounds: Option<&Aabb>) {
        if two_d {
            let ortho = self.orthographic.get_or_insert_with(|| OrthographicCamera {
                pose: OrbitPose::looking_from(Vec3::Z, Vec3::ZERO),
                size: DEFAULT_ORTHO_SIZE,
            });
            ortho.size = DEFAULT_ORTHO_SIZE;
            self.active = Projection::Orthographic;
            self.controls = OrbitControls::planar();
        } else {
            self.active = Projection::Perspective;
            self.controls = OrbitControls::orbit();
        }
        self.controls_builds += 1;
        self.fit(bounds);
    }

    /// Frame `bounds` (or a unit box) looking down -Z at the origin
    pub fn fit(&mut self, bounds: Option<&Aabb>) {
        let diagonal = bounds.map(Aabb::diagonal).unwrap_or(0.0);
        let diagonal = if diagonal > 0.0 && diagonal.is_finite() {
            diagonal
        } else {
            1.0
        };
        let radius = diagonal * 0.5;

        match self.active {
            Projection::Perspective => {
                let dist = radius / (self.perspective.fov * 0.5).sin();
                self.perspective.pose =
                    OrbitPose::looking_from(Vec3::new(0.0, 0.0, dist * FIT_MARGIN), Vec3::ZERO);
            }
            Projection::Orthographic => {
                if let Some(ortho) = self.orthographic.as_mut() {
                    let size = radius * FIT_MARGIN;
                    ortho.size = if size > 0.0 { size } else { DEFAULT_ORTHO_SIZE };
                    ortho.pose =
                        OrbitPose::looking_from(Vec3::new(0.0, 0.0, radius * 2.0), Vec3::ZERO);
                }
            }
        }
    }

    /// Back to the home position, looking at the origin
    pub fn reset_view(&mut self) {
        *self.pose_mut() = OrbitPose::home();
    }

    /// Apply pending control input. Returns whether the camera moved.
    pub fn update(&mut self) -> bool {
        if !self.controls.is_moving() {
            return false;
        }
        let (rotate, pan, zoom) = self.controls.take();
        let world_height = self.visible_height();
        let active = self.active;

        let pose = self.pose_mut();
        if rotate != Vec2::ZERO {
            pose.yaw -= rotate.x;
            pose.pitch = (pose.pitch + rotate.y).clamp(-1.5, 1.5);
        }
        if pan != Vec2::ZERO {
            let offset = pose.right_vector() * (-pan.x * world_height) + pose.up_vector() * (pan.y * world_height);
            pose.target += offset;
        }
        if zoom != 0.0 {
            let factor = (1.0 - zoom).clamp(0.5, 1.5);
            match active {
                Projection::Perspective => {
                    self.perspective.pose.distance =
                        (self.perspective.pose.distance * factor).clamp(0.02, 50.0);
                }
                Projection::Orthographic => {
                    if let Some(ortho) = self.orthographic.as_mut() {
                        ortho.size = (ortho.size * factor).clamp(0.01, 50.0);
                    }
                }
            }
        }
        true
    }

    pub fn pose(&self) -> &OrbitPose {
        match (self.active, self.orthographic.as_ref()) {
            (Projection::Orthographic, Some(o)) => &o.pose,
            _ => &self.perspective.pose,
        }
    }

    fn pose_mut(&mut self) -> &mut OrbitPose {
        match (self.active, self.orthographic.as_mut()) {
            (Projection::Orthographic, Some(o)) => &mut o.pose,
            _ => &mut self.perspective.pose,
        }
    }

    /// World-space height visible at the target
    fn visible_height(&self) -> f32 {
        match (self.active, self.orthographic.as_ref()) {
            (Projection::Orthographic, Some(o)) => o.size * 2.0,
            _ => 2.0 * self.perspective.pose.distance * (self.perspective.fov * 0.5).tan(),
        }
    }

    pub fn eye_position(&self) -> Vec3 {
        self.pose().eye_position()
    }

    pub fn view_matrix(&self) -> Mat4 {
        self.pose().view_matrix()
    }

    pub fn projection_matrix(&self) -> Mat4 {
        match (self.active, self.orthographic.as_ref()) {
            (Projection::Orthographic, Some(o)) => {
                let w = o.size * self.aspect;
                Mat4::orthographic_rh_gl(-w, w, -o.size, o.size, NEAR, FAR)
            }
            _ => Mat4::perspective_rh_gl(self.perspective.fov, self.aspect, NEAR, FAR),
        }
    }

    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// Project a 3D point to 2D screen coords (for overlay text)
    pub fn project(&self, point: Vec3, rect: egui::Rect) -> Option<egui::Pos2> {
        let p = self.view_projection() * Vec4::new(point.x, point.y, point.z, 1.0);
        if p.w <= 0.0 {
            return None;
        }
        let ndc = p.truncate() / p.w;
        if ndc.z.abs() > 1.0 {
            return None;
        }
        let screen_x = rect.center().x + ndc.x * rect.width() * 0.5;
        let screen_y = rect.center().y - ndc.y * rect.height() * 0.5;
        Some(egui::pos2(screen_x, screen_y))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).abs().max_element() < 1e-4
    }

    #[test]
    fn test_home_pose() {
        let rig = CameraRig::new();
        assert_eq!(rig.active(), Projection::Perspective);
        assert!(approx(rig.eye_position(), HOME_POSITION));
        assert!(rig.orthographic().is_none());
    }

    #[test]
    fn test_fit_perspective() {
        let mut rig = CameraRig::new();
        let b = Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0));
        rig.fit(Some(&b));
        let radius = 3f32.sqrt();
        let expected = radius / 30f32.to_radians().sin() * FIT_MARGIN;
        assert!(approx(rig.eye_position(), Vec3::new(0.0, 0.0, expected)));
    }

    #[test]
    fn test_fit_without_bounds_uses_unit_diagonal() {
        let mut rig = CameraRig::new();
        rig.set_two_d(true, None);
        let o = rig.orthographic().unwrap();
        assert!((o.size - 0.5 * FIT_MARGIN).abs() < 1e-6);
        assert!(approx(rig.eye_position(), Vec3::new(0.0, 0.0, 1.0)));
    }

    #[test]
    fn test_two_d_switch_caches_ortho_and_rebuilds_controls() {
        let mut rig = CameraRig::new();
        assert_eq!(rig.controls_builds(), 1);

        rig.set_two_d(true, None);
        assert_eq!(rig.active(), Projection::Orthographic);
        assert!(!rig.controls().enable_rotate);
        assert!(rig.controls().enable_pan && rig.controls().enable_zoom);
        let first = rig.orthographic().unwrap() as *const OrthographicCamera;

        rig.set_two_d(false, None);
        assert_eq!(rig.active(), Projection::Perspective);
        assert!(rig.controls().enable_rotate && rig.controls().enable_damping);
        assert_eq!(rig.controls().damping_factor, DAMPING_FACTOR);

        rig.set_two_d(true, None);
        assert_eq!(rig.orthographic().unwrap() as *const OrthographicCamera, first);
        assert_eq!(rig.controls_builds(), 4);
    }

    #[test]
    fn test_rotation_ignored_in_two_d() {
        let mut rig = CameraRig::new();
        rig.set_two_d(true, None);
        let before = *rig.pose();
        rig.controls_mut().rotate(0.5, 0.5);
        assert!(!rig.update());
        assert_eq!(*rig.pose(), before);
    }

    #[test]
    fn test_damping_spreads_motion() {
        let mut rig = CameraRig::new();
        let yaw = rig.pose().yaw;
        rig.controls_mut().rotate(1.0, 0.0);
        assert!(rig.update());
        let after_one = rig.pose().yaw;
        assert!((yaw - after_one - DAMPING_FACTOR).abs() < 1e-5);
        for _ in 0..500 {
            rig.update();
        }
        assert!((yaw - rig.pose().yaw - 1.0).abs() < 1e-3);
        assert!(!rig.controls().is_moving());
    }

    #[test]
    fn test_reset_view() {
        let mut rig = CameraRig::new();
        rig.fit(Some(&Aabb::new(Vec3::splat(-3.0), Vec3::splat(3.0))));
        rig.reset_view();
        assert!(approx(rig.eye_position(), HOME_POSITION));
    }

    #[test]
    fn test_project_center() {
        let mut rig = CameraRig::new();
        rig.set_aspect(2.0);
        let rect = egui::Rect::from_min_size(egui::pos2(0.0, 0.0), egui::vec2(200.0, 100.0));
        let p = rig.project(Vec3::ZERO, rect).unwrap();
        assert!((p.x - 100.0).abs() < 1e-3 && (p.y - 50.0).abs() < 1e-3);
    }
}
