//! Scene graph: the objects currently attached to the rendered scene.
//!
//! Every type here that holds a [`ResourceId`] owns it. Owners are not `Clone` and give
//! their ids back through a `dispose(self, ..)` that consumes them.

use std::collections::BTreeSet;
use std::sync::Arc;

use glam::{Mat4, Vec3};

use super::helpers::{GuideSet, Ruler};
use super::instance::ModelInstance;
use super::mesh::{rgb_hex, LineMeshData, MeshData, Rgb};
use super::resources::{GpuResources, ResourceId, ResourceKind};

pub const DARK_BACKGROUND: u32 = 0x0b0f14;
pub const LIGHT_BACKGROUND: u32 = 0xeeeeee;

/// Render order of ordinary opaque objects
pub const RENDER_ORDER_DEFAULT: i32 = 0;

// ── Materials and geometry ───────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaterialKind {
    /// Lit surface (metalness/roughness)
    Standard,
    /// Unlit flat color, used for lines and helper shapes
    Basic,
}

/// Material parameters. Cloning copies the parameters for a frame snapshot;
/// the scene object holding the original remains the owner of `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub id: ResourceId,
    pub kind: MaterialKind,
    pub color: Rgb,
    pub emissive: Rgb,
    pub metalness: f32,
    pub roughness: f32,
    pub opacity: f32,
    pub transparent: bool,
    pub wireframe: bool,
    pub depth_test: bool,
    pub depth_write: bool,
}

impl Material {
    pub fn standard(resources: &mut GpuResources, color: Rgb, metalness: f32, roughness: f32) -> Self {
        Self {
            id: resources.allocate(ResourceKind::Material),
            kind: MaterialKind::Standard,
            color,
            emissive: [0.0; 3],
            metalness,
            roughness,
            opacity: 1.0,
            transparent: false,
            wireframe: false,
            depth_test: true,
            depth_write: true,
        }
    }

    pub fn basic(resources: &mut GpuResources, color: Rgb, opacity: f32) -> Self {
        Self {
            id: resources.allocate(ResourceKind::Material),
            kind: MaterialKind::Basic,
            color,
            emissive: [0.0; 3],
            metalness: 0.0,
            roughness: 1.0,
            opacity,
            transparent: opacity < 1.0,
            wireframe: false,
            depth_test: true,
            depth_write: true,
        }
    }

    fn dispose(self, resources: &mut GpuResources) {
        resources.release(self.id);
    }
}

#[derive(Debug, Clone)]
pub enum GeometryData {
    Triangles(Arc<MeshData>),
    Lines(Arc<LineMeshData>),
}

/// Geometry buffer. Same ownership rule as [`Material`].
#[derive(Debug, Clone)]
pub struct Geometry {
    pub id: ResourceId,
    pub data: GeometryData,
}

impl Geometry {
    pub fn triangles(resources: &mut GpuResources, mesh: Arc<MeshData>) -> Self {
        Self {
            id: resources.allocate(ResourceKind::Geometry),
            data: GeometryData::Triangles(mesh),
        }
    }

    pub fn lines(resources: &mut GpuResources, lines: LineMeshData) -> Self {
        Self {
            id: resources.allocate(ResourceKind::Geometry),
            data: GeometryData::Lines(Arc::new(lines)),
        }
    }

    fn dispose(self, resources: &mut GpuResources) {
        resources.release(self.id);
    }
}

/// A geometry drawn with one material
#[derive(Debug)]
pub struct Drawable {
    pub geometry: Geometry,
    pub material: Material,
    pub transform: Mat4,
    pub visible: bool,
    pub render_order: i32,
}

impl Drawable {
    pub fn new(geometry: Geometry, material: Material) -> Self {
        Self {
            geometry,
            material,
            transform: Mat4::IDENTITY,
            visible: true,
            render_order: RENDER_ORDER_DEFAULT,
        }
    }

    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_render_order(mut self, order: i32) -> Self {
        self.render_order = order;
        self
    }

    pub fn resource_ids(&self) -> [ResourceId; 2] {
        [self.geometry.id, self.material.id]
    }

    pub fn dispose(self, resources: &mut GpuResources) {
        self.geometry.dispose(resources);
        self.material.dispose(resources);
    }
}

// ── Lights ───────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LightKind {
    Ambient,
    Directional,
}

#[derive(Debug)]
pub struct Light {
    pub id: ResourceId,
    pub kind: LightKind,
    pub color: Rgb,
    pub intensity: f32,
    /// Directional lights shine from `position` toward the origin
    pub position: Vec3,
}

impl Light {
    pub fn ambient(resources: &mut GpuResources, color: Rgb, intensity: f32) -> Self {
        Self {
            id: resources.allocate(ResourceKind::Light),
            kind: LightKind::Ambient,
            color,
            intensity,
            position: Vec3::ZERO,
        }
    }

    pub fn directional(resources: &mut GpuResources, color: Rgb, intensity: f32, position: Vec3) -> Self {
        Self {
            id: resources.allocate(ResourceKind::Light),
            kind: LightKind::Directional,
            color,
            intensity,
            position,
        }
    }

    pub fn dispose(self, resources: &mut GpuResources) {
        resources.release(self.id);
    }
}

/// Text anchored at a world position, painted by the overlay pass
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub position: Vec3,
    pub color: Rgb,
}

// ── Scene ────────────────────────────────────────────────────

/// Everything currently attached to the rendered scene
#[derive(Debug)]
pub struct Scene {
    pub(crate) background: Rgb,
    pub(crate) ambient: Option<Light>,
    pub(crate) key_light: Option<Light>,
    pub(crate) extra_light: Option<Light>,
    pub(crate) model: Option<ModelInstance>,
    pub(crate) guides: Option<GuideSet>,
    pub(crate) grid: Option<Drawable>,
    pub(crate) ruler: Option<Ruler>,
}

impl Scene {
    /// Scene with the default dark background and the two base lights
    pub fn new(resources: &mut GpuResources) -> Self {
        Self {
            background: rgb_hex(DARK_BACKGROUND),
            ambient: Some(Light::ambient(resources, [1.0; 3], 0.6)),
            key_light: Some(Light::directional(resources, [1.0; 3], 0.6, Vec3::ONE)),
            extra_light: None,
            model: None,
            guides: None,
            grid: None,
            ruler: None,
        }
    }

    pub fn background(&self) -> Rgb {
        self.background
    }

    pub fn model(&self) -> Option<&ModelInstance> {
        self.model.as_ref()
    }

    pub fn guides(&self) -> Option<&GuideSet> {
        self.guides.as_ref()
    }

    pub fn grid(&self) -> Option<&Drawable> {
        self.grid.as_ref()
    }

    pub fn ruler(&self) -> Option<&Ruler> {
        self.ruler.as_ref()
    }

    pub fn extra_light(&self) -> Option<&Light> {
        self.extra_light.as_ref()
    }

    pub fn lights(&self) -> impl Iterator<Item = &Light> {
        self.ambient
            .iter()
            .chain(self.key_light.iter())
            .chain(self.extra_light.iter())
    }

    pub fn directional_light_count(&self) -> usize {
        self.lights()
            .filter(|l| l.kind == LightKind::Directional)
            .count()
    }

    /// Every drawable currently attached, in no particular order
    pub fn drawables(&self) -> impl Iterator<Item = &Drawable> {
        let model = self.model.iter().flat_map(|m| m.parts.iter());
        let guides = self.guides.iter().flat_map(|g| g.drawables());
        let grid = self.grid.iter();
        let ruler = self.ruler.iter().flat_map(|r| r.drawables());
        model.chain(guides).chain(grid).chain(ruler)
    }

    pub fn labels(&self) -> Vec<Label> {
        self.ruler
            .as_ref()
            .map(|r| r.labels().to_vec())
            .unwrap_or_default()
    }

    /// Ids of every resource reachable from the scene
    pub fn attached_resources(&self) -> BTreeSet<ResourceId> {
        let mut ids: BTreeSet<ResourceId> = self.lights().map(|l| l.id).collect();
        for d in self.drawables() {
            ids.extend(d.resource_ids());
        }
        ids
    }

    /// Detach and dispose everything, base lights included
    pub(crate) fn dispose_all(&mut self, resources: &mut GpuResources) {
        if let Some(model) = self.model.take() {
            model.dispose(resources);
        }
        if let Some(guides) = self.guides.take() {
            guides.dispose(resources);
        }
        if let Some(grid) = self.grid.take() {
            grid.dispose(resources);
        }
        if let Some(ruler) = self.ruler.take() {
            ruler.dispose(resources);
        }
        for light in [self.ambient.take(), self.key_light.take(), self.extra_light.take()]
            .into_iter()
            .flatten()
        {
            light.dispose(resources);
        }
    }
}
