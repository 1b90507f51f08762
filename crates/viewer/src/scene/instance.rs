//! The model attached to the scene for the current selection.
//!
//! An instance owns its own geometry and material resources, even when the vertex data is
//! shared with the cached [`LoadedModel`]. Material changes made by x-ray and tint keep a
//! copy of the values they overwrite so they can be put back exactly.

use std::sync::Arc;

use glam::{Mat4, Vec3};

use super::bounds::Aabb;
use super::graph::{Drawable, Geometry, Material};
use super::mesh::{self, rgb_hex, Rgb};
use super::resources::GpuResources;
use crate::assets::{LoadedModel, MaterialDesc};

pub const PLACEHOLDER_RADIUS: f32 = 0.15;
pub const PLACEHOLDER_COLOR: u32 = 0x8aa0ff;
pub const PLACEHOLDER_METALNESS: f32 = 0.1;
pub const PLACEHOLDER_ROUGHNESS: f32 = 0.8;

pub const XRAY_MODEL_OPACITY: f32 = 0.35;
pub const TINT_METALNESS: f32 = 0.2;
pub const TINT_ROUGHNESS: f32 = 0.6;

#[derive(Debug, Clone, PartialEq)]
pub enum ModelSource {
    /// Loaded from this URL
    Loaded(String),
    /// Stand-in shown when no candidate loaded
    Placeholder,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct TintBackup {
    color: Rgb,
    metalness: f32,
    roughness: f32,
    emissive: Rgb,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct XrayBackup {
    opacity: f32,
    transparent: bool,
}

#[derive(Debug)]
pub struct ModelInstance {
    source: ModelSource,
    pub(crate) parts: Vec<Drawable>,
    bounds: Aabb,
    offset: Vec3,
    tint_backup: Option<Vec<TintBackup>>,
    xray_backup: Option<Vec<XrayBackup>>,
}

impl ModelInstance {
    /// Independent instance of `model`, uniformly scaled and recentered at the origin
    pub fn from_loaded(resources: &mut GpuResources, model: &LoadedModel, scale: f32) -> Self {
        let scale_m = Mat4::from_scale(Vec3::splat(scale));
        let scaled = model.bounds().transformed(&scale_m);
        let center = if scaled.is_empty() {
            Vec3::ZERO
        } else {
            scaled.center()
        };
        let transform = Mat4::from_translation(-center) * scale_m;

        let parts = model
            .meshes()
            .iter()
            .map(|m| {
                let geometry = Geometry::triangles(resources, m.mesh.clone());
                let material = material_from_desc(resources, &m.material);
                Drawable::new(geometry, material).with_transform(transform)
            })
            .collect();

        Self {
            source: ModelSource::Loaded(model.source().to_string()),
            parts,
            bounds: if scaled.is_empty() {
                scaled
            } else {
                scaled.translated(-center)
            },
            offset: center,
            tint_backup: None,
            xray_backup: None,
        }
    }

    /// Fixed sphere at the origin with zero offset
    pub fn placeholder(resources: &mut GpuResources) -> Self {
        let color = rgb_hex(PLACEHOLDER_COLOR);
        let sphere = mesh::sphere(PLACEHOLDER_RADIUS, 32, 32, [1.0; 3]);
        let geometry = Geometry::triangles(resources, Arc::new(sphere));
        let material =
            Material::standard(resources, color, PLACEHOLDER_METALNESS, PLACEHOLDER_ROUGHNESS);

        Self {
            source: ModelSource::Placeholder,
            parts: vec![Drawable::new(geometry, material)],
            bounds: Aabb::new(Vec3::splat(-PLACEHOLDER_RADIUS), Vec3::splat(PLACEHOLDER_RADIUS)),
            offset: Vec3::ZERO,
            tint_backup: None,
            xray_backup: None,
        }
    }

    pub fn source(&self) -> &ModelSource {
        &self.source
    }

    pub fn is_placeholder(&self) -> bool {
        self.source == ModelSource::Placeholder
    }

    /// Bounds in scene space, centered at the origin
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Center of the scaled model before recentering
    pub fn offset(&self) -> Vec3 {
        self.offset
    }

    pub fn drawables(&self) -> impl Iterator<Item = &Drawable> {
        self.parts.iter()
    }

    pub fn materials(&self) -> impl Iterator<Item = &Material> {
        self.parts.iter().map(|p| &p.material)
    }

    pub fn set_wireframe(&mut self, on: bool) {
        for part in self.parts.iter_mut() {
            part.material.wireframe = on;
        }
    }

    pub fn is_xray(&self) -> bool {
        self.xray_backup.is_some()
    }

    pub fn set_xray(&mut self, on: bool) {
        if on {
            if self.xray_backup.is_none() {
                self.xray_backup = Some(
                    self.materials()
                        .map(|m| XrayBackup {
                            opacity: m.opacity,
                            transparent: m.transparent,
                        })
                        .collect(),
                );
            }
            for part in self.parts.iter_mut() {
                part.material.transparent = true;
                part.material.opacity = XRAY_MODEL_OPACITY;
            }
        } else if let Some(backup) = self.xray_backup.take() {
            for (part, b) in self.parts.iter_mut().zip(backup) {
                part.material.opacity = b.opacity;
                part.material.transparent = b.transparent;
            }
        }
    }

    pub fn is_tinted(&self) -> bool {
        self.tint_backup.is_some()
    }

    /// Recolor every material; the pre-tint values are captured on the first call
    pub fn apply_tint(&mut self, color: Rgb) {
        if self.tint_backup.is_none() {
            self.tint_backup = Some(
                self.materials()
                    .map(|m| TintBackup {
                        color: m.color,
                        metalness: m.metalness,
                        roughness: m.roughness,
                        emissive: m.emissive,
                    })
                    .collect(),
            );
        }
        for part in self.parts.iter_mut() {
            let m = &mut part.material;
            m.color = color;
            m.metalness = TINT_METALNESS;
            m.roughness = TINT_ROUGHNESS;
            m.emissive = [0.0; 3];
        }
    }

    pub fn clear_tint(&mut self) {
        if let Some(backup) = self.tint_backup.take() {
            for (part, b) in self.parts.iter_mut().zip(backup) {
                let m = &mut part.material;
                m.color = b.color;
                m.metalness = b.metalness;
                m.roughness = b.roughness;
                m.emissive = b.emissive;
            }
        }
    }

    pub fn dispose(self, resources: &mut GpuResources) {
        for part in self.parts {
            part.dispose(resources);
        }
    }
}

fn material_from_desc(resources: &mut GpuResources, desc: &MaterialDesc) -> Material {
    let mut material = Material::standard(resources, desc.color, desc.metalness, desc.roughness);
    material.emissive = desc.emissive;
    material.opacity = desc.opacity;
    material.transparent = desc.transparent;
    material
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::ModelMesh;

    fn offset_cube() -> LoadedModel {
        let mut cube = mesh::cube(100.0, 100.0, 100.0, [1.0; 3]);
        for v in cube.vertices.chunks_exact_mut(9) {
            v[0] += 300.0;
        }
        LoadedModel::new(
            "mem://cube",
            vec![ModelMesh {
                name: None,
                mesh: Arc::new(cube),
                material: MaterialDesc {
                    color: [0.9, 0.1, 0.2],
                    metalness: 0.5,
                    roughness: 0.25,
                    emissive: [0.1, 0.0, 0.0],
                    ..MaterialDesc::default()
                },
            }],
        )
    }

    #[test]
    fn test_scaled_and_recentered() {
        let mut res = GpuResources::new();
        let inst = ModelInstance::from_loaded(&mut res, &offset_cube(), 0.01);
        assert!((inst.offset() - Vec3::new(3.0, 0.0, 0.0)).length() < 1e-5);
        let b = inst.bounds();
        assert!((b.min - Vec3::splat(-0.5)).length() < 1e-5);
        assert!((b.max - Vec3::splat(0.5)).length() < 1e-5);

        let part = inst.drawables().next().unwrap();
        let p = part.transform.transform_point3(Vec3::new(350.0, 50.0, 50.0));
        assert!((p - Vec3::splat(0.5)).length() < 1e-5);
    }

    #[test]
    fn test_instances_own_resources() {
        let mut res = GpuResources::new();
        let model = offset_cube();
        let a = ModelInstance::from_loaded(&mut res, &model, 0.01);
        let b = ModelInstance::from_loaded(&mut res, &model, 0.01);
        assert_eq!(res.live_count(), 4);
        assert_ne!(
            a.drawables().next().unwrap().geometry.id,
            b.drawables().next().unwrap().geometry.id
        );
        a.dispose(&mut res);
        assert_eq!(res.live_count(), 2);
        b.dispose(&mut res);
    }

    #[test]
    fn test_placeholder() {
        let mut res = GpuResources::new();
        let p = ModelInstance::placeholder(&mut res);
        assert!(p.is_placeholder());
        assert_eq!(p.offset(), Vec3::ZERO);
        let m = p.materials().next().unwrap();
        assert_eq!(m.color, rgb_hex(PLACEHOLDER_COLOR));
        assert_eq!(m.metalness, PLACEHOLDER_METALNESS);
        assert_eq!(m.roughness, PLACEHOLDER_ROUGHNESS);
    }

    #[test]
    fn test_tint_restores_exactly() {
        let mut res = GpuResources::new();
        let mut inst = ModelInstance::from_loaded(&mut res, &offset_cube(), 0.01);
        let before: Vec<Material> = inst.materials().cloned().collect();

        inst.apply_tint([0.0, 1.0, 0.0]);
        inst.apply_tint([0.0, 0.0, 1.0]);
        let m = inst.materials().next().unwrap();
        assert_eq!(m.color, [0.0, 0.0, 1.0]);
        assert_eq!(m.metalness, TINT_METALNESS);
        assert_eq!(m.emissive, [0.0; 3]);

        inst.clear_tint();
        let after: Vec<Material> = inst.materials().cloned().collect();
        assert_eq!(before, after);
        assert!(!inst.is_tinted());
    }

    #[test]
    fn test_xray_restores_opacity() {
        let mut res = GpuResources::new();
        let mut inst = ModelInstance::from_loaded(&mut res, &offset_cube(), 0.01);
        inst.set_xray(true);
        let m = inst.materials().next().unwrap();
        assert!(m.transparent);
        assert_eq!(m.opacity, XRAY_MODEL_OPACITY);
        inst.set_xray(false);
        let m = inst.materials().next().unwrap();
        assert!(!m.transparent);
        assert_eq!(m.opacity, 1.0);
    }

    #[test]
    fn test_wireframe_flag() {
        let mut res = GpuResources::new();
        let mut inst = ModelInstance::placeholder(&mut res);
        inst.set_wireframe(true);
        assert!(inst.materials().all(|m| m.wireframe));
        inst.set_wireframe(false);
        assert!(inst.materials().all(|m| !m.wireframe));
    }
}
