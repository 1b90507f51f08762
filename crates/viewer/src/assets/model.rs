use std::sync::Arc;

use crate::scene::bounds::Aabb;
use crate::scene::mesh::{MeshData, Rgb};

/// Surface description read from the model file
#[derive(Debug, Clone, PartialEq)]
pub struct MaterialDesc {
    pub name: Option<String>,
    pub color: Rgb,
    pub opacity: f32,
    pub metalness: f32,
    pub roughness: f32,
    pub emissive: Rgb,
    pub transparent: bool,
}

impl Default for MaterialDesc {
    fn default() -> Self {
        Self {
            name: None,
            color: [1.0, 1.0, 1.0],
            opacity: 1.0,
            metalness: 1.0,
            roughness: 1.0,
            emissive: [0.0, 0.0, 0.0],
            transparent: false,
        }
    }
}

/// One drawable part of a model, node transforms already baked into the vertices
#[derive(Debug, Clone)]
pub struct ModelMesh {
    pub name: Option<String>,
    pub mesh: Arc<MeshData>,
    pub material: MaterialDesc,
}

/// A parsed model as stored in the asset cache. Never mutated after loading;
/// scene instances copy what they need.
#[derive(Debug)]
pub struct LoadedModel {
    source: String,
    meshes: Vec<ModelMesh>,
    bounds: Aabb,
}

impl LoadedModel {
    pub fn new(source: impl Into<String>, meshes: Vec<ModelMesh>) -> Self {
        let bounds = meshes
            .iter()
            .fold(Aabb::empty(), |acc, m| acc.union(&Aabb::from_points(m.mesh.positions())));
        Self {
            source: source.into(),
            meshes,
            bounds,
        }
    }

    /// URL (or path) the model was loaded from
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn meshes(&self) -> &[ModelMesh] {
        &self.meshes
    }

    /// Bounds in the model's own coordinate space
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    pub fn triangle_count(&self) -> usize {
        self.meshes.iter().map(|m| m.mesh.indices.len() / 3).sum()
    }
}
