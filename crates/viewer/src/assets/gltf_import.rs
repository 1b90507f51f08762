//! glTF / GLB → [`LoadedModel`]
//!
//! Node transforms are baked into the vertices so every mesh can be drawn with the model
//! transform alone. Only triangle primitives are kept; textures are not loaded.

use std::path::Path;
use std::sync::Arc;

use glam::{Mat3, Mat4, Vec3};

use super::model::{LoadedModel, MaterialDesc, ModelMesh};
use crate::error::AssetError;
use crate::scene::mesh::{self, MeshData};

/// Parse glTF or GLB bytes. `base` resolves external buffer files of `.gltf` sources.
pub fn parse(url: &str, bytes: &[u8], base: Option<&Path>) -> Result<LoadedModel, AssetError> {
    let gltf::Gltf { document, blob } =
        gltf::Gltf::from_slice(bytes).map_err(|e| AssetError::parse(url, e))?;
    let buffers =
        gltf::import_buffers(&document, base, blob).map_err(|e| AssetError::parse(url, e))?;

    let scene = document
        .default_scene()
        .or_else(|| document.scenes().next())
        .ok_or_else(|| AssetError::parse(url, "document has no scene"))?;

    let mut meshes = Vec::new();
    for node in scene.nodes() {
        collect_node(&node, &Mat4::IDENTITY, &buffers, &mut meshes);
    }

    if meshes.is_empty() {
        return Err(AssetError::parse(url, "no triangle meshes"));
    }

    tracing::debug!("Parsed {} ({} meshes)", url, meshes.len());
    Ok(LoadedModel::new(url, meshes))
}

fn collect_node(
    node: &gltf::Node,
    parent: &Mat4,
    buffers: &[gltf::buffer::Data],
    out: &mut Vec<ModelMesh>,
) {
    let world = *parent * Mat4::from_cols_array_2d(&node.transform().matrix());

    if let Some(m) = node.mesh() {
        for primitive in m.primitives() {
            if primitive.mode() != gltf::mesh::Mode::Triangles {
                continue;
            }
            if let Some(data) = read_primitive(&primitive, &world, buffers) {
                out.push(ModelMesh {
                    name: m.name().or(node.name()).map(str::to_string),
                    mesh: Arc::new(data),
                    material: material_desc(&primitive.material()),
                });
            }
        }
    }

    for child in node.children() {
        collect_node(&child, &world, buffers, out);
    }
}

fn read_primitive(
    primitive: &gltf::Primitive,
    world: &Mat4,
    buffers: &[gltf::buffer::Data],
) -> Option<MeshData> {
    let reader = primitive.reader(|b| buffers.get(b.index()).map(|d| &d.0[..]));

    let positions: Vec<[f32; 3]> = reader.read_positions()?.collect();
    if positions.is_empty() {
        return None;
    }
    let normals: Option<Vec<[f32; 3]>> = reader.read_normals().map(|n| n.collect());
    let colors: Option<Vec<[f32; 3]>> = reader.read_colors(0).map(|c| c.into_rgb_f32().collect());
    let indices: Vec<u32> = match reader.read_indices() {
        Some(i) => i.into_u32().collect(),
        None => (0..positions.len() as u32).collect(),
    };

    let normal_matrix = Mat3::from_mat4(*world).inverse().transpose();
    let mut vertices = Vec::with_capacity(positions.len() * 9);
    for (i, p) in positions.iter().enumerate() {
        let p = world.transform_point3(Vec3::from_array(*p));
        let n = normals
            .as_ref()
            .and_then(|n| n.get(i))
            .map(|n| (normal_matrix * Vec3::from_array(*n)).normalize_or_zero())
            .unwrap_or(Vec3::ZERO);
        let c = colors
            .as_ref()
            .and_then(|c| c.get(i).copied())
            .unwrap_or([1.0; 3]);
        vertices.extend_from_slice(&[p.x, p.y, p.z, n.x, n.y, n.z, c[0], c[1], c[2]]);
    }

    let vertex_count = positions.len() as u32;
    let indices: Vec<u32> = indices
        .chunks_exact(3)
        .filter(|t| t.iter().all(|&i| i < vertex_count))
        .flatten()
        .copied()
        .collect();

    let mut data = MeshData { vertices, indices };
    if normals.is_none() {
        mesh::compute_normals(&mut data);
    }
    Some(data)
}

fn material_desc(material: &gltf::Material) -> MaterialDesc {
    let pbr = material.pbr_metallic_roughness();
    let [r, g, b, a] = pbr.base_color_factor();
    MaterialDesc {
        name: material.name().map(str::to_string),
        color: [r, g, b],
        opacity: a,
        metalness: pbr.metallic_factor(),
        roughness: pbr.roughness_factor(),
        emissive: material.emissive_factor(),
        transparent: material.alpha_mode() == gltf::material::AlphaMode::Blend,
    }
}
