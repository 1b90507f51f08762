use glam::Vec3;

/// Linear RGB color, components in 0..=1
pub type Rgb = [f32; 3];

/// Convert a `0xRRGGBB` literal into [`Rgb`]
pub fn rgb_hex(hex: u32) -> Rgb {
    [
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    ]
}

/// CPU-side mesh data: interleaved [pos.x, pos.y, pos.z, norm.x, norm.y, norm.z, r, g, b]
#[derive(Debug, Clone, PartialEq)]
pub struct MeshData {
    /// 9 floats per vertex: position(3) + normal(3) + color(3)
    pub vertices: Vec<f32>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 9
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.vertices
            .chunks_exact(9)
            .map(|v| Vec3::new(v[0], v[1], v[2]))
    }
}

/// Lines mesh: interleaved [pos.x, pos.y, pos.z, r, g, b, a]
#[derive(Debug, Clone, PartialEq)]
pub struct LineMeshData {
    /// 7 floats per vertex: position(3) + color(4)
    pub vertices: Vec<f32>,
}

impl LineMeshData {
    pub fn vertex_count(&self) -> usize {
        self.vertices.len() / 7
    }

    pub fn segment_count(&self) -> usize {
        self.vertex_count() / 2
    }

    pub fn positions(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.vertices
            .chunks_exact(7)
            .map(|v| Vec3::new(v[0], v[1], v[2]))
    }
}

// ── Primitives ───────────────────────────────────────────────

pub fn cube(w: f32, h: f32, d: f32, color: Rgb) -> MeshData {
    let hw = w * 0.5;
    let hh = h * 0.5;
    let hd = d * 0.5;

    let faces: [([Vec3; 4], Vec3); 6] = [
        // Front (+Z)
        ([Vec3::new(-hw, -hh, hd), Vec3::new(hw, -hh, hd), Vec3::new(hw, hh, hd), Vec3::new(-hw, hh, hd)], Vec3::Z),
        // Back (-Z)
        ([Vec3::new(hw, -hh, -hd), Vec3::new(-hw, -hh, -hd), Vec3::new(-hw, hh, -hd), Vec3::new(hw, hh, -hd)], Vec3::NEG_Z),
        // Right (+X)
        ([Vec3::new(hw, -hh, hd), Vec3::new(hw, -hh, -hd), Vec3::new(hw, hh, -hd), Vec3::new(hw, hh, hd)], Vec3::X),
        // Left (-X)
        ([Vec3::new(-hw, -hh, -hd), Vec3::new(-hw, -hh, hd), Vec3::new(-hw, hh, hd), Vec3::new(-hw, hh, -hd)], Vec3::NEG_X),
        // Top (+Y)
        ([Vec3::new(-hw, hh, hd), Vec3::new(hw, hh, hd), Vec3::new(hw, hh, -hd), Vec3::new(-hw, hh, -hd)], Vec3::Y),
        // Bottom (-Y)
        ([Vec3::new(-hw, -hh, -hd), Vec3::new(hw, -hh, -hd), Vec3::new(hw, -hh, hd), Vec3::new(-hw, -hh, hd)], Vec3::NEG_Y),
    ];

    let mut vertices = Vec::with_capacity(24 * 9);
    let mut indices = Vec::with_capacity(36);

    for (quad, normal) in &faces {
        let base = (vertices.len() / 9) as u32;
        for v in quad {
            push_vert(&mut vertices, v.x, v.y, v.z, *normal, color);
        }
        indices.extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    MeshData { vertices, indices }
}

pub fn sphere(radius: f32, rings: u32, sectors: u32, color: Rgb) -> MeshData {
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    for r in 0..=rings {
        let phi = std::f32::consts::PI * r as f32 / rings as f32;
        let sp = phi.sin();
        let cp = phi.cos();

        for s in 0..=sectors {
            let theta = std::f32::consts::TAU * s as f32 / sectors as f32;
            let x = sp * theta.cos();
            let y = cp;
            let z = sp * theta.sin();

            push_vert(&mut vertices, radius * x, radius * y, radius * z, Vec3::new(x, y, z), color);
        }
    }

    for r in 0..rings {
        for s in 0..sectors {
            let i0 = r * (sectors + 1) + s;
            let i1 = i0 + 1;
            let i2 = i0 + sectors + 1;
            let i3 = i2 + 1;
            indices.extend_from_slice(&[i0, i2, i1, i1, i2, i3]);
        }
    }

    MeshData { vertices, indices }
}

/// Cone with its apex at `+height/2` on Y and its base at `-height/2`
pub fn cone(radius: f32, height: f32, segments: u32, color: Rgb) -> MeshData {
    let hh = height * 0.5;
    let mut vertices = Vec::new();
    let mut indices = Vec::new();

    let slope = radius / height;
    for i in 0..segments {
        let a0 = (i as f32) * std::f32::consts::TAU / segments as f32;
        let a1 = ((i + 1) as f32) * std::f32::consts::TAU / segments as f32;

        let (s0, c0) = a0.sin_cos();
        let (s1, c1) = a1.sin_cos();

        let n0 = Vec3::new(c0, slope, s0).normalize();
        let n1 = Vec3::new(c1, slope, s1).normalize();
        let n_top = (n0 + n1).normalize();

        let base = (vertices.len() / 9) as u32;

        push_vert(&mut vertices, 0.0, hh, 0.0, n_top, color); // apex
        push_vert(&mut vertices, radius * c0, -hh, radius * s0, n0, color);
        push_vert(&mut vertices, radius * c1, -hh, radius * s1, n1, color);

        indices.extend_from_slice(&[base, base + 2, base + 1]);
    }

    add_cap_reversed(&mut vertices, &mut indices, radius, -hh, segments, Vec3::NEG_Y, color);

    MeshData { vertices, indices }
}

/// Recompute smooth vertex normals from triangle faces (for meshes shipped without normals)
pub fn compute_normals(mesh: &mut MeshData) {
    let count = mesh.vertex_count();
    let mut acc = vec![Vec3::ZERO; count];
    let position = |v: &[f32], i: usize| Vec3::new(v[i * 9], v[i * 9 + 1], v[i * 9 + 2]);

    for tri in mesh.indices.chunks_exact(3) {
        let (a, b, c) = (tri[0] as usize, tri[1] as usize, tri[2] as usize);
        if a >= count || b >= count || c >= count {
            continue;
        }
        let pa = position(&mesh.vertices, a);
        let pb = position(&mesh.vertices, b);
        let pc = position(&mesh.vertices, c);
        let n = (pb - pa).cross(pc - pa);
        acc[a] += n;
        acc[b] += n;
        acc[c] += n;
    }

    for (i, n) in acc.into_iter().enumerate() {
        let n = n.try_normalize().unwrap_or(Vec3::Y);
        mesh.vertices[i * 9 + 3] = n.x;
        mesh.vertices[i * 9 + 4] = n.y;
        mesh.vertices[i * 9 + 5] = n.z;
    }
}

// ── Grid, lattice and line helpers ───────────────────────────

/// Square grid in the XZ plane, `size` wide with `divisions` cells per side.
/// The two center lines use `center_color`, the rest `line_color`.
pub fn grid(size: f32, divisions: u32, center_color: Rgb, line_color: Rgb) -> LineMeshData {
    let mut vertices = Vec::new();
    let half = size * 0.5;
    let step = size / divisions.max(1) as f32;
    let center = divisions / 2;

    for i in 0..=divisions {
        let f = -half + i as f32 * step;
        let c = if divisions % 2 == 0 && i == center {
            center_color
        } else {
            line_color
        };
        let c = [c[0], c[1], c[2], 1.0];
        // Line along Z
        push_line_vert(&mut vertices, f, 0.0, -half, c);
        push_line_vert(&mut vertices, f, 0.0, half, c);
        // Line along X
        push_line_vert(&mut vertices, -half, 0.0, f, c);
        push_line_vert(&mut vertices, half, 0.0, f, c);
    }

    LineMeshData { vertices }
}

/// Cubic lattice of `size` with `divisions` cells along each axis, centered on the origin
pub fn lattice(size: f32, divisions: u32, color: Rgb) -> LineMeshData {
    let mut vertices = Vec::new();
    let half = size * 0.5;
    let step = size / divisions.max(1) as f32;
    let c = [color[0], color[1], color[2], 1.0];

    for i in 0..=divisions {
        let v = -half + i as f32 * step;
        for j in 0..=divisions {
            let w = -half + j as f32 * step;
            // X lines
            push_line_vert(&mut vertices, -half, v, w, c);
            push_line_vert(&mut vertices, half, v, w, c);
            // Y lines
            push_line_vert(&mut vertices, v, -half, w, c);
            push_line_vert(&mut vertices, v, half, w, c);
            // Z lines
            push_line_vert(&mut vertices, v, w, -half, c);
            push_line_vert(&mut vertices, v, w, half, c);
        }
    }

    LineMeshData { vertices }
}

/// Single line segment
pub fn segment(from: Vec3, to: Vec3, color: Rgb) -> LineMeshData {
    let c = [color[0], color[1], color[2], 1.0];
    let mut vertices = Vec::with_capacity(14);
    push_line_vert(&mut vertices, from.x, from.y, from.z, c);
    push_line_vert(&mut vertices, to.x, to.y, to.z, c);
    LineMeshData { vertices }
}

// ── Helpers ──────────────────────────────────────────────────

fn push_vert(v: &mut Vec<f32>, px: f32, py: f32, pz: f32, n: Vec3, c: Rgb) {
    v.extend_from_slice(&[px, py, pz, n.x, n.y, n.z, c[0], c[1], c[2]]);
}

fn push_line_vert(v: &mut Vec<f32>, px: f32, py: f32, pz: f32, c: [f32; 4]) {
    v.extend_from_slice(&[px, py, pz, c[0], c[1], c[2], c[3]]);
}

fn add_cap_reversed(
    vertices: &mut Vec<f32>,
    indices: &mut Vec<u32>,
    radius: f32,
    y: f32,
    segments: u32,
    normal: Vec3,
    color: Rgb,
) {
    let center_idx = (vertices.len() / 9) as u32;
    push_vert(vertices, 0.0, y, 0.0, normal, color);

    for i in 0..segments {
        let angle = (i as f32) * std::f32::consts::TAU / segments as f32;
        push_vert(vertices, radius * angle.cos(), y, radius * angle.sin(), normal, color);
    }

    for i in 0..segments {
        let next = (i + 1) % segments;
        indices.extend_from_slice(&[center_idx, center_idx + 1 + i, center_idx + 1 + next]);
    }
}
