//! Deterministic insertion-guide generation.
//!
//! A patient id is hashed with 32-bit FNV-1a; four xorshift32 streams derived from that seed
//! pick the guide variant (thickness, opacity, diagonal, offsets). The same id and bounds
//! always give bit-identical guides.

use glam::Vec3;

use crate::scene::bounds::Aabb;

pub const GUIDE_COUNT: usize = 4;

/// Guide cross-section relative to the bounding cube size
pub const THICKNESS_FACTOR: f32 = 0.012;
/// Inward margin relative to the cube half-extent
pub const MARGIN_FRACTION: f32 = 0.02;
/// Maximum axis-guide offset relative to the box dimension
pub const OFFSET_FRACTION: f32 = 0.05;

pub const THICKNESS_SCALE_MIN: f32 = 0.7;
pub const THICKNESS_SCALE_MAX: f32 = 1.1;
pub const OPACITY_MIN: f32 = 0.28;
pub const OPACITY_MAX: f32 = 0.38;

const FNV_OFFSET_BASIS: u32 = 0x811c_9dc5;
const FNV_PRIME: u32 = 0x0100_0193;

const SALT_THICKNESS: u32 = 0x9e37_79b9;
const SALT_OPACITY: u32 = 0x85eb_ca6b;
const SALT_DIAGONAL: u32 = 0xc2b2_ae35;
const SALT_OFFSETS: u32 = 0x27d4_eb2f;

/// xorshift32 is stuck at zero, so a zero state is replaced by this
const ZERO_STATE_REPLACEMENT: u32 = 0x6d2b_79f5;

const DEGENERATE_EPSILON: f32 = 1e-6;

/// 32-bit FNV-1a over the characters of `id`, each folded as its scalar value
pub fn seed(id: &str) -> u32 {
    id.chars().fold(FNV_OFFSET_BASIS, |hash, c| {
        (hash ^ c as u32).wrapping_mul(FNV_PRIME)
    })
}

/// Marsaglia xorshift32 with shifts 13, 17, 5
#[derive(Debug, Clone)]
pub struct XorShift32 {
    state: u32,
}

impl XorShift32 {
    pub fn new(seed: u32) -> Self {
        let state = if seed == 0 { ZERO_STATE_REPLACEMENT } else { seed };
        Self { state }
    }

    pub fn next_u32(&mut self) -> u32 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.state = x;
        x
    }

    /// Uniform in [0, 1)
    pub fn next_f32(&mut self) -> f32 {
        (self.next_u32() >> 8) as f32 / (1u32 << 24) as f32
    }
}

/// Per-patient random choices, before they are applied to a bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GuideVariant {
    pub thickness_scale: f32,
    pub opacity: f32,
    pub diagonal: u8,
    /// Offsets in [-1, 1] for the two perpendicular axes of the X, Y and Z guides
    pub offsets: [[f32; 2]; 3],
}

pub fn variant(patient_id: &str) -> GuideVariant {
    let seed = seed(patient_id);

    let mut thickness = XorShift32::new(seed ^ SALT_THICKNESS);
    let mut opacity = XorShift32::new(seed ^ SALT_OPACITY);
    let mut diagonal = XorShift32::new(seed ^ SALT_DIAGONAL);
    let mut offsets = XorShift32::new(seed ^ SALT_OFFSETS);

    let thickness_scale =
        THICKNESS_SCALE_MIN + (THICKNESS_SCALE_MAX - THICKNESS_SCALE_MIN) * thickness.next_f32();
    let opacity = OPACITY_MIN + (OPACITY_MAX - OPACITY_MIN) * opacity.next_f32();
    let diagonal = (diagonal.next_u32() % 4) as u8;

    let mut offs = [[0.0; 2]; 3];
    for axis in offs.iter_mut() {
        for o in axis.iter_mut() {
            *o = offsets.next_f32() * 2.0 - 1.0;
        }
    }

    GuideVariant {
        thickness_scale,
        opacity,
        diagonal,
        offsets: offs,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuideKind {
    AxisX,
    AxisY,
    AxisZ,
    /// One of the four space diagonals of the bounding cube
    Diagonal(u8),
}

/// A renderable guide segment
#[derive(Debug, Clone, PartialEq)]
pub struct GuideGeometry {
    pub kind: GuideKind,
    pub start: Vec3,
    pub end: Vec3,
    /// Index into the shared cluster palette
    pub color_index: u8,
    /// Absolute cross-section edge length
    pub thickness: f32,
    pub opacity: f32,
}

impl GuideGeometry {
    pub fn length(&self) -> f32 {
        (self.end - self.start).length()
    }

    pub fn midpoint(&self) -> Vec3 {
        (self.start + self.end) * 0.5
    }

    pub fn direction(&self) -> Vec3 {
        (self.end - self.start).normalize_or_zero()
    }
}

/// The cube the guides live in: center and half-extent. Degenerate boxes fall back to a
/// unit cube.
pub fn bounding_cube(bounds: &Aabb) -> (Vec3, f32) {
    let finite = bounds.min.is_finite() && bounds.max.is_finite();
    let center = if finite { bounds.center() } else { Vec3::ZERO };
    let max_dim = if finite { bounds.max_dimension() } else { 0.0 };

    if !max_dim.is_finite() || max_dim <= DEGENERATE_EPSILON || !center.is_finite() {
        let center = if center.is_finite() { center } else { Vec3::ZERO };
        return (center, 0.5);
    }
    (center, max_dim * 0.5)
}

/// Four guides for `patient_id` inside `bounds`: X, Y and Z axis guides then the diagonal
pub fn generate(patient_id: &str, bounds: &Aabb) -> [GuideGeometry; GUIDE_COUNT] {
    let v = variant(patient_id);
    let (center, half) = bounding_cube(bounds);
    let inner = half * (1.0 - MARGIN_FRACTION);
    let lo = center - Vec3::splat(inner);
    let hi = center + Vec3::splat(inner);
    let clamp = |p: Vec3| p.clamp(lo, hi);

    let size = if bounds.is_empty() || !bounds.size().is_finite() {
        Vec3::splat(half * 2.0)
    } else {
        bounds.size()
    };
    let thickness = half * 2.0 * THICKNESS_FACTOR * v.thickness_scale;

    let axis_guide = |axis: usize| -> GuideGeometry {
        let (p, q) = match axis {
            0 => (1, 2),
            1 => (0, 2),
            _ => (0, 1),
        };
        let mut offset = Vec3::ZERO;
        offset[p] = v.offsets[axis][0] * OFFSET_FRACTION * size[p];
        offset[q] = v.offsets[axis][1] * OFFSET_FRACTION * size[q];

        let mut along = Vec3::ZERO;
        along[axis] = inner;

        let kind = match axis {
            0 => GuideKind::AxisX,
            1 => GuideKind::AxisY,
            _ => GuideKind::AxisZ,
        };
        GuideGeometry {
            kind,
            start: clamp(center + offset - along),
            end: clamp(center + offset + along),
            color_index: axis as u8,
            thickness,
            opacity: v.opacity,
        }
    };

    let corner = diagonal_corner(v.diagonal);
    let diagonal = GuideGeometry {
        kind: GuideKind::Diagonal(v.diagonal),
        start: clamp(center - corner * inner),
        end: clamp(center + corner * inner),
        color_index: 3,
        thickness,
        opacity: v.opacity,
    };

    [axis_guide(0), axis_guide(1), axis_guide(2), diagonal]
}

/// Unit-cube corner the diagonal runs toward; it starts at the opposite corner
fn diagonal_corner(index: u8) -> Vec3 {
    match index % 4 {
        0 => Vec3::new(1.0, 1.0, 1.0),
        1 => Vec3::new(-1.0, 1.0, 1.0),
        2 => Vec3::new(1.0, -1.0, 1.0),
        _ => Vec3::new(1.0, 1.0, -1.0),
    }
}
