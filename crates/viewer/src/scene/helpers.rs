//! Helper objects built around the model: insertion guides, debug grid and ruler.

use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};
use shared::{CLUSTER_COUNT, CLUSTER_PALETTE};

use super::bounds::Aabb;
use super::graph::{Drawable, Geometry, Label, Material};
use super::mesh::{self, rgb_hex, Rgb};
use super::resources::GpuResources;
use crate::guides::GuideGeometry;

pub const GUIDE_XRAY_OPACITY: f32 = 0.85;
pub const GUIDE_RENDER_ORDER: i32 = 1;
pub const GUIDE_XRAY_RENDER_ORDER: i32 = 999;
/// Guide cross-section multiplier in 2D mode
pub const GUIDE_TWO_D_SCALE: f32 = 0.25;

pub const RULER_RENDER_ORDER: i32 = 1000;
const RULER_LATTICE_COLOR: u32 = 0x78909c;
const RULER_LATTICE_OPACITY: f32 = 0.5;
const RULER_AXES: [(Vec3, u32, &str); 3] = [
    (Vec3::X, 0xff5252, "X"),
    (Vec3::Y, 0x66bb6a, "Y"),
    (Vec3::Z, 0x42a5f5, "Z"),
];
const STEP_LABEL_COLOR: u32 = 0xe0f2f1;

const GRID_CENTER_COLOR: u32 = 0x90a4ae;
const GRID_LINE_COLOR: u32 = 0xcfd8dc;
const GRID_OPACITY: f32 = 0.35;

/// Fallback helper size when there is no model to measure
pub const DEFAULT_HELPER_SIZE: f32 = 2.0;

// ── Guides ───────────────────────────────────────────────────

/// The four guide boxes for the current model
#[derive(Debug)]
pub struct GuideSet {
    descriptors: Vec<GuideGeometry>,
    boxes: Vec<Drawable>,
    two_d: bool,
}

impl GuideSet {
    pub fn build(
        resources: &mut GpuResources,
        descriptors: impl IntoIterator<Item = GuideGeometry>,
        two_d: bool,
        xray: bool,
    ) -> Self {
        let unit_box = Arc::new(mesh::cube(1.0, 1.0, 1.0, [1.0; 3]));
        let descriptors: Vec<GuideGeometry> = descriptors.into_iter().collect();
        let boxes = descriptors
            .iter()
            .map(|g| {
                let color = rgb_hex(CLUSTER_PALETTE[g.color_index as usize % CLUSTER_COUNT]);
                let mut material = Material::basic(resources, color, g.opacity);
                material.transparent = true;
                material.depth_write = false;
                let geometry = Geometry::triangles(resources, unit_box.clone());
                Drawable::new(geometry, material).with_transform(guide_transform(g, two_d))
            })
            .collect();

        let mut set = Self {
            descriptors,
            boxes,
            two_d,
        };
        set.set_xray(xray);
        set
    }

    pub fn descriptors(&self) -> &[GuideGeometry] {
        &self.descriptors
    }

    pub fn drawables(&self) -> impl Iterator<Item = &Drawable> {
        self.boxes.iter()
    }

    pub fn two_d(&self) -> bool {
        self.two_d
    }

    /// Guide `i` is shown iff the overlay is on and cluster `i` is visible
    pub fn apply_visibility(&mut self, show_overlay: bool, clusters: [bool; CLUSTER_COUNT]) {
        for (i, guide) in self.boxes.iter_mut().enumerate() {
            guide.visible = show_overlay && clusters.get(i).copied().unwrap_or(false);
        }
    }

    pub fn set_xray(&mut self, xray: bool) {
        for (guide, desc) in self.boxes.iter_mut().zip(&self.descriptors) {
            let m = &mut guide.material;
            if xray {
                m.opacity = GUIDE_XRAY_OPACITY;
                m.depth_test = false;
                m.depth_write = false;
                guide.render_order = GUIDE_XRAY_RENDER_ORDER;
            } else {
                m.opacity = desc.opacity;
                m.depth_test = true;
                m.depth_write = false;
                guide.render_order = GUIDE_RENDER_ORDER;
            }
        }
    }

    /// Rescale the cross-section for 2D/3D; geometry is reused
    pub fn set_two_d(&mut self, two_d: bool) {
        self.two_d = two_d;
        for (guide, desc) in self.boxes.iter_mut().zip(&self.descriptors) {
            guide.transform = guide_transform(desc, two_d);
        }
    }

    pub fn dispose(self, resources: &mut GpuResources) {
        for guide in self.boxes {
            guide.dispose(resources);
        }
    }
}

/// Unit cube stretched along the guide segment
fn guide_transform(guide: &GuideGeometry, two_d: bool) -> Mat4 {
    let thickness = if two_d {
        guide.thickness * GUIDE_TWO_D_SCALE
    } else {
        guide.thickness
    };
    let dir = guide.direction();
    let rotation = if dir == Vec3::ZERO {
        Quat::IDENTITY
    } else {
        Quat::from_rotation_arc(Vec3::X, dir)
    };
    Mat4::from_scale_rotation_translation(
        Vec3::new(guide.length().max(1e-6), thickness, thickness),
        rotation,
        guide.midpoint(),
    )
}

// ── Grid ─────────────────────────────────────────────────────

/// Size and division count of the debug grid
pub fn grid_dimensions(model_bounds: Option<&Aabb>) -> (f32, u32) {
    let size = model_bounds
        .map(|b| b.max_dimension() * 1.4)
        .filter(|s| *s > 0.0 && s.is_finite())
        .unwrap_or(DEFAULT_HELPER_SIZE);
    let divisions = ((size * 10.0).round() as u32).max(10);
    (size, divisions)
}

/// Debug grid under the model, shown while wireframe is on
pub fn build_grid(resources: &mut GpuResources, model_bounds: Option<&Aabb>) -> Drawable {
    let (size, divisions) = grid_dimensions(model_bounds);
    let y = model_bounds
        .map(|b| b.min.y)
        .filter(|y| y.is_finite())
        .unwrap_or(0.0);

    let lines = mesh::grid(size, divisions, rgb_hex(GRID_CENTER_COLOR), rgb_hex(GRID_LINE_COLOR));
    let geometry = Geometry::lines(resources, lines);
    let mut material = Material::basic(resources, [1.0; 3], GRID_OPACITY);
    material.transparent = true;
    Drawable::new(geometry, material).with_transform(Mat4::from_translation(Vec3::new(0.0, y, 0.0)))
}

// ── Ruler ────────────────────────────────────────────────────

/// Ruler edge length for the current model
pub fn ruler_size(model_bounds: Option<&Aabb>) -> f32 {
    model_bounds
        .map(|b| b.max_dimension() * 1.2)
        .filter(|s| *s > 0.0 && s.is_finite())
        .unwrap_or(DEFAULT_HELPER_SIZE)
}

/// Measurement lattice with three labeled axis arrows
#[derive(Debug)]
pub struct Ruler {
    parts: Vec<Drawable>,
    labels: Vec<Label>,
    size: f32,
    step: f32,
}

impl Ruler {
    pub fn build(resources: &mut GpuResources, size: f32, divisions: u32) -> Self {
        let divisions = divisions.max(1);
        let half = size * 0.5;
        let step = size / divisions as f32;
        let mut parts = Vec::new();
        let mut labels = Vec::new();

        let lattice = mesh::lattice(size, divisions, rgb_hex(RULER_LATTICE_COLOR));
        let mut material = Material::basic(resources, [1.0; 3], RULER_LATTICE_OPACITY);
        material.transparent = true;
        parts.push(Drawable::new(Geometry::lines(resources, lattice), material));

        let length = half * 1.05;
        let head_length = step * 0.6;
        let head_width = step * 0.35;
        for (dir, hex, name) in RULER_AXES {
            let color = rgb_hex(hex);
            parts.extend(arrow(resources, dir, length, head_length, head_width, color));
            labels.push(Label {
                text: name.to_string(),
                position: dir * (length + head_length * 0.5),
                color,
            });
        }

        labels.push(Label {
            text: format!("step = {:.2}", step),
            position: Vec3::new(-half, half + step * 0.4, -half),
            color: rgb_hex(STEP_LABEL_COLOR),
        });

        for part in parts.iter_mut() {
            part.render_order = RULER_RENDER_ORDER;
        }

        Self {
            parts,
            labels,
            size,
            step,
        }
    }

    pub fn size(&self) -> f32 {
        self.size
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn drawables(&self) -> impl Iterator<Item = &Drawable> {
        self.parts.iter()
    }

    pub fn dispose(self, resources: &mut GpuResources) {
        for part in self.parts {
            part.dispose(resources);
        }
    }
}

/// Shaft line plus cone head from the origin along `dir`
fn arrow(
    resources: &mut GpuResources,
    dir: Vec3,
    length: f32,
    head_length: f32,
    head_width: f32,
    color: Rgb,
) -> [Drawable; 2] {
    let shaft_end = dir * (length - head_length).max(0.0);
    let shaft = Drawable::new(
        Geometry::lines(resources, mesh::segment(Vec3::ZERO, shaft_end, color)),
        Material::basic(resources, [1.0; 3], 1.0),
    );

    let cone = mesh::cone(head_width * 0.5, head_length, 12, color);
    let head_center = dir * (length - head_length * 0.5);
    let head = Drawable::new(
        Geometry::triangles(resources, Arc::new(cone)),
        Material::basic(resources, [1.0; 3], 1.0),
    )
    .with_transform(Mat4::from_rotation_translation(
        Quat::from_rotation_arc(Vec3::Y, dir),
        head_center,
    ));

    [shaft, head]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guides;

    fn unit_box() -> Aabb {
        Aabb::new(Vec3::splat(-1.0), Vec3::splat(1.0))
    }

    #[test]
    fn test_grid_dimensions() {
        assert_eq!(grid_dimensions(None), (2.0, 20));
        let small = Aabb::new(Vec3::ZERO, Vec3::splat(0.1));
        let (size, div) = grid_dimensions(Some(&small));
        assert!((size - 0.14).abs() < 1e-6);
        assert_eq!(div, 10);
        let (size, div) = grid_dimensions(Some(&unit_box()));
        assert!((size - 2.8).abs() < 1e-6);
        assert_eq!(div, 28);
    }

    #[test]
    fn test_grid_sits_at_model_floor() {
        let mut res = GpuResources::new();
        let b = Aabb::new(Vec3::new(-1.0, -0.5, -1.0), Vec3::ONE);
        let grid = build_grid(&mut res, Some(&b));
        assert_eq!(grid.transform.w_axis.y, -0.5);
        assert_eq!(grid.material.opacity, GRID_OPACITY);
        assert!(grid.material.transparent);
    }

    #[test]
    fn test_ruler_parts_and_labels() {
        let mut res = GpuResources::new();
        let ruler = Ruler::build(&mut res, 2.0, 10);
        // lattice + 3 × (shaft, head)
        assert_eq!(ruler.drawables().count(), 7);
        assert!(ruler.drawables().all(|d| d.render_order == RULER_RENDER_ORDER));
        assert_eq!(res.live_count(), 14);
        assert!((ruler.step() - 0.2).abs() < 1e-6);
        let texts: Vec<&str> = ruler.labels().iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["X", "Y", "Z", "step = 0.20"]);
        ruler.dispose(&mut res);
        assert_eq!(res.live_count(), 0);
    }

    #[test]
    fn test_ruler_size() {
        assert_eq!(ruler_size(None), 2.0);
        assert!((ruler_size(Some(&unit_box())) - 2.4).abs() < 1e-6);
    }

    #[test]
    fn test_guide_visibility_filter() {
        let mut res = GpuResources::new();
        let mut set = GuideSet::build(&mut res, guides::generate("p1", &unit_box()), false, false);
        set.apply_visibility(true, [true, false, true, true]);
        let visible: Vec<bool> = set.drawables().map(|d| d.visible).collect();
        assert_eq!(visible, vec![true, false, true, true]);
        set.apply_visibility(false, [true; 4]);
        assert!(set.drawables().all(|d| !d.visible));
    }

    #[test]
    fn test_guide_xray_flags() {
        let mut res = GpuResources::new();
        let descs = guides::generate("p1", &unit_box());
        let mut set = GuideSet::build(&mut res, descs.clone(), false, true);
        for d in set.drawables() {
            assert_eq!(d.material.opacity, GUIDE_XRAY_OPACITY);
            assert!(!d.material.depth_test && !d.material.depth_write);
            assert_eq!(d.render_order, GUIDE_XRAY_RENDER_ORDER);
        }
        set.set_xray(false);
        for (d, g) in set.drawables().zip(descs.iter()) {
            assert_eq!(d.material.opacity, g.opacity);
            assert!(d.material.depth_test);
            assert_eq!(d.render_order, GUIDE_RENDER_ORDER);
        }
    }

    #[test]
    fn test_guide_two_d_thins_cross_section() {
        let mut res = GpuResources::new();
        let descs = guides::generate("p1", &unit_box());
        let mut set = GuideSet::build(&mut res, descs.clone(), false, false);
        let ids: Vec<_> = set.drawables().map(|d| d.geometry.id).collect();
        set.set_two_d(true);
        let (scale, _, _) = set.drawables().next().unwrap().transform.to_scale_rotation_translation();
        assert!((scale.y - descs[0].thickness * GUIDE_TWO_D_SCALE).abs() < 1e-5);
        assert!((scale.x - descs[0].length()).abs() < 1e-4);
        // same geometry, no rebuild
        assert_eq!(set.drawables().map(|d| d.geometry.id).collect::<Vec<_>>(), ids);
    }

    #[test]
    fn test_guide_box_spans_segment() {
        let mut res = GpuResources::new();
        let descs = guides::generate("p9", &unit_box());
        let set = GuideSet::build(&mut res, descs.clone(), false, false);
        for (d, g) in set.drawables().zip(descs.iter()) {
            let a = d.transform.transform_point3(Vec3::new(-0.5, 0.0, 0.0));
            let b = d.transform.transform_point3(Vec3::new(0.5, 0.0, 0.0));
            assert!((a - g.start).length() < 1e-4);
            assert!((b - g.end).length() < 1e-4);
        }
    }
}
