use std::collections::HashMap;

use glow::HasContext;

use heartview_lib::render_loop::{DrawItem, FrameSnapshot};
use heartview_lib::scene::graph::{GeometryData, LightKind, MaterialKind};
use heartview_lib::scene::mesh::{LineMeshData, MeshData};
use heartview_lib::scene::ResourceId;

/// Directional lights the mesh shader accepts
const MAX_DIRECTIONAL: usize = 2;

// ── GPU handles ──────────────────────────────────────────────

enum GpuGeometry {
    Mesh {
        vao: glow::VertexArray,
        vbo: glow::Buffer,
        ibo: glow::Buffer,
        index_count: i32,
    },
    Lines {
        vao: glow::VertexArray,
        vbo: glow::Buffer,
        vertex_count: i32,
    },
}

impl GpuGeometry {
    unsafe fn delete(self, gl: &glow::Context) {
        match self {
            GpuGeometry::Mesh { vao, vbo, ibo, .. } => {
                gl.delete_vertex_array(vao);
                gl.delete_buffer(vbo);
                gl.delete_buffer(ibo);
            }
            GpuGeometry::Lines { vao, vbo, .. } => {
                gl.delete_vertex_array(vao);
                gl.delete_buffer(vbo);
            }
        }
    }
}

// ── Renderer ─────────────────────────────────────────────────

/// Draws [`FrameSnapshot`]s. GL objects are created the first time a geometry id is seen
/// and deleted when the frame reports the id as released.
pub struct GlRenderer {
    mesh_program: glow::Program,
    line_program: glow::Program,
    geometries: HashMap<ResourceId, GpuGeometry>,
}

impl GlRenderer {
    pub fn new(gl: &glow::Context) -> Result<Self, String> {
        let mesh_program = compile_program(gl, MESH_VERT, MESH_FRAG)?;
        let line_program = compile_program(gl, LINE_VERT, LINE_FRAG)?;
        Ok(Self {
            mesh_program,
            line_program,
            geometries: HashMap::new(),
        })
    }

    pub fn uploaded(&self) -> usize {
        self.geometries.len()
    }

    /// Delete released objects and upload geometry seen for the first time
    fn sync(&mut self, gl: &glow::Context, frame: &FrameSnapshot) {
        for id in &frame.released {
            if let Some(geometry) = self.geometries.remove(id) {
                unsafe { geometry.delete(gl) };
            }
        }
        for item in &frame.items {
            if self.geometries.contains_key(&item.geometry.id) {
                continue;
            }
            let uploaded = match &item.geometry.data {
                GeometryData::Triangles(mesh) => upload_mesh(gl, mesh),
                GeometryData::Lines(lines) => upload_lines(gl, lines),
            };
            match uploaded {
                Ok(geometry) => {
                    self.geometries.insert(item.geometry.id, geometry);
                }
                Err(e) => tracing::error!("Failed to upload geometry {:?}: {e}", item.geometry.id),
            }
        }
    }

    /// Render one frame into `viewport` ([x, y, width, height] in pixels)
    pub fn paint(&mut self, gl: &glow::Context, frame: &FrameSnapshot, viewport: [f32; 4]) {
        self.sync(gl, frame);

        let mut ambient = glam::Vec3::ZERO;
        let mut dirs = [glam::Vec3::ZERO; MAX_DIRECTIONAL];
        let mut colors = [glam::Vec3::ZERO; MAX_DIRECTIONAL];
        let mut count = 0;
        for light in &frame.lights {
            let color = glam::Vec3::from(light.color) * light.intensity;
            match light.kind {
                LightKind::Ambient => ambient += color,
                LightKind::Directional if count < MAX_DIRECTIONAL => {
                    dirs[count] = light.position.normalize_or_zero();
                    colors[count] = color;
                    count += 1;
                }
                LightKind::Directional => {}
            }
        }

        unsafe {
            gl.viewport(
                viewport[0] as i32,
                viewport[1] as i32,
                viewport[2] as i32,
                viewport[3] as i32,
            );
            gl.scissor(
                viewport[0] as i32,
                viewport[1] as i32,
                viewport[2] as i32,
                viewport[3] as i32,
            );
            gl.enable(glow::SCISSOR_TEST);

            let bg = frame.background;
            gl.clear_color(bg[0], bg[1], bg[2], 1.0);
            gl.depth_mask(true);
            gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
            gl.depth_func(glow::LEQUAL);
            gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);

            gl.use_program(Some(self.mesh_program));
            set_uniform_vec3(gl, self.mesh_program, "u_ambient", &ambient);
            set_uniform_vec3(gl, self.mesh_program, "u_eye", &frame.eye);
            set_uniform_i32(gl, self.mesh_program, "u_light_count", count as i32);
            for i in 0..MAX_DIRECTIONAL {
                set_uniform_vec3(gl, self.mesh_program, &format!("u_light_dir[{i}]"), &dirs[i]);
                set_uniform_vec3(gl, self.mesh_program, &format!("u_light_color[{i}]"), &colors[i]);
            }

            for item in &frame.items {
                if let Some(geometry) = self.geometries.get(&item.geometry.id) {
                    self.draw_item(gl, frame, item, geometry);
                }
            }

            gl.polygon_mode(glow::FRONT_AND_BACK, glow::FILL);
            gl.depth_mask(true);
            gl.disable(glow::BLEND);
            gl.disable(glow::DEPTH_TEST);
            gl.disable(glow::SCISSOR_TEST);
            gl.use_program(None);
        }
    }

    unsafe fn draw_item(
        &self,
        gl: &glow::Context,
        frame: &FrameSnapshot,
        item: &DrawItem,
        geometry: &GpuGeometry,
    ) {
        let m = &item.material;
        let mvp = frame.view_projection * item.transform;

        if m.depth_test {
            gl.enable(glow::DEPTH_TEST);
        } else {
            gl.disable(glow::DEPTH_TEST);
        }
        gl.depth_mask(m.depth_write);
        if m.transparent {
            gl.enable(glow::BLEND);
        } else {
            gl.disable(glow::BLEND);
        }
        let alpha = if m.transparent { m.opacity } else { 1.0 };
        let color = glam::Vec3::from(m.color);

        match geometry {
            GpuGeometry::Mesh {
                vao,
                ibo,
                index_count,
                ..
            } => {
                let program = self.mesh_program;
                gl.use_program(Some(program));
                set_uniform_mat4(gl, program, "u_mvp", &mvp);
                set_uniform_mat4(gl, program, "u_model", &item.transform);
                set_uniform_vec3(gl, program, "u_color", &color);
                set_uniform_vec3(gl, program, "u_emissive", &glam::Vec3::from(m.emissive));
                set_uniform_f32(gl, program, "u_metalness", m.metalness);
                set_uniform_f32(gl, program, "u_roughness", m.roughness);
                set_uniform_f32(gl, program, "u_opacity", alpha);
                set_uniform_i32(gl, program, "u_unlit", (m.kind == MaterialKind::Basic) as i32);

                let mode = if m.wireframe { glow::LINE } else { glow::FILL };
                gl.polygon_mode(glow::FRONT_AND_BACK, mode);
                gl.bind_vertex_array(Some(*vao));
                gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(*ibo));
                gl.draw_elements(glow::TRIANGLES, *index_count, glow::UNSIGNED_INT, 0);
                gl.bind_vertex_array(None);
                gl.polygon_mode(glow::FRONT_AND_BACK, glow::FILL);
            }
            GpuGeometry::Lines {
                vao, vertex_count, ..
            } => {
                let program = self.line_program;
                gl.use_program(Some(program));
                set_uniform_mat4(gl, program, "u_mvp", &mvp);
                set_uniform_vec3(gl, program, "u_tint", &color);
                set_uniform_f32(gl, program, "u_opacity", alpha);
                gl.bind_vertex_array(Some(*vao));
                gl.draw_arrays(glow::LINES, 0, *vertex_count);
                gl.bind_vertex_array(None);
            }
        }
    }

    pub fn destroy(&mut self, gl: &glow::Context) {
        unsafe {
            for (_, geometry) in self.geometries.drain() {
                geometry.delete(gl);
            }
            gl.delete_program(self.mesh_program);
            gl.delete_program(self.line_program);
        }
    }
}

// ── GPU upload ───────────────────────────────────────────────

fn upload_mesh(gl: &glow::Context, data: &MeshData) -> Result<GpuGeometry, String> {
    unsafe {
        let vao = gl.create_vertex_array()?;
        gl.bind_vertex_array(Some(vao));

        let vbo = gl.create_buffer()?;
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
        gl.buffer_data_u8_slice(
            glow::ARRAY_BUFFER,
            cast_slice(&data.vertices),
            glow::STATIC_DRAW,
        );

        let stride = 9 * 4; // 9 floats * 4 bytes
        // position: location 0
        gl.enable_vertex_attrib_array(0);
        gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, stride, 0);
        // normal: location 1
        gl.enable_vertex_attrib_array(1);
        gl.vertex_attrib_pointer_f32(1, 3, glow::FLOAT, false, stride, 3 * 4);
        // color: location 2
        gl.enable_vertex_attrib_array(2);
        gl.vertex_attrib_pointer_f32(2, 3, glow::FLOAT, false, stride, 6 * 4);

        let ibo = gl.create_buffer()?;
        gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ibo));
        gl.buffer_data_u8_slice(
            glow::ELEMENT_ARRAY_BUFFER,
            cast_slice(&data.indices),
            glow::STATIC_DRAW,
        );

        gl.bind_vertex_array(None);

        Ok(GpuGeometry::Mesh {
            vao,
            vbo,
            ibo,
            index_count: data.indices.len() as i32,
        })
    }
}

fn upload_lines(gl: &glow::Context, data: &LineMeshData) -> Result<GpuGeometry, String> {
    unsafe {
        let vao = gl.create_vertex_array()?;
        gl.bind_vertex_array(Some(vao));

        let vbo = gl.create_buffer()?;
        gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
        gl.buffer_data_u8_slice(
            glow::ARRAY_BUFFER,
            cast_slice(&data.vertices),
            glow::STATIC_DRAW,
        );

        let stride = 7 * 4; // 7 floats * 4 bytes
        // position: location 0
        gl.enable_vertex_attrib_array(0);
        gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, stride, 0);
        // color: location 1
        gl.enable_vertex_attrib_array(1);
        gl.vertex_attrib_pointer_f32(1, 4, glow::FLOAT, false, stride, 3 * 4);

        gl.bind_vertex_array(None);

        Ok(GpuGeometry::Lines {
            vao,
            vbo,
            vertex_count: data.vertex_count() as i32,
        })
    }
}

// ── Shader compilation ───────────────────────────────────────

fn compile_program(gl: &glow::Context, vert_src: &str, frag_src: &str) -> Result<glow::Program, String> {
    unsafe {
        let program = gl.create_program()?;

        let vert = gl.create_shader(glow::VERTEX_SHADER)?;
        gl.shader_source(vert, vert_src);
        gl.compile_shader(vert);
        if !gl.get_shader_compile_status(vert) {
            return Err(format!("vertex shader: {}", gl.get_shader_info_log(vert)));
        }

        let frag = gl.create_shader(glow::FRAGMENT_SHADER)?;
        gl.shader_source(frag, frag_src);
        gl.compile_shader(frag);
        if !gl.get_shader_compile_status(frag) {
            return Err(format!("fragment shader: {}", gl.get_shader_info_log(frag)));
        }

        gl.attach_shader(program, vert);
        gl.attach_shader(program, frag);
        gl.link_program(program);
        if !gl.get_program_link_status(program) {
            return Err(format!("link: {}", gl.get_program_info_log(program)));
        }

        gl.delete_shader(vert);
        gl.delete_shader(frag);

        Ok(program)
    }
}

// ── Uniform setters ──────────────────────────────────────────

fn set_uniform_mat4(gl: &glow::Context, program: glow::Program, name: &str, mat: &glam::Mat4) {
    unsafe {
        let loc = gl.get_uniform_location(program, name);
        gl.uniform_matrix_4_f32_slice(loc.as_ref(), false, &mat.to_cols_array());
    }
}

fn set_uniform_vec3(gl: &glow::Context, program: glow::Program, name: &str, v: &glam::Vec3) {
    unsafe {
        let loc = gl.get_uniform_location(program, name);
        gl.uniform_3_f32(loc.as_ref(), v.x, v.y, v.z);
    }
}

fn set_uniform_f32(gl: &glow::Context, program: glow::Program, name: &str, v: f32) {
    unsafe {
        let loc = gl.get_uniform_location(program, name);
        gl.uniform_1_f32(loc.as_ref(), v);
    }
}

fn set_uniform_i32(gl: &glow::Context, program: glow::Program, name: &str, v: i32) {
    unsafe {
        let loc = gl.get_uniform_location(program, name);
        gl.uniform_1_i32(loc.as_ref(), v);
    }
}

// ── Byte cast helper ─────────────────────────────────────────

fn cast_slice<T: Copy>(slice: &[T]) -> &[u8] {
    unsafe { std::slice::from_raw_parts(slice.as_ptr() as *const u8, std::mem::size_of_val(slice)) }
}

// ── Shaders ──────────────────────────────────────────────────

const MESH_VERT: &str = r#"#version 330 core
uniform mat4 u_mvp;
uniform mat4 u_model;

layout(location = 0) in vec3 a_position;
layout(location = 1) in vec3 a_normal;
layout(location = 2) in vec3 a_color;

out vec3 v_world;
out vec3 v_normal;
out vec3 v_color;

void main() {
    gl_Position = u_mvp * vec4(a_position, 1.0);
    v_world = (u_model * vec4(a_position, 1.0)).xyz;
    v_normal = mat3(transpose(inverse(u_model))) * a_normal;
    v_color = a_color;
}
"#;

const MESH_FRAG: &str = r#"#version 330 core
uniform vec3 u_color;
uniform vec3 u_emissive;
uniform float u_metalness;
uniform float u_roughness;
uniform float u_opacity;
uniform int u_unlit;

uniform vec3 u_ambient;
uniform vec3 u_eye;
uniform int u_light_count;
uniform vec3 u_light_dir[2];
uniform vec3 u_light_color[2];

in vec3 v_world;
in vec3 v_normal;
in vec3 v_color;

out vec4 frag_color;

void main() {
    vec3 base = u_color * v_color;
    if (u_unlit == 1) {
        frag_color = vec4(base, u_opacity);
        return;
    }

    vec3 n = normalize(v_normal);
    vec3 v = normalize(u_eye - v_world);
    if (dot(n, v) < 0.0) {
        n = -n;
    }

    float shininess = mix(64.0, 2.0, u_roughness);
    vec3 spec_color = mix(vec3(0.04), base, u_metalness);
    vec3 diffuse_color = base * (1.0 - u_metalness * 0.9);

    vec3 light = u_ambient * diffuse_color;
    for (int i = 0; i < u_light_count; i++) {
        vec3 l = u_light_dir[i];
        float nl = max(dot(n, l), 0.0);
        vec3 h = normalize(l + v);
        float spec = pow(max(dot(n, h), 0.0), shininess) * (1.0 - u_roughness * 0.8);
        light += u_light_color[i] * (diffuse_color * nl + spec_color * spec);
    }

    frag_color = vec4(light + u_emissive, u_opacity);
}
"#;

const LINE_VERT: &str = r#"#version 330 core
uniform mat4 u_mvp;

layout(location = 0) in vec3 a_position;
layout(location = 1) in vec4 a_color;

out vec4 v_color;

void main() {
    gl_Position = u_mvp * vec4(a_position, 1.0);
    v_color = a_color;
}
"#;

const LINE_FRAG: &str = r#"#version 330 core
uniform vec3 u_tint;
uniform float u_opacity;

in vec4 v_color;
out vec4 frag_color;

void main() {
    frag_color = vec4(v_color.rgb * u_tint, v_color.a * u_opacity);
}
"#;
