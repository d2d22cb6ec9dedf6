//! OpenGL / WebGL scene renderer built on `glow`.
//!
//! Meshes are drawn flat-shaded with Lambert lighting from the scene's
//! hemisphere and directional lights. Vertex buffers are cached per object
//! and re-uploaded only when a mesh's geometry version changes.

use super::shaders::{self, MAX_DIRECTIONAL_LIGHTS, MESH_FRAGMENT, MESH_VERTEX};
use super::{RenderError, SceneRenderer};
use crate::scene::{Camera, Mesh, ObjectId, ResolvedLight, Scene};
use egui_glow::ShaderVersion;
use glam::{Mat3, Mat4, Vec3};
use glow::HasContext as _;
use std::collections::HashMap;
use std::sync::Arc;

/// Position (3) + normal (3)
const FLOATS_PER_VERTEX: usize = 6;
const STRIDE_BYTES: i32 = (FLOATS_PER_VERTEX * std::mem::size_of::<f32>()) as i32;

/// Fixed-function state the renderer touches while drawing.
#[derive(Debug, Clone, Copy, PartialEq)]
struct FixedState {
    depth_test: bool,
    depth_func: u32,
    depth_mask: bool,
    blend: bool,
    blend_func: (u32, u32),
}

impl FixedState {
    /// State of the scene pass; blending is switched per mesh.
    const SCENE: Self = Self {
        depth_test: true,
        depth_func: glow::LEQUAL,
        depth_mask: true,
        blend: false,
        blend_func: (glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA),
    };

    /// GL defaults, the baseline the host expects back after each frame.
    const DEFAULT: Self = Self {
        depth_test: false,
        depth_func: glow::LESS,
        depth_mask: true,
        blend: false,
        blend_func: (glow::ONE, glow::ZERO),
    };

    unsafe fn apply(&self, gl: &glow::Context) {
        set_capability(gl, glow::DEPTH_TEST, self.depth_test);
        set_capability(gl, glow::BLEND, self.blend);
        gl.depth_func(self.depth_func);
        gl.depth_mask(self.depth_mask);
        gl.blend_func(self.blend_func.0, self.blend_func.1);
    }
}

unsafe fn set_capability(gl: &glow::Context, capability: u32, enabled: bool) {
    if enabled {
        gl.enable(capability);
    } else {
        gl.disable(capability);
    }
}

struct GpuMesh {
    buffer: glow::Buffer,
    vertex_count: i32,
    version: u64,
}

#[derive(Default)]
struct Uniforms {
    mvp: Option<glow::UniformLocation>,
    normal_matrix: Option<glow::UniformLocation>,
    color: Option<glow::UniformLocation>,
    hemi_sky: Option<glow::UniformLocation>,
    hemi_ground: Option<glow::UniformLocation>,
    hemi_direction: Option<glow::UniformLocation>,
    dir_color: Option<glow::UniformLocation>,
    dir_direction: Option<glow::UniformLocation>,
}

/// Renders a [`Scene`] into a shared `glow` context.
pub struct GlowRenderer {
    gl: Arc<glow::Context>,
    program: Option<glow::Program>,
    uniforms: Uniforms,
    position_attrib: u32,
    normal_attrib: u32,
    /// `None` on contexts without vertex array objects (WebGL 1, GL 2.1)
    vertex_array: Option<glow::VertexArray>,
    meshes: HashMap<ObjectId, GpuMesh>,
    viewport: [i32; 4],
    auto_clear: bool,
}

impl SceneRenderer for GlowRenderer {
    type Context = Arc<glow::Context>;

    fn create(context: &Self::Context) -> Result<Self, RenderError> {
        let gl = Arc::clone(context);
        let shader_version = ShaderVersion::get(&gl);
        log::info!("Creating scene renderer ({:?})", shader_version);

        let program = unsafe { link_program(&gl, &shader_version)? };

        let (position_attrib, normal_attrib, uniforms) = unsafe {
            let attrib = |name: &str| {
                gl.get_attrib_location(program, name).ok_or_else(|| {
                    RenderError::Shader(format!("attribute {} not found in program", name))
                })
            };
            let position = attrib("a_position");
            let normal = attrib("a_normal");
            let (position, normal) = match (position, normal) {
                (Ok(position), Ok(normal)) => (position, normal),
                (Err(e), _) | (_, Err(e)) => {
                    gl.delete_program(program);
                    return Err(e);
                }
            };

            let uniform = |name: &str| gl.get_uniform_location(program, name);
            let uniforms = Uniforms {
                mvp: uniform("u_mvp"),
                normal_matrix: uniform("u_normal_matrix"),
                color: uniform("u_color"),
                hemi_sky: uniform("u_hemi_sky"),
                hemi_ground: uniform("u_hemi_ground"),
                hemi_direction: uniform("u_hemi_direction"),
                dir_color: uniform("u_dir_color[0]"),
                dir_direction: uniform("u_dir_direction[0]"),
            };
            (position, normal, uniforms)
        };

        let vertex_array = if matches!(shader_version, ShaderVersion::Gl140 | ShaderVersion::Es300)
        {
            match unsafe { gl.create_vertex_array() } {
                Ok(vao) => Some(vao),
                Err(e) => {
                    unsafe { gl.delete_program(program) };
                    return Err(RenderError::Resource(e));
                }
            }
        } else {
            None
        };

        Ok(Self {
            gl,
            program: Some(program),
            uniforms,
            position_attrib,
            normal_attrib,
            vertex_array,
            meshes: HashMap::new(),
            viewport: [0, 0, 0, 0],
            auto_clear: true,
        })
    }

    fn set_auto_clear(&mut self, enabled: bool) {
        self.auto_clear = enabled;
    }

    fn set_viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.viewport = [x, y, width as i32, height as i32];
    }

    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<(), RenderError> {
        let program = self.program.ok_or(RenderError::Disposed)?;
        let Some(projection) = camera.projection() else {
            return Ok(());
        };
        let projection = projection.as_mat4();

        self.sync_buffers(scene)?;
        let meshes = scene.meshes();
        let lights = LightUniforms::from_lights(&scene.lights());
        let gl = &self.gl;
        let [x, y, width, height] = self.viewport;

        unsafe {
            gl.viewport(x, y, width, height);
            if self.auto_clear {
                gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
            }

            FixedState::SCENE.apply(gl);

            gl.use_program(Some(program));
            if let Some(vao) = self.vertex_array {
                gl.bind_vertex_array(Some(vao));
            }

            let u = &self.uniforms;
            gl.uniform_3_f32_slice(u.hemi_sky.as_ref(), &lights.hemi_sky.to_array());
            gl.uniform_3_f32_slice(u.hemi_ground.as_ref(), &lights.hemi_ground.to_array());
            gl.uniform_3_f32_slice(u.hemi_direction.as_ref(), &lights.hemi_direction.to_array());
            gl.uniform_3_f32_slice(u.dir_color.as_ref(), &flatten(&lights.dir_color));
            gl.uniform_3_f32_slice(u.dir_direction.as_ref(), &flatten(&lights.dir_direction));

            for (id, mesh, world) in &meshes {
                let Some(gpu) = self.meshes.get(id) else {
                    continue;
                };
                if gpu.vertex_count == 0 {
                    continue;
                }

                let mvp = projection * *world;
                gl.uniform_matrix_4_f32_slice(u.mvp.as_ref(), false, &mvp.to_cols_array());
                gl.uniform_matrix_3_f32_slice(
                    u.normal_matrix.as_ref(),
                    false,
                    &normal_matrix(world).to_cols_array(),
                );
                gl.uniform_4_f32_slice(u.color.as_ref(), &mesh.color.to_array());

                set_capability(gl, glow::BLEND, mesh.color.w < 1.0);

                gl.bind_buffer(glow::ARRAY_BUFFER, Some(gpu.buffer));
                gl.enable_vertex_attrib_array(self.position_attrib);
                gl.vertex_attrib_pointer_f32(
                    self.position_attrib,
                    3,
                    glow::FLOAT,
                    false,
                    STRIDE_BYTES,
                    0,
                );
                gl.enable_vertex_attrib_array(self.normal_attrib);
                gl.vertex_attrib_pointer_f32(
                    self.normal_attrib,
                    3,
                    glow::FLOAT,
                    false,
                    STRIDE_BYTES,
                    STRIDE_BYTES / 2,
                );

                gl.draw_arrays(glow::TRIANGLES, 0, gpu.vertex_count);
            }
        }

        Ok(())
    }

    fn reset_state(&mut self) {
        let gl = &self.gl;
        unsafe {
            if self.vertex_array.is_some() {
                gl.bind_vertex_array(None);
            } else {
                gl.disable_vertex_attrib_array(self.position_attrib);
                gl.disable_vertex_attrib_array(self.normal_attrib);
            }
            gl.bind_buffer(glow::ARRAY_BUFFER, None);
            gl.use_program(None);
            FixedState::DEFAULT.apply(gl);
        }
    }

    fn dispose(&mut self) {
        let gl = &self.gl;
        unsafe {
            for (_, mesh) in self.meshes.drain() {
                gl.delete_buffer(mesh.buffer);
            }
            if let Some(vao) = self.vertex_array.take() {
                gl.delete_vertex_array(vao);
            }
            if let Some(program) = self.program.take() {
                gl.delete_program(program);
            }
        }
        log::info!("Scene renderer disposed");
    }
}

impl GlowRenderer {
    /// Uploads new or changed meshes and frees buffers of removed ones.
    fn sync_buffers(&mut self, scene: &Scene) -> Result<(), RenderError> {
        let stale: Vec<ObjectId> = self
            .meshes
            .keys()
            .filter(|id| scene.get(**id).and_then(|o| o.as_mesh()).is_none())
            .copied()
            .collect();
        for id in stale {
            if let Some(mesh) = self.meshes.remove(&id) {
                unsafe { self.gl.delete_buffer(mesh.buffer) };
            }
        }

        for (id, mesh, _) in scene.meshes() {
            if self.meshes.get(&id).map(|gpu| gpu.version) == Some(mesh.version()) {
                continue;
            }

            let vertices = pack_vertices(mesh);
            let bytes = f32_bytes(&vertices);
            let buffer = match self.meshes.get(&id) {
                Some(gpu) => gpu.buffer,
                None => unsafe { self.gl.create_buffer() }.map_err(RenderError::Resource)?,
            };

            unsafe {
                self.gl.bind_buffer(glow::ARRAY_BUFFER, Some(buffer));
                self.gl
                    .buffer_data_u8_slice(glow::ARRAY_BUFFER, &bytes, glow::STATIC_DRAW);
            }
            log::debug!(
                "Uploaded mesh {:?}: {} vertices (version {})",
                id,
                vertices.len() / FLOATS_PER_VERTEX,
                mesh.version()
            );

            self.meshes.insert(
                id,
                GpuMesh {
                    buffer,
                    vertex_count: (vertices.len() / FLOATS_PER_VERTEX) as i32,
                    version: mesh.version(),
                },
            );
        }
        Ok(())
    }
}

unsafe fn link_program(
    gl: &glow::Context,
    version: &ShaderVersion,
) -> Result<glow::Program, RenderError> {
    let program = gl.create_program().map_err(RenderError::Resource)?;

    let sources = [
        (glow::VERTEX_SHADER, MESH_VERTEX),
        (glow::FRAGMENT_SHADER, MESH_FRAGMENT),
    ];
    let mut compiled = Vec::with_capacity(sources.len());
    for (shader_type, source) in sources {
        let shader = match gl.create_shader(shader_type) {
            Ok(shader) => shader,
            Err(e) => {
                cleanup(gl, program, &compiled);
                return Err(RenderError::Resource(e));
            }
        };
        gl.shader_source(shader, &shaders::versioned(version, source));
        gl.compile_shader(shader);
        compiled.push(shader);

        if !gl.get_shader_compile_status(shader) {
            let log = gl.get_shader_info_log(shader);
            log::error!("Failed to compile shader: {}", log);
            cleanup(gl, program, &compiled);
            return Err(RenderError::Shader(log));
        }
        gl.attach_shader(program, shader);
    }

    gl.link_program(program);
    if !gl.get_program_link_status(program) {
        let log = gl.get_program_info_log(program);
        log::error!("Failed to link shader program: {}", log);
        cleanup(gl, program, &compiled);
        return Err(RenderError::Shader(log));
    }

    for shader in compiled {
        gl.detach_shader(program, shader);
        gl.delete_shader(shader);
    }
    Ok(program)
}

unsafe fn cleanup(gl: &glow::Context, program: glow::Program, shaders: &[glow::Shader]) {
    for shader in shaders {
        gl.delete_shader(*shader);
    }
    gl.delete_program(program);
}

/// Light parameters in the layout the mesh program expects.
#[derive(Debug, Clone, PartialEq)]
struct LightUniforms {
    hemi_sky: Vec3,
    hemi_ground: Vec3,
    hemi_direction: Vec3,
    dir_color: [Vec3; MAX_DIRECTIONAL_LIGHTS],
    dir_direction: [Vec3; MAX_DIRECTIONAL_LIGHTS],
}

impl LightUniforms {
    /// Uses the first hemisphere light and the first few directional
    /// lights; unused slots stay black.
    fn from_lights(lights: &[ResolvedLight]) -> Self {
        let mut uniforms = Self {
            hemi_sky: Vec3::ZERO,
            hemi_ground: Vec3::ZERO,
            hemi_direction: Vec3::Z,
            dir_color: [Vec3::ZERO; MAX_DIRECTIONAL_LIGHTS],
            dir_direction: [Vec3::Z; MAX_DIRECTIONAL_LIGHTS],
        };

        let mut hemisphere_set = false;
        let mut directional = 0;
        for light in lights {
            match *light {
                ResolvedLight::Hemisphere { light, direction } if !hemisphere_set => {
                    uniforms.hemi_sky = light.sky_color * light.intensity;
                    uniforms.hemi_ground = light.ground_color * light.intensity;
                    uniforms.hemi_direction = direction;
                    hemisphere_set = true;
                }
                ResolvedLight::Directional { light, direction }
                    if directional < MAX_DIRECTIONAL_LIGHTS =>
                {
                    uniforms.dir_color[directional] = light.color * light.intensity;
                    uniforms.dir_direction[directional] = direction;
                    directional += 1;
                }
                _ => log::debug!("Ignoring light beyond shader limits: {:?}", light),
            }
        }
        uniforms
    }
}

/// Expands the mesh into a flat-shaded triangle list of position + normal.
fn pack_vertices(mesh: &Mesh) -> Vec<f32> {
    let mut out = Vec::with_capacity(mesh.triangle_count() * 3 * FLOATS_PER_VERTEX);
    for [a, b, c] in mesh.triangles() {
        let normal = (b - a).cross(c - a).try_normalize().unwrap_or(Vec3::Z);
        for corner in [a, b, c] {
            out.extend_from_slice(&corner.to_array());
            out.extend_from_slice(&normal.to_array());
        }
    }
    out
}

/// Inverse transpose of the linear part; identity if it collapses space.
fn normal_matrix(world: &Mat4) -> Mat3 {
    let linear = Mat3::from_mat4(*world);
    let determinant = linear.determinant();
    if determinant == 0.0 || !determinant.is_finite() {
        return Mat3::IDENTITY;
    }
    let matrix = linear.inverse().transpose();
    if matrix.is_finite() {
        matrix
    } else {
        Mat3::IDENTITY
    }
}

fn flatten(values: &[Vec3]) -> Vec<f32> {
    values.iter().flat_map(|v| v.to_array()).collect()
}

fn f32_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_ne_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::{DirectionalLight, HemisphereLight};
    use glam::Quat;

    #[test]
    fn test_pack_vertices_flat_normals() {
        let mesh = Mesh::from_triangles(vec![Vec3::ZERO, Vec3::X, Vec3::Y]).unwrap();

        let packed = pack_vertices(&mesh);

        assert_eq!(packed.len(), 3 * FLOATS_PER_VERTEX);
        assert_eq!(&packed[0..6], &[0.0, 0.0, 0.0, 0.0, 0.0, 1.0]);
        assert_eq!(&packed[6..9], &[1.0, 0.0, 0.0]);
        assert_eq!(&packed[15..18], &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_degenerate_triangle_gets_fallback_normal() {
        let mesh = Mesh::from_triangles(vec![Vec3::X, Vec3::X, Vec3::X]).unwrap();

        let packed = pack_vertices(&mesh);

        assert_eq!(&packed[3..6], &[0.0, 0.0, 1.0]);
    }

    #[test]
    fn test_light_uniforms_take_first_hemisphere() {
        let hemisphere = |intensity: f32| ResolvedLight::Hemisphere {
            light: HemisphereLight {
                sky_color: Vec3::ONE,
                ground_color: Vec3::splat(0.5),
                intensity,
            },
            direction: Vec3::Z,
        };
        let sun = ResolvedLight::Directional {
            light: DirectionalLight {
                color: Vec3::ONE,
                intensity: 2.0,
            },
            direction: Vec3::Y,
        };

        let uniforms = LightUniforms::from_lights(&[hemisphere(1.0), sun, hemisphere(3.0)]);

        assert_eq!(uniforms.hemi_sky, Vec3::ONE);
        assert_eq!(uniforms.hemi_ground, Vec3::splat(0.5));
        assert_eq!(uniforms.dir_color[0], Vec3::splat(2.0));
        assert_eq!(uniforms.dir_direction[0], Vec3::Y);
        assert_eq!(uniforms.dir_color[1], Vec3::ZERO);
    }

    #[test]
    fn test_directional_lights_capped() {
        let sun = ResolvedLight::Directional {
            light: DirectionalLight {
                color: Vec3::ONE,
                intensity: 1.0,
            },
            direction: Vec3::Z,
        };

        let uniforms = LightUniforms::from_lights(&[sun; MAX_DIRECTIONAL_LIGHTS + 2]);

        assert!(uniforms.dir_color.iter().all(|c| *c == Vec3::ONE));
    }

    #[test]
    fn test_normal_matrix_undoes_non_uniform_scale() {
        let world = Mat4::from_scale_rotation_translation(
            Vec3::new(2.0, 1.0, 1.0),
            Quat::IDENTITY,
            Vec3::new(5.0, 0.0, 0.0),
        );

        let matrix = normal_matrix(&world);

        assert_eq!(matrix * Vec3::X, Vec3::new(0.5, 0.0, 0.0));
        assert_eq!(normal_matrix(&Mat4::ZERO), Mat3::IDENTITY);
    }

    #[test]
    fn test_normal_matrix_of_tiny_scale() {
        let world = Mat4::from_scale(Vec3::splat(0.001));

        let matrix = normal_matrix(&world);

        assert_ne!(matrix, Mat3::IDENTITY);
        assert!(((matrix * Vec3::Z).normalize() - Vec3::Z).length() < 1e-6);
    }

    #[test]
    fn test_default_state_is_gl_baseline() {
        let baseline = FixedState::DEFAULT;

        assert!(!baseline.depth_test);
        assert!(!baseline.blend);
        assert!(baseline.depth_mask);
        assert_eq!(baseline.depth_func, glow::LESS);
        assert_eq!(baseline.blend_func, (glow::ONE, glow::ZERO));
        assert_ne!(FixedState::SCENE.blend_func, baseline.blend_func);
    }

    #[test]
    fn test_f32_bytes_length() {
        assert_eq!(f32_bytes(&[1.0, 2.0]).len(), 8);
        assert_eq!(flatten(&[Vec3::X, Vec3::Y]), vec![1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    }
}
