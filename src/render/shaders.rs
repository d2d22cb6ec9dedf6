//! GLSL sources for the mesh program.
//!
//! The sources are version-agnostic. [`versioned`] prepends the version
//! declaration of the context and sets `NEW_SHADER_INTERFACE` so the same
//! code runs on WebGL 1/2 and desktop GL.

use egui_glow::ShaderVersion;

/// Number of directional lights the program supports.
pub const MAX_DIRECTIONAL_LIGHTS: usize = 4;

pub const MESH_VERTEX: &str = r#"
#if NEW_SHADER_INTERFACE
#define I in
#define O out
#else
#define I attribute
#define O varying
#endif

uniform mat4 u_mvp;
uniform mat3 u_normal_matrix;

I vec3 a_position;
I vec3 a_normal;

O vec3 v_normal;

void main() {
    v_normal = normalize(u_normal_matrix * a_normal);
    gl_Position = u_mvp * vec4(a_position, 1.0);
}
"#;

pub const MESH_FRAGMENT: &str = r#"
#ifdef GL_ES
precision mediump float;
#endif

#if NEW_SHADER_INTERFACE
#define I in
out vec4 out_color;
#define FRAG_COLOR out_color
#else
#define I varying
#define FRAG_COLOR gl_FragColor
#endif

#define MAX_DIRECTIONAL_LIGHTS 4

uniform vec4 u_color;
uniform vec3 u_hemi_sky;
uniform vec3 u_hemi_ground;
uniform vec3 u_hemi_direction;
uniform vec3 u_dir_color[MAX_DIRECTIONAL_LIGHTS];
uniform vec3 u_dir_direction[MAX_DIRECTIONAL_LIGHTS];

I vec3 v_normal;

void main() {
    vec3 normal = normalize(v_normal);
    if (!gl_FrontFacing) {
        normal = -normal;
    }

    float hemi_weight = 0.5 * dot(normal, u_hemi_direction) + 0.5;
    vec3 irradiance = mix(u_hemi_ground, u_hemi_sky, hemi_weight);

    for (int i = 0; i < MAX_DIRECTIONAL_LIGHTS; i++) {
        irradiance += u_dir_color[i] * max(dot(normal, u_dir_direction[i]), 0.0);
    }

    FRAG_COLOR = vec4(u_color.rgb * irradiance, u_color.a);
}
"#;

/// Prepends the version header the context understands.
pub fn versioned(version: &ShaderVersion, source: &str) -> String {
    format!(
        "{}\n#define NEW_SHADER_INTERFACE {}\n{}",
        version.version_declaration(),
        version.is_new_shader_interface() as i32,
        source
    )
}
