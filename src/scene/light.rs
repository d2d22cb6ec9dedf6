//! Scene lights.

use glam::Vec3;

/// Converts a `0xRRGGBB` color to linear-ish RGB in [0, 1].
pub fn color_from_hex(hex: u32) -> Vec3 {
    Vec3::new(
        ((hex >> 16) & 0xff) as f32 / 255.0,
        ((hex >> 8) & 0xff) as f32 / 255.0,
        (hex & 0xff) as f32 / 255.0,
    )
}

/// Ambient light blending between a sky and a ground color.
///
/// The "up" direction of the light is the direction of its world position
/// from the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HemisphereLight {
    pub sky_color: Vec3,
    pub ground_color: Vec3,
    pub intensity: f32,
}

/// Parallel light shining from its world position towards the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionalLight {
    pub color: Vec3,
    pub intensity: f32,
}

/// A light with its direction resolved to world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResolvedLight {
    Hemisphere {
        light: HemisphereLight,
        /// Unit vector pointing to the sky side
        direction: Vec3,
    },
    Directional {
        light: DirectionalLight,
        /// Unit vector pointing from the scene towards the light
        direction: Vec3,
    },
}

/// Direction of a light placed at `position`, falling back to straight up.
pub(crate) fn direction_from_position(position: Vec3) -> Vec3 {
    position.try_normalize().unwrap_or(Vec3::Z)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_from_hex() {
        assert_eq!(color_from_hex(0xffffff), Vec3::ONE);
        assert_eq!(color_from_hex(0x000000), Vec3::ZERO);

        let grey = color_from_hex(0x444444);
        assert!((grey.x - 68.0 / 255.0).abs() < 1e-6);
        assert_eq!(grey.x, grey.z);
    }

    #[test]
    fn test_direction_fallback() {
        assert_eq!(direction_from_position(Vec3::ZERO), Vec3::Z);
        assert_eq!(direction_from_position(Vec3::new(0.0, 0.0, 5.0)), Vec3::Z);
    }
}
