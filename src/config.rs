//! Overlay configuration.
//!
//! Everything has a sensible default, so a config can be built in code with
//! the `with_*` setters or loaded from a partial JSON document.

use crate::geo::GeoPoint;
use crate::scene::{color_from_hex, DirectionalLight, HemisphereLight, Object3D, ObjectKind, Scene};
use glam::Vec3;
use serde::{Deserialize, Serialize};
use web_time::Duration;

/// Errors that can occur while loading a configuration.
#[derive(Debug, Clone)]
pub enum ConfigError {
    /// The document is not valid JSON for an overlay config.
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Parse(msg) => write!(f, "Invalid overlay config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration for an [`OverlayAdapter`](crate::overlay::OverlayAdapter).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// Geographic origin of the scene
    pub reference_point: GeoPoint,
    /// Lights added to a fresh scene
    pub lighting: LightingConfig,
    /// Update hooks slower than this are reported
    pub frame_budget_ms: f64,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            reference_point: GeoPoint::default(),
            lighting: LightingConfig::default(),
            frame_budget_ms: 16.0,
        }
    }
}

impl OverlayConfig {
    pub fn new(reference_point: GeoPoint) -> Self {
        Self {
            reference_point,
            ..Default::default()
        }
    }

    /// Parses a JSON document; missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn with_reference_point(mut self, reference_point: GeoPoint) -> Self {
        self.reference_point = reference_point;
        self
    }

    pub fn with_lighting(mut self, lighting: LightingConfig) -> Self {
        self.lighting = lighting;
        self
    }

    pub fn with_frame_budget_ms(mut self, frame_budget_ms: f64) -> Self {
        self.frame_budget_ms = frame_budget_ms;
        self
    }

    pub fn frame_budget(&self) -> Duration {
        Duration::from_micros((self.frame_budget_ms.max(0.0) * 1000.0).round() as u64)
    }
}

/// Default lights, roughly matching how the map lights its buildings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    /// Start with an unlit scene when false
    pub enabled: bool,
    /// Hemisphere sky color as `0xRRGGBB`
    pub sky_color: u32,
    /// Hemisphere ground color as `0xRRGGBB`
    pub ground_color: u32,
    pub hemisphere_intensity: f32,
    /// Direction of the hemisphere light's sky side (normalized on use)
    pub hemisphere_direction: [f32; 3],
    /// Directional light color as `0xRRGGBB`
    pub directional_color: u32,
    pub directional_intensity: f32,
    /// Position the directional light shines from
    pub directional_position: [f32; 3],
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sky_color: 0xffffff,
            ground_color: 0x444444,
            hemisphere_intensity: 1.0,
            hemisphere_direction: [0.0, -0.2, 1.0],
            directional_color: 0xffffff,
            directional_intensity: 1.0,
            directional_position: [0.0, 10.0, 100.0],
        }
    }
}

impl LightingConfig {
    /// Adds the configured lights to the scene.
    pub fn apply(&self, scene: &mut Scene) {
        if !self.enabled {
            return;
        }

        let hemisphere = HemisphereLight {
            sky_color: color_from_hex(self.sky_color),
            ground_color: color_from_hex(self.ground_color),
            intensity: self.hemisphere_intensity,
        };
        let direction = Vec3::from(self.hemisphere_direction)
            .try_normalize()
            .unwrap_or(Vec3::Z);
        scene.add(
            Object3D::new("hemisphere light", ObjectKind::HemisphereLight(hemisphere))
                .with_translation(direction),
        );

        let directional = DirectionalLight {
            color: color_from_hex(self.directional_color),
            intensity: self.directional_intensity,
        };
        scene.add(
            Object3D::new("directional light", ObjectKind::DirectionalLight(directional))
                .with_translation(Vec3::from(self.directional_position)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::ResolvedLight;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = OverlayConfig::from_json(
            r#"{"reference_point": {"lat": 53.554, "lng": 9.99}, "frame_budget_ms": 8}"#,
        )
        .unwrap();

        assert_eq!(config.reference_point, GeoPoint::new(53.554, 9.99));
        assert_eq!(config.frame_budget(), Duration::from_millis(8));
        assert_eq!(config.lighting, LightingConfig::default());
    }

    #[test]
    fn test_invalid_json() {
        let result = OverlayConfig::from_json(r#"{"reference_point": 12}"#);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_builder() {
        let config = OverlayConfig::new(GeoPoint::new(1.0, 2.0))
            .with_frame_budget_ms(33.0)
            .with_lighting(LightingConfig {
                enabled: false,
                ..Default::default()
            });

        assert_eq!(config.reference_point.longitude, 2.0);
        assert_eq!(config.frame_budget_ms, 33.0);
        assert!(!config.lighting.enabled);
    }

    #[test]
    fn test_default_lighting_adds_two_lights() {
        let mut scene = Scene::new();
        LightingConfig::default().apply(&mut scene);

        let lights = scene.lights();
        assert_eq!(lights.len(), 2);
        match lights[0] {
            ResolvedLight::Hemisphere { light, direction } => {
                assert_eq!(light.sky_color, Vec3::ONE);
                assert!((direction - Vec3::new(0.0, -0.2, 1.0).normalize()).length() < 1e-6);
            }
            other => panic!("expected hemisphere light, got {:?}", other),
        }
    }

    #[test]
    fn test_disabled_lighting_leaves_scene_empty() {
        let mut scene = Scene::new();
        LightingConfig {
            enabled: false,
            ..Default::default()
        }
        .apply(&mut scene);

        assert!(scene.is_empty());
    }
}
