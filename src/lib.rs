#![warn(clippy::all)]

//! Map Scene Overlay - renders a 3D scene on top of a WebGL map.
//!
//! Scene content is placed in meters around a geographic reference point.
//! The map host drives everything: it hands over its graphics context,
//! supplies a camera matrix for every frame and decides when frames are
//! drawn. [`OverlayAdapter`] turns those host calls into scene updates,
//! rendering and picking.
//!
//! On `wasm32` the [`web`] module binds the adapter to
//! `google.maps.WebGLOverlayView`.

pub mod config;
pub mod geo;
pub mod overlay;
pub mod render;
pub mod scene;

#[cfg(target_arch = "wasm32")]
pub mod web;

pub use config::{ConfigError, LightingConfig, OverlayConfig};
pub use geo::GeoPoint;
pub use overlay::{
    CameraTransformer, ContextOptions, DrawOptions, FrameContext, HookKind, HookResult,
    OverlayAdapter, OverlayError, OverlayHost, OverlayState, RaycastOptions, ViewportSize,
};
pub use render::{GlowRenderer, RenderError, SceneRenderer};
pub use scene::{Intersection, Mesh, Object3D, ObjectId, Scene};
