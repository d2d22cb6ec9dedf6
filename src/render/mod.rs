//! Scene rendering on a host-owned graphics context.
//!
//! The overlay composites the scene onto the host's framebuffer, so a
//! renderer never owns the context it draws with. It is created when the
//! host hands over a context and disposed when that context is lost.

mod glow_renderer;
mod shaders;

pub use glow_renderer::GlowRenderer;

use crate::scene::{Camera, Scene};

/// Errors that can occur while creating a renderer or drawing a frame.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderError {
    /// A shader failed to compile or link.
    Shader(String),
    /// A GPU object could not be created.
    Resource(String),
    /// Drawing was attempted after the renderer was disposed.
    Disposed,
}

impl std::fmt::Display for RenderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RenderError::Shader(msg) => write!(f, "Shader error: {}", msg),
            RenderError::Resource(msg) => write!(f, "GPU resource error: {}", msg),
            RenderError::Disposed => write!(f, "Renderer has been disposed"),
        }
    }
}

impl std::error::Error for RenderError {}

/// A renderer bound to a graphics context supplied by the host.
///
/// Implementations must leave the context usable for the host after
/// [`SceneRenderer::reset_state`]; the host keeps drawing its own layers
/// into the same framebuffer.
pub trait SceneRenderer: Sized {
    /// Handle to the host's graphics context.
    type Context;

    /// Creates a renderer drawing into the given context.
    fn create(context: &Self::Context) -> Result<Self, RenderError>;

    /// Enables or disables clearing color and depth before each render.
    fn set_auto_clear(&mut self, enabled: bool);

    /// Sets the pixel viewport used for subsequent renders.
    fn set_viewport(&mut self, x: i32, y: i32, width: u32, height: u32);

    /// Draws the scene as seen through the camera's projection.
    fn render(&mut self, scene: &Scene, camera: &Camera) -> Result<(), RenderError>;

    /// Restores the context state the host expects after foreign rendering.
    fn reset_state(&mut self);

    /// Releases all GPU resources. The renderer must not be used afterwards.
    fn dispose(&mut self);
}
