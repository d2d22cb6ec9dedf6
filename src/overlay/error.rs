use super::HookKind;
use crate::render::RenderError;

/// Errors surfaced to the host by overlay lifecycle calls.
#[derive(Debug)]
pub enum OverlayError {
    /// The host environment lacks something the overlay needs.
    Setup(String),
    /// A renderer could not be created for a restored context.
    Renderer(RenderError),
    /// Rendering a frame failed.
    Render(RenderError),
    /// A user hook returned an error.
    Hook {
        kind: HookKind,
        source: Box<dyn std::error::Error>,
    },
}

impl std::fmt::Display for OverlayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OverlayError::Setup(msg) => write!(f, "Overlay setup failed: {}", msg),
            OverlayError::Renderer(e) => write!(f, "Failed to create renderer: {}", e),
            OverlayError::Render(e) => write!(f, "Failed to render frame: {}", e),
            OverlayError::Hook { kind, source } => write!(f, "{} hook failed: {}", kind, source),
        }
    }
}

impl std::error::Error for OverlayError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            OverlayError::Renderer(e) | OverlayError::Render(e) => Some(e),
            OverlayError::Hook { source, .. } => Some(source.as_ref()),
            OverlayError::Setup(_) => None,
        }
    }
}
