//! Camera driven by an externally supplied projection.

use glam::DMat4;

/// Camera whose position, orientation and projection all live in a single
/// matrix supplied from outside every frame.
///
/// The matrix maps scene meters straight to clip space. It is treated as
/// opaque: it is never decomposed, and it is replaced wholesale whenever a
/// new one is set. It is kept in double precision; only rendering narrows it.
#[derive(Debug, Clone, Default)]
pub struct Camera {
    external_projection: Option<DMat4>,
}

impl Camera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the projection with the one supplied for the current frame.
    pub fn set_external_projection(&mut self, projection: DMat4) {
        self.external_projection = Some(projection);
    }

    /// The last projection applied, or `None` before the first frame.
    pub fn projection(&self) -> Option<DMat4> {
        self.external_projection
    }
}
