//! The seam between the overlay and the map host that drives it.

use crate::geo::GeoPoint;
use glam::DMat4;

/// Canvas size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewportSize {
    pub width: u32,
    pub height: u32,
}

impl ViewportSize {
    pub const ZERO: Self = Self {
        width: 0,
        height: 0,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// The host surface the overlay is bound to.
pub trait OverlayHost {
    /// Asks the host to draw a new frame at the next opportunity.
    fn request_redraw(&self);

    /// Whether the host still shows the overlay on a map.
    fn is_attached(&self) -> bool;
}

/// Per-frame camera transform provided by the host.
pub trait CameraTransformer {
    /// Column-major matrix mapping local meters anchored at `anchor` to
    /// clip space for the current map camera.
    fn from_lat_lng_altitude(&self, anchor: &GeoPoint) -> [f64; 16];

    /// The same matrix as a `glam` matrix.
    fn projection_at(&self, anchor: &GeoPoint) -> DMat4 {
        DMat4::from_cols_array(&self.from_lat_lng_altitude(anchor))
    }
}

/// Payload delivered when the host's graphics context becomes available.
pub struct ContextOptions<'a, C> {
    pub gl: &'a C,
    pub canvas_size: ViewportSize,
}

/// Payload delivered with every draw call.
pub struct DrawOptions<'a> {
    pub transformer: &'a dyn CameraTransformer,
    pub canvas_size: ViewportSize,
}
