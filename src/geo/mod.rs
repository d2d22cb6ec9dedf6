//! Geographic coordinates and the local tangent-plane transform.
//!
//! Scene content is positioned in meters relative to a geographic reference
//! point. This module converts between the two representations.

mod point;
mod transform;

pub use point::GeoPoint;
pub use transform::{
    destination, distance, forward, inverse, true_bearing, EARTH_RADIUS_METERS,
};
