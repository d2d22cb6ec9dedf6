//! Triangle mesh geometry.

use super::SceneError;
use glam::{Vec3, Vec4};
use std::sync::atomic::{AtomicU64, Ordering};

/// Source of geometry versions, shared by all meshes so that a mesh
/// replaced wholesale never repeats the version of its predecessor.
static NEXT_VERSION: AtomicU64 = AtomicU64::new(1);

fn next_version() -> u64 {
    NEXT_VERSION.fetch_add(1, Ordering::Relaxed)
}

/// Axis-aligned bounding box in object-local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    /// Smallest box containing all points, or `None` for an empty slice.
    pub fn from_points(points: &[Vec3]) -> Option<Self> {
        let first = *points.first()?;
        let (min, max) = points
            .iter()
            .fold((first, first), |(min, max), p| (min.min(*p), max.max(*p)));
        Some(Self { min, max })
    }
}

/// Triangle geometry with a flat RGBA color.
///
/// Geometry is validated on construction. Every new geometry gets a fresh,
/// process-wide unique `version` so GPU-side copies can tell when they are
/// stale.
#[derive(Debug, Clone)]
pub struct Mesh {
    positions: Vec<Vec3>,
    indices: Option<Vec<u32>>,
    bounds: Option<Aabb>,
    version: u64,
    /// Linear RGBA color; alpha below 1 renders blended
    pub color: Vec4,
}

impl Mesh {
    /// Creates a mesh from a triangle list (three positions per triangle).
    pub fn from_triangles(positions: Vec<Vec3>) -> Result<Self, SceneError> {
        validate(&positions, None)?;
        Ok(Self::build(positions, None))
    }

    /// Creates a mesh from shared positions and triangle indices.
    pub fn indexed(positions: Vec<Vec3>, indices: Vec<u32>) -> Result<Self, SceneError> {
        validate(&positions, Some(&indices))?;
        Ok(Self::build(positions, Some(indices)))
    }

    fn build(positions: Vec<Vec3>, indices: Option<Vec<u32>>) -> Self {
        Self {
            bounds: Aabb::from_points(&positions),
            positions,
            indices,
            version: next_version(),
            color: Vec4::ONE,
        }
    }

    /// Sets the color, builder style.
    pub fn with_color(mut self, color: Vec4) -> Self {
        self.color = color;
        self
    }

    /// Replaces the geometry, keeping the color.
    pub fn set_geometry(
        &mut self,
        positions: Vec<Vec3>,
        indices: Option<Vec<u32>>,
    ) -> Result<(), SceneError> {
        validate(&positions, indices.as_deref())?;
        self.bounds = Aabb::from_points(&positions);
        self.positions = positions;
        self.indices = indices;
        self.version = next_version();
        Ok(())
    }

    pub fn positions(&self) -> &[Vec3] {
        &self.positions
    }

    pub fn indices(&self) -> Option<&[u32]> {
        self.indices.as_deref()
    }

    /// Local-space bounds; `None` for empty geometry.
    pub fn bounds(&self) -> Option<Aabb> {
        self.bounds
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of triangles in the mesh.
    pub fn triangle_count(&self) -> usize {
        match &self.indices {
            Some(indices) => indices.len() / 3,
            None => self.positions.len() / 3,
        }
    }

    /// Iterates over the triangles as corner positions.
    pub fn triangles(&self) -> impl Iterator<Item = [Vec3; 3]> + '_ {
        (0..self.triangle_count()).map(move |face| {
            let corner = |i: usize| match &self.indices {
                Some(indices) => self.positions[indices[face * 3 + i] as usize],
                None => self.positions[face * 3 + i],
            };
            [corner(0), corner(1), corner(2)]
        })
    }
}

fn validate(positions: &[Vec3], indices: Option<&[u32]>) -> Result<(), SceneError> {
    match indices {
        None if positions.len() % 3 != 0 => Err(SceneError::InvalidGeometry(format!(
            "triangle list has {} positions, expected a multiple of 3",
            positions.len()
        ))),
        Some(indices) if indices.len() % 3 != 0 => Err(SceneError::InvalidGeometry(format!(
            "index buffer has {} entries, expected a multiple of 3",
            indices.len()
        ))),
        Some(indices) => match indices.iter().find(|i| **i as usize >= positions.len()) {
            Some(index) => Err(SceneError::InvalidGeometry(format!(
                "index {} out of range for {} positions",
                index,
                positions.len()
            ))),
            None => Ok(()),
        },
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Mesh {
        Mesh::indexed(
            vec![
                Vec3::new(-1.0, -1.0, 0.0),
                Vec3::new(1.0, -1.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(-1.0, 1.0, 0.0),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
        .unwrap()
    }

    #[test]
    fn test_indexed_triangles() {
        let mesh = quad();
        let triangles: Vec<_> = mesh.triangles().collect();

        assert_eq!(mesh.triangle_count(), 2);
        assert_eq!(triangles[1][2], Vec3::new(-1.0, 1.0, 0.0));
    }

    #[test]
    fn test_bounds() {
        let bounds = quad().bounds().unwrap();

        assert_eq!(bounds.min, Vec3::new(-1.0, -1.0, 0.0));
        assert_eq!(bounds.max, Vec3::new(1.0, 1.0, 0.0));
    }

    #[test]
    fn test_rejects_out_of_range_index() {
        let result = Mesh::indexed(vec![Vec3::ZERO; 3], vec![0, 1, 3]);

        assert!(matches!(result, Err(SceneError::InvalidGeometry(_))));
    }

    #[test]
    fn test_rejects_partial_triangle() {
        assert!(Mesh::from_triangles(vec![Vec3::ZERO; 4]).is_err());
    }

    #[test]
    fn test_set_geometry_changes_version() {
        let mut mesh = quad();
        let before = mesh.version();

        mesh.set_geometry(vec![Vec3::X, Vec3::Y, Vec3::Z], None).unwrap();
        let after = mesh.version();

        assert_ne!(after, before);
        assert_eq!(mesh.triangle_count(), 1);
        // Invalid geometry leaves the mesh untouched.
        assert!(mesh.set_geometry(vec![Vec3::X], None).is_err());
        assert_eq!(mesh.version(), after);
    }

    #[test]
    fn test_replacement_mesh_gets_new_version() {
        let mut mesh = quad();
        let before = mesh.version();

        mesh = Mesh::from_triangles(vec![Vec3::X, Vec3::Y, Vec3::Z]).unwrap();

        assert_ne!(mesh.version(), before);
        assert_eq!(mesh.clone().version(), mesh.version());
    }

    #[test]
    fn test_with_color_keeps_geometry() {
        let mesh = quad();
        let version = mesh.version();

        let tinted = mesh.with_color(Vec4::new(1.0, 0.0, 0.0, 0.5));

        assert_eq!(tinted.color, Vec4::new(1.0, 0.0, 0.0, 0.5));
        assert_eq!(tinted.version(), version);
        assert_eq!(quad().color, Vec4::ONE);
    }
}
