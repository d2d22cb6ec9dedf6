//! Ray casting against scene meshes.
//!
//! Rays are built from normalized screen coordinates by unprojecting two
//! depths through the inverse of the camera's clip-space matrix. Meshes are
//! tested in their local space, hits are reported in scene space.

use super::{Aabb, Mesh, ObjectId, Scene};
use glam::{DMat4, Mat4, Vec2, Vec3};
use std::collections::HashSet;

/// A half-line in scene space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction }
    }

    /// Ray through a normalized screen point (x/y in [-1, 1], y up).
    ///
    /// `projection_inverse` maps clip space back to scene space. It is kept
    /// in double precision since host matrices mix large translations with
    /// small scales. Returns `None` if the matrix does not yield a usable ray.
    pub fn from_screen_point(point: Vec2, projection_inverse: &DMat4) -> Option<Self> {
        let point = point.as_dvec2();
        let origin = projection_inverse.project_point3(point.extend(0.0));
        let target = projection_inverse.project_point3(point.extend(0.5));
        let direction = (target - origin).try_normalize()?.as_vec3();
        let origin = origin.as_vec3();

        origin.is_finite().then_some(Self { origin, direction })
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// The same ray expressed in another space. The direction is not normalized.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        Self {
            origin: matrix.transform_point3(self.origin),
            direction: matrix.transform_vector3(self.direction),
        }
    }

    /// Slab test; a ray starting inside the box hits it.
    pub fn intersects_aabb(&self, aabb: &Aabb) -> bool {
        let mut t_min = 0.0_f32;
        let mut t_max = f32::INFINITY;

        for axis in 0..3 {
            let origin = self.origin[axis];
            let direction = self.direction[axis];
            let (min, max) = (aabb.min[axis], aabb.max[axis]);

            if direction == 0.0 {
                if origin < min || origin > max {
                    return false;
                }
                continue;
            }

            let inv = 1.0 / direction;
            let (t0, t1) = ((min - origin) * inv, (max - origin) * inv);
            t_min = t_min.max(t0.min(t1));
            t_max = t_max.min(t0.max(t1));
            if t_min > t_max {
                return false;
            }
        }
        true
    }

    /// Ray parameter of the hit with a triangle, from either side.
    pub fn intersect_triangle(&self, [a, b, c]: [Vec3; 3]) -> Option<f32> {
        let edge1 = b - a;
        let edge2 = c - a;
        let p = self.direction.cross(edge2);
        let det = edge1.dot(p);

        let scale = edge1.length() * edge2.length() * self.direction.length();
        if det.abs() <= 1e-7 * scale || !det.is_finite() {
            return None;
        }

        let inv_det = 1.0 / det;
        let s = self.origin - a;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(edge1);
        let v = self.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = edge2.dot(q) * inv_det;
        (t >= 0.0).then_some(t)
    }
}

/// Distance limits applied to hits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastParams {
    pub near: f32,
    pub far: f32,
}

impl Default for RaycastParams {
    fn default() -> Self {
        Self {
            near: 0.0,
            far: f32::INFINITY,
        }
    }
}

/// A ray hit on a mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    /// Distance from the ray origin in scene units (meters)
    pub distance: f32,
    /// Hit position in scene space
    pub point: Vec3,
    pub object: ObjectId,
    /// Index of the triangle that was hit
    pub face_index: usize,
}

/// Casts one ray at a time against scene objects.
#[derive(Debug, Clone, Default)]
pub struct Raycaster {
    pub params: RaycastParams,
    ray: Option<Ray>,
}

impl Raycaster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_ray(&mut self, ray: Ray) {
        self.ray = Some(ray);
    }

    /// Sets up the ray from a screen point. Returns false (and clears the
    /// ray) if the projection cannot be unprojected.
    pub fn set_from_screen_point(&mut self, point: Vec2, projection_inverse: &DMat4) -> bool {
        self.ray = Ray::from_screen_point(point, projection_inverse);
        self.ray.is_some()
    }

    /// Hits on one object (and its descendants if `recursive`), nearest first.
    pub fn intersect_object(
        &self,
        scene: &Scene,
        object: ObjectId,
        recursive: bool,
    ) -> Vec<Intersection> {
        self.intersect_objects(scene, &[object], recursive)
    }

    /// Hits on a set of objects (and their descendants if `recursive`),
    /// nearest first. Every object is tested at most once.
    pub fn intersect_objects(
        &self,
        scene: &Scene,
        objects: &[ObjectId],
        recursive: bool,
    ) -> Vec<Intersection> {
        let Some(ray) = self.ray else {
            return Vec::new();
        };

        let mut seen = HashSet::new();
        let mut hits = Vec::new();
        for &object in objects {
            let candidates = if recursive {
                scene.descendants(object)
            } else {
                vec![object]
            };

            for id in candidates {
                if !seen.insert(id) || !scene.is_visible(id) {
                    continue;
                }
                if let Some(mesh) = scene.get(id).and_then(|o| o.as_mesh()) {
                    self.intersect_mesh(&ray, id, mesh, &scene.world_matrix(id), &mut hits);
                }
            }
        }

        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    fn intersect_mesh(
        &self,
        ray: &Ray,
        object: ObjectId,
        mesh: &Mesh,
        world: &Mat4,
        hits: &mut Vec<Intersection>,
    ) {
        let Some(inverse) = invert(world) else {
            return;
        };
        let local_ray = ray.transformed(&inverse);

        match mesh.bounds() {
            Some(bounds) if local_ray.intersects_aabb(&bounds) => {}
            _ => return,
        }

        for (face_index, triangle) in mesh.triangles().enumerate() {
            let Some(t) = local_ray.intersect_triangle(triangle) else {
                continue;
            };
            let point = world.transform_point3(local_ray.at(t));
            let distance = ray.origin.distance(point);

            if distance >= self.params.near && distance <= self.params.far {
                hits.push(Intersection {
                    distance,
                    point,
                    object,
                    face_index,
                });
            }
        }
    }
}

/// Inverse of an object matrix, or `None` if it collapses space.
///
/// Only exact singularity is rejected; tiny but valid scales such as a
/// millimeter model scaled into meters stay invertible.
pub(crate) fn invert(matrix: &Mat4) -> Option<Mat4> {
    let determinant = matrix.determinant();
    if determinant == 0.0 || !determinant.is_finite() {
        return None;
    }
    let inverse = matrix.inverse();
    inverse.is_finite().then_some(inverse)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::Object3D;

    fn quad(size: f32) -> Mesh {
        Mesh::indexed(
            vec![
                Vec3::new(-size, -size, 0.0),
                Vec3::new(size, -size, 0.0),
                Vec3::new(size, size, 0.0),
                Vec3::new(-size, size, 0.0),
            ],
            vec![0, 1, 2, 0, 2, 3],
        )
        .unwrap()
    }

    fn downward_ray() -> Ray {
        // Off the shared diagonal of `quad`, so exactly one face is hit.
        Ray::new(Vec3::new(0.25, -0.5, 10.0), Vec3::NEG_Z)
    }

    #[test]
    fn test_triangle_hit_from_both_sides() {
        let triangle = [Vec3::ZERO, Vec3::X, Vec3::Y];

        let from_above = Ray::new(Vec3::new(0.2, 0.2, 5.0), Vec3::NEG_Z);
        let from_below = Ray::new(Vec3::new(0.2, 0.2, -5.0), Vec3::Z);

        assert_eq!(from_above.intersect_triangle(triangle), Some(5.0));
        assert_eq!(from_below.intersect_triangle(triangle), Some(5.0));
    }

    #[test]
    fn test_triangle_miss_and_behind() {
        let triangle = [Vec3::ZERO, Vec3::X, Vec3::Y];

        let outside = Ray::new(Vec3::new(0.8, 0.8, 5.0), Vec3::NEG_Z);
        let pointing_away = Ray::new(Vec3::new(0.2, 0.2, 5.0), Vec3::Z);
        let parallel = Ray::new(Vec3::new(-1.0, 0.2, 0.0), Vec3::X);

        assert_eq!(outside.intersect_triangle(triangle), None);
        assert_eq!(pointing_away.intersect_triangle(triangle), None);
        assert_eq!(parallel.intersect_triangle(triangle), None);
    }

    #[test]
    fn test_aabb_slab_test() {
        let aabb = Aabb {
            min: Vec3::splat(-1.0),
            max: Vec3::splat(1.0),
        };

        assert!(Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z).intersects_aabb(&aabb));
        assert!(Ray::new(Vec3::ZERO, Vec3::X).intersects_aabb(&aabb));
        assert!(!Ray::new(Vec3::new(3.0, 0.0, 5.0), Vec3::NEG_Z).intersects_aabb(&aabb));
        assert!(!Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::Z).intersects_aabb(&aabb));
    }

    #[test]
    fn test_hits_sorted_nearest_first() {
        let mut scene = Scene::new();
        let far = scene.add(Object3D::mesh("far", quad(1.0)).with_translation(Vec3::new(0.0, 0.0, -5.0)));
        let near = scene.add(Object3D::mesh("near", quad(1.0)));

        let mut raycaster = Raycaster::new();
        raycaster.set_ray(downward_ray());
        let hits = raycaster.intersect_object(&scene, scene.root(), true);

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].object, near);
        assert!((hits[0].distance - 10.0).abs() < 1e-4);
        assert_eq!(hits[1].object, far);
        assert!((hits[1].point - Vec3::new(0.25, -0.5, -5.0)).length() < 1e-4);
    }

    #[test]
    fn test_non_recursive_ignores_children() {
        let mut scene = Scene::new();
        let group = scene.add(Object3D::group("group"));
        let child = scene.add_child(group, Object3D::mesh("child", quad(1.0))).unwrap();

        let mut raycaster = Raycaster::new();
        raycaster.set_ray(downward_ray());

        assert!(raycaster.intersect_objects(&scene, &[group], false).is_empty());
        let hits = raycaster.intersect_objects(&scene, &[group], true);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].object, child);
    }

    #[test]
    fn test_duplicate_targets_tested_once() {
        let mut scene = Scene::new();
        let mesh = scene.add(Object3D::mesh("mesh", quad(1.0)));

        let mut raycaster = Raycaster::new();
        raycaster.set_ray(downward_ray());

        let hits = raycaster.intersect_objects(&scene, &[mesh, scene.root(), mesh], true);
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_far_limit_and_visibility() {
        let mut scene = Scene::new();
        let mesh = scene.add(Object3D::mesh("mesh", quad(1.0)));

        let mut raycaster = Raycaster::new();
        raycaster.set_ray(downward_ray());
        raycaster.params.far = 5.0;
        assert!(raycaster.intersect_object(&scene, mesh, false).is_empty());

        raycaster.params = RaycastParams::default();
        scene.get_mut(mesh).unwrap().visible = false;
        assert!(raycaster.intersect_object(&scene, mesh, false).is_empty());
    }

    #[test]
    fn test_scaled_object_reports_world_distance() {
        let mut scene = Scene::new();
        let mut object = Object3D::mesh("scaled", quad(1.0));
        object.transform.scale = Vec3::splat(4.0);
        object.transform.translation = Vec3::new(0.0, 0.0, 2.0);
        let id = scene.add(object);

        let mut raycaster = Raycaster::new();
        raycaster.set_ray(Ray::new(Vec3::new(3.0, 0.0, 10.0), Vec3::NEG_Z));
        let hits = raycaster.intersect_object(&scene, id, false);

        assert_eq!(hits.len(), 1);
        assert!((hits[0].distance - 8.0).abs() < 1e-4);
        assert!((hits[0].point - Vec3::new(3.0, 0.0, 2.0)).length() < 1e-4);
    }

    #[test]
    fn test_millimeter_model_scaled_to_meters_is_hit() {
        let mut scene = Scene::new();
        let mut object = Object3D::mesh("model", quad(1000.0));
        object.transform.scale = Vec3::splat(0.001);
        let id = scene.add(object);

        let mut raycaster = Raycaster::new();
        raycaster.set_ray(Ray::new(Vec3::new(0.1, -0.3, 10.0), Vec3::NEG_Z));
        let hits = raycaster.intersect_object(&scene, id, false);

        assert_eq!(hits.len(), 1);
        assert!((hits[0].distance - 10.0).abs() < 1e-3);
        assert!((hits[0].point - Vec3::new(0.1, -0.3, 0.0)).length() < 1e-3);
    }

    #[test]
    fn test_collapsed_object_is_skipped() {
        let mut scene = Scene::new();
        let mut object = Object3D::mesh("flat", quad(1.0));
        object.transform.scale = Vec3::new(1.0, 0.0, 1.0);
        let id = scene.add(object);

        let mut raycaster = Raycaster::new();
        raycaster.set_ray(downward_ray());

        assert!(raycaster.intersect_object(&scene, id, false).is_empty());
        assert!(invert(&Mat4::from_scale(Vec3::splat(1e-3))).is_some());
        assert!(invert(&Mat4::ZERO).is_none());
    }

    #[test]
    fn test_ray_from_screen_center() {
        let projection = Mat4::perspective_rh_gl(60f32.to_radians(), 1.0, 0.1, 1000.0)
            * Mat4::look_at_rh(Vec3::new(0.0, 0.0, 10.0), Vec3::ZERO, Vec3::Y);

        let ray = Ray::from_screen_point(Vec2::ZERO, &projection.as_dmat4().inverse()).unwrap();

        assert!((ray.direction - Vec3::NEG_Z).length() < 1e-4);
        assert!(ray.origin.x.abs() < 1e-4 && ray.origin.y.abs() < 1e-4);
        assert!(ray.origin.z < 10.0 && ray.origin.z > 9.0);
    }

    #[test]
    fn test_no_ray_without_intersections() {
        let mut scene = Scene::new();
        scene.add(Object3D::mesh("mesh", quad(1.0)));

        let raycaster = Raycaster::new();

        assert!(raycaster.intersect_object(&scene, scene.root(), true).is_empty());
    }
}
