//! Scene graph rendered on top of the map.
//!
//! Objects live in an arena owned by the [`Scene`] and are addressed by
//! [`ObjectId`]. Slots of removed objects are reused, but every reuse bumps
//! the slot's generation, so an id held after its object was removed
//! simply resolves to nothing.

mod camera;
mod light;
mod mesh;
mod raycast;

pub use camera::Camera;
pub use light::{color_from_hex, DirectionalLight, HemisphereLight, ResolvedLight};
pub use mesh::{Aabb, Mesh};
pub use raycast::{Intersection, Ray, RaycastParams, Raycaster};

use glam::{Mat4, Quat, Vec3};

/// Errors raised while building scene content.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneError {
    /// Mesh positions/indices do not describe whole triangles.
    InvalidGeometry(String),
}

impl std::fmt::Display for SceneError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SceneError::InvalidGeometry(msg) => write!(f, "Invalid geometry: {}", msg),
        }
    }
}

impl std::error::Error for SceneError {}

/// Handle to an object in a [`Scene`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    index: u32,
    generation: u32,
}

impl ObjectId {
    const ROOT: Self = Self {
        index: 0,
        generation: 0,
    };
}

/// Local transform of an object relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

/// What an object contributes to the scene.
#[derive(Debug, Clone)]
pub enum ObjectKind {
    /// Pure grouping node
    Group,
    Mesh(Mesh),
    HemisphereLight(HemisphereLight),
    DirectionalLight(DirectionalLight),
}

/// A node of the scene graph.
#[derive(Debug, Clone)]
pub struct Object3D {
    pub name: String,
    pub transform: Transform,
    /// Invisible objects are neither rendered nor hit by raycasts
    pub visible: bool,
    pub kind: ObjectKind,
}

impl Object3D {
    pub fn new(name: impl Into<String>, kind: ObjectKind) -> Self {
        Self {
            name: name.into(),
            transform: Transform::default(),
            visible: true,
            kind,
        }
    }

    pub fn group(name: impl Into<String>) -> Self {
        Self::new(name, ObjectKind::Group)
    }

    pub fn mesh(name: impl Into<String>, mesh: Mesh) -> Self {
        Self::new(name, ObjectKind::Mesh(mesh))
    }

    pub fn with_translation(mut self, translation: Vec3) -> Self {
        self.transform.translation = translation;
        self
    }

    pub fn as_mesh(&self) -> Option<&Mesh> {
        match &self.kind {
            ObjectKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }

    pub fn as_mesh_mut(&mut self) -> Option<&mut Mesh> {
        match &mut self.kind {
            ObjectKind::Mesh(mesh) => Some(mesh),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct Node {
    object: Object3D,
    parent: Option<ObjectId>,
    children: Vec<ObjectId>,
}

#[derive(Debug, Clone)]
struct Slot {
    generation: u32,
    node: Option<Node>,
}

/// Arena-backed scene graph with a single root group.
#[derive(Debug, Clone)]
pub struct Scene {
    slots: Vec<Slot>,
    /// Indices of empty slots, reused before the arena grows
    free: Vec<u32>,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Creates an empty scene containing only the root group.
    pub fn new() -> Self {
        Self {
            slots: vec![Slot {
                generation: 0,
                node: Some(Node {
                    object: Object3D::group("scene"),
                    parent: None,
                    children: Vec::new(),
                }),
            }],
            free: Vec::new(),
        }
    }

    /// Id of the root group.
    pub fn root(&self) -> ObjectId {
        ObjectId::ROOT
    }

    /// Adds an object directly below the root.
    pub fn add(&mut self, object: Object3D) -> ObjectId {
        let root = self.root();
        self.insert(root, object)
    }

    /// Adds an object below `parent`. Returns `None` if the parent is gone.
    pub fn add_child(&mut self, parent: ObjectId, object: Object3D) -> Option<ObjectId> {
        self.node(parent)?;
        Some(self.insert(parent, object))
    }

    fn insert(&mut self, parent: ObjectId, object: Object3D) -> ObjectId {
        let node = Node {
            object,
            parent: Some(parent),
            children: Vec::new(),
        };
        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.node = Some(node);
                ObjectId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    node: Some(node),
                });
                ObjectId {
                    index,
                    generation: 0,
                }
            }
        };
        if let Some(node) = self.node_mut(parent) {
            node.children.push(id);
        }
        id
    }

    /// Removes an object together with its descendants.
    ///
    /// The root cannot be removed. Returns the removed object itself.
    pub fn remove(&mut self, id: ObjectId) -> Option<Object3D> {
        if id == self.root() {
            return None;
        }
        let parent = self.node(id)?.parent;
        if let Some(parent) = parent.and_then(|p| self.node_mut(p)) {
            parent.children.retain(|child| *child != id);
        }

        let mut removed = None;
        for descendant in self.descendants(id) {
            let slot = &mut self.slots[descendant.index as usize];
            let node = slot.node.take();
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(descendant.index);
            if descendant == id {
                removed = node.map(|node| node.object);
            }
        }
        removed
    }

    pub fn get(&self, id: ObjectId) -> Option<&Object3D> {
        self.node(id).map(|node| &node.object)
    }

    pub fn get_mut(&mut self, id: ObjectId) -> Option<&mut Object3D> {
        self.node_mut(id).map(|node| &mut node.object)
    }

    pub fn contains(&self, id: ObjectId) -> bool {
        self.node(id).is_some()
    }

    pub fn parent(&self, id: ObjectId) -> Option<ObjectId> {
        self.node(id)?.parent
    }

    pub fn children(&self, id: ObjectId) -> &[ObjectId] {
        self.node(id).map_or(&[], |node| node.children.as_slice())
    }

    /// Number of objects including the root.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.node.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// `id` followed by all of its descendants, depth first.
    pub fn descendants(&self, id: ObjectId) -> Vec<ObjectId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.node(current) {
                out.push(current);
                stack.extend(node.children.iter().rev());
            }
        }
        out
    }

    /// Transform from object-local space to scene space.
    pub fn world_matrix(&self, id: ObjectId) -> Mat4 {
        let mut matrix = Mat4::IDENTITY;
        let mut current = Some(id);
        while let Some(node) = current.and_then(|c| self.node(c)) {
            matrix = node.object.transform.matrix() * matrix;
            current = node.parent;
        }
        matrix
    }

    /// Whether the object and all of its ancestors are visible.
    pub fn is_visible(&self, id: ObjectId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current.and_then(|c| self.node(c)) {
            if !node.object.visible {
                return false;
            }
            current = node.parent;
        }
        self.contains(id)
    }

    /// Visible meshes with their world matrices.
    pub fn meshes(&self) -> Vec<(ObjectId, &Mesh, Mat4)> {
        self.descendants(self.root())
            .into_iter()
            .filter(|id| self.is_visible(*id))
            .filter_map(|id| {
                let mesh = self.get(id)?.as_mesh()?;
                Some((id, mesh, self.world_matrix(id)))
            })
            .collect()
    }

    /// Visible lights with their world-space directions.
    pub fn lights(&self) -> Vec<ResolvedLight> {
        self.descendants(self.root())
            .into_iter()
            .filter(|id| self.is_visible(*id))
            .filter_map(|id| {
                let position = self.world_matrix(id).transform_point3(Vec3::ZERO);
                let direction = light::direction_from_position(position);
                match &self.get(id)?.kind {
                    ObjectKind::HemisphereLight(light) => Some(ResolvedLight::Hemisphere {
                        light: *light,
                        direction,
                    }),
                    ObjectKind::DirectionalLight(light) => Some(ResolvedLight::Directional {
                        light: *light,
                        direction,
                    }),
                    _ => None,
                }
            })
            .collect()
    }

    fn node(&self, id: ObjectId) -> Option<&Node> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_ref())
    }

    fn node_mut(&mut self, id: ObjectId) -> Option<&mut Node> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.node.as_mut())
    }
}
