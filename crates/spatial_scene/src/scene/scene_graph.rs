//! Scene graph of transform nodes
//!
//! Objects live in a generational arena: a key to a destroyed object simply
//! resolves to nothing. Each object has at most one parent and any number of
//! children. World matrices and world boxes are cached per object and
//! refreshed top-down as soon as a local transform, a mesh or a parent
//! changes, so `world = parent_world * local` holds after every call.

use slotmap::{new_key_type, SlotMap};

use crate::foundation::math::{Mat4, Quat, Transform as MathTransform, Vec3};
use crate::spatial::SpatialSource;

use super::bounds::AABB;
use super::error::SceneError;
use super::transform::TransformComponent;

new_key_type! {
    /// Handle of a scene object
    pub struct ObjectKey;
}

/// One node of the scene graph
#[derive(Debug, Clone)]
pub struct SceneObject {
    name: String,
    parent: Option<ObjectKey>,
    children: Vec<ObjectKey>,
    transform: TransformComponent,
    /// Mesh vertices in local space
    mesh: Option<Vec<Vec3>>,
}

impl SceneObject {
    /// Display name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent object, `None` for roots
    pub fn parent(&self) -> Option<ObjectKey> {
        self.parent
    }

    /// Direct children
    pub fn children(&self) -> &[ObjectKey] {
        &self.children
    }

    /// Transform and cached world data
    pub fn transform(&self) -> &TransformComponent {
        &self.transform
    }

    /// Local-space mesh vertices
    pub fn mesh(&self) -> Option<&[Vec3]> {
        self.mesh.as_deref()
    }
}

/// Arena-backed hierarchy of scene objects
#[derive(Debug, Clone, Default)]
pub struct SceneGraph {
    objects: SlotMap<ObjectKey, SceneObject>,
}

impl SceneGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the graph has no objects
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Whether `key` refers to a live object
    pub fn contains(&self, key: ObjectKey) -> bool {
        self.objects.contains_key(key)
    }

    /// Look up an object
    pub fn get(&self, key: ObjectKey) -> Option<&SceneObject> {
        self.objects.get(key)
    }

    /// Transform of an object
    pub fn transform(&self, key: ObjectKey) -> Option<&TransformComponent> {
        self.objects.get(key).map(|object| &object.transform)
    }

    /// Cached world matrix of an object
    pub fn world_matrix(&self, key: ObjectKey) -> Option<Mat4> {
        self.transform(key).map(TransformComponent::world_matrix)
    }

    /// Cached world-space box of an object
    pub fn bounding_box(&self, key: ObjectKey) -> Option<AABB> {
        self.transform(key).map(TransformComponent::bounding_box)
    }

    /// Iterate over every live object
    pub fn iter(&self) -> impl Iterator<Item = (ObjectKey, &SceneObject)> {
        self.objects.iter()
    }

    /// Keys of every live object
    pub fn keys(&self) -> Vec<ObjectKey> {
        self.objects.keys().collect()
    }

    /// First object with the given name
    pub fn find_by_name(&self, name: &str) -> Option<ObjectKey> {
        self.objects
            .iter()
            .find(|(_, object)| object.name == name)
            .map(|(key, _)| key)
    }

    /// Add an object under `parent` (or as a root)
    ///
    /// The transform is validated first; derived values are computed before
    /// this returns.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        transform: TransformComponent,
        parent: Option<ObjectKey>,
        mesh: Option<Vec<Vec3>>,
    ) -> Result<ObjectKey, SceneError> {
        transform.validate()?;
        if let Some(parent) = parent {
            if !self.contains(parent) {
                return Err(SceneError::ObjectNotFound);
            }
        }
        if let Some(vertices) = &mesh {
            check_mesh(vertices)?;
        }

        let key = self.objects.insert(SceneObject {
            name: name.into(),
            parent,
            children: Vec::new(),
            transform,
            mesh,
        });

        if let Some(parent) = parent.and_then(|p| self.objects.get_mut(p)) {
            parent.children.push(key);
        }

        self.propagate(key);
        Ok(key)
    }

    /// `key` followed by all of its descendants, parents before children
    pub fn subtree(&self, key: ObjectKey) -> Vec<ObjectKey> {
        let mut keys = Vec::new();
        if !self.contains(key) {
            return keys;
        }

        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            keys.push(current);
            if let Some(object) = self.objects.get(current) {
                stack.extend(object.children.iter().rev().copied());
            }
        }
        keys
    }

    /// Whether `ancestor` appears on the parent chain of `key`
    pub fn is_ancestor(&self, ancestor: ObjectKey, key: ObjectKey) -> bool {
        let mut current = self.objects.get(key).and_then(|object| object.parent);
        while let Some(parent) = current {
            if parent == ancestor {
                return true;
            }
            current = self.objects.get(parent).and_then(|object| object.parent);
        }
        false
    }

    /// Remove an object together with all its descendants
    ///
    /// Returns the removed keys, parents first.
    pub fn remove_subtree(&mut self, key: ObjectKey) -> Result<Vec<ObjectKey>, SceneError> {
        let parent = self.objects.get(key).ok_or(SceneError::ObjectNotFound)?.parent;
        if let Some(parent) = parent.and_then(|p| self.objects.get_mut(p)) {
            parent.children.retain(|child| *child != key);
        }

        let removed = self.subtree(key);
        for removed_key in &removed {
            self.objects.remove(*removed_key);
        }
        Ok(removed)
    }

    /// World matrix recomputed by walking the parent chain, bypassing the cache
    pub fn compose_world_matrix(&self, key: ObjectKey) -> Option<Mat4> {
        let object = self.objects.get(key)?;
        let mut matrix = object.transform.local_matrix();
        let mut current = object.parent;

        while let Some(parent) = current.and_then(|p| self.objects.get(p)) {
            matrix = parent.transform.local_matrix() * matrix;
            current = parent.parent;
        }
        Some(matrix)
    }

    /// Set local position; `Ok(false)` when the object is static
    pub fn set_position(&mut self, key: ObjectKey, position: Vec3) -> Result<bool, SceneError> {
        self.write_transform(key, |transform| transform.set_position(position))
    }

    /// Set local rotation; `Ok(false)` when the object is static
    pub fn set_rotation(&mut self, key: ObjectKey, rotation: Quat) -> Result<bool, SceneError> {
        self.write_transform(key, |transform| transform.set_rotation(rotation))
    }

    /// Set local rotation from XYZ Euler angles in degrees
    pub fn set_rotation_euler_deg(&mut self, key: ObjectKey, angles: Vec3) -> Result<bool, SceneError> {
        self.write_transform(key, |transform| transform.set_rotation_euler_deg(angles))
    }

    /// Set local scale; `Ok(false)` when the object is static
    pub fn set_scale(&mut self, key: ObjectKey, scale: Vec3) -> Result<bool, SceneError> {
        self.write_transform(key, |transform| transform.set_scale(scale))
    }

    /// Write position, rotation (degrees) and scale at once
    pub fn apply_gizmo(&mut self, key: ObjectKey, position: Vec3, rotation_deg: Vec3, scale: Vec3) -> Result<bool, SceneError> {
        self.write_transform(key, |transform| transform.apply_gizmo(position, rotation_deg, scale))
    }

    fn write_transform<F>(&mut self, key: ObjectKey, write: F) -> Result<bool, SceneError>
    where
        F: FnOnce(&mut TransformComponent) -> Result<bool, SceneError>,
    {
        let object = self.objects.get_mut(key).ok_or(SceneError::ObjectNotFound)?;
        let applied = write(&mut object.transform)?;
        if applied {
            self.propagate(key);
        }
        Ok(applied)
    }

    /// Flip the static flag; returns whether it changed
    pub fn set_static(&mut self, key: ObjectKey, is_static: bool) -> Result<bool, SceneError> {
        let object = self.objects.get_mut(key).ok_or(SceneError::ObjectNotFound)?;
        if object.transform.is_static() == is_static {
            return Ok(false);
        }
        object.transform.set_static(is_static);
        Ok(true)
    }

    /// Move `key` under `new_parent` (or to the root) keeping its world pose
    ///
    /// The new local transform is `inverse(new_parent_world) * world`. Fails
    /// without changes when the result has no valid position / rotation /
    /// positive-scale decomposition, or when the new parent is the object
    /// itself or one of its descendants.
    pub fn set_parent(&mut self, key: ObjectKey, new_parent: Option<ObjectKey>) -> Result<(), SceneError> {
        let (old_parent, world) = {
            let object = self.objects.get(key).ok_or(SceneError::ObjectNotFound)?;
            (object.parent, object.transform.world_matrix())
        };

        let parent_world = match new_parent {
            Some(parent) => {
                if parent == key || self.is_ancestor(key, parent) {
                    return Err(SceneError::InvalidParent(
                        "an object cannot be parented to itself or to one of its descendants".to_string(),
                    ));
                }
                self.world_matrix(parent).ok_or(SceneError::ObjectNotFound)?
            }
            None => Mat4::identity(),
        };

        if old_parent == new_parent {
            return Ok(());
        }

        let inverse = parent_world
            .try_inverse()
            .ok_or_else(|| SceneError::DegenerateTransform("new parent world matrix is singular".to_string()))?;
        let local = MathTransform::from_matrix(&(inverse * world)).ok_or_else(|| {
            SceneError::DegenerateTransform("local matrix has no position/rotation/positive-scale decomposition".to_string())
        })?;

        if let Some(parent) = old_parent.and_then(|p| self.objects.get_mut(p)) {
            parent.children.retain(|child| *child != key);
        }
        if let Some(parent) = new_parent.and_then(|p| self.objects.get_mut(p)) {
            parent.children.push(key);
        }
        if let Some(object) = self.objects.get_mut(key) {
            object.parent = new_parent;
            object.transform.set_local_transform(&local);
        }

        self.propagate(key);
        Ok(())
    }

    /// Recompute the world box of `key` and of every descendant
    ///
    /// Supplied vertices replace the object's mesh; otherwise the existing
    /// mesh is used. Returns the updated keys, parents first.
    pub fn update_bounding_box(&mut self, key: ObjectKey, mesh: Option<&[Vec3]>) -> Result<Vec<ObjectKey>, SceneError> {
        if let Some(vertices) = mesh {
            check_mesh(vertices)?;
        }
        let object = self.objects.get_mut(key).ok_or(SceneError::ObjectNotFound)?;
        if let Some(vertices) = mesh {
            object.mesh = Some(vertices.to_vec());
        }
        Ok(self.propagate(key))
    }

    /// Refresh world matrices and boxes of `key` and its descendants
    fn propagate(&mut self, key: ObjectKey) -> Vec<ObjectKey> {
        let parent_world = self
            .objects
            .get(key)
            .and_then(|object| object.parent)
            .and_then(|parent| self.world_matrix(parent))
            .unwrap_or_else(Mat4::identity);

        let mut updated = Vec::new();
        let mut stack = vec![(key, parent_world)];

        while let Some((current, parent_world)) = stack.pop() {
            let Some(SceneObject { transform, mesh, children, .. }) = self.objects.get_mut(current) else {
                continue;
            };

            transform.update_world_matrix(&parent_world);
            transform.update_bounding_box(mesh.as_deref());

            let world = transform.world_matrix();
            stack.extend(children.iter().rev().map(|child| (*child, world)));
            updated.push(current);
        }

        updated
    }
}

fn check_mesh(vertices: &[Vec3]) -> Result<(), SceneError> {
    if vertices.iter().all(|v| v.iter().all(|c| c.is_finite())) {
        Ok(())
    } else {
        Err(SceneError::NonFiniteValue("mesh vertex"))
    }
}

impl SpatialSource<ObjectKey> for SceneGraph {
    fn static_objects(&self) -> Vec<ObjectKey> {
        self.objects
            .iter()
            .filter(|(_, object)| object.transform.is_static())
            .map(|(key, _)| key)
            .collect()
    }

    fn is_static(&self, key: ObjectKey) -> bool {
        self.transform(key).is_some_and(TransformComponent::is_static)
    }

    fn world_bounds(&self, key: ObjectKey) -> Option<AABB> {
        self.bounding_box(key)
    }

    fn world_position(&self, key: ObjectKey) -> Option<Vec3> {
        self.transform(key).map(TransformComponent::world_position)
    }
}
