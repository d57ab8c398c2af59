//! Transform component for scene objects
//!
//! Holds the local position, rotation and scale of one object together with
//! the derived world matrix and world-space bounding box. Derived values are
//! written by the owning [`SceneGraph`](super::SceneGraph), which recomputes
//! them top-down whenever anything they depend on changes, so reads are
//! always current.
//!
//! All setters are *constrained*: a static object silently ignores them, and
//! invalid values (non-finite numbers, non-positive scale) are rejected
//! without touching the component.

use crate::foundation::math::{utils, Mat4, Quat, Transform as MathTransform, Vec3};

use super::bounds::AABB;
use super::error::SceneError;

/// Local transform plus cached world-space data
#[derive(Debug, Clone, PartialEq)]
pub struct TransformComponent {
    /// Position relative to the parent
    position: Vec3,

    /// Rotation relative to the parent
    rotation: Quat,

    /// Scale relative to the parent, every component strictly positive
    scale: Vec3,

    /// Whether the object is frozen and eligible for the spatial index
    is_static: bool,

    /// `parent_world * local`, kept current by the scene graph
    world_matrix: Mat4,

    /// World-space box around the object's mesh (empty without a mesh)
    bounding_box: AABB,
}

impl Default for TransformComponent {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
            is_static: false,
            world_matrix: Mat4::identity(),
            bounding_box: AABB::empty(),
        }
    }
}

fn check_finite(value: &Vec3, what: &'static str) -> Result<(), SceneError> {
    if value.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(SceneError::NonFiniteValue(what))
    }
}

fn check_scale(scale: &Vec3) -> Result<(), SceneError> {
    if scale.iter().all(|s| s.is_finite() && *s > 0.0) {
        Ok(())
    } else {
        Err(SceneError::InvalidScale(*scale))
    }
}

fn check_rotation(rotation: &Quat) -> Result<(), SceneError> {
    if rotation.coords.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(SceneError::NonFiniteValue("rotation"))
    }
}

impl TransformComponent {
    /// Create identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create from position only
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Builder pattern: Set position
    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    /// Builder pattern: Set rotation from quaternion
    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Builder pattern: Set rotation from Euler angles (degrees, XYZ order)
    pub fn with_rotation_euler_deg(mut self, x: f32, y: f32, z: f32) -> Self {
        self.rotation = utils::quat_from_euler_deg(Vec3::new(x, y, z));
        self
    }

    /// Builder pattern: Set scale (uniform)
    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::new(scale, scale, scale);
        self
    }

    /// Builder pattern: Set scale (non-uniform)
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Builder pattern: Set the static flag
    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    /// Check that every local value is usable
    pub fn validate(&self) -> Result<(), SceneError> {
        check_finite(&self.position, "position")?;
        check_rotation(&self.rotation)?;
        check_scale(&self.scale)
    }

    /// Local position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Local rotation
    pub fn rotation(&self) -> Quat {
        self.rotation
    }

    /// Local rotation as XYZ Euler angles in degrees
    pub fn rotation_euler_deg(&self) -> Vec3 {
        utils::quat_to_euler_deg(&self.rotation)
    }

    /// Local scale
    pub fn scale(&self) -> Vec3 {
        self.scale
    }

    /// Whether the object is static
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Local transform as a value
    pub fn local_transform(&self) -> MathTransform {
        MathTransform::new(self.position, self.rotation, self.scale)
    }

    /// Local matrix (TRS order)
    pub fn local_matrix(&self) -> Mat4 {
        self.local_transform().to_matrix()
    }

    /// World matrix
    pub fn world_matrix(&self) -> Mat4 {
        self.world_matrix
    }

    /// Translation part of the world matrix
    pub fn world_position(&self) -> Vec3 {
        Vec3::new(self.world_matrix[(0, 3)], self.world_matrix[(1, 3)], self.world_matrix[(2, 3)])
    }

    /// World-space bounding box
    pub fn bounding_box(&self) -> AABB {
        self.bounding_box
    }

    /// Set local position
    ///
    /// Returns `Ok(false)` without changes when the object is static.
    pub fn set_position(&mut self, position: Vec3) -> Result<bool, SceneError> {
        if self.is_static {
            return Ok(false);
        }
        check_finite(&position, "position")?;
        self.position = position;
        Ok(true)
    }

    /// Set local rotation
    ///
    /// Returns `Ok(false)` without changes when the object is static.
    pub fn set_rotation(&mut self, rotation: Quat) -> Result<bool, SceneError> {
        if self.is_static {
            return Ok(false);
        }
        check_rotation(&rotation)?;
        self.rotation = rotation;
        Ok(true)
    }

    /// Set local rotation from XYZ Euler angles in radians
    pub fn set_rotation_euler_rad(&mut self, angles: Vec3) -> Result<bool, SceneError> {
        if self.is_static {
            return Ok(false);
        }
        check_finite(&angles, "rotation")?;
        self.set_rotation(utils::quat_from_euler_rad(angles))
    }

    /// Set local rotation from XYZ Euler angles in degrees
    pub fn set_rotation_euler_deg(&mut self, angles: Vec3) -> Result<bool, SceneError> {
        self.set_rotation_euler_rad(angles.map(utils::deg_to_rad))
    }

    /// Set local scale
    ///
    /// Any component that is zero, negative or non-finite is rejected.
    /// Returns `Ok(false)` without changes when the object is static.
    pub fn set_scale(&mut self, scale: Vec3) -> Result<bool, SceneError> {
        if self.is_static {
            return Ok(false);
        }
        check_scale(&scale)?;
        self.scale = scale;
        Ok(true)
    }

    /// Write position, rotation (degrees) and scale in one go, as a
    /// manipulation gizmo does
    ///
    /// Every value is checked before anything changes.
    pub fn apply_gizmo(&mut self, position: Vec3, rotation_deg: Vec3, scale: Vec3) -> Result<bool, SceneError> {
        if self.is_static {
            return Ok(false);
        }
        check_finite(&position, "position")?;
        check_finite(&rotation_deg, "rotation")?;
        check_scale(&scale)?;

        self.position = position;
        self.rotation = utils::quat_from_euler_deg(rotation_deg);
        self.scale = scale;
        Ok(true)
    }

    pub(crate) fn set_static(&mut self, is_static: bool) {
        self.is_static = is_static;
    }

    /// Replace the local transform regardless of the static flag (reparenting)
    pub(crate) fn set_local_transform(&mut self, transform: &MathTransform) {
        self.position = transform.position;
        self.rotation = transform.rotation;
        self.scale = transform.scale;
    }

    /// Recompute the world matrix from the parent's
    pub(crate) fn update_world_matrix(&mut self, parent_world: &Mat4) {
        self.world_matrix = parent_world * self.local_matrix();
    }

    /// Recompute the world-space box from local mesh vertices
    pub(crate) fn update_bounding_box(&mut self, mesh: Option<&[Vec3]>) {
        self.bounding_box = match mesh {
            Some(vertices) => AABB::from_points(vertices).transformed(&self.world_matrix),
            None => AABB::empty(),
        };
    }
}
