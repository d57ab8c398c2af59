//! Math utilities and types
//!
//! Provides fundamental math types for transform composition and
//! spatial queries.

use approx::abs_diff_eq;

pub use nalgebra::{
    Vector3, Vector4,
    Matrix3, Matrix4,
    Quaternion,
    Rotation3,
    Unit,
};

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Quaternion type for rotations
pub type Quat = Unit<Quaternion<f32>>;

/// Smallest scale factor accepted when decomposing a matrix
pub const DECOMPOSE_EPSILON: f32 = 1e-6;

/// Determinants closer to zero than this are treated as singular
pub const DETERMINANT_EPSILON: f32 = 1e-12;

/// Largest cosine allowed between two basis axes of a decomposable matrix
pub const ORTHOGONALITY_TOLERANCE: f32 = 1e-3;

/// Transform representing position, rotation, and scale
///
/// Matrices follow the column-vector convention: `M = T * R * S`, so a point
/// is scaled first, then rotated, then translated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Position in 3D space
    pub position: Vec3,

    /// Rotation quaternion
    pub rotation: Quat,

    /// Scale factors
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::zeros(),
            rotation: Quat::identity(),
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }
}

impl Transform {
    /// Create a new identity transform
    pub fn identity() -> Self {
        Self::default()
    }

    /// Create a transform from its three components
    pub fn new(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self { position, rotation, scale }
    }

    /// Create a transform with only position
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Default::default()
        }
    }

    /// Convert to a transformation matrix (TRS order)
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::new_translation(&self.position)
            * self.rotation.to_homogeneous()
            * Mat4::new_nonuniform_scaling(&self.scale)
    }

    /// Apply this transform to a point
    pub fn transform_point(&self, point: Point3) -> Point3 {
        self.to_matrix().transform_point(&point)
    }

    /// Decompose an affine matrix into position, rotation and scale.
    ///
    /// Returns `None` when the matrix cannot be expressed as a TRS transform
    /// with strictly positive scale: non-finite entries, a singular or
    /// mirroring basis, a (near) zero scale axis, or shear.
    pub fn from_matrix(matrix: &Mat4) -> Option<Self> {
        if matrix.iter().any(|v| !v.is_finite()) {
            return None;
        }

        let position = Vec3::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)]);

        let basis: Mat3 = matrix.fixed_view::<3, 3>(0, 0).into_owned();
        let determinant = basis.determinant();
        if determinant <= 0.0 || abs_diff_eq!(determinant, 0.0, epsilon = DETERMINANT_EPSILON) {
            return None;
        }

        let scale = Vec3::new(
            basis.column(0).norm(),
            basis.column(1).norm(),
            basis.column(2).norm(),
        );
        if scale.iter().any(|s| *s < DECOMPOSE_EPSILON) {
            return None;
        }

        // Remove scale from the basis columns to isolate the rotation
        let mut rotation_matrix = basis;
        for (i, s) in scale.iter().enumerate() {
            let mut column = rotation_matrix.column_mut(i);
            column /= *s;
        }

        for (a, b) in [(0, 1), (0, 2), (1, 2)] {
            if rotation_matrix.column(a).dot(&rotation_matrix.column(b)).abs() > ORTHOGONALITY_TOLERANCE {
                return None;
            }
        }
        let rotation = Quat::from_rotation_matrix(&Rotation3::from_matrix_unchecked(rotation_matrix));

        Some(Self {
            position,
            rotation,
            scale,
        })
    }

    /// Combine this transform with another (`self` is the parent)
    pub fn combine(&self, other: &Transform) -> Transform {
        Transform {
            position: self.position + self.rotation * (self.scale.component_mul(&other.position)),
            rotation: self.rotation * other.rotation,
            scale: self.scale.component_mul(&other.scale),
        }
    }

    /// Inverse transform, when it is itself expressible as TRS
    ///
    /// Non-uniform scale combined with rotation inverts to a sheared matrix,
    /// which yields `None`.
    pub fn inverse(&self) -> Option<Transform> {
        Self::from_matrix(&self.to_matrix().try_inverse()?)
    }

    /// Whether every component is finite and every scale axis strictly positive
    pub fn is_valid(&self) -> bool {
        self.position.iter().all(|v| v.is_finite())
            && self.rotation.coords.iter().all(|v| v.is_finite())
            && self.scale.iter().all(|s| s.is_finite() && *s > 0.0)
    }
}

/// Math constants
pub mod constants {
    /// Pi constant
    pub const PI: f32 = std::f32::consts::PI;

    /// Degrees to radians conversion factor
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// Radians to degrees conversion factor
    pub const RAD_TO_DEG: f32 = 180.0 / PI;
}

/// Math utility functions
pub mod utils {
    use super::{constants, Quat, Vec3};

    /// Convert degrees to radians
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// Convert radians to degrees
    pub fn rad_to_deg(radians: f32) -> f32 {
        radians * constants::RAD_TO_DEG
    }

    /// Build a rotation from XYZ Euler angles in radians
    pub fn quat_from_euler_rad(angles: Vec3) -> Quat {
        Quat::from_euler_angles(angles.x, angles.y, angles.z)
    }

    /// Build a rotation from XYZ Euler angles in degrees
    pub fn quat_from_euler_deg(angles: Vec3) -> Quat {
        quat_from_euler_rad(angles.map(deg_to_rad))
    }

    /// XYZ Euler angles of a rotation, in radians
    pub fn quat_to_euler_rad(rotation: &Quat) -> Vec3 {
        let (x, y, z) = rotation.euler_angles();
        Vec3::new(x, y, z)
    }

    /// XYZ Euler angles of a rotation, in degrees
    pub fn quat_to_euler_deg(rotation: &Quat) -> Vec3 {
        quat_to_euler_rad(rotation).map(rad_to_deg)
    }
}
