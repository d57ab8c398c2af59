//! Bounding volumes and query primitives
//!
//! Everything the spatial index can be asked about is expressed as a shape that
//! knows how to test itself against an axis-aligned box ([`Intersectable`]).
//! The index only ever deals with boxes; sphere, ray, box and frustum queries
//! share one traversal.

use crate::foundation::math::{Mat4, Point3, Vec3};

/// Axis-Aligned Bounding Box for spatial queries
///
/// An *empty* box has `min = +inf` and `max = -inf` on every axis. It encloses
/// nothing and intersects nothing, which is the state of an object without
/// mesh geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AABB {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl AABB {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// The empty box
    pub fn empty() -> Self {
        Self {
            min: Vec3::repeat(f32::INFINITY),
            max: Vec3::repeat(f32::NEG_INFINITY),
        }
    }

    /// Create an AABB centered at a point with given extents
    pub fn from_center_extents(center: Vec3, extents: Vec3) -> Self {
        Self {
            min: center - extents,
            max: center + extents,
        }
    }

    /// Smallest box enclosing every point (empty for no points)
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut aabb = Self::empty();
        for point in points {
            aabb.enclose(point);
        }
        aabb
    }

    /// A box covering an XZ footprint and unbounded in Y
    pub fn footprint(min: Vec3, max: Vec3) -> Self {
        Self {
            min: Vec3::new(min.x, f32::NEG_INFINITY, min.z),
            max: Vec3::new(max.x, f32::INFINITY, max.z),
        }
    }

    /// Grow the box to include a point
    pub fn enclose(&mut self, point: &Vec3) {
        self.min = self.min.inf(point);
        self.max = self.max.sup(point);
    }

    /// Smallest box enclosing both boxes
    pub fn union(&self, other: &AABB) -> AABB {
        AABB {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Box grown by `margin` on every side
    pub fn expanded(&self, margin: Vec3) -> AABB {
        AABB {
            min: self.min - margin,
            max: self.max + margin,
        }
    }

    /// Whether the box encloses nothing (`min > max` on some axis)
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x || self.min.y > self.max.y || self.min.z > self.max.z
    }

    /// Whether the box is non-empty with finite corners
    ///
    /// Only valid boxes take part in intersection queries.
    pub fn is_valid(&self) -> bool {
        !self.is_empty()
            && self.min.iter().all(|v| v.is_finite())
            && self.max.iter().all(|v| v.is_finite())
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.y >= self.min.y && point.y <= self.max.y &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Check if a point lies inside the box when projected onto the XZ plane
    pub fn contains_point_xz(&self, point: Vec3) -> bool {
        point.x >= self.min.x && point.x <= self.max.x &&
        point.z >= self.min.z && point.z <= self.max.z
    }

    /// Check if this AABB fully contains another
    pub fn contains(&self, other: &AABB) -> bool {
        other.min.x >= self.min.x && other.max.x <= self.max.x &&
        other.min.y >= self.min.y && other.max.y <= self.max.y &&
        other.min.z >= self.min.z && other.max.z <= self.max.z
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &AABB) -> bool {
        self.min.x <= other.max.x && self.max.x >= other.min.x &&
        self.min.y <= other.max.y && self.max.y >= other.min.y &&
        self.min.z <= other.max.z && self.max.z >= other.min.z
    }

    /// Transform the box by an affine matrix and re-fit an axis-aligned box
    /// around the result (Arvo's method, equivalent to enclosing the eight
    /// transformed corners). The empty box stays empty.
    pub fn transformed(&self, matrix: &Mat4) -> AABB {
        if self.is_empty() {
            return AABB::empty();
        }

        let mut min = Vec3::new(matrix[(0, 3)], matrix[(1, 3)], matrix[(2, 3)]);
        let mut max = min;

        for row in 0..3 {
            for col in 0..3 {
                let a = matrix[(row, col)] * self.min[col];
                let b = matrix[(row, col)] * self.max[col];
                min[row] += a.min(b);
                max[row] += a.max(b);
            }
        }

        AABB { min, max }
    }

    /// Test ray intersection with this AABB using slab method
    ///
    /// Returns the distance to the entry point if the ray intersects within
    /// `max_distance`, `None` otherwise. Axes the ray runs parallel to are
    /// tested by containment, so unbounded slabs are handled too.
    pub fn intersect_ray(&self, ray_origin: Vec3, ray_dir: Vec3, max_distance: f32) -> Option<f32> {
        if self.is_empty() {
            return None;
        }

        let mut t_enter = 0.0_f32;
        let mut t_exit = max_distance;

        for axis in 0..3 {
            let origin = ray_origin[axis];
            let dir = ray_dir[axis];

            if dir == 0.0 {
                if origin < self.min[axis] || origin > self.max[axis] {
                    return None;
                }
                continue;
            }

            let t1 = (self.min[axis] - origin) / dir;
            let t2 = (self.max[axis] - origin) / dir;
            t_enter = t_enter.max(t1.min(t2));
            t_exit = t_exit.min(t1.max(t2));

            if t_enter > t_exit {
                return None;
            }
        }

        Some(t_enter)
    }
}

impl Default for AABB {
    fn default() -> Self {
        Self::empty()
    }
}

/// Plane defined by normal and distance from origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Normal vector (should be normalized)
    pub normal: Vec3,
    /// Distance from origin along the normal
    pub distance: f32,
}

impl Plane {
    /// Create a new plane from normal and distance
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self { normal: normal.normalize(), distance }
    }

    /// Build a plane from raw `(a, b, c, d)` coefficients, normalizing when the
    /// normal is non-zero
    fn from_coefficients(a: f32, b: f32, c: f32, d: f32) -> Self {
        let normal = Vec3::new(a, b, c);
        let length = normal.norm();
        if length > 0.0 {
            Self { normal: normal / length, distance: d / length }
        } else {
            Self { normal, distance: d }
        }
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) + self.distance
    }

    /// Signed distance of the box corner furthest along the normal
    ///
    /// Axes where the normal is zero contribute nothing, which keeps boxes
    /// with unbounded extents from producing `0 * inf`.
    fn positive_vertex_distance(&self, aabb: &AABB) -> f32 {
        let mut sum = self.distance;
        for axis in 0..3 {
            let n = self.normal[axis];
            if n > 0.0 {
                sum += n * aabb.max[axis];
            } else if n < 0.0 {
                sum += n * aabb.min[axis];
            }
        }
        sum
    }

    fn is_degenerate(&self) -> bool {
        self.normal.norm_squared() == 0.0
            || !self.distance.is_finite()
            || self.normal.iter().any(|v| !v.is_finite())
    }
}

/// Frustum for visibility culling
///
/// Plane normals point inward: a point is inside when its signed distance to
/// every plane is non-negative.
#[derive(Debug, Clone, PartialEq)]
pub struct Frustum {
    /// Six planes defining the frustum (left, right, bottom, top, near, far)
    pub planes: [Plane; 6],
}

impl Frustum {
    /// Create a frustum from six planes
    pub fn new(planes: [Plane; 6]) -> Self {
        Self { planes }
    }

    /// Extract frustum planes from a view-projection matrix
    ///
    /// This uses the Gribb-Hartmann method to extract frustum planes
    /// from the combined view-projection matrix (column-vector convention).
    pub fn from_matrix(vp_matrix: &Mat4) -> Self {
        let m = vp_matrix;
        let plane = |row: usize, sign: f32| {
            Plane::from_coefficients(
                m[(3, 0)] + sign * m[(row, 0)],
                m[(3, 1)] + sign * m[(row, 1)],
                m[(3, 2)] + sign * m[(row, 2)],
                m[(3, 3)] + sign * m[(row, 3)],
            )
        };

        Self {
            planes: [
                plane(0, 1.0),  // left:   row3 + row0
                plane(0, -1.0), // right:  row3 - row0
                plane(1, 1.0),  // bottom: row3 + row1
                plane(1, -1.0), // top:    row3 - row1
                plane(2, 1.0),  // near:   row3 + row2
                plane(2, -1.0), // far:    row3 - row2
            ],
        }
    }

    /// Build the frustum of a right-handed perspective camera
    pub fn from_perspective(eye: Point3, target: Point3, up: Vec3, aspect: f32, fovy: f32, near: f32, far: f32) -> Self {
        let view = Mat4::look_at_rh(&eye, &target, &up);
        let projection = Mat4::new_perspective(aspect, fovy, near, far);
        Self::from_matrix(&(projection * view))
    }

    /// Whether any plane is unusable (zero normal or non-finite)
    ///
    /// A degenerate frustum contains nothing.
    pub fn is_degenerate(&self) -> bool {
        self.planes.iter().any(Plane::is_degenerate)
    }

    /// Check if an AABB is inside or intersects the frustum
    ///
    /// Conservative: boxes near a frustum corner may be reported although
    /// they are just outside, never the other way round.
    pub fn intersects_aabb(&self, aabb: &AABB) -> bool {
        if aabb.is_empty() || self.is_degenerate() {
            return false;
        }

        // If the corner furthest along the normal is outside, the whole box is
        self.planes
            .iter()
            .all(|plane| plane.positive_vertex_distance(aabb) >= 0.0)
    }
}

/// Sphere query primitive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sphere {
    /// Centre of the sphere
    pub center: Vec3,
    /// Radius (negative or non-finite radii match nothing)
    pub radius: f32,
}

impl Sphere {
    /// Create a new sphere
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }
}

/// Ray (or segment when `max_distance` is finite) query primitive
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Start point
    pub origin: Vec3,
    /// Direction, not required to be normalized
    pub direction: Vec3,
    /// Furthest parameter along `direction` still considered a hit
    pub max_distance: f32,
}

impl Ray {
    /// Create an unbounded ray
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self { origin, direction, max_distance: f32::INFINITY }
    }

    /// Create a segment between two points
    pub fn segment(start: Vec3, end: Vec3) -> Self {
        Self { origin: start, direction: end - start, max_distance: 1.0 }
    }
}

/// A shape that can be tested against an axis-aligned box
pub trait Intersectable {
    /// Whether the shape touches `aabb`; empty boxes never match
    fn intersects_aabb(&self, aabb: &AABB) -> bool;
}

impl Intersectable for AABB {
    fn intersects_aabb(&self, aabb: &AABB) -> bool {
        self.intersects(aabb)
    }
}

impl Intersectable for Sphere {
    fn intersects_aabb(&self, aabb: &AABB) -> bool {
        if aabb.is_empty() || !self.radius.is_finite() || self.radius < 0.0 {
            return false;
        }
        if self.center.iter().any(|v| !v.is_finite()) {
            return false;
        }

        let closest_point = self.center.sup(&aabb.min).inf(&aabb.max);
        (closest_point - self.center).norm_squared() <= self.radius * self.radius
    }
}

impl Intersectable for Frustum {
    fn intersects_aabb(&self, aabb: &AABB) -> bool {
        Frustum::intersects_aabb(self, aabb)
    }
}

impl Intersectable for Ray {
    fn intersects_aabb(&self, aabb: &AABB) -> bool {
        let finite = self.origin.iter().chain(self.direction.iter()).all(|v| v.is_finite());
        if !finite || self.direction.norm_squared() == 0.0 || self.max_distance.is_nan() {
            return false;
        }
        aabb.intersect_ray(self.origin, self.direction, self.max_distance).is_some()
    }
}

/// Closed set of primitives accepted by scene-level queries
#[derive(Debug, Clone, PartialEq)]
pub enum QueryPrimitive {
    /// Axis-aligned box
    Aabb(AABB),
    /// Sphere
    Sphere(Sphere),
    /// View frustum
    Frustum(Frustum),
    /// Ray or segment
    Ray(Ray),
}

impl Intersectable for QueryPrimitive {
    fn intersects_aabb(&self, aabb: &AABB) -> bool {
        match self {
            Self::Aabb(shape) => shape.intersects_aabb(aabb),
            Self::Sphere(shape) => shape.intersects_aabb(aabb),
            Self::Frustum(shape) => shape.intersects_aabb(aabb),
            Self::Ray(shape) => shape.intersects_aabb(aabb),
        }
    }
}

impl From<AABB> for QueryPrimitive {
    fn from(shape: AABB) -> Self {
        Self::Aabb(shape)
    }
}

impl From<Sphere> for QueryPrimitive {
    fn from(shape: Sphere) -> Self {
        Self::Sphere(shape)
    }
}

impl From<Frustum> for QueryPrimitive {
    fn from(shape: Frustum) -> Self {
        Self::Frustum(shape)
    }
}

impl From<Ray> for QueryPrimitive {
    fn from(shape: Ray) -> Self {
        Self::Ray(shape)
    }
}
