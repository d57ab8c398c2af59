//! Scene management system
//!
//! Hierarchical objects with cached world transforms and bounding boxes,
//! plus the manager that keeps the spatial index in step with them.
//!
//! ## Architecture
//!
//! ```text
//! SceneManager
//!   ├── SceneGraph          (objects, parent/child links, world state)
//!   └── SpatialIndexManager (quad-tree over static objects)
//! ```
//!
//! The Scene Manager:
//! - Routes every transform, mesh and static flag change through one place
//! - Re-files static objects whose world boxes moved
//! - Answers box, sphere, ray and frustum queries through the tree or a scan

mod bounds;
mod error;
mod scene_graph;
mod scene_manager;
mod transform;

#[cfg(test)]
mod tests;

pub use bounds::{Frustum, Intersectable, Plane, QueryPrimitive, Ray, Sphere, AABB};
pub use error::SceneError;
pub use scene_graph::{ObjectKey, SceneGraph, SceneObject};
pub use scene_manager::{unit_cube_vertices, CollisionCheckReport, SceneManager};
pub use transform::TransformComponent;
