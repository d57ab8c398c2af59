//! # Spatial Scene
//!
//! A scene graph with a quad-tree spatial index for static objects.
//!
//! ## Features
//!
//! - **Transform Hierarchy**: Local position, rotation and scale composed into cached world matrices
//! - **World Bounds**: Mesh-derived axis-aligned boxes kept current on every change
//! - **Quad-Tree Index**: XZ-plane subdivision over static objects with fixed or adaptive footprints
//! - **Queries**: Box, sphere, ray and frustum intersection, indexed or by linear scan
//! - **Configuration**: TOML and RON engine settings
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use spatial_scene::prelude::*;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut scene = SceneManager::new(EngineConfig::default());
//!     let crate_key = scene.create_object_with_mesh(
//!         "crate",
//!         TransformComponent::from_position(Vec3::new(4.0, 0.0, -2.0)).with_static(true),
//!         None,
//!         unit_cube_vertices(),
//!     )?;
//!
//!     scene.generate_configured()?;
//!     let hits = scene.query_intersections(&Sphere::new(Vec3::new(4.0, 0.0, -2.0), 1.0));
//!     assert_eq!(hits.objects, vec![crate_key]);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod core;
pub mod foundation;
pub mod scene;
pub mod spatial;

/// Common imports for library users
pub mod prelude {
    pub use crate::{
        config::{Config, ConfigError},
        core::{EngineConfig, SpatialIndexConfig},
        foundation::math::{Mat4, Point3, Quat, Transform, Vec3},
        scene::{
            unit_cube_vertices, Frustum, Intersectable, ObjectKey, QueryPrimitive, Ray, SceneError, SceneGraph,
            SceneManager, Sphere, TransformComponent, AABB,
        },
        spatial::{QuadTree, QueryResult, SpatialIndexManager, SpatialSource},
    };
}
