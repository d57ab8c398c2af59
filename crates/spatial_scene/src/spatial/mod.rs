//! Spatial partitioning data structures
//!
//! Provides the quad-tree over static scene objects and the manager that
//! builds it, keeps it in sync with static-status changes and answers
//! intersection queries with or without it.

mod quadtree;
mod spatial_index;

pub use quadtree::{QuadTree, QuadTreeConfig, QuadNode, QuadMember, NodeKind, NodeId};
pub use spatial_index::{SpatialIndexManager, SpatialSource, QueryResult, BuildReport, MIN_ADAPTIVE_EXTENT};
