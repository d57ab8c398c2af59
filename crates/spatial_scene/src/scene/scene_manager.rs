//! Scene manager
//!
//! The owning context of a scene: it holds the [`SceneGraph`] and the
//! [`SpatialIndexManager`] and is the only place where the two meet. Every
//! mutation that can change a static object's world box, or its static flag,
//! goes through here so the quad-tree is updated before the call returns.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::EngineConfig;
use crate::foundation::math::{Quat, Vec3};
use crate::spatial::{BuildReport, QuadTree, QueryResult, SpatialIndexManager};

use super::bounds::{Frustum, Intersectable, AABB};
use super::error::SceneError;
use super::scene_graph::{ObjectKey, SceneGraph, SceneObject};
use super::transform::TransformComponent;

/// Corners of an axis-aligned unit cube centred on the origin
pub fn unit_cube_vertices() -> Vec<Vec3> {
    let mut vertices = Vec::with_capacity(8);
    for x in [-0.5, 0.5] {
        for y in [-0.5, 0.5] {
            for z in [-0.5, 0.5] {
                vertices.push(Vec3::new(x, y, z));
            }
        }
    }
    vertices
}

/// Check counts of the same query answered both ways
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionCheckReport {
    /// Objects spawned for the run
    pub spawned: usize,
    /// Tests made by the linear scan
    pub brute_force_checks: usize,
    /// Objects matched by the linear scan
    pub brute_force_hits: usize,
    /// Tests made by the quad-tree
    pub quad_tree_checks: usize,
    /// Objects matched by the quad-tree
    pub quad_tree_hits: usize,
}

/// Scene graph plus spatial index over its static objects
#[derive(Debug, Clone)]
pub struct SceneManager {
    graph: SceneGraph,
    index: SpatialIndexManager<ObjectKey>,
    config: EngineConfig,
}

impl SceneManager {
    /// Create an empty scene
    pub fn new(config: EngineConfig) -> Self {
        Self {
            graph: SceneGraph::new(),
            index: SpatialIndexManager::new(config.spatial_index.clone()),
            config,
        }
    }

    /// Engine configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Read access to the scene graph
    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    /// Read access to the spatial index
    pub fn index(&self) -> &SpatialIndexManager<ObjectKey> {
        &self.index
    }

    /// The quad-tree, if one is built
    pub fn quad_tree(&self) -> Option<&QuadTree<ObjectKey>> {
        self.index.tree()
    }

    /// Whether queries currently go through a quad-tree
    pub fn is_indexed(&self) -> bool {
        self.index.is_built()
    }

    /// Create an object without geometry
    ///
    /// A static object whose anchor lies outside a built index is still
    /// created; the call then returns [`SceneError::CreatedOutsideIndex`]
    /// carrying its key.
    pub fn create_object(
        &mut self,
        name: impl Into<String>,
        transform: TransformComponent,
        parent: Option<ObjectKey>,
    ) -> Result<ObjectKey, SceneError> {
        self.spawn(name.into(), transform, parent, None)
    }

    /// Create an object with local-space mesh vertices
    ///
    /// Out-of-footprint static objects are reported as in [`Self::create_object`].
    pub fn create_object_with_mesh(
        &mut self,
        name: impl Into<String>,
        transform: TransformComponent,
        parent: Option<ObjectKey>,
        mesh: Vec<Vec3>,
    ) -> Result<ObjectKey, SceneError> {
        self.spawn(name.into(), transform, parent, Some(mesh))
    }

    fn spawn(
        &mut self,
        name: String,
        transform: TransformComponent,
        parent: Option<ObjectKey>,
        mesh: Option<Vec<Vec3>>,
    ) -> Result<ObjectKey, SceneError> {
        let is_static = transform.is_static();
        let key = self.graph.insert(name, transform, parent, mesh)?;

        if is_static && self.index.is_built() {
            if let Err(SceneError::OutOfBounds { anchor }) = self.index.insert(key, &self.graph) {
                return Err(SceneError::CreatedOutsideIndex { key, anchor });
            }
        }
        Ok(key)
    }

    /// Destroy an object and all of its descendants
    ///
    /// Everything is removed from the index before it leaves the graph.
    pub fn destroy(&mut self, key: ObjectKey) -> Result<Vec<ObjectKey>, SceneError> {
        if !self.graph.contains(key) {
            return Err(SceneError::ObjectNotFound);
        }
        for doomed in self.graph.subtree(key) {
            self.index.remove(doomed);
        }
        let removed = self.graph.remove_subtree(key)?;
        log::debug!("Destroyed {} objects", removed.len());
        Ok(removed)
    }

    /// First object with the given name
    pub fn find_by_name(&self, name: &str) -> Option<ObjectKey> {
        self.graph.find_by_name(name)
    }

    /// Every live object with its key
    pub fn objects(&self) -> impl Iterator<Item = (ObjectKey, &SceneObject)> {
        self.graph.iter()
    }

    /// Change the static flag and update the index
    ///
    /// When the object becomes static but lies outside the footprint, the
    /// flag still changes and `OutOfBounds` is returned; the object stays out
    /// of indexed queries until the next build.
    pub fn set_static(&mut self, key: ObjectKey, is_static: bool) -> Result<(), SceneError> {
        if !self.graph.set_static(key, is_static)? {
            return Ok(());
        }
        log::debug!("{:?} is now {}", key, if is_static { "static" } else { "dynamic" });
        self.index.change_static_status(key, is_static, &self.graph).map(|_| ())
    }

    /// Set local position; `Ok(false)` when the object is static
    pub fn set_position(&mut self, key: ObjectKey, position: Vec3) -> Result<bool, SceneError> {
        let applied = self.graph.set_position(key, position)?;
        self.after_transform_change(key, applied);
        Ok(applied)
    }

    /// Set local rotation; `Ok(false)` when the object is static
    pub fn set_rotation(&mut self, key: ObjectKey, rotation: Quat) -> Result<bool, SceneError> {
        let applied = self.graph.set_rotation(key, rotation)?;
        self.after_transform_change(key, applied);
        Ok(applied)
    }

    /// Set local rotation from XYZ Euler angles in degrees
    pub fn set_rotation_euler_deg(&mut self, key: ObjectKey, angles: Vec3) -> Result<bool, SceneError> {
        let applied = self.graph.set_rotation_euler_deg(key, angles)?;
        self.after_transform_change(key, applied);
        Ok(applied)
    }

    /// Set local scale; `Ok(false)` when the object is static
    pub fn set_scale(&mut self, key: ObjectKey, scale: Vec3) -> Result<bool, SceneError> {
        let applied = self.graph.set_scale(key, scale)?;
        self.after_transform_change(key, applied);
        Ok(applied)
    }

    /// Write position, rotation (degrees) and scale at once
    pub fn apply_gizmo(&mut self, key: ObjectKey, position: Vec3, rotation_deg: Vec3, scale: Vec3) -> Result<bool, SceneError> {
        let applied = self.graph.apply_gizmo(key, position, rotation_deg, scale)?;
        self.after_transform_change(key, applied);
        Ok(applied)
    }

    /// Reparent keeping the world pose
    pub fn set_parent(&mut self, key: ObjectKey, parent: Option<ObjectKey>) -> Result<(), SceneError> {
        self.graph.set_parent(key, parent)?;
        self.after_transform_change(key, true);
        Ok(())
    }

    /// Recompute world boxes from a new or the existing mesh
    pub fn update_bounding_box(&mut self, key: ObjectKey, mesh: Option<&[Vec3]>) -> Result<Vec<ObjectKey>, SceneError> {
        let updated = self.graph.update_bounding_box(key, mesh)?;
        self.refresh_indexed(&updated);
        Ok(updated)
    }

    fn after_transform_change(&mut self, key: ObjectKey, applied: bool) {
        if applied && self.index.is_built() {
            let moved = self.graph.subtree(key);
            self.refresh_indexed(&moved);
        }
    }

    /// Static descendants of a moved object have new world boxes
    fn refresh_indexed(&mut self, keys: &[ObjectKey]) {
        for key in keys {
            if let Err(error) = self.index.refresh(*key, &self.graph) {
                log::warn!("{:?} dropped from the index: {}", key, error);
            }
        }
    }

    /// Build a quad-tree over an explicit footprint
    pub fn generate_fixed(&mut self, min: Vec3, max: Vec3) -> Result<BuildReport<ObjectKey>, SceneError> {
        self.index.build_fixed(min, max, &self.graph)
    }

    /// Build a quad-tree over the configured fixed footprint
    pub fn generate_configured(&mut self) -> Result<BuildReport<ObjectKey>, SceneError> {
        self.index.build_configured(&self.graph)
    }

    /// Build a quad-tree over a footprint fitted to the static objects
    pub fn generate_adaptive(&mut self) -> Result<BuildReport<ObjectKey>, SceneError> {
        self.index.build_adaptive(&self.graph)
    }

    /// Drop the quad-tree
    pub fn unload(&mut self) {
        self.index.unload();
    }

    /// Static objects intersecting `primitive`, through the tree when built
    pub fn query_intersections<P: Intersectable + ?Sized>(&mut self, primitive: &P) -> QueryResult<ObjectKey> {
        self.index.query_intersections(primitive, &self.graph)
    }

    /// Static objects intersecting `primitive`, by linear scan
    pub fn brute_force<P: Intersectable + ?Sized>(&mut self, primitive: &P) -> QueryResult<ObjectKey> {
        self.index.brute_force(primitive, &self.graph)
    }

    /// Static objects touching the view frustum
    pub fn frustum_culling(&mut self, frustum: &Frustum) -> QueryResult<ObjectKey> {
        self.index.frustum_culling(frustum, &self.graph)
    }

    /// Everything a renderer should draw: culled static objects plus every
    /// dynamic object whose box touches the frustum
    pub fn visible_objects(&mut self, frustum: &Frustum) -> Vec<ObjectKey> {
        let mut visible = self.frustum_culling(frustum).objects;
        visible.extend(
            self.graph
                .iter()
                .filter(|(_, object)| !object.transform().is_static())
                .filter(|(_, object)| {
                    let bounds = object.transform().bounding_box();
                    bounds.is_valid() && frustum.intersects_aabb(&bounds)
                })
                .map(|(key, _)| key),
        );
        visible
    }

    /// Checks performed by the most recent query
    pub fn last_checks(&self) -> usize {
        self.index.last_checks()
    }

    /// Compare linear-scan and quad-tree cost for one box query
    ///
    /// Spawns `count` static unit cubes at random positions within
    /// `spawn_half_extent` of the origin (XZ), rebuilds a fixed tree that
    /// covers the spawn area, then runs `query` both ways and logs the
    /// counters. The spawned objects stay in the scene.
    pub fn test_collision_checks(
        &mut self,
        count: usize,
        spawn_half_extent: f32,
        query: &AABB,
        seed: u64,
    ) -> Result<CollisionCheckReport, SceneError> {
        if !spawn_half_extent.is_finite() || spawn_half_extent <= 0.0 {
            return Err(SceneError::InvalidFootprint {
                min: Vec3::repeat(-spawn_half_extent),
                max: Vec3::repeat(spawn_half_extent),
            });
        }

        let mut rng = StdRng::seed_from_u64(seed);
        let cube = unit_cube_vertices();
        for i in 0..count {
            let position = Vec3::new(
                rng.gen_range(-spawn_half_extent..=spawn_half_extent),
                rng.gen_range(-spawn_half_extent..=spawn_half_extent) * 0.1,
                rng.gen_range(-spawn_half_extent..=spawn_half_extent),
            );
            let transform = TransformComponent::from_position(position).with_static(true);
            self.graph.insert(format!("Collision Test {}", i), transform, None, Some(cube.clone()))?;
        }

        let half = spawn_half_extent + 1.0;
        self.generate_fixed(Vec3::new(-half, 0.0, -half), Vec3::new(half, 0.0, half))?;

        let brute = self.brute_force(query);
        let indexed = self.query_intersections(query);

        let report = CollisionCheckReport {
            spawned: count,
            brute_force_checks: brute.checks_performed,
            brute_force_hits: brute.objects.len(),
            quad_tree_checks: indexed.checks_performed,
            quad_tree_hits: indexed.objects.len(),
        };

        log::info!(
            "Collision checks with {} spawned objects: brute force {} checks / {} hits, quad-tree {} checks / {} hits",
            count,
            report.brute_force_checks,
            report.brute_force_hits,
            report.quad_tree_checks,
            report.quad_tree_hits
        );
        Ok(report)
    }
}

impl Default for SceneManager {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
