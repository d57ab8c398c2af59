//! Spatial index manager
//!
//! Owns the quad-tree built over the static objects of a scene and decides,
//! per query, whether to traverse it or to fall back to a linear scan. The
//! manager never owns scene objects: it reads their bounds through a
//! [`SpatialSource`] and stores only their keys.

use std::hash::Hash;

use crate::core::SpatialIndexConfig;
use crate::foundation::math::Vec3;
use crate::scene::{Frustum, Intersectable, SceneError, AABB};
use super::quadtree::{QuadTree, QuadTreeConfig};

/// Smallest width of an adaptive footprint along X or Z
pub const MIN_ADAPTIVE_EXTENT: f32 = 1.0;

/// Read access to the objects an index is built over
pub trait SpatialSource<K> {
    /// Keys of every object currently flagged static
    fn static_objects(&self) -> Vec<K>;

    /// Whether a live object is flagged static
    fn is_static(&self, key: K) -> bool;

    /// World-space bounding box of an object (possibly empty)
    fn world_bounds(&self, key: K) -> Option<AABB>;

    /// World-space position of an object, used to place objects without geometry
    fn world_position(&self, key: K) -> Option<Vec3>;
}

/// Objects matched by a query and the work it took
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryResult<K> {
    /// Matching objects, in traversal order
    pub objects: Vec<K>,
    /// Primitive-vs-box tests performed
    pub checks_performed: usize,
    /// Whether the quad-tree answered the query (false for a linear scan)
    pub indexed: bool,
}

/// Outcome of a (re)build
#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport<K> {
    /// Root footprint of the new tree
    pub footprint: AABB,
    /// Objects placed in the tree
    pub inserted: usize,
    /// Static objects whose anchor fell outside the footprint
    pub out_of_bounds: Vec<K>,
}

/// Spatial index over static objects
#[derive(Debug, Clone)]
pub struct SpatialIndexManager<K> {
    tree: Option<QuadTree<K>>,
    config: SpatialIndexConfig,
    last_checks: usize,
}

impl<K: Copy + Eq + Hash + std::fmt::Debug> SpatialIndexManager<K> {
    /// Create a manager without a tree
    pub fn new(config: SpatialIndexConfig) -> Self {
        Self {
            tree: None,
            config,
            last_checks: 0,
        }
    }

    /// Configuration used for future builds
    pub fn config(&self) -> &SpatialIndexConfig {
        &self.config
    }

    /// Replace the configuration; takes effect on the next build
    pub fn set_config(&mut self, config: SpatialIndexConfig) {
        self.config = config;
    }

    /// Whether a tree is currently built
    pub fn is_built(&self) -> bool {
        self.tree.is_some()
    }

    /// The current tree, if built
    pub fn tree(&self) -> Option<&QuadTree<K>> {
        self.tree.as_ref()
    }

    /// Root footprint of the current tree
    pub fn footprint(&self) -> Option<AABB> {
        self.tree.as_ref().map(|tree| *tree.bounds())
    }

    /// Checks performed by the most recent query
    pub fn last_checks(&self) -> usize {
        self.last_checks
    }

    /// Whether `key` is stored in the tree
    pub fn is_indexed(&self, key: K) -> bool {
        self.tree.as_ref().is_some_and(|tree| tree.contains(key))
    }

    /// Discard any existing tree and build one over `[min, max]` in XZ,
    /// inserting every static object of `source`
    pub fn build_fixed<S: SpatialSource<K> + ?Sized>(&mut self, min: Vec3, max: Vec3, source: &S) -> Result<BuildReport<K>, SceneError> {
        let finite = min.x.is_finite() && min.z.is_finite() && max.x.is_finite() && max.z.is_finite();
        if !finite || min.x >= max.x || min.z >= max.z {
            return Err(SceneError::InvalidFootprint { min, max });
        }

        let footprint = AABB::footprint(min, max);
        let mut tree = QuadTree::new(footprint, QuadTreeConfig::from(&self.config));
        let mut inserted = 0;
        let mut out_of_bounds = Vec::new();

        for key in source.static_objects() {
            let bounds = source.world_bounds(key).unwrap_or_default();
            let position = source.world_position(key).unwrap_or_else(Vec3::zeros);

            if tree.insert(key, bounds, position) {
                inserted += 1;
            } else {
                log::warn!(
                    "Static object {:?} anchored at {:?} lies outside the index footprint",
                    key,
                    QuadTree::<K>::anchor_point(&bounds, position)
                );
                out_of_bounds.push(key);
            }
        }

        log::info!(
            "Built quad-tree over [{:.2}, {:.2}]..[{:.2}, {:.2}]: {} objects, {} nodes, depth {}",
            min.x, min.z, max.x, max.z,
            inserted,
            tree.node_count(),
            tree.depth()
        );

        self.tree = Some(tree);
        Ok(BuildReport {
            footprint,
            inserted,
            out_of_bounds,
        })
    }

    /// Build over the configured fixed footprint
    pub fn build_configured<S: SpatialSource<K> + ?Sized>(&mut self, source: &S) -> Result<BuildReport<K>, SceneError> {
        let (min, max) = (self.config.fixed_min, self.config.fixed_max);
        self.build_fixed(min, max, source)
    }

    /// Build over a footprint that encloses every static object
    ///
    /// The union of the static boxes (or positions, for objects without
    /// geometry) is padded by the configured margin. Without static objects
    /// the footprint is a square of the configured default half extent around
    /// the origin.
    pub fn build_adaptive<S: SpatialSource<K> + ?Sized>(&mut self, source: &S) -> Result<BuildReport<K>, SceneError> {
        let (min, max) = self.adaptive_footprint(source);
        self.build_fixed(min, max, source)
    }

    fn adaptive_footprint<S: SpatialSource<K> + ?Sized>(&self, source: &S) -> (Vec3, Vec3) {
        let mut enclosing = AABB::empty();
        for key in source.static_objects() {
            match source.world_bounds(key) {
                Some(bounds) if bounds.is_valid() => enclosing = enclosing.union(&bounds),
                _ => {
                    if let Some(position) = source.world_position(key).filter(|p| p.iter().all(|v| v.is_finite())) {
                        enclosing.enclose(&position);
                    }
                }
            }
        }

        if enclosing.is_empty() {
            let half = self.config.adaptive_default_half_extent;
            return (Vec3::new(-half, 0.0, -half), Vec3::new(half, 0.0, half));
        }

        let padded = enclosing.expanded(Vec3::repeat(self.config.adaptive_padding));
        let center = padded.center();
        let half_x = (padded.max.x - padded.min.x).max(MIN_ADAPTIVE_EXTENT) * 0.5;
        let half_z = (padded.max.z - padded.min.z).max(MIN_ADAPTIVE_EXTENT) * 0.5;

        (
            Vec3::new(center.x - half_x, 0.0, center.z - half_z),
            Vec3::new(center.x + half_x, 0.0, center.z + half_z),
        )
    }

    /// Discard the tree; later queries fall back to a linear scan
    pub fn unload(&mut self) {
        if self.tree.take().is_some() {
            log::info!("Quad-tree unloaded");
        }
    }

    /// Insert or remove `key` after its static flag changed
    ///
    /// Without a tree this is a no-op: the object is picked up by the next
    /// build. Removing an object that was never indexed succeeds. Returns
    /// whether the tree changed.
    pub fn change_static_status<S: SpatialSource<K> + ?Sized>(&mut self, key: K, is_static: bool, source: &S) -> Result<bool, SceneError> {
        if self.tree.is_none() {
            return Ok(false);
        }

        if is_static {
            self.insert(key, source).map(|()| true)
        } else {
            Ok(self.remove(key))
        }
    }

    /// Place `key` in the tree using its current bounds
    pub fn insert<S: SpatialSource<K> + ?Sized>(&mut self, key: K, source: &S) -> Result<(), SceneError> {
        let Some(tree) = self.tree.as_mut() else {
            return Ok(());
        };

        let bounds = source.world_bounds(key).ok_or(SceneError::ObjectNotFound)?;
        let position = source.world_position(key).ok_or(SceneError::ObjectNotFound)?;

        if tree.insert(key, bounds, position) {
            log::debug!("Indexed {:?}", key);
            Ok(())
        } else {
            let anchor = QuadTree::<K>::anchor_point(&bounds, position);
            log::warn!("Cannot index {:?}: anchor {:?} lies outside the footprint", key, anchor);
            Err(SceneError::OutOfBounds { anchor })
        }
    }

    /// Remove `key` from the tree; unknown keys are ignored
    pub fn remove(&mut self, key: K) -> bool {
        let removed = self.tree.as_mut().is_some_and(|tree| tree.remove(key));
        if removed {
            log::debug!("Removed {:?} from the index", key);
        }
        removed
    }

    /// Re-file a static object whose bounds changed
    ///
    /// Static objects are placed again even when they are not in the tree,
    /// so an object carried out of the footprint and back by a moving
    /// ancestor is picked up again. Non-static keys are dropped. Without a
    /// tree this is a no-op.
    pub fn refresh<S: SpatialSource<K> + ?Sized>(&mut self, key: K, source: &S) -> Result<(), SceneError> {
        if self.tree.is_none() {
            return Ok(());
        }
        self.remove(key);
        if !source.is_static(key) {
            return Ok(());
        }
        self.insert(key, source)
    }

    /// Every static object whose bounds intersect `primitive`
    ///
    /// Traverses the tree when built, otherwise scans all static objects.
    pub fn query_intersections<P, S>(&mut self, primitive: &P, source: &S) -> QueryResult<K>
    where
        P: Intersectable + ?Sized,
        S: SpatialSource<K> + ?Sized,
    {
        let result = match &self.tree {
            Some(tree) => {
                let mut objects = Vec::new();
                let checks_performed = tree.collect_intersections(primitive, &mut objects);
                QueryResult {
                    objects,
                    checks_performed,
                    indexed: true,
                }
            }
            None => Self::scan(primitive, source),
        };

        self.last_checks = result.checks_performed;
        log::trace!(
            "Query matched {} objects with {} checks ({})",
            result.objects.len(),
            result.checks_performed,
            if result.indexed { "quad-tree" } else { "linear scan" }
        );
        result
    }

    /// Linear scan over every static object, regardless of the tree
    pub fn brute_force<P, S>(&mut self, primitive: &P, source: &S) -> QueryResult<K>
    where
        P: Intersectable + ?Sized,
        S: SpatialSource<K> + ?Sized,
    {
        let result = Self::scan(primitive, source);
        self.last_checks = result.checks_performed;
        result
    }

    /// Static objects inside or touching the view frustum
    pub fn frustum_culling<S: SpatialSource<K> + ?Sized>(&mut self, frustum: &Frustum, source: &S) -> QueryResult<K> {
        self.query_intersections(frustum, source)
    }

    fn scan<P, S>(primitive: &P, source: &S) -> QueryResult<K>
    where
        P: Intersectable + ?Sized,
        S: SpatialSource<K> + ?Sized,
    {
        let mut objects = Vec::new();
        let mut checks_performed = 0;

        for key in source.static_objects() {
            let Some(bounds) = source.world_bounds(key).filter(AABB::is_valid) else {
                continue;
            };
            checks_performed += 1;
            if primitive.intersects_aabb(&bounds) {
                objects.push(key);
            }
        }

        QueryResult {
            objects,
            checks_performed,
            indexed: false,
        }
    }
}

impl<K: Copy + Eq + Hash + std::fmt::Debug> Default for SpatialIndexManager<K> {
    fn default() -> Self {
        Self::new(SpatialIndexConfig::default())
    }
}
