//! Quad-tree spatial partitioning structure
//!
//! Divides the XZ plane into hierarchical square-ish regions. Every node spans
//! the whole Y axis, so the tree only discriminates horizontally. A leaf that
//! holds more members than the bucket capacity subdivides into 4 quadrants.
//!
//! Nodes live in a flat arena and refer to their children by [`NodeId`], so the
//! whole tree is dropped (or rebuilt) in one go.
//!
//! Members are filed by a single *anchor* point: the centre of their
//! world-space box, or their world position when the box is empty. A member
//! is stored in exactly one leaf even if its box straddles several quadrants;
//! queries compensate by testing node bounds grown by the largest member
//! half-extent seen so far.

use std::collections::HashMap;
use std::hash::Hash;

use crate::core::SpatialIndexConfig;
use crate::foundation::math::Vec3;
use crate::scene::{Intersectable, AABB};

/// Configuration for quad-tree behavior
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuadTreeConfig {
    /// Maximum members per leaf before subdivision
    pub bucket_capacity: usize,

    /// Maximum subdivision depth (root is depth 0)
    pub max_depth: u32,
}

impl Default for QuadTreeConfig {
    fn default() -> Self {
        Self {
            bucket_capacity: 8,
            max_depth: 8,
        }
    }
}

impl From<&SpatialIndexConfig> for QuadTreeConfig {
    fn from(config: &SpatialIndexConfig) -> Self {
        Self {
            bucket_capacity: config.bucket_capacity.max(1),
            max_depth: config.max_depth,
        }
    }
}

/// Handle of a node inside a [`QuadTree`] arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    /// The root node, present in every tree
    pub const ROOT: NodeId = NodeId(0);

    /// Position of the node in the arena
    pub fn index(self) -> usize {
        self.0
    }
}

/// Object stored in a leaf
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuadMember<K> {
    /// Caller's handle for the object
    pub key: K,
    /// World-space box at insertion time
    pub bounds: AABB,
    /// Point that decided the member's quadrant
    pub anchor: Vec3,
}

/// Leaf or internal payload of a node
#[derive(Debug, Clone)]
pub enum NodeKind<K> {
    /// Holds members directly
    Leaf {
        /// Members filed in this leaf
        members: Vec<QuadMember<K>>,
    },
    /// Delegates to four children, indexed by quadrant
    Internal {
        /// Children ordered `-X-Z`, `+X-Z`, `-X+Z`, `+X+Z`
        children: [NodeId; 4],
    },
}

/// Single node in the quad-tree hierarchy
#[derive(Debug, Clone)]
pub struct QuadNode<K> {
    /// World-space bounds of this node (unbounded in Y)
    pub bounds: AABB,

    /// Depth in the tree (0 = root)
    pub depth: u32,

    kind: NodeKind<K>,
}

impl<K> QuadNode<K> {
    fn new(bounds: AABB, depth: u32) -> Self {
        Self {
            bounds,
            depth,
            kind: NodeKind::Leaf { members: Vec::new() },
        }
    }

    /// Check if this node is a leaf (has no children)
    pub fn is_leaf(&self) -> bool {
        matches!(self.kind, NodeKind::Leaf { .. })
    }

    /// Leaf or internal payload
    pub fn kind(&self) -> &NodeKind<K> {
        &self.kind
    }

    /// Members of a leaf; internal nodes hold none
    pub fn members(&self) -> &[QuadMember<K>] {
        match &self.kind {
            NodeKind::Leaf { members } => members,
            NodeKind::Internal { .. } => &[],
        }
    }

    /// Children of an internal node
    pub fn children(&self) -> Option<[NodeId; 4]> {
        match &self.kind {
            NodeKind::Leaf { .. } => None,
            NodeKind::Internal { children } => Some(*children),
        }
    }
}

/// Midpoint of a node footprint in X and Z
fn split_point(bounds: &AABB) -> (f32, f32) {
    (
        (bounds.min.x + bounds.max.x) * 0.5,
        (bounds.min.z + bounds.max.z) * 0.5,
    )
}

/// Quadrant index (0-3) of a point; points on a split line go to the higher side
fn quadrant_index(bounds: &AABB, point: &Vec3) -> usize {
    let (mid_x, mid_z) = split_point(bounds);
    let x_bit = usize::from(point.x >= mid_x);
    let z_bit = usize::from(point.z >= mid_z);

    // Quadrant layout:
    // 0: -X, -Z
    // 1: +X, -Z
    // 2: -X, +Z
    // 3: +X, +Z
    (z_bit << 1) | x_bit
}

fn quadrant_bounds(bounds: &AABB, quadrant: usize) -> AABB {
    let (mid_x, mid_z) = split_point(bounds);
    let (min_x, max_x) = if quadrant & 1 != 0 { (mid_x, bounds.max.x) } else { (bounds.min.x, mid_x) };
    let (min_z, max_z) = if quadrant & 2 != 0 { (mid_z, bounds.max.z) } else { (bounds.min.z, mid_z) };

    AABB::new(
        Vec3::new(min_x, bounds.min.y, min_z),
        Vec3::new(max_x, bounds.max.y, max_z),
    )
}

/// Quad-tree over the XZ plane
#[derive(Debug, Clone)]
pub struct QuadTree<K> {
    /// Node arena, root at index 0
    nodes: Vec<QuadNode<K>>,

    /// Configuration
    config: QuadTreeConfig,

    /// Leaf currently holding each member
    locations: HashMap<K, NodeId>,

    /// Largest member half-extent ever inserted, per axis (only grows)
    max_member_extents: Vec3,

    /// Number of leaf to internal transitions
    split_count: usize,
}

impl<K: Copy + Eq + Hash> QuadTree<K> {
    /// Create a new quad-tree with the given root bounds
    pub fn new(bounds: AABB, config: QuadTreeConfig) -> Self {
        Self {
            nodes: vec![QuadNode::new(bounds, 0)],
            config,
            locations: HashMap::new(),
            max_member_extents: Vec3::zeros(),
            split_count: 0,
        }
    }

    /// Point used to file an object: the centre of its box, or its position
    /// when the box is empty or non-finite
    pub fn anchor_point(bounds: &AABB, position: Vec3) -> Vec3 {
        if bounds.is_valid() {
            bounds.center()
        } else {
            position
        }
    }

    /// Root bounds
    pub fn bounds(&self) -> &AABB {
        &self.nodes[NodeId::ROOT.0].bounds
    }

    /// Configuration
    pub fn config(&self) -> &QuadTreeConfig {
        &self.config
    }

    /// Root node
    pub fn root(&self) -> &QuadNode<K> {
        &self.nodes[NodeId::ROOT.0]
    }

    /// Look up a node by handle
    pub fn node(&self, id: NodeId) -> Option<&QuadNode<K>> {
        self.nodes.get(id.0)
    }

    /// Leaf currently holding `key`
    pub fn location(&self, key: K) -> Option<NodeId> {
        self.locations.get(&key).copied()
    }

    /// Whether `key` is stored in the tree
    pub fn contains(&self, key: K) -> bool {
        self.locations.contains_key(&key)
    }

    /// Insert an object into the tree
    ///
    /// Returns `false` (and leaves the tree untouched) when the anchor point
    /// lies outside the root footprint. Inserting a key that is already
    /// present moves it.
    pub fn insert(&mut self, key: K, bounds: AABB, position: Vec3) -> bool {
        let anchor = Self::anchor_point(&bounds, position);
        if !anchor.x.is_finite() || !anchor.z.is_finite() || !self.bounds().contains_point_xz(anchor) {
            return false;
        }

        // Removal never reshapes the tree, so the leaf found here stays a leaf
        let leaf = self.find_leaf(&anchor);
        self.remove(key);

        let node = &mut self.nodes[leaf.0];
        if let NodeKind::Leaf { members } = &mut node.kind {
            members.push(QuadMember { key, bounds, anchor });
        }
        let (len, depth) = (node.members().len(), node.depth);
        self.locations.insert(key, leaf);

        if bounds.is_valid() {
            self.max_member_extents = self.max_member_extents.sup(&bounds.extents());
        }

        if len > self.config.bucket_capacity && depth < self.config.max_depth {
            self.subdivide(leaf);
        }

        true
    }

    /// Remove an object from the tree
    ///
    /// Returns whether the key was present. Emptied leaves are not merged back.
    pub fn remove(&mut self, key: K) -> bool {
        let Some(leaf) = self.locations.remove(&key) else {
            return false;
        };

        if let Some(QuadNode { kind: NodeKind::Leaf { members }, .. }) = self.nodes.get_mut(leaf.0) {
            if let Some(index) = members.iter().position(|m| m.key == key) {
                members.swap_remove(index);
                return true;
            }
        }

        false
    }

    /// Append every member whose box intersects `primitive` to `results`
    ///
    /// Returns the number of primitive-vs-box tests performed, counting one
    /// per visited node and one per tested member.
    pub fn collect_intersections<P: Intersectable + ?Sized>(&self, primitive: &P, results: &mut Vec<K>) -> usize {
        let mut checks = 0;
        self.collect_node(NodeId::ROOT, primitive, results, &mut checks);
        checks
    }

    fn collect_node<P: Intersectable + ?Sized>(&self, id: NodeId, primitive: &P, results: &mut Vec<K>, checks: &mut usize) {
        let node = &self.nodes[id.0];

        // Members may overhang their leaf by up to the largest half-extent
        *checks += 1;
        if !primitive.intersects_aabb(&node.bounds.expanded(self.max_member_extents)) {
            return;
        }

        match &node.kind {
            NodeKind::Leaf { members } => {
                for member in members.iter().filter(|m| m.bounds.is_valid()) {
                    *checks += 1;
                    if primitive.intersects_aabb(&member.bounds) {
                        results.push(member.key);
                    }
                }
            }
            NodeKind::Internal { children } => {
                for child in children {
                    self.collect_node(*child, primitive, results, checks);
                }
            }
        }
    }

    /// Get bounds of all leaf nodes (for visualization)
    pub fn leaf_bounds(&self) -> Vec<AABB> {
        self.nodes
            .iter()
            .filter(|node| node.is_leaf())
            .map(|node| node.bounds)
            .collect()
    }

    /// Number of members in the tree
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Whether the tree holds no members
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Total number of nodes
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Number of leaf nodes
    pub fn leaf_count(&self) -> usize {
        self.nodes.iter().filter(|node| node.is_leaf()).count()
    }

    /// Number of subdivisions performed since the tree was created
    pub fn split_count(&self) -> usize {
        self.split_count
    }

    /// Depth of the deepest node
    pub fn depth(&self) -> u32 {
        self.nodes.iter().map(|node| node.depth).max().unwrap_or(0)
    }

    /// Drop every member and child, keeping the root bounds
    pub fn clear(&mut self) {
        let bounds = *self.bounds();
        self.nodes.clear();
        self.nodes.push(QuadNode::new(bounds, 0));
        self.locations.clear();
        self.max_member_extents = Vec3::zeros();
        self.split_count = 0;
    }

    fn find_leaf(&self, anchor: &Vec3) -> NodeId {
        let mut id = NodeId::ROOT;
        while let NodeKind::Internal { children } = &self.nodes[id.0].kind {
            id = children[quadrant_index(&self.nodes[id.0].bounds, anchor)];
        }
        id
    }

    /// Split a leaf into 4 children and hand its members down
    ///
    /// Members go straight into the child leaves; a child over capacity only
    /// splits on its next insertion.
    fn subdivide(&mut self, id: NodeId) {
        let (bounds, depth) = {
            let node = &self.nodes[id.0];
            if !node.is_leaf() {
                return; // Already subdivided
            }
            (node.bounds, node.depth)
        };

        let first = self.nodes.len();
        let children = [NodeId(first), NodeId(first + 1), NodeId(first + 2), NodeId(first + 3)];
        for quadrant in 0..4 {
            self.nodes.push(QuadNode::new(quadrant_bounds(&bounds, quadrant), depth + 1));
        }

        let previous = std::mem::replace(&mut self.nodes[id.0].kind, NodeKind::Internal { children });
        let NodeKind::Leaf { members } = previous else {
            return;
        };
        let redistributed = members.len();

        for member in members {
            let child = children[quadrant_index(&bounds, &member.anchor)];
            self.locations.insert(member.key, child);
            if let NodeKind::Leaf { members } = &mut self.nodes[child.0].kind {
                members.push(member);
            }
        }

        self.split_count += 1;
        log::debug!(
            "Quad-tree node {} split at depth {}, redistributed {} members",
            id.0, depth, redistributed
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn footprint(half: f32) -> AABB {
        AABB::footprint(Vec3::new(-half, 0.0, -half), Vec3::new(half, 0.0, half))
    }

    fn unit_cube_at(center: Vec3) -> AABB {
        AABB::from_center_extents(center, Vec3::repeat(0.5))
    }

    fn tree(capacity: usize, max_depth: u32) -> QuadTree<u32> {
        QuadTree::new(footprint(50.0), QuadTreeConfig { bucket_capacity: capacity, max_depth })
    }

    fn query(tree: &QuadTree<u32>, primitive: &AABB) -> Vec<u32> {
        let mut results = Vec::new();
        tree.collect_intersections(primitive, &mut results);
        results.sort_unstable();
        results
    }

    #[test]
    fn test_insert_and_query() {
        let mut tree = tree(4, 8);
        assert!(tree.insert(1, unit_cube_at(Vec3::new(10.0, 0.0, 10.0)), Vec3::zeros()));
        assert!(tree.insert(2, unit_cube_at(Vec3::new(-10.0, 0.0, 10.0)), Vec3::zeros()));

        assert_eq!(tree.len(), 2);
        assert_eq!(query(&tree, &unit_cube_at(Vec3::new(10.0, 0.0, 10.0))), vec![1]);
        assert!(query(&tree, &unit_cube_at(Vec3::new(0.0, 0.0, -30.0))).is_empty());
    }

    #[test]
    fn test_out_of_bounds_insert_fails() {
        let mut tree = tree(4, 8);
        assert!(!tree.insert(1, unit_cube_at(Vec3::new(60.0, 0.0, 0.0)), Vec3::zeros()));
        assert!(!tree.insert(2, AABB::empty(), Vec3::new(0.0, 0.0, -51.0)));
        assert!(tree.is_empty());

        // Y never matters
        assert!(tree.insert(3, unit_cube_at(Vec3::new(0.0, 1e6, 0.0)), Vec3::zeros()));
    }

    #[test]
    fn test_empty_box_uses_position_as_anchor() {
        let mut tree = tree(4, 8);
        assert!(tree.insert(7, AABB::empty(), Vec3::new(20.0, 0.0, -20.0)));

        let leaf = tree.location(7).unwrap();
        assert_eq!(tree.node(leaf).unwrap().members()[0].anchor, Vec3::new(20.0, 0.0, -20.0));

        // Never reported by queries
        assert!(query(&tree, &footprint(100.0)).is_empty());
    }

    #[test]
    fn test_single_split_keeps_every_member() {
        let mut tree = tree(4, 8);
        let positions = [
            Vec3::new(-20.0, 0.0, -20.0),
            Vec3::new(20.0, 0.0, -20.0),
            Vec3::new(-20.0, 0.0, 20.0),
            Vec3::new(20.0, 0.0, 20.0),
        ];
        for (key, position) in positions.iter().enumerate() {
            assert!(tree.insert(key as u32, unit_cube_at(*position), *position));
        }
        assert!(tree.root().is_leaf());
        assert_eq!(tree.split_count(), 0);

        assert!(tree.insert(4, unit_cube_at(Vec3::new(25.0, 0.0, 25.0)), Vec3::zeros()));

        assert_eq!(tree.split_count(), 1);
        assert!(!tree.root().is_leaf());
        assert!(tree.root().members().is_empty());
        assert_eq!(tree.node_count(), 5);
        assert_eq!(tree.leaf_count(), 4);

        let children = tree.root().children().unwrap();
        let counts: Vec<usize> = children.iter().map(|c| tree.node(*c).unwrap().members().len()).collect();
        assert_eq!(counts, vec![1, 1, 1, 2]);
        for child in children {
            assert_eq!(tree.node(child).unwrap().depth, 1);
        }

        let everything = AABB::new(Vec3::repeat(-100.0), Vec3::repeat(100.0));
        assert_eq!(query(&tree, &everything), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_max_depth_stops_splitting() {
        let mut tree = tree(1, 0);
        for key in 0..10 {
            let position = Vec3::new(key as f32, 0.0, 0.0);
            assert!(tree.insert(key, unit_cube_at(position), position));
        }
        assert!(tree.root().is_leaf());
        assert_eq!(tree.split_count(), 0);
        assert_eq!(tree.root().members().len(), 10);
    }

    #[test]
    fn test_boundary_goes_to_higher_quadrant() {
        let bounds = footprint(10.0);
        assert_eq!(quadrant_index(&bounds, &Vec3::new(0.0, 0.0, 0.0)), 3);
        assert_eq!(quadrant_index(&bounds, &Vec3::new(-0.1, 0.0, 0.0)), 2);
        assert_eq!(quadrant_index(&bounds, &Vec3::new(0.0, 0.0, -0.1)), 1);
        assert_eq!(quadrant_index(&bounds, &Vec3::new(-0.1, 0.0, -0.1)), 0);

        let upper = quadrant_bounds(&bounds, 3);
        assert_eq!(upper.min.x, 0.0);
        assert_eq!(upper.max.z, 10.0);
        assert_eq!(upper.min.y, f32::NEG_INFINITY);
        assert_eq!(upper.max.y, f32::INFINITY);
    }

    #[test]
    fn test_overhanging_member_found_across_quadrants() {
        let mut tree = tree(1, 4);
        // Wide member anchored in +X, reaching far into -X
        let wide = AABB::new(Vec3::new(-30.0, -1.0, 1.0), Vec3::new(40.0, 1.0, 2.0));
        assert!(tree.insert(1, wide, Vec3::zeros()));
        assert!(tree.insert(2, unit_cube_at(Vec3::new(-40.0, 0.0, -40.0)), Vec3::zeros()));
        assert!(tree.insert(3, unit_cube_at(Vec3::new(40.0, 0.0, -40.0)), Vec3::zeros()));
        assert!(tree.split_count() >= 1);

        let volume = unit_cube_at(Vec3::new(-25.0, 0.0, 1.5));
        assert_eq!(query(&tree, &volume), vec![1]);
    }

    #[test]
    fn test_remove_then_reinsert() {
        let mut tree = tree(2, 8);
        for key in 0..6 {
            let position = Vec3::new(key as f32 * 7.0 - 20.0, 0.0, key as f32 * -5.0 + 10.0);
            assert!(tree.insert(key, unit_cube_at(position), position));
        }
        let volume = AABB::new(Vec3::new(-15.0, -5.0, -15.0), Vec3::new(15.0, 5.0, 15.0));
        let before = query(&tree, &volume);

        let member = tree.node(tree.location(3).unwrap()).unwrap().members().iter().find(|m| m.key == 3).copied().unwrap();
        assert!(tree.remove(3));
        assert!(!tree.remove(3));
        assert!(!tree.contains(3));
        assert!(tree.insert(3, member.bounds, member.anchor));

        assert_eq!(query(&tree, &volume), before);
    }

    #[test]
    fn test_reinsert_moves_member() {
        let mut tree = tree(4, 8);
        assert!(tree.insert(1, unit_cube_at(Vec3::new(-20.0, 0.0, 0.0)), Vec3::zeros()));
        assert!(tree.insert(1, unit_cube_at(Vec3::new(20.0, 0.0, 0.0)), Vec3::zeros()));

        assert_eq!(tree.len(), 1);
        assert!(query(&tree, &unit_cube_at(Vec3::new(-20.0, 0.0, 0.0))).is_empty());
        assert_eq!(query(&tree, &unit_cube_at(Vec3::new(20.0, 0.0, 0.0))), vec![1]);
    }

    #[test]
    fn test_reinsert_within_split_tree_keeps_one_entry() {
        let mut tree = tree(2, 8);
        for key in 0..6 {
            let position = Vec3::new(key as f32 * 6.0 - 15.0, 0.0, 12.0);
            assert!(tree.insert(key, unit_cube_at(position), position));
        }
        assert!(tree.split_count() >= 1);

        // Same leaf, then a different quadrant
        let moved = Vec3::new(-14.0, 0.0, 12.5);
        assert!(tree.insert(0, unit_cube_at(moved), moved));
        let far = Vec3::new(30.0, 0.0, -30.0);
        assert!(tree.insert(0, unit_cube_at(far), far));

        assert_eq!(tree.len(), 6);
        let stored: usize = (0..tree.node_count())
            .filter_map(|i| tree.node(NodeId(i)))
            .map(|node| node.members().iter().filter(|m| m.key == 0).count())
            .sum();
        assert_eq!(stored, 1);
        assert_eq!(query(&tree, &unit_cube_at(far)), vec![0]);

        // A rejected move leaves the member where it was
        assert!(!tree.insert(0, unit_cube_at(Vec3::new(90.0, 0.0, 0.0)), Vec3::zeros()));
        assert_eq!(query(&tree, &unit_cube_at(far)), vec![0]);
    }

    #[test]
    fn test_pruning_reduces_checks() {
        let mut tree = tree(4, 8);
        let mut key = 0;
        for x in -4..4 {
            for z in -4..4 {
                let position = Vec3::new(x as f32 * 10.0 + 5.0, 0.0, z as f32 * 10.0 + 5.0);
                assert!(tree.insert(key, unit_cube_at(position), position));
                key += 1;
            }
        }

        let mut results = Vec::new();
        let checks = tree.collect_intersections(&unit_cube_at(Vec3::new(5.0, 0.0, 5.0)), &mut results);
        assert_eq!(results.len(), 1);
        assert!(checks < 64, "expected pruning, got {} checks", checks);
    }

    #[test]
    fn test_clear() {
        let mut tree = tree(1, 8);
        for key in 0..5 {
            let position = Vec3::new(key as f32 * 10.0 - 20.0, 0.0, 0.0);
            tree.insert(key, unit_cube_at(position), position);
        }
        tree.clear();

        assert!(tree.is_empty());
        assert_eq!(tree.node_count(), 1);
        assert_eq!(tree.split_count(), 0);
        assert_eq!(*tree.bounds(), footprint(50.0));
    }
}
