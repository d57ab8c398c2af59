//! Scenario tests for building, splitting and maintaining the quad-tree
//! through the scene manager

use crate::core::{EngineConfig, SpatialIndexConfig};
use crate::foundation::math::Vec3;
use crate::scene::{unit_cube_vertices, ObjectKey, SceneManager, Sphere, TransformComponent, AABB};

#[cfg(test)]
mod tests {
    use super::*;

    fn scene_with_capacity(capacity: usize) -> SceneManager {
        let config = EngineConfig::new().with_spatial_index(
            SpatialIndexConfig::new()
                .with_bucket_capacity(capacity)
                .with_fixed_footprint(Vec3::new(-50.0, 0.0, -50.0), Vec3::new(50.0, 0.0, 50.0)),
        );
        SceneManager::new(config)
    }

    fn add_static(scene: &mut SceneManager, name: &str, position: Vec3, scale: f32) -> ObjectKey {
        scene
            .create_object_with_mesh(
                name,
                TransformComponent::from_position(position).with_uniform_scale(scale).with_static(true),
                None,
                unit_cube_vertices(),
            )
            .unwrap()
    }

    fn sorted(mut keys: Vec<ObjectKey>) -> Vec<ObjectKey> {
        keys.sort_unstable();
        keys
    }

    fn whole_footprint() -> AABB {
        AABB::new(Vec3::new(-50.0, -1000.0, -50.0), Vec3::new(50.0, 1000.0, 50.0))
    }

    #[test]
    fn test_clustered_objects_split_once() {
        let mut scene = scene_with_capacity(4);
        let positions = [
            Vec3::new(-0.4, 0.1, -0.3),
            Vec3::new(0.3, -0.2, -0.4),
            Vec3::new(-0.2, 0.4, 0.35),
            Vec3::new(0.45, 0.0, 0.2),
            Vec3::new(0.05, -0.45, 0.05),
        ];
        let keys: Vec<ObjectKey> = positions
            .iter()
            .enumerate()
            .map(|(i, p)| add_static(&mut scene, &format!("cluster {}", i), *p, 0.1))
            .collect();

        let report = scene.generate_fixed(Vec3::new(-50.0, 0.0, -50.0), Vec3::new(50.0, 0.0, 50.0)).unwrap();
        assert_eq!(report.inserted, 5);
        assert!(report.out_of_bounds.is_empty());

        let tree = scene.quad_tree().unwrap();
        assert_eq!(tree.split_count(), 1);
        assert_eq!(tree.node_count(), 5);
        assert!(!tree.root().is_leaf());

        let result = scene.query_intersections(&whole_footprint());
        assert!(result.indexed);
        assert_eq!(sorted(result.objects), sorted(keys));
    }

    #[test]
    fn test_capacity_overflow_keeps_every_member() {
        let mut scene = scene_with_capacity(4);
        scene.generate_configured().unwrap();

        let mut keys = Vec::new();
        for i in 0..4 {
            keys.push(add_static(&mut scene, &format!("early {}", i), Vec3::new(-30.0 + i as f32 * 20.0, 0.0, 12.0), 1.0));
        }
        assert_eq!(scene.quad_tree().unwrap().split_count(), 0);

        keys.push(add_static(&mut scene, "overflow", Vec3::new(5.0, 0.0, -25.0), 1.0));

        let tree = scene.quad_tree().unwrap();
        assert_eq!(tree.split_count(), 1);
        assert_eq!(tree.root().children().map(|c| c.len()), Some(4));
        assert!(tree.root().members().is_empty());

        for key in &keys {
            let center = scene.graph().bounding_box(*key).unwrap().center();
            let hits = scene.query_intersections(&Sphere::new(center, 0.1)).objects;
            assert_eq!(hits, vec![*key]);
        }
        assert_eq!(sorted(scene.query_intersections(&whole_footprint()).objects), sorted(keys));
    }

    #[test]
    fn test_remove_then_reinsert_matches_original() {
        let mut scene = scene_with_capacity(2);
        let mut keys = Vec::new();
        for i in 0..12 {
            let angle = i as f32 * 0.7;
            keys.push(add_static(&mut scene, &format!("ring {}", i), Vec3::new(angle.cos() * 20.0, 0.0, angle.sin() * 20.0), 2.0));
        }
        scene.generate_configured().unwrap();

        let queries = [
            AABB::new(Vec3::new(-25.0, -5.0, -5.0), Vec3::new(0.0, 5.0, 25.0)),
            AABB::new(Vec3::new(10.0, -5.0, -25.0), Vec3::new(30.0, 5.0, 0.0)),
            whole_footprint(),
        ];
        let before: Vec<Vec<ObjectKey>> = queries.iter().map(|p| sorted(scene.query_intersections(p).objects)).collect();

        let victim = keys[5];
        scene.set_static(victim, false).unwrap();
        assert!(!scene.index().is_indexed(victim));
        scene.set_static(victim, true).unwrap();
        assert!(scene.index().is_indexed(victim));

        let after: Vec<Vec<ObjectKey>> = queries.iter().map(|p| sorted(scene.query_intersections(p).objects)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_queries_without_tree_fall_back() {
        let mut scene = scene_with_capacity(4);
        let a = add_static(&mut scene, "a", Vec3::new(1.0, 0.0, 1.0), 1.0);
        let _b = add_static(&mut scene, "b", Vec3::new(40.0, 0.0, 40.0), 1.0);

        let volume = Sphere::new(Vec3::new(1.0, 0.0, 1.0), 2.0);
        let scanned = scene.query_intersections(&volume);
        assert!(!scanned.indexed);
        assert_eq!(scanned.objects, vec![a]);
        assert_eq!(scanned.checks_performed, 2);

        scene.generate_configured().unwrap();
        let indexed = scene.query_intersections(&volume);
        assert!(indexed.indexed);
        assert_eq!(indexed.objects, vec![a]);

        scene.unload();
        assert!(!scene.is_indexed());
        let scanned_again = scene.query_intersections(&volume);
        assert!(!scanned_again.indexed);
        assert_eq!(scanned_again.objects, vec![a]);
        assert_eq!(scene.last_checks(), 2);
    }

    #[test]
    fn test_regenerate_replaces_tree() {
        let mut scene = scene_with_capacity(1);
        for i in 0..6 {
            add_static(&mut scene, &format!("post {}", i), Vec3::new(i as f32 * 15.0 - 40.0, 0.0, 30.0), 1.0);
        }
        scene.generate_configured().unwrap();
        let fixed_nodes = scene.quad_tree().unwrap().node_count();
        assert!(fixed_nodes > 1);

        let report = scene.generate_adaptive().unwrap();
        assert_eq!(report.inserted, 6);
        assert!(report.footprint.max.x - report.footprint.min.x < 100.0);
        assert_eq!(scene.quad_tree().unwrap().len(), 6);
        assert_eq!(scene.index().footprint(), Some(report.footprint));
    }

    #[test]
    fn test_objects_without_mesh_never_match() {
        let mut scene = scene_with_capacity(4);
        let empty = scene
            .create_object("marker", TransformComponent::from_position(Vec3::new(2.0, 0.0, 2.0)).with_static(true), None)
            .unwrap();
        scene.generate_configured().unwrap();

        assert!(scene.index().is_indexed(empty));
        assert!(scene.graph().bounding_box(empty).unwrap().is_empty());
        assert!(scene.query_intersections(&whole_footprint()).objects.is_empty());
        assert!(scene.brute_force(&whole_footprint()).objects.is_empty());

        // Giving it geometry re-files it with real bounds
        scene.update_bounding_box(empty, Some(&unit_cube_vertices())).unwrap();
        assert_eq!(scene.query_intersections(&Sphere::new(Vec3::new(2.0, 0.0, 2.0), 0.1)).objects, vec![empty]);
    }
}
