//! Randomized checks that quad-tree queries report exactly what a linear
//! scan reports, before and after the scene changes

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::{EngineConfig, SpatialIndexConfig};
use crate::foundation::math::{Point3, Vec3};
use crate::scene::{
    unit_cube_vertices, Frustum, ObjectKey, QueryPrimitive, Ray, SceneError, SceneManager, Sphere, TransformComponent, AABB,
};
use crate::spatial::QuadTree;

#[cfg(test)]
mod tests {
    use super::*;

    struct RandomScene {
        scene: SceneManager,
        carriers: Vec<ObjectKey>,
        statics: Vec<ObjectKey>,
    }

    fn random_unit_vector(rng: &mut StdRng) -> Vec3 {
        loop {
            let v = Vec3::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0));
            let length = v.norm();
            if length > 0.1 && length <= 1.0 {
                return v / length;
            }
        }
    }

    fn random_rotation(rng: &mut StdRng) -> Vec3 {
        Vec3::new(rng.gen_range(-180.0..180.0), rng.gen_range(-180.0..180.0), rng.gen_range(-180.0..180.0))
    }

    /// Dynamic carriers with static cargo attached, loose static props and a
    /// few dynamic objects the index must ignore
    fn build_scene(seed: u64, capacity: usize) -> RandomScene {
        let config = EngineConfig::new().with_spatial_index(SpatialIndexConfig::new().with_bucket_capacity(capacity));
        let mut scene = SceneManager::new(config);
        let mut rng = StdRng::seed_from_u64(seed);
        let cube = unit_cube_vertices();
        let mut carriers = Vec::new();
        let mut statics = Vec::new();

        for i in 0..6 {
            let transform = TransformComponent::from_position(Vec3::new(rng.gen_range(-35.0..35.0), 0.0, rng.gen_range(-35.0..35.0)))
                .with_rotation_euler_deg(0.0, rng.gen_range(-180.0..180.0), 0.0)
                .with_uniform_scale(rng.gen_range(0.5..2.0));
            carriers.push(scene.create_object(format!("carrier {}", i), transform, None).unwrap());
        }

        for i in 0..60 {
            let parent = if i % 3 == 0 { Some(carriers[i % carriers.len()]) } else { None };
            let position = match parent {
                Some(_) => Vec3::new(rng.gen_range(-3.0..3.0), rng.gen_range(-1.0..1.0), rng.gen_range(-3.0..3.0)),
                None => Vec3::new(rng.gen_range(-45.0..45.0), rng.gen_range(-5.0..5.0), rng.gen_range(-45.0..45.0)),
            };
            let angles = random_rotation(&mut rng);
            let transform = TransformComponent::from_position(position)
                .with_rotation_euler_deg(angles.x, angles.y, angles.z)
                .with_scale(Vec3::new(rng.gen_range(0.2..3.0), rng.gen_range(0.2..3.0), rng.gen_range(0.2..3.0)))
                .with_static(true);
            statics.push(scene.create_object_with_mesh(format!("prop {}", i), transform, parent, cube.clone()).unwrap());
        }

        for i in 0..10 {
            let transform = TransformComponent::from_position(Vec3::new(rng.gen_range(-45.0..45.0), 0.0, rng.gen_range(-45.0..45.0)));
            scene.create_object_with_mesh(format!("drone {}", i), transform, None, cube.clone()).unwrap();
        }

        RandomScene { scene, carriers, statics }
    }

    fn random_queries(rng: &mut StdRng, count: usize) -> Vec<QueryPrimitive> {
        let mut queries = Vec::with_capacity(count * 4);
        for _ in 0..count {
            let center = Vec3::new(rng.gen_range(-55.0..55.0), rng.gen_range(-8.0..8.0), rng.gen_range(-55.0..55.0));

            queries.push(Sphere::new(center, rng.gen_range(0.5..15.0)).into());

            let extents = Vec3::new(rng.gen_range(0.5..15.0), rng.gen_range(0.5..15.0), rng.gen_range(0.5..15.0));
            queries.push(AABB::from_center_extents(center, extents).into());

            let direction = random_unit_vector(rng);
            queries.push(Ray::segment(center, center + direction * rng.gen_range(5.0..60.0)).into());

            let eye = Point3::new(rng.gen_range(-60.0..60.0), rng.gen_range(2.0..25.0), rng.gen_range(-60.0..60.0));
            let target = Point3::new(rng.gen_range(-40.0..40.0), 0.0, rng.gen_range(-40.0..40.0));
            queries.push(
                Frustum::from_perspective(
                    eye,
                    target,
                    Vec3::y(),
                    rng.gen_range(0.75..2.0),
                    rng.gen_range(0.3..1.6),
                    0.1,
                    rng.gen_range(10.0..120.0),
                )
                .into(),
            );
        }
        queries
    }

    fn sorted(mut keys: Vec<ObjectKey>) -> Vec<ObjectKey> {
        keys.sort_unstable();
        keys
    }

    fn assert_equivalent(scene: &mut SceneManager, queries: &[QueryPrimitive]) -> (usize, usize) {
        assert!(scene.is_indexed());
        let mut indexed_checks = 0;
        let mut scan_checks = 0;

        for (i, query) in queries.iter().enumerate() {
            let indexed = scene.query_intersections(query);
            let scanned = scene.brute_force(query);
            assert!(indexed.indexed);
            assert!(!scanned.indexed);
            assert_eq!(sorted(indexed.objects), sorted(scanned.objects), "query {} disagrees: {:?}", i, query);
            indexed_checks += indexed.checks_performed;
            scan_checks += scanned.checks_performed;
        }
        (indexed_checks, scan_checks)
    }

    /// Every static object is indexed exactly when its anchor lies inside the footprint
    fn assert_index_follows_footprint(scene: &SceneManager) -> usize {
        let footprint = scene.index().footprint().unwrap();
        let mut outside = 0;
        for (key, object) in scene.objects().filter(|(_, object)| object.transform().is_static()) {
            let transform = object.transform();
            let anchor = QuadTree::<ObjectKey>::anchor_point(&transform.bounding_box(), transform.world_position());
            let inside = footprint.contains_point_xz(anchor);
            assert_eq!(scene.index().is_indexed(key), inside, "{:?} anchored at {:?}", key, anchor);
            if !inside {
                outside += 1;
            }
        }
        outside
    }

    /// Tree results equal the linear scan restricted to indexed objects
    fn assert_matches_indexed_scan(scene: &mut SceneManager, queries: &[QueryPrimitive]) {
        for (i, query) in queries.iter().enumerate() {
            let indexed = sorted(scene.query_intersections(query).objects);
            let scanned = scene.brute_force(query).objects;
            let expected = sorted(scanned.into_iter().filter(|key| scene.index().is_indexed(*key)).collect());
            assert_eq!(indexed, expected, "query {} disagrees: {:?}", i, query);
        }
    }

    #[test]
    fn test_fixed_tree_matches_linear_scan() {
        let mut world = build_scene(11, 3);
        let report = world.scene.generate_configured().unwrap();
        assert_eq!(report.inserted, world.statics.len());
        assert!(report.out_of_bounds.is_empty());

        let queries = random_queries(&mut StdRng::seed_from_u64(99), 40);
        let (indexed_checks, scan_checks) = assert_equivalent(&mut world.scene, &queries);
        assert_eq!(scan_checks, queries.len() * world.statics.len());
        assert!(indexed_checks > 0);
    }

    #[test]
    fn test_adaptive_tree_matches_linear_scan() {
        let mut world = build_scene(23, 2);
        let report = world.scene.generate_adaptive().unwrap();
        assert_eq!(report.inserted, world.statics.len());

        let queries = random_queries(&mut StdRng::seed_from_u64(5), 40);
        assert_equivalent(&mut world.scene, &queries);
    }

    #[test]
    fn test_equivalence_survives_scene_edits() {
        let mut world = build_scene(42, 4);
        world.scene.generate_configured().unwrap();
        let queries = random_queries(&mut StdRng::seed_from_u64(7), 25);
        assert_equivalent(&mut world.scene, &queries);

        let mut rng = StdRng::seed_from_u64(1234);

        // Carry static cargo somewhere else
        for carrier in world.carriers.clone() {
            let target = Vec3::new(rng.gen_range(-35.0..35.0), rng.gen_range(-2.0..2.0), rng.gen_range(-35.0..35.0));
            assert!(world.scene.set_position(carrier, target).unwrap());
            assert!(world.scene.set_rotation_euler_deg(carrier, Vec3::new(0.0, rng.gen_range(-180.0..180.0), 0.0)).unwrap());
        }
        assert_equivalent(&mut world.scene, &queries);

        // Hand cargo from one carrier to another
        let cargo: Vec<ObjectKey> = world
            .statics
            .iter()
            .copied()
            .filter(|key| world.scene.graph().get(*key).and_then(|object| object.parent()).is_some())
            .collect();
        for (i, key) in cargo.iter().enumerate() {
            let next = world.carriers[(i + 1) % world.carriers.len()];
            world.scene.set_parent(*key, Some(next)).unwrap();
        }
        world.scene.set_position(world.carriers[0], Vec3::new(-20.0, 0.0, 20.0)).unwrap();
        assert_equivalent(&mut world.scene, &queries);

        // Toggle some props to dynamic and back
        for key in world.statics.iter().step_by(4) {
            world.scene.set_static(*key, false).unwrap();
        }
        assert_equivalent(&mut world.scene, &queries);
        for key in world.statics.iter().step_by(8) {
            world.scene.set_static(*key, true).unwrap();
        }
        assert_equivalent(&mut world.scene, &queries);

        // Destroy a carrier with everything it holds
        let removed = world.scene.destroy(world.carriers[1]).unwrap();
        assert!(removed.len() > 1);
        assert_equivalent(&mut world.scene, &queries);
    }

    #[test]
    fn test_frustum_culling_matches_scan() {
        let mut world = build_scene(8, 3);
        world.scene.generate_configured().unwrap();
        let mut rng = StdRng::seed_from_u64(77);

        for _ in 0..30 {
            let eye = Point3::new(rng.gen_range(-50.0..50.0), rng.gen_range(3.0..30.0), rng.gen_range(-50.0..50.0));
            let target = Point3::new(rng.gen_range(-30.0..30.0), 0.0, rng.gen_range(-30.0..30.0));
            let frustum = Frustum::from_perspective(eye, target, Vec3::y(), 16.0 / 9.0, 1.0, 0.1, 80.0);

            let culled = world.scene.frustum_culling(&frustum);
            let scanned = world.scene.brute_force(&frustum);
            assert_eq!(sorted(culled.objects), sorted(scanned.objects));
        }
    }

    #[test]
    fn test_objects_crossing_footprint_edge() {
        let mut world = build_scene(314, 3);
        world.scene.generate_configured().unwrap();
        let queries = random_queries(&mut StdRng::seed_from_u64(21), 25);
        assert_eq!(assert_index_follows_footprint(&world.scene), 0);

        // Carry all cargo well outside the footprint
        for (i, carrier) in world.carriers.clone().into_iter().enumerate() {
            let target = Vec3::new(150.0 + i as f32 * 10.0, 0.0, -120.0);
            assert!(world.scene.set_position(carrier, target).unwrap());
        }
        assert!(assert_index_follows_footprint(&world.scene) > 0);
        assert_matches_indexed_scan(&mut world.scene, &queries);

        // Park one carrier on the edge so its cargo straddles it
        world.scene.set_position(world.carriers[0], Vec3::new(49.0, 0.0, 0.0)).unwrap();
        assert_index_follows_footprint(&world.scene);
        assert_matches_indexed_scan(&mut world.scene, &queries);

        // Bring everything back inside: the tree answers like the scan again
        let mut rng = StdRng::seed_from_u64(99);
        for carrier in world.carriers.clone() {
            let target = Vec3::new(rng.gen_range(-35.0..35.0), 0.0, rng.gen_range(-35.0..35.0));
            assert!(world.scene.set_position(carrier, target).unwrap());
        }
        assert_eq!(assert_index_follows_footprint(&world.scene), 0);
        assert_equivalent(&mut world.scene, &queries);

        // A static object created outside is reported and left to the scan
        let created = world.scene.create_object_with_mesh(
            "stray",
            TransformComponent::from_position(Vec3::new(70.0, 0.0, 10.0)).with_static(true),
            None,
            unit_cube_vertices(),
        );
        let stray = match created {
            Err(SceneError::CreatedOutsideIndex { key, .. }) => key,
            other => panic!("expected CreatedOutsideIndex, got {:?}", other),
        };
        assert_eq!(assert_index_follows_footprint(&world.scene), 1);
        assert_matches_indexed_scan(&mut world.scene, &queries);

        world.scene.destroy(stray).unwrap();
        assert_equivalent(&mut world.scene, &queries);
    }
}
