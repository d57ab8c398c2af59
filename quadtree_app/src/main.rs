//! Quad-tree Demo
//!
//! Builds a scene of static props and moving carriers, then compares the
//! quad-tree against a linear scan:
//! - Fixed and adaptive footprints over the same objects
//! - Frustum culling from a camera looking down at 30 degrees
//! - Static props riding on a carrier that moves between queries
//! - A spawned collision benchmark with check counts for both paths
//!
//! Usage: `quadtree_demo [config.toml|config.ron]`

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use spatial_scene::foundation::logging;
use spatial_scene::prelude::*;
use spatial_scene::spatial::BuildReport;

// Scene layout
const WORLD_HALF_EXTENT: f32 = 45.0;
const NUM_PROPS: usize = 120;
const NUM_CARRIERS: usize = 3;
const CARGO_PER_CARRIER: usize = 4;
const SEED: u64 = 2024;

// Benchmark
const BENCHMARK_OBJECTS: usize = 2000;
const BENCHMARK_HALF_EXTENT: f32 = 200.0;

struct Demo {
    scene: SceneManager,
    carriers: Vec<ObjectKey>,
    rng: StdRng,
}

impl Demo {
    fn new(config: EngineConfig) -> Result<Self, SceneError> {
        let mut demo = Self {
            scene: SceneManager::new(config),
            carriers: Vec::new(),
            rng: StdRng::seed_from_u64(SEED),
        };
        demo.populate()?;
        Ok(demo)
    }

    fn populate(&mut self) -> Result<(), SceneError> {
        let cube = unit_cube_vertices();

        for i in 0..NUM_PROPS {
            let position = Vec3::new(
                self.rng.gen_range(-WORLD_HALF_EXTENT..WORLD_HALF_EXTENT),
                0.0,
                self.rng.gen_range(-WORLD_HALF_EXTENT..WORLD_HALF_EXTENT),
            );
            let transform = TransformComponent::from_position(position)
                .with_rotation_euler_deg(0.0, self.rng.gen_range(0.0..360.0), 0.0)
                .with_scale(Vec3::new(
                    self.rng.gen_range(0.5..3.0),
                    self.rng.gen_range(0.5..6.0),
                    self.rng.gen_range(0.5..3.0),
                ))
                .with_static(true);
            self.scene.create_object_with_mesh(format!("Prop {}", i), transform, None, cube.clone())?;
        }

        for i in 0..NUM_CARRIERS {
            let position = Vec3::new(self.rng.gen_range(-20.0..20.0), 0.0, self.rng.gen_range(-20.0..20.0));
            let carrier = self.scene.create_object_with_mesh(
                format!("Carrier {}", i),
                TransformComponent::from_position(position).with_uniform_scale(2.0),
                None,
                cube.clone(),
            )?;

            // Cargo is static relative to its carrier; the index follows it anyway
            for j in 0..CARGO_PER_CARRIER {
                let offset = Vec3::new(j as f32 - 1.5, 1.0, 0.0);
                self.scene.create_object_with_mesh(
                    format!("Cargo {}-{}", i, j),
                    TransformComponent::from_position(offset).with_uniform_scale(0.4).with_static(true),
                    Some(carrier),
                    cube.clone(),
                )?;
            }
            self.carriers.push(carrier);
        }

        log::info!("Populated scene with {} objects", self.scene.graph().len());
        Ok(())
    }

    fn report_build(&self, label: &str, report: &BuildReport<ObjectKey>) {
        let stats = self.scene.quad_tree().map_or((0, 0, 0, 0), |tree| {
            (tree.node_count(), tree.leaf_count(), tree.split_count(), tree.depth())
        });
        println!(
            "{:<9} footprint [{:.1}, {:.1}]..[{:.1}, {:.1}]  indexed {:>4}  outside {:>2}  nodes {:>4}  leaves {:>4}  splits {:>3}  depth {}",
            label,
            report.footprint.min.x,
            report.footprint.min.z,
            report.footprint.max.x,
            report.footprint.max.z,
            report.inserted,
            report.out_of_bounds.len(),
            stats.0,
            stats.1,
            stats.2,
            stats.3,
        );
    }

    fn compare<P: Intersectable + ?Sized>(&mut self, label: &str, primitive: &P) {
        let indexed = self.scene.query_intersections(primitive);
        let scanned = self.scene.brute_force(primitive);

        let mut a = indexed.objects;
        let mut b = scanned.objects;
        a.sort_unstable();
        b.sort_unstable();
        if a != b {
            log::error!("{}: quad-tree and linear scan disagree", label);
        }

        println!(
            "{:<22} hits {:>4}  quad-tree checks {:>5}  brute force checks {:>5}",
            label,
            a.len(),
            indexed.checks_performed,
            scanned.checks_performed,
        );
    }

    fn camera_frustum(&self) -> Frustum {
        // 30 degrees down from the horizon, looking at the origin
        let pitch = 30.0_f32.to_radians();
        let distance = 60.0;
        let eye = Point3::new(0.0, distance * pitch.sin(), distance * pitch.cos());
        Frustum::from_perspective(eye, Point3::origin(), Vec3::y(), 16.0 / 9.0, 60.0_f32.to_radians(), 0.1, 120.0)
    }

    fn run(&mut self) -> Result<(), SceneError> {
        println!("--- Builds ---");
        let report = self.scene.generate_configured()?;
        self.report_build("fixed", &report);
        let report = self.scene.generate_adaptive()?;
        self.report_build("adaptive", &report);

        println!();
        println!("--- Queries ---");
        let frustum = self.camera_frustum();
        self.compare("frustum", &frustum);
        self.compare("box near origin", &AABB::from_center_extents(Vec3::zeros(), Vec3::new(8.0, 10.0, 8.0)));
        self.compare("sphere", &Sphere::new(Vec3::new(20.0, 0.0, -15.0), 6.0));
        self.compare("ray along +X", &Ray::new(Vec3::new(-60.0, 1.0, 3.0), Vec3::x()));

        let visible = self.scene.visible_objects(&frustum);
        println!("{} objects visible (static and dynamic)", visible.len());

        println!();
        println!("--- Moving carriers ---");
        for step in 0..3 {
            for carrier in self.carriers.clone() {
                let target = Vec3::new(self.rng.gen_range(-30.0..30.0), 0.0, self.rng.gen_range(-30.0..30.0));
                self.scene.set_position(carrier, target)?;
            }
            let probe = AABB::from_center_extents(Vec3::zeros(), Vec3::new(30.0, 10.0, 30.0));
            self.compare(&format!("after move {}", step + 1), &probe);
        }

        println!();
        println!("--- Collision benchmark ---");
        let query = AABB::from_center_extents(Vec3::new(25.0, 0.0, -40.0), Vec3::repeat(10.0));
        let benchmark = self.scene.test_collision_checks(BENCHMARK_OBJECTS, BENCHMARK_HALF_EXTENT, &query, SEED)?;
        println!(
            "{} spawned: brute force {} checks / {} hits, quad-tree {} checks / {} hits",
            benchmark.spawned,
            benchmark.brute_force_checks,
            benchmark.brute_force_hits,
            benchmark.quad_tree_checks,
            benchmark.quad_tree_hits,
        );
        Ok(())
    }
}

/// Configuration named on the command line, or the defaults
fn load_config() -> (EngineConfig, Option<String>) {
    let Some(path) = std::env::args().nth(1) else {
        return (EngineConfig::default(), None);
    };

    match EngineConfig::load_from_file(&path).and_then(|config| config.validate().map(|()| config)) {
        Ok(config) => (config, Some(format!("Loaded configuration from {}", path))),
        Err(e) => (EngineConfig::default(), Some(format!("Ignoring configuration {}: {}", path, e))),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let (config, config_note) = load_config();
    logging::init_with_level(&config.log_level);
    if let Some(note) = config_note {
        log::info!("{}", note);
    }

    println!("=== Quad-tree Demo ===");
    println!();

    let debug_mode = config.debug_mode;
    let mut demo = Demo::new(config)?;
    demo.run()?;

    if debug_mode {
        if let Some(tree) = demo.scene.quad_tree() {
            for (i, leaf) in tree.leaf_bounds().iter().enumerate() {
                log::debug!("leaf {}: [{:.1}, {:.1}]..[{:.1}, {:.1}]", i, leaf.min.x, leaf.min.z, leaf.max.x, leaf.max.z);
            }
        }
    }
    Ok(())
}
