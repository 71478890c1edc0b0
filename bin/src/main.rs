#[macro_use]
extern crate log;

mod scene;

use lsis_accelerators::*;
use lsis_core::app::*;
use lsis_core::compute::*;
use lsis_core::geometry::*;
use lsis_core::stats::*;
use lsis_core::{print_stats, report_stats};
use lsis_lights::*;
use scene::*;

fn main() {
    // Initialize `env_logger`.
    env_logger::init();

    let options = options();

    // In case of error report it and exit.
    if let Err(e) = run(options) {
        error!("{e}");
        std::process::exit(1);
    }

    if options.stats {
        report_stats!();
        print_stats!();
    }
}

fn run(options: &Options) -> Result<(), String> {
    let mesh = generate_mesh(&options.scene, options.triangles, options.seed)?;
    if !mesh.is_valid() {
        return Err(format!("Scene '{}' references missing vertices.", options.scene));
    }

    let mut ctx = match options.queue_capacity {
        Some(bytes) => ComputeContext::new(Box::new(HostQueue::with_capacity(bytes))),
        None => ComputeContext::host(),
    };

    // Build and transfer the BVH. Transfer failures leave the device buffers
    // stale but the run continues.
    let split_method = SplitMethod::from(options.split_method.as_str());
    let bvh = BVH::from_mesh(&mesh, split_method);
    if let Err(e) = bvh.upload(&mut ctx) {
        error!("BVH transfer failed ({}): {e}", e.code());
    }

    // Lights fill the scene bounds raised by one unit so a flat grid still
    // gets a volume.
    let scene_bounds = if mesh.faces.is_empty() {
        Bounds3f::new(Point3f::new(-1.0, -1.0, -1.0), Point3f::new(1.0, 1.0, 1.0))
    } else {
        mesh.bounds()
    };
    let light_bounds = scene_bounds.union(&(scene_bounds.p_max + Vector3f::new(0.0, 1.0, 0.0)));
    let lights = generate_lights(options.lights, &light_bounds, options.seed);

    let light_options = LightTreeOptions {
        bins: options.bins,
        traversal_cost: options.traversal_cost,
    };
    let kind = LightStructureKind::from(options.light_structure.as_str());
    let light_structure = LightStructure::build(kind, &lights, light_options);
    if let Err(e) = light_structure.upload(&mut ctx) {
        error!("Light structure transfer failed ({}): {e}", e.code());
    }

    if !options.quiet {
        let wb = bvh.world_bound();
        println!(
            "Scene '{}': {} triangles, {} lights",
            options.scene,
            mesh.faces.len(),
            lights.len()
        );
        println!(
            "BVH ({:?}): {} nodes, bounds [{:?} - {:?}]",
            bvh.split_method,
            bvh.num_nodes(),
            wb.p_min,
            wb.p_max
        );
        println!("Light structure ({:?}): {} nodes", light_structure.kind(), light_structure.num_nodes());
    }

    Ok(())
}
