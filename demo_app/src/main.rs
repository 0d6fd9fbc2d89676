//! Culling and batching demo
//!
//! Builds a hierarchical city-block scene out of instanced sub-scenes,
//! then runs a few camera angles through the culling tree and prints what
//! each pass would draw.

use std::sync::Arc;

use render_core::prelude::*;

/// One reusable "building": a few stacked boxes sharing one geometry, with
/// the top box using a second material.
fn build_building(resources: &mut ResourceStore) -> Arc<SceneData> {
    let box_geometry = resources.add_geometry(Geometry::new());
    let wall_material = resources.add_material(Material::new(0));
    let roof_material = {
        let mut material = Material::new(0);
        material.set_texture(TextureUnit::Diffuse, Some(TextureId(7)));
        resources.add_material(material)
    };

    let mut wall_mesh = Mesh::new(Aabb::from_center_size(
        Vec3::zeros(),
        Vec3::new(2.0, 2.0, 2.0),
    ));
    wall_mesh.add_section(box_geometry, wall_material, 12);
    let wall = Arc::new(MeshInstance::new(Arc::new(wall_mesh)));

    let mut roof_mesh = Mesh::new(Aabb::from_center_size(
        Vec3::zeros(),
        Vec3::new(2.0, 1.0, 2.0),
    ));
    roof_mesh.add_section(box_geometry, roof_material, 12);
    let roof = Arc::new(MeshInstance::new(Arc::new(roof_mesh)));

    let mut building = SceneData::new();
    for floor in 0..3 {
        building.add_renderable(
            wall.clone(),
            &Mat4::new_translation(&Vec3::new(0.0, floor as f32 * 2.0 + 1.0, 0.0)),
        );
    }
    building.add_renderable(roof, &Mat4::new_translation(&Vec3::new(0.0, 6.5, 0.0)));
    Arc::new(building)
}

/// A block instances the building sub-scene in a small grid.
fn build_block(building: &Arc<SceneData>) -> Arc<SceneData> {
    let mut block = SceneData::new();
    for i in 0..3 {
        for j in 0..3 {
            block.merge(
                building,
                &Mat4::new_translation(&Vec3::new(i as f32 * 6.0, 0.0, j as f32 * 6.0)),
            );
        }
    }
    block.add_light(Arc::new(
        Light::new(Vec3::new(6.0, 10.0, 6.0), 30.0).with_diffuse(Vec3::new(1.0, 0.9, 0.7)),
    ));
    Arc::new(block)
}

fn main() {
    env_logger::init();

    let mut resources = ResourceStore::new();
    let building = build_building(&mut resources);
    let block = build_block(&building);

    // The city instances the block four times around the origin.
    let mut city = SceneData::new();
    for (x, z) in [(-30.0, -40.0), (10.0, -40.0), (-30.0, -80.0), (10.0, -80.0)] {
        city.merge(&block, &Mat4::new_translation(&Vec3::new(x, 0.0, z)));
    }
    let city = Arc::new(city);

    log::info!(
        "city: {} renderables, {} lights",
        city.renderable_total(),
        city.light_count()
    );

    let mut camera = Camera::perspective(std::f32::consts::FRAC_PI_2, 16.0 / 9.0, 0.1, 500.0);
    let mut tree = KdTree::new();
    let mut pool = RenderJobPool::with_config(&PoolConfig::default());
    let mut jobs = Vec::new();
    let mut gfx = RecordingDevice::new();

    tree.reconstruct(&city);

    let views = [
        ("overview", Vec3::new(0.0, 40.0, 30.0), Vec3::new(-10.0, 0.0, -60.0)),
        ("street level", Vec3::new(-30.0, 2.0, -30.0), Vec3::new(-30.0, 2.0, -60.0)),
        ("looking away", Vec3::new(0.0, 5.0, 50.0), Vec3::new(0.0, 5.0, 200.0)),
    ];

    for (name, eye, target) in views {
        camera.look_at(eye, target, Vec3::y());
        pool.reset(&mut resources);

        // Depth pre-pass: shadow casters only, no material state.
        tree.cull(0, &camera, &mut resources, &mut pool, &mut jobs);
        gfx.clear();
        let depth_filter = RenderFilter::RENDER_ALL - RenderFilter::CAST_SHADOW_OFF;
        for &job in &jobs {
            pool.render(
                job,
                &mut gfx,
                &camera,
                depth_filter,
                RenderFlags::MATERIALS_OFF | RenderFlags::BLENDING_OFF,
                &resources,
            );
        }
        let depth_draws = gfx.draw_calls.len();

        // Main pass: everything, full material state.
        tree.cull(1, &camera, &mut resources, &mut pool, &mut jobs);
        gfx.clear();
        for &job in &jobs {
            pool.render(
                job,
                &mut gfx,
                &camera,
                RenderFilter::RENDER_ALL,
                RenderFlags::empty(),
                &resources,
            );
        }

        log::info!(
            "{name}: {} visible instances in {} batches ({} depth draws, {} material binds)",
            gfx.total_instances(),
            gfx.draw_calls.len(),
            depth_draws,
            gfx.material_binds,
        );
    }
}
