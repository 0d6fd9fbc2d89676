//! End-to-end frame tests: reconstruct, cull per pass, render, reset.

use std::sync::Arc;

use render_core::prelude::*;

struct Frame {
    resources: ResourceStore,
    pool: RenderJobPool,
    tree: KdTree,
    camera: Camera,
    jobs: Vec<JobId>,
}

impl Frame {
    /// 90 degree FOV square camera at the origin looking down -Z.
    fn new() -> Self {
        Self {
            resources: ResourceStore::new(),
            pool: RenderJobPool::new(),
            tree: KdTree::new(),
            camera: Camera::perspective(std::f32::consts::FRAC_PI_2, 1.0, 0.1, 100.0),
            jobs: Vec::new(),
        }
    }

    fn mesh_instance(&mut self, pass: u32) -> Arc<MeshInstance> {
        let geometry = self.resources.add_geometry(Geometry::new());
        let material = self.resources.add_material(Material::new(pass));
        let mut mesh = Mesh::new(Aabb::from_center_size(
            Vec3::zeros(),
            Vec3::new(1.0, 1.0, 1.0),
        ));
        mesh.add_section(geometry, material, 12);
        Arc::new(MeshInstance::new(Arc::new(mesh)))
    }

    fn cull(&mut self, pass: u32) {
        self.tree.cull(
            pass,
            &self.camera,
            &mut self.resources,
            &mut self.pool,
            &mut self.jobs,
        );
    }

    fn render_all(&self, gfx: &mut RecordingDevice, filter: RenderFilter, flags: RenderFlags) {
        for &job in &self.jobs {
            self.pool
                .render(job, gfx, &self.camera, filter, flags, &self.resources);
        }
    }
}

fn translation(x: f32, y: f32, z: f32) -> Mat4 {
    Mat4::new_translation(&Vec3::new(x, y, z))
}

#[test]
fn three_shared_one_distinct_yields_two_jobs() {
    let mut frame = Frame::new();
    let shared = frame.mesh_instance(0);
    let distinct = frame.mesh_instance(0);

    let mut scene = SceneData::new();
    scene.add_renderable(shared.clone(), &translation(-3.0, 0.0, -20.0));
    scene.add_renderable(shared.clone(), &translation(0.0, 0.0, -20.0));
    scene.add_renderable(shared, &translation(3.0, 0.0, -20.0));
    scene.add_renderable(distinct, &translation(0.0, 3.0, -20.0));
    let scene = Arc::new(scene);

    frame.tree.reconstruct(&scene);
    frame.pool.reset(&mut frame.resources);
    frame.cull(0);

    assert_eq!(frame.jobs.len(), 2);
    let mut counts: Vec<u32> = frame
        .jobs
        .iter()
        .map(|&job| frame.pool.job(job).instance_count())
        .collect();
    counts.sort_unstable();
    assert_eq!(counts, vec![1, 3]);

    // Rendering the sorted jobs produces one instanced draw per job.
    let mut gfx = RecordingDevice::new();
    frame.render_all(&mut gfx, RenderFilter::RENDER_ALL, RenderFlags::empty());
    assert_eq!(gfx.draw_calls.len(), 2);
    assert_eq!(gfx.total_instances(), 4);
}

#[test]
fn passes_share_the_pool_without_cross_talk() {
    let mut frame = Frame::new();
    let instance = frame.mesh_instance(0);

    let mut scene = SceneData::new();
    for i in 0..4 {
        scene.add_renderable(instance.clone(), &translation(i as f32 * 2.0 - 3.0, 0.0, -20.0));
    }
    let scene = Arc::new(scene);

    frame.tree.reconstruct(&scene);
    frame.pool.reset(&mut frame.resources);

    frame.cull(0);
    assert_eq!(frame.jobs.len(), 1);
    assert_eq!(frame.pool.job(frame.jobs[0]).pass_id(), 0);

    // The second pass reuses the same pool; its (material, pass) identity
    // differs, so it batches into a fresh job instead of extending pass 0's.
    frame.cull(1);
    assert_eq!(frame.jobs.len(), 1);
    assert_eq!(frame.pool.job(frame.jobs[0]).pass_id(), 1);
    assert_eq!(frame.pool.job(frame.jobs[0]).instance_count(), 4);
    assert_eq!(frame.pool.job_count(), 2);

    // Frame boundary: every registration is dropped and slot 0 is reused.
    frame.pool.reset(&mut frame.resources);
    assert_eq!(frame.pool.job_count(), 0);
}

#[test]
fn frame_shape_reuse_allocates_nothing_new() {
    let mut frame = Frame::new();
    let instance = frame.mesh_instance(0);

    let mut scene = SceneData::new();
    for i in 0..6 {
        scene.add_renderable(instance.clone(), &translation(i as f32 - 2.5, 0.0, -20.0));
    }
    let scene = Arc::new(scene);

    frame.tree.reconstruct(&scene);

    frame.pool.reset(&mut frame.resources);
    frame.cull(0);
    let jobs_high_water = frame.pool.allocated_jobs();
    let instances_high_water = frame.pool.allocated_instances();

    for _ in 0..3 {
        frame.pool.reset(&mut frame.resources);
        frame.cull(0);
    }

    assert_eq!(frame.pool.allocated_jobs(), jobs_high_water);
    assert_eq!(frame.pool.allocated_instances(), instances_high_water);
}

#[test]
fn transform_group_children_batch_through_the_group() {
    let mut frame = Frame::new();
    let instance = frame.mesh_instance(0);

    let mut group = TransformGroup::new();
    group.add_child(translation(-1.5, 0.0, 0.0), instance.clone());
    group.add_child(translation(1.5, 0.0, 0.0), instance);

    let mut scene = SceneData::new();
    scene.add_renderable(Arc::new(group), &translation(0.0, 0.0, -20.0));
    let scene = Arc::new(scene);

    frame.tree.reconstruct(&scene);
    frame.pool.reset(&mut frame.resources);
    frame.cull(0);

    // Both children share one (geometry, material, pass): one job, two
    // instances, even though the scene holds a single leaf.
    assert_eq!(frame.jobs.len(), 1);
    assert_eq!(frame.pool.job(frame.jobs[0]).instance_count(), 2);
}

#[test]
fn particle_systems_skip_shadow_passes() {
    let mut frame = Frame::new();

    let geometry = frame.resources.add_geometry(Geometry::new());
    let material = {
        let mut material = Material::new(0);
        material.set_blending(BlendMode::Add);
        material.set_lighted(false);
        frame.resources.add_material(material)
    };
    let system = Arc::new(ParticleSystem::new(
        geometry,
        material,
        Aabb::from_center_size(Vec3::zeros(), Vec3::new(4.0, 4.0, 4.0)),
    ));
    system.set_live_count(64);

    let mut scene = SceneData::new();
    scene.add_renderable(
        Arc::new(ParticleSystemInstance::new(Arc::clone(&system))),
        &translation(0.0, 0.0, -20.0),
    );
    let scene = Arc::new(scene);

    frame.tree.reconstruct(&scene);
    frame.pool.reset(&mut frame.resources);
    frame.cull(0);

    assert_eq!(frame.jobs.len(), 1);
    let job = frame.pool.job(frame.jobs[0]);
    assert!(!job.casts_shadows());
    assert!(!job.use_instancing());
    assert_eq!(job.kind(), RenderableKind::ParticleSystem);

    // A shadow pass only accepts shadow casters: the job is filtered out.
    let shadow_filter = RenderFilter::RENDER_ALL - RenderFilter::CAST_SHADOW_OFF;
    let mut gfx = RecordingDevice::new();
    frame.render_all(&mut gfx, shadow_filter, RenderFlags::MATERIALS_OFF);
    assert!(gfx.draw_calls.is_empty());

    // The main pass draws it without instancing.
    frame.render_all(&mut gfx, RenderFilter::RENDER_ALL, RenderFlags::empty());
    assert_eq!(gfx.draw_calls.len(), 1);
    assert_eq!(gfx.draw_calls[0].instance_count, 1);
}

#[test]
fn drained_particle_systems_emit_nothing() {
    let mut frame = Frame::new();

    let geometry = frame.resources.add_geometry(Geometry::new());
    let material = frame.resources.add_material(Material::new(0));
    let system = Arc::new(ParticleSystem::new(
        geometry,
        material,
        Aabb::from_center_size(Vec3::zeros(), Vec3::new(4.0, 4.0, 4.0)),
    ));

    let mut scene = SceneData::new();
    scene.add_renderable(
        Arc::new(ParticleSystemInstance::new(system)),
        &translation(0.0, 0.0, -20.0),
    );
    let scene = Arc::new(scene);

    frame.tree.reconstruct(&scene);
    frame.pool.reset(&mut frame.resources);
    frame.cull(0);

    assert!(frame.jobs.is_empty());
}

#[test]
fn jobs_come_out_sorted_by_material_key() {
    let mut frame = Frame::new();

    // Four distinct materials across two passes, added in scrambled order.
    let passes = [5u32, 1, 3, 1];
    let mut scene = SceneData::new();
    for (i, &pass) in passes.iter().enumerate() {
        let instance = frame.mesh_instance(pass);
        scene.add_renderable(instance, &translation(i as f32 * 2.0 - 3.0, 0.0, -20.0));
    }
    let scene = Arc::new(scene);

    frame.tree.reconstruct(&scene);
    frame.pool.reset(&mut frame.resources);
    frame.cull(0);

    assert_eq!(frame.jobs.len(), 4);
    let keys: Vec<u32> = frame
        .jobs
        .iter()
        .map(|&job| frame.pool.job(job).sort_key())
        .collect();
    assert!(keys.windows(2).all(|pair| pair[0] <= pair[1]));
}
