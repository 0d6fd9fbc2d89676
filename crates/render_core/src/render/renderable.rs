//! Renderable object contract and its implementations
//!
//! The culling tree hands every visible leaf to its renderable, which emits
//! render jobs through the pool's dedup/instancing contract. The set of
//! renderable kinds is closed: meshes, particle systems, and transform
//! groups.

use std::cell::Cell;
use std::fmt;
use std::sync::Arc;

use crate::foundation::math::{normal_matrix, Mat4};
use crate::render::{GeometryId, JobId, MaterialId, Mesh, RenderJobPool, ResourceStore};
use crate::scene::Aabb;

/// Kind tag dispatched once at job-emission time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderableKind {
    /// A group that only repositions nested renderables
    TransformGroup,
    /// A mesh instance
    Mesh,
    /// A particle system instance
    ParticleSystem,
}

/// Object that can contribute render jobs when visible
pub trait Renderable {
    /// Which kind of renderable this is
    fn kind(&self) -> RenderableKind;

    /// Object-space bounding box; must not be degenerate
    fn bounding_box(&self) -> &Aabb;

    /// Emit (or extend) render jobs for a pass
    ///
    /// `model` is the accumulated world transform of the visited leaf and
    /// `normal` the matching inverse-transpose of its model-view matrix.
    /// Implementations must go through the pool's geometry-cache contract so
    /// repeated (geometry, material, pass) visits batch into one job.
    fn get_render_jobs(
        &self,
        model: &Mat4,
        normal: &Mat4,
        pass_id: u32,
        resources: &mut ResourceStore,
        pool: &mut RenderJobPool,
        out_jobs: &mut Vec<JobId>,
    );
}

impl fmt::Debug for dyn Renderable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Renderable({:?})", self.kind())
    }
}

/// A placed instance of a shared mesh
#[derive(Debug, Clone)]
pub struct MeshInstance {
    mesh: Arc<Mesh>,
    casts_shadows: bool,
}

impl MeshInstance {
    /// Create a shadow-casting instance of a mesh
    pub fn new(mesh: Arc<Mesh>) -> Self {
        Self {
            mesh,
            casts_shadows: true,
        }
    }

    /// Disable shadow casting for this instance
    pub fn without_shadows(mut self) -> Self {
        self.casts_shadows = false;
        self
    }

    /// The shared mesh
    pub fn mesh(&self) -> &Arc<Mesh> {
        &self.mesh
    }
}

impl Renderable for MeshInstance {
    fn kind(&self) -> RenderableKind {
        RenderableKind::Mesh
    }

    fn bounding_box(&self) -> &Aabb {
        self.mesh.bounding_box()
    }

    fn get_render_jobs(
        &self,
        model: &Mat4,
        normal: &Mat4,
        pass_id: u32,
        resources: &mut ResourceStore,
        pool: &mut RenderJobPool,
        out_jobs: &mut Vec<JobId>,
    ) {
        for section in self.mesh.sections() {
            if section.primitive_count == 0 {
                continue;
            }

            let cached = resources
                .geometry(section.geometry)
                .job_instantiation(section.material, pass_id);

            if let Some(job) = cached {
                pool.add_instance(job, model, normal);
            } else {
                let job = pool.acquire_job();
                pool.init_job(
                    job,
                    section.geometry,
                    section.material,
                    pass_id,
                    model,
                    normal,
                    true,
                    RenderableKind::Mesh,
                    resources,
                );
                if !self.casts_shadows {
                    pool.job_mut(job).clear_casts_shadows();
                }
                out_jobs.push(job);
            }
        }
    }
}

/// Shared state of a particle system
///
/// Simulation happens elsewhere; the batching layer only needs the live
/// particle count, the dynamic geometry the backend fills, and bounds.
#[derive(Debug)]
pub struct ParticleSystem {
    geometry: GeometryId,
    material: MaterialId,
    live_count: Cell<u32>,
    aabb: Aabb,
}

impl ParticleSystem {
    /// Create a system over a dynamic geometry and a blended material
    pub fn new(geometry: GeometryId, material: MaterialId, aabb: Aabb) -> Self {
        Self {
            geometry,
            material,
            live_count: Cell::new(0),
            aabb,
        }
    }

    /// Number of particles currently alive
    pub fn live_count(&self) -> u32 {
        self.live_count.get()
    }

    /// Update the live particle count (called by the simulation)
    pub fn set_live_count(&self, count: u32) {
        self.live_count.set(count);
    }
}

/// A placed instance of a particle system
///
/// Emits a single non-instanced job per visible instance and never casts
/// shadows. Systems with no live particles emit nothing.
#[derive(Debug)]
pub struct ParticleSystemInstance {
    system: Arc<ParticleSystem>,
}

impl ParticleSystemInstance {
    /// Create an instance of a particle system
    pub fn new(system: Arc<ParticleSystem>) -> Self {
        Self { system }
    }
}

impl Renderable for ParticleSystemInstance {
    fn kind(&self) -> RenderableKind {
        RenderableKind::ParticleSystem
    }

    fn bounding_box(&self) -> &Aabb {
        &self.system.aabb
    }

    fn get_render_jobs(
        &self,
        model: &Mat4,
        normal: &Mat4,
        pass_id: u32,
        resources: &mut ResourceStore,
        pool: &mut RenderJobPool,
        out_jobs: &mut Vec<JobId>,
    ) {
        if self.system.live_count() == 0 {
            return;
        }

        let job = pool.acquire_job();
        pool.init_job(
            job,
            self.system.geometry,
            self.system.material,
            pass_id,
            model,
            normal,
            false,
            RenderableKind::ParticleSystem,
            resources,
        );
        pool.job_mut(job).clear_casts_shadows();
        out_jobs.push(job);
    }
}

/// A rigid grouping of renderables with per-child offsets
#[derive(Debug, Default)]
pub struct TransformGroup {
    children: Vec<(Mat4, Arc<dyn Renderable>)>,
    aabb: Aabb,
}

impl TransformGroup {
    /// Create an empty group
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a child with its offset inside the group
    pub fn add_child(&mut self, matrix: Mat4, child: Arc<dyn Renderable>) {
        self.aabb.merge(&child.bounding_box().transformed(&matrix));
        self.children.push((matrix, child));
    }

    /// Number of direct children
    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

impl Renderable for TransformGroup {
    fn kind(&self) -> RenderableKind {
        RenderableKind::TransformGroup
    }

    fn bounding_box(&self) -> &Aabb {
        &self.aabb
    }

    fn get_render_jobs(
        &self,
        model: &Mat4,
        normal: &Mat4,
        pass_id: u32,
        resources: &mut ResourceStore,
        pool: &mut RenderJobPool,
        out_jobs: &mut Vec<JobId>,
    ) {
        for (local, child) in &self.children {
            let child_model = model * local;
            // (V M L)^-T = (V M)^-T * L^-T, so the incoming normal matrix
            // only needs the local correction factor.
            let child_normal = normal * normal_matrix(local);
            child.get_render_jobs(
                &child_model,
                &child_normal,
                pass_id,
                resources,
                pool,
                out_jobs,
            );
        }
    }
}
