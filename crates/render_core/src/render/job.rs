//! Render jobs and the frame-scoped job pool
//!
//! A render job is one batched draw call: every visible leaf sharing a
//! (geometry, material, pass) identity lands in the same job, contributing
//! one record to its instance chain. Jobs and instance records live in
//! pools owned by the caller and are recycled wholesale at frame
//! boundaries; nothing on this path allocates once the pools are warm.

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use log::trace;

use crate::core::config::PoolConfig;
use crate::foundation::math::Mat4;
use crate::render::{
    Camera, GeometryId, GraphicsDevice, MaterialId, RenderableKind, ResourceStore,
};

bitflags! {
    /// Job selection mask for [`RenderJobPool::render`]
    ///
    /// Four orthogonal on/off axes. A job passes the filter only if, on
    /// every axis, the bit matching its actual state is set; `*_BOTH`
    /// accepts either state on that axis.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RenderFilter: u32 {
        /// Accept jobs whose material blends
        const ALPHA_ON = 1;
        /// Accept jobs whose material does not blend
        const ALPHA_OFF = 2;
        /// Accept both blending states
        const ALPHA_BOTH = Self::ALPHA_ON.bits() | Self::ALPHA_OFF.bits();

        /// Accept jobs whose material refracts
        const REFRACTED_ON = 4;
        /// Accept jobs whose material does not refract
        const REFRACTED_OFF = 8;
        /// Accept both refraction states
        const REFRACTED_BOTH = Self::REFRACTED_ON.bits() | Self::REFRACTED_OFF.bits();

        /// Accept lighted jobs
        const LIGHTED_ON = 16;
        /// Accept unlighted jobs
        const LIGHTED_OFF = 32;
        /// Accept both lighting states
        const LIGHTED_BOTH = Self::LIGHTED_ON.bits() | Self::LIGHTED_OFF.bits();

        /// Accept shadow-casting jobs
        const CAST_SHADOW_ON = 64;
        /// Accept non-shadow-casting jobs
        const CAST_SHADOW_OFF = 128;
        /// Accept both shadow states
        const CAST_SHADOW_BOTH = Self::CAST_SHADOW_ON.bits() | Self::CAST_SHADOW_OFF.bits();

        /// Accept every job
        const RENDER_ALL = Self::ALPHA_BOTH.bits()
            | Self::REFRACTED_BOTH.bits()
            | Self::LIGHTED_BOTH.bits()
            | Self::CAST_SHADOW_BOTH.bits();
    }
}

bitflags! {
    /// State suppression flags for [`RenderJobPool::render`]
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RenderFlags: u32 {
        /// Skip material binding (depth-only passes)
        const MATERIALS_OFF = 1;
        /// Bind materials but force blending off (shadow passes)
        const BLENDING_OFF = 2;
    }
}

/// Per-instance transform pair, laid out for direct GPU upload
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct InstanceVertex {
    /// World transform of the instance
    pub model: Mat4,
    /// Matching normal matrix (inverse-transpose of model-view)
    pub normal: Mat4,
}

impl Default for InstanceVertex {
    fn default() -> Self {
        Self {
            model: Mat4::identity(),
            normal: Mat4::identity(),
        }
    }
}

/// Pooled instance record forming a backward-linked chain per job
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkedInstance {
    /// Transform payload
    pub vertex: InstanceVertex,
    /// Pool index of the previously appended instance of the same job
    pub next: Option<u32>,
}

/// Handle to a render job inside a [`RenderJobPool`]
///
/// Valid only until the pool's next `reset`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JobId(u32);

impl JobId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index as u32)
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

/// One batched draw call covering all instances of a
/// (geometry, material, pass) identity
#[derive(Debug, Clone)]
pub struct RenderJob {
    geometry: Option<GeometryId>,
    material: MaterialId,
    pass_id: u32,
    kind: RenderableKind,
    casts_shadows: bool,
    use_instancing: bool,
    first_instance: Option<u32>,
    instance_count: u32,
    material_index: u32,
    sort_key: u32,
}

impl Default for RenderJob {
    fn default() -> Self {
        Self {
            geometry: None,
            material: MaterialId::default(),
            pass_id: 0,
            kind: RenderableKind::Mesh,
            casts_shadows: true,
            use_instancing: false,
            first_instance: None,
            instance_count: 0,
            material_index: 0,
            sort_key: 0,
        }
    }
}

impl RenderJob {
    /// Geometry drawn by this job; `None` once unregistered
    pub fn geometry(&self) -> Option<GeometryId> {
        self.geometry
    }

    /// Material drawn with
    pub fn material(&self) -> MaterialId {
        self.material
    }

    /// Render pass this job belongs to
    pub fn pass_id(&self) -> u32 {
        self.pass_id
    }

    /// Kind of renderable that emitted this job
    pub fn kind(&self) -> RenderableKind {
        self.kind
    }

    /// Whether this job participates in shadow passes
    pub fn casts_shadows(&self) -> bool {
        self.casts_shadows
    }

    /// Mark this job as not casting shadows (jobs start shadow-casting and
    /// can only be demoted)
    pub fn clear_casts_shadows(&mut self) {
        self.casts_shadows = false;
    }

    /// Whether the geometry is drawn with hardware instancing
    pub fn use_instancing(&self) -> bool {
        self.use_instancing
    }

    /// Head of this job's instance chain
    pub fn first_instance(&self) -> Option<u32> {
        self.first_instance
    }

    /// Number of instances in the chain
    pub fn instance_count(&self) -> u32 {
        self.instance_count
    }

    /// Per-pass material slot used by environment-mapped follow-up passes
    pub fn material_index(&self) -> u32 {
        self.material_index
    }

    /// Assign the per-pass material slot
    pub fn set_material_index(&mut self, index: u32) {
        self.material_index = index;
    }

    /// Material sort key cached at job initialization
    pub fn sort_key(&self) -> u32 {
        self.sort_key
    }
}

/// Iterator over a job's instance chain, newest first
#[derive(Debug, Clone)]
pub struct InstanceChain<'a> {
    instances: &'a [LinkedInstance],
    next: Option<u32>,
    remaining: u32,
}

impl<'a> Iterator for InstanceChain<'a> {
    type Item = &'a InstanceVertex;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.next? as usize;
        let record = &self.instances[index];
        self.next = record.next;
        self.remaining = self.remaining.saturating_sub(1);
        Some(&record.vertex)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining as usize;
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for InstanceChain<'_> {}

const SORT_BUCKETS: usize = 256;

/// Frame-scoped pool of render jobs and instance records
///
/// Owned by the caller and shared by every pass of a frame. `reset` must
/// run before the first cull of a frame; a pass's jobs must be rendered
/// before the next pass culls into the same pool.
#[derive(Debug)]
pub struct RenderJobPool {
    jobs: Vec<RenderJob>,
    job_count: usize,
    instances: Vec<LinkedInstance>,
    instance_count: usize,
    instancing_clear_start: usize,
    sort_buckets: Vec<Vec<JobId>>,
}

impl Default for RenderJobPool {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderJobPool {
    /// Create an empty pool that grows on demand
    pub fn new() -> Self {
        Self {
            jobs: Vec::new(),
            job_count: 0,
            instances: Vec::new(),
            instance_count: 0,
            instancing_clear_start: 0,
            sort_buckets: vec![Vec::new(); SORT_BUCKETS],
        }
    }

    /// Create a pool with capacity reserved up front
    pub fn with_config(config: &PoolConfig) -> Self {
        let mut pool = Self::new();
        pool.jobs.reserve(config.initial_jobs);
        pool.instances.reserve(config.initial_instances);
        pool
    }

    /// Take the next job slot, growing the pool if this frame needs more
    /// jobs than any frame before it
    pub fn acquire_job(&mut self) -> JobId {
        if self.job_count == self.jobs.len() {
            self.jobs.push(RenderJob::default());
            trace!("render job pool grew to {} jobs", self.jobs.len());
        }
        let id = JobId::from_index(self.job_count);
        self.job_count += 1;
        id
    }

    fn acquire_instance(&mut self) -> u32 {
        if self.instance_count == self.instances.len() {
            self.instances.push(LinkedInstance::default());
            trace!("instance pool grew to {} records", self.instances.len());
        }
        let index = self.instance_count as u32;
        self.instance_count += 1;
        index
    }

    /// Initialize a freshly acquired job
    ///
    /// Records the (geometry, material, pass) identity and flags, registers
    /// the job in the geometry's lookup cache so later leaves with the same
    /// identity extend it instead of allocating, and appends the first
    /// instance.
    pub fn init_job(
        &mut self,
        id: JobId,
        geometry: GeometryId,
        material: MaterialId,
        pass_id: u32,
        model: &Mat4,
        normal: &Mat4,
        use_instancing: bool,
        kind: RenderableKind,
        resources: &mut ResourceStore,
    ) {
        let sort_key = resources.material(material).sort_key();
        let job = &mut self.jobs[id.index()];
        job.geometry = Some(geometry);
        job.material = material;
        job.pass_id = pass_id;
        job.kind = kind;
        job.use_instancing = use_instancing;
        job.casts_shadows = true;
        job.first_instance = None;
        job.instance_count = 0;
        job.material_index = 0;
        job.sort_key = sort_key;

        resources
            .geometry_mut(geometry)
            .add_instantiation(material, pass_id, id);
        self.add_instance(id, model, normal);
    }

    /// Prepend one transform to a job's instance chain
    pub fn add_instance(&mut self, id: JobId, model: &Mat4, normal: &Mat4) {
        let head = {
            let job = &self.jobs[id.index()];
            debug_assert!(
                job.use_instancing || job.instance_count == 0,
                "non-instanced jobs hold exactly one transform"
            );
            job.first_instance
        };

        let index = self.acquire_instance();
        let record = &mut self.instances[index as usize];
        record.vertex.model = *model;
        record.vertex.normal = *normal;
        record.next = head;

        let job = &mut self.jobs[id.index()];
        job.first_instance = Some(index);
        job.instance_count += 1;
    }

    /// Filter and dispatch one job; allocation-free
    ///
    /// The job is skipped unless its state passes every axis of `filter`.
    /// `flags` can suppress material binding and blending for depth-only
    /// and shadow passes.
    pub fn render(
        &self,
        id: JobId,
        gfx: &mut dyn GraphicsDevice,
        camera: &Camera,
        filter: RenderFilter,
        flags: RenderFlags,
        resources: &ResourceStore,
    ) {
        let job = &self.jobs[id.index()];
        let material = resources.material(job.material);

        let axes = [
            (
                material.use_blending(),
                RenderFilter::ALPHA_ON,
                RenderFilter::ALPHA_OFF,
            ),
            (
                material.use_refraction(),
                RenderFilter::REFRACTED_ON,
                RenderFilter::REFRACTED_OFF,
            ),
            (
                material.lighted(),
                RenderFilter::LIGHTED_ON,
                RenderFilter::LIGHTED_OFF,
            ),
            (
                job.casts_shadows,
                RenderFilter::CAST_SHADOW_ON,
                RenderFilter::CAST_SHADOW_OFF,
            ),
        ];
        for (state, on, off) in axes {
            if !filter.contains(if state { on } else { off }) {
                return;
            }
        }

        if !flags.contains(RenderFlags::MATERIALS_OFF) {
            material.activate(gfx, !flags.contains(RenderFlags::BLENDING_OFF));
        }
        gfx.set_material_index(job.material_index as f32 / 256.0);

        let Some(first) = job.first_instance else {
            debug_assert!(false, "initialized jobs always hold at least one instance");
            return;
        };
        camera.activate(gfx, &self.instances[first as usize].vertex.model);

        if let Some(geometry) = job.geometry {
            if job.use_instancing {
                gfx.draw_instanced(geometry, self.instance_chain(id));
            } else {
                gfx.draw(geometry);
            }
        }
    }

    /// Unregister every job initialized since the last marker from its
    /// geometry's lookup cache, so stale (material, pass) associations do
    /// not leak into that geometry's next use
    pub fn reset_instancing(&mut self, resources: &mut ResourceStore) {
        for index in self.instancing_clear_start..self.job_count {
            let job = &self.jobs[index];
            let (material, pass_id) = (job.material, job.pass_id);
            if let Some(geometry) = self.jobs[index].geometry.take() {
                resources
                    .geometry_mut(geometry)
                    .remove_instantiation(material, pass_id);
            }
        }
        self.instancing_clear_start = self.job_count;
    }

    /// Return the whole pool to frame start
    ///
    /// After this call `acquire_job` hands out slot 0 again; every JobId
    /// from the previous frame is invalid.
    pub fn reset(&mut self, resources: &mut ResourceStore) {
        self.reset_instancing(resources);
        self.instancing_clear_start = 0;
        self.instance_count = 0;
        self.job_count = 0;
    }

    /// Sort jobs by ascending material sort key
    ///
    /// Four-pass 8-bit radix bucket sort, least significant byte first. The
    /// 256 buckets are retained across calls, so a warm pool sorts without
    /// allocating.
    pub fn sort_jobs(&mut self, jobs: &mut [JobId]) {
        let Self {
            jobs: storage,
            sort_buckets,
            ..
        } = self;

        for shift in (0..32).step_by(8) {
            for &job in jobs.iter() {
                let slot = ((storage[job.index()].sort_key >> shift) & 0xff) as usize;
                sort_buckets[slot].push(job);
            }

            let mut write = 0;
            for bucket in sort_buckets.iter_mut() {
                for &job in bucket.iter() {
                    jobs[write] = job;
                    write += 1;
                }
                bucket.clear();
            }
        }
    }

    /// Access a job
    pub fn job(&self, id: JobId) -> &RenderJob {
        &self.jobs[id.index()]
    }

    /// Mutably access a job
    pub fn job_mut(&mut self, id: JobId) -> &mut RenderJob {
        &mut self.jobs[id.index()]
    }

    /// Walk a job's instance chain, newest instance first
    pub fn instance_chain(&self, id: JobId) -> InstanceChain<'_> {
        let job = &self.jobs[id.index()];
        InstanceChain {
            instances: &self.instances,
            next: job.first_instance,
            remaining: job.instance_count,
        }
    }

    /// Jobs handed out since the last reset
    pub fn job_count(&self) -> usize {
        self.job_count
    }

    /// Job slots ever allocated (the pool's high-water mark)
    pub fn allocated_jobs(&self) -> usize {
        self.jobs.len()
    }

    /// Instance records ever allocated (the pool's high-water mark)
    pub fn allocated_instances(&self) -> usize {
        self.instances.len()
    }
}
