//! Geometry handles and the per-frame job registration cache
//!
//! The cache is what turns repeated visits of the same (geometry, material,
//! pass) into instances of one render job instead of new jobs: the first
//! visit registers its job here, later visits find it and append their
//! transform to its instance chain.

use slotmap::new_key_type;

use crate::render::{JobId, MaterialId};

new_key_type! {
    /// Stable handle to a geometry in a [`crate::render::ResourceStore`]
    pub struct GeometryId;
}

#[derive(Debug, Clone, Copy)]
struct Instantiation {
    material: MaterialId,
    pass_id: u32,
    job: JobId,
}

/// GPU geometry handle plus its frame-scoped job registrations
///
/// The actual vertex and index buffers live in the graphics backend; this
/// side only carries what batching needs. Registrations are searched
/// linearly, since a geometry is visible through a handful of
/// (material, pass) combinations at most.
#[derive(Debug, Clone, Default)]
pub struct Geometry {
    instantiations: Vec<Instantiation>,
}

impl Geometry {
    /// Create a geometry with no registrations
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the job that batches this geometry under (material, pass)
    pub fn add_instantiation(&mut self, material: MaterialId, pass_id: u32, job: JobId) {
        self.instantiations.push(Instantiation {
            material,
            pass_id,
            job,
        });
    }

    /// Find the job already batching this geometry under (material, pass)
    pub fn job_instantiation(&self, material: MaterialId, pass_id: u32) -> Option<JobId> {
        self.instantiations
            .iter()
            .find(|i| i.material == material && i.pass_id == pass_id)
            .map(|i| i.job)
    }

    /// Drop the registration for (material, pass), returning its job
    pub fn remove_instantiation(&mut self, material: MaterialId, pass_id: u32) -> Option<JobId> {
        let index = self
            .instantiations
            .iter()
            .position(|i| i.material == material && i.pass_id == pass_id)?;
        Some(self.instantiations.swap_remove(index).job)
    }

    /// Number of live registrations (used by pool reset tests)
    pub fn instantiation_count(&self) -> usize {
        self.instantiations.len()
    }
}
