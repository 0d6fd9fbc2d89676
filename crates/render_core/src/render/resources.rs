//! Slotmap-backed stores for geometries and materials
//!
//! Renderables refer to their geometry and material by copyable handle;
//! the store owns the values. Handles stay valid until the resource is
//! removed, and indexing with a stale handle is a programming error.

use slotmap::SlotMap;

use crate::render::{Geometry, GeometryId, Material, MaterialId};

/// Owner of all geometries and materials the batching layer refers to
#[derive(Debug, Default)]
pub struct ResourceStore {
    geometries: SlotMap<GeometryId, Geometry>,
    materials: SlotMap<MaterialId, Material>,
}

impl ResourceStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a geometry, returning its handle
    pub fn add_geometry(&mut self, geometry: Geometry) -> GeometryId {
        self.geometries.insert(geometry)
    }

    /// Add a material, returning its handle
    pub fn add_material(&mut self, material: Material) -> MaterialId {
        self.materials.insert(material)
    }

    /// Access a geometry
    pub fn geometry(&self, id: GeometryId) -> &Geometry {
        &self.geometries[id]
    }

    /// Mutably access a geometry
    pub fn geometry_mut(&mut self, id: GeometryId) -> &mut Geometry {
        &mut self.geometries[id]
    }

    /// Access a material
    pub fn material(&self, id: MaterialId) -> &Material {
        &self.materials[id]
    }

    /// Mutably access a material
    pub fn material_mut(&mut self, id: MaterialId) -> &mut Material {
        &mut self.materials[id]
    }

    /// Number of geometries
    pub fn geometry_count(&self) -> usize {
        self.geometries.len()
    }

    /// Number of materials
    pub fn material_count(&self) -> usize {
        self.materials.len()
    }
}
