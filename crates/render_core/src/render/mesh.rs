//! Mesh descriptions for the batching layer
//!
//! A mesh is a bounding box plus one draw section per material it uses.
//! Vertex data lives behind the geometry handle in the graphics backend.

use crate::render::{GeometryId, MaterialId};
use crate::scene::Aabb;

/// One (geometry, material) pair of a mesh
#[derive(Debug, Clone, Copy)]
pub struct DrawSection {
    /// Geometry drawn by this section
    pub geometry: GeometryId,

    /// Material this section is drawn with
    pub material: MaterialId,

    /// Number of primitives; empty sections are skipped at job emission
    pub primitive_count: u32,
}

/// Shared mesh description
#[derive(Debug, Clone)]
pub struct Mesh {
    sections: Vec<DrawSection>,
    aabb: Aabb,
}

impl Mesh {
    /// Create a mesh with its object-space bounding box
    pub fn new(aabb: Aabb) -> Self {
        Self {
            sections: Vec::new(),
            aabb,
        }
    }

    /// Append a draw section
    pub fn add_section(&mut self, geometry: GeometryId, material: MaterialId, primitive_count: u32) {
        self.sections.push(DrawSection {
            geometry,
            material,
            primitive_count,
        });
    }

    /// All draw sections
    pub fn sections(&self) -> &[DrawSection] {
        &self.sections
    }

    /// Object-space bounding box
    pub fn bounding_box(&self) -> &Aabb {
        &self.aabb
    }
}
