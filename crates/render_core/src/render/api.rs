//! Graphics device boundary
//!
//! The culling and batching core never talks to a GPU directly. Everything
//! it needs from the graphics backend is expressed through the
//! [`GraphicsDevice`] trait, so the core can be driven by a real renderer,
//! a command recorder, or a test double interchangeably.

use crate::foundation::math::{Mat4, Vec3};
use crate::render::{GeometryId, InstanceChain, Material};

/// Minimal contract a graphics backend must provide to render sorted jobs
pub trait GraphicsDevice {
    /// Upload the model, view, and projection matrices for the next draw
    fn set_transforms(&mut self, model: &Mat4, view: &Mat4, projection: &Mat4);

    /// Upload the camera's world-space position
    fn set_camera_position(&mut self, world_position: Vec3);

    /// Upload the per-material shader constant used by environment-mapped
    /// follow-up passes
    fn set_material_index(&mut self, index: f32);

    /// Bind a material's render state; `allow_blending` is cleared for
    /// depth-only passes
    fn bind_material(&mut self, material: &Material, allow_blending: bool);

    /// Issue a non-instanced draw of a geometry
    fn draw(&mut self, geometry: GeometryId);

    /// Issue one instanced draw covering every transform in the chain
    fn draw_instanced(&mut self, geometry: GeometryId, instances: InstanceChain<'_>);
}

/// One draw recorded by a [`RecordingDevice`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrawCall {
    /// Geometry that was drawn
    pub geometry: GeometryId,

    /// Number of instances covered by the draw
    pub instance_count: u32,
}

/// Graphics device that records calls instead of talking to a GPU
///
/// Used by tests and the demo tooling to observe exactly which state
/// changes and draws a frame produced.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    /// Recorded draws, in submission order
    pub draw_calls: Vec<DrawCall>,

    /// Number of material binds
    pub material_binds: u32,

    /// Number of transform uploads
    pub transform_sets: u32,
}

impl RecordingDevice {
    /// Create an empty recording device
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget everything recorded so far
    pub fn clear(&mut self) {
        self.draw_calls.clear();
        self.material_binds = 0;
        self.transform_sets = 0;
    }

    /// Total instances across all recorded draws
    pub fn total_instances(&self) -> u32 {
        self.draw_calls.iter().map(|call| call.instance_count).sum()
    }
}

impl GraphicsDevice for RecordingDevice {
    fn set_transforms(&mut self, _model: &Mat4, _view: &Mat4, _projection: &Mat4) {
        self.transform_sets += 1;
    }

    fn set_camera_position(&mut self, _world_position: Vec3) {}

    fn set_material_index(&mut self, _index: f32) {}

    fn bind_material(&mut self, _material: &Material, _allow_blending: bool) {
        self.material_binds += 1;
    }

    fn draw(&mut self, geometry: GeometryId) {
        self.draw_calls.push(DrawCall {
            geometry,
            instance_count: 1,
        });
    }

    fn draw_instanced(&mut self, geometry: GeometryId, instances: InstanceChain<'_>) {
        self.draw_calls.push(DrawCall {
            geometry,
            instance_count: instances.len() as u32,
        });
    }
}
