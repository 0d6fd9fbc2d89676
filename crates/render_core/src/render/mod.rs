//! Render batching layer
//!
//! Everything between "these leaves are visible" and "issue these draw
//! calls": cameras and their frustums, materials with sort keys, geometry
//! job caches, the renderable object contract, and the frame-scoped render
//! job pool that batches, instances, and sorts draw calls.
//!
//! The GPU itself stays behind the [`GraphicsDevice`] trait; this crate
//! never creates buffers, textures, or shaders.

mod api;
mod camera;
mod geometry;
mod job;
mod material;
mod mesh;
mod renderable;
mod resources;

pub use api::{DrawCall, GraphicsDevice, RecordingDevice};
pub use camera::Camera;
pub use geometry::{Geometry, GeometryId};
pub use job::{
    InstanceChain, InstanceVertex, JobId, LinkedInstance, RenderFilter, RenderFlags, RenderJob,
    RenderJobPool,
};
pub use material::{BlendMode, Material, MaterialId, TextureId, TextureUnit};
pub use mesh::{DrawSection, Mesh};
pub use renderable::{
    MeshInstance, ParticleSystem, ParticleSystemInstance, Renderable, RenderableKind,
    TransformGroup,
};
pub use resources::ResourceStore;
