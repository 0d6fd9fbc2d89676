//! # Render Core
//!
//! Frame-time spatial culling and render batching for a real-time 3D engine.
//!
//! ## Features
//!
//! - **Hierarchical Scenes**: Flattened, reference-counted scene containers
//!   with instanced sub-scenes
//! - **Lazy Culling Tree**: A bounding-volume tree that expands nested
//!   sub-scenes only where the camera can actually see them
//! - **Automatic Instancing**: One render job per (geometry, material, pass),
//!   with per-instance transform chains
//! - **State-Change Minimization**: Radix sort of jobs by material sort key
//! - **No Per-Frame Heap Churn**: All hot-path storage lives in caller-owned
//!   pools that are reset, never freed, at frame boundaries
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use render_core::prelude::*;
//! use std::sync::Arc;
//!
//! let mut resources = ResourceStore::new();
//! let geometry = resources.add_geometry(Geometry::new());
//! let material = resources.add_material(Material::new(0));
//!
//! let mut mesh = Mesh::new(Aabb::from_center_size(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0)));
//! mesh.add_section(geometry, material, 12);
//!
//! let mut scene = SceneData::new();
//! scene.add_renderable(Arc::new(MeshInstance::new(Arc::new(mesh))), &Mat4::identity());
//! let scene = Arc::new(scene);
//!
//! let mut camera = Camera::perspective(1.0, 16.0 / 9.0, 0.1, 1000.0);
//! camera.look_at(Vec3::new(0.0, 0.0, 5.0), Vec3::zeros(), Vec3::y());
//!
//! let mut tree = KdTree::new();
//! let mut pool = RenderJobPool::new();
//! let mut jobs = Vec::new();
//!
//! tree.reconstruct(&scene);
//! pool.reset(&mut resources);
//! tree.cull(0, &camera, &mut resources, &mut pool, &mut jobs);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod core;
pub mod foundation;
pub mod render;
pub mod scene;
pub mod spatial;

/// Common imports for engine users
pub mod prelude {
    pub use crate::{
        core::config::{ConfigError, CullingConfig, PoolConfig, RenderCoreConfig},
        foundation::math::{Mat3, Mat4, Vec2, Vec3, Vec4},
        render::{
            BlendMode, Camera, Geometry, GeometryId, GraphicsDevice, JobId, Material, MaterialId,
            Mesh, MeshInstance, ParticleSystem, ParticleSystemInstance, RecordingDevice,
            Renderable, RenderableKind, RenderFilter, RenderFlags, RenderJob, RenderJobPool,
            ResourceStore, TextureId, TextureUnit, TransformGroup,
        },
        scene::{Aabb, EntrySource, Light, Plane, SceneData, SceneEntry},
        spatial::KdTree,
    };
}
