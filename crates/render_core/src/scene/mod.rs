//! Scene description
//!
//! Provides the flattened, reference-counted scene containers that the
//! culling tree consumes, plus the bounding volumes they are measured with.
//!
//! ## Architecture
//!
//! ```text
//! SceneData (hierarchical containers)
//!      ↓
//! KdTree (spatial culling)
//!      ↓
//! RenderJobPool (batched draw calls)
//! ```
//!
//! A [`SceneData`] is a flat array of entries. Each entry is either a single
//! renderable object or a reference to a nested container, so instanced
//! sub-scenes are shared rather than copied.

mod bounds;
mod light;
mod scene_data;

pub use bounds::{Aabb, Plane};
pub use light::Light;
pub use scene_data::{EntrySource, SceneData, SceneEntry};
