//! Light sources carried by scene containers
//!
//! The shading pipeline consumes these; the culling core only routes them
//! up the container hierarchy so a renderer sees every light a merged
//! sub-scene contributes.

use crate::foundation::math::Vec3;

/// Point light attached to a scene container
#[derive(Debug, Clone)]
pub struct Light {
    /// World-space position
    pub position: Vec3,

    /// Diffuse color
    pub diffuse: Vec3,

    /// Influence radius
    pub range: f32,

    /// Whether geometry lit by this light casts shadows
    pub casts_shadows: bool,
}

impl Light {
    /// Create a white point light at a position
    pub fn new(position: Vec3, range: f32) -> Self {
        Self {
            position,
            diffuse: Vec3::new(1.0, 1.0, 1.0),
            range,
            casts_shadows: false,
        }
    }

    /// Set the diffuse color
    pub fn with_diffuse(mut self, diffuse: Vec3) -> Self {
        self.diffuse = diffuse;
        self
    }

    /// Enable shadow casting
    pub fn with_shadows(mut self) -> Self {
        self.casts_shadows = true;
        self
    }
}
