//! Camera and view frustum
//!
//! Extracts the six frustum planes from the combined view-projection matrix
//! (Gribb-Hartmann) and answers the two visibility queries the culling tree
//! needs: a sphere test and an AABB test that also counts how many planes
//! fully contain the box.

use crate::foundation::math::{Mat4, Point3, Vec3, Vec4};
use crate::render::GraphicsDevice;
use crate::scene::{Aabb, Plane};

/// Camera with a cached view frustum
#[derive(Debug, Clone)]
pub struct Camera {
    projection: Mat4,
    view: Mat4,
    inv_view: Mat4,
    frustum_planes: [Plane; 6],
    aspect: f32,
}

impl Camera {
    /// Create a perspective camera looking down the negative Z axis
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            projection: Mat4::new_perspective(aspect, fov_y, near, far),
            view: Mat4::identity(),
            inv_view: Mat4::identity(),
            frustum_planes: [Plane::default(); 6],
            aspect,
        };
        camera.extract_frustum_planes();
        camera
    }

    /// Create an orthographic camera
    pub fn orthographic(left: f32, right: f32, bottom: f32, top: f32, near: f32, far: f32) -> Self {
        let mut camera = Self {
            projection: Mat4::new_orthographic(left, right, bottom, top, near, far),
            view: Mat4::identity(),
            inv_view: Mat4::identity(),
            frustum_planes: [Plane::default(); 6],
            aspect: (right - left) / (top - bottom),
        };
        camera.extract_frustum_planes();
        camera
    }

    /// Replace the view matrix and re-extract the frustum planes
    pub fn set_view_matrix(&mut self, view: Mat4) {
        let inverse = view.try_inverse();
        debug_assert!(inverse.is_some(), "view matrices must be invertible");

        self.view = view;
        self.inv_view = inverse.unwrap_or_else(Mat4::identity);
        self.extract_frustum_planes();
    }

    /// Aim the camera at a target point
    pub fn look_at(&mut self, eye: Vec3, target: Vec3, up: Vec3) {
        self.set_view_matrix(Mat4::look_at_rh(
            &Point3::from(eye),
            &Point3::from(target),
            &up,
        ));
    }

    /// Current view matrix
    pub fn view_matrix(&self) -> &Mat4 {
        &self.view
    }

    /// Current projection matrix
    pub fn projection_matrix(&self) -> &Mat4 {
        &self.projection
    }

    /// Width over height of the projection
    pub fn aspect_ratio(&self) -> f32 {
        self.aspect
    }

    /// Upload this camera's matrices for a draw of `model`
    pub fn activate(&self, gfx: &mut dyn GraphicsDevice, model: &Mat4) {
        let world_position = Vec3::new(
            self.inv_view[(0, 3)],
            self.inv_view[(1, 3)],
            self.inv_view[(2, 3)],
        );
        gfx.set_transforms(model, &self.view, &self.projection);
        gfx.set_camera_position(world_position);
    }

    /// Test whether a sphere touches the view frustum
    pub fn intersects_frustum(&self, center: Vec3, radius: f32) -> bool {
        self.frustum_planes
            .iter()
            .all(|plane| plane.distance_to_point(center) >= -radius)
    }

    /// Test an AABB against the view frustum
    ///
    /// Returns `None` when the box is entirely outside. Otherwise returns
    /// how many of the six planes fully contain the box; six means the box
    /// is completely inside the frustum, and a high count means further
    /// subdivision of the box is unlikely to cull anything.
    pub fn intersects_frustum_count_hits(&self, aabb: &Aabb) -> Option<u32> {
        let center = aabb.center();
        let extents = aabb.extents();

        let mut hits = 0;
        for plane in &self.frustum_planes {
            let distance = plane.distance_to_point(center);
            let radius = extents.dot(&plane.abs_normal());

            if distance + radius < 0.0 {
                return None;
            }
            if distance - radius >= 0.0 {
                hits += 1;
            }
        }

        Some(hits)
    }

    /// Gribb-Hartmann plane extraction from the view-projection matrix.
    /// Normals point into the frustum.
    fn extract_frustum_planes(&mut self) {
        let clip = self.projection * self.view;
        let row = |i: usize| Vec4::new(clip[(i, 0)], clip[(i, 1)], clip[(i, 2)], clip[(i, 3)]);

        let (r0, r1, r2, r3) = (row(0), row(1), row(2), row(3));
        let coefficients = [
            r3 + r0, // left
            r3 - r0, // right
            r3 + r1, // bottom
            r3 - r1, // top
            r3 + r2, // near
            r3 - r2, // far
        ];

        for (plane, c) in self.frustum_planes.iter_mut().zip(&coefficients) {
            *plane = Plane::from_coefficients(c.x, c.y, c.z, c.w);
        }
    }
}
