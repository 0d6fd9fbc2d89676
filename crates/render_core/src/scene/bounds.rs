//! Bounding volumes for spatial queries

use crate::foundation::math::{Mat4, Point3, Vec3};

/// Axis-Aligned Bounding Box for spatial queries
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    /// Minimum corner of the bounding box
    pub min: Vec3,
    /// Maximum corner of the bounding box
    pub max: Vec3,
}

impl Aabb {
    /// Create a new AABB from min and max points
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    /// Create an empty AABB that any merge will overwrite
    pub fn empty() -> Self {
        Self {
            min: Vec3::repeat(f32::MAX),
            max: Vec3::repeat(f32::MIN),
        }
    }

    /// Create an AABB centered at a point with a given full size
    pub fn from_center_size(center: Vec3, size: Vec3) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Get the center of the AABB
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Get the full size of the AABB
    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    /// Get the extents (half-size) of the AABB
    pub fn extents(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }

    /// Check whether no point has been merged into this AABB yet
    pub fn is_empty(&self) -> bool {
        self.min.x > self.max.x
    }

    /// Check whether all corners are finite (an empty box counts as finite)
    pub fn is_finite(&self) -> bool {
        self.min.iter().all(|c| c.is_finite()) && self.max.iter().all(|c| c.is_finite())
    }

    /// Check whether this AABB is unusable as a bounding volume: empty,
    /// non-finite, or collapsed to a single point
    pub fn is_degenerate(&self) -> bool {
        self.is_empty() || !self.is_finite() || (self.max - self.min).norm() == 0.0
    }

    /// Grow this AABB to contain another
    pub fn merge(&mut self, other: &Self) {
        if other.is_empty() {
            return;
        }
        self.merge_point(other.min);
        self.merge_point(other.max);
    }

    /// Grow this AABB to contain a point
    pub fn merge_point(&mut self, point: Vec3) {
        self.min = self.min.inf(&point);
        self.max = self.max.sup(&point);
    }

    /// Check if this AABB contains a point
    pub fn contains_point(&self, point: Vec3) -> bool {
        point.x >= self.min.x
            && point.x <= self.max.x
            && point.y >= self.min.y
            && point.y <= self.max.y
            && point.z >= self.min.z
            && point.z <= self.max.z
    }

    /// Check if this AABB intersects another AABB
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x <= other.max.x
            && self.max.x >= other.min.x
            && self.min.y <= other.max.y
            && self.max.y >= other.min.y
            && self.min.z <= other.max.z
            && self.max.z >= other.min.z
    }

    /// Return this AABB transformed into another space
    ///
    /// Transforms all eight corners and re-wraps them, so the result stays
    /// axis-aligned (and conservative) under rotation.
    pub fn transformed(&self, matrix: &Mat4) -> Self {
        if self.is_empty() {
            return *self;
        }

        let mut out = Self::empty();
        for i in 0..8 {
            let corner = Point3::new(
                if i & 1 == 0 { self.min.x } else { self.max.x },
                if i & 2 == 0 { self.min.y } else { self.max.y },
                if i & 4 == 0 { self.min.z } else { self.max.z },
            );
            out.merge_point(matrix.transform_point(&corner).coords);
        }
        out
    }

    /// Transform this AABB in place
    pub fn transform(&mut self, matrix: &Mat4) {
        *self = self.transformed(matrix);
    }
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

/// Plane defined by normal and distance from origin
#[derive(Debug, Clone, Copy)]
pub struct Plane {
    /// Normal vector (normalized)
    pub normal: Vec3,
    /// Distance from origin along the normal
    pub distance: f32,
}

impl Plane {
    /// Create a new plane from a normal and distance; the normal is normalized
    pub fn new(normal: Vec3, distance: f32) -> Self {
        Self {
            normal: normal.normalize(),
            distance,
        }
    }

    /// Create a plane from the coefficients of `ax + by + cz + d = 0`,
    /// normalizing so distances come out in world units
    pub fn from_coefficients(a: f32, b: f32, c: f32, d: f32) -> Self {
        let normal = Vec3::new(a, b, c);
        let length = normal.norm();
        debug_assert!(length > 0.0, "plane normal must not be zero");
        Self {
            normal: normal / length,
            distance: d / length,
        }
    }

    /// Calculate signed distance from plane to point
    pub fn distance_to_point(&self, point: Vec3) -> f32 {
        self.normal.dot(&point) + self.distance
    }

    /// Component-wise absolute normal, used for AABB projection radii
    pub fn abs_normal(&self) -> Vec3 {
        self.normal.abs()
    }
}

impl Default for Plane {
    fn default() -> Self {
        Self {
            normal: Vec3::y(),
            distance: 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_aabb_contains_point() {
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));

        assert!(aabb.contains_point(Vec3::zeros()));
        assert!(aabb.contains_point(Vec3::new(0.5, 0.5, 0.5)));
        assert!(!aabb.contains_point(Vec3::new(2.0, 0.0, 0.0)));
    }

    #[test]
    fn test_aabb_merge_from_empty() {
        let mut aabb = Aabb::empty();
        assert!(aabb.is_empty());

        aabb.merge(&Aabb::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0)));
        aabb.merge(&Aabb::new(Vec3::new(-2.0, 0.0, 0.0), Vec3::new(-1.0, 1.0, 1.0)));

        assert!(!aabb.is_empty());
        assert_eq!(aabb.min, Vec3::new(-2.0, 0.0, 0.0));
        assert_eq!(aabb.max, Vec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_merging_an_empty_aabb_is_a_no_op() {
        let mut aabb = Aabb::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        aabb.merge(&Aabb::empty());
        assert_eq!(aabb.min, Vec3::zeros());
        assert_eq!(aabb.max, Vec3::new(1.0, 1.0, 1.0));
    }

    #[test]
    fn test_aabb_transform_rotation_stays_conservative() {
        let aabb = Aabb::new(Vec3::new(-1.0, -1.0, -1.0), Vec3::new(1.0, 1.0, 1.0));
        let rotation = Mat4::from_axis_angle(&Vec3::z_axis(), std::f32::consts::FRAC_PI_4);

        let rotated = aabb.transformed(&rotation);

        // A unit cube rotated 45 degrees around Z needs sqrt(2) lateral extents.
        let expected = 2.0_f32.sqrt();
        assert_relative_eq!(rotated.max.x, expected, epsilon = 1e-5);
        assert_relative_eq!(rotated.max.y, expected, epsilon = 1e-5);
        assert_relative_eq!(rotated.max.z, 1.0, epsilon = 1e-5);
    }

    #[test]
    fn test_degenerate_detection() {
        assert!(Aabb::empty().is_degenerate());

        let point = Aabb::new(Vec3::zeros(), Vec3::zeros());
        assert!(point.is_degenerate());

        let real = Aabb::new(Vec3::zeros(), Vec3::new(1.0, 1.0, 1.0));
        assert!(!real.is_degenerate());
    }

    #[test]
    fn test_plane_distance() {
        let plane = Plane::from_coefficients(0.0, 2.0, 0.0, -4.0);

        // Coefficients are normalized: y = 2 plane.
        assert_relative_eq!(plane.distance_to_point(Vec3::new(0.0, 5.0, 0.0)), 3.0);
        assert_relative_eq!(plane.distance_to_point(Vec3::new(3.0, 2.0, -1.0)), 0.0);
    }
}
