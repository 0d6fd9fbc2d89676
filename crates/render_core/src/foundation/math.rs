//! Math utilities and types
//!
//! Provides fundamental math types for 3D graphics. All types are thin
//! aliases over nalgebra's f32 types.

pub use nalgebra::{Matrix3, Matrix4, Vector2, Vector3, Vector4};

/// 2D vector type
pub type Vec2 = Vector2<f32>;

/// 3D vector type
pub type Vec3 = Vector3<f32>;

/// 4D vector type
pub type Vec4 = Vector4<f32>;

/// 3x3 matrix type
pub type Mat3 = Matrix3<f32>;

/// 4x4 matrix type
pub type Mat4 = Matrix4<f32>;

/// 3D point type
pub type Point3 = nalgebra::Point3<f32>;

/// Compute the matrix that transforms normals for a given model-view matrix.
///
/// This is the inverse-transpose of the model-view matrix. A singular
/// model-view matrix (e.g. a zero scale) falls back to the identity.
pub fn normal_matrix(model_view: &Mat4) -> Mat4 {
    model_view
        .try_inverse()
        .map_or_else(Mat4::identity, |inverse| inverse.transpose())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_normal_matrix_of_rotation_is_rotation() {
        let rotation = Mat4::from_axis_angle(&Vec3::y_axis(), 0.7);
        let normal = normal_matrix(&rotation);

        // For a pure rotation the inverse-transpose equals the matrix itself.
        assert_relative_eq!(normal, rotation, epsilon = 1e-5);
    }

    #[test]
    fn test_normal_matrix_singular_falls_back_to_identity() {
        let singular = Mat4::zeros();
        assert_eq!(normal_matrix(&singular), Mat4::identity());
    }
}
