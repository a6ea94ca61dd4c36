//! Rotation helpers shared by the candidate model and the filters.

use crate::util::{GraspError, GraspResult};
use nalgebra::Matrix3;

/// Maximum deviation tolerated when checking `R^T R = I` and `det R = 1`.
pub const ROTATION_TOLERANCE: f32 = 1e-3;

/// Fails unless `rotation` is a proper rotation within [`ROTATION_TOLERANCE`].
pub(crate) fn check_rotation(rotation: &Matrix3<f32>) -> GraspResult<()> {
    let determinant = rotation.determinant();
    if !determinant.is_finite() || (determinant - 1.0).abs() > ROTATION_TOLERANCE {
        return Err(GraspError::NonOrthonormalRotation { determinant });
    }
    let gram = rotation.transpose() * rotation - Matrix3::identity();
    if gram.amax() > ROTATION_TOLERANCE {
        return Err(GraspError::NonOrthonormalRotation { determinant });
    }
    Ok(())
}

/// Geodesic angle in radians between two rotations.
pub(crate) fn rotation_angle(a: &Matrix3<f32>, b: &Matrix3<f32>) -> f32 {
    let relative = a.transpose() * b;
    let cos = ((relative.trace() - 1.0) * 0.5).clamp(-1.0, 1.0);
    cos.acos()
}

/// Flattens a matrix in row-major order.
pub(crate) fn flatten_row_major(m: &Matrix3<f32>) -> [f32; 9] {
    let mut out = [0.0f32; 9];
    for row in 0..3 {
        for col in 0..3 {
            out[row * 3 + col] = m[(row, col)];
        }
    }
    out
}

/// Builds a matrix from nine row-major values.
pub(crate) fn from_row_major(values: &[f32; 9]) -> Matrix3<f32> {
    Matrix3::from_row_slice(values)
}

#[cfg(test)]
mod tests {
    use super::{check_rotation, flatten_row_major, from_row_major, rotation_angle};
    use nalgebra::{Matrix3, Rotation3, Vector3};

    #[test]
    fn identity_is_a_rotation() {
        assert!(check_rotation(&Matrix3::identity()).is_ok());
    }

    #[test]
    fn reflection_is_rejected() {
        let reflection = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, -1.0));
        assert!(check_rotation(&reflection).is_err());
    }

    #[test]
    fn scaled_matrix_is_rejected() {
        let scaled = Matrix3::identity() * 1.1f32;
        assert!(check_rotation(&scaled).is_err());
    }

    #[test]
    fn rotation_angle_matches_axis_angle() {
        let a = Rotation3::from_axis_angle(&Vector3::z_axis(), 0.2f32);
        let b = Rotation3::from_axis_angle(&Vector3::z_axis(), 0.7f32);
        let angle = rotation_angle(a.matrix(), b.matrix());
        assert!((angle - 0.5).abs() < 1e-4);
    }

    #[test]
    fn flatten_is_row_major() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0];
        let m = from_row_major(&values);
        assert_eq!(m[(0, 1)], 2.0);
        assert_eq!(m[(1, 0)], 4.0);
        assert_eq!(flatten_row_major(&m), values);
    }
}
