extern crate nalgebra as na;

use na::{Matrix3, UnitQuaternion, Rotation3, Quaternion};
use crate::Float;

pub fn quaternion_from_xyzw(x: Float, y: Float, z: Float, w: Float) -> UnitQuaternion<Float> {
    UnitQuaternion::<Float>::from_quaternion(Quaternion::<Float>::new(w, x, y, z))
}

pub fn quaternion_from_matrix(rotation: &Matrix3<Float>) -> UnitQuaternion<Float> {
    UnitQuaternion::<Float>::from_rotation_matrix(&Rotation3::from_matrix_unchecked(*rotation))
}

/**
 * Re-orients a camera-to-world orientation into the target frame of a rotation.
 */
pub fn rotate_orientation(rotation: &Matrix3<Float>, orientation: &UnitQuaternion<Float>) -> UnitQuaternion<Float> {
    quaternion_from_matrix(rotation)*orientation
}

/**
 * Angle in radians of the relative rotation between two orientations
 */
pub fn angular_distance(a: &UnitQuaternion<Float>, b: &UnitQuaternion<Float>) -> Float {
    a.angle_to(b)
}

pub fn row_major(rotation: &Matrix3<Float>) -> [[Float; 3]; 3] {
    let mut rows = [[0.0; 3]; 3];
    for r in 0..3 {
        for c in 0..3 {
            rows[r][c] = rotation[(r,c)];
        }
    }
    rows
}

pub fn from_row_major(rows: &[[Float; 3]; 3]) -> Matrix3<Float> {
    Matrix3::<Float>::new(rows[0][0],rows[0][1],rows[0][2],
                          rows[1][0],rows[1][1],rows[1][2],
                          rows[2][0],rows[2][1],rows[2][2])
}

/**
 * 3D Rotations - Kanatani p.35
 * Closest proper rotation in the Frobenius sense. None if the SVD does not produce singular vectors.
 */
pub fn optimal_correction_of_rotation(rotation: &Matrix3<Float>) -> Option<Matrix3<Float>> {
    let svd = rotation.svd(true,true);
    let u = svd.u?;
    let v_t = svd.v_t?;
    let det = (u*v_t).determinant();
    let correction = Matrix3::<Float>::from_diagonal(&na::Vector3::<Float>::new(1.0, 1.0, det.signum()));
    Some(u*correction*v_t)
}
