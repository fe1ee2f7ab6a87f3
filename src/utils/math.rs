//! Additional math helpers layered on top of `glam`.

use glam::{Mat3, Quat, Vec3};

/// Converts angular velocity vector (radians/sec) into a quaternion delta.
pub fn angular_velocity_to_quat(angular: Vec3, dt: f32) -> Quat {
    let angle = angular.length() * dt;
    if angle.abs() < 1e-6 {
        return Quat::IDENTITY;
    }
    let axis = angular.normalize();
    Quat::from_axis_angle(axis, angle)
}

pub fn lerp(min: f32, max: f32, t: f32) -> f32 {
    min + (max - min) * t.clamp(0.0, 1.0)
}

/// Rotation taking the local +Z axis onto `direction`.
///
/// Capsule and cylinder geometry is Z-aligned, so query shapes given as a
/// direction go through this.
pub fn direction_to_rotation(direction: Vec3) -> Quat {
    let dir = direction.normalize_or_zero();
    if dir == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    Quat::from_rotation_arc(Vec3::Z, dir)
}

/// Parallel-axis term `m * (|d|² I - d dᵀ)`.
pub fn parallel_axis(offset: Vec3, mass: f32) -> Mat3 {
    let d2 = offset.length_squared();
    let outer = Mat3::from_cols(offset * offset.x, offset * offset.y, offset * offset.z);
    (Mat3::from_diagonal(Vec3::splat(d2)) - outer) * mass
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn direction_to_rotation_maps_z_onto_direction() {
        for dir in [Vec3::X, Vec3::Y, -Vec3::Z, Vec3::new(1.0, 2.0, -3.0)] {
            let rotated = direction_to_rotation(dir) * Vec3::Z;
            let expected = dir.normalize();
            assert_relative_eq!(rotated.x, expected.x, epsilon = 1e-5);
            assert_relative_eq!(rotated.y, expected.y, epsilon = 1e-5);
            assert_relative_eq!(rotated.z, expected.z, epsilon = 1e-5);
        }
    }

    #[test]
    fn parallel_axis_on_x_offset() {
        let term = parallel_axis(Vec3::new(2.0, 0.0, 0.0), 3.0);
        assert_relative_eq!(term.x_axis.x, 0.0);
        assert_relative_eq!(term.y_axis.y, 12.0);
        assert_relative_eq!(term.z_axis.z, 12.0);
    }
}
