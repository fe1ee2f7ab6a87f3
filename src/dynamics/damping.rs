//! Velocity damping expressed as forces for the kernel's accumulators.

use glam::{Quat, Vec3};

use crate::core::{MassProperties, Velocity};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DampingForces {
    /// World-space force at the centre of mass.
    pub force: Vec3,
    /// Torque in the body frame.
    pub relative_torque: Vec3,
}

/// Forces opposing the current motion: `-linear * m * v` and
/// `-angular * (I * w_local)`.
pub fn damping_forces(
    velocity: &Velocity,
    rotation: Quat,
    mass: &MassProperties,
    linear: f32,
    angular: f32,
) -> DampingForces {
    let local_angular = rotation.conjugate() * velocity.angular;
    DampingForces {
        force: velocity.linear * (-linear * mass.mass),
        relative_torque: (mass.inertia * local_angular) * -angular,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use glam::Mat3;

    #[test]
    fn damping_opposes_motion() {
        let velocity = Velocity {
            linear: Vec3::new(2.0, 0.0, 0.0),
            angular: Vec3::new(0.0, 0.0, 1.0),
        };
        let mass = MassProperties {
            mass: 3.0,
            center_of_mass: Vec3::ZERO,
            inertia: Mat3::from_diagonal(Vec3::new(1.0, 1.0, 4.0)),
        };
        let rotation = Quat::from_rotation_x(std::f32::consts::FRAC_PI_2);
        let forces = damping_forces(&velocity, rotation, &mass, 0.5, 0.25);
        assert_relative_eq!(forces.force.x, -3.0);
        // World z is local y after the rotation.
        assert_relative_eq!(forces.relative_torque.y, -0.25, epsilon = 1e-5);
        assert_relative_eq!(forces.relative_torque.z, 0.0, epsilon = 1e-5);
    }
}
