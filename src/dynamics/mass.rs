//! Aggregate mass, centre of mass and inertia from a body's shapes.

use glam::{Mat3, Quat, Vec3};

use crate::config::{MIN_DENSITY, MIN_SHAPE_VOLUME};
use crate::core::{InertiaTensorExt, MassProperties, Shape, ShapeKind};
use crate::utils::math::parallel_axis;

/// Mass with its centre and the inertia about that centre.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MassTensor {
    pub mass: f32,
    pub center: Vec3,
    pub inertia: Mat3,
}

impl MassTensor {
    pub const ZERO: MassTensor = MassTensor {
        mass: 0.0,
        center: Vec3::ZERO,
        inertia: Mat3::ZERO,
    };

    /// Tensor of one shape in its own frame.
    pub fn from_shape(shape: &Shape, density: f32) -> Self {
        let mass = shape.volume() * density;
        match &shape.kind {
            ShapeKind::Box { half_extents } => Self {
                mass,
                center: Vec3::ZERO,
                inertia: Mat3::for_solid_box(*half_extents, mass),
            },
            ShapeKind::Sphere { radius } => Self {
                mass,
                center: Vec3::ZERO,
                inertia: Mat3::for_solid_sphere(*radius, mass),
            },
            ShapeKind::Capsule { radius, length } => {
                use std::f32::consts::PI;
                let (r, l) = (*radius, *length);
                let cylinder = density * PI * r * r * l;
                let caps = density * 4.0 / 3.0 * PI * r * r * r;
                let side = cylinder * (0.25 * r * r + l * l / 12.0)
                    + caps * (0.4 * r * r + 0.375 * r * l + 0.25 * l * l);
                let axial = (0.5 * cylinder + 0.4 * caps) * r * r;
                Self {
                    mass,
                    center: Vec3::ZERO,
                    inertia: Mat3::from_diagonal(Vec3::new(side, side, axial)),
                }
            }
            ShapeKind::Cylinder { radius, length } => {
                let (r, l) = (*radius, *length);
                let side = mass * (0.25 * r * r + l * l / 12.0);
                Self {
                    mass,
                    center: Vec3::ZERO,
                    inertia: Mat3::from_diagonal(Vec3::new(side, side, 0.5 * mass * r * r)),
                }
            }
            ShapeKind::Mesh(mesh) => {
                // Box inertia of the bounds, rescaled to the enclosed volume.
                let bounds_volume = mesh.bounds.volume().max(MIN_SHAPE_VOLUME);
                let box_mass = bounds_volume * density;
                let scale = if box_mass > 0.0 { mass / box_mass } else { 0.0 };
                Self {
                    mass,
                    center: mesh.bounds.center(),
                    inertia: Mat3::for_solid_box(mesh.bounds.extent(), box_mass) * scale,
                }
            }
        }
    }

    pub fn rotated(self, rotation: Quat) -> Self {
        let r = Mat3::from_quat(rotation);
        Self {
            mass: self.mass,
            center: rotation * self.center,
            inertia: r * self.inertia * r.transpose(),
        }
    }

    pub fn translated(self, offset: Vec3) -> Self {
        Self {
            center: self.center + offset,
            ..self
        }
    }

    pub fn add(self, other: MassTensor) -> Self {
        let mass = self.mass + other.mass;
        if mass <= 0.0 {
            return Self::ZERO;
        }
        let center = (self.center * self.mass + other.center * other.mass) / mass;
        let inertia = self.inertia
            + parallel_axis(self.center - center, self.mass)
            + other.inertia
            + parallel_axis(other.center - center, other.mass);
        Self {
            mass,
            center,
            inertia,
        }
    }
}

/// Density applied to every shape when a body asks for a total mass.
pub fn uniform_density(shapes: &[&Shape], total_mass: f32) -> f32 {
    let volume: f32 = shapes.iter().map(|s| s.volume()).sum();
    (total_mass / volume.max(MIN_SHAPE_VOLUME)).max(MIN_DENSITY)
}

/// Sums the shapes into body-local mass properties.
pub fn aggregate(shapes: &[&Shape], total_mass: Option<f32>) -> MassProperties {
    let density_override = total_mass.map(|m| uniform_density(shapes, m));

    let total = shapes.iter().fold(MassTensor::ZERO, |acc, shape| {
        let density = density_override.unwrap_or(shape.density);
        let tensor = MassTensor::from_shape(shape, density)
            .rotated(shape.local.rotation)
            .translated(shape.local.position);
        acc.add(tensor)
    });

    if !(total.mass > 0.0 && total.mass.is_finite()) {
        log::warn!(
            "aggregate mass {} of {} shapes is degenerate, using unit mass",
            total.mass,
            shapes.len()
        );
        return MassProperties::default();
    }

    MassProperties {
        mass: total.mass,
        center_of_mass: total.center,
        inertia: total.inertia,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Transform;
    use approx::assert_relative_eq;

    #[test]
    fn two_spheres_center_between_them() {
        let a = Shape::sphere(1.0).with_local(Transform::from_position(Vec3::new(-1.0, 0.0, 0.0)));
        let b = Shape::sphere(1.0).with_local(Transform::from_position(Vec3::new(1.0, 0.0, 0.0)));
        let props = aggregate(&[&a, &b], None);
        let single = 4.0 / 3.0 * std::f32::consts::PI;
        assert_relative_eq!(props.mass, 2.0 * single, epsilon = 1e-4);
        assert_relative_eq!(props.center_of_mass.x, 0.0, epsilon = 1e-5);
        // Each sphere adds m*d^2 about the y axis.
        let expected_yy = 2.0 * (0.4 * single + single);
        assert_relative_eq!(props.inertia.y_axis.y, expected_yy, epsilon = 1e-3);
        assert_relative_eq!(props.inertia.x_axis.x, 2.0 * 0.4 * single, epsilon = 1e-3);
    }

    #[test]
    fn total_mass_overrides_density() {
        let a = Shape::cuboid(Vec3::splat(0.5)).with_density(100.0);
        let b = Shape::cuboid(Vec3::splat(0.5))
            .with_local(Transform::from_position(Vec3::new(0.0, 3.0, 0.0)));
        let props = aggregate(&[&a, &b], Some(10.0));
        assert_relative_eq!(props.mass, 10.0, epsilon = 1e-4);
        assert_relative_eq!(props.center_of_mass.y, 1.5, epsilon = 1e-5);
    }

    #[test]
    fn rotated_capsule_moves_axial_inertia() {
        let capsule = Shape::capsule(0.5, 2.0).with_local(Transform::from_position_rotation(
            Vec3::ZERO,
            Quat::from_rotation_x(std::f32::consts::FRAC_PI_2),
        ));
        let props = aggregate(&[&capsule], None);
        assert!(props.inertia.y_axis.y < props.inertia.z_axis.z);
        assert_relative_eq!(props.inertia.x_axis.x, props.inertia.z_axis.z, epsilon = 1e-4);
    }
}
