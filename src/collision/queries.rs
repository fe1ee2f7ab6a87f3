use glam::{Quat, Vec3};

use crate::core::{Aabb, BodyId};
use crate::kernel::GeomDesc;
use crate::utils::math::direction_to_rotation;

/// Result of a ray cast against bound shapes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub body: BodyId,
    pub shape: usize,
    pub position: Vec3,
    pub normal: Vec3,
    pub distance: f32,
    /// Index of the triangle hit on mesh shapes.
    pub triangle: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastQuery {
    pub origin: Vec3,
    pub direction: Vec3,
    pub max_distance: f32,
    /// Contact-group mask; only shapes whose category intersects it are hit.
    pub mask: u32,
}

impl RaycastQuery {
    pub fn new(origin: Vec3, direction: Vec3, max_distance: f32) -> Self {
        Self {
            origin,
            direction,
            max_distance,
            mask: crate::config::ALL_GROUPS,
        }
    }

    pub fn with_mask(mut self, mask: u32) -> Self {
        self.mask = mask;
        self
    }
}

/// Overlap volume for [`crate::scene::Scene::volume_cast`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VolumeQuery {
    Box {
        center: Vec3,
        half_extents: Vec3,
        rotation: Quat,
    },
    Sphere {
        center: Vec3,
        radius: f32,
    },
    /// Capsule between two points.
    Capsule {
        start: Vec3,
        end: Vec3,
        radius: f32,
    },
    Aabb(Aabb),
}

impl VolumeQuery {
    /// Transient kernel geometry standing for the query, with its world pose.
    pub fn geom(&self) -> (GeomDesc, Vec3, Quat) {
        match *self {
            VolumeQuery::Box {
                center,
                half_extents,
                rotation,
            } => (GeomDesc::Box { half_extents }, center, rotation),
            VolumeQuery::Sphere { center, radius } => {
                (GeomDesc::Sphere { radius }, center, Quat::IDENTITY)
            }
            VolumeQuery::Capsule { start, end, radius } => (
                GeomDesc::Capsule {
                    radius,
                    length: start.distance(end),
                },
                (start + end) * 0.5,
                direction_to_rotation(end - start),
            ),
            VolumeQuery::Aabb(bounds) => (
                GeomDesc::Box {
                    half_extents: bounds.extent(),
                },
                bounds.center(),
                Quat::IDENTITY,
            ),
        }
    }
}
