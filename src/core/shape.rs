use std::sync::Arc;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::mesh::TriangleMesh;
use super::types::{SurfaceMaterial, Transform};
use crate::config::ALL_GROUPS;

/// Geometry carried by a shape.
///
/// Capsules and cylinders are aligned with their local Z axis; `length` is the
/// length of the cylindrical section.
#[derive(Debug, Clone)]
pub enum ShapeKind {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
    Capsule { radius: f32, length: f32 },
    Cylinder { radius: f32, length: f32 },
    Mesh(Arc<TriangleMesh>),
}

/// Contact-group filtering: two shapes may collide when either one's
/// `category` intersects the other's `collide` mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollisionFilter {
    pub category: u32,
    pub collide: u32,
}

impl Default for CollisionFilter {
    fn default() -> Self {
        Self {
            category: 1,
            collide: ALL_GROUPS,
        }
    }
}

/// One constituent shape of a body.
#[derive(Debug, Clone)]
pub struct Shape {
    pub kind: ShapeKind,
    /// Placement relative to the owning body.
    pub local: Transform,
    pub density: f32,
    pub filter: CollisionFilter,
    pub material: SurfaceMaterial,
}

impl Shape {
    pub fn new(kind: ShapeKind) -> Self {
        Self {
            kind,
            local: Transform::IDENTITY,
            density: 1.0,
            filter: CollisionFilter::default(),
            material: SurfaceMaterial::default(),
        }
    }

    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::new(ShapeKind::Box { half_extents })
    }

    pub fn sphere(radius: f32) -> Self {
        Self::new(ShapeKind::Sphere { radius })
    }

    pub fn capsule(radius: f32, length: f32) -> Self {
        Self::new(ShapeKind::Capsule { radius, length })
    }

    pub fn cylinder(radius: f32, length: f32) -> Self {
        Self::new(ShapeKind::Cylinder { radius, length })
    }

    pub fn mesh(mesh: Arc<TriangleMesh>) -> Self {
        Self::new(ShapeKind::Mesh(mesh))
    }

    pub fn with_local(mut self, local: Transform) -> Self {
        self.local = local;
        self
    }

    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self
    }

    pub fn with_filter(mut self, category: u32, collide: u32) -> Self {
        self.filter = CollisionFilter { category, collide };
        self
    }

    pub fn with_material(mut self, material: SurfaceMaterial) -> Self {
        self.material = material;
        self
    }

    pub fn is_mesh(&self) -> bool {
        matches!(self.kind, ShapeKind::Mesh(_))
    }

    pub fn volume(&self) -> f32 {
        use std::f32::consts::PI;
        match &self.kind {
            ShapeKind::Box { half_extents } => 8.0 * half_extents.x * half_extents.y * half_extents.z,
            ShapeKind::Sphere { radius } => 4.0 / 3.0 * PI * radius.powi(3),
            ShapeKind::Capsule { radius, length } => {
                PI * radius * radius * length + 4.0 / 3.0 * PI * radius.powi(3)
            }
            ShapeKind::Cylinder { radius, length } => PI * radius * radius * length,
            ShapeKind::Mesh(mesh) => mesh.volume(),
        }
    }

    /// Smallest half extent; `None` for meshes.
    pub fn min_extent(&self) -> Option<f32> {
        match &self.kind {
            ShapeKind::Box { half_extents } => Some(half_extents.min_element()),
            ShapeKind::Sphere { radius }
            | ShapeKind::Capsule { radius, .. }
            | ShapeKind::Cylinder { radius, .. } => Some(*radius),
            ShapeKind::Mesh(_) => None,
        }
    }

    /// Rejects shapes the kernel cannot represent.
    pub fn validate(&self) -> crate::Result<()> {
        let finite_positive = |v: f32| v.is_finite() && v > 0.0;
        let ok = match &self.kind {
            ShapeKind::Box { half_extents } => {
                half_extents.is_finite() && half_extents.min_element() > 0.0
            }
            ShapeKind::Sphere { radius } => finite_positive(*radius),
            ShapeKind::Capsule { radius, length } | ShapeKind::Cylinder { radius, length } => {
                finite_positive(*radius) && length.is_finite() && *length >= 0.0
            }
            ShapeKind::Mesh(mesh) => !mesh.triangles.is_empty(),
        };
        if !ok {
            return Err(crate::PhysicsError::InvalidShape(format!("{:?}", self.kind)));
        }
        if !(self.density.is_finite() && self.density >= 0.0) {
            return Err(crate::PhysicsError::InvalidShape(format!(
                "density {} must be finite and non-negative",
                self.density
            )));
        }
        if !self.local.is_finite() {
            return Err(crate::PhysicsError::InvalidShape(
                "local transform is not finite".into(),
            ));
        }
        Ok(())
    }
}
