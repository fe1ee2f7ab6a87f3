//! Engine-facing value types: bodies, shapes, meshes and joints.

pub mod joint;
pub mod mesh;
pub mod rigidbody;
pub mod shape;
pub mod types;

use crate::utils::allocator::EntityId;

/// Identifies a body within its scene.
pub type BodyId = EntityId;
/// Identifies a joint within its scene.
pub type JointId = EntityId;
/// Identifies a scene within a [`crate::PhysicsEngine`].
pub type SceneId = EntityId;

pub use joint::{
    AxisLimit, AxisMotor, BreakThresholds, Joint, JointAxis, JointKind, JointReadback,
    JointStress, Suspension,
};
pub use mesh::{Aabb, MeshBuilder, TriangleMesh};
pub use rigidbody::{RigidBody, RigidBodyBuilder};
pub use shape::{CollisionFilter, Shape, ShapeKind};
pub use types::{InertiaTensorExt, MassProperties, SurfaceMaterial, Transform, Velocity};
