use glam::Vec3;

use super::binding::ShapeRef;
use crate::core::BodyId;
use crate::kernel::RawCollision;

/// Contact reported to the engine after a step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionEvent {
    pub body1: BodyId,
    pub body2: BodyId,
    pub shape1: usize,
    pub shape2: usize,
    pub position: Vec3,
    /// Points from body 1 towards body 2.
    pub normal: Vec3,
    pub depth: f32,
}

impl CollisionEvent {
    /// Builds the engine event; the kernel normal points the other way.
    pub fn from_raw(raw: &RawCollision, first: ShapeRef, second: ShapeRef) -> Self {
        Self {
            body1: first.body,
            body2: second.body,
            shape1: first.shape,
            shape2: second.shape,
            position: raw.position,
            normal: -raw.normal,
            depth: raw.depth,
        }
    }

    pub fn involves(&self, body: BodyId) -> bool {
        self.body1 == body || self.body2 == body
    }
}
