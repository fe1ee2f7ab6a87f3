//! Error types for operations that address bodies, joints or configuration.
//!
//! Conditions that the simulation tolerates (broken joints, invalid joint
//! geometry, NaN repair) are logged instead of surfacing here.

use thiserror::Error;

use crate::utils::allocator::EntityId;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    #[error("unknown body {0:?}")]
    UnknownBody(EntityId),

    #[error("unknown joint {0:?}")]
    UnknownJoint(EntityId),

    #[error("unknown scene {0:?}")]
    UnknownScene(EntityId),

    #[error("invalid shape: {0}")]
    InvalidShape(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("joint {joint:?} has no axis {axis}")]
    NoSuchAxis { joint: EntityId, axis: usize },

    #[error("joint {joint:?} is not a {expected} joint")]
    WrongJointKind {
        joint: EntityId,
        expected: &'static str,
    },
}

/// Result type for physics layer operations.
pub type Result<T> = std::result::Result<T, PhysicsError>;
