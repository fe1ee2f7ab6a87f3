use glam::{Quat, Vec3};

use super::shape::Shape;
use super::types::{MassProperties, Transform, Velocity};
use super::BodyId;
use crate::config::{DEFAULT_ANGULAR_DAMPING, DEFAULT_LINEAR_DAMPING, DEFAULT_SLEEPINESS};

/// Engine-side rigid body record.
///
/// Static bodies never get a kernel body: their shapes are placed directly in
/// the scene's space and they do not move during a step.
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub id: BodyId,
    pub transform: Transform,
    pub velocity: Velocity,
    pub shapes: Vec<Shape>,
    pub is_static: bool,
    /// When set, shape densities are replaced by a uniform density matching it.
    pub total_mass: Option<f32>,
    pub linear_damping: f32,
    pub angular_damping: f32,
    /// 0 never auto-sleeps, 1 sleeps as eagerly as possible.
    pub sleepiness: f32,
    pub gravity_enabled: bool,
    pub continuous_collision: bool,
    pub report_collisions: bool,
    pub is_awake: bool,
    /// Derived on every push and shape change.
    pub mass_properties: MassProperties,
}

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            id: BodyId::default(),
            transform: Transform::default(),
            velocity: Velocity::default(),
            shapes: Vec::new(),
            is_static: false,
            total_mass: None,
            linear_damping: DEFAULT_LINEAR_DAMPING,
            angular_damping: DEFAULT_ANGULAR_DAMPING,
            sleepiness: DEFAULT_SLEEPINESS,
            gravity_enabled: true,
            continuous_collision: false,
            report_collisions: false,
            is_awake: true,
            mass_properties: MassProperties::default(),
        }
    }
}

impl RigidBody {
    pub fn new(id: BodyId) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn builder() -> RigidBodyBuilder {
        RigidBodyBuilder::default()
    }

    pub fn is_dynamic(&self) -> bool {
        !self.is_static
    }
}

#[derive(Debug, Clone, Default)]
pub struct RigidBodyBuilder {
    body: RigidBody,
}

impl RigidBodyBuilder {
    pub fn dynamic() -> Self {
        Self::default()
    }

    pub fn fixed() -> Self {
        let mut builder = Self::default();
        builder.body.is_static = true;
        builder
    }

    pub fn position(mut self, position: Vec3) -> Self {
        self.body.transform.position = position;
        self
    }

    pub fn rotation(mut self, rotation: Quat) -> Self {
        self.body.transform.rotation = rotation;
        self
    }

    pub fn shape(mut self, shape: Shape) -> Self {
        self.body.shapes.push(shape);
        self
    }

    pub fn shapes(mut self, shapes: impl IntoIterator<Item = Shape>) -> Self {
        self.body.shapes.extend(shapes);
        self
    }

    pub fn linear_velocity(mut self, velocity: Vec3) -> Self {
        self.body.velocity.linear = velocity;
        self
    }

    pub fn angular_velocity(mut self, velocity: Vec3) -> Self {
        self.body.velocity.angular = velocity;
        self
    }

    pub fn total_mass(mut self, mass: f32) -> Self {
        self.body.total_mass = Some(mass);
        self
    }

    pub fn damping(mut self, linear: f32, angular: f32) -> Self {
        self.body.linear_damping = linear;
        self.body.angular_damping = angular;
        self
    }

    pub fn sleepiness(mut self, sleepiness: f32) -> Self {
        self.body.sleepiness = sleepiness.clamp(0.0, 1.0);
        self
    }

    pub fn gravity(mut self, enabled: bool) -> Self {
        self.body.gravity_enabled = enabled;
        self
    }

    pub fn continuous_collision(mut self, enabled: bool) -> Self {
        self.body.continuous_collision = enabled;
        self
    }

    pub fn report_collisions(mut self, enabled: bool) -> Self {
        self.body.report_collisions = enabled;
        self
    }

    pub fn build(self) -> RigidBody {
        self.body
    }
}
