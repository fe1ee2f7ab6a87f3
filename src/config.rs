//! Global tuning constants and per-scene configuration.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{PhysicsError, Result};

/// Default gravity vector applied in a scene (Y-up).
pub const DEFAULT_GRAVITY: [f32; 3] = [0.0, -9.81, 0.0];

/// Default fixed step size (in seconds).
pub const DEFAULT_STEP_SIZE: f32 = 1.0 / 60.0;

/// Default number of kernel solver iterations per step.
pub const DEFAULT_MAX_ITERATIONS: u32 = 20;

/// Default upper bound on contacts generated per geometry pair.
pub const DEFAULT_MAX_CONTACTS: usize = 4;

/// Default damping applied to linear velocity.
pub const DEFAULT_LINEAR_DAMPING: f32 = 0.0;

/// Default damping applied to angular velocity.
pub const DEFAULT_ANGULAR_DAMPING: f32 = 0.01;

/// Default body sleepiness (0 never sleeps, 1 sleeps eagerly).
pub const DEFAULT_SLEEPINESS: f32 = 0.5;

/// Two joint axes count as usable only when `|a1 · a2|` stays below this.
pub const AXIS_PARALLEL_THRESHOLD: f32 = 0.095;

/// Stop softness (CFM) written for a limit with restitution 0 and 1.
pub const STOP_CFM_MIN: f32 = 1e-5;
pub const STOP_CFM_MAX: f32 = 1e-2;

/// Stop bounciness written for a limit with restitution 0 and 1.
pub const STOP_BOUNCE_MIN: f32 = 0.0;
pub const STOP_BOUNCE_MAX: f32 = 1.0;

/// Stop error reduction applied to every limit.
pub const STOP_ERP: f32 = 0.2;

/// Auto-disable thresholds at sleepiness 0 and 1.
pub const SLEEP_LINEAR_THRESHOLD_MIN: f32 = 0.01;
pub const SLEEP_LINEAR_THRESHOLD_MAX: f32 = 0.5;
pub const SLEEP_ANGULAR_THRESHOLD_MIN: f32 = 0.01;
pub const SLEEP_ANGULAR_THRESHOLD_MAX: f32 = 0.5;
pub const SLEEP_STEPS_MIN: f32 = 60.0;
pub const SLEEP_STEPS_MAX: f32 = 5.0;
pub const SLEEP_TIME_MIN: f32 = 2.0;
pub const SLEEP_TIME_MAX: f32 = 0.1;

/// Fraction of the smallest shape extent used as the CCD swept radius.
pub const CCD_RADIUS_FACTOR: f32 = 0.9;

/// Swept radius used for meshes, which have no meaningful smallest extent.
pub const CCD_MESH_FALLBACK_RADIUS: f32 = 0.05;

/// Movement below this since the last snapshot skips the CCD ray.
pub const CCD_MOVEMENT_EPSILON: f32 = 1e-4;

/// Floors guarding the total-mass to density division.
pub const MIN_SHAPE_VOLUME: f32 = 1e-6;
pub const MIN_DENSITY: f32 = 1e-4;

/// Contact-group mask matching every geometry.
pub const ALL_GROUPS: u32 = u32::MAX;

/// Per-scene settings, read once when the scene is created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    pub gravity: Vec3,
    pub step_size: f32,
    pub max_iterations: u32,
    pub max_contacts: usize,
    pub report_collisions: bool,
    /// Steps allowed per `advance` call before the accumulator is dropped.
    pub max_steps_per_advance: u32,
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::from_slice(&DEFAULT_GRAVITY),
            step_size: DEFAULT_STEP_SIZE,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_contacts: DEFAULT_MAX_CONTACTS,
            report_collisions: true,
            max_steps_per_advance: 8,
        }
    }
}

impl SceneConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.step_size.is_finite() && self.step_size > 0.0) {
            return Err(PhysicsError::InvalidConfig(format!(
                "step_size must be positive, got {}",
                self.step_size
            )));
        }
        if self.max_iterations == 0 {
            return Err(PhysicsError::InvalidConfig(
                "max_iterations must be at least 1".into(),
            ));
        }
        if !self.gravity.is_finite() {
            return Err(PhysicsError::InvalidConfig("gravity must be finite".into()));
        }
        Ok(())
    }
}
