use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::{BodyId, JointId};

/// Range a joint axis may travel, in radians for angular axes and world
/// units for the slider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisLimit {
    pub low: f32,
    pub high: f32,
    /// 0 stops dead and stiff, 1 bounces back softly.
    pub restitution: f32,
}

impl AxisLimit {
    pub fn new(low: f32, high: f32) -> Self {
        Self {
            low,
            high,
            restitution: 0.0,
        }
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.restitution = restitution;
        self
    }

    /// Range seen from the other body.
    pub fn mirrored(&self) -> Self {
        Self {
            low: -self.high,
            high: -self.low,
            restitution: self.restitution,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisMotor {
    pub velocity: f32,
    /// Maximum force (slider) or torque the motor may apply.
    pub max_force: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct JointAxis {
    /// World-space direction at attach time.
    pub direction: Vec3,
    pub limit: Option<AxisLimit>,
    pub motor: Option<AxisMotor>,
}

impl JointAxis {
    pub fn new(direction: Vec3) -> Self {
        Self {
            direction,
            limit: None,
            motor: None,
        }
    }

    pub fn with_limit(mut self, limit: AxisLimit) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_motor(mut self, velocity: f32, max_force: f32) -> Self {
        self.motor = Some(AxisMotor {
            velocity,
            max_force,
        });
        self
    }
}

/// Hinge-2 wheel suspension softness.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Suspension {
    pub erp: f32,
    pub cfm: f32,
}

impl Default for Suspension {
    fn default() -> Self {
        Self { erp: 0.4, cfm: 0.8 }
    }
}

/// The six supported joints. Anchors are world-space at attach time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum JointKind {
    Fixed,
    /// Angular axes for swing and twist limits or motors, body 1 frame.
    Ball {
        anchor: Vec3,
        axes: [JointAxis; 3],
    },
    Hinge {
        anchor: Vec3,
        axis: JointAxis,
    },
    /// Steering axis on body 1, wheel axis on body 2.
    Hinge2 {
        anchor: Vec3,
        axes: [JointAxis; 2],
        suspension: Suspension,
    },
    Slider {
        axis: JointAxis,
    },
    Universal {
        anchor: Vec3,
        axes: [JointAxis; 2],
    },
}

impl JointKind {
    /// Ball joint with free world X, Y and Z axes.
    pub fn ball(anchor: Vec3) -> Self {
        JointKind::Ball {
            anchor,
            axes: [
                JointAxis::new(Vec3::X),
                JointAxis::new(Vec3::Y),
                JointAxis::new(Vec3::Z),
            ],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            JointKind::Fixed => "fixed",
            JointKind::Ball { .. } => "ball",
            JointKind::Hinge { .. } => "hinge",
            JointKind::Hinge2 { .. } => "hinge2",
            JointKind::Slider { .. } => "slider",
            JointKind::Universal { .. } => "universal",
        }
    }

    pub fn anchor(&self) -> Option<Vec3> {
        match self {
            JointKind::Ball { anchor, .. }
            | JointKind::Hinge { anchor, .. }
            | JointKind::Hinge2 { anchor, .. }
            | JointKind::Universal { anchor, .. } => Some(*anchor),
            JointKind::Fixed | JointKind::Slider { .. } => None,
        }
    }

    pub fn axes(&self) -> &[JointAxis] {
        match self {
            JointKind::Fixed => &[],
            JointKind::Hinge { axis, .. } | JointKind::Slider { axis } => std::slice::from_ref(axis),
            JointKind::Hinge2 { axes, .. } | JointKind::Universal { axes, .. } => axes,
            JointKind::Ball { axes, .. } => axes,
        }
    }

    pub fn axes_mut(&mut self) -> &mut [JointAxis] {
        match self {
            JointKind::Fixed => &mut [],
            JointKind::Hinge { axis, .. } | JointKind::Slider { axis } => {
                std::slice::from_mut(axis)
            }
            JointKind::Hinge2 { axes, .. } | JointKind::Universal { axes, .. } => axes,
            JointKind::Ball { axes, .. } => axes,
        }
    }
}

/// Force and torque thresholds above which a joint breaks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BreakThresholds {
    pub max_force: Option<f32>,
    pub max_torque: Option<f32>,
}

/// Constraint force magnitudes sampled from the kernel feedback buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JointStress {
    pub force: f32,
    pub torque: f32,
}

/// Solved joint frame read back after every step, for visualisation.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JointReadback {
    pub anchor1: Vec3,
    pub anchor2: Vec3,
    pub axes: [Vec3; 3],
}

/// Engine-side joint record. `None` for a body means the static environment.
#[derive(Debug, Clone)]
pub struct Joint {
    pub id: JointId,
    pub body1: Option<BodyId>,
    pub body2: Option<BodyId>,
    pub kind: JointKind,
    pub break_thresholds: BreakThresholds,
    pub broken: bool,
    pub readback: JointReadback,
}

impl Joint {
    pub fn new(body1: Option<BodyId>, body2: Option<BodyId>, kind: JointKind) -> Self {
        Self {
            id: JointId::default(),
            body1,
            body2,
            kind,
            break_thresholds: BreakThresholds::default(),
            broken: false,
            readback: JointReadback::default(),
        }
    }

    pub fn with_break_thresholds(mut self, max_force: Option<f32>, max_torque: Option<f32>) -> Self {
        self.break_thresholds = BreakThresholds {
            max_force,
            max_torque,
        };
        self
    }

    pub fn connects(&self, body: BodyId) -> bool {
        self.body1 == Some(body) || self.body2 == Some(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirrored_limit_swaps_and_negates() {
        let limit = AxisLimit::new(-0.25, 1.0).with_restitution(0.3).mirrored();
        assert_eq!(limit.low, -1.0);
        assert_eq!(limit.high, 0.25);
        assert_eq!(limit.restitution, 0.3);
    }

    #[test]
    fn axes_follow_the_variant() {
        let hinge2 = JointKind::Hinge2 {
            anchor: Vec3::ZERO,
            axes: [JointAxis::new(Vec3::Y), JointAxis::new(Vec3::X)],
            suspension: Suspension::default(),
        };
        assert_eq!(hinge2.axes().len(), 2);
        assert_eq!(JointKind::ball(Vec3::ZERO).axes().len(), 3);
        assert!(JointKind::Fixed.axes().is_empty());
        assert_eq!(hinge2.name(), "hinge2");
    }
}
