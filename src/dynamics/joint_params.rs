//! Mapping of engine joint descriptions onto kernel joint parameters.

use glam::Vec3;

use crate::config::{
    AXIS_PARALLEL_THRESHOLD, STOP_BOUNCE_MAX, STOP_BOUNCE_MIN, STOP_CFM_MAX, STOP_CFM_MIN,
    STOP_ERP,
};
use crate::core::{AxisLimit, JointAxis, JointKind, Suspension};
use crate::kernel::{JointHandle, JointParam, JointType, Kernel};
use crate::utils::math::lerp;

/// Number of times every stop pair is written. Native kernels reject a stop
/// that crosses the currently stored opposite stop, so a single lo/hi pass
/// can leave a moved window half applied.
pub const LIMIT_WRITE_PASSES: usize = 2;

pub fn kernel_joint_type(kind: &JointKind) -> JointType {
    match kind {
        JointKind::Fixed => JointType::Fixed,
        JointKind::Ball { .. } => JointType::Ball,
        JointKind::Hinge { .. } => JointType::Hinge,
        JointKind::Hinge2 { .. } => JointType::Hinge2,
        JointKind::Slider { .. } => JointType::Slider,
        JointKind::Universal { .. } => JointType::Universal,
    }
}

/// Whether the kernel exposes stops on this axis. The hinge-2 wheel axis
/// spins freely.
pub fn axis_supports_limit(kind: &JointKind, axis: usize) -> bool {
    !matches!((kind, axis), (JointKind::Hinge2 { .. }, 1))
}

/// Checks axis geometry and limit ranges, returning why a joint cannot attach.
pub fn validate(kind: &JointKind) -> Result<(), String> {
    let axes = kind.axes();
    for (index, axis) in axes.iter().enumerate() {
        if !axis.direction.is_finite() || axis.direction.length_squared() < 1e-12 {
            return Err(format!("axis {index} has no direction"));
        }
        if let Some(limit) = axis.limit {
            if !(limit.low <= limit.high) {
                return Err(format!(
                    "axis {index} limit [{}, {}] is inverted",
                    limit.low, limit.high
                ));
            }
        }
    }
    for (i, first) in axes.iter().enumerate() {
        for (j, second) in axes.iter().enumerate().skip(i + 1) {
            let alignment = first
                .direction
                .normalize()
                .dot(second.direction.normalize())
                .abs();
            if alignment >= AXIS_PARALLEL_THRESHOLD {
                return Err(format!(
                    "axes {i} and {j} are not perpendicular enough (|dot| = {alignment:.3})"
                ));
            }
        }
    }
    if let Some(anchor) = kind.anchor() {
        if !anchor.is_finite() {
            return Err("anchor is not finite".into());
        }
    }
    Ok(())
}

/// Axis as handed to the kernel, flipped when the body order is reversed.
pub fn oriented_direction(axis: &JointAxis, reversed: bool) -> Vec3 {
    let direction = axis.direction.normalize_or_zero();
    if reversed {
        -direction
    } else {
        direction
    }
}

pub fn oriented_limit(limit: Option<AxisLimit>, reversed: bool) -> Option<AxisLimit> {
    limit.map(|l| if reversed { l.mirrored() } else { l })
}

/// Writes stops, stop softness and motor for one axis.
pub fn push_axis_params<K: Kernel + ?Sized>(
    kernel: &mut K,
    joint: JointHandle,
    index: usize,
    kind: &JointKind,
    axis: &JointAxis,
    reversed: bool,
) {
    if axis_supports_limit(kind, index) {
        let limit = oriented_limit(axis.limit, reversed);
        let (low, high) = limit.map_or((f32::NEG_INFINITY, f32::INFINITY), |l| (l.low, l.high));
        for _ in 0..LIMIT_WRITE_PASSES {
            kernel.joint_set_param(joint, index, JointParam::LoStop, low);
            kernel.joint_set_param(joint, index, JointParam::HiStop, high);
        }

        let restitution = limit.map_or(0.0, |l| l.restitution);
        kernel.joint_set_param(
            joint,
            index,
            JointParam::StopCfm,
            lerp(STOP_CFM_MIN, STOP_CFM_MAX, restitution),
        );
        kernel.joint_set_param(
            joint,
            index,
            JointParam::Bounce,
            lerp(STOP_BOUNCE_MIN, STOP_BOUNCE_MAX, restitution),
        );
        kernel.joint_set_param(joint, index, JointParam::StopErp, STOP_ERP);
    }

    let (velocity, max_force) = axis
        .motor
        .map_or((0.0, 0.0), |m| (m.velocity, m.max_force.max(0.0)));
    let velocity = if reversed { -velocity } else { velocity };
    kernel.joint_set_param(joint, index, JointParam::Vel, velocity);
    kernel.joint_set_param(joint, index, JointParam::FMax, max_force);
}

pub fn push_suspension<K: Kernel + ?Sized>(kernel: &mut K, joint: JointHandle, suspension: &Suspension) {
    kernel.joint_set_param(joint, 0, JointParam::SuspensionErp, suspension.erp);
    kernel.joint_set_param(joint, 0, JointParam::SuspensionCfm, suspension.cfm);
}

/// Re-pushes every tunable parameter of a live joint.
pub fn push_all<K: Kernel + ?Sized>(
    kernel: &mut K,
    joint: JointHandle,
    kind: &JointKind,
    reversed: bool,
) {
    for (index, axis) in kind.axes().iter().enumerate() {
        push_axis_params(kernel, joint, index, kind, axis, reversed);
    }
    if let JointKind::Hinge2 { suspension, .. } = kind {
        push_suspension(kernel, joint, suspension);
    }
}
