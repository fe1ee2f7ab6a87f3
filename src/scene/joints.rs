use glam::Vec3;

use super::{AttachedJoint, JointEntry, Scene};
use crate::core::{
    AxisLimit, AxisMotor, BodyId, BreakThresholds, Joint, JointAxis, JointId, JointKind,
    JointReadback, JointStress, Suspension,
};
use crate::dynamics::joint_params::{self, kernel_joint_type, oriented_direction, push_all};
use crate::error::{PhysicsError, Result};
use crate::kernel::{BodyHandle, Kernel, Scoped};

/// Kernel-side endpoint of a joint.
enum Endpoint {
    /// Static environment or a static body.
    Static,
    Dynamic(BodyHandle),
    /// Referenced body is unknown or not in the world.
    Unavailable,
}

impl<K: Kernel> Scene<K> {
    /// Registers a joint and tries to attach it.
    pub fn add_joint(&mut self, joint: Joint) -> Result<JointId> {
        for body in [joint.body1, joint.body2].into_iter().flatten() {
            if !self.bodies.contains(body) {
                return Err(PhysicsError::UnknownBody(body));
            }
        }
        let id = self.joints.insert_with(|id| JointEntry {
            joint: Joint { id, ..joint },
            pushed: true,
            attached: None,
        });
        self.sync_joint(id);
        Ok(id)
    }

    pub fn remove_joint(&mut self, id: JointId) -> Result<Joint> {
        self.detach_joint(id);
        let entry = self.joints.remove(id).ok_or(PhysicsError::UnknownJoint(id))?;
        Ok(entry.joint)
    }

    pub fn push_joint(&mut self, id: JointId) -> Result<()> {
        self.joint_entry_mut(id)?.pushed = true;
        self.sync_joint(id);
        Ok(())
    }

    pub fn pop_joint(&mut self, id: JointId) -> Result<()> {
        self.joint_entry_mut(id)?.pushed = false;
        self.sync_joint(id);
        Ok(())
    }

    pub fn joint(&self, id: JointId) -> Option<&Joint> {
        self.joints.get(id).map(|e| &e.joint)
    }

    pub fn joints(&self) -> impl Iterator<Item = &Joint> + '_ {
        self.joints.iter().map(|(_, e)| &e.joint)
    }

    pub fn is_joint_attached(&self, id: JointId) -> bool {
        self.joints.get(id).is_some_and(|e| e.attached.is_some())
    }

    /// Solved anchors and axes from the last step.
    pub fn joint_readback(&self, id: JointId) -> Option<JointReadback> {
        self.joint(id).map(|j| j.readback)
    }

    pub fn set_joint_axis(&mut self, id: JointId, axis: usize, direction: Vec3) -> Result<()> {
        self.edit_axis(id, axis, |a| a.direction = direction)
    }

    pub fn set_joint_limit(
        &mut self,
        id: JointId,
        axis: usize,
        limit: Option<AxisLimit>,
    ) -> Result<()> {
        self.edit_axis(id, axis, |a| a.limit = limit)
    }

    pub fn set_joint_motor(
        &mut self,
        id: JointId,
        axis: usize,
        motor: Option<AxisMotor>,
    ) -> Result<()> {
        self.edit_axis(id, axis, |a| a.motor = motor)
    }

    pub fn set_suspension(&mut self, id: JointId, suspension: Suspension) -> Result<()> {
        let entry = self.joint_entry_mut(id)?;
        match &mut entry.joint.kind {
            JointKind::Hinge2 {
                suspension: current,
                ..
            } => *current = suspension,
            _ => {
                return Err(PhysicsError::WrongJointKind {
                    joint: id,
                    expected: "hinge2",
                })
            }
        }
        self.sync_joint(id);
        Ok(())
    }

    pub fn set_break_thresholds(&mut self, id: JointId, thresholds: BreakThresholds) -> Result<()> {
        self.joint_entry_mut(id)?.joint.break_thresholds = thresholds;
        Ok(())
    }

    /// Force and torque the joint transmitted during the last step, or `None`
    /// while it is detached. The feedback buffer is created on first use.
    pub fn joint_stress(&mut self, id: JointId) -> Result<Option<JointStress>> {
        let Self { kernel, joints, .. } = self;
        let entry = joints.get_mut(id).ok_or(PhysicsError::UnknownJoint(id))?;
        let Some(attached) = entry.attached.as_mut() else {
            return Ok(None);
        };
        let feedback = match attached.feedback {
            Some(feedback) => feedback,
            None => {
                let feedback = kernel.feedback_create();
                kernel.joint_set_feedback(attached.handle, Some(feedback));
                attached.feedback = Some(feedback);
                feedback
            }
        };
        let data = kernel.feedback_read(feedback);
        Ok(Some(JointStress {
            force: (data.force1 - data.force2).length(),
            torque: (data.torque1 - data.torque2).length(),
        }))
    }

    /// Marks the joint broken when its stress exceeds a threshold. A broken
    /// joint is detached at the start of the next step.
    pub fn check_joint_break(&mut self, id: JointId) -> Result<bool> {
        let thresholds = self.joint_entry(id)?.joint.break_thresholds;
        if thresholds.max_force.is_none() && thresholds.max_torque.is_none() {
            return Ok(self.joint_entry(id)?.joint.broken);
        }
        let Some(stress) = self.joint_stress(id)? else {
            return Ok(self.joint_entry(id)?.joint.broken);
        };
        let over_force = thresholds.max_force.is_some_and(|max| stress.force > max);
        let over_torque = thresholds.max_torque.is_some_and(|max| stress.torque > max);
        let entry = self.joint_entry_mut(id)?;
        if (over_force || over_torque) && !entry.joint.broken {
            log::info!(
                "joint {id:?} broke (force {:.2}, torque {:.2})",
                stress.force,
                stress.torque
            );
            entry.joint.broken = true;
        }
        Ok(entry.joint.broken)
    }

    /// Clears the broken flag and reattaches the joint.
    pub fn repair_joint(&mut self, id: JointId) -> Result<()> {
        self.joint_entry_mut(id)?.joint.broken = false;
        self.sync_joint(id);
        Ok(())
    }

    /// Angular or linear rate along a joint axis. Returns 0 when the kernel
    /// cannot report it.
    pub fn joint_axis_rate(&self, id: JointId, axis: usize) -> Result<f32> {
        let entry = self.joint_entry(id)?;
        if axis >= entry.joint.kind.axes().len() {
            return Err(PhysicsError::NoSuchAxis { joint: id, axis });
        }
        let Some(attached) = entry.attached else {
            return Ok(0.0);
        };
        match self.kernel.joint_axis_rate(attached.handle, axis) {
            // Swapped bodies and the negated axis cancel out.
            Some(rate) => Ok(rate),
            None => {
                log::info!(
                    "joint {id:?}: {} axis {axis} rate is not available",
                    entry.joint.kind.name()
                );
                Ok(0.0)
            }
        }
    }

    fn joint_entry(&self, id: JointId) -> Result<&JointEntry> {
        self.joints.get(id).ok_or(PhysicsError::UnknownJoint(id))
    }

    fn joint_entry_mut(&mut self, id: JointId) -> Result<&mut JointEntry> {
        self.joints
            .get_mut(id)
            .ok_or(PhysicsError::UnknownJoint(id))
    }

    fn edit_axis(
        &mut self,
        id: JointId,
        axis: usize,
        edit: impl FnOnce(&mut JointAxis),
    ) -> Result<()> {
        let entry = self.joint_entry_mut(id)?;
        let target = entry
            .joint
            .kind
            .axes_mut()
            .get_mut(axis)
            .ok_or(PhysicsError::NoSuchAxis { joint: id, axis })?;
        edit(target);
        self.sync_joint(id);
        Ok(())
    }

    fn endpoint(&self, body: Option<BodyId>) -> Endpoint {
        let Some(id) = body else {
            return Endpoint::Static;
        };
        match self.bodies.get(id).and_then(|e| e.world.as_ref()) {
            Some(world) => world.kernel.map_or(Endpoint::Static, Endpoint::Dynamic),
            None => Endpoint::Unavailable,
        }
    }

    /// Brings the kernel joint in line with the engine joint: attaches,
    /// detaches or re-pushes parameters. Safe to call any number of times.
    pub(crate) fn sync_joint(&mut self, id: JointId) {
        let Some(entry) = self.joints.get(id) else {
            return;
        };
        let wanted = entry.pushed && !entry.joint.broken;
        match (wanted, entry.attached) {
            (true, None) => self.attach_joint(id),
            (false, Some(_)) => self.detach_joint(id),
            (true, Some(attached)) => {
                if let Err(reason) = joint_params::validate(&entry.joint.kind) {
                    log::warn!("joint {id:?} detached: {reason}");
                    self.detach_joint(id);
                    return;
                }
                let kind = entry.joint.kind.clone();
                let k = &mut self.kernel;
                for (index, axis) in kind.axes().iter().enumerate() {
                    k.joint_set_axis(
                        attached.handle,
                        index,
                        oriented_direction(axis, attached.reversed),
                    );
                }
                push_all(k, attached.handle, &kind, attached.reversed);
            }
            (false, None) => {}
        }
    }

    /// Resyncs every joint that references `body`.
    pub(crate) fn sync_joints_of(&mut self, body: BodyId) {
        let related: Vec<JointId> = self
            .joints
            .iter()
            .filter(|(_, e)| e.joint.connects(body))
            .map(|(id, _)| id)
            .collect();
        for id in related {
            self.sync_joint(id);
        }
    }

    fn attach_joint(&mut self, id: JointId) {
        let Some(entry) = self.joints.get(id) else {
            return;
        };
        let (body1, body2) = (entry.joint.body1, entry.joint.body2);
        let kind = entry.joint.kind.clone();
        if let Err(reason) = joint_params::validate(&kind) {
            log::warn!("joint {id:?} ({}) stays detached: {reason}", kind.name());
            return;
        }

        let (first, second) = match (self.endpoint(body1), self.endpoint(body2)) {
            (Endpoint::Unavailable, _) | (_, Endpoint::Unavailable) => {
                log::debug!("joint {id:?} waits for its bodies to enter the world");
                return;
            }
            (Endpoint::Static, Endpoint::Static) => {
                log::warn!("joint {id:?} ({}) connects two static bodies", kind.name());
                return;
            }
            (Endpoint::Dynamic(a), Endpoint::Dynamic(b)) => (Some(a), Some(b)),
            (Endpoint::Dynamic(a), Endpoint::Static) => (Some(a), None),
            (Endpoint::Static, Endpoint::Dynamic(b)) => (None, Some(b)),
        };
        // The kernel wants its first body dynamic; swap and mirror the frame.
        let reversed = first.is_none();
        let (kernel_first, kernel_second) = if reversed {
            (second, None)
        } else {
            (first, second)
        };

        let world = self.world;
        let mut scoped = Scoped::new(&mut self.kernel, |k| {
            k.joint_create(world, kernel_joint_type(&kind))
        });
        let handle = scoped.handle();
        let k = scoped.kernel();
        k.joint_attach(handle, kernel_first, kernel_second);
        match &kind {
            JointKind::Fixed => k.joint_set_fixed(handle),
            JointKind::Ball { anchor, .. } => k.joint_set_anchor(handle, *anchor),
            JointKind::Slider { .. } => {}
            JointKind::Hinge { anchor, .. }
            | JointKind::Hinge2 { anchor, .. }
            | JointKind::Universal { anchor, .. } => k.joint_set_anchor(handle, *anchor),
        }
        for (index, axis) in kind.axes().iter().enumerate() {
            k.joint_set_axis(handle, index, oriented_direction(axis, reversed));
        }
        push_all(k, handle, &kind, reversed);
        let handle = scoped.commit();

        if let Some(entry) = self.joints.get_mut(id) {
            entry.attached = Some(AttachedJoint {
                handle,
                reversed,
                feedback: None,
            });
        }
        for body in [body1, body2].into_iter().flatten() {
            if let Some(world) = self.bodies.get_mut(body).and_then(|e| e.world.as_mut()) {
                world.joints.push(id);
            }
        }
        log::debug!(
            "joint {id:?} ({}) attached{}",
            kind.name(),
            if reversed { ", reversed" } else { "" }
        );
    }

    /// Destroys the kernel joint and its feedback buffer. The engine joint is kept.
    pub(crate) fn detach_joint(&mut self, id: JointId) {
        let Some(entry) = self.joints.get_mut(id) else {
            return;
        };
        let Some(attached) = entry.attached.take() else {
            return;
        };
        for body in [entry.joint.body1, entry.joint.body2].into_iter().flatten() {
            if let Some(world) = self.bodies.get_mut(body).and_then(|e| e.world.as_mut()) {
                world.joints.retain(|j| *j != id);
            }
        }
        if let Some(feedback) = attached.feedback {
            self.kernel.joint_set_feedback(attached.handle, None);
            self.kernel.feedback_destroy(feedback);
        }
        self.kernel.joint_destroy(attached.handle);
        log::debug!("joint {id:?} detached");
    }

    /// Detaches joints flagged broken since the last step.
    pub(crate) fn sync_broken_joints(&mut self) {
        let broken: Vec<JointId> = self
            .joints
            .iter()
            .filter(|(_, e)| e.joint.broken && e.attached.is_some())
            .map(|(id, _)| id)
            .collect();
        for id in broken {
            self.sync_joint(id);
        }
    }

    /// Copies solved anchors and axes back into the engine joints.
    pub(crate) fn read_back_joints(&mut self) {
        let Self { kernel, joints, .. } = self;
        for (_, entry) in joints.iter_mut() {
            let Some(attached) = entry.attached else {
                continue;
            };
            let h = attached.handle;
            let (mut anchor1, mut anchor2) = (kernel.joint_anchor(h), kernel.joint_anchor2(h));
            if attached.reversed {
                std::mem::swap(&mut anchor1, &mut anchor2);
            }
            let mut axes = [Vec3::ZERO; 3];
            let sign = if attached.reversed { -1.0 } else { 1.0 };
            for (index, slot) in axes.iter_mut().enumerate().take(entry.joint.kind.axes().len()) {
                *slot = kernel.joint_axis(h, index) * sign;
            }
            entry.joint.readback = JointReadback {
                anchor1,
                anchor2,
                axes,
            };
        }
    }
}
