//! Software kernel used for tests, benchmarks and headless runs.
//!
//! Integrates with semi-implicit Euler and resolves primitive contacts by
//! impulse plus positional projection. Joint parameters are stored and
//! reported faithfully but joints do not constrain motion. Joint feedback
//! stays zero unless written through [`ReferenceKernel::write_feedback`].

pub(crate) mod geometry;

use std::collections::HashMap;

use glam::{Mat3, Quat, Vec3};

use self::geometry::{Pose, Solid};
use super::{
    AutoDisable, BodyHandle, ContactSettings, FeedbackHandle, GeomDesc, GeomHandle, JointFeedback,
    JointHandle, JointParam, JointType, Kernel, KernelMass, RawCollision, RawContact, SpaceHandle,
    TriMeshHandle, WorldHandle,
};
use crate::utils::allocator::{Arena, EntityId};
use crate::utils::math::angular_velocity_to_quat;

const PENETRATION_SLOP: f32 = 0.005;
const POSITION_CORRECTION: f32 = 0.8;

struct RefWorld {
    gravity: Vec3,
}

#[derive(Default)]
struct RefSpace {
    geoms: Vec<GeomHandle>,
}

struct RefBody {
    world: WorldHandle,
    position: Vec3,
    rotation: Quat,
    linear: Vec3,
    angular: Vec3,
    mass: f32,
    center: Vec3,
    inertia: Mat3,
    gravity: bool,
    enabled: bool,
    auto_disable: AutoDisable,
    idle_steps: u32,
    idle_time: f32,
    force: Vec3,
    torque: Vec3,
}

impl RefBody {
    fn new(world: WorldHandle) -> Self {
        Self {
            world,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            linear: Vec3::ZERO,
            angular: Vec3::ZERO,
            mass: 1.0,
            center: Vec3::ZERO,
            inertia: Mat3::IDENTITY,
            gravity: true,
            enabled: true,
            auto_disable: AutoDisable::default(),
            idle_steps: 0,
            idle_time: 0.0,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
        }
    }

    fn inverse_mass(&self) -> f32 {
        if self.enabled && self.mass > 0.0 {
            1.0 / self.mass
        } else {
            0.0
        }
    }

    fn world_inverse_inertia(&self) -> Mat3 {
        if self.inertia.determinant().abs() < 1e-12 {
            return Mat3::ZERO;
        }
        let rotation = Mat3::from_quat(self.rotation);
        rotation * self.inertia.inverse() * rotation.transpose()
    }

    fn wake(&mut self) {
        self.enabled = true;
        self.idle_steps = 0;
        self.idle_time = 0.0;
    }
}

enum RefShape {
    Primitive(GeomDesc),
    Transform { inner: GeomHandle },
    Ray { origin: Vec3, direction: Vec3, length: f32 },
}

struct RefGeom {
    shape: RefShape,
    space: Option<SpaceHandle>,
    body: Option<BodyHandle>,
    /// Set on geometry wrapped by a transform geometry.
    parent: Option<GeomHandle>,
    position: Vec3,
    rotation: Quat,
    category: u32,
    collide: u32,
    user_data: Option<u32>,
    friction: f32,
    restitution: f32,
}

struct RefTriMesh {
    vertices: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
}

struct RefJoint {
    kind: JointType,
    bodies: [Option<BodyHandle>; 2],
    /// Anchor in the frame of each body (world frame for a missing body).
    anchors: [Vec3; 2],
    /// Axes in the frame of the body that owns them.
    axes: [Vec3; 3],
    params: HashMap<(usize, JointParam), f32>,
    feedback: Option<FeedbackHandle>,
}

impl RefJoint {
    /// Second axes of hinge-2 and universal joints ride on body 2.
    fn axis_owner(&self, axis: usize) -> usize {
        match (self.kind, axis) {
            (JointType::Hinge2 | JointType::Universal, 1) => 1,
            _ => 0,
        }
    }

    fn param(&self, axis: usize, param: JointParam) -> f32 {
        self.params
            .get(&(axis, param))
            .copied()
            .unwrap_or(match param {
                JointParam::LoStop => f32::NEG_INFINITY,
                JointParam::HiStop => f32::INFINITY,
                _ => 0.0,
            })
    }
}

#[derive(Clone, Copy)]
struct RefContact {
    body1: Option<BodyHandle>,
    body2: Option<BodyHandle>,
    normal: Vec3,
    depth: f32,
    friction: f32,
    restitution: f32,
}

/// In-process [`Kernel`] implementation.
#[derive(Default)]
pub struct ReferenceKernel {
    worlds: Arena<RefWorld>,
    spaces: Arena<RefSpace>,
    bodies: Arena<RefBody>,
    geoms: Arena<RefGeom>,
    joints: Arena<RefJoint>,
    feedback: Arena<JointFeedback>,
    meshes: Arena<RefTriMesh>,
    contact_group: Vec<RefContact>,
}

fn id(raw: u64) -> EntityId {
    EntityId::from_bits(raw)
}

impl ReferenceKernel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the feedback a joint reports, standing in for solver output.
    pub fn write_feedback(&mut self, feedback: FeedbackHandle, value: JointFeedback) {
        if let Some(slot) = self.feedback.get_mut(id(feedback.0)) {
            *slot = value;
        }
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn geom_count(&self) -> usize {
        self.geoms.len()
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn feedback_count(&self) -> usize {
        self.feedback.len()
    }

    pub fn trimesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn space_geom_count(&self, space: SpaceHandle) -> usize {
        self.spaces
            .get(id(space.0))
            .map_or(0, |space| space.geoms.len())
    }

    fn body(&self, body: BodyHandle) -> Option<&RefBody> {
        self.bodies.get(id(body.0))
    }

    fn body_mut(&mut self, body: BodyHandle) -> Option<&mut RefBody> {
        let found = self.bodies.get_mut(id(body.0));
        if found.is_none() {
            log::error!("reference kernel: stale body handle {:#x}", body.0);
        }
        found
    }

    fn geom_mut(&mut self, geom: GeomHandle) -> Option<&mut RefGeom> {
        let found = self.geoms.get_mut(id(geom.0));
        if found.is_none() {
            log::error!("reference kernel: stale geom handle {:#x}", geom.0);
        }
        found
    }

    fn joint_mut(&mut self, joint: JointHandle) -> Option<&mut RefJoint> {
        let found = self.joints.get_mut(id(joint.0));
        if found.is_none() {
            log::error!("reference kernel: stale joint handle {:#x}", joint.0);
        }
        found
    }

    fn body_pose(&self, body: Option<BodyHandle>) -> Pose {
        body.and_then(|b| self.body(b))
            .map_or(Pose::IDENTITY, |b| Pose::new(b.position, b.rotation))
    }

    fn geom_pose(&self, geom: &RefGeom) -> Pose {
        match geom.body.and_then(|b| self.body(b)) {
            Some(body) => Pose::new(body.position, body.rotation),
            None => Pose::new(geom.position, geom.rotation),
        }
    }

    fn solid(&self, handle: GeomHandle) -> Option<Solid> {
        let geom = self.geoms.get(id(handle.0))?;
        let pose = self.geom_pose(geom);
        match &geom.shape {
            RefShape::Primitive(desc) => self.primitive_solid(desc, pose),
            RefShape::Transform { inner } => {
                let inner = self.geoms.get(id(inner.0))?;
                let local = Pose::new(inner.position, inner.rotation);
                match &inner.shape {
                    RefShape::Primitive(desc) => self.primitive_solid(desc, pose.compose(&local)),
                    _ => None,
                }
            }
            RefShape::Ray { .. } => None,
        }
    }

    fn primitive_solid(&self, desc: &GeomDesc, pose: Pose) -> Option<Solid> {
        let solid = match *desc {
            GeomDesc::Box { half_extents } => Solid::Box { pose, half_extents },
            GeomDesc::Sphere { radius } => Solid::Sphere {
                center: pose.position,
                radius,
            },
            GeomDesc::Capsule { radius, length } => {
                let axis = pose.rotation * Vec3::Z * (length * 0.5);
                Solid::Capsule {
                    a: pose.position - axis,
                    b: pose.position + axis,
                    radius,
                }
            }
            GeomDesc::Cylinder { radius, length } => Solid::Cylinder {
                pose,
                radius,
                half_length: length * 0.5,
            },
            // Planes are not placeable.
            GeomDesc::Plane { normal, offset } => Solid::Plane { normal, offset },
            GeomDesc::TriMesh { data } => {
                let mesh = self.meshes.get(id(data.0))?;
                Solid::Mesh {
                    vertices: mesh
                        .vertices
                        .iter()
                        .map(|v| pose.transform_point(*v))
                        .collect(),
                    triangles: mesh.triangles.clone(),
                }
            }
            GeomDesc::Ray { .. } => return None,
        };
        Some(solid)
    }

    fn is_active(&self, body: Option<BodyHandle>) -> bool {
        body.and_then(|b| self.body(b)).is_some_and(|b| b.enabled)
    }

    fn space_members(&self, space: SpaceHandle) -> Vec<GeomHandle> {
        self.spaces
            .get(id(space.0))
            .map(|space| space.geoms.clone())
            .unwrap_or_default()
    }

    fn detach_from_space(&mut self, geom: GeomHandle) {
        let space = self.geoms.get(id(geom.0)).and_then(|g| g.space);
        if let Some(space) = space.and_then(|s| self.spaces.get_mut(id(s.0))) {
            space.geoms.retain(|g| *g != geom);
        }
    }

    fn resolve_contact(&mut self, contact: &RefContact) {
        let state = |kernel: &Self, body: Option<BodyHandle>| -> (Vec3, f32) {
            body.and_then(|b| kernel.body(b))
                .map_or((Vec3::ZERO, 0.0), |b| (b.linear, b.inverse_mass()))
        };
        let (v1, inv1) = state(self, contact.body1);
        let (v2, inv2) = state(self, contact.body2);
        let inverse_sum = inv1 + inv2;
        if inverse_sum <= 0.0 {
            return;
        }

        let relative = v1 - v2;
        let approach = relative.dot(contact.normal);
        if approach >= 0.0 {
            return;
        }

        let impulse = -(1.0 + contact.restitution) * approach / inverse_sum;
        let mut delta = contact.normal * impulse;

        let tangent = relative - contact.normal * approach;
        let slide = tangent.length();
        if slide > 1e-6 {
            let friction = (slide / inverse_sum).min(contact.friction * impulse);
            delta -= tangent / slide * friction;
        }

        if let Some(body) = contact.body1.and_then(|b| self.bodies.get_mut(id(b.0))) {
            body.linear += delta * inv1;
        }
        if let Some(body) = contact.body2.and_then(|b| self.bodies.get_mut(id(b.0))) {
            body.linear -= delta * inv2;
        }
    }

    fn correct_position(&mut self, contact: &RefContact) {
        let inverse_mass = |kernel: &Self, body: Option<BodyHandle>| {
            body.and_then(|b| kernel.body(b))
                .map_or(0.0, |b| b.inverse_mass())
        };
        let inv1 = inverse_mass(self, contact.body1);
        let inv2 = inverse_mass(self, contact.body2);
        let inverse_sum = inv1 + inv2;
        let excess = contact.depth - PENETRATION_SLOP;
        if inverse_sum <= 0.0 || excess <= 0.0 {
            return;
        }

        let correction = contact.normal * (excess * POSITION_CORRECTION / inverse_sum);
        if let Some(body) = contact.body1.and_then(|b| self.bodies.get_mut(id(b.0))) {
            body.position += correction * inv1;
        }
        if let Some(body) = contact.body2.and_then(|b| self.bodies.get_mut(id(b.0))) {
            body.position -= correction * inv2;
        }
    }
}

impl Kernel for ReferenceKernel {
    fn name(&self) -> &str {
        "reference"
    }

    fn world_create(&mut self) -> WorldHandle {
        WorldHandle(
            self.worlds
                .insert(RefWorld {
                    gravity: Vec3::ZERO,
                })
                .to_bits(),
        )
    }

    fn world_destroy(&mut self, world: WorldHandle) {
        self.worlds.remove(id(world.0));
    }

    fn world_set_gravity(&mut self, world: WorldHandle, gravity: Vec3) {
        if let Some(world) = self.worlds.get_mut(id(world.0)) {
            world.gravity = gravity;
        }
    }

    fn space_create(&mut self) -> SpaceHandle {
        SpaceHandle(self.spaces.insert(RefSpace::default()).to_bits())
    }

    fn space_destroy(&mut self, space: SpaceHandle) {
        if let Some(removed) = self.spaces.remove(id(space.0)) {
            for geom in removed.geoms {
                if let Some(geom) = self.geoms.get_mut(id(geom.0)) {
                    geom.space = None;
                }
            }
        }
    }

    fn body_create(&mut self, world: WorldHandle) -> BodyHandle {
        BodyHandle(self.bodies.insert(RefBody::new(world)).to_bits())
    }

    fn body_destroy(&mut self, body: BodyHandle) {
        if self.bodies.remove(id(body.0)).is_none() {
            log::error!("reference kernel: double destroy of body {:#x}", body.0);
            return;
        }
        for (_, geom) in self.geoms.iter_mut() {
            if geom.body == Some(body) {
                geom.body = None;
            }
        }
        for (_, joint) in self.joints.iter_mut() {
            for slot in joint.bodies.iter_mut() {
                if *slot == Some(body) {
                    *slot = None;
                }
            }
        }
    }

    fn body_set_position(&mut self, body: BodyHandle, position: Vec3) {
        if let Some(body) = self.body_mut(body) {
            body.position = position;
        }
    }

    fn body_set_rotation(&mut self, body: BodyHandle, rotation: Quat) {
        if let Some(body) = self.body_mut(body) {
            body.rotation = rotation;
        }
    }

    fn body_set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec3) {
        if let Some(body) = self.body_mut(body) {
            body.linear = velocity;
        }
    }

    fn body_set_angular_velocity(&mut self, body: BodyHandle, velocity: Vec3) {
        if let Some(body) = self.body_mut(body) {
            body.angular = velocity;
        }
    }

    fn body_position(&self, body: BodyHandle) -> Vec3 {
        self.body(body).map_or(Vec3::ZERO, |b| b.position)
    }

    fn body_rotation(&self, body: BodyHandle) -> Quat {
        self.body(body).map_or(Quat::IDENTITY, |b| b.rotation)
    }

    fn body_linear_velocity(&self, body: BodyHandle) -> Vec3 {
        self.body(body).map_or(Vec3::ZERO, |b| b.linear)
    }

    fn body_angular_velocity(&self, body: BodyHandle) -> Vec3 {
        self.body(body).map_or(Vec3::ZERO, |b| b.angular)
    }

    fn body_set_mass(&mut self, body: BodyHandle, mass: KernelMass) {
        if let Some(body) = self.body_mut(body) {
            body.mass = mass.mass;
            body.center = mass.center;
            body.inertia = mass.inertia;
        }
    }

    fn body_set_gravity_mode(&mut self, body: BodyHandle, enabled: bool) {
        if let Some(body) = self.body_mut(body) {
            body.gravity = enabled;
        }
    }

    fn body_set_enabled(&mut self, body: BodyHandle, enabled: bool) {
        if let Some(body) = self.body_mut(body) {
            if enabled {
                body.wake();
            } else {
                body.enabled = false;
            }
        }
    }

    fn body_is_enabled(&self, body: BodyHandle) -> bool {
        self.body(body).is_some_and(|b| b.enabled)
    }

    fn body_set_auto_disable(&mut self, body: BodyHandle, settings: AutoDisable) {
        if let Some(body) = self.body_mut(body) {
            body.auto_disable = settings;
            body.idle_steps = 0;
            body.idle_time = 0.0;
        }
    }

    fn body_add_force(&mut self, body: BodyHandle, force: Vec3) {
        if let Some(body) = self.body_mut(body) {
            body.force += force;
        }
    }

    fn body_add_relative_torque(&mut self, body: BodyHandle, torque: Vec3) {
        if let Some(body) = self.body_mut(body) {
            body.torque += torque;
        }
    }

    fn geom_create(&mut self, space: Option<SpaceHandle>, desc: &GeomDesc) -> GeomHandle {
        let shape = match *desc {
            GeomDesc::Ray { length } => RefShape::Ray {
                origin: Vec3::ZERO,
                direction: Vec3::Z,
                length,
            },
            other => RefShape::Primitive(other),
        };
        let handle = GeomHandle(
            self.geoms
                .insert(RefGeom {
                    shape,
                    space,
                    body: None,
                    parent: None,
                    position: Vec3::ZERO,
                    rotation: Quat::IDENTITY,
                    category: u32::MAX,
                    collide: u32::MAX,
                    user_data: None,
                    friction: 0.5,
                    restitution: 0.0,
                })
                .to_bits(),
        );
        if let Some(space) = space.and_then(|s| self.spaces.get_mut(id(s.0))) {
            space.geoms.push(handle);
        }
        handle
    }

    fn geom_create_transform(
        &mut self,
        space: Option<SpaceHandle>,
        inner: GeomHandle,
    ) -> GeomHandle {
        self.detach_from_space(inner);
        let outer = self.geom_create(space, &GeomDesc::Sphere { radius: 0.0 });
        if let Some(geom) = self.geoms.get_mut(id(outer.0)) {
            geom.shape = RefShape::Transform { inner };
        }
        if let Some(geom) = self.geom_mut(inner) {
            geom.space = None;
            geom.parent = Some(outer);
        }
        outer
    }

    fn geom_destroy(&mut self, geom: GeomHandle) {
        self.detach_from_space(geom);
        let Some(removed) = self.geoms.remove(id(geom.0)) else {
            log::error!("reference kernel: double destroy of geom {:#x}", geom.0);
            return;
        };
        // The wrapped geometry stays alive and is destroyed by its owner.
        if let RefShape::Transform { inner } = removed.shape {
            if let Some(inner) = self.geoms.get_mut(id(inner.0)) {
                inner.parent = None;
            }
        }
        if let Some(parent) = removed.parent.and_then(|p| self.geoms.get_mut(id(p.0))) {
            log::warn!("reference kernel: destroying geom still wrapped by a transform");
            parent.shape = RefShape::Primitive(GeomDesc::Sphere { radius: 0.0 });
        }
    }

    fn geom_set_body(&mut self, geom: GeomHandle, body: Option<BodyHandle>) {
        if let Some(geom) = self.geom_mut(geom) {
            geom.body = body;
        }
    }

    fn geom_set_position(&mut self, geom: GeomHandle, position: Vec3) {
        if let Some(geom) = self.geom_mut(geom) {
            geom.position = position;
        }
    }

    fn geom_set_rotation(&mut self, geom: GeomHandle, rotation: Quat) {
        if let Some(geom) = self.geom_mut(geom) {
            geom.rotation = rotation;
        }
    }

    fn geom_set_filter(&mut self, geom: GeomHandle, category: u32, collide: u32) {
        if let Some(geom) = self.geom_mut(geom) {
            geom.category = category;
            geom.collide = collide;
        }
    }

    fn geom_set_user_data(&mut self, geom: GeomHandle, data: u32) {
        if let Some(geom) = self.geom_mut(geom) {
            geom.user_data = Some(data);
        }
    }

    fn geom_user_data(&self, geom: GeomHandle) -> Option<u32> {
        self.geoms.get(id(geom.0)).and_then(|g| g.user_data)
    }

    fn geom_set_surface(&mut self, geom: GeomHandle, friction: f32, restitution: f32) {
        if let Some(geom) = self.geom_mut(geom) {
            geom.friction = friction;
            geom.restitution = restitution;
        }
    }

    fn geom_ray_set(&mut self, ray: GeomHandle, origin: Vec3, direction: Vec3, length: f32) {
        if let Some(geom) = self.geom_mut(ray) {
            geom.shape = RefShape::Ray {
                origin,
                direction: direction.normalize_or_zero(),
                length,
            };
        }
    }

    fn trimesh_create(&mut self, vertices: &[Vec3], triangles: &[[u32; 3]]) -> TriMeshHandle {
        TriMeshHandle(
            self.meshes
                .insert(RefTriMesh {
                    vertices: vertices.to_vec(),
                    triangles: triangles.to_vec(),
                })
                .to_bits(),
        )
    }

    fn trimesh_destroy(&mut self, data: TriMeshHandle) {
        if self.meshes.remove(id(data.0)).is_none() {
            log::error!("reference kernel: double destroy of trimesh {:#x}", data.0);
        }
    }

    fn joint_create(&mut self, _world: WorldHandle, kind: JointType) -> JointHandle {
        JointHandle(
            self.joints
                .insert(RefJoint {
                    kind,
                    bodies: [None, None],
                    anchors: [Vec3::ZERO; 2],
                    axes: [Vec3::X, Vec3::Y, Vec3::Z],
                    params: HashMap::new(),
                    feedback: None,
                })
                .to_bits(),
        )
    }

    fn joint_destroy(&mut self, joint: JointHandle) {
        if self.joints.remove(id(joint.0)).is_none() {
            log::error!("reference kernel: double destroy of joint {:#x}", joint.0);
        }
    }

    fn joint_attach(
        &mut self,
        joint: JointHandle,
        body1: Option<BodyHandle>,
        body2: Option<BodyHandle>,
    ) {
        if let Some(joint) = self.joint_mut(joint) {
            joint.bodies = [body1, body2];
        }
    }

    fn joint_set_fixed(&mut self, joint: JointHandle) {
        let Some(bodies) = self.joints.get(id(joint.0)).map(|j| j.bodies) else {
            return;
        };
        // Anchor at body 1's origin so both anchors coincide at rest.
        let anchor = self.body_pose(bodies[0]).position;
        self.joint_set_anchor(joint, anchor);
    }

    fn joint_set_anchor(&mut self, joint: JointHandle, anchor: Vec3) {
        let Some(bodies) = self.joints.get(id(joint.0)).map(|j| j.bodies) else {
            return;
        };
        let locals = [
            self.body_pose(bodies[0]).inverse_transform_point(anchor),
            self.body_pose(bodies[1]).inverse_transform_point(anchor),
        ];
        if let Some(joint) = self.joint_mut(joint) {
            joint.anchors = locals;
        }
    }

    fn joint_set_axis(&mut self, joint: JointHandle, axis: usize, direction: Vec3) {
        let Some(body) = self
            .joints
            .get(id(joint.0))
            .map(|j| j.bodies[j.axis_owner(axis)])
        else {
            return;
        };
        let local = self.body_pose(body).rotation.conjugate() * direction.normalize_or_zero();
        if let Some(joint) = self.joint_mut(joint) {
            if let Some(slot) = joint.axes.get_mut(axis) {
                *slot = local;
            }
        }
    }

    fn joint_set_param(&mut self, joint: JointHandle, axis: usize, param: JointParam, value: f32) {
        let Some(joint) = self.joint_mut(joint) else {
            return;
        };
        // A stop that would cross the opposite stop is rejected, as native
        // kernels do; callers write both stops twice to retune safely.
        let rejected = match param {
            JointParam::LoStop => value > joint.param(axis, JointParam::HiStop),
            JointParam::HiStop => value < joint.param(axis, JointParam::LoStop),
            _ => false,
        };
        if rejected {
            log::trace!("reference kernel: {param:?} {value} on axis {axis} crosses the opposite stop");
            return;
        }
        joint.params.insert((axis, param), value);
    }

    fn joint_param(&self, joint: JointHandle, axis: usize, param: JointParam) -> f32 {
        self.joints
            .get(id(joint.0))
            .map_or(0.0, |j| j.param(axis, param))
    }

    fn joint_anchor(&self, joint: JointHandle) -> Vec3 {
        self.joints.get(id(joint.0)).map_or(Vec3::ZERO, |j| {
            self.body_pose(j.bodies[0]).transform_point(j.anchors[0])
        })
    }

    fn joint_anchor2(&self, joint: JointHandle) -> Vec3 {
        self.joints.get(id(joint.0)).map_or(Vec3::ZERO, |j| {
            self.body_pose(j.bodies[1]).transform_point(j.anchors[1])
        })
    }

    fn joint_axis(&self, joint: JointHandle, axis: usize) -> Vec3 {
        self.joints.get(id(joint.0)).map_or(Vec3::ZERO, |j| {
            let local = j.axes.get(axis).copied().unwrap_or(Vec3::ZERO);
            self.body_pose(j.bodies[j.axis_owner(axis)]).rotation * local
        })
    }

    fn joint_axis_rate(&self, joint: JointHandle, axis: usize) -> Option<f32> {
        let j = self.joints.get(id(joint.0))?;
        let velocities = |body: Option<BodyHandle>| -> (Vec3, Vec3) {
            body.and_then(|b| self.body(b))
                .map_or((Vec3::ZERO, Vec3::ZERO), |b| (b.linear, b.angular))
        };
        let (v1, w1) = velocities(j.bodies[0]);
        let (v2, w2) = velocities(j.bodies[1]);
        let direction = self.joint_axis(joint, axis);

        match (j.kind, axis) {
            (JointType::Hinge, 0) | (JointType::Hinge2, 0 | 1) => Some((w1 - w2).dot(direction)),
            (JointType::Slider, 0) => Some((v1 - v2).dot(direction)),
            _ => None,
        }
    }

    fn feedback_create(&mut self) -> FeedbackHandle {
        FeedbackHandle(self.feedback.insert(JointFeedback::default()).to_bits())
    }

    fn feedback_destroy(&mut self, feedback: FeedbackHandle) {
        if self.feedback.remove(id(feedback.0)).is_none() {
            log::error!("reference kernel: double destroy of feedback {:#x}", feedback.0);
        }
        for (_, joint) in self.joints.iter_mut() {
            if joint.feedback == Some(feedback) {
                joint.feedback = None;
            }
        }
    }

    fn joint_set_feedback(&mut self, joint: JointHandle, feedback: Option<FeedbackHandle>) {
        if let Some(joint) = self.joint_mut(joint) {
            joint.feedback = feedback;
        }
    }

    fn feedback_read(&self, feedback: FeedbackHandle) -> JointFeedback {
        self.feedback
            .get(id(feedback.0))
            .copied()
            .unwrap_or_default()
    }

    fn collide(
        &mut self,
        world: WorldHandle,
        space: SpaceHandle,
        settings: &ContactSettings,
    ) -> Vec<RawCollision> {
        if settings.max_contacts == 0 {
            return Vec::new();
        }

        let candidates: Vec<_> = self
            .space_members(space)
            .into_iter()
            .filter_map(|handle| {
                let geom = self.geoms.get(id(handle.0))?;
                let body = geom.body;
                if body
                    .and_then(|b| self.body(b))
                    .is_some_and(|b| b.world != world)
                {
                    return None;
                }
                let solid = self.solid(handle)?;
                Some((
                    handle,
                    body,
                    solid,
                    geom.category,
                    geom.collide,
                    geom.friction,
                    geom.restitution,
                ))
            })
            .collect();

        let mut collisions = Vec::new();
        let mut woken = Vec::new();
        for (i, a) in candidates.iter().enumerate() {
            for b in &candidates[i + 1..] {
                if a.1.is_some() && a.1 == b.1 {
                    continue;
                }
                let (active_a, active_b) = (self.is_active(a.1), self.is_active(b.1));
                if !active_a && !active_b {
                    continue;
                }
                if a.3 & b.4 == 0 && b.3 & a.4 == 0 {
                    continue;
                }
                let Some(hit) = geometry::contact(&a.2, &b.2) else {
                    continue;
                };

                collisions.push(RawCollision {
                    geom1: a.0,
                    geom2: b.0,
                    position: hit.position,
                    normal: hit.normal,
                    depth: hit.depth,
                });
                self.contact_group.push(RefContact {
                    body1: a.1,
                    body2: b.1,
                    normal: hit.normal,
                    depth: hit.depth,
                    friction: (a.5 * b.5).sqrt(),
                    restitution: a.6.max(b.6),
                });
                // Only a moving body wakes a sleeping one.
                if active_a {
                    woken.extend(b.1);
                }
                if active_b {
                    woken.extend(a.1);
                }
            }
        }

        for body in woken {
            if let Some(body) = self.bodies.get_mut(id(body.0)) {
                if !body.enabled {
                    body.wake();
                }
            }
        }

        collisions
    }

    fn world_step(&mut self, world: WorldHandle, step_size: f32, iterations: u32) {
        let gravity = self
            .worlds
            .get(id(world.0))
            .map_or(Vec3::ZERO, |w| w.gravity);

        for (_, body) in self.bodies.iter_mut() {
            if body.world != world || !body.enabled {
                continue;
            }
            let inverse_mass = body.inverse_mass();
            if body.gravity {
                body.linear += gravity * step_size;
            }
            body.linear += body.force * inverse_mass * step_size;
            let torque = body.rotation * body.torque;
            body.angular += body.world_inverse_inertia() * torque * step_size;
        }

        let contacts = self.contact_group.clone();
        for _ in 0..iterations.max(1) {
            for contact in &contacts {
                self.resolve_contact(contact);
            }
        }

        for (_, body) in self.bodies.iter_mut() {
            if body.world != world || !body.enabled {
                continue;
            }
            // Rotate about the centre of mass, not the body origin.
            let center = body.position + body.rotation * body.center + body.linear * step_size;
            body.rotation =
                (angular_velocity_to_quat(body.angular, step_size) * body.rotation).normalize();
            body.position = center - body.rotation * body.center;
        }

        for contact in &contacts {
            self.correct_position(contact);
        }

        for (_, body) in self.bodies.iter_mut() {
            if body.world != world {
                continue;
            }
            body.force = Vec3::ZERO;
            body.torque = Vec3::ZERO;

            let settings = body.auto_disable;
            if !body.enabled || !settings.enabled {
                continue;
            }
            let idle = body.linear.length() < settings.linear_threshold
                && body.angular.length() < settings.angular_threshold;
            if idle {
                body.idle_steps += 1;
                body.idle_time += step_size;
                if body.idle_steps >= settings.steps && body.idle_time >= settings.time {
                    body.enabled = false;
                    body.linear = Vec3::ZERO;
                    body.angular = Vec3::ZERO;
                }
            } else {
                body.idle_steps = 0;
                body.idle_time = 0.0;
            }
        }
    }

    fn contact_group_clear(&mut self) {
        self.contact_group.clear();
    }

    fn collide_with_space(
        &mut self,
        query: GeomHandle,
        space: SpaceHandle,
        mask: u32,
        max_contacts: usize,
    ) -> Vec<RawContact> {
        let Some(query_geom) = self.geoms.get(id(query.0)) else {
            return Vec::new();
        };
        let ray = match query_geom.shape {
            RefShape::Ray {
                origin,
                direction,
                length,
            } => Some((origin, direction, length)),
            _ => None,
        };
        let query_solid = if ray.is_none() {
            match self.solid(query) {
                Some(solid) => Some(solid),
                None => return Vec::new(),
            }
        } else {
            None
        };

        let mut contacts = Vec::new();
        for member in self.space_members(space) {
            if member == query {
                continue;
            }
            let Some(geom) = self.geoms.get(id(member.0)) else {
                continue;
            };
            if geom.category & mask == 0 {
                continue;
            }
            let Some(solid) = self.solid(member) else {
                continue;
            };

            if let Some((origin, direction, length)) = ray {
                if let Some(hit) = geometry::ray_cast(&solid, origin, direction, length) {
                    contacts.push(RawContact {
                        geom: member,
                        position: hit.position,
                        normal: hit.normal,
                        depth: hit.distance,
                        triangle: hit.triangle,
                    });
                }
            } else if let Some(query_solid) = &query_solid {
                if let Some(hit) = geometry::contact(query_solid, &solid) {
                    contacts.push(RawContact {
                        geom: member,
                        position: hit.position,
                        normal: hit.normal,
                        depth: hit.depth,
                        triangle: None,
                    });
                }
            }
        }

        if ray.is_some() {
            contacts.sort_by(|a, b| a.depth.total_cmp(&b.depth));
        }
        contacts.truncate(max_contacts.max(1));
        contacts
    }
}
