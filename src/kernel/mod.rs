//! Call surface of the native simulation kernel.
//!
//! Everything the integration layer needs from a constraint-solving kernel goes
//! through [`Kernel`]. Handles are opaque `Copy` values; pairing every create
//! with its destroy is the caller's job (see [`scoped`]).

pub mod reference;
pub mod scoped;

use glam::{Mat3, Quat, Vec3};

pub use reference::ReferenceKernel;
pub use scoped::{KernelResource, Scoped};

macro_rules! kernel_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub u64);

        impl $name {
            pub fn raw(self) -> u64 {
                self.0
            }
        }
    };
}

kernel_handle!(
    /// Simulation world: bodies, joints, gravity.
    WorldHandle
);
kernel_handle!(
    /// Broad-phase space holding collidable geometry.
    SpaceHandle
);
kernel_handle!(
    /// Dynamic rigid body.
    BodyHandle
);
kernel_handle!(
    /// Collision geometry, including rays and offset wrappers.
    GeomHandle
);
kernel_handle!(
    /// Joint constraint between two bodies (or a body and the environment).
    JointHandle
);
kernel_handle!(
    /// Buffer the kernel fills with the forces a joint applied last step.
    FeedbackHandle
);
kernel_handle!(
    /// Cooked triangle-mesh data shared by mesh geometries.
    TriMeshHandle
);

/// Geometry primitive understood by the kernel.
///
/// Capsules and cylinders are aligned with their local Z axis; `length` is the
/// length of the cylindrical section.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeomDesc {
    Box { half_extents: Vec3 },
    Sphere { radius: f32 },
    Capsule { radius: f32, length: f32 },
    Cylinder { radius: f32, length: f32 },
    /// Solid half-space `normal · x <= offset`.
    Plane { normal: Vec3, offset: f32 },
    Ray { length: f32 },
    TriMesh { data: TriMeshHandle },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointType {
    Fixed,
    Ball,
    Hinge,
    Hinge2,
    Slider,
    Universal,
}

/// Per-axis joint parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JointParam {
    LoStop,
    HiStop,
    Vel,
    FMax,
    StopErp,
    StopCfm,
    Bounce,
    SuspensionErp,
    SuspensionCfm,
}

/// Body mass with its inertia tensor taken about `center`.
///
/// `center` is the centre of mass in body-local coordinates. The body rotates
/// about it and its linear velocity is the velocity of that point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KernelMass {
    pub mass: f32,
    pub center: Vec3,
    pub inertia: Mat3,
}

/// Automatic deactivation thresholds for a body.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AutoDisable {
    pub enabled: bool,
    pub linear_threshold: f32,
    pub angular_threshold: f32,
    pub steps: u32,
    pub time: f32,
}

impl Default for AutoDisable {
    fn default() -> Self {
        Self {
            enabled: false,
            linear_threshold: 0.0,
            angular_threshold: 0.0,
            steps: 0,
            time: 0.0,
        }
    }
}

/// Forces and torques a joint applied to each body during the last step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct JointFeedback {
    pub force1: Vec3,
    pub torque1: Vec3,
    pub force2: Vec3,
    pub torque2: Vec3,
}

/// One colliding geometry pair found while advancing the world.
///
/// `normal` points from `geom2` into `geom1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawCollision {
    pub geom1: GeomHandle,
    pub geom2: GeomHandle,
    pub position: Vec3,
    pub normal: Vec3,
    pub depth: f32,
}

/// Contact between a query geometry and a geometry of a space.
///
/// For ray queries `depth` is the distance along the ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawContact {
    pub geom: GeomHandle,
    pub position: Vec3,
    pub normal: Vec3,
    pub depth: f32,
    pub triangle: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactSettings {
    pub max_contacts: usize,
}

/// Native constraint-solver kernel.
pub trait Kernel {
    fn name(&self) -> &str;

    fn world_create(&mut self) -> WorldHandle;
    fn world_destroy(&mut self, world: WorldHandle);
    fn world_set_gravity(&mut self, world: WorldHandle, gravity: Vec3);
    fn space_create(&mut self) -> SpaceHandle;
    fn space_destroy(&mut self, space: SpaceHandle);

    fn body_create(&mut self, world: WorldHandle) -> BodyHandle;
    fn body_destroy(&mut self, body: BodyHandle);
    fn body_set_position(&mut self, body: BodyHandle, position: Vec3);
    fn body_set_rotation(&mut self, body: BodyHandle, rotation: Quat);
    fn body_set_linear_velocity(&mut self, body: BodyHandle, velocity: Vec3);
    fn body_set_angular_velocity(&mut self, body: BodyHandle, velocity: Vec3);
    fn body_position(&self, body: BodyHandle) -> Vec3;
    fn body_rotation(&self, body: BodyHandle) -> Quat;
    /// Velocity of the centre of mass.
    fn body_linear_velocity(&self, body: BodyHandle) -> Vec3;
    fn body_angular_velocity(&self, body: BodyHandle) -> Vec3;
    fn body_set_mass(&mut self, body: BodyHandle, mass: KernelMass);
    fn body_set_gravity_mode(&mut self, body: BodyHandle, enabled: bool);
    fn body_set_enabled(&mut self, body: BodyHandle, enabled: bool);
    fn body_is_enabled(&self, body: BodyHandle) -> bool;
    fn body_set_auto_disable(&mut self, body: BodyHandle, settings: AutoDisable);
    /// Adds a world-space force at the centre of mass.
    fn body_add_force(&mut self, body: BodyHandle, force: Vec3);
    /// Adds a torque expressed in the body frame.
    fn body_add_relative_torque(&mut self, body: BodyHandle, torque: Vec3);

    fn geom_create(&mut self, space: Option<SpaceHandle>, desc: &GeomDesc) -> GeomHandle;
    /// Wraps `inner` so its position and rotation become relative to the wrapper.
    fn geom_create_transform(&mut self, space: Option<SpaceHandle>, inner: GeomHandle)
        -> GeomHandle;
    fn geom_destroy(&mut self, geom: GeomHandle);
    fn geom_set_body(&mut self, geom: GeomHandle, body: Option<BodyHandle>);
    fn geom_set_position(&mut self, geom: GeomHandle, position: Vec3);
    fn geom_set_rotation(&mut self, geom: GeomHandle, rotation: Quat);
    fn geom_set_filter(&mut self, geom: GeomHandle, category: u32, collide: u32);
    fn geom_set_user_data(&mut self, geom: GeomHandle, data: u32);
    fn geom_user_data(&self, geom: GeomHandle) -> Option<u32>;
    fn geom_set_surface(&mut self, geom: GeomHandle, friction: f32, restitution: f32);
    fn geom_ray_set(&mut self, ray: GeomHandle, origin: Vec3, direction: Vec3, length: f32);
    fn trimesh_create(&mut self, vertices: &[Vec3], triangles: &[[u32; 3]]) -> TriMeshHandle;
    fn trimesh_destroy(&mut self, data: TriMeshHandle);

    fn joint_create(&mut self, world: WorldHandle, kind: JointType) -> JointHandle;
    fn joint_destroy(&mut self, joint: JointHandle);
    fn joint_attach(
        &mut self,
        joint: JointHandle,
        body1: Option<BodyHandle>,
        body2: Option<BodyHandle>,
    );
    /// Freezes the current relative transform of a fixed joint.
    fn joint_set_fixed(&mut self, joint: JointHandle);
    fn joint_set_anchor(&mut self, joint: JointHandle, anchor: Vec3);
    fn joint_set_axis(&mut self, joint: JointHandle, axis: usize, direction: Vec3);
    fn joint_set_param(&mut self, joint: JointHandle, axis: usize, param: JointParam, value: f32);
    fn joint_param(&self, joint: JointHandle, axis: usize, param: JointParam) -> f32;
    fn joint_anchor(&self, joint: JointHandle) -> Vec3;
    fn joint_anchor2(&self, joint: JointHandle) -> Vec3;
    fn joint_axis(&self, joint: JointHandle, axis: usize) -> Vec3;
    /// `None` when the kernel cannot report the rate for this joint axis.
    fn joint_axis_rate(&self, joint: JointHandle, axis: usize) -> Option<f32>;
    fn feedback_create(&mut self) -> FeedbackHandle;
    fn feedback_destroy(&mut self, feedback: FeedbackHandle);
    fn joint_set_feedback(&mut self, joint: JointHandle, feedback: Option<FeedbackHandle>);
    fn feedback_read(&self, feedback: FeedbackHandle) -> JointFeedback;

    /// Collision detection and contact-joint creation for one step.
    fn collide(
        &mut self,
        world: WorldHandle,
        space: SpaceHandle,
        settings: &ContactSettings,
    ) -> Vec<RawCollision>;
    /// Integrates the world, honouring the contact joints created by `collide`.
    fn world_step(&mut self, world: WorldHandle, step_size: f32, iterations: u32);
    fn contact_group_clear(&mut self);

    /// Tests `query` against every geometry of `space` whose category intersects `mask`.
    fn collide_with_space(
        &mut self,
        query: GeomHandle,
        space: SpaceHandle,
        mask: u32,
        max_contacts: usize,
    ) -> Vec<RawContact>;
}
