//! Per-scene integration state: one kernel world and space plus the engine
//! bodies and joints mirrored into them.

mod bodies;
mod joints;
mod queries;
mod step;

use crate::collision::{CcdState, CollisionEvent, GeomData, MeshCache, ShapeDictionary};
use crate::config::SceneConfig;
use crate::core::{BodyId, Joint, JointId, RigidBody};
use crate::error::Result;
use crate::kernel::{
    BodyHandle, FeedbackHandle, GeomDesc, GeomHandle, JointHandle, Kernel, ReferenceKernel,
    SpaceHandle, WorldHandle,
};
use crate::utils::allocator::Arena;
use crate::utils::profiling::StepProfile;

/// Kernel-side state of a body that is in the world.
#[derive(Debug, Default)]
pub(crate) struct BodyWorld {
    /// `None` for static bodies.
    pub(crate) kernel: Option<BodyHandle>,
    pub(crate) bindings: Vec<GeomData>,
    /// Joints currently attached through this body.
    pub(crate) joints: Vec<JointId>,
}

pub(crate) struct BodyEntry {
    pub(crate) body: RigidBody,
    /// The engine wants the body simulated.
    pub(crate) pushed: bool,
    pub(crate) world: Option<BodyWorld>,
    pub(crate) ccd: CcdState,
}

impl BodyEntry {
    pub(crate) fn kernel_body(&self) -> Option<BodyHandle> {
        self.world.as_ref().and_then(|w| w.kernel)
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct AttachedJoint {
    pub(crate) handle: JointHandle,
    /// Kernel body order is swapped because body 1 is static.
    pub(crate) reversed: bool,
    pub(crate) feedback: Option<FeedbackHandle>,
}

pub(crate) struct JointEntry {
    pub(crate) joint: Joint,
    pub(crate) pushed: bool,
    pub(crate) attached: Option<AttachedJoint>,
}

/// A simulated scene bound to one kernel instance.
///
/// All work happens on the calling thread; a scene is `Send` when its kernel is,
/// so independent scenes can be stepped from different threads.
pub struct Scene<K: Kernel = ReferenceKernel> {
    kernel: K,
    config: SceneConfig,
    world: WorldHandle,
    space: SpaceHandle,
    /// Scratch ray reused by ray casts and CCD; never inserted in the space.
    ray: GeomHandle,
    bodies: Arena<BodyEntry>,
    joints: Arena<JointEntry>,
    dictionary: ShapeDictionary,
    meshes: MeshCache,
    events: Vec<CollisionEvent>,
    accumulator: f32,
    profile: StepProfile,
    steps: u64,
}

impl<K: Kernel> Scene<K> {
    pub fn new(mut kernel: K, config: SceneConfig) -> Result<Self> {
        config.validate()?;

        let world = kernel.world_create();
        kernel.world_set_gravity(world, config.gravity);
        let space = kernel.space_create();
        let ray = kernel.geom_create(None, &GeomDesc::Ray { length: 1.0 });
        log::debug!("scene created on {} kernel", kernel.name());

        Ok(Self {
            kernel,
            config,
            world,
            space,
            ray,
            bodies: Arena::new(),
            joints: Arena::new(),
            dictionary: ShapeDictionary::new(),
            meshes: MeshCache::default(),
            events: Vec::new(),
            accumulator: 0.0,
            profile: StepProfile::default(),
            steps: 0,
        })
    }

    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    pub fn set_gravity(&mut self, gravity: glam::Vec3) {
        self.config.gravity = gravity;
        self.kernel.world_set_gravity(self.world, gravity);
    }

    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    /// Direct kernel access for diagnostics and tests.
    pub fn kernel_mut(&mut self) -> &mut K {
        &mut self.kernel
    }

    pub fn space(&self) -> SpaceHandle {
        self.space
    }

    /// Number of completed steps.
    pub fn step_count(&self) -> u64 {
        self.steps
    }

    /// Live entries of the geometry reverse-lookup table.
    pub fn dictionary_len(&self) -> usize {
        self.dictionary.len()
    }

    /// Kernel meshes currently cooked for this scene.
    pub fn cached_mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn body_handle(&self, id: BodyId) -> Option<BodyHandle> {
        self.bodies.get(id).and_then(BodyEntry::kernel_body)
    }

    pub fn joint_handle(&self, id: JointId) -> Option<JointHandle> {
        self.joints
            .get(id)
            .and_then(|e| e.attached)
            .map(|a| a.handle)
    }

    pub fn joint_feedback(&self, id: JointId) -> Option<FeedbackHandle> {
        self.joints
            .get(id)
            .and_then(|e| e.attached)
            .and_then(|a| a.feedback)
    }
}

impl<K: Kernel> Drop for Scene<K> {
    fn drop(&mut self) {
        for id in self.bodies.ids() {
            self.exit_world(id);
        }
        for id in self.joints.ids() {
            self.detach_joint(id);
        }

        self.kernel.geom_destroy(self.ray);
        if !self.dictionary.is_empty() {
            log::error!(
                "scene teardown: {} shape dictionary entries still live",
                self.dictionary.len()
            );
        }
        self.meshes.clear(&mut self.kernel);
        self.kernel.space_destroy(self.space);
        self.kernel.world_destroy(self.world);
        log::debug!("scene destroyed after {} steps", self.steps);
    }
}
