//! Kinetic Bridge – rigid-body integration layer for native physics kernels.
//!
//! The crate keeps engine-side bodies, shapes and joints and mirrors them into
//! a constraint-solving kernel reached through the [`Kernel`] trait: it pushes
//! bodies in and out of the kernel world, maps joint descriptions onto kernel
//! parameters, runs the fixed-step loop, and turns kernel results back into
//! collision events, query hits and transforms.

pub mod collision;
pub mod config;
pub mod core;
pub mod dynamics;
pub mod error;
pub mod kernel;
pub mod scene;
pub mod utils;

pub use glam::{Mat3, Quat, Vec3};

pub use collision::{CollisionEvent, RayHit, RaycastQuery, ShapeRef, VolumeQuery};
pub use config::SceneConfig;
pub use core::{
    Aabb, AxisLimit, AxisMotor, BodyId, BreakThresholds, CollisionFilter, Joint, JointAxis,
    JointId, JointKind, JointReadback, JointStress, MassProperties, MeshBuilder, RigidBody,
    RigidBodyBuilder, SceneId, Shape, ShapeKind, SurfaceMaterial, Suspension, Transform,
    TriangleMesh, Velocity,
};
pub use error::{PhysicsError, Result};
pub use kernel::{Kernel, ReferenceKernel};
pub use scene::Scene;
pub use utils::allocator::{Arena, EntityId, GenerationalId};
pub use utils::profiling::StepProfile;

use parking_lot::{Mutex, MutexGuard};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Owns a set of independent scenes and steps them together.
///
/// Each scene sits behind its own lock, so scenes can be stepped concurrently
/// while single-scene access stays exclusive.
pub struct PhysicsEngine<K: Kernel + Send = ReferenceKernel> {
    scenes: Arena<Mutex<Scene<K>>>,
}

impl<K: Kernel + Send> Default for PhysicsEngine<K> {
    fn default() -> Self {
        Self {
            scenes: Arena::new(),
        }
    }
}

impl<K: Kernel + Send> PhysicsEngine<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a scene on `kernel` and returns its [`SceneId`].
    pub fn create_scene(&mut self, kernel: K, config: SceneConfig) -> Result<SceneId> {
        let scene = Scene::new(kernel, config)?;
        Ok(self.scenes.insert(Mutex::new(scene)))
    }

    /// Tears the scene down, releasing every kernel resource it holds.
    pub fn remove_scene(&mut self, id: SceneId) -> Result<()> {
        self.scenes
            .remove(id)
            .map(drop)
            .ok_or(PhysicsError::UnknownScene(id))
    }

    /// Locks a scene for exclusive access.
    pub fn scene(&self, id: SceneId) -> Option<MutexGuard<'_, Scene<K>>> {
        self.scenes.get(id).map(Mutex::lock)
    }

    pub fn scene_count(&self) -> usize {
        self.scenes.len()
    }

    /// Runs one fixed step on every scene.
    pub fn step_all(&self) {
        self.for_each_scene(|scene| scene.step());
    }

    /// Feeds `dt` seconds to every scene's accumulator.
    pub fn advance_all(&self, dt: f32) {
        self.for_each_scene(|scene| {
            scene.advance(dt);
        });
    }

    #[cfg(feature = "parallel")]
    fn for_each_scene(&self, f: impl Fn(&mut Scene<K>) + Sync) {
        let scenes: Vec<&Mutex<Scene<K>>> = self.scenes.iter().map(|(_, s)| s).collect();
        scenes.par_iter().for_each(|scene| f(&mut scene.lock()));
    }

    #[cfg(not(feature = "parallel"))]
    fn for_each_scene(&self, f: impl Fn(&mut Scene<K>)) {
        for (_, scene) in self.scenes.iter() {
            f(&mut scene.lock());
        }
    }
}
