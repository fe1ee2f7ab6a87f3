use glam::Vec3;

use super::{BodyEntry, BodyWorld, Scene};
use crate::collision::binding::{bind_shape, place_static, unbind_shape, BindTarget};
use crate::collision::{CcdState, GeomData};
use crate::core::{BodyId, MassProperties, RigidBody, Shape, Transform, Velocity};
use crate::dynamics::mass::aggregate;
use crate::dynamics::sleep::auto_disable_for;
use crate::error::{PhysicsError, Result};
use crate::kernel::{BodyHandle, Kernel, KernelMass};

impl<K: Kernel> Scene<K> {
    /// Registers a body and pushes it into the world.
    pub fn add_body(&mut self, body: RigidBody) -> Result<BodyId> {
        for shape in &body.shapes {
            shape.validate()?;
        }
        let id = self.bodies.insert_with(|id| BodyEntry {
            ccd: CcdState {
                radius: None,
                previous: body.transform.position,
            },
            body: RigidBody { id, ..body },
            pushed: false,
            world: None,
        });
        self.push_body(id)?;
        Ok(id)
    }

    /// Pops the body and forgets it. Joints referencing it stay detached.
    pub fn remove_body(&mut self, id: BodyId) -> Result<RigidBody> {
        self.pop_body(id)?;
        let entry = self.bodies.remove(id).ok_or(PhysicsError::UnknownBody(id))?;
        log::debug!("body {id:?} removed");
        Ok(entry.body)
    }

    /// Requests simulation of the body. Does nothing when it is already in the world.
    pub fn push_body(&mut self, id: BodyId) -> Result<()> {
        let entry = self
            .bodies
            .get_mut(id)
            .ok_or(PhysicsError::UnknownBody(id))?;
        entry.pushed = true;
        self.enter_world(id);
        Ok(())
    }

    /// Takes the body out of the world; its engine state is kept.
    pub fn pop_body(&mut self, id: BodyId) -> Result<()> {
        let entry = self
            .bodies
            .get_mut(id)
            .ok_or(PhysicsError::UnknownBody(id))?;
        entry.pushed = false;
        self.exit_world(id);
        Ok(())
    }

    pub fn body(&self, id: BodyId) -> Option<&RigidBody> {
        self.bodies.get(id).map(|e| &e.body)
    }

    pub fn bodies(&self) -> impl Iterator<Item = &RigidBody> + '_ {
        self.bodies.iter().map(|(_, e)| &e.body)
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_body_in_world(&self, id: BodyId) -> bool {
        self.bodies.get(id).is_some_and(|e| e.world.is_some())
    }

    /// Number of shapes currently bound to kernel geometry, over all bodies.
    pub fn bound_shape_count(&self) -> usize {
        self.bodies
            .iter()
            .filter_map(|(_, e)| e.world.as_ref())
            .map(|w| w.bindings.len())
            .sum()
    }

    pub fn mass_properties(&self, id: BodyId) -> Option<MassProperties> {
        self.body(id).map(|b| b.mass_properties)
    }

    /// Replaces the shapes, rebinding them when the body is in the world.
    pub fn set_shapes(&mut self, id: BodyId, shapes: Vec<Shape>) -> Result<()> {
        for shape in &shapes {
            shape.validate()?;
        }
        let entry = self
            .bodies
            .get_mut(id)
            .ok_or(PhysicsError::UnknownBody(id))?;
        entry.body.shapes = shapes;
        entry.ccd.invalidate();
        if entry.pushed {
            self.exit_world(id);
            self.enter_world(id);
        }
        Ok(())
    }

    pub fn set_body_transform(&mut self, id: BodyId, transform: Transform) -> Result<()> {
        let Self {
            kernel, bodies, ..
        } = self;
        let entry = bodies.get_mut(id).ok_or(PhysicsError::UnknownBody(id))?;
        entry.body.transform = transform;
        entry.ccd.previous = transform.position;
        let Some(world) = entry.world.as_ref() else {
            return Ok(());
        };
        match world.kernel {
            Some(handle) => {
                kernel.body_set_position(handle, transform.position);
                kernel.body_set_rotation(handle, transform.rotation);
            }
            None => {
                for binding in &world.bindings {
                    if let Some(shape) = entry.body.shapes.get(binding.shape_index) {
                        place_static(kernel, binding, &transform, shape);
                    }
                }
            }
        }
        Ok(())
    }

    pub fn set_linear_velocity(&mut self, id: BodyId, velocity: Vec3) -> Result<()> {
        self.with_kernel_body(id, |kernel, body, handle| {
            body.velocity.linear = velocity;
            if let Some(h) = handle {
                kernel.body_set_linear_velocity(h, velocity);
            }
        })
    }

    pub fn set_angular_velocity(&mut self, id: BodyId, velocity: Vec3) -> Result<()> {
        self.with_kernel_body(id, |kernel, body, handle| {
            body.velocity.angular = velocity;
            if let Some(h) = handle {
                kernel.body_set_angular_velocity(h, velocity);
            }
        })
    }

    /// Puts the body to sleep (zeroing its velocity) or wakes it.
    pub fn set_sleeping(&mut self, id: BodyId, sleeping: bool) -> Result<()> {
        self.with_kernel_body(id, |kernel, body, handle| {
            if body.is_static {
                return;
            }
            body.is_awake = !sleeping;
            if sleeping {
                body.velocity = Velocity::default();
            }
            if let Some(h) = handle {
                if sleeping {
                    kernel.body_set_linear_velocity(h, Vec3::ZERO);
                    kernel.body_set_angular_velocity(h, Vec3::ZERO);
                }
                kernel.body_set_enabled(h, !sleeping);
            }
        })
    }

    pub fn set_gravity_enabled(&mut self, id: BodyId, enabled: bool) -> Result<()> {
        self.with_kernel_body(id, |kernel, body, handle| {
            body.gravity_enabled = enabled;
            if let Some(h) = handle {
                kernel.body_set_gravity_mode(h, enabled);
            }
        })
    }

    pub fn set_sleepiness(&mut self, id: BodyId, sleepiness: f32) -> Result<()> {
        self.with_kernel_body(id, |kernel, body, handle| {
            body.sleepiness = sleepiness.clamp(0.0, 1.0);
            if let Some(h) = handle {
                kernel.body_set_auto_disable(h, auto_disable_for(body.sleepiness));
            }
        })
    }

    pub fn set_damping(&mut self, id: BodyId, linear: f32, angular: f32) -> Result<()> {
        self.with_kernel_body(id, |_, body, _| {
            body.linear_damping = linear.max(0.0);
            body.angular_damping = angular.max(0.0);
        })
    }

    pub fn set_continuous_collision(&mut self, id: BodyId, enabled: bool) -> Result<()> {
        let Self {
            kernel, bodies, ..
        } = self;
        let entry = bodies.get_mut(id).ok_or(PhysicsError::UnknownBody(id))?;
        entry.body.continuous_collision = enabled;
        // Sweep from where the body is now, not from a stale snapshot.
        entry.ccd.previous = match entry.kernel_body() {
            Some(handle) => kernel.body_position(handle),
            None => entry.body.transform.position,
        };
        Ok(())
    }

    pub fn set_report_collisions(&mut self, id: BodyId, enabled: bool) -> Result<()> {
        self.with_kernel_body(id, |_, body, _| body.report_collisions = enabled)
    }

    /// Overrides shape densities with a uniform one giving `total_mass`, or
    /// restores per-shape densities with `None`.
    pub fn set_total_mass(&mut self, id: BodyId, total_mass: Option<f32>) -> Result<()> {
        let Self {
            kernel, bodies, ..
        } = self;
        let entry = bodies.get_mut(id).ok_or(PhysicsError::UnknownBody(id))?;
        entry.body.total_mass = total_mass;
        if let Some(world) = entry.world.as_ref() {
            commit_mass(kernel, &mut entry.body, world);
        }
        Ok(())
    }

    /// Adds a world-space force for the next step. It acts at the centre of
    /// mass, so it adds no torque.
    pub fn add_force(&mut self, id: BodyId, force: Vec3) -> Result<()> {
        self.with_kernel_body(id, |kernel, body, handle| {
            if let Some(h) = handle {
                kernel.body_set_enabled(h, true);
                body.is_awake = true;
                kernel.body_add_force(h, force);
            }
        })
    }

    fn with_kernel_body(
        &mut self,
        id: BodyId,
        apply: impl FnOnce(&mut K, &mut RigidBody, Option<BodyHandle>),
    ) -> Result<()> {
        let Self {
            kernel, bodies, ..
        } = self;
        let entry = bodies.get_mut(id).ok_or(PhysicsError::UnknownBody(id))?;
        let handle = entry.kernel_body();
        apply(kernel, &mut entry.body, handle);
        Ok(())
    }

    /// Creates the kernel body and geometry for a pushed body.
    pub(crate) fn enter_world(&mut self, id: BodyId) {
        let (world, space) = (self.world, self.space);
        let Self {
            kernel,
            bodies,
            dictionary,
            meshes,
            ..
        } = self;
        let Some(entry) = bodies.get_mut(id) else {
            return;
        };
        if !entry.pushed || entry.world.is_some() {
            return;
        }

        let body = &mut entry.body;
        let handle = if body.is_static {
            None
        } else {
            let h = kernel.body_create(world);
            kernel.body_set_position(h, body.transform.position);
            kernel.body_set_rotation(h, body.transform.rotation);
            kernel.body_set_linear_velocity(h, body.velocity.linear);
            kernel.body_set_angular_velocity(h, body.velocity.angular);
            kernel.body_set_gravity_mode(h, body.gravity_enabled);
            kernel.body_set_auto_disable(h, auto_disable_for(body.sleepiness));
            kernel.body_set_enabled(h, body.is_awake);
            Some(h)
        };

        let target = BindTarget {
            space,
            body_id: id,
            body: handle,
            transform: &body.transform,
        };
        let bindings: Vec<GeomData> = body
            .shapes
            .iter()
            .enumerate()
            .filter_map(|(index, shape)| {
                bind_shape(kernel, dictionary, meshes, &target, index, shape)
            })
            .collect();

        let state = BodyWorld {
            kernel: handle,
            bindings,
            joints: Vec::new(),
        };
        commit_mass(kernel, body, &state);
        entry.ccd.previous = body.transform.position;

        let empty = state.bindings.is_empty();
        log::debug!(
            "body {id:?} entered world ({} geoms, {})",
            state.bindings.len(),
            if handle.is_some() { "dynamic" } else { "static" }
        );
        entry.world = Some(state);

        if empty {
            log::debug!("body {id:?} has no bindable shapes, leaving world");
            self.exit_world(id);
            return;
        }
        self.sync_joints_of(id);
    }

    /// Releases everything [`Self::enter_world`] created. Joints go first.
    pub(crate) fn exit_world(&mut self, id: BodyId) {
        let Some(state) = self.bodies.get_mut(id).and_then(|e| e.world.take()) else {
            return;
        };
        for joint in &state.joints {
            self.detach_joint(*joint);
        }

        for binding in &state.bindings {
            unbind_shape(
                &mut self.kernel,
                &mut self.dictionary,
                &mut self.meshes,
                binding,
            );
        }
        if let Some(handle) = state.kernel {
            self.kernel.body_destroy(handle);
        }
        log::debug!("body {id:?} left world");
    }
}

/// Aggregates the bound shapes into the body mass and commits it to the kernel.
fn commit_mass<K: Kernel + ?Sized>(kernel: &mut K, body: &mut RigidBody, state: &BodyWorld) {
    let shapes: Vec<&Shape> = state
        .bindings
        .iter()
        .filter_map(|b| body.shapes.get(b.shape_index))
        .collect();
    if shapes.is_empty() {
        return;
    }
    let properties = aggregate(&shapes, body.total_mass);
    body.mass_properties = properties;
    if let Some(handle) = state.kernel {
        // The kernel body origin stays at the engine origin.
        kernel.body_set_mass(
            handle,
            KernelMass {
                mass: properties.mass,
                center: properties.center_of_mass,
                inertia: properties.inertia,
            },
        );
    }
}
