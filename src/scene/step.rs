use std::time::Instant;

use glam::Vec3;

use super::Scene;
use crate::collision::binding::resolve;
use crate::collision::ccd::{clamp_to_hit, sweep_ray};
use crate::collision::CollisionEvent;
use crate::config::ALL_GROUPS;
use crate::core::{BodyId, Transform, Velocity};
use crate::dynamics::damping::damping_forces;
use crate::kernel::{ContactSettings, Kernel, RawCollision};
use crate::utils::profiling::{ScopedTimer, StepProfile};

#[derive(Debug, Default, Clone, Copy)]
struct ReadBackCounts {
    ccd_corrections: usize,
    nan_repairs: usize,
}

impl<K: Kernel> Scene<K> {
    /// Advances the scene by one fixed step of `config.step_size`.
    /// Events of earlier steps are discarded.
    pub fn step(&mut self) {
        self.events.clear();
        self.run_step();
    }

    /// One fixed step, appending its collision events to the queue.
    fn run_step(&mut self) {
        let started = Instant::now();
        let mut profile = StepProfile::default();
        let queued = self.events.len();

        {
            let _timer = ScopedTimer::new("scene::pre_step", &mut profile.pre_step_time);
            self.sync_broken_joints();
            self.apply_pre_step();
        }

        let collisions = {
            let _timer = ScopedTimer::new("scene::collide", &mut profile.collide_time);
            let settings = ContactSettings {
                max_contacts: self.config.max_contacts,
            };
            self.kernel.collide(self.world, self.space, &settings)
        };

        {
            let _timer = ScopedTimer::new("scene::dispatch", &mut profile.dispatch_time);
            self.dispatch_collisions(&collisions);
        }

        {
            let _timer = ScopedTimer::new("scene::integrate", &mut profile.integrate_time);
            self.kernel
                .world_step(self.world, self.config.step_size, self.config.max_iterations);
            self.kernel.contact_group_clear();
        }

        {
            let _timer = ScopedTimer::new("scene::read_back", &mut profile.read_back_time);
            let counts = self.read_back_bodies();
            self.read_back_joints();
            profile.ccd_corrections = counts.ccd_corrections;
            profile.nan_repairs = counts.nan_repairs;
        }

        profile.body_count = self.bodies.len();
        profile.joint_count = self.joints.len();
        profile.collision_count = collisions.len();
        profile.event_count = self.events.len() - queued;
        profile.total_time = started.elapsed();
        profile.report();

        self.profile = profile;
        self.steps += 1;
    }

    /// Feeds `dt` seconds into the fixed-step accumulator and runs as many
    /// steps as it covers, up to `max_steps_per_advance`. Returns the step count.
    ///
    /// Collision events of every step run here are kept until drained.
    pub fn advance(&mut self, dt: f32) -> u32 {
        if !(dt > 0.0) {
            return 0;
        }
        self.accumulator += dt;
        let step_size = self.config.step_size;
        let mut steps = 0;
        while self.accumulator >= step_size {
            if steps >= self.config.max_steps_per_advance {
                log::warn!(
                    "scene is falling behind, dropping {:.4}s of simulation time",
                    self.accumulator
                );
                self.accumulator = 0.0;
                break;
            }
            self.accumulator -= step_size;
            if steps == 0 {
                self.events.clear();
            }
            self.run_step();
            steps += 1;
        }
        steps
    }

    /// Fraction of a step left in the accumulator, for render interpolation.
    pub fn interpolation_alpha(&self) -> f32 {
        (self.accumulator / self.config.step_size).clamp(0.0, 1.0)
    }

    /// Events produced by the last `step`, or by every step of the last
    /// `advance` that ran any.
    pub fn collision_events(&self) -> &[CollisionEvent] {
        &self.events
    }

    pub fn drain_collision_events(&mut self) -> Vec<CollisionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn last_profile(&self) -> &StepProfile {
        &self.profile
    }

    /// Damping forces and CCD snapshots for awake dynamic bodies.
    fn apply_pre_step(&mut self) {
        let Self {
            kernel, bodies, ..
        } = self;
        for (_, entry) in bodies.iter_mut() {
            let Some(handle) = entry.kernel_body() else {
                continue;
            };
            if !kernel.body_is_enabled(handle) {
                continue;
            }
            let body = &entry.body;
            if body.linear_damping > 0.0 || body.angular_damping > 0.0 {
                let velocity = Velocity {
                    linear: kernel.body_linear_velocity(handle),
                    angular: kernel.body_angular_velocity(handle),
                };
                let forces = damping_forces(
                    &velocity,
                    kernel.body_rotation(handle),
                    &body.mass_properties,
                    body.linear_damping,
                    body.angular_damping,
                );
                kernel.body_add_force(handle, forces.force);
                kernel.body_add_relative_torque(handle, forces.relative_torque);
            }
            if body.continuous_collision {
                entry.ccd.previous = kernel.body_position(handle);
            }
        }
    }

    fn dispatch_collisions(&mut self, collisions: &[RawCollision]) {
        if !self.config.report_collisions {
            return;
        }
        for raw in collisions {
            let first = resolve(&self.kernel, &self.dictionary, raw.geom1);
            let second = resolve(&self.kernel, &self.dictionary, raw.geom2);
            let (Some(first), Some(second)) = (first, second) else {
                log::trace!("collision between unbound geoms {:?} / {:?}", raw.geom1, raw.geom2);
                continue;
            };
            let wants = |id: BodyId| {
                self.bodies
                    .get(id)
                    .is_some_and(|e| e.body.report_collisions)
            };
            if wants(first.body) || wants(second.body) {
                self.events
                    .push(CollisionEvent::from_raw(raw, first, second));
            }
        }
    }

    /// Copies kernel state into the engine bodies, repairing non-finite
    /// results and applying CCD.
    fn read_back_bodies(&mut self) -> ReadBackCounts {
        let mut counts = ReadBackCounts::default();
        let (space, ray) = (self.space, self.ray);
        let Self {
            kernel,
            bodies,
            dictionary,
            ..
        } = self;

        for (id, entry) in bodies.iter_mut() {
            let Some(handle) = entry.kernel_body() else {
                continue;
            };
            let position = kernel.body_position(handle);
            let rotation = kernel.body_rotation(handle);
            let linear = kernel.body_linear_velocity(handle);
            let angular = kernel.body_angular_velocity(handle);

            let pose_ok = position.is_finite() && rotation.is_finite();
            if !pose_ok || !linear.is_finite() || !angular.is_finite() {
                log::error!(
                    "body {id:?}: non-finite state after step (position {position}, linear {linear}), restoring last transform"
                );
                let previous = entry.body.transform;
                let velocity = Velocity {
                    linear: if linear.is_finite() && pose_ok { linear } else { Vec3::ZERO },
                    angular: if angular.is_finite() && pose_ok { angular } else { Vec3::ZERO },
                };
                kernel.body_set_position(handle, previous.position);
                kernel.body_set_rotation(handle, previous.rotation);
                kernel.body_set_linear_velocity(handle, velocity.linear);
                kernel.body_set_angular_velocity(handle, velocity.angular);
                entry.body.velocity = velocity;
                entry.ccd.previous = previous.position;
                counts.nan_repairs += 1;
                continue;
            }

            entry.body.transform = Transform {
                position,
                rotation: rotation.normalize(),
            };
            entry.body.velocity = Velocity { linear, angular };
            entry.body.is_awake = kernel.body_is_enabled(handle);

            if entry.body.continuous_collision && entry.body.is_awake {
                let radius = entry.ccd.radius_for(&entry.body.shapes);
                if let Some(sweep) = sweep_ray(entry.ccd.previous, position, radius) {
                    kernel.geom_ray_set(ray, sweep.origin, sweep.direction, sweep.length);
                    let blocking = kernel
                        .collide_with_space(ray, space, ALL_GROUPS, usize::MAX)
                        .into_iter()
                        .filter(|c| {
                            resolve(&*kernel, dictionary, c.geom).is_some_and(|r| r.body != id)
                        })
                        .min_by(|a, b| a.depth.total_cmp(&b.depth));
                    if let Some(hit) = blocking {
                        let corrected = clamp_to_hit(&sweep, hit.depth, hit.position, radius);
                        if corrected.distance_squared(position) > 0.0 {
                            log::trace!("body {id:?}: ccd clamp {position} -> {corrected}");
                            kernel.body_set_position(handle, corrected);
                            entry.body.transform.position = corrected;
                            counts.ccd_corrections += 1;
                        }
                    }
                }
            }
            entry.ccd.previous = entry.body.transform.position;
        }
        counts
    }
}
