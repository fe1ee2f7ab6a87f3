use approx::assert_relative_eq;
use glam::Vec3;
use kinetic_bridge::{
    core::{RigidBodyBuilder, Shape, Transform},
    kernel::{Kernel, ReferenceKernel},
    BodyId, Scene, SceneConfig, SurfaceMaterial,
};

const DT: f32 = 1.0 / 60.0;

fn make_scene(gravity: Vec3) -> Scene {
    let config = SceneConfig {
        gravity,
        step_size: DT,
        ..SceneConfig::default()
    };
    Scene::new(ReferenceKernel::new(), config).expect("valid config")
}

fn add_ground(scene: &mut Scene) -> BodyId {
    scene
        .add_body(
            RigidBodyBuilder::fixed()
                .position(Vec3::new(0.0, -0.5, 0.0))
                .shape(Shape::cuboid(Vec3::new(20.0, 0.5, 20.0)))
                .build(),
        )
        .unwrap()
}

#[test]
fn free_fall_matches_semi_implicit_euler() {
    let mut scene = make_scene(Vec3::new(0.0, -9.81, 0.0));
    let ball = scene
        .add_body(
            RigidBodyBuilder::dynamic()
                .position(Vec3::new(0.0, 5.0, 0.0))
                .shape(Shape::sphere(0.5))
                .build(),
        )
        .unwrap();

    let steps = 30;
    for _ in 0..steps {
        scene.step();
    }

    let body = scene.body(ball).unwrap();
    let n = steps as f32;
    let expected = 5.0 - 9.81 * DT * DT * n * (n + 1.0) / 2.0;
    assert_relative_eq!(body.transform.position.y, expected, epsilon = 1e-3);
    assert_relative_eq!(body.velocity.linear.y, -9.81 * DT * n, epsilon = 1e-3);
    assert_eq!(scene.step_count(), steps);
}

#[test]
fn static_bodies_do_not_move() {
    let mut scene = make_scene(Vec3::new(0.0, -9.81, 0.0));
    let ground = add_ground(&mut scene);
    for _ in 0..10 {
        scene.step();
    }
    let body = scene.body(ground).unwrap();
    assert_eq!(body.transform.position, Vec3::new(0.0, -0.5, 0.0));
}

#[test]
fn resting_contact_reports_events_with_body_normals() {
    let mut scene = make_scene(Vec3::new(0.0, -9.81, 0.0));
    let ground = add_ground(&mut scene);
    let ball = scene
        .add_body(
            RigidBodyBuilder::dynamic()
                .position(Vec3::new(0.0, 1.0, 0.0))
                .shape(Shape::sphere(0.5))
                .report_collisions(true)
                .build(),
        )
        .unwrap();

    let mut events = Vec::new();
    for _ in 0..120 {
        scene.step();
        events.extend(scene.drain_collision_events());
    }

    assert!(!events.is_empty());
    for event in &events {
        assert!(event.involves(ball) && event.involves(ground));
        // Normal points from body 1 towards body 2.
        let towards_ball = if event.body1 == ground {
            event.normal
        } else {
            -event.normal
        };
        assert!(towards_ball.y > 0.9, "normal {:?}", event.normal);
    }

    let y = scene.body(ball).unwrap().transform.position.y;
    assert!(y > 0.4 && y < 0.55, "ball settled at {y}");
}

#[test]
fn events_require_a_reporting_body() {
    let mut scene = make_scene(Vec3::new(0.0, -9.81, 0.0));
    add_ground(&mut scene);
    scene
        .add_body(
            RigidBodyBuilder::dynamic()
                .position(Vec3::new(0.0, 0.45, 0.0))
                .shape(Shape::sphere(0.5))
                .build(),
        )
        .unwrap();

    for _ in 0..10 {
        scene.step();
        assert!(scene.collision_events().is_empty());
    }
    assert!(scene.last_profile().collision_count > 0);
}

#[test]
fn non_finite_state_is_replaced_by_last_transform() {
    let mut scene = make_scene(Vec3::ZERO);
    let ball = scene
        .add_body(
            RigidBodyBuilder::dynamic()
                .position(Vec3::new(0.0, 3.0, 0.0))
                .shape(Shape::sphere(0.5))
                .build(),
        )
        .unwrap();
    let other = scene
        .add_body(
            RigidBodyBuilder::dynamic()
                .position(Vec3::new(10.0, 0.0, 0.0))
                .linear_velocity(Vec3::X)
                .shape(Shape::sphere(0.5))
                .build(),
        )
        .unwrap();
    scene.step();

    let handle = scene.body_handle(ball).unwrap();
    scene
        .kernel_mut()
        .body_set_linear_velocity(handle, Vec3::new(f32::NAN, 0.0, 0.0));
    scene.step();

    let body = scene.body(ball).unwrap();
    assert_eq!(body.transform.position, Vec3::new(0.0, 3.0, 0.0));
    assert_eq!(body.velocity.linear, Vec3::ZERO);
    assert_eq!(scene.last_profile().nan_repairs, 1);
    assert!(scene.kernel().body_position(handle).is_finite());

    // The rest of the scene kept simulating.
    assert_relative_eq!(
        scene.body(other).unwrap().transform.position.x,
        10.0 + 2.0 * DT,
        epsilon = 1e-4
    );

    scene.step();
    assert_eq!(scene.last_profile().nan_repairs, 0);
}

#[test]
fn sleepy_body_comes_to_rest_and_wakes_on_force() {
    let mut scene = make_scene(Vec3::new(0.0, -9.81, 0.0));
    add_ground(&mut scene);
    let crate_id = scene
        .add_body(
            RigidBodyBuilder::dynamic()
                .position(Vec3::new(0.0, 0.5, 0.0))
                .shape(Shape::cuboid(Vec3::splat(0.5)))
                .sleepiness(1.0)
                .build(),
        )
        .unwrap();

    for _ in 0..120 {
        scene.step();
    }
    assert!(!scene.body(crate_id).unwrap().is_awake);
    let rest = scene.body(crate_id).unwrap().transform.position;

    for _ in 0..30 {
        scene.step();
    }
    assert_eq!(scene.body(crate_id).unwrap().transform.position, rest);

    scene.add_force(crate_id, Vec3::new(0.0, 5000.0, 0.0)).unwrap();
    assert!(scene.body(crate_id).unwrap().is_awake);
    scene.step();
    assert!(scene.body(crate_id).unwrap().transform.position.y > rest.y);
}

#[test]
fn zero_sleepiness_never_sleeps() {
    let mut scene = make_scene(Vec3::ZERO);
    let idle = scene
        .add_body(
            RigidBodyBuilder::dynamic()
                .shape(Shape::sphere(0.5))
                .sleepiness(0.0)
                .build(),
        )
        .unwrap();
    for _ in 0..300 {
        scene.step();
    }
    assert!(scene.body(idle).unwrap().is_awake);
}

#[test]
fn forced_sleep_freezes_body() {
    let mut scene = make_scene(Vec3::new(0.0, -9.81, 0.0));
    let ball = scene
        .add_body(
            RigidBodyBuilder::dynamic()
                .position(Vec3::new(0.0, 4.0, 0.0))
                .linear_velocity(Vec3::new(1.0, 0.0, 0.0))
                .shape(Shape::sphere(0.5))
                .build(),
        )
        .unwrap();
    scene.set_sleeping(ball, true).unwrap();
    for _ in 0..10 {
        scene.step();
    }
    let body = scene.body(ball).unwrap();
    assert!(!body.is_awake);
    assert_eq!(body.transform.position, Vec3::new(0.0, 4.0, 0.0));

    scene.set_sleeping(ball, false).unwrap();
    scene.step();
    assert!(scene.body(ball).unwrap().transform.position.y < 4.0);
}

#[test]
fn linear_damping_decays_velocity() {
    let mut scene = make_scene(Vec3::ZERO);
    let ball = scene
        .add_body(
            RigidBodyBuilder::dynamic()
                .linear_velocity(Vec3::new(10.0, 0.0, 0.0))
                .damping(0.5, 0.0)
                .shape(Shape::sphere(0.5))
                .build(),
        )
        .unwrap();
    for _ in 0..60 {
        scene.step();
    }
    let speed = scene.body(ball).unwrap().velocity.linear.x;
    let expected = 10.0 * (1.0 - 0.5 * DT).powi(60);
    assert_relative_eq!(speed, expected, epsilon = 1e-2);
}

#[test]
fn gravity_can_be_disabled_per_body() {
    let mut scene = make_scene(Vec3::new(0.0, -9.81, 0.0));
    let floating = scene
        .add_body(
            RigidBodyBuilder::dynamic()
                .position(Vec3::new(0.0, 2.0, 0.0))
                .gravity(false)
                .sleepiness(0.0)
                .shape(Shape::sphere(0.5))
                .build(),
        )
        .unwrap();
    for _ in 0..20 {
        scene.step();
    }
    assert_eq!(scene.body(floating).unwrap().transform.position.y, 2.0);

    scene.set_gravity_enabled(floating, true).unwrap();
    scene.step();
    assert!(scene.body(floating).unwrap().transform.position.y < 2.0);
}

#[test]
fn advance_runs_whole_steps_and_caps_catch_up() {
    let mut scene = make_scene(Vec3::ZERO);
    assert_eq!(scene.advance(DT * 2.5), 2);
    assert_relative_eq!(scene.interpolation_alpha(), 0.5, epsilon = 1e-3);
    assert_eq!(scene.advance(DT * 0.25), 0);
    assert_eq!(scene.advance(DT * 0.3), 1);
    assert_eq!(scene.advance(0.0), 0);

    let cap = scene.config().max_steps_per_advance;
    assert_eq!(scene.advance(DT * 100.0), cap);
    assert_eq!(scene.interpolation_alpha(), 0.0);
    assert_eq!(scene.step_count(), 3 + u64::from(cap));
}

#[test]
fn invalid_config_is_rejected() {
    let config = SceneConfig {
        step_size: 0.0,
        ..SceneConfig::default()
    };
    assert!(Scene::new(ReferenceKernel::new(), config).is_err());
}

#[test]
fn bouncy_material_rebounds_higher() {
    let rebound = |material: SurfaceMaterial| {
        let mut scene = make_scene(Vec3::new(0.0, -9.81, 0.0));
        add_ground(&mut scene);
        let ball = scene
            .add_body(
                RigidBodyBuilder::dynamic()
                    .position(Vec3::new(0.0, 2.0, 0.0))
                    .shape(Shape::sphere(0.25).with_material(material))
                    .build(),
            )
            .unwrap();
        let mut bounced = false;
        let mut peak = f32::MIN;
        for _ in 0..150 {
            scene.step();
            let body = scene.body(ball).unwrap();
            bounced |= body.velocity.linear.y > 0.0;
            if bounced {
                peak = peak.max(body.transform.position.y);
            }
        }
        peak
    };

    let rubber = rebound(SurfaceMaterial::rubber());
    let ice = rebound(SurfaceMaterial::ice());
    assert!(rubber > 1.0, "rubber peaked at {rubber}");
    assert!(ice < 0.5, "ice peaked at {ice}");
}

#[test]
fn off_centre_body_spins_about_its_centre_of_mass() {
    let mut scene = make_scene(Vec3::ZERO);
    let body = scene
        .add_body(
            RigidBodyBuilder::dynamic()
                .shape(Shape::sphere(0.5).with_local(Transform::from_position(Vec3::X)))
                .angular_velocity(Vec3::new(0.0, 0.0, 3.0))
                .damping(0.0, 0.0)
                .sleepiness(0.0)
                .build(),
        )
        .unwrap();
    let center = scene.mass_properties(body).unwrap().center_of_mass;
    assert_relative_eq!(center.x, 1.0, epsilon = 1e-5);

    for _ in 0..30 {
        scene.step();
    }

    let state = scene.body(body).unwrap();
    let world_center = state.transform.transform_point(center);
    assert_relative_eq!(world_center.x, 1.0, epsilon = 1e-4);
    assert_relative_eq!(world_center.y, 0.0, epsilon = 1e-4);

    // Half a turn of 3 rad/s over 30 steps is 1.5 rad about +Z.
    let spun = state.transform.rotation * Vec3::X;
    assert_relative_eq!(spun.x, 1.5f32.cos(), epsilon = 1e-3);
    assert_relative_eq!(spun.y, 1.5f32.sin(), epsilon = 1e-3);
    // The origin swings around the fixed centre.
    let origin = state.transform.position;
    assert_relative_eq!(origin.distance(world_center), 1.0, epsilon = 1e-4);
}

#[test]
fn advance_keeps_events_of_every_step() {
    let resting_scene = || {
        let mut scene = make_scene(Vec3::new(0.0, -9.81, 0.0));
        add_ground(&mut scene);
        scene
            .add_body(
                RigidBodyBuilder::dynamic()
                    .position(Vec3::new(0.0, 0.45, 0.0))
                    .shape(Shape::sphere(0.5))
                    .report_collisions(true)
                    .sleepiness(0.0)
                    .build(),
            )
            .unwrap();
        scene
    };

    let mut stepped = resting_scene();
    let mut per_step = 0;
    for _ in 0..3 {
        stepped.step();
        per_step += stepped.drain_collision_events().len();
    }

    let mut advanced = resting_scene();
    assert_eq!(advanced.advance(DT * 3.5), 3);
    let batched = advanced.drain_collision_events().len();

    assert!(per_step > 0);
    assert_eq!(batched, per_step);
    // The profile still counts a single step.
    assert!(advanced.last_profile().event_count <= batched);

    // A call that runs no step leaves the queue alone.
    assert_eq!(advanced.advance(DT * 0.1), 0);
    advanced.step();
    assert!(!advanced.collision_events().is_empty());
    assert_eq!(advanced.advance(DT * 0.1), 0);
    assert!(!advanced.collision_events().is_empty());
}

#[test]
fn force_on_off_centre_body_adds_no_spin() {
    let mut scene = make_scene(Vec3::ZERO);
    let body = scene
        .add_body(
            RigidBodyBuilder::dynamic()
                .shape(Shape::sphere(0.5).with_local(Transform::from_position(Vec3::new(2.0, 0.0, 0.0))))
                .damping(0.0, 0.0)
                .build(),
        )
        .unwrap();
    let mass = scene.mass_properties(body).unwrap().mass;
    scene.add_force(body, Vec3::new(0.0, mass * 60.0, 0.0)).unwrap();
    scene.step();

    let state = scene.body(body).unwrap();
    assert_eq!(state.velocity.angular, Vec3::ZERO);
    assert_relative_eq!(state.velocity.linear.y, 1.0, epsilon = 1e-4);
    assert_relative_eq!(state.transform.position.y, DT, epsilon = 1e-5);
}
