use approx::assert_relative_eq;
use glam::Vec3;
use kinetic_bridge::{
    core::{RigidBodyBuilder, Shape},
    kernel::ReferenceKernel,
    PhysicsEngine, PhysicsError, SceneConfig,
};

fn falling_ball_scene(engine: &mut PhysicsEngine) -> (kinetic_bridge::SceneId, kinetic_bridge::BodyId) {
    let scene_id = engine
        .create_scene(ReferenceKernel::new(), SceneConfig::default())
        .unwrap();
    let ball = engine
        .scene(scene_id)
        .unwrap()
        .add_body(
            RigidBodyBuilder::dynamic()
                .position(Vec3::new(0.0, 10.0, 0.0))
                .shape(Shape::sphere(0.5))
                .build(),
        )
        .unwrap();
    (scene_id, ball)
}

#[test]
fn engine_steps_every_scene() {
    let mut engine = PhysicsEngine::new();
    let scenes: Vec<_> = (0..4).map(|_| falling_ball_scene(&mut engine)).collect();
    assert_eq!(engine.scene_count(), 4);

    for _ in 0..10 {
        engine.step_all();
    }

    for (scene_id, ball) in &scenes {
        let scene = engine.scene(*scene_id).unwrap();
        assert_eq!(scene.step_count(), 10);
        assert!(scene.body(*ball).unwrap().transform.position.y < 10.0);
    }

    // Identical scenes stay identical.
    let heights: Vec<f32> = scenes
        .iter()
        .map(|(s, b)| engine.scene(*s).unwrap().body(*b).unwrap().transform.position.y)
        .collect();
    for h in &heights[1..] {
        assert_relative_eq!(*h, heights[0]);
    }
}

#[test]
fn advance_all_feeds_each_accumulator() {
    let mut engine = PhysicsEngine::new();
    let (a, _) = falling_ball_scene(&mut engine);
    let (b, _) = falling_ball_scene(&mut engine);
    let dt = SceneConfig::default().step_size;

    engine.advance_all(dt * 3.5);
    assert_eq!(engine.scene(a).unwrap().step_count(), 3);
    assert_eq!(engine.scene(b).unwrap().step_count(), 3);
}

#[test]
fn removing_a_scene_releases_it() {
    let mut engine = PhysicsEngine::new();
    let (scene_id, _) = falling_ball_scene(&mut engine);
    engine.remove_scene(scene_id).unwrap();
    assert_eq!(engine.scene_count(), 0);
    assert!(engine.scene(scene_id).is_none());
    assert!(matches!(
        engine.remove_scene(scene_id),
        Err(PhysicsError::UnknownScene(_))
    ));
}

#[test]
fn invalid_scene_config_is_reported() {
    let mut engine: PhysicsEngine = PhysicsEngine::new();
    let config = SceneConfig {
        step_size: -1.0,
        ..SceneConfig::default()
    };
    assert!(matches!(
        engine.create_scene(ReferenceKernel::new(), config),
        Err(PhysicsError::InvalidConfig(_))
    ));
    assert_eq!(engine.scene_count(), 0);
}

#[test]
fn config_deserializes_with_defaults() {
    let config: SceneConfig =
        serde_json::from_str(r#"{ "step_size": 0.01, "gravity": [0.0, -1.62, 0.0] }"#).unwrap();
    let defaults = SceneConfig::default();
    assert_relative_eq!(config.step_size, 0.01);
    assert_relative_eq!(config.gravity.y, -1.62);
    assert_eq!(config.max_iterations, defaults.max_iterations);
    assert_eq!(config.max_contacts, defaults.max_contacts);
    assert_eq!(config.report_collisions, defaults.report_collisions);
    assert!(config.validate().is_ok());

    let round_trip: SceneConfig =
        serde_json::from_str(&serde_json::to_string(&config).unwrap()).unwrap();
    assert_eq!(round_trip.max_steps_per_advance, config.max_steps_per_advance);
}

#[test]
fn scene_gravity_can_change_at_runtime() {
    let mut engine = PhysicsEngine::new();
    let (scene_id, ball) = falling_ball_scene(&mut engine);
    {
        let mut scene = engine.scene(scene_id).unwrap();
        scene.set_gravity(Vec3::ZERO);
    }
    engine.step_all();
    let scene = engine.scene(scene_id).unwrap();
    assert_eq!(scene.body(ball).unwrap().transform.position.y, 10.0);
}
