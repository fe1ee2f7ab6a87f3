use std::sync::Arc;

use approx::assert_relative_eq;
use glam::{Quat, Vec3};
use kinetic_bridge::{
    core::{RigidBodyBuilder, Shape, Transform, TriangleMesh},
    kernel::ReferenceKernel,
    RaycastQuery, Scene, SceneConfig,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

fn make_scene() -> Scene {
    let config = SceneConfig {
        gravity: Vec3::ZERO,
        ..SceneConfig::default()
    };
    Scene::new(ReferenceKernel::new(), config).expect("valid config")
}

fn quad_mesh() -> Arc<TriangleMesh> {
    Arc::new(
        TriangleMesh::builder(
            vec![
                Vec3::new(-5.0, 0.0, -5.0),
                Vec3::new(5.0, 0.0, -5.0),
                Vec3::new(5.0, 0.0, 5.0),
                Vec3::new(-5.0, 0.0, 5.0),
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
        .build(),
    )
}

#[test]
fn push_and_pop_create_and_release_kernel_objects() {
    let mut scene = make_scene();
    let body = scene
        .add_body(
            RigidBodyBuilder::dynamic()
                .shape(Shape::sphere(0.5))
                .shape(Shape::cuboid(Vec3::splat(0.2)).with_local(Transform::from_position(Vec3::X)))
                .build(),
        )
        .unwrap();

    assert!(scene.is_body_in_world(body));
    assert_eq!(scene.kernel().body_count(), 1);
    // Scratch ray, plain sphere, offset wrapper and its inner box.
    assert_eq!(scene.kernel().geom_count(), 4);
    assert_eq!(scene.kernel().space_geom_count(scene.space()), 2);
    assert_eq!(scene.dictionary_len(), 2);

    // Pushing twice is a no-op.
    scene.push_body(body).unwrap();
    assert_eq!(scene.kernel().body_count(), 1);
    assert_eq!(scene.dictionary_len(), 2);

    scene.pop_body(body).unwrap();
    assert!(!scene.is_body_in_world(body));
    assert_eq!(scene.kernel().body_count(), 0);
    assert_eq!(scene.kernel().geom_count(), 1);
    assert_eq!(scene.dictionary_len(), 0);

    // Engine state survives a pop.
    assert_eq!(scene.body(body).unwrap().shapes.len(), 2);
}

#[test]
fn dynamic_mesh_shape_is_ignored_and_body_leaves_world() {
    let mut scene = make_scene();
    let body = scene
        .add_body(RigidBodyBuilder::dynamic().shape(Shape::mesh(quad_mesh())).build())
        .unwrap();

    assert!(!scene.is_body_in_world(body));
    assert_eq!(scene.kernel().body_count(), 0);
    assert_eq!(scene.dictionary_len(), 0);
    assert_eq!(scene.cached_mesh_count(), 0);
}

#[test]
fn body_without_shapes_never_stays_in_world() {
    let mut scene = make_scene();
    let body = scene.add_body(RigidBodyBuilder::dynamic().build()).unwrap();
    assert!(!scene.is_body_in_world(body));
    assert_eq!(scene.kernel().body_count(), 0);

    scene.set_shapes(body, vec![Shape::sphere(0.3)]).unwrap();
    assert!(scene.is_body_in_world(body));
    assert_eq!(scene.kernel().body_count(), 1);
}

#[test]
fn shared_static_mesh_is_cooked_once() {
    let mut scene = make_scene();
    let mesh = quad_mesh();
    let a = scene
        .add_body(RigidBodyBuilder::fixed().shape(Shape::mesh(mesh.clone())).build())
        .unwrap();
    let b = scene
        .add_body(
            RigidBodyBuilder::fixed()
                .position(Vec3::new(0.0, -3.0, 0.0))
                .shape(Shape::mesh(mesh.clone()))
                .build(),
        )
        .unwrap();
    assert_eq!(scene.cached_mesh_count(), 1);
    assert_eq!(scene.kernel().trimesh_count(), 1);

    scene.pop_body(a).unwrap();
    assert_eq!(scene.kernel().trimesh_count(), 1);
    scene.pop_body(b).unwrap();
    assert_eq!(scene.kernel().trimesh_count(), 0);
    assert_eq!(scene.cached_mesh_count(), 0);
}

#[test]
fn mass_is_aggregated_from_bound_shapes() {
    let mut scene = make_scene();
    let body = scene
        .add_body(
            RigidBodyBuilder::dynamic()
                .shape(Shape::sphere(1.0).with_local(Transform::from_position(Vec3::new(-1.0, 0.0, 0.0))))
                .shape(Shape::sphere(1.0).with_local(Transform::from_position(Vec3::new(1.0, 0.0, 0.0))))
                .build(),
        )
        .unwrap();

    let single = 4.0 / 3.0 * std::f32::consts::PI;
    let props = scene.mass_properties(body).unwrap();
    assert_relative_eq!(props.mass, 2.0 * single, epsilon = 1e-4);
    assert_relative_eq!(props.center_of_mass.x, 0.0, epsilon = 1e-5);

    scene.set_total_mass(body, Some(3.0)).unwrap();
    assert_relative_eq!(scene.mass_properties(body).unwrap().mass, 3.0, epsilon = 1e-4);

    scene.set_total_mass(body, None).unwrap();
    assert_relative_eq!(
        scene.mass_properties(body).unwrap().mass,
        2.0 * single,
        epsilon = 1e-4
    );
}

#[test]
fn moving_a_static_body_moves_its_geometry() {
    let mut scene = make_scene();
    let wall = scene
        .add_body(
            RigidBodyBuilder::fixed()
                .position(Vec3::new(5.0, 0.0, 0.0))
                .shape(Shape::cuboid(Vec3::splat(0.5)))
                .build(),
        )
        .unwrap();
    let query = RaycastQuery::new(Vec3::ZERO, Vec3::X, 100.0);
    assert_relative_eq!(scene.raycast(&query).unwrap().distance, 4.5, epsilon = 1e-4);

    scene
        .set_body_transform(
            wall,
            Transform::from_position_rotation(Vec3::new(8.0, 0.0, 0.0), Quat::IDENTITY),
        )
        .unwrap();
    assert_relative_eq!(scene.raycast(&query).unwrap().distance, 7.5, epsilon = 1e-4);
}

#[test]
fn removed_body_is_unknown_afterwards() {
    let mut scene = make_scene();
    let body = scene
        .add_body(RigidBodyBuilder::dynamic().shape(Shape::sphere(0.5)).build())
        .unwrap();
    let removed = scene.remove_body(body).unwrap();
    assert_eq!(removed.id, body);
    assert!(scene.body(body).is_none());
    assert!(scene.push_body(body).is_err());
    assert_eq!(scene.kernel().body_count(), 0);
}

#[test]
fn invalid_shape_is_rejected() {
    let mut scene = make_scene();
    let result = scene.add_body(RigidBodyBuilder::dynamic().shape(Shape::sphere(-1.0)).build());
    assert!(result.is_err());
    assert_eq!(scene.body_count(), 0);
}

#[test]
fn random_lifecycle_keeps_dictionary_consistent() {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let mut scene = make_scene();
    let mesh = quad_mesh();
    let mut bodies = Vec::new();

    for i in 0..24 {
        let is_static = i % 3 == 0;
        let mut builder = if is_static {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic()
        };
        builder = builder
            .position(Vec3::new(i as f32 * 3.0, 0.0, 0.0))
            .shape(Shape::sphere(0.4));
        if i % 2 == 0 {
            builder = builder.shape(
                Shape::cuboid(Vec3::splat(0.2))
                    .with_local(Transform::from_position(Vec3::new(0.0, 0.6, 0.0))),
            );
        }
        if is_static && i % 6 == 0 {
            builder = builder.shape(Shape::mesh(mesh.clone()));
        }
        bodies.push(scene.add_body(builder.build()).unwrap());
    }

    for _ in 0..400 {
        let body = bodies[rng.gen_range(0..bodies.len())];
        match rng.gen_range(0..5) {
            0 => scene.push_body(body).unwrap(),
            1 => scene.pop_body(body).unwrap(),
            2 => {
                let count = rng.gen_range(0..3);
                let shapes = (0..count)
                    .map(|k| {
                        Shape::sphere(0.2).with_local(Transform::from_position(Vec3::new(
                            k as f32 * 0.5,
                            0.0,
                            0.0,
                        )))
                    })
                    .collect();
                scene.set_shapes(body, shapes).unwrap();
            }
            3 => {
                scene.step();
            }
            _ => {
                let x = rng.gen_range(-50.0..50.0);
                scene
                    .set_body_transform(body, Transform::from_position(Vec3::new(x, 0.0, 0.0)))
                    .unwrap();
            }
        }
        assert_eq!(scene.dictionary_len(), scene.bound_shape_count());
    }

    for body in &bodies {
        scene.pop_body(*body).unwrap();
    }
    assert_eq!(scene.dictionary_len(), 0);
    assert_eq!(scene.kernel().body_count(), 0);
    assert_eq!(scene.kernel().geom_count(), 1);
    assert_eq!(scene.cached_mesh_count(), 0);
}
