use std::sync::Arc;

use approx::assert_relative_eq;
use glam::{Quat, Vec3};
use kinetic_bridge::{
    core::{RigidBodyBuilder, Shape, Transform, TriangleMesh},
    kernel::ReferenceKernel,
    Aabb, RaycastQuery, Scene, SceneConfig, VolumeQuery,
};

fn make_scene() -> Scene {
    let config = SceneConfig {
        gravity: Vec3::ZERO,
        ..SceneConfig::default()
    };
    Scene::new(ReferenceKernel::new(), config).expect("valid config")
}

fn wall_at(scene: &mut Scene, x: f32) -> kinetic_bridge::BodyId {
    scene
        .add_body(
            RigidBodyBuilder::fixed()
                .position(Vec3::new(x, 0.0, 0.0))
                .shape(Shape::cuboid(Vec3::splat(0.5)))
                .build(),
        )
        .unwrap()
}

#[test]
fn nearest_hit_reports_distance_and_normal() {
    let mut scene = make_scene();
    let far = wall_at(&mut scene, 9.0);
    let near = wall_at(&mut scene, 5.0);

    let hit = scene
        .raycast(&RaycastQuery::new(Vec3::ZERO, Vec3::X, 100.0))
        .expect("wall in the way");
    assert_eq!(hit.body, near);
    assert_ne!(hit.body, far);
    assert_eq!(hit.shape, 0);
    assert_relative_eq!(hit.distance, 4.5, epsilon = 1e-4);
    assert_relative_eq!(hit.position.x, 4.5, epsilon = 1e-4);
    assert_relative_eq!(hit.normal.x, -1.0, epsilon = 1e-4);
    assert!(hit.triangle.is_none());
}

#[test]
fn ray_respects_length_and_degenerate_input() {
    let mut scene = make_scene();
    wall_at(&mut scene, 5.0);

    assert!(scene
        .raycast(&RaycastQuery::new(Vec3::ZERO, Vec3::X, 4.0))
        .is_none());
    assert!(scene
        .raycast(&RaycastQuery::new(Vec3::ZERO, Vec3::ZERO, 10.0))
        .is_none());
    assert!(scene
        .raycast(&RaycastQuery::new(Vec3::ZERO, Vec3::X, 0.0))
        .is_none());
    // Direction need not be unit length.
    let hit = scene
        .raycast(&RaycastQuery::new(Vec3::ZERO, Vec3::new(3.0, 0.0, 0.0), 10.0))
        .unwrap();
    assert_relative_eq!(hit.distance, 4.5, epsilon = 1e-4);
}

#[test]
fn piercing_ray_returns_every_hit_sorted() {
    let mut scene = make_scene();
    let c = wall_at(&mut scene, 9.0);
    let a = wall_at(&mut scene, 3.0);
    let b = wall_at(&mut scene, 6.0);

    let hits = scene.raycast_all(&RaycastQuery::new(Vec3::ZERO, Vec3::X, 100.0));
    let order: Vec<_> = hits.iter().map(|h| h.body).collect();
    assert_eq!(order, vec![a, b, c]);
    let distances: Vec<f32> = hits.iter().map(|h| h.distance).collect();
    for (got, want) in distances.iter().zip([2.5, 5.5, 8.5]) {
        assert_relative_eq!(*got, want, epsilon = 1e-4);
    }
}

#[test]
fn mask_filters_by_shape_category() {
    let mut scene = make_scene();
    scene
        .add_body(
            RigidBodyBuilder::fixed()
                .position(Vec3::new(3.0, 0.0, 0.0))
                .shape(Shape::cuboid(Vec3::splat(0.5)).with_filter(0b10, u32::MAX))
                .build(),
        )
        .unwrap();
    let target = wall_at(&mut scene, 6.0);

    let query = RaycastQuery::new(Vec3::ZERO, Vec3::X, 100.0).with_mask(0b01);
    let hits = scene.raycast_all(&query);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].body, target);
}

#[test]
fn popped_bodies_are_invisible_to_queries() {
    let mut scene = make_scene();
    let wall = wall_at(&mut scene, 5.0);
    scene.pop_body(wall).unwrap();
    assert!(scene
        .raycast(&RaycastQuery::new(Vec3::ZERO, Vec3::X, 100.0))
        .is_none());
    scene.push_body(wall).unwrap();
    assert!(scene
        .raycast(&RaycastQuery::new(Vec3::ZERO, Vec3::X, 100.0))
        .is_some());
}

#[test]
fn ray_reports_offset_shape_index() {
    let mut scene = make_scene();
    let body = scene
        .add_body(
            RigidBodyBuilder::fixed()
                .shape(Shape::sphere(0.5))
                .shape(
                    Shape::cuboid(Vec3::splat(0.5))
                        .with_local(Transform::from_position(Vec3::new(0.0, 5.0, 0.0))),
                )
                .build(),
        )
        .unwrap();

    let hit = scene
        .raycast(&RaycastQuery::new(
            Vec3::new(-10.0, 5.0, 0.0),
            Vec3::X,
            100.0,
        ))
        .unwrap();
    assert_eq!(hit.body, body);
    assert_eq!(hit.shape, 1);
    assert_relative_eq!(hit.distance, 9.5, epsilon = 1e-4);
}

#[test]
fn mesh_hit_reports_triangle_index() {
    let mut scene = make_scene();
    let mesh = Arc::new(
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
    );
    let floor = scene
        .add_body(RigidBodyBuilder::fixed().shape(Shape::mesh(mesh)).build())
        .unwrap();

    let down = |x: f32, z: f32| RaycastQuery::new(Vec3::new(x, 1.0, z), -Vec3::Y, 10.0);

    let hit = scene.raycast(&down(0.2, 0.8)).unwrap();
    assert_eq!(hit.body, floor);
    assert_eq!(hit.triangle, Some(1));
    assert_relative_eq!(hit.distance, 1.0, epsilon = 1e-4);

    let hit = scene.raycast(&down(0.8, 0.2)).unwrap();
    assert_eq!(hit.triangle, Some(0));
}

#[test]
fn volume_cast_reports_each_body_once() {
    let mut scene = make_scene();
    let cluster = scene
        .add_body(
            RigidBodyBuilder::fixed()
                .shape(Shape::sphere(0.4))
                .shape(Shape::sphere(0.4).with_local(Transform::from_position(Vec3::X)))
                .shape(Shape::sphere(0.4).with_local(Transform::from_position(-Vec3::X)))
                .build(),
        )
        .unwrap();
    let loner = scene
        .add_body(
            RigidBodyBuilder::dynamic()
                .position(Vec3::new(0.0, 0.0, 1.5))
                .shape(Shape::sphere(0.4))
                .build(),
        )
        .unwrap();
    wall_at(&mut scene, 20.0);

    let query = VolumeQuery::Box {
        center: Vec3::ZERO,
        half_extents: Vec3::new(2.0, 1.0, 2.0),
        rotation: Quat::IDENTITY,
    };
    let found = scene.volume_cast(&query, u32::MAX);
    assert_eq!(found.len(), 2);
    assert!(found.contains(&cluster));
    assert!(found.contains(&loner));

    // The transient query geometry is gone again.
    let geoms = scene.kernel().geom_count();
    scene.volume_cast(&query, u32::MAX);
    assert_eq!(scene.kernel().geom_count(), geoms);
}

#[test]
fn volume_cast_shapes_and_mask() {
    let mut scene = make_scene();
    let near = wall_at(&mut scene, 2.0);
    let far = wall_at(&mut scene, 6.0);

    let sphere = VolumeQuery::Sphere {
        center: Vec3::ZERO,
        radius: 1.8,
    };
    assert_eq!(scene.volume_cast(&sphere, u32::MAX), vec![near]);

    let capsule = VolumeQuery::Capsule {
        start: Vec3::ZERO,
        end: Vec3::new(6.0, 0.0, 0.0),
        radius: 0.2,
    };
    let mut hit = scene.volume_cast(&capsule, u32::MAX);
    hit.sort_by_key(|id| id.index());
    let mut expected = vec![near, far];
    expected.sort_by_key(|id| id.index());
    assert_eq!(hit, expected);

    let bounds = VolumeQuery::Aabb(Aabb::new(Vec3::new(5.0, -1.0, -1.0), Vec3::new(7.0, 1.0, 1.0)));
    assert_eq!(scene.volume_cast(&bounds, u32::MAX), vec![far]);
    assert!(scene.volume_cast(&bounds, 0).is_empty());
}
