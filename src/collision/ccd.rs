//! Ray-based continuous collision correction.

use glam::Vec3;

use crate::config::{CCD_MESH_FALLBACK_RADIUS, CCD_MOVEMENT_EPSILON, CCD_RADIUS_FACTOR};
use crate::core::Shape;

/// Per-body CCD bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CcdState {
    /// Cached swept radius, cleared whenever the shapes change.
    pub radius: Option<f32>,
    /// Position at the last snapshot.
    pub previous: Vec3,
}

impl CcdState {
    pub fn invalidate(&mut self) {
        self.radius = None;
    }

    pub fn radius_for(&mut self, shapes: &[Shape]) -> f32 {
        *self.radius.get_or_insert_with(|| swept_radius(shapes))
    }
}

/// Conservative radius: a fraction of the smallest extent over all shapes.
pub fn swept_radius(shapes: &[Shape]) -> f32 {
    shapes
        .iter()
        .map(|shape| {
            shape
                .min_extent()
                .map_or(CCD_MESH_FALLBACK_RADIUS, |extent| extent * CCD_RADIUS_FACTOR)
        })
        .reduce(f32::min)
        .unwrap_or(CCD_MESH_FALLBACK_RADIUS)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CcdRay {
    pub origin: Vec3,
    pub direction: Vec3,
    pub length: f32,
}

/// Ray from the previous position through the new one, extended by the swept
/// radius. `None` when the body barely moved.
pub fn sweep_ray(previous: Vec3, current: Vec3, radius: f32) -> Option<CcdRay> {
    let delta = current - previous;
    let moved = delta.length();
    if !(moved > CCD_MOVEMENT_EPSILON) {
        return None;
    }
    Some(CcdRay {
        origin: previous,
        direction: delta / moved,
        length: moved + radius,
    })
}

/// Position clamped against a hit: backed off by the radius when there is
/// room, otherwise the hit point itself.
pub fn clamp_to_hit(ray: &CcdRay, distance: f32, hit_point: Vec3, radius: f32) -> Vec3 {
    if distance > radius {
        ray.origin + ray.direction * (distance - radius)
    } else {
        hit_point
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn radius_uses_smallest_extent() {
        let shapes = [Shape::cuboid(Vec3::new(1.0, 0.2, 1.0)), Shape::sphere(0.5)];
        assert_relative_eq!(swept_radius(&shapes), 0.18, epsilon = 1e-6);
    }

    #[test]
    fn tiny_movement_skips_the_ray() {
        assert!(sweep_ray(Vec3::ZERO, Vec3::splat(1e-6), 0.5).is_none());
        let ray = sweep_ray(Vec3::ZERO, Vec3::new(0.0, 0.0, 3.0), 0.5).expect("ray");
        assert_relative_eq!(ray.length, 3.5);
    }

    #[test]
    fn clamp_backs_off_by_radius() {
        let ray = sweep_ray(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), 0.5).expect("ray");
        let clamped = clamp_to_hit(&ray, 4.0, Vec3::new(4.0, 0.0, 0.0), 0.5);
        assert_relative_eq!(clamped.x, 3.5);
        let touching = clamp_to_hit(&ray, 0.2, Vec3::new(0.2, 0.0, 0.0), 0.5);
        assert_relative_eq!(touching.x, 0.2);
    }
}
