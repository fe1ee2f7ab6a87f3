use std::collections::HashSet;

use super::Scene;
use crate::collision::binding::resolve;
use crate::collision::{RayHit, RaycastQuery, VolumeQuery};
use crate::core::BodyId;
use crate::kernel::{Kernel, RawContact, Scoped};

impl<K: Kernel> Scene<K> {
    /// Nearest hit along the ray, if any.
    pub fn raycast(&mut self, query: &RaycastQuery) -> Option<RayHit> {
        self.ray_hits(query)
            .into_iter()
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    /// Every hit along the ray, nearest first.
    pub fn raycast_all(&mut self, query: &RaycastQuery) -> Vec<RayHit> {
        let mut hits = self.ray_hits(query);
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// Bodies overlapping the volume, each reported once in first-contact order.
    pub fn volume_cast(&mut self, query: &VolumeQuery, mask: u32) -> Vec<BodyId> {
        let (desc, position, rotation) = query.geom();
        let space = self.space;
        let contacts = {
            let mut transient = Scoped::new(&mut self.kernel, |k| k.geom_create(None, &desc));
            let geom = transient.handle();
            transient.kernel().geom_set_position(geom, position);
            transient.kernel().geom_set_rotation(geom, rotation);
            transient
                .kernel()
                .collide_with_space(geom, space, mask, usize::MAX)
        };

        let mut seen = HashSet::new();
        contacts
            .iter()
            .filter_map(|c| resolve(&self.kernel, &self.dictionary, c.geom))
            .map(|r| r.body)
            .filter(|body| seen.insert(*body))
            .collect()
    }

    fn ray_hits(&mut self, query: &RaycastQuery) -> Vec<RayHit> {
        let direction = query.direction.normalize_or_zero();
        if direction == glam::Vec3::ZERO || !(query.max_distance > 0.0) {
            return Vec::new();
        }
        self.kernel
            .geom_ray_set(self.ray, query.origin, direction, query.max_distance);
        let contacts: Vec<RawContact> =
            self.kernel
                .collide_with_space(self.ray, self.space, query.mask, usize::MAX);
        contacts
            .iter()
            .filter_map(|c| {
                let target = resolve(&self.kernel, &self.dictionary, c.geom)?;
                Some(RayHit {
                    body: target.body,
                    shape: target.shape,
                    position: c.position,
                    normal: c.normal,
                    distance: c.depth,
                    triangle: c.triangle,
                })
            })
            .collect()
    }
}
