use std::collections::HashMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box used for mesh bounds and AABB queries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self { min, max }
    }

    pub fn empty() -> Self {
        Self {
            min: Vec3::splat(f32::INFINITY),
            max: Vec3::splat(f32::NEG_INFINITY),
        }
    }

    pub fn extend(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn from_points(points: &[Vec3]) -> Self {
        let mut bounds = Self::empty();
        for &p in points {
            bounds.extend(p);
        }
        bounds
    }

    pub fn is_empty(&self) -> bool {
        self.min.cmpgt(self.max).any()
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    /// Half extents.
    pub fn extent(&self) -> Vec3 {
        if self.is_empty() {
            return Vec3::ZERO;
        }
        (self.max - self.min) * 0.5
    }

    pub fn volume(&self) -> f32 {
        let size = self.extent() * 2.0;
        size.x * size.y * size.z
    }
}

/// Triangle mesh shared by mesh shapes.
///
/// Bodies referencing the same `Arc<TriangleMesh>` share one cooked kernel
/// mesh per scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriangleMesh {
    pub vertices: Vec<Vec3>,
    pub triangles: Vec<[u32; 3]>,
    pub bounds: Aabb,
}

impl TriangleMesh {
    pub fn builder(vertices: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> MeshBuilder {
        MeshBuilder::new(vertices, triangles)
    }

    /// Enclosed volume from the divergence theorem; open meshes fall back to
    /// their bounding box.
    pub fn volume(&self) -> f32 {
        let signed: f32 = self
            .triangles
            .iter()
            .filter_map(|[a, b, c]| {
                let a = self.vertices.get(*a as usize)?;
                let b = self.vertices.get(*b as usize)?;
                let c = self.vertices.get(*c as usize)?;
                Some(a.dot(b.cross(*c)) / 6.0)
            })
            .sum();
        let volume = signed.abs();
        if volume > f32::EPSILON {
            volume
        } else {
            self.bounds.volume()
        }
    }
}

/// Cooks triangle meshes from raw vertex and index buffers.
#[derive(Debug, Clone)]
pub struct MeshBuilder {
    vertices: Vec<Vec3>,
    triangles: Vec<[u32; 3]>,
}

impl MeshBuilder {
    pub fn new(vertices: Vec<Vec3>, triangles: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            triangles,
        }
    }

    /// Deduplicates vertices using a quantized grid for stability.
    pub fn weld_vertices(mut self, epsilon: f32) -> Self {
        if epsilon <= 0.0 || self.vertices.is_empty() {
            return self;
        }

        let inv = 1.0 / epsilon;
        let mut map: HashMap<(i32, i32, i32), u32> = HashMap::new();
        let mut welded: Vec<Vec3> = Vec::new();
        let mut remap: Vec<u32> = Vec::with_capacity(self.vertices.len());

        for v in &self.vertices {
            let key = (
                (v.x * inv).round() as i32,
                (v.y * inv).round() as i32,
                (v.z * inv).round() as i32,
            );
            let index = *map.entry(key).or_insert_with(|| {
                let idx = welded.len() as u32;
                welded.push(*v);
                idx
            });
            remap.push(index);
        }

        for tri in &mut self.triangles {
            for corner in tri.iter_mut() {
                if let Some(mapped) = remap.get(*corner as usize) {
                    *corner = *mapped;
                }
            }
        }

        self.vertices = welded;
        self
    }

    /// Recenters vertices around their centroid.
    pub fn recenter(mut self) -> Self {
        if self.vertices.is_empty() {
            return self;
        }
        let centroid: Vec3 =
            self.vertices.iter().copied().sum::<Vec3>() / self.vertices.len() as f32;
        for vertex in &mut self.vertices {
            *vertex -= centroid;
        }
        self
    }

    /// Drops triangles that reference missing vertices or have zero area.
    pub fn drop_degenerate(mut self) -> Self {
        let vertices = &self.vertices;
        self.triangles.retain(|tri| {
            let corners: Option<Vec<Vec3>> = tri
                .iter()
                .map(|i| vertices.get(*i as usize).copied())
                .collect();
            corners.is_some_and(|c| (c[1] - c[0]).cross(c[2] - c[0]).length_squared() > 1e-12)
        });
        self
    }

    pub fn build(self) -> TriangleMesh {
        let bounds = Aabb::from_points(&self.vertices);
        TriangleMesh {
            vertices: self.vertices,
            triangles: self.triangles,
            bounds,
        }
    }
}
