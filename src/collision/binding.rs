//! Binding of engine shapes to kernel geometry.
//!
//! Every geometry inserted in a scene's space carries a dictionary index as
//! user data, so kernel results resolve back to `(body, shape)` in O(1).

use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{BodyId, Shape, ShapeKind, Transform, TriangleMesh};
use crate::kernel::{BodyHandle, GeomDesc, GeomHandle, Kernel, Scoped, SpaceHandle, TriMeshHandle};

/// Engine shape a kernel geometry stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ShapeRef {
    pub body: BodyId,
    pub shape: usize,
}

/// Dense slab of [`ShapeRef`]s with index reuse.
#[derive(Debug, Default)]
pub struct ShapeDictionary {
    entries: Vec<Option<ShapeRef>>,
    free: Vec<u32>,
    live: usize,
}

impl ShapeDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, entry: ShapeRef) -> u32 {
        self.live += 1;
        if let Some(index) = self.free.pop() {
            self.entries[index as usize] = Some(entry);
            return index;
        }
        self.entries.push(Some(entry));
        (self.entries.len() - 1) as u32
    }

    pub fn remove(&mut self, index: u32) -> Option<ShapeRef> {
        let removed = self.entries.get_mut(index as usize).and_then(Option::take);
        match removed {
            Some(_) => {
                self.live -= 1;
                self.free.push(index);
            }
            None => log::error!("shape dictionary has no entry {index} to remove"),
        }
        removed
    }

    pub fn get(&self, index: u32) -> Option<ShapeRef> {
        self.entries.get(index as usize).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, ShapeRef)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.map(|entry| (i as u32, entry)))
    }
}

/// Identity of a source mesh: the address of its shared allocation.
pub type MeshKey = usize;

struct MeshEntry {
    /// Keeps the allocation, and therefore the key, alive.
    _mesh: Arc<TriangleMesh>,
    handle: TriMeshHandle,
    refs: usize,
}

/// Cooked kernel meshes shared by every binding of the same source mesh.
#[derive(Default)]
pub struct MeshCache {
    entries: HashMap<MeshKey, MeshEntry>,
}

impl MeshCache {
    pub fn key(mesh: &Arc<TriangleMesh>) -> MeshKey {
        Arc::as_ptr(mesh) as usize
    }

    pub fn acquire<K: Kernel + ?Sized>(
        &mut self,
        kernel: &mut K,
        mesh: &Arc<TriangleMesh>,
    ) -> (MeshKey, TriMeshHandle) {
        let key = Self::key(mesh);
        let entry = self.entries.entry(key).or_insert_with(|| {
            log::debug!(
                "cooking mesh {key:#x} ({} triangles)",
                mesh.triangles.len()
            );
            MeshEntry {
                _mesh: Arc::clone(mesh),
                handle: kernel.trimesh_create(&mesh.vertices, &mesh.triangles),
                refs: 0,
            }
        });
        entry.refs += 1;
        (key, entry.handle)
    }

    pub fn release<K: Kernel + ?Sized>(&mut self, kernel: &mut K, key: MeshKey) {
        let Some(entry) = self.entries.get_mut(&key) else {
            log::error!("mesh cache released unknown mesh {key:#x}");
            return;
        };
        match entry.refs.checked_sub(1) {
            Some(0) => {
                let handle = entry.handle;
                self.entries.remove(&key);
                kernel.trimesh_destroy(handle);
            }
            Some(refs) => entry.refs = refs,
            None => log::error!("mesh cache reference count underflow for {key:#x}"),
        }
    }

    pub fn refs(&self, key: MeshKey) -> usize {
        self.entries.get(&key).map_or(0, |e| e.refs)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Destroys every cooked mesh regardless of references.
    pub fn clear<K: Kernel + ?Sized>(&mut self, kernel: &mut K) {
        for (key, entry) in self.entries.drain() {
            if entry.refs > 0 {
                log::error!("mesh {key:#x} still has {} references at teardown", entry.refs);
            }
            kernel.trimesh_destroy(entry.handle);
        }
    }
}

/// Kernel resources owned by one bound shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeomData {
    /// Geometry inserted in the space; the offset wrapper when there is one.
    pub geom: GeomHandle,
    /// Geometry placed inside the offset wrapper.
    pub offset_inner: Option<GeomHandle>,
    pub mesh: Option<MeshKey>,
    pub dictionary_index: u32,
    pub shape_index: usize,
}

/// Where a shape is being bound.
pub struct BindTarget<'a> {
    pub space: SpaceHandle,
    pub body_id: BodyId,
    /// Kernel body for dynamic bodies; static shapes are placed in world space.
    pub body: Option<BodyHandle>,
    pub transform: &'a Transform,
}

fn geom_desc<K: Kernel + ?Sized>(
    kernel: &mut K,
    meshes: &mut MeshCache,
    shape: &Shape,
) -> (GeomDesc, Option<MeshKey>) {
    match &shape.kind {
        ShapeKind::Box { half_extents } => (
            GeomDesc::Box {
                half_extents: *half_extents,
            },
            None,
        ),
        ShapeKind::Sphere { radius } => (GeomDesc::Sphere { radius: *radius }, None),
        ShapeKind::Capsule { radius, length } => (
            GeomDesc::Capsule {
                radius: *radius,
                length: *length,
            },
            None,
        ),
        ShapeKind::Cylinder { radius, length } => (
            GeomDesc::Cylinder {
                radius: *radius,
                length: *length,
            },
            None,
        ),
        ShapeKind::Mesh(mesh) => {
            let (key, data) = meshes.acquire(kernel, mesh);
            (GeomDesc::TriMesh { data }, Some(key))
        }
    }
}

/// Creates the kernel geometry for one shape and registers it in the dictionary.
///
/// Dynamic bodies cannot carry mesh shapes; those are skipped with a warning.
pub fn bind_shape<K: Kernel + ?Sized>(
    kernel: &mut K,
    dictionary: &mut ShapeDictionary,
    meshes: &mut MeshCache,
    target: &BindTarget<'_>,
    shape_index: usize,
    shape: &Shape,
) -> Option<GeomData> {
    if shape.is_mesh() && target.body.is_some() {
        log::warn!(
            "body {:?}: mesh shape {shape_index} ignored, meshes are static-only",
            target.body_id
        );
        return None;
    }

    let (desc, mesh) = geom_desc(kernel, meshes, shape);

    let (geom, offset_inner) = match target.body {
        Some(body) if !shape.local.is_identity() => {
            let mut inner = Scoped::new(kernel, |k| k.geom_create(None, &desc));
            let inner_geom = inner.handle();
            inner
                .kernel()
                .geom_set_position(inner_geom, shape.local.position);
            inner
                .kernel()
                .geom_set_rotation(inner_geom, shape.local.rotation);
            let outer = inner
                .kernel()
                .geom_create_transform(Some(target.space), inner_geom);
            inner.kernel().geom_set_body(outer, Some(body));
            (outer, Some(inner.commit()))
        }
        Some(body) => {
            let geom = kernel.geom_create(Some(target.space), &desc);
            kernel.geom_set_body(geom, Some(body));
            (geom, None)
        }
        None => {
            let geom = kernel.geom_create(Some(target.space), &desc);
            let world = target.transform.combine(&shape.local);
            kernel.geom_set_position(geom, world.position);
            kernel.geom_set_rotation(geom, world.rotation);
            (geom, None)
        }
    };

    kernel.geom_set_filter(geom, shape.filter.category, shape.filter.collide);
    kernel.geom_set_surface(geom, shape.material.friction, shape.material.restitution);
    let dictionary_index = dictionary.insert(ShapeRef {
        body: target.body_id,
        shape: shape_index,
    });
    kernel.geom_set_user_data(geom, dictionary_index);

    Some(GeomData {
        geom,
        offset_inner,
        mesh,
        dictionary_index,
        shape_index,
    })
}

/// Releases everything [`bind_shape`] created.
pub fn unbind_shape<K: Kernel + ?Sized>(
    kernel: &mut K,
    dictionary: &mut ShapeDictionary,
    meshes: &mut MeshCache,
    data: &GeomData,
) {
    dictionary.remove(data.dictionary_index);
    kernel.geom_destroy(data.geom);
    if let Some(inner) = data.offset_inner {
        kernel.geom_destroy(inner);
    }
    if let Some(key) = data.mesh {
        meshes.release(kernel, key);
    }
}

/// Moves a static shape's geometry after its body was moved.
pub fn place_static<K: Kernel + ?Sized>(
    kernel: &mut K,
    data: &GeomData,
    body_transform: &Transform,
    shape: &Shape,
) {
    let world = body_transform.combine(&shape.local);
    kernel.geom_set_position(data.geom, world.position);
    kernel.geom_set_rotation(data.geom, world.rotation);
}

/// Maps a kernel geometry back to its engine shape.
pub fn resolve<K: Kernel + ?Sized>(
    kernel: &K,
    dictionary: &ShapeDictionary,
    geom: GeomHandle,
) -> Option<ShapeRef> {
    kernel
        .geom_user_data(geom)
        .and_then(|index| dictionary.get(index))
}
