//! Collision plumbing between engine shapes and kernel geometry: shape binding,
//! event extraction, query types and continuous collision.

pub mod binding;
pub mod ccd;
pub mod events;
pub mod queries;

pub use binding::{GeomData, MeshCache, ShapeDictionary, ShapeRef};
pub use ccd::CcdState;
pub use events::CollisionEvent;
pub use queries::{RayHit, RaycastQuery, VolumeQuery};
