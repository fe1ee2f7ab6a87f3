//! Body dynamics handed to the kernel: mass aggregation, damping, sleep
//! thresholds and joint parameter mapping.

pub mod damping;
pub mod joint_params;
pub mod mass;
pub mod sleep;

pub use damping::{damping_forces, DampingForces};
pub use mass::{aggregate, MassTensor};
pub use sleep::auto_disable_for;
