//! Shared types for the kestrel engine.
//!
//! # Invariants
//! - World transform = parent world transform * local transform.
//! - Collision filtering is a symmetric AND of layer and mask.

mod layers;
mod types;

pub use layers::{CollisionLayers, should_collide};
pub use types::{BehaviourId, DebugLine, ObjectId, Transform};

pub fn crate_info() -> &'static str {
    "kestrel-common v0.1.0"
}
