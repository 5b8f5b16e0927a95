//! Scene object model: game objects in a generation-checked arena, typed
//! component tables, and behaviours with lifecycle hooks.
//!
//! Built-in data components (mesh, collider, rigidbody, camera, animator)
//! live in one table per type, so typed lookup is a single keyed access.
//! Behaviours are trait objects indexed by owner and concrete type.
//!
//! # Invariants
//! - Every component belongs to exactly one live game object.
//! - Destroying an object destroys its subtree and fires `on_destroy` for
//!   each of their behaviours.
//! - Iteration order is object creation order.

mod animation;
mod behaviour;
mod components;
mod world;

pub use animation::{AnimationClip, AnimationError, Animator};
pub use behaviour::{AsAny, Behaviour, BehaviourContext, ContactEvent, ContactKind};
pub use components::{Camera, Collider, ColliderShape, MeshComponent, Projection, Rigidbody};
pub use world::{Component, ComponentStorage, GameObject, World};

pub fn crate_info() -> &'static str {
    "kestrel-ecs v0.1.0"
}
