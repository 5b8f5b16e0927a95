//! Physics for the kestrel engine.
//!
//! [`CollisionSystem`] owns a rapier world and mirrors the scene's
//! [`Collider`](kestrel_ecs::Collider) and [`Rigidbody`](kestrel_ecs::Rigidbody)
//! components into it. Each fixed step pushes gameplay state in, advances the
//! simulation in substeps, pulls dynamic results back out and reports
//! contact transitions as [`ContactEvent`](kestrel_ecs::ContactEvent)s.
//!
//! # Invariants
//! - One body per registered object; bodies of destroyed objects are
//!   removed at the next step.
//! - Two bodies interact only if each one's layer is in the other's mask.
//! - Only dynamic bodies write positions back to the world.

mod contacts;
mod debug;
mod shapes;
mod system;

pub use contacts::GROUND_COS;
pub use debug::{MOVING_COLOR, STATIC_COLOR};
pub use system::{CollisionSystem, MotionType, RaycastHit};

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Global simulation settings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    pub gravity: Vec3,
    /// Solver substeps per fixed step.
    pub substeps: u32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, 0.0, -30.0),
            substeps: 4,
        }
    }
}

pub fn crate_info() -> &'static str {
    "kestrel-physics v0.1.0"
}
