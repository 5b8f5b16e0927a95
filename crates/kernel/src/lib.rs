//! Frame orchestration for the kestrel engine.
//!
//! Each frame the [`FrameScheduler`] runs variable-rate game and behaviour
//! updates, then as many fixed physics steps as the [`FixedStepClock`]
//! holds, then hands an interpolated view of the scene to a
//! [`FrameRenderer`](kestrel_render::FrameRenderer). An [`Engine`] owns the
//! scheduler, the user's [`Game`] and the [`EngineContext`] that is passed
//! explicitly to every hook.
//!
//! # Invariants
//! - Frame order is: game update, behaviour updates, animators, fixed steps,
//!   render.
//! - Each fixed step snapshots simulated bodies before and after stepping;
//!   the renderer draws `lerp(previous, current, alpha)` with `alpha` in
//!   `[0, 1)`.
//! - A frame delta that is zero, negative or not finite is replaced by the
//!   fallback delta.
//! - Rendering never mutates the scene.

mod clock;
mod config;
mod context;
mod engine;
mod scene;
mod scheduler;

pub use clock::{FixedStepClock, TimeConfig};
pub use config::{ConfigError, EngineConfig, WindowConfig};
pub use context::EngineContext;
pub use engine::{Engine, Game};
pub use scene::{Scene, SceneScript};
pub use scheduler::{FrameReport, FrameScheduler};

pub fn crate_info() -> &'static str {
    "kestrel-kernel v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("kernel"));
    }
}
