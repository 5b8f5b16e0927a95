//! Developer tooling: scene inspector and render pass timings.
//!
//! # Invariants
//! - Tools only read engine state.

mod inspector;
mod timings;

pub use inspector::{ObjectInfo, SceneInspector, SceneSummary};
pub use timings::{PassTimings, TimingReport};

pub fn crate_info() -> &'static str {
    "kestrel-tools v0.1.0"
}
