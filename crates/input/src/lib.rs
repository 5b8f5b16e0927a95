//! Input state for the kestrel engine.
//!
//! The host feeds window events into an [`InputState`]; gameplay code reads
//! it during the frame. Calling [`InputState::end_frame`] after each frame
//! turns "down" into "held" so pressed/released edges last exactly one frame.
//!
//! # Invariants
//! - A key is `pressed` only on the first frame it is down.
//! - A key is `released` only on the first frame it is up after being down.

mod state;

pub use state::InputState;
pub use winit::event::MouseButton;
pub use winit::keyboard::KeyCode;

pub fn crate_info() -> &'static str {
    "kestrel-input v0.1.0"
}
