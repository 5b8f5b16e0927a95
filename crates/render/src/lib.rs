//! Renderer-agnostic frame pipeline.
//!
//! A frame is described by a [`FrameInput`]: a read-only view of the world,
//! the mesh library, camera matrices and the physics interpolation factor.
//! Backends implement [`FrameRenderer`]. This crate holds the parts every
//! backend shares: the ordered pass plan, draw-list extraction, silhouette
//! ids, the outline edge test and the presentation zoom mapping.
//!
//! # Invariants
//! - Renderers never mutate the world.
//! - Passes run in the order silhouette, main, outline, debug, ui, blit.
//! - Draw order and silhouette ids follow object creation order.

mod camera;
mod draw;
mod outline;
mod plan;
mod renderer;
mod settings;
mod ui;
mod zoom;

pub use camera::{CameraMatrices, camera_matrices, find_main_camera};
pub use draw::{DrawItem, MAX_SILHOUETTE_IDS, collect_draw_items, silhouette_id};
pub use outline::{
    NEIGHBOURS, OutlineParams, SilhouetteImage, SilhouetteTexel, edge_mask, is_edge,
    neighbour_offsets,
};
pub use plan::{PassKind, PassPlan, PlanError, RenderTarget};
pub use renderer::{
    FrameInput, FrameOutcome, FrameRecord, FrameRenderer, RecordingRenderer, UiCallback,
};
pub use settings::RenderSettings;
pub use ui::fit_ui_input;
pub use zoom::ZoomState;

pub fn crate_info() -> &'static str {
    "kestrel-render v0.1.0"
}
