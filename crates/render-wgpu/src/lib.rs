//! wgpu render backend for kestrel.
//!
//! Implements [`kestrel_render::FrameRenderer`] with six passes at a fixed
//! low render resolution: silhouette, main colour, outline composition,
//! collision debug lines, the egui overlay and the presentation blit.
//!
//! # Invariants
//! - The renderer never mutates world state.
//! - Offscreen targets keep the render resolution across window resizes.
//! - A shader that fails validation is an error at construction, never a
//!   panic mid-frame.

mod context;
mod meshes;
mod overlay;
mod pipelines;
mod renderer;
mod shaders;
mod targets;
mod uniforms;

pub use context::GpuContext;
pub use renderer::WgpuRenderer;
pub use shaders::ShaderLibrary;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("no compatible GPU adapter found")]
    Adapter,
    #[error("failed to create device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("failed to create surface: {0}")]
    Surface(#[from] wgpu::CreateSurfaceError),
    #[error("shader `{name}`: {message}")]
    Shader { name: String, message: String },
    #[error("unknown shader `{0}`")]
    ShaderNotFound(String),
}

pub fn crate_info() -> &'static str {
    "kestrel-render-wgpu v0.1.0"
}
