use crate::outline::OutlineParams;
use glam::Vec4;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Renderer configuration. The game is drawn at `width x height` and scaled
/// to the window by the presentation blit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    /// Outline sampling radius in texels.
    pub outline_width: f32,
    pub depth_threshold: f32,
    pub outline_color: Vec4,
    pub clear_color: Vec4,
    /// Load shaders from this directory instead of the built-in sources.
    pub shader_dir: Option<PathBuf>,
    pub log_pass_timings: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 640,
            height: 360,
            outline_width: 1.0,
            depth_threshold: 0.003,
            outline_color: Vec4::new(0.02, 0.02, 0.02, 1.0),
            clear_color: Vec4::new(0.00001, 0.0003, 0.0005, 1.0),
            shader_dir: None,
            log_pass_timings: false,
        }
    }
}

impl RenderSettings {
    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    pub fn outline(&self) -> OutlineParams {
        OutlineParams {
            width: self.outline_width,
            depth_threshold: self.depth_threshold,
            color: self.outline_color,
        }
    }
}
