use glam::{UVec2, Vec2};

/// Presentation zoom: the blit samples a window of `1 / zoom` of the
/// composed frame around `center` (in UV space).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomState {
    zoom: f32,
    center: Vec2,
}

impl Default for ZoomState {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            center: Vec2::splat(0.5),
        }
    }
}

impl ZoomState {
    pub fn new(zoom: f32, center: Vec2) -> Self {
        let mut state = Self::default();
        state.set_zoom(zoom);
        state.set_center(center);
        state
    }

    pub fn zoom(&self) -> f32 {
        self.zoom
    }

    pub fn center(&self) -> Vec2 {
        self.center
    }

    /// Set the zoom level. Non-positive or non-finite values are ignored.
    pub fn set_zoom(&mut self, zoom: f32) {
        if zoom.is_finite() && zoom > 0.0 {
            self.zoom = zoom;
        } else {
            tracing::warn!(zoom, "ignoring invalid zoom level");
        }
    }

    pub fn set_center(&mut self, center: Vec2) {
        self.center = center;
    }

    /// The sampled UV rectangle as `(min, max)`, clamped to the frame.
    pub fn uv_window(&self) -> (Vec2, Vec2) {
        let half = Vec2::splat(0.5 / self.zoom);
        (
            (self.center - half).clamp(Vec2::ZERO, Vec2::ONE),
            (self.center + half).clamp(Vec2::ZERO, Vec2::ONE),
        )
    }

    /// Map an output UV to the UV sampled from the composed frame.
    pub fn sample_uv(&self, uv: Vec2) -> Vec2 {
        let (min, max) = self.uv_window();
        min + uv * (max - min)
    }

    /// Texel fetched for an output UV with nearest filtering.
    pub fn sample_texel(&self, uv: Vec2, size: UVec2) -> UVec2 {
        let texel = (self.sample_uv(uv) * size.as_vec2()).floor().as_uvec2();
        texel.min(size.saturating_sub(UVec2::ONE))
    }

    /// Uniform block layout `{zoom, cx, cy, pad}`.
    pub fn to_uniform(&self) -> [f32; 4] {
        [self.zoom, self.center.x, self.center.y, 0.0]
    }
}
