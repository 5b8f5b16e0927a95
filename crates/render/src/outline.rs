//! Edge detection over the silhouette buffer.
//!
//! The outline shader compares each pixel with eight neighbours spread evenly
//! on a circle of `width` texels. A pixel is an edge if any neighbour differs
//! in coverage by more than 0.5 or in depth by more than `depth_threshold`.
//! This module is the CPU reference of that test.

use glam::{IVec2, Vec2, Vec4};

pub const NEIGHBOURS: usize = 8;

/// Tunables for the outline composition pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlineParams {
    /// Sampling radius in texels.
    pub width: f32,
    pub depth_threshold: f32,
    pub color: Vec4,
}

impl Default for OutlineParams {
    fn default() -> Self {
        Self {
            width: 1.0,
            depth_threshold: 0.003,
            color: Vec4::new(0.02, 0.02, 0.02, 1.0),
        }
    }
}

/// Sample offsets in texels, starting at +X and going counter-clockwise.
pub fn neighbour_offsets(width: f32) -> [Vec2; NEIGHBOURS] {
    std::array::from_fn(|i| {
        let angle = i as f32 * std::f32::consts::TAU / NEIGHBOURS as f32;
        Vec2::new(angle.cos(), angle.sin()) * width
    })
}

/// One silhouette pixel: `r` id, `g` depth, `b` coverage.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SilhouetteTexel {
    pub id: f32,
    pub depth: f32,
    pub coverage: f32,
}

/// A CPU-side silhouette buffer.
#[derive(Debug, Clone)]
pub struct SilhouetteImage {
    width: u32,
    height: u32,
    texels: Vec<SilhouetteTexel>,
}

impl SilhouetteImage {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            texels: vec![SilhouetteTexel::default(); (width * height) as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Texel at `pos`, clamped to the image bounds like a `textureLoad` of a
    /// clamped coordinate. An empty image reads as cleared background.
    pub fn get(&self, pos: IVec2) -> SilhouetteTexel {
        if self.width == 0 || self.height == 0 {
            return SilhouetteTexel::default();
        }
        let x = pos.x.clamp(0, self.width as i32 - 1) as u32;
        let y = pos.y.clamp(0, self.height as i32 - 1) as u32;
        self.texels[(y * self.width + x) as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, texel: SilhouetteTexel) {
        if x < self.width && y < self.height {
            self.texels[(y * self.width + x) as usize] = texel;
        }
    }

    /// Fill the half-open rectangle `[x0, x1) x [y0, y1)`.
    pub fn fill_rect(&mut self, x0: u32, y0: u32, x1: u32, y1: u32, texel: SilhouetteTexel) {
        for y in y0..y1.min(self.height) {
            for x in x0..x1.min(self.width) {
                self.set(x, y, texel);
            }
        }
    }
}

pub fn is_edge(image: &SilhouetteImage, x: u32, y: u32, params: &OutlineParams) -> bool {
    let pixel = IVec2::new(x as i32, y as i32);
    let center = image.get(pixel);
    neighbour_offsets(params.width).iter().any(|offset| {
        let sample = image.get(pixel + offset.round().as_ivec2());
        (sample.coverage - center.coverage).abs() > 0.5
            || (sample.depth - center.depth).abs() > params.depth_threshold
    })
}

/// Edge flags for every pixel, row-major.
pub fn edge_mask(image: &SilhouetteImage, params: &OutlineParams) -> Vec<bool> {
    (0..image.height())
        .flat_map(|y| (0..image.width()).map(move |x| (x, y)))
        .map(|(x, y)| is_edge(image, x, y, params))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const OBJECT: SilhouetteTexel = SilhouetteTexel {
        id: 1.0 / 255.0,
        depth: 0.5,
        coverage: 1.0,
    };

    fn square() -> SilhouetteImage {
        let mut image = SilhouetteImage::new(16, 16);
        image.fill_rect(5, 5, 11, 11, OBJECT);
        image
    }

    #[test]
    fn empty_image_reads_as_background() {
        let image = SilhouetteImage::new(0, 0);
        assert_eq!(image.get(IVec2::new(3, -2)), SilhouetteTexel::default());
        assert!(!is_edge(&image, 0, 0, &OutlineParams::default()));
        assert!(edge_mask(&image, &OutlineParams::default()).is_empty());
    }

    #[test]
    fn offsets_lie_on_the_radius() {
        for offset in neighbour_offsets(2.0) {
            assert!((offset.length() - 2.0).abs() < 1e-5);
        }
        assert!((neighbour_offsets(1.0)[0] - Vec2::X).length() < 1e-6);
        assert!((neighbour_offsets(1.0)[2] - Vec2::Y).length() < 1e-6);
    }

    #[test]
    fn boundary_pixels_are_edges() {
        let image = square();
        let params = OutlineParams::default();
        // inside, on the boundary
        assert!(is_edge(&image, 5, 8, &params));
        assert!(is_edge(&image, 10, 10, &params));
        // outside, touching the boundary
        assert!(is_edge(&image, 4, 8, &params));
        assert!(is_edge(&image, 11, 11, &params));
    }

    #[test]
    fn interior_and_far_background_are_not_edges() {
        let image = square();
        let params = OutlineParams::default();
        assert!(!is_edge(&image, 8, 8, &params));
        assert!(!is_edge(&image, 0, 0, &params));
        assert!(!is_edge(&image, 15, 2, &params));
        // two texels away with a radius of one
        assert!(!is_edge(&image, 3, 8, &params));
    }

    #[test]
    fn wider_outline_reaches_further() {
        let image = square();
        let wide = OutlineParams {
            width: 2.0,
            ..OutlineParams::default()
        };
        assert!(is_edge(&image, 3, 8, &wide));
        assert!(!is_edge(&image, 8, 8, &wide));
    }

    #[test]
    fn depth_steps_between_overlapping_objects() {
        let mut image = SilhouetteImage::new(8, 8);
        image.fill_rect(0, 0, 8, 8, OBJECT);
        image.fill_rect(4, 0, 8, 8, SilhouetteTexel { depth: 0.6, ..OBJECT });
        let params = OutlineParams::default();
        assert!(is_edge(&image, 3, 4, &params));
        assert!(is_edge(&image, 4, 4, &params));
        assert!(!is_edge(&image, 1, 4, &params));

        let mut shallow = SilhouetteImage::new(8, 8);
        shallow.fill_rect(0, 0, 8, 8, OBJECT);
        shallow.fill_rect(4, 0, 8, 8, SilhouetteTexel { depth: 0.501, ..OBJECT });
        assert!(!is_edge(&shallow, 4, 4, &params));
    }

    #[test]
    fn mask_counts_a_ring_around_the_square() {
        let image = square();
        let mask = edge_mask(&image, &OutlineParams::default());
        assert_eq!(mask.len(), 256);
        let edges = mask.iter().filter(|e| **e).count();
        // inner ring of a 6x6 square (20) plus the outer ring (28)
        assert_eq!(edges, 48);
    }
}
